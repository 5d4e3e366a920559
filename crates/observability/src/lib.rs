//! Process-wide observability for bookstall services.
//!
//! Engines and stores instrument their operations with `tracing` spans;
//! this crate wires the subscriber that makes those spans visible. Call
//! [`init`] once at startup (calling it again is a no-op):
//!
//! ```no_run
//! bookstall_observability::init();
//! ```

/// Subscriber configuration (filter, JSON formatting).
pub mod tracing;

/// Initialize structured logging for the process.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}
