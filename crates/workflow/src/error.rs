//! Engine-level error model.

use thiserror::Error;

use bookstall_core::DomainError;
use bookstall_store::StoreError;

/// Result type returned by every engine operation.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// What an engine operation can fail with.
///
/// Deterministic business failures surface as [`DomainError`] (not found,
/// invalid state, insufficient funds or stock, validation). Infrastructure
/// failures surface as [`StoreError`]. Callers that only care about the
/// business outcome match on `Domain`; retry loops and alerting match on
/// `Store`.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// The business failure, if this is one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(err) => Some(err),
            Self::Store(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_pass_through_display() {
        let err = WorkflowError::from(DomainError::not_found("book", "B-001"));
        assert_eq!(err.to_string(), "book not found: B-001");
        assert!(err.as_domain().is_some());
    }

    #[test]
    fn store_errors_are_not_domain_errors() {
        let err = WorkflowError::from(StoreError::Backend("connection reset".into()));
        assert!(err.as_domain().is_none());
    }
}
