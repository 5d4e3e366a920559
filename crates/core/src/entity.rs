//! Entity and value-object marker traits.

/// Entity marker + minimal interface.
///
/// Entities have identity and continuity across state changes: two entities
/// with the same id are the same entity, whatever their field values.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Marker trait for value objects.
///
/// Value objects have **no identity**: they are defined entirely by their
/// attribute values, compared by value, and immutable once built. To "modify"
/// one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
