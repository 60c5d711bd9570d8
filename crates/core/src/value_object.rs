//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. In this
/// workspace `Quantity`, canonical ingredient keys and conversion factors are value
/// objects; stock items and movements are entities (see [`crate::Entity`]).
///
/// ```ignore
/// let a = Quantity::from_decimal(Decimal::new(15, 1));
/// let b = Quantity::from_decimal(Decimal::new(150, 2));
/// assert_eq!(a, b); // 1.5 == 1.50
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
