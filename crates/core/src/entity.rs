//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stock items, conversion mappings and movements are entities: two records with
/// the same identifier are the same record, whatever their current quantities.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
