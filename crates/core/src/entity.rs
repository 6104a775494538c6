//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Implemented by every stored row type so in-memory tables can be keyed
/// generically.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Human-readable entity name used in `NotFound` errors (e.g. "product").
    const NAME: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
