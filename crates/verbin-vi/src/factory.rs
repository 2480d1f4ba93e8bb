//! Child factories.
//!
//! A parent record does not know the concrete shape of its children. While
//! reading, it asks its [`ChildFactory`] for a fresh record for each child
//! position and lets that record parse itself.

use crate::VersionRecord;

/// Produces the next child record for a given position.
///
/// Implementations must depend on `index` alone, never on previously decoded
/// siblings. Any `Fn(usize) -> VersionRecord<K>` closure is a factory.
///
/// # Example
///
/// ```
/// use verbin_vi::{ChildFactory, VersionRecord};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Kind {
///     Strings,
///     Vars,
/// }
///
/// let factory = |index: usize| {
///     if index == 0 {
///         VersionRecord::with_kind("StringFileInfo", Kind::Strings)
///     } else {
///         VersionRecord::with_kind("VarFileInfo", Kind::Vars)
///     }
/// };
///
/// assert_eq!(*factory.create_child(0).kind(), Kind::Strings);
/// assert_eq!(*factory.create_child(1).kind(), Kind::Vars);
/// ```
pub trait ChildFactory<K>: Send + Sync {
    fn create_child(&self, index: usize) -> VersionRecord<K>;
}

impl<K, F> ChildFactory<K> for F
where
    F: Fn(usize) -> VersionRecord<K> + Send + Sync,
{
    #[inline]
    fn create_child(&self, index: usize) -> VersionRecord<K> {
        self(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strategy-object factory: alternating kinds by parity.
    struct Alternating;

    impl ChildFactory<bool> for Alternating {
        fn create_child(&self, index: usize) -> VersionRecord<bool> {
            VersionRecord::with_kind(format!("child{index}"), index % 2 == 1)
        }
    }

    #[test]
    fn test_strategy_factory() {
        let factory = Alternating;
        assert!(!*factory.create_child(0).kind());
        assert!(*factory.create_child(1).kind());
        assert_eq!(factory.create_child(4).name(), "child4");
    }

    #[test]
    fn test_closure_factory_is_pure_in_index() {
        let factory = |index: usize| VersionRecord::<()>::new(format!("entry{index}"));
        assert_eq!(factory.create_child(3).name(), factory.create_child(3).name());
    }
}
