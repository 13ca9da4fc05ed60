use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, RwLock};

use bitvec::prelude::*;

use crate::error::EcsError;

/// Upper bound on distinct component types in a single process. The mask
/// attached to every entity slot is exactly this many bits wide.
pub const MAX_COMPONENT_TYPES: usize = 128;

pub trait Component: 'static {}

/// Dense integer identifying a component type, assigned process-wide on the
/// type's first use and stable for the rest of the run. Ids are never
/// reclaimed and are not meaningful across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeId(pub(crate) usize);

static NEXT_TYPE_INDEX: AtomicUsize = AtomicUsize::new(0);

static TYPE_INDICES: LazyLock<RwLock<HashMap<TypeId, ComponentTypeId>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

impl ComponentTypeId {
    pub fn of<T: Component>() -> Self {
        let key = TypeId::of::<T>();
        if let Some(id) = TYPE_INDICES
            .read()
            .expect("component type registry poisoned")
            .get(&key)
        {
            return *id;
        }

        let mut indices = TYPE_INDICES
            .write()
            .expect("component type registry poisoned");
        *indices
            .entry(key)
            .or_insert_with(|| ComponentTypeId(NEXT_TYPE_INDEX.fetch_add(1, Ordering::Relaxed)))
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Resolves the id for `T` and rejects ids past the mask width, so that a
/// misconfigured process fails loudly instead of overrunning the fixed-size
/// mask and column tables.
pub(crate) fn checked_type_id<T: Component>() -> Result<ComponentTypeId, EcsError> {
    let id = ComponentTypeId::of::<T>();
    guard_type_index(id.index(), type_name::<T>())?;
    Ok(id)
}

fn guard_type_index(index: usize, type_name: &'static str) -> Result<(), EcsError> {
    if index >= MAX_COMPONENT_TYPES {
        return Err(EcsError::ComponentTypeLimitExceeded {
            type_name,
            index,
            limit: MAX_COMPONENT_TYPES,
        });
    }
    Ok(())
}

/// Fixed-width set of component type ids. An all-zero mask marks its entity
/// slot as free; there is no separate alive flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentMask {
    bits: BitArr!(for MAX_COMPONENT_TYPES, in u64),
}

impl Default for ComponentMask {
    fn default() -> Self {
        Self {
            bits: BitArray::ZERO,
        }
    }
}

impl ComponentMask {
    pub fn set(&mut self, id: ComponentTypeId) {
        self.bits.set(id.index(), true);
    }

    pub fn clear(&mut self, id: ComponentTypeId) {
        self.bits.set(id.index(), false);
    }

    pub fn test(&self, id: ComponentTypeId) -> bool {
        self.bits[id.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// True iff every bit of `query` is also set in `self`.
    pub fn contains_all(&self, query: &ComponentMask) -> bool {
        self.bits
            .as_raw_slice()
            .iter()
            .zip(query.bits.as_raw_slice())
            .all(|(have, want)| have & want == *want)
    }

    pub fn iter_set(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.bits.iter_ones().map(ComponentTypeId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Armor;
    impl Component for Armor {}

    struct Shield;
    impl Component for Shield {}

    #[test]
    fn type_ids_are_stable_and_distinct() {
        let first = ComponentTypeId::of::<Armor>();
        let second = ComponentTypeId::of::<Armor>();
        let other = ComponentTypeId::of::<Shield>();

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn mask_set_clear_test() {
        let armor = ComponentTypeId::of::<Armor>();
        let shield = ComponentTypeId::of::<Shield>();

        let mut mask = ComponentMask::default();
        assert!(mask.is_empty());

        mask.set(armor);
        assert!(mask.test(armor));
        assert!(!mask.test(shield));
        assert!(!mask.is_empty());

        mask.clear(armor);
        assert!(!mask.test(armor));
        assert!(mask.is_empty());
    }

    #[test]
    fn contains_all_is_conjunctive() {
        let armor = ComponentTypeId::of::<Armor>();
        let shield = ComponentTypeId::of::<Shield>();

        let mut both = ComponentMask::default();
        both.set(armor);
        both.set(shield);

        let mut armor_only = ComponentMask::default();
        armor_only.set(armor);

        assert!(both.contains_all(&armor_only));
        assert!(both.contains_all(&both));
        assert!(!armor_only.contains_all(&both));
        assert!(armor_only.contains_all(&ComponentMask::default()));
    }

    #[test]
    fn iter_set_yields_each_bit_once() {
        let armor = ComponentTypeId::of::<Armor>();
        let shield = ComponentTypeId::of::<Shield>();

        let mut mask = ComponentMask::default();
        mask.set(armor);
        mask.set(shield);

        let mut ids: Vec<_> = mask.iter_set().collect();
        ids.sort();
        let mut expected = vec![armor, shield];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn type_index_guard_rejects_overflow() {
        assert!(guard_type_index(MAX_COMPONENT_TYPES - 1, "ok").is_ok());
        assert_eq!(
            guard_type_index(MAX_COMPONENT_TYPES, "overflow"),
            Err(EcsError::ComponentTypeLimitExceeded {
                type_name: "overflow",
                index: MAX_COMPONENT_TYPES,
                limit: MAX_COMPONENT_TYPES,
            })
        );
    }
}
