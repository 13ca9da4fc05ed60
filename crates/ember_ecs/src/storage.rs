use std::any::{Any, type_name};

use log::debug;

use crate::component::{Component, ComponentTypeId};

// The trait lets the world drop a slot's value without knowing the concrete
// component type; everything typed goes through an `Any` downcast at call
// sites where the type is known.
pub(crate) trait ErasedColumn {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clear_slot(&mut self, slot: usize);
}

/// Per-type component array, indexed by entity slot. `None` means the entity
/// has no value of this type; overwriting or taking a `Some` runs the old
/// value's destructor.
pub(crate) struct Column<T> {
    slots: Vec<Option<T>>,
}

impl<T: Component> Column<T> {
    fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Grows the column exactly to `slot + 1`, then stores the value,
    /// dropping any previous one.
    pub fn insert(&mut self, slot: usize, value: T) {
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }
        self.slots[slot] = Some(value);
    }

    pub fn remove(&mut self, slot: usize) -> Option<T> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }
}

impl<T: Component> ErasedColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clear_slot(&mut self, slot: usize) {
        if let Some(value) = self.slots.get_mut(slot) {
            *value = None;
        }
    }
}

/// All component columns, indexed by component type id.
#[derive(Default)]
pub(crate) struct ComponentStorage {
    columns: Vec<Option<Box<dyn ErasedColumn>>>,
}

impl ComponentStorage {
    /// Returns the column for `T`, creating it on the type's first insert.
    pub fn ensure<T: Component>(&mut self, id: ComponentTypeId) -> &mut Column<T> {
        let index = id.index();
        if index >= self.columns.len() {
            self.columns.resize_with(index + 1, || None);
        }
        if self.columns[index].is_none() {
            debug!("registering component storage for {}", type_name::<T>());
            self.columns[index] = Some(Box::new(Column::<T>::new()));
        }
        self.columns[index]
            .as_mut()
            .and_then(|column| column.as_any_mut().downcast_mut::<Column<T>>())
            .expect("component storage exists but has unexpected concrete type")
    }

    pub fn column<T: Component>(&self, id: ComponentTypeId) -> Option<&Column<T>> {
        self.columns.get(id.index())?.as_ref()?.as_any().downcast_ref()
    }

    pub fn column_mut<T: Component>(&mut self, id: ComponentTypeId) -> Option<&mut Column<T>> {
        self.columns
            .get_mut(id.index())?
            .as_mut()?
            .as_any_mut()
            .downcast_mut()
    }

    pub fn clear_slot(&mut self, id: ComponentTypeId, slot: usize) {
        if let Some(Some(column)) = self.columns.get_mut(id.index()) {
            column.clear_slot(slot);
        }
    }

    pub fn has_column(&self, id: ComponentTypeId) -> bool {
        matches!(self.columns.get(id.index()), Some(Some(_)))
    }

    /// Mutable access to several distinct columns at once, for queries that
    /// hand out mutable references to more than one component type.
    pub fn disjoint_columns_mut<const N: usize>(
        &mut self,
        ids: [ComponentTypeId; N],
    ) -> Option<[&mut Box<dyn ErasedColumn>; N]> {
        if ids.iter().any(|id| !self.has_column(*id)) {
            return None;
        }
        let indices = ids.map(|id| id.index());
        let slots = self
            .columns
            .get_disjoint_mut(indices)
            .expect("duplicate component type in query");
        Some(slots.map(|slot| slot.as_mut().expect("column checked present above")))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    struct Hitpoints(u32);
    impl Component for Hitpoints {}

    struct Tracked {
        drops: Rc<Cell<u32>>,
    }

    impl Component for Tracked {}

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let mut column = Column::new();
        column.insert(3, Hitpoints(25));

        assert!(column.get(0).is_none());
        assert!(column.get(2).is_none());
        assert_eq!(column.get(3).map(|h| h.0), Some(25));
        assert!(column.get(4).is_none());
    }

    #[test]
    fn insert_replaces_and_drops_old_value() {
        let drops = Rc::new(Cell::new(0));
        let mut column = Column::new();

        column.insert(0, Tracked { drops: drops.clone() });
        assert_eq!(drops.get(), 0);

        column.insert(0, Tracked { drops: drops.clone() });
        assert_eq!(drops.get(), 1);

        column.remove(0);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn clear_slot_drops_in_place() {
        let drops = Rc::new(Cell::new(0));
        let mut column = Column::new();
        column.insert(1, Tracked { drops: drops.clone() });

        column.clear_slot(1);
        assert_eq!(drops.get(), 1);

        // Clearing an already-empty or out-of-range slot is a no-op.
        column.clear_slot(1);
        column.clear_slot(99);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn storage_recovers_typed_column() {
        let mut storage = ComponentStorage::default();
        let id = ComponentTypeId::of::<Hitpoints>();

        storage.ensure::<Hitpoints>(id).insert(0, Hitpoints(7));
        assert!(storage.has_column(id));

        let column = storage.column::<Hitpoints>(id).unwrap();
        assert_eq!(column.get(0).map(|h| h.0), Some(7));
    }

    #[test]
    fn disjoint_columns_requires_all_columns() {
        let mut storage = ComponentStorage::default();
        let hitpoints = ComponentTypeId::of::<Hitpoints>();
        let tracked = ComponentTypeId::of::<Tracked>();

        storage.ensure::<Hitpoints>(hitpoints);
        assert!(storage.disjoint_columns_mut([hitpoints, tracked]).is_none());

        storage.ensure::<Tracked>(tracked);
        assert!(storage.disjoint_columns_mut([hitpoints, tracked]).is_some());
    }
}
