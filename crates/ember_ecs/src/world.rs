use log::{debug, trace};

use crate::commands::CommandQueue;
use crate::component::{Component, ComponentMask, checked_type_id};
use crate::entity::Entity;
use crate::error::EcsError;
use crate::query::QueryBundle;
use crate::resource::{Resource, Resources};
use crate::schedule::{ScheduleLabel, Schedules};
use crate::storage::ComponentStorage;

/// Entity registry: allocates slot indices, associates typed components with
/// them through per-type columns, and answers conjunctive queries over the
/// per-slot component masks.
///
/// A slot with an all-zero mask is free. Liveness is the mask itself, so an
/// entity that has had every component removed is indistinguishable from one
/// that was never spawned in that slot.
pub struct World {
    masks: Vec<ComponentMask>,
    storage: ComponentStorage,
    pub resources: Resources,
    pub schedules: Schedules,
}

impl World {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(slots: usize) -> Self {
        let slots = slots.max(1);
        debug!("creating world with {} entity slots", slots);
        Self {
            masks: vec![ComponentMask::default(); slots],
            storage: ComponentStorage::default(),
            resources: Resources::new(),
            schedules: Schedules::new(),
        }
    }

    /// Current size of the slot array. Any entity index at or beyond this is
    /// invalid.
    pub fn capacity(&self) -> usize {
        self.masks.len()
    }

    /// Number of live entities, i.e. slots with a non-empty mask.
    pub fn entity_count(&self) -> usize {
        self.masks.iter().filter(|mask| !mask.is_empty()).count()
    }

    /// Claims the first free slot, doubling the slot array when none is left.
    ///
    /// The slot stays free until the first `insert_component`, so two
    /// consecutive `spawn` calls with no insert in between return the same
    /// slot.
    // TODO: keep a free-list of despawned slots for O(1) spawn once worlds
    // hold more than a few thousand entities.
    pub fn spawn(&mut self) -> Entity {
        if let Some(slot) = self.masks.iter().position(ComponentMask::is_empty) {
            return Entity::from_slot(slot);
        }
        let previous = self.masks.len();
        self.masks.resize(previous * 2, ComponentMask::default());
        debug!("entity capacity grew from {} to {}", previous, previous * 2);
        Entity::from_slot(previous)
    }

    /// Drops every component attached to the entity and zeroes its mask,
    /// freeing the slot for reuse. A no-op on an already-free slot.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), EcsError> {
        let slot = self.slot_of(entity)?;
        let mask = self.masks[slot];
        for id in mask.iter_set() {
            self.storage.clear_slot(id, slot);
        }
        self.masks[slot] = ComponentMask::default();
        Ok(())
    }

    pub fn is_alive(&self, entity: Entity) -> Result<bool, EcsError> {
        let slot = self.slot_of(entity)?;
        Ok(!self.masks[slot].is_empty())
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> Result<bool, EcsError> {
        let slot = self.slot_of(entity)?;
        let id = checked_type_id::<T>()?;
        Ok(self.masks[slot].test(id))
    }

    /// Stores a component on the entity, dropping any previous value of the
    /// same type.
    pub fn insert_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<(), EcsError> {
        let slot = self.slot_of(entity)?;
        let id = checked_type_id::<T>()?;
        self.storage.ensure::<T>(id).insert(slot, value);
        self.masks[slot].set(id);
        Ok(())
    }

    /// Drops the entity's component of type `T`, if present. Storage is not
    /// shrunk.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<(), EcsError> {
        let slot = self.slot_of(entity)?;
        let id = checked_type_id::<T>()?;
        if let Some(column) = self.storage.column_mut::<T>(id) {
            column.remove(slot);
        }
        self.masks[slot].clear(id);
        Ok(())
    }

    /// `Ok(None)` when the entity does not own a `T`; that is an expected
    /// case, not an error.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<Option<&T>, EcsError> {
        let slot = self.slot_of(entity)?;
        let id = checked_type_id::<T>()?;
        if !self.masks[slot].test(id) {
            return Ok(None);
        }
        Ok(self.storage.column::<T>(id).and_then(|column| column.get(slot)))
    }

    pub fn get_component_mut<T: Component>(
        &mut self,
        entity: Entity,
    ) -> Result<Option<&mut T>, EcsError> {
        let slot = self.slot_of(entity)?;
        let id = checked_type_id::<T>()?;
        if !self.masks[slot].test(id) {
            return Ok(None);
        }
        Ok(self
            .storage
            .column_mut::<T>(id)
            .and_then(|column| column.get_mut(slot)))
    }

    /// Live entities in increasing slot order. The iterator is lazy and can
    /// be restarted by calling `entities` again.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.masks
            .iter()
            .enumerate()
            .filter(|(_, mask)| !mask.is_empty())
            .map(|(slot, _)| Entity::from_slot(slot))
    }

    /// Visits every live entity owning all components of `Q`, in increasing
    /// slot order, with shared references into the columns.
    pub fn each<Q, F>(&self, visitor: F) -> Result<(), EcsError>
    where
        Q: QueryBundle,
        F: for<'w> FnMut(Entity, Q::Item<'w>),
    {
        Q::for_each(self, visitor)
    }

    /// Like `each`, with mutable references. Taking `&mut self` rules out
    /// structural world mutation for the duration of the pass; defer spawns
    /// and removals through a [`CommandQueue`] instead.
    pub fn each_mut<Q, F>(&mut self, visitor: F) -> Result<(), EcsError>
    where
        Q: QueryBundle,
        F: for<'w> FnMut(Entity, Q::ItemMut<'w>),
    {
        Q::for_each_mut(self, visitor)
    }

    pub fn insert_resource<T: Resource>(&mut self, value: T) {
        self.resources.insert(value);
    }

    pub fn get_resource<T: Resource>(&self) -> Option<&T> {
        self.resources.get::<T>()
    }

    pub fn get_resource_mut<T: Resource>(&mut self) -> Option<&mut T> {
        self.resources.get_mut::<T>()
    }

    pub fn remove_resource<T: Resource>(&mut self) -> Option<T> {
        self.resources.remove::<T>()
    }

    /// Applies queued commands in FIFO order. On the first failure the
    /// remaining commands stay queued.
    pub fn apply_commands(&mut self, queue: &mut CommandQueue) -> Result<(), EcsError> {
        trace!("applying {} queued commands", queue.len());
        while let Some(command) = queue.pop_front() {
            command.apply(self)?;
        }
        Ok(())
    }

    pub fn run_schedule(&mut self, label: ScheduleLabel) {
        if let Some(mut systems) = self.schedules.take_systems(&label) {
            trace!("running {:?} schedule with {} systems", label, systems.len());
            systems.run(self);
            self.schedules.put_systems(label, systems);
        }
    }

    fn slot_of(&self, entity: Entity) -> Result<usize, EcsError> {
        let slot = entity.index();
        if slot >= self.masks.len() {
            return Err(EcsError::InvalidEntity {
                entity,
                capacity: self.masks.len(),
            });
        }
        Ok(slot)
    }

    pub(crate) fn storage(&self) -> &ComponentStorage {
        &self.storage
    }

    pub(crate) fn masks(&self) -> &[ComponentMask] {
        &self.masks
    }

    pub(crate) fn masks_and_storage_mut(&mut self) -> (&[ComponentMask], &mut ComponentStorage) {
        (&self.masks, &mut self.storage)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
