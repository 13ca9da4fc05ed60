use std::collections::VecDeque;
use std::marker::PhantomData;

use crate::component::Component;
use crate::entity::Entity;
use crate::error::EcsError;
use crate::resource::Resource;
use crate::world::World;

/// A structural world mutation recorded during iteration and executed later,
/// once no query pass is borrowing the world.
pub trait Command {
    fn apply(self: Box<Self>, world: &mut World) -> Result<(), EcsError>;
}

pub struct Despawn {
    pub entity: Entity,
}

impl Command for Despawn {
    fn apply(self: Box<Self>, world: &mut World) -> Result<(), EcsError> {
        world.despawn(self.entity)
    }
}

pub struct InsertComponent<T: Component> {
    pub entity: Entity,
    pub component: T,
}

impl<T: Component> Command for InsertComponent<T> {
    fn apply(self: Box<Self>, world: &mut World) -> Result<(), EcsError> {
        world.insert_component(self.entity, self.component)
    }
}

pub struct RemoveComponent<T: Component> {
    entity: Entity,
    marker: PhantomData<fn() -> T>,
}

impl<T: Component> RemoveComponent<T> {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            marker: PhantomData,
        }
    }
}

impl<T: Component> Command for RemoveComponent<T> {
    fn apply(self: Box<Self>, world: &mut World) -> Result<(), EcsError> {
        world.remove_component::<T>(self.entity)
    }
}

pub struct InsertResource<T: Resource> {
    pub resource: T,
}

impl<T: Resource> Command for InsertResource<T> {
    fn apply(self: Box<Self>, world: &mut World) -> Result<(), EcsError> {
        world.insert_resource(self.resource);
        Ok(())
    }
}

/// FIFO buffer of deferred commands, drained by `World::apply_commands`.
#[derive(Default)]
pub struct CommandQueue {
    commands: VecDeque<Box<dyn Command>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            commands: VecDeque::new(),
        }
    }

    pub fn push(&mut self, command: impl Command + 'static) {
        self.commands.push_back(Box::new(command));
    }

    pub fn pop_front(&mut self) -> Option<Box<dyn Command>> {
        self.commands.pop_front()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Label(&'static str);
    impl Component for Label {}

    struct Score(u32);
    impl Resource for Score {}

    #[test]
    fn commands_apply_in_fifo_order() {
        let mut world = World::new();
        let entity = world.spawn();

        let mut queue = CommandQueue::new();
        queue.push(InsertComponent {
            entity,
            component: Label("first"),
        });
        queue.push(InsertComponent {
            entity,
            component: Label("second"),
        });
        queue.push(InsertResource { resource: Score(10) });

        world.apply_commands(&mut queue).unwrap();

        assert!(queue.is_empty());
        assert_eq!(
            world.get_component::<Label>(entity).unwrap(),
            Some(&Label("second"))
        );
        assert_eq!(world.get_resource::<Score>().map(|s| s.0), Some(10));
    }

    #[test]
    fn remove_and_despawn_commands() {
        let mut world = World::new();
        let entity = world.spawn();
        world.insert_component(entity, Label("doomed")).unwrap();

        let mut queue = CommandQueue::new();
        queue.push(RemoveComponent::<Label>::new(entity));
        world.apply_commands(&mut queue).unwrap();
        assert_eq!(world.has_component::<Label>(entity), Ok(false));

        world.insert_component(entity, Label("doomed again")).unwrap();
        queue.push(Despawn { entity });
        world.apply_commands(&mut queue).unwrap();
        assert_eq!(world.is_alive(entity), Ok(false));
    }

    #[test]
    fn failed_command_leaves_the_rest_queued() {
        let mut world = World::with_capacity(1);
        let valid = world.spawn();
        let stale = Entity::from_raw(9);

        let mut queue = CommandQueue::new();
        queue.push(Despawn { entity: stale });
        queue.push(InsertComponent {
            entity: valid,
            component: Label("still queued"),
        });

        let result = world.apply_commands(&mut queue);
        assert_eq!(
            result,
            Err(EcsError::InvalidEntity {
                entity: stale,
                capacity: 1,
            })
        );
        assert_eq!(queue.len(), 1);

        world.apply_commands(&mut queue).unwrap();
        assert_eq!(
            world.get_component::<Label>(valid).unwrap(),
            Some(&Label("still queued"))
        );
    }
}
