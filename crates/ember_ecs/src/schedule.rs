use std::collections::HashMap;

use crate::world::World;

pub trait System: 'static {
    fn run(&mut self, world: &mut World);
}

// Any world-mutating closure is a system.
impl<F> System for F
where
    F: FnMut(&mut World) + 'static,
{
    fn run(&mut self, world: &mut World) {
        self(world)
    }
}

/// Ordered collection of boxed systems, run in insertion order.
#[derive(Default)]
pub struct Systems {
    systems: Vec<Box<dyn System>>,
}

impl Systems {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
        }
    }

    pub fn add(&mut self, system: impl System) {
        self.systems.push(Box::new(system));
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn run(&mut self, world: &mut World) {
        for system in &mut self.systems {
            system.run(world);
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ScheduleLabel {
    Startup,
    Update,
    Shutdown,
}

pub struct Schedules {
    schedule_map: HashMap<ScheduleLabel, Systems>,
}

impl Default for Schedules {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedules {
    pub fn new() -> Self {
        Self {
            schedule_map: HashMap::from([
                (ScheduleLabel::Startup, Systems::default()),
                (ScheduleLabel::Update, Systems::default()),
                (ScheduleLabel::Shutdown, Systems::default()),
            ]),
        }
    }

    pub fn add(&mut self, label: ScheduleLabel, system: impl System) {
        self.schedule_map.entry(label).or_default().add(system);
    }

    // The world runs a schedule against itself, so systems are taken out for
    // the duration of the run and put back afterwards.
    pub fn take_systems(&mut self, label: &ScheduleLabel) -> Option<Systems> {
        self.schedule_map.get_mut(label).map(std::mem::take)
    }

    pub fn put_systems(&mut self, label: ScheduleLabel, systems: Systems) {
        if let Some(slot) = self.schedule_map.get_mut(&label) {
            *slot = systems;
        }
    }
}
