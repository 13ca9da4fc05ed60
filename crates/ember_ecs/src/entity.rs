use std::fmt;

/// A handle to an entity: the index of its slot in the world's mask array.
///
/// Entities carry no generation counter. A despawned entity's slot becomes
/// eligible for reuse, so a handle is only unique among currently-live
/// entities.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity {
    index: u32,
}

impl Entity {
    /// Builds a handle from a raw slot index. The index is not validated;
    /// world operations report `InvalidEntity` for out-of-range handles.
    pub fn from_raw(index: u32) -> Self {
        Self { index }
    }

    pub(crate) fn from_slot(slot: usize) -> Self {
        Self {
            index: slot as u32,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.index)
    }
}
