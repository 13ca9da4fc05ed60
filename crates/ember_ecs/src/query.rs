use crate::component::{Component, ComponentMask, checked_type_id};
use crate::entity::Entity;
use crate::error::EcsError;
use crate::storage::Column;
use crate::world::World;

/// A tuple of component types used as a conjunctive query: an entity matches
/// when it owns every type in the tuple. Implemented for tuples of one to
/// four components.
pub trait QueryBundle {
    type Item<'w>;
    type ItemMut<'w>;

    /// The OR of every tuple member's single-bit mask.
    fn query_mask() -> Result<ComponentMask, EcsError>;

    fn for_each<F>(world: &World, visitor: F) -> Result<(), EcsError>
    where
        F: for<'w> FnMut(Entity, Self::Item<'w>);

    fn for_each_mut<F>(world: &mut World, visitor: F) -> Result<(), EcsError>
    where
        F: for<'w> FnMut(Entity, Self::ItemMut<'w>);
}

macro_rules! impl_query_bundle {
    ($(($ty:ident, $column:ident)),+) => {
        impl<$($ty: Component),+> QueryBundle for ($($ty,)+) {
            type Item<'w> = ($(&'w $ty,)+);
            type ItemMut<'w> = ($(&'w mut $ty,)+);

            fn query_mask() -> Result<ComponentMask, EcsError> {
                let mut mask = ComponentMask::default();
                $(mask.set(checked_type_id::<$ty>()?);)+
                Ok(mask)
            }

            fn for_each<F>(world: &World, mut visitor: F) -> Result<(), EcsError>
            where
                F: for<'w> FnMut(Entity, Self::Item<'w>),
            {
                let query = Self::query_mask()?;
                $(
                    // A missing column means no entity ever held this type,
                    // so nothing can match.
                    let Some($column) = world.storage().column::<$ty>(checked_type_id::<$ty>()?)
                    else {
                        return Ok(());
                    };
                )+
                for (slot, mask) in world.masks().iter().enumerate() {
                    if mask.contains_all(&query) {
                        visitor(
                            Entity::from_slot(slot),
                            ($($column
                                .get(slot)
                                .expect("mask bit set without a stored component"),)+),
                        );
                    }
                }
                Ok(())
            }

            fn for_each_mut<F>(world: &mut World, mut visitor: F) -> Result<(), EcsError>
            where
                F: for<'w> FnMut(Entity, Self::ItemMut<'w>),
            {
                let query = Self::query_mask()?;
                let ids = [$(checked_type_id::<$ty>()?),+];
                let (masks, storage) = world.masks_and_storage_mut();
                let Some(columns) = storage.disjoint_columns_mut(ids) else {
                    return Ok(());
                };
                let [$($column),+] = columns;
                $(
                    let $column = $column
                        .as_any_mut()
                        .downcast_mut::<Column<$ty>>()
                        .expect("component storage exists but has unexpected concrete type");
                )+
                for (slot, mask) in masks.iter().enumerate() {
                    if mask.contains_all(&query) {
                        visitor(
                            Entity::from_slot(slot),
                            ($($column
                                .get_mut(slot)
                                .expect("mask bit set without a stored component"),)+),
                        );
                    }
                }
                Ok(())
            }
        }
    };
}

impl_query_bundle!((A, column_a));
impl_query_bundle!((A, column_a), (B, column_b));
impl_query_bundle!((A, column_a), (B, column_b), (C, column_c));
impl_query_bundle!((A, column_a), (B, column_b), (C, column_c), (D, column_d));
