//! Entity lookup and sibling-group access inside an open transaction.

use yrs::{Array, ArrayRef, MapRef, Out, ReadTxn, TransactionMut};

use super::StructureError;
use crate::cycle::CycleGuard;
use crate::id::EntityKind;
use crate::model::Ordered;
use crate::model::codec::{self, keys};
use crate::ordering::{insert_at, remove_at, sort_by_stored_order};

/// A member of a sibling group: the live map plus its effective order.
#[derive(Debug, Clone)]
pub(crate) struct Sibling {
    pub id: String,
    pub map: MapRef,
    pub order: i64,
}

impl Ordered for Sibling {
    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PageSlot {
    pub index: u32,
    pub map: MapRef,
    pub id: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct BlockSlot {
    pub page_id: String,
    pub blocks: ArrayRef,
    pub index: u32,
    pub map: MapRef,
}

#[derive(Debug, Clone)]
pub(crate) struct ComponentSlot {
    pub page_id: String,
    pub block_id: String,
    pub components: ArrayRef,
    pub index: u32,
    pub map: MapRef,
}

/// Every map element of `array` with its storage index.
pub(crate) fn maps_in<T: ReadTxn>(txn: &T, array: &ArrayRef) -> Vec<(u32, MapRef)> {
    array
        .iter(txn)
        .enumerate()
        .filter_map(|(index, value)| match value {
            Out::YMap(map) => Some((index as u32, map)),
            _ => None,
        })
        .collect()
}

pub(crate) fn find_page<T: ReadTxn>(txn: &T, pages: &ArrayRef, id: &str) -> Option<PageSlot> {
    maps_in(txn, pages)
        .into_iter()
        .find(|(_, map)| codec::entity_id(txn, map) == id)
        .map(|(index, map)| PageSlot {
            index,
            parent_id: codec::parent_id(txn, &map),
            map,
            id: id.to_string(),
        })
}

pub(crate) fn require_page<T: ReadTxn>(
    txn: &T,
    pages: &ArrayRef,
    operation: &'static str,
    id: &str,
) -> Result<PageSlot, StructureError> {
    find_page(txn, pages, id).ok_or_else(|| StructureError::not_found(operation, EntityKind::Page, id))
}

pub(crate) fn find_block<T: ReadTxn>(txn: &T, pages: &ArrayRef, id: &str) -> Option<BlockSlot> {
    for (_, page) in maps_in(txn, pages) {
        let Some(blocks) = codec::get_array(txn, &page, keys::BLOCKS) else {
            continue;
        };
        if let Some((index, map)) = maps_in(txn, &blocks)
            .into_iter()
            .find(|(_, map)| codec::entity_id(txn, map) == id)
        {
            return Some(BlockSlot {
                page_id: codec::entity_id(txn, &page),
                blocks,
                index,
                map,
            });
        }
    }
    None
}

pub(crate) fn require_block<T: ReadTxn>(
    txn: &T,
    pages: &ArrayRef,
    operation: &'static str,
    id: &str,
) -> Result<BlockSlot, StructureError> {
    find_block(txn, pages, id).ok_or_else(|| StructureError::not_found(operation, EntityKind::Block, id))
}

pub(crate) fn find_component<T: ReadTxn>(txn: &T, pages: &ArrayRef, id: &str) -> Option<ComponentSlot> {
    for (_, page) in maps_in(txn, pages) {
        let Some(blocks) = codec::get_array(txn, &page, keys::BLOCKS) else {
            continue;
        };
        for (_, block) in maps_in(txn, &blocks) {
            let Some(components) = codec::get_array(txn, &block, keys::COMPONENTS) else {
                continue;
            };
            if let Some((index, map)) = maps_in(txn, &components)
                .into_iter()
                .find(|(_, map)| codec::entity_id(txn, map) == id)
            {
                return Some(ComponentSlot {
                    page_id: codec::entity_id(txn, &page),
                    block_id: codec::entity_id(txn, &block),
                    components,
                    index,
                    map,
                });
            }
        }
    }
    None
}

pub(crate) fn require_component<T: ReadTxn>(
    txn: &T,
    pages: &ArrayRef,
    operation: &'static str,
    id: &str,
) -> Result<ComponentSlot, StructureError> {
    find_component(txn, pages, id)
        .ok_or_else(|| StructureError::not_found(operation, EntityKind::Component, id))
}

fn sorted_group<T: ReadTxn>(txn: &T, members: Vec<(u32, MapRef)>) -> Vec<Sibling> {
    let keyed = members
        .into_iter()
        .map(|(index, map)| {
            let stored = codec::get_i64(txn, &map, keys::ORDER);
            let sibling = Sibling {
                id: codec::entity_id(txn, &map),
                order: stored.unwrap_or(index as i64),
                map,
            };
            (sibling, stored.or(Some(index as i64)))
        })
        .collect();
    sort_by_stored_order(keyed)
}

/// The pages whose parent is `parent`, sorted by order.
pub(crate) fn page_group<T: ReadTxn>(txn: &T, pages: &ArrayRef, parent: Option<&str>) -> Vec<Sibling> {
    let members = maps_in(txn, pages)
        .into_iter()
        .filter(|(_, map)| codec::parent_id(txn, map).as_deref() == parent)
        .collect();
    sorted_group(txn, members)
}

/// The blocks or components of a container, sorted by order. A missing
/// sequence is an empty group.
pub(crate) fn item_group<T: ReadTxn>(txn: &T, array: Option<&ArrayRef>) -> Vec<Sibling> {
    match array {
        Some(array) => sorted_group(txn, maps_in(txn, array)),
        None => Vec::new(),
    }
}

pub(crate) fn position(group: &[Sibling], id: &str) -> Option<usize> {
    group.iter().position(|s| s.id == id)
}

/// Write every sibling's order, skipping unchanged values.
pub(crate) fn write_orders(txn: &mut TransactionMut, group: &[Sibling]) -> usize {
    group
        .iter()
        .filter(|s| codec::set_order(txn, &s.map, s.order))
        .count()
}

/// Put `entry` at position `at` of `group` and write the renumbered orders,
/// the entry's own included.
pub(crate) fn insert_sibling(
    txn: &mut TransactionMut,
    operation: &'static str,
    mut group: Vec<Sibling>,
    entry: Sibling,
    at: usize,
) -> Result<(), StructureError> {
    insert_at(operation, &mut group, entry, Some(at as i64))?;
    write_orders(txn, &group);
    Ok(())
}

/// Take `id` out of `group` and close the gap. The remaining siblings are
/// returned renumbered but not yet written.
pub(crate) fn detach_sibling(
    operation: &'static str,
    mut group: Vec<Sibling>,
    id: &str,
) -> Result<Vec<Sibling>, StructureError> {
    let at = position(&group, id).ok_or_else(|| {
        StructureError::invariant(format!("{operation}: '{id}' missing from its sibling group"))
    })?;
    remove_at(&mut group, at);
    Ok(group)
}

/// Parent links of every page, for cycle checks and descendant walks.
pub(crate) fn page_links<T: ReadTxn>(txn: &T, pages: &ArrayRef) -> CycleGuard {
    CycleGuard::from_links(
        maps_in(txn, pages)
            .into_iter()
            .map(|(_, map)| (codec::entity_id(txn, &map), codec::parent_id(txn, &map))),
    )
}
