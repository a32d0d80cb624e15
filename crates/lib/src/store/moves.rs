//! Relocation of pages, blocks and components.
//!
//! Page moves only rewrite `parentId` and `order`: pages live in one flat
//! sequence, so no container ever changes owner. Blocks and components do
//! change owner when they move to another page or block; those moves clone
//! the entity with its ids preserved, insert the clone into the destination
//! and delete the original, all in the same batch.

use tracing::debug;
use yrs::{Array, ArrayRef, MapRef, TransactionMut};

use super::locate::{self, PageSlot, Sibling};
use super::pages::reorder_group;
use super::{StructureError, StructureStore};
use crate::Result;
use crate::clone::CloneOptions;
use crate::model::codec::{self, keys};
use crate::model::{Block, Component, NewBlock, Page};
use crate::ordering::{check_index, renumber};

type OpResult<T> = std::result::Result<T, StructureError>;

/// Name given to the block created when a component is moved to a page
/// that has no blocks yet.
pub const DEFAULT_BLOCK_NAME: &str = "Untitled";

/// Where a page lands inside its destination sibling group.
#[derive(Debug, Clone, Copy)]
enum Placement<'a> {
    /// At a position of the destination group.
    Index(i64),
    /// After every existing sibling.
    End,
    /// Directly after the given sibling.
    After(&'a str),
}

impl StructureStore {
    /// Reparent a page and/or reposition it among its siblings.
    ///
    /// `new_parent_id == None` moves the page to root level. With
    /// `new_index == None` the page keeps its position when the parent is
    /// unchanged and goes last when the parent changes.
    pub fn move_page(&self, id: &str, new_parent_id: Option<&str>, new_index: Option<i64>) -> Result<Page> {
        const OP: &str = "movePage";
        self.batch(OP, |txn| {
            let page = locate::require_page(&*txn, &self.pages, OP, id)?;
            if let Some(parent) = new_parent_id {
                locate::require_page(&*txn, &self.pages, OP, parent)?;
            }
            locate::page_links(&*txn, &self.pages).validate_reparent(OP, id, new_parent_id)?;

            let placement = match new_index {
                Some(index) => Placement::Index(index),
                None if page.parent_id.as_deref() == new_parent_id => {
                    return Ok(codec::read_page(&*txn, &page.map, page.index as usize));
                }
                None => Placement::End,
            };
            self.place_page(txn, OP, &page, new_parent_id, placement)?;
            debug!(page_id = %id, parent_id = ?new_parent_id, index = ?new_index, "Moved page");
            Ok(codec::read_page(&*txn, &page.map, page.index as usize))
        })
    }

    /// Swap a page with its previous sibling. Returns `false` when the page
    /// is already first.
    pub fn move_page_prev(&self, id: &str) -> Result<bool> {
        self.swap_with_sibling("movePagePrev", id, -1)
    }

    /// Swap a page with its next sibling. Returns `false` when the page is
    /// already last.
    pub fn move_page_next(&self, id: &str) -> Result<bool> {
        self.swap_with_sibling("movePageNext", id, 1)
    }

    fn swap_with_sibling(&self, operation: &'static str, id: &str, step: i64) -> Result<bool> {
        self.batch(operation, |txn| {
            let page = locate::require_page(&*txn, &self.pages, operation, id)?;
            locate::page_links(&*txn, &self.pages).validate_reparent(
                operation,
                id,
                page.parent_id.as_deref(),
            )?;
            let mut group = locate::page_group(&*txn, &self.pages, page.parent_id.as_deref());
            let from = locate::position(&group, id).ok_or_else(|| missing_from_group(operation, id))?;
            let to = from as i64 + step;
            if to < 0 || to >= group.len() as i64 {
                return Ok(false);
            }
            renumber(&mut group);
            group.swap(from, to as usize);
            renumber(&mut group);
            locate::write_orders(txn, &group);
            debug!(page_id = %id, operation, "Swapped page with sibling");
            Ok(true)
        })
    }

    /// Outdent: the page becomes the next sibling of its current parent.
    /// Returns `false` for a root page.
    pub fn move_page_left(&self, id: &str) -> Result<bool> {
        const OP: &str = "movePageLeft";
        self.batch(OP, |txn| {
            let page = locate::require_page(&*txn, &self.pages, OP, id)?;
            let Some(parent_id) = page.parent_id.clone() else {
                return Ok(false);
            };
            let parent = locate::require_page(&*txn, &self.pages, OP, &parent_id)?;
            let grandparent = parent.parent_id.as_deref();
            locate::page_links(&*txn, &self.pages).validate_reparent(OP, id, grandparent)?;
            self.place_page(txn, OP, &page, grandparent, Placement::After(&parent_id))?;
            debug!(page_id = %id, parent_id = ?grandparent, "Outdented page");
            Ok(true)
        })
    }

    /// Indent: the page becomes the last child of its previous sibling.
    /// Returns `false` when the page is first among its siblings.
    pub fn move_page_right(&self, id: &str) -> Result<bool> {
        const OP: &str = "movePageRight";
        self.batch(OP, |txn| {
            let page = locate::require_page(&*txn, &self.pages, OP, id)?;
            let group = locate::page_group(&*txn, &self.pages, page.parent_id.as_deref());
            let position = locate::position(&group, id).ok_or_else(|| missing_from_group(OP, id))?;
            let Some(previous) = position.checked_sub(1).map(|p| group[p].id.clone()) else {
                return Ok(false);
            };
            locate::page_links(&*txn, &self.pages).validate_reparent(OP, id, Some(&previous))?;
            self.place_page(txn, OP, &page, Some(&previous), Placement::End)?;
            debug!(page_id = %id, parent_id = %previous, "Indented page");
            Ok(true)
        })
    }

    /// Drop a page onto another page.
    ///
    /// When the target already has children the page becomes its first
    /// child; otherwise it becomes the target's next sibling. The moved page
    /// counts as a child, so dropping a first child onto its own parent
    /// changes nothing.
    pub fn move_page_to_target(&self, id: &str, target_id: &str) -> Result<Page> {
        const OP: &str = "movePageToTarget";
        self.batch(OP, |txn| {
            let page = locate::require_page(&*txn, &self.pages, OP, id)?;
            let target = locate::require_page(&*txn, &self.pages, OP, target_id)?;
            let links = locate::page_links(&*txn, &self.pages);
            if id == target_id {
                links.validate_reparent(OP, id, Some(target_id))?;
            }

            let has_children = !locate::page_group(&*txn, &self.pages, Some(target_id)).is_empty();
            if has_children {
                links.validate_reparent(OP, id, Some(target_id))?;
                self.place_page(txn, OP, &page, Some(target_id), Placement::Index(0))?;
            } else {
                let parent = target.parent_id.as_deref();
                links.validate_reparent(OP, id, parent)?;
                self.place_page(txn, OP, &page, parent, Placement::After(target_id))?;
            }
            debug!(page_id = %id, target_id, first_child = has_children, "Moved page to target");
            Ok(codec::read_page(&*txn, &page.map, page.index as usize))
        })
    }

    /// Put `page` into the sibling group of `new_parent` at `placement` and
    /// renumber every group it left or entered. The reparent must already
    /// have passed the cycle guard; the remaining validation happens here
    /// before any write.
    fn place_page(
        &self,
        txn: &mut TransactionMut,
        operation: &'static str,
        page: &PageSlot,
        new_parent: Option<&str>,
        placement: Placement<'_>,
    ) -> OpResult<()> {
        let same_parent = page.parent_id.as_deref() == new_parent;

        if same_parent {
            let mut group = locate::page_group(&*txn, &self.pages, new_parent);
            let from = locate::position(&group, &page.id).ok_or_else(|| missing_from_group(operation, &page.id))?;
            let to = match placement {
                Placement::Index(index) => index,
                Placement::End => group.len() as i64 - 1,
                Placement::After(sibling) => {
                    let at = locate::position(&group, sibling)
                        .ok_or_else(|| missing_from_group(operation, sibling))?;
                    if at < from { at as i64 + 1 } else { at as i64 }
                }
            };
            return reorder_group(operation, txn, &mut group, from as i64, to);
        }

        let target: Vec<_> = locate::page_group(&*txn, &self.pages, new_parent)
            .into_iter()
            .filter(|s| s.id != page.id)
            .collect();
        let at = match placement {
            Placement::Index(index) => check_index(operation, index, target.len())?,
            Placement::End => target.len(),
            Placement::After(sibling) => {
                locate::position(&target, sibling).ok_or_else(|| missing_from_group(operation, sibling))? + 1
            }
        };

        let source = locate::page_group(&*txn, &self.pages, page.parent_id.as_deref());
        let source = locate::detach_sibling(operation, source, &page.id)?;
        locate::write_orders(txn, &source);

        codec::set_parent(txn, &page.map, new_parent);
        let entry = Sibling {
            id: page.id.clone(),
            map: page.map.clone(),
            order: at as i64,
        };
        locate::insert_sibling(txn, operation, target, entry, at)
    }

    // -----------------------------------------------------------------------
    // Cross-container moves
    // -----------------------------------------------------------------------

    /// Move a block to another page, at `index` or last.
    ///
    /// Moving within the same page with an index repositions the block.
    pub fn move_block_to_page(&self, block_id: &str, page_id: &str, index: Option<i64>) -> Result<Block> {
        const OP: &str = "moveBlockToPage";
        self.batch(OP, |txn| {
            let slot = locate::require_block(&*txn, &self.pages, OP, block_id)?;
            let target = locate::require_page(&*txn, &self.pages, OP, page_id)?;

            if slot.page_id == page_id {
                if let Some(index) = index {
                    let mut group = locate::item_group(&*txn, Some(&slot.blocks));
                    let from = locate::position(&group, block_id)
                        .ok_or_else(|| missing_from_group(OP, block_id))?;
                    reorder_group(OP, txn, &mut group, from as i64, index)?;
                }
                return Ok(codec::read_block(&*txn, &slot.map, slot.index as usize, &slot.page_id));
            }

            let destination = codec::get_array(&*txn, &target.map, keys::BLOCKS);
            let target_len = locate::item_group(&*txn, destination.as_ref()).len();
            let at = match index {
                Some(index) => check_index(OP, index, target_len)?,
                None => target_len,
            };

            let original = codec::read_block(&*txn, &slot.map, slot.index as usize, &slot.page_id);
            let mut moved = self
                .clone_engine()
                .clone_for_relocation(&original, CloneOptions::relocation().with_parent(page_id));
            moved.order = at as i64;

            settle_source(txn, OP, &slot.blocks, block_id)?;
            let destination = codec::ensure_array(txn, &target.map, keys::BLOCKS);
            let map = insert_last(txn, &destination, |txn, blocks, end| {
                codec::insert_block(txn, blocks, end, &moved)
            });
            slot.blocks.remove(txn, slot.index);
            settle_destination(txn, OP, &destination, &map, block_id, at)?;
            debug!(block_id, from_page = %slot.page_id, to_page = %page_id, order = at, "Moved block");
            Ok(moved)
        })
    }

    /// Move a component to another block, at `index` or last. The
    /// component's `blockId` and `pageId` follow the destination.
    pub fn move_component_to_block(
        &self,
        component_id: &str,
        block_id: &str,
        index: Option<i64>,
    ) -> Result<Component> {
        const OP: &str = "moveComponentToBlock";
        self.batch(OP, |txn| {
            let target = locate::require_block(&*txn, &self.pages, OP, block_id)?;
            self.move_component_in(txn, OP, component_id, &target.map, block_id, &target.page_id, index)
        })
    }

    /// Move a component into the first block of a page.
    ///
    /// When the page has no blocks, a block named [`DEFAULT_BLOCK_NAME`] is
    /// created to receive it.
    pub fn move_component_to_page(
        &self,
        component_id: &str,
        page_id: &str,
        index: Option<i64>,
    ) -> Result<Component> {
        const OP: &str = "moveComponentToPage";
        self.batch(OP, |txn| {
            locate::require_component(&*txn, &self.pages, OP, component_id)?;
            let page = locate::require_page(&*txn, &self.pages, OP, page_id)?;
            let blocks = codec::get_array(&*txn, &page.map, keys::BLOCKS);
            let first = locate::item_group(&*txn, blocks.as_ref()).into_iter().next();

            let (block_map, block_id) = match first {
                Some(block) => (block.map, block.id),
                None => {
                    if let Some(index) = index {
                        check_index(OP, index, 0)?;
                    }
                    let block = self.new_block_record(page_id, NewBlock::named(DEFAULT_BLOCK_NAME), 0);
                    let blocks = codec::ensure_array(txn, &page.map, keys::BLOCKS);
                    let map = insert_last(txn, &blocks, |txn, blocks, end| {
                        codec::insert_block(txn, blocks, end, &block)
                    });
                    debug!(block_id = %block.id, page_id, "Created default block");
                    (map, block.id)
                }
            };
            self.move_component_in(txn, OP, component_id, &block_map, &block_id, page_id, index)
        })
    }

    /// Shared body of the component moves. Validates before writing.
    #[allow(clippy::too_many_arguments)]
    fn move_component_in(
        &self,
        txn: &mut TransactionMut,
        operation: &'static str,
        component_id: &str,
        block_map: &MapRef,
        block_id: &str,
        page_id: &str,
        index: Option<i64>,
    ) -> OpResult<Component> {
        let slot = locate::require_component(&*txn, &self.pages, operation, component_id)?;

        if slot.block_id == block_id {
            if let Some(index) = index {
                let mut group = locate::item_group(&*txn, Some(&slot.components));
                let from = locate::position(&group, component_id)
                    .ok_or_else(|| missing_from_group(operation, component_id))?;
                reorder_group(operation, txn, &mut group, from as i64, index)?;
            }
            return Ok(codec::read_component(
                &*txn,
                &slot.map,
                slot.index as usize,
                &slot.block_id,
                &slot.page_id,
            ));
        }

        let destination = codec::get_array(&*txn, block_map, keys::COMPONENTS);
        let target_len = locate::item_group(&*txn, destination.as_ref()).len();
        let at = match index {
            Some(index) => check_index(operation, index, target_len)?,
            None => target_len,
        };

        let original = codec::read_component(
            &*txn,
            &slot.map,
            slot.index as usize,
            &slot.block_id,
            &slot.page_id,
        );
        let mut moved = self.clone_engine().clone_for_relocation(
            &original,
            CloneOptions::relocation()
                .with_parent(block_id)
                .with_page(page_id),
        );
        moved.order = at as i64;

        settle_source(txn, operation, &slot.components, component_id)?;
        let destination = codec::ensure_array(txn, block_map, keys::COMPONENTS);
        let map = insert_last(txn, &destination, |txn, components, end| {
            codec::insert_component(txn, components, end, &moved)
        });
        slot.components.remove(txn, slot.index);
        settle_destination(txn, operation, &destination, &map, component_id, at)?;
        debug!(
            component_id,
            from_block = %slot.block_id,
            to_block = %block_id,
            order = at,
            "Moved component"
        );
        Ok(moved)
    }
}

fn missing_from_group(operation: &'static str, id: &str) -> StructureError {
    StructureError::invariant(format!("{operation}: '{id}' missing from its sibling group"))
}

/// Insert at the end of `array` through `write`, returning the new map.
pub(super) fn insert_last(
    txn: &mut TransactionMut,
    array: &ArrayRef,
    write: impl FnOnce(&mut TransactionMut, &ArrayRef, u32) -> MapRef,
) -> MapRef {
    let end = array.len(&*txn);
    write(txn, array, end)
}

/// Close the gap `id` is about to leave in `array`. Call before removing
/// the entity's map.
pub(super) fn settle_source(
    txn: &mut TransactionMut,
    operation: &'static str,
    array: &ArrayRef,
    id: &str,
) -> OpResult<()> {
    let group = locate::detach_sibling(operation, locate::item_group(&*txn, Some(array)), id)?;
    locate::write_orders(txn, &group);
    Ok(())
}

/// Give the newly inserted entity order `at` and shift the siblings from
/// `at` onwards.
pub(super) fn settle_destination(
    txn: &mut TransactionMut,
    operation: &'static str,
    array: &ArrayRef,
    map: &MapRef,
    id: &str,
    at: usize,
) -> OpResult<()> {
    let group: Vec<_> = locate::item_group(&*txn, Some(array))
        .into_iter()
        .filter(|s| s.id != id)
        .collect();
    let entry = Sibling {
        id: id.to_string(),
        map: map.clone(),
        order: at as i64,
    };
    locate::insert_sibling(txn, operation, group, entry, at)
}

