//! Block lifecycle.

use serde_json::Value;
use tracing::debug;
use yrs::Array;

use super::locate;
use super::moves::{insert_last, settle_destination, settle_source};
use super::pages::reorder_group;
use super::{StructureError, StructureStore};
use crate::Result;
use crate::id::EntityKind;
use crate::model::codec::{self, keys};
use crate::model::{Block, BlockUpdate, NewBlock, PropertyMap};
use crate::ordering::check_index;

impl StructureStore {
    /// Add a block to a page at `index`, or last when `None`.
    pub fn create_block(&self, page_id: &str, block: NewBlock, index: Option<i64>) -> Result<Block> {
        const OP: &str = "createBlock";
        self.batch(OP, |txn| {
            let page = locate::require_page(&*txn, &self.pages, OP, page_id)?;
            let existing = codec::get_array(&*txn, &page.map, keys::BLOCKS);
            let len = locate::item_group(&*txn, existing.as_ref()).len();
            let at = match index {
                Some(index) => check_index(OP, index, len)?,
                None => len,
            };

            let record = self.new_block_record(page_id, block, at as i64);
            let blocks = codec::ensure_array(txn, &page.map, keys::BLOCKS);
            let map = insert_last(txn, &blocks, |txn, blocks, end| {
                codec::insert_block(txn, blocks, end, &record)
            });
            settle_destination(txn, OP, &blocks, &map, &record.id, at)?;
            debug!(block_id = %record.id, page_id, order = at, "Created block");
            Ok(record)
        })
    }

    pub(super) fn new_block_record(&self, page_id: &str, block: NewBlock, order: i64) -> Block {
        Block {
            id: self.ids.next_for(EntityKind::Block),
            page_id: page_id.to_string(),
            name: block.name,
            icon_name: block.icon_name,
            block_type: block.block_type,
            order,
            components: Vec::new(),
            properties: block.properties,
            created_at: self.clock.now_millis(),
        }
    }

    pub fn update_block(&self, id: &str, update: BlockUpdate) -> Result<Block> {
        const OP: &str = "updateBlock";
        self.batch(OP, |txn| {
            let slot = locate::require_block(&*txn, &self.pages, OP, id)?;
            if let Some(name) = &update.name {
                codec::set_string_if_changed(txn, &slot.map, keys::NAME, name);
            }
            if let Some(icon) = &update.icon_name {
                codec::set_string_if_changed(txn, &slot.map, keys::ICON_NAME, icon);
            }
            if let Some(block_type) = &update.block_type {
                codec::set_string_if_changed(txn, &slot.map, keys::BLOCK_TYPE, block_type);
            }
            if let Some(properties) = &update.properties {
                codec::merge_properties(txn, &slot.map, keys::PROPERTIES, properties);
            }
            Ok(codec::read_block(&*txn, &slot.map, slot.index as usize, &slot.page_id))
        })
    }

    /// Remove a block and its components.
    pub fn delete_block(&self, id: &str) -> Result<()> {
        const OP: &str = "deleteBlock";
        self.batch(OP, |txn| {
            let slot = locate::require_block(&*txn, &self.pages, OP, id)?;
            settle_source(txn, OP, &slot.blocks, id)?;
            slot.blocks.remove(txn, slot.index);
            debug!(block_id = %id, page_id = %slot.page_id, "Deleted block");
            Ok(())
        })
    }

    /// Move a block to position `new_index` within its page.
    pub fn update_block_order(&self, id: &str, new_index: i64) -> Result<()> {
        const OP: &str = "updateBlockOrder";
        self.batch(OP, |txn| {
            let slot = locate::require_block(&*txn, &self.pages, OP, id)?;
            let mut group = locate::item_group(&*txn, Some(&slot.blocks));
            let from = locate::position(&group, id)
                .ok_or_else(|| StructureError::invariant(format!("{OP}: block '{id}' missing from its page")))?;
            reorder_group(OP, txn, &mut group, from as i64, new_index)
        })
    }

    /// Duplicate a block with its components, directly after the original.
    pub fn clone_block(&self, id: &str) -> Result<Block> {
        const OP: &str = "cloneBlock";
        self.batch(OP, |txn| {
            let slot = locate::require_block(&*txn, &self.pages, OP, id)?;
            let group = locate::item_group(&*txn, Some(&slot.blocks));
            let at = locate::position(&group, id)
                .map(|p| p + 1)
                .ok_or_else(|| StructureError::invariant(format!("{OP}: block '{id}' missing from its page")))?;

            let original = codec::read_block(&*txn, &slot.map, slot.index as usize, &slot.page_id);
            let mut copy = self.clone_engine().duplicate(&original);
            copy.name.push_str(&self.config.copy_suffix);
            copy.order = at as i64;

            let map = insert_last(txn, &slot.blocks, |txn, blocks, end| {
                codec::insert_block(txn, blocks, end, &copy)
            });
            settle_destination(txn, OP, &slot.blocks, &map, &copy.id, at)?;
            debug!(source_id = %id, block_id = %copy.id, "Cloned block");
            Ok(copy)
        })
    }

    pub fn set_block_property(&self, id: &str, key: &str, value: Value) -> Result<()> {
        const OP: &str = "setBlockProperty";
        self.batch(OP, |txn| {
            let slot = locate::require_block(&*txn, &self.pages, OP, id)?;
            let entry: PropertyMap = [(key.to_string(), value)].into_iter().collect();
            codec::merge_properties(txn, &slot.map, keys::PROPERTIES, &entry);
            Ok(())
        })
    }

    /// Remove a block property. Returns whether it existed.
    pub fn remove_block_property(&self, id: &str, key: &str) -> Result<bool> {
        const OP: &str = "removeBlockProperty";
        self.batch(OP, |txn| {
            let slot = locate::require_block(&*txn, &self.pages, OP, id)?;
            Ok(codec::remove_property(txn, &slot.map, keys::PROPERTIES, key))
        })
    }
}
