//! Component lifecycle and locking.

use tracing::debug;
use yrs::{Array, GetString};

use super::locate;
use super::moves::{insert_last, settle_destination, settle_source};
use super::pages::reorder_group;
use super::{StructureError, StructureStore};
use crate::Result;
use crate::id::EntityKind;
use crate::model::codec::{self, keys};
use crate::model::{ClientRef, Component, ComponentUpdate, NewComponent};
use crate::ordering::check_index;

impl StructureStore {
    /// Add a component to a block at `index`, or last when `None`.
    pub fn create_component(
        &self,
        block_id: &str,
        component: NewComponent,
        index: Option<i64>,
    ) -> Result<Component> {
        const OP: &str = "createComponent";
        self.batch(OP, |txn| {
            let block = locate::require_block(&*txn, &self.pages, OP, block_id)?;
            let existing = codec::get_array(&*txn, &block.map, keys::COMPONENTS);
            let len = locate::item_group(&*txn, existing.as_ref()).len();
            let at = match index {
                Some(index) => check_index(OP, index, len)?,
                None => len,
            };

            let now = self.clock.now_millis();
            let record = Component {
                id: self.ids.next_for(EntityKind::Component),
                block_id: block_id.to_string(),
                page_id: block.page_id.clone(),
                component_type: component.component_type,
                order: at as i64,
                rich_text: component.rich_text,
                json_properties: component.json_properties,
                title: component.title,
                subtitle: component.subtitle,
                instructions: component.instructions,
                feedback: component.feedback,
                lock_owner: None,
                created_at: now,
                updated_at: now,
            };
            let components = codec::ensure_array(txn, &block.map, keys::COMPONENTS);
            let map = insert_last(txn, &components, |txn, components, end| {
                codec::insert_component(txn, components, end, &record)
            });
            settle_destination(txn, OP, &components, &map, &record.id, at)?;
            debug!(component_id = %record.id, block_id, order = at, "Created component");
            Ok(record)
        })
    }

    /// Apply field changes to a component. `updatedAt` is refreshed when
    /// anything actually changed.
    pub fn update_component(&self, id: &str, update: ComponentUpdate) -> Result<Component> {
        const OP: &str = "updateComponent";
        self.batch(OP, |txn| {
            let slot = locate::require_component(&*txn, &self.pages, OP, id)?;
            let map = &slot.map;
            let mut changed = false;

            let fields = [
                (keys::TYPE, &update.component_type),
                (keys::TITLE, &update.title),
                (keys::SUBTITLE, &update.subtitle),
                (keys::INSTRUCTIONS, &update.instructions),
                (keys::FEEDBACK, &update.feedback),
            ];
            for (key, value) in fields {
                if let Some(value) = value {
                    changed |= codec::set_string_if_changed(txn, map, key, value);
                }
            }
            if let Some(text) = &update.rich_text {
                let current = codec::get_text(&*txn, map, keys::RICH_TEXT).map(|t| t.get_string(&*txn));
                if current.as_deref() != Some(text.as_str()) {
                    codec::replace_text(txn, map, keys::RICH_TEXT, text);
                    changed = true;
                }
            }
            if let Some(properties) = &update.json_properties {
                changed |= codec::merge_properties(txn, map, keys::JSON_PROPERTIES, properties) > 0;
            }
            if changed {
                codec::set_number(txn, map, keys::UPDATED_AT, self.clock.now_millis() as i64);
            }
            Ok(codec::read_component(
                &*txn,
                map,
                slot.index as usize,
                &slot.block_id,
                &slot.page_id,
            ))
        })
    }

    pub fn delete_component(&self, id: &str) -> Result<()> {
        const OP: &str = "deleteComponent";
        self.batch(OP, |txn| {
            let slot = locate::require_component(&*txn, &self.pages, OP, id)?;
            settle_source(txn, OP, &slot.components, id)?;
            slot.components.remove(txn, slot.index);
            debug!(component_id = %id, block_id = %slot.block_id, "Deleted component");
            Ok(())
        })
    }

    /// Move a component to position `new_index` within its block.
    pub fn reorder_component(&self, id: &str, new_index: i64) -> Result<()> {
        const OP: &str = "reorderComponent";
        self.batch(OP, |txn| {
            let slot = locate::require_component(&*txn, &self.pages, OP, id)?;
            let mut group = locate::item_group(&*txn, Some(&slot.components));
            let from = locate::position(&group, id).ok_or_else(|| {
                StructureError::invariant(format!("{OP}: component '{id}' missing from its block"))
            })?;
            reorder_group(OP, txn, &mut group, from as i64, new_index)
        })
    }

    /// Set or clear the lock owner of a component.
    pub fn set_component_lock(&self, id: &str, owner: Option<ClientRef>) -> Result<Component> {
        const OP: &str = "setComponentLock";
        self.batch(OP, |txn| {
            let slot = locate::require_component(&*txn, &self.pages, OP, id)?;
            codec::set_lock_owner(txn, &slot.map, owner.as_ref());
            debug!(component_id = %id, owner = ?owner.as_ref().map(|o| &o.client_id), "Set component lock");
            Ok(codec::read_component(
                &*txn,
                &slot.map,
                slot.index as usize,
                &slot.block_id,
                &slot.page_id,
            ))
        })
    }

    /// Lock a component for this client.
    pub fn lock_component_for_self(&self, id: &str) -> Result<Component> {
        self.set_component_lock(id, Some(self.config.client_ref()))
    }
}
