//! Page lifecycle: create, update, delete, reorder, duplicate, properties.

use serde_json::Value;
use tracing::debug;
use yrs::Array;

use super::locate::{self, Sibling};
use super::{StructureError, StructureStore};
use crate::Result;
use crate::clone::CloneOptions;
use crate::id::EntityKind;
use crate::model::codec::{self, keys};
use crate::model::{Page, PageUpdate, PropertyMap};
use crate::ordering::{check_index, renumber, shift_move};

impl StructureStore {
    /// Create a page as the last child of `parent_id` (or as the last root
    /// page when `None`).
    pub fn create_page(&self, name: &str, parent_id: Option<&str>) -> Result<Page> {
        self.create_page_at(name, parent_id, None)
    }

    /// Create a page at `index` among its siblings, or last when `None`.
    pub fn create_page_at(&self, name: &str, parent_id: Option<&str>, index: Option<i64>) -> Result<Page> {
        const OP: &str = "createPage";
        self.batch(OP, |txn| {
            if let Some(parent) = parent_id {
                locate::require_page(&*txn, &self.pages, OP, parent)?;
            }
            let group = locate::page_group(&*txn, &self.pages, parent_id);
            let at = match index {
                Some(index) => check_index(OP, index, group.len())?,
                None => group.len(),
            };

            let page = Page {
                id: self.ids.next_for(EntityKind::Page),
                parent_id: parent_id.map(str::to_string),
                name: name.to_string(),
                order: at as i64,
                blocks: Vec::new(),
                properties: PropertyMap::new(),
                created_at: self.clock.now_millis(),
            };
            let end = self.pages.len(&*txn);
            let map = codec::insert_page(txn, &self.pages, end, &page);
            let entry = Sibling {
                id: page.id.clone(),
                map,
                order: at as i64,
            };
            locate::insert_sibling(txn, OP, group, entry, at)?;
            debug!(page_id = %page.id, parent_id = ?parent_id, order = at, "Created page");
            Ok(page)
        })
    }

    /// Rename a page and/or merge properties into it.
    pub fn update_page(&self, id: &str, update: PageUpdate) -> Result<Page> {
        const OP: &str = "updatePage";
        self.batch(OP, |txn| {
            let slot = locate::require_page(&*txn, &self.pages, OP, id)?;
            if let Some(name) = &update.name {
                codec::set_string_if_changed(txn, &slot.map, keys::NAME, name);
            }
            if let Some(properties) = &update.properties {
                codec::merge_properties(txn, &slot.map, keys::PROPERTIES, properties);
            }
            Ok(codec::read_page(&*txn, &slot.map, slot.index as usize))
        })
    }

    /// Delete a page together with every page below it.
    ///
    /// Returns the ids of all removed pages, the requested page first.
    pub fn delete_page(&self, id: &str) -> Result<Vec<String>> {
        const OP: &str = "deletePage";
        self.batch(OP, |txn| {
            let slot = locate::require_page(&*txn, &self.pages, OP, id)?;
            let links = locate::page_links(&*txn, &self.pages);
            let mut removed = vec![id.to_string()];
            removed.extend(links.descendants(id));
            let siblings = locate::page_group(&*txn, &self.pages, slot.parent_id.as_deref());
            let siblings = locate::detach_sibling(OP, siblings, id)?;

            let mut indices: Vec<u32> = locate::maps_in(&*txn, &self.pages)
                .into_iter()
                .filter(|(_, map)| removed.contains(&codec::entity_id(&*txn, map)))
                .map(|(index, _)| index)
                .collect();
            indices.sort_unstable_by(|a, b| b.cmp(a));
            for index in indices {
                self.pages.remove(txn, index);
            }

            locate::write_orders(txn, &siblings);
            debug!(page_id = %id, removed = removed.len(), "Deleted page");
            Ok(removed)
        })
    }

    /// Move the root page at position `from` to position `to`.
    pub fn reorder_page(&self, from: i64, to: i64) -> Result<()> {
        self.reorder_pages_in(None, from, to)
    }

    /// Move the child of `parent_id` at position `from` to position `to`,
    /// shifting the siblings in between.
    pub fn reorder_pages_in(&self, parent_id: Option<&str>, from: i64, to: i64) -> Result<()> {
        const OP: &str = "reorderPage";
        self.batch(OP, |txn| {
            if let Some(parent) = parent_id {
                locate::require_page(&*txn, &self.pages, OP, parent)?;
            }
            let mut group = locate::page_group(&*txn, &self.pages, parent_id);
            reorder_group(OP, txn, &mut group, from, to)
        })
    }

    /// Duplicate a page with all its blocks, components and descendant
    /// pages. The copy gets fresh ids, its name gets the configured copy
    /// suffix, and it is placed directly after the original.
    pub fn clone_page(&self, id: &str) -> Result<Page> {
        const OP: &str = "clonePage";
        self.batch(OP, |txn| {
            let slot = locate::require_page(&*txn, &self.pages, OP, id)?;
            let all: Vec<Page> = locate::maps_in(&*txn, &self.pages)
                .into_iter()
                .map(|(index, map)| codec::read_page(&*txn, &map, index as usize))
                .collect();
            let source = all
                .iter()
                .find(|p| p.id == id)
                .ok_or_else(|| StructureError::not_found(OP, EntityKind::Page, id))?;

            let group = locate::page_group(&*txn, &self.pages, slot.parent_id.as_deref());
            let at = locate::position(&group, id)
                .map(|p| p + 1)
                .ok_or_else(|| StructureError::invariant(format!("{OP}: page '{id}' missing from its sibling group")))?;

            let mut copies = self
                .clone_engine()
                .clone_page_tree(source, &all, &CloneOptions::duplicate());
            if let Some(root) = copies.first_mut() {
                root.name.push_str(&self.config.copy_suffix);
                root.order = at as i64;
            }

            let root = copies
                .first()
                .cloned()
                .ok_or_else(|| StructureError::invariant(format!("{OP}: clone of '{id}' produced no pages")))?;

            let end = self.pages.len(&*txn);
            let root_map = codec::insert_page(txn, &self.pages, end, &root);
            for copy in copies.iter().skip(1) {
                let end = self.pages.len(&*txn);
                codec::insert_page(txn, &self.pages, end, copy);
            }
            let entry = Sibling {
                id: root.id.clone(),
                map: root_map,
                order: at as i64,
            };
            locate::insert_sibling(txn, OP, group, entry, at)?;
            debug!(source_id = %id, page_id = %root.id, "Cloned page");
            Ok(root)
        })
    }

    pub fn set_page_property(&self, id: &str, key: &str, value: Value) -> Result<()> {
        const OP: &str = "setPageProperty";
        self.batch(OP, |txn| {
            let slot = locate::require_page(&*txn, &self.pages, OP, id)?;
            let entry: PropertyMap = [(key.to_string(), value)].into_iter().collect();
            codec::merge_properties(txn, &slot.map, keys::PROPERTIES, &entry);
            Ok(())
        })
    }

    /// Remove a page property. Returns whether it existed.
    pub fn remove_page_property(&self, id: &str, key: &str) -> Result<bool> {
        const OP: &str = "removePageProperty";
        self.batch(OP, |txn| {
            let slot = locate::require_page(&*txn, &self.pages, OP, id)?;
            Ok(codec::remove_property(txn, &slot.map, keys::PROPERTIES, key))
        })
    }
}

/// Apply the shift rule to a sibling group and write the changed orders.
pub(super) fn reorder_group(
    operation: &'static str,
    txn: &mut yrs::TransactionMut,
    group: &mut [Sibling],
    from: i64,
    to: i64,
) -> std::result::Result<(), StructureError> {
    if group.is_empty() {
        return Err(StructureError::InvalidIndex {
            operation,
            index: from,
            len: 0,
        });
    }
    let from = check_index(operation, from, group.len() - 1)?;
    check_index(operation, to, group.len() - 1)?;
    renumber(group);
    shift_move(operation, group, from, to)?;
    locate::write_orders(txn, group);
    Ok(())
}
