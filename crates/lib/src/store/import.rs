//! Import of externally produced page descriptors.
//!
//! Descriptors translate one to one into pages, blocks and components. All
//! of them are written in one batch after the whole input has been
//! validated: parent references must resolve, ids must not collide, and the
//! resulting parent links must stay acyclic.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;
use yrs::Array;

use super::{StructureError, StructureStore, locate};
use crate::Result;
use crate::cycle::CycleGuard;
use crate::id::EntityKind;
use crate::model::codec;
use crate::model::{Block, Component, Ordered, Page, PropertyMap};
use crate::ordering::renumber;

/// `parentRef` value meaning "root level".
pub const ROOT_REF: &str = "root";

/// A page as produced by an import source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPage {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// Parent page id; `"root"` or absent means root level.
    #[serde(default)]
    pub parent_ref: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub blocks: Vec<ImportBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBlock {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub icon_name: String,
    #[serde(default)]
    pub block_type: String,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub components: Vec<ImportComponent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportComponent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub order: Option<i64>,
    /// Body text, stored as the component's rich text.
    #[serde(default)]
    pub html_body: String,
    #[serde(default)]
    pub json_properties: PropertyMap,
    /// Extra properties; merged into `jsonProperties` without overriding
    /// keys already present there.
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub feedback: String,
}

impl ImportPage {
    fn parent(&self) -> Option<&str> {
        self.parent_ref
            .as_deref()
            .filter(|p| !p.is_empty() && *p != ROOT_REF)
    }
}

impl StructureStore {
    /// Import page descriptors in one batch. Returns the ids of the imported
    /// pages in input order.
    pub fn import_pages(&self, descriptors: Vec<ImportPage>) -> Result<Vec<String>> {
        const OP: &str = "importPages";
        let count = descriptors.len();
        let ids = self.batch(OP, |txn| {
            let mut links = locate::page_links(&*txn, &self.pages);
            let mut taken = self.existing_ids(&*txn);

            let pages: Vec<Page> = descriptors
                .into_iter()
                .enumerate()
                .map(|(position, descriptor)| self.page_from_import(descriptor, position))
                .collect();

            // Validate before writing anything.
            for page in &pages {
                for id in page_ids(page) {
                    if !taken.insert(id.to_string()) {
                        return Err(StructureError::invariant(format!(
                            "{OP}: id '{id}' already exists"
                        )));
                    }
                }
                links.set_parent(&page.id, page.parent_id.as_deref());
            }
            for page in &pages {
                if let Some(parent) = &page.parent_id {
                    if !links.contains(parent) {
                        return Err(StructureError::not_found(OP, EntityKind::Page, parent.clone()));
                    }
                }
            }
            if let Some(id) = cycle_among(&links, &pages) {
                return Err(StructureError::Cycle {
                    operation: OP,
                    page_id: id.clone(),
                    target_id: id,
                });
            }

            for page in &pages {
                let end = self.pages.len(&*txn);
                codec::insert_page(txn, &self.pages, end, page);
            }
            // Imported pages follow the siblings that were already there.
            let imported: HashSet<&str> = pages.iter().map(|p| p.id.as_str()).collect();
            let parents: BTreeSet<Option<&str>> = pages.iter().map(|p| p.parent_id.as_deref()).collect();
            for parent in parents {
                let (mut group, incoming): (Vec<_>, Vec<_>) = locate::page_group(&*txn, &self.pages, parent)
                    .into_iter()
                    .partition(|s| !imported.contains(s.id.as_str()));
                group.extend(incoming);
                renumber(&mut group);
                locate::write_orders(txn, &group);
            }
            Ok(pages.into_iter().map(|p| p.id).collect::<Vec<_>>())
        })?;
        info!(pages = count, "Imported pages");
        Ok(ids)
    }

    fn existing_ids<T: yrs::ReadTxn>(&self, txn: &T) -> HashSet<String> {
        let mut ids = HashSet::new();
        for (index, map) in locate::maps_in(txn, &self.pages) {
            let page = codec::read_page(txn, &map, index as usize);
            ids.extend(page_ids(&page).map(str::to_string));
        }
        ids
    }

    fn page_from_import(&self, descriptor: ImportPage, position: usize) -> Page {
        let id = descriptor
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.ids.next_for(EntityKind::Page));
        let parent_id = descriptor.parent().map(str::to_string);
        let now = self.clock.now_millis();

        let mut blocks: Vec<Block> = descriptor
            .blocks
            .into_iter()
            .enumerate()
            .map(|(position, block)| self.block_from_import(block, position, &id, now))
            .collect();
        dense(&mut blocks);

        Page {
            parent_id,
            name: descriptor.name,
            order: descriptor.order.unwrap_or(position as i64),
            blocks,
            properties: descriptor.properties,
            created_at: now,
            id,
        }
    }

    fn block_from_import(&self, block: ImportBlock, position: usize, page_id: &str, now: u64) -> Block {
        let id = block
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.ids.next_for(EntityKind::Block));
        let mut components: Vec<Component> = block
            .components
            .into_iter()
            .enumerate()
            .map(|(position, component)| {
                self.component_from_import(component, position, &id, page_id, now)
            })
            .collect();
        dense(&mut components);

        Block {
            page_id: page_id.to_string(),
            name: block.name,
            icon_name: block.icon_name,
            block_type: block.block_type,
            order: block.order.unwrap_or(position as i64),
            components,
            properties: block.properties,
            created_at: now,
            id,
        }
    }

    fn component_from_import(
        &self,
        component: ImportComponent,
        position: usize,
        block_id: &str,
        page_id: &str,
        now: u64,
    ) -> Component {
        let mut json_properties = component.json_properties;
        for (key, value) in component.properties {
            json_properties.entry(key).or_insert(value);
        }
        Component {
            id: component
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| self.ids.next_for(EntityKind::Component)),
            block_id: block_id.to_string(),
            page_id: page_id.to_string(),
            component_type: component.component_type,
            order: component.order.unwrap_or(position as i64),
            rich_text: component.html_body,
            json_properties,
            title: component.title,
            subtitle: component.subtitle,
            instructions: component.instructions,
            feedback: component.feedback,
            lock_owner: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sort by the requested order, ties in input order, then number densely.
fn dense<E: Ordered>(items: &mut [E]) {
    items.sort_by_key(|item| item.order());
    renumber(items);
}

/// Every id carried by a page record, its own first.
fn page_ids(page: &Page) -> impl Iterator<Item = &str> {
    std::iter::once(page.id.as_str()).chain(page.blocks.iter().flat_map(|block| {
        std::iter::once(block.id.as_str()).chain(block.components.iter().map(|c| c.id.as_str()))
    }))
}

/// An imported page whose parent chain loops back to itself.
fn cycle_among(links: &CycleGuard, pages: &[Page]) -> Option<String> {
    pages
        .iter()
        .find(|page| {
            page.parent_id
                .as_deref()
                .is_some_and(|parent| links.is_descendant(&page.id, parent))
        })
        .map(|page| page.id.clone())
}
