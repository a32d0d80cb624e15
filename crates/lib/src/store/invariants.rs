//! Whole-tree consistency check.

use std::collections::{BTreeMap, HashSet};

use super::{StructureError, StructureStore, locate};
use crate::model::codec;
use crate::model::Page;
use crate::ordering::is_dense;

impl StructureStore {
    /// Verify the committed tree:
    ///
    /// * every id is non-empty and unique across pages, blocks and components,
    /// * every `parentId` names an existing page and no parent chain loops,
    /// * every sibling group's orders are exactly `0..n`,
    /// * every block and component records the container that holds it.
    ///
    /// The first violation found is reported.
    pub fn check_invariants(&self) -> crate::Result<()> {
        self.collect_violations()
            .into_iter()
            .next()
            .map_or(Ok(()), |reason| Err(StructureError::invariant(reason).into()))
    }

    /// Every violation found, as human readable reasons.
    pub fn collect_violations(&self) -> Vec<String> {
        let pages: Vec<Page> = self.read(|txn| {
            locate::maps_in(txn, &self.pages)
                .into_iter()
                .map(|(index, map)| {
                    let mut page = codec::read_page(txn, &map, index as usize);
                    // Order fallbacks would hide missing fields.
                    if codec::get_i64(txn, &map, codec::keys::ORDER).is_none() {
                        page.order = -1;
                    }
                    page
                })
                .collect()
        });
        let mut violations = Vec::new();

        let mut seen = HashSet::new();
        let mut check_id = |kind: &str, id: &str, violations: &mut Vec<String>| {
            if id.is_empty() {
                violations.push(format!("{kind} without id"));
            } else if !seen.insert(id.to_string()) {
                violations.push(format!("duplicate id '{id}'"));
            }
        };
        for page in &pages {
            check_id("page", &page.id, &mut violations);
            for block in &page.blocks {
                check_id("block", &block.id, &mut violations);
                for component in &block.components {
                    check_id("component", &component.id, &mut violations);
                }
            }
        }

        let links = crate::cycle::CycleGuard::from_links(
            pages.iter().map(|p| (p.id.clone(), p.parent_id.clone())),
        );
        for page in &pages {
            if let Some(parent) = &page.parent_id {
                if !links.contains(parent) {
                    violations.push(format!("page '{}' has missing parent '{parent}'", page.id));
                }
            }
        }
        if let Some(id) = links.find_cycle() {
            violations.push(format!("page '{id}' is its own ancestor"));
        }

        let mut page_groups: BTreeMap<Option<&str>, Vec<i64>> = BTreeMap::new();
        for page in &pages {
            page_groups
                .entry(page.parent_id.as_deref())
                .or_default()
                .push(page.order);
        }
        for (parent, orders) in &page_groups {
            if !is_dense(orders.iter().copied()) {
                violations.push(format!(
                    "pages under {} have orders {orders:?}",
                    parent.unwrap_or("root")
                ));
            }
        }

        for page in &pages {
            if !is_dense(page.blocks.iter().map(|b| b.order)) {
                violations.push(format!("blocks of page '{}' are not densely ordered", page.id));
            }
            for block in &page.blocks {
                if block.page_id != page.id {
                    violations.push(format!(
                        "block '{}' records page '{}' but lives in '{}'",
                        block.id, block.page_id, page.id
                    ));
                }
                if !is_dense(block.components.iter().map(|c| c.order)) {
                    violations.push(format!(
                        "components of block '{}' are not densely ordered",
                        block.id
                    ));
                }
                for component in &block.components {
                    if component.block_id != block.id || component.page_id != page.id {
                        violations.push(format!(
                            "component '{}' records block '{}' on page '{}' but lives in block '{}' on page '{}'",
                            component.id, component.block_id, component.page_id, block.id, page.id
                        ));
                    }
                }
            }
        }
        violations
    }
}
