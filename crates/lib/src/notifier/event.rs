//! Typed change payloads delivered to listeners.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::codec::keys;

/// One step of a path from the `pages` root into the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PathSegment {
    Key(String),
    Index(u32),
}

impl PathSegment {
    fn is_key(&self, key: &str) -> bool {
        matches!(self, PathSegment::Key(k) if k == key)
    }
}

/// Whether a change altered containment/ordering or only content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Structural,
    Content,
}

/// A single changed container inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePath {
    /// Path from the `pages` root to the changed container. Empty for the
    /// root sequence itself.
    pub segments: Vec<PathSegment>,
    pub kind: ChangeKind,
    /// Keys that changed, when the container is a map.
    pub keys: Vec<String>,
    /// The page owning the changed container, resolved from the root-level
    /// index segment.
    pub page_id: Option<String>,
}

impl ChangePath {
    /// True when the change lies inside (or creates) a blocks or components
    /// sequence.
    pub fn touches_blocks_or_components(&self) -> bool {
        let container_keys = [keys::BLOCKS, keys::COMPONENTS];
        self.segments
            .iter()
            .any(|s| container_keys.iter().any(|k| s.is_key(k)))
            || self
                .keys
                .iter()
                .any(|k| container_keys.contains(&k.as_str()))
    }

    /// Index of the page in the root sequence, when the path has one.
    pub fn root_index(&self) -> Option<u32> {
        match self.segments.first() {
            Some(PathSegment::Index(index)) => Some(*index),
            _ => None,
        }
    }

    /// Classify a map change by the keys it touched.
    pub(crate) fn kind_for_keys(changed: &[String]) -> ChangeKind {
        let structural = [keys::ORDER, keys::PARENT_ID, keys::BLOCKS, keys::COMPONENTS];
        if changed.iter().any(|k| structural.contains(&k.as_str())) {
            ChangeKind::Structural
        } else {
            ChangeKind::Content
        }
    }
}

/// A page taken out of the root sequence by a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemovedPage {
    pub id: String,
    /// The page still held blocks when it was removed.
    pub had_blocks: bool,
}

/// Everything one committed batch changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralChange {
    pub paths: Vec<ChangePath>,
    /// True iff the batch carried this client's origin.
    pub is_local: bool,
    /// Pages whose content, position or existence changed. Includes every
    /// page in `removed_page_ids`.
    pub affected_page_ids: BTreeSet<String>,
    /// Pages deleted by the batch. Removed entries leave no path behind, so
    /// this is the only place their ids appear.
    pub removed_page_ids: BTreeSet<String>,
    #[serde(skip)]
    removed_with_blocks: BTreeSet<String>,
    /// `Structural` when any path is structural or a page was removed.
    pub kind: ChangeKind,
}

impl StructuralChange {
    pub(crate) fn new(
        paths: Vec<ChangePath>,
        is_local: bool,
        inserted_pages: Vec<String>,
        removed_pages: Vec<RemovedPage>,
    ) -> Self {
        let mut affected_page_ids: BTreeSet<String> =
            paths.iter().filter_map(|p| p.page_id.clone()).collect();
        affected_page_ids.extend(inserted_pages);
        let removed_with_blocks = removed_pages
            .iter()
            .filter(|p| p.had_blocks)
            .map(|p| p.id.clone())
            .collect();
        let removed_page_ids: BTreeSet<String> = removed_pages.into_iter().map(|p| p.id).collect();
        affected_page_ids.extend(removed_page_ids.iter().cloned());
        let kind = if !removed_page_ids.is_empty() || paths.iter().any(|p| p.kind == ChangeKind::Structural) {
            ChangeKind::Structural
        } else {
            ChangeKind::Content
        };
        Self {
            paths,
            is_local,
            affected_page_ids,
            removed_page_ids,
            removed_with_blocks,
            kind,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.kind == ChangeKind::Structural
    }

    /// The part of this change that concerns blocks or components, with
    /// affected pages recomputed from those paths only. A deleted page that
    /// still held blocks counts as touching them. `None` when nothing in the
    /// batch touched a blocks or components sequence.
    pub fn block_component_view(&self) -> Option<StructuralChange> {
        let paths: Vec<ChangePath> = self
            .paths
            .iter()
            .filter(|p| p.touches_blocks_or_components())
            .cloned()
            .collect();
        if paths.is_empty() && self.removed_with_blocks.is_empty() {
            return None;
        }
        let removed = self
            .removed_with_blocks
            .iter()
            .map(|id| RemovedPage {
                id: id.clone(),
                had_blocks: true,
            })
            .collect();
        Some(StructuralChange::new(paths, self.is_local, Vec::new(), removed))
    }
}
