//! Ancestor-walk cycle detection for page reparenting.

use std::collections::{HashMap, HashSet};

use crate::store::StructureError;

/// A snapshot of page parent links used to validate a reparent before any
/// write happens.
#[derive(Debug, Clone, Default)]
pub struct CycleGuard {
    parents: HashMap<String, Option<String>>,
}

impl CycleGuard {
    pub fn from_links<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<S>)>,
        S: Into<String>,
    {
        Self {
            parents: links
                .into_iter()
                .map(|(id, parent)| (id.into(), parent.map(Into::into)))
                .collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.parents.contains_key(id)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parents.get(id).and_then(|p| p.as_deref())
    }

    /// Walk `parentId` links upward starting at `node_id` (inclusive) and
    /// report whether `candidate_ancestor_id` is found.
    ///
    /// Used with `node_id` set to a proposed new parent: a hit means the
    /// moved page would become its own ancestor. The walk stops at a page
    /// already visited, so a corrupt tree cannot hang it.
    pub fn is_descendant(&self, candidate_ancestor_id: &str, node_id: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(node_id);
        while let Some(id) = current {
            if id == candidate_ancestor_id {
                return true;
            }
            if !visited.insert(id) {
                return false;
            }
            current = self.parent_of(id);
        }
        false
    }

    /// Reject reparenting `node_id` under `new_parent_id` when the parent is
    /// the node itself or one of its descendants. Moving to root is always
    /// acyclic.
    pub fn validate_reparent(
        &self,
        operation: &'static str,
        node_id: &str,
        new_parent_id: Option<&str>,
    ) -> Result<(), StructureError> {
        let Some(parent) = new_parent_id else {
            return Ok(());
        };
        if parent == node_id || self.is_descendant(node_id, parent) {
            return Err(StructureError::Cycle {
                operation,
                page_id: node_id.to_string(),
                target_id: parent.to_string(),
            });
        }
        Ok(())
    }

    /// Every page below `root_id`, in breadth-first order.
    pub fn descendants(&self, root_id: &str) -> Vec<String> {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for (id, parent) in &self.parents {
            if let Some(parent) = parent {
                children.entry(parent.as_str()).or_default().push(id.as_str());
            }
        }
        for list in children.values_mut() {
            list.sort_unstable();
        }

        let mut out = Vec::new();
        let mut seen = HashSet::from([root_id]);
        let mut queue = std::collections::VecDeque::from([root_id]);
        while let Some(id) = queue.pop_front() {
            for &child in children.get(id).into_iter().flatten() {
                if seen.insert(child) {
                    out.push(child.to_string());
                    queue.push_back(child);
                }
            }
        }
        out
    }

    /// Apply a reparent to the snapshot.
    pub fn set_parent(&mut self, id: &str, parent: Option<&str>) {
        self.parents
            .insert(id.to_string(), parent.map(str::to_string));
    }

    /// Find a page whose ancestor chain loops back on itself.
    pub fn find_cycle(&self) -> Option<&str> {
        let mut ids: Vec<&String> = self.parents.keys().collect();
        ids.sort();
        ids.into_iter().map(String::as_str).find(|id| {
            self.parent_of(id)
                .is_some_and(|parent| self.is_descendant(id, parent))
        })
    }
}
