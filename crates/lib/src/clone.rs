//! Deep subtree duplication.
//!
//! Two entry points with different intent:
//!
//! * [`CloneEngine::duplicate`] backs the user-facing "duplicate" actions.
//!   Every id in the subtree is regenerated and creation timestamps are
//!   refreshed.
//! * [`CloneEngine::clone_for_relocation`] backs moves across containers.
//!   Ids and timestamps are preserved verbatim. A replicated container that
//!   has been removed from its parent can never be reinserted, so a move
//!   writes this copy into the destination and deletes the original.
//!
//! Both operate on typed records; writing the result into the document
//! (which allocates fresh containers, rich text included) is the codec's job.

use std::collections::HashSet;

use crate::clock::Clock;
use crate::id::{EntityKind, IdGenerator};
use crate::model::{Block, Component, Page};

/// How a subtree is copied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Replace every id and refresh `createdAt`.
    pub regenerate_ids: bool,
    /// New owner of the cloned root: parent page for pages, page for
    /// blocks, block for components.
    pub override_parent_id: Option<String>,
    /// Page that owns a cloned component. Only meaningful for components.
    pub override_page_id: Option<String>,
}

impl CloneOptions {
    pub fn duplicate() -> Self {
        Self {
            regenerate_ids: true,
            ..Default::default()
        }
    }

    pub fn relocation() -> Self {
        Self::default()
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.override_parent_id = Some(parent_id.into());
        self
    }

    pub fn with_page(mut self, page_id: impl Into<String>) -> Self {
        self.override_page_id = Some(page_id.into());
        self
    }
}

/// Entities that can be deep-copied by the [`CloneEngine`].
pub trait Cloneable: Sized {
    fn clone_subtree(&self, engine: &CloneEngine<'_>, options: &CloneOptions) -> Self;
}

/// Produces deep copies of pages, blocks and components.
#[derive(Debug, Clone, Copy)]
pub struct CloneEngine<'a> {
    ids: &'a IdGenerator,
    clock: &'a dyn Clock,
}

impl<'a> CloneEngine<'a> {
    pub fn new(ids: &'a IdGenerator, clock: &'a dyn Clock) -> Self {
        Self { ids, clock }
    }

    pub fn clone_subtree<E: Cloneable>(&self, node: &E, options: &CloneOptions) -> E {
        node.clone_subtree(self, options)
    }

    /// Copy with fresh ids, for user-facing duplication.
    pub fn duplicate<E: Cloneable>(&self, node: &E) -> E {
        node.clone_subtree(self, &CloneOptions::duplicate())
    }

    /// Copy with the same ids, owned by `options.override_parent_id`, for
    /// relocating an entity into another container.
    pub fn clone_for_relocation<E: Cloneable>(&self, node: &E, options: CloneOptions) -> E {
        node.clone_subtree(
            self,
            &CloneOptions {
                regenerate_ids: false,
                ..options
            },
        )
    }

    /// Clone `root` together with every page below it.
    ///
    /// `pages` is the full page list used to discover children through
    /// `parent_id`. Each cloned child is reparented to its cloned parent;
    /// child names and orders are kept. The clone of `root` comes first.
    pub fn clone_page_tree(&self, root: &Page, pages: &[Page], options: &CloneOptions) -> Vec<Page> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.clone_page_into(root, pages, options, &mut out, &mut visited);
        out
    }

    fn clone_page_into<'p>(
        &self,
        source: &'p Page,
        pages: &'p [Page],
        options: &CloneOptions,
        out: &mut Vec<Page>,
        visited: &mut HashSet<&'p str>,
    ) {
        if !visited.insert(source.id.as_str()) {
            return;
        }
        let copy = source.clone_subtree(self, options);
        let copy_id = copy.id.clone();
        out.push(copy);

        let child_options = CloneOptions {
            regenerate_ids: options.regenerate_ids,
            override_parent_id: Some(copy_id),
            override_page_id: None,
        };
        for child in pages
            .iter()
            .filter(|p| p.parent_id.as_deref() == Some(source.id.as_str()))
        {
            self.clone_page_into(child, pages, &child_options, out, visited);
        }
    }

    fn id_for(&self, kind: EntityKind, current: &str, options: &CloneOptions) -> String {
        if options.regenerate_ids {
            self.ids.next_for(kind)
        } else {
            current.to_string()
        }
    }

    fn created_at(&self, current: u64, options: &CloneOptions) -> u64 {
        if options.regenerate_ids {
            self.clock.now_millis()
        } else {
            current
        }
    }
}

impl Cloneable for Page {
    fn clone_subtree(&self, engine: &CloneEngine<'_>, options: &CloneOptions) -> Self {
        let id = engine.id_for(EntityKind::Page, &self.id, options);
        let block_options = CloneOptions {
            regenerate_ids: options.regenerate_ids,
            override_parent_id: Some(id.clone()),
            override_page_id: None,
        };
        Page {
            parent_id: options
                .override_parent_id
                .clone()
                .or_else(|| self.parent_id.clone()),
            name: self.name.clone(),
            order: self.order,
            blocks: self
                .blocks
                .iter()
                .map(|b| b.clone_subtree(engine, &block_options))
                .collect(),
            properties: self.properties.clone(),
            created_at: engine.created_at(self.created_at, options),
            id,
        }
    }
}

impl Cloneable for Block {
    fn clone_subtree(&self, engine: &CloneEngine<'_>, options: &CloneOptions) -> Self {
        let id = engine.id_for(EntityKind::Block, &self.id, options);
        let page_id = options
            .override_parent_id
            .clone()
            .unwrap_or_else(|| self.page_id.clone());
        let component_options = CloneOptions {
            regenerate_ids: options.regenerate_ids,
            override_parent_id: Some(id.clone()),
            override_page_id: Some(page_id.clone()),
        };
        Block {
            name: self.name.clone(),
            icon_name: self.icon_name.clone(),
            block_type: self.block_type.clone(),
            order: self.order,
            components: self
                .components
                .iter()
                .map(|c| c.clone_subtree(engine, &component_options))
                .collect(),
            properties: self.properties.clone(),
            created_at: engine.created_at(self.created_at, options),
            page_id,
            id,
        }
    }
}

impl Cloneable for Component {
    fn clone_subtree(&self, engine: &CloneEngine<'_>, options: &CloneOptions) -> Self {
        let created_at = engine.created_at(self.created_at, options);
        Component {
            id: engine.id_for(EntityKind::Component, &self.id, options),
            block_id: options
                .override_parent_id
                .clone()
                .unwrap_or_else(|| self.block_id.clone()),
            page_id: options
                .override_page_id
                .clone()
                .unwrap_or_else(|| self.page_id.clone()),
            component_type: self.component_type.clone(),
            order: self.order,
            rich_text: self.rich_text.clone(),
            json_properties: self.json_properties.clone(),
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            instructions: self.instructions.clone(),
            feedback: self.feedback.clone(),
            // A duplicate starts unlocked; a relocated component keeps its lock.
            lock_owner: if options.regenerate_ids {
                None
            } else {
                self.lock_owner.clone()
            },
            created_at,
            updated_at: if options.regenerate_ids {
                created_at
            } else {
                self.updated_at
            },
        }
    }
}
