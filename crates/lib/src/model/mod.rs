//! Typed records for the three levels of the document tree.
//!
//! The shared document stores pages, blocks and components as generic
//! replicated maps. Code outside [`codec`] only ever sees the records defined
//! here; they are projections, so mutating one does not touch the document.
//! All mutation goes through [`StructureStore`](crate::StructureStore).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub(crate) mod codec;

/// Free-form per-entity properties.
pub type PropertyMap = BTreeMap<String, serde_json::Value>;

/// A page: the top level of the tree.
///
/// Pages form a forest through `parent_id`; `None` means root level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub order: i64,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub properties: PropertyMap,
    pub created_at: u64,
}

impl Page {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn component_count(&self) -> usize {
        self.blocks.iter().map(|b| b.components.len()).sum()
    }
}

/// A block, owned by exactly one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub page_id: String,
    pub name: String,
    #[serde(default)]
    pub icon_name: String,
    #[serde(default)]
    pub block_type: String,
    pub order: i64,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub properties: PropertyMap,
    pub created_at: u64,
}

/// A component, owned by exactly one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    pub block_id: String,
    pub page_id: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub order: i64,
    /// Plain-text content of the component's replicated text container.
    #[serde(default)]
    pub rich_text: String,
    #[serde(default)]
    pub json_properties: PropertyMap,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_owner: Option<ClientRef>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Identifies the client holding a component lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRef {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Entities that carry a sibling `order` field.
pub trait Ordered {
    fn order(&self) -> i64;
    fn set_order(&mut self, order: i64);
}

macro_rules! impl_ordered {
    ($($ty:ty),*) => {
        $(impl Ordered for $ty {
            fn order(&self) -> i64 {
                self.order
            }

            fn set_order(&mut self, order: i64) {
                self.order = order;
            }
        })*
    };
}

impl_ordered!(Page, Block, Component);

/// Field changes for `update_page`. `None` leaves a field untouched;
/// `properties` entries are merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUpdate {
    pub name: Option<String>,
    pub properties: Option<PropertyMap>,
}

/// Field changes for `update_block`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockUpdate {
    pub name: Option<String>,
    pub icon_name: Option<String>,
    pub block_type: Option<String>,
    pub properties: Option<PropertyMap>,
}

/// Field changes for `update_component`.
///
/// `rich_text` replaces the whole text content; `json_properties` entries
/// are merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentUpdate {
    #[serde(rename = "type")]
    pub component_type: Option<String>,
    pub rich_text: Option<String>,
    pub json_properties: Option<PropertyMap>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub instructions: Option<String>,
    pub feedback: Option<String>,
}

impl ComponentUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ComponentUpdate::default()
    }
}

/// Initial values for `create_block`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBlock {
    pub name: String,
    #[serde(default)]
    pub icon_name: String,
    #[serde(default)]
    pub block_type: String,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl NewBlock {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon_name = icon.into();
        self
    }

    pub fn with_type(mut self, block_type: impl Into<String>) -> Self {
        self.block_type = block_type.into();
        self
    }
}

/// Initial values for `create_component`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComponent {
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub rich_text: String,
    #[serde(default)]
    pub json_properties: PropertyMap,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub feedback: String,
}

impl NewComponent {
    pub fn of_type(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.rich_text = text.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}
