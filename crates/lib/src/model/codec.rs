//! Conversion between typed records and Y-CRDT containers.
//!
//! This is the only module that knows the key layout of page, block and
//! component maps. Readers are lenient: a missing `order` falls back to the
//! storage position, missing strings become empty, and numbers are accepted
//! both as doubles (what JavaScript clients write) and as big integers.
//! Writers always create fresh containers; a container handle read from the
//! document is never inserted anywhere else.

use std::collections::HashMap;

use serde_json::{Number, Value};
use yrs::{
    Any, Array, ArrayPrelim, ArrayRef, GetString, Map, MapPrelim, MapRef, Out, ReadTxn, Text,
    TextPrelim, TextRef, TransactionMut,
};

use super::{Block, ClientRef, Component, Page, PropertyMap};

/// Map keys used inside the shared document.
pub(crate) mod keys {
    pub const PAGES: &str = "pages";

    pub const ID: &str = "id";
    pub const PARENT_ID: &str = "parentId";
    pub const PAGE_ID: &str = "pageId";
    pub const BLOCK_ID: &str = "blockId";
    pub const NAME: &str = "name";
    pub const ORDER: &str = "order";
    pub const PROPERTIES: &str = "properties";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";

    pub const BLOCKS: &str = "blocks";
    pub const ICON_NAME: &str = "iconName";
    pub const BLOCK_TYPE: &str = "blockType";

    pub const COMPONENTS: &str = "components";
    pub const TYPE: &str = "type";
    pub const RICH_TEXT: &str = "richText";
    pub const JSON_PROPERTIES: &str = "jsonProperties";
    pub const TITLE: &str = "title";
    pub const SUBTITLE: &str = "subtitle";
    pub const INSTRUCTIONS: &str = "instructions";
    pub const FEEDBACK: &str = "feedback";
    pub const LOCK_OWNER: &str = "lockOwner";
}

/// Largest integer a JavaScript number represents exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

// ---------------------------------------------------------------------------
// Field access
// ---------------------------------------------------------------------------

pub(crate) fn get_any<T: ReadTxn>(txn: &T, map: &MapRef, key: &str) -> Option<Any> {
    match map.get(txn, key)? {
        Out::Any(any) => Some(any),
        _ => None,
    }
}

pub(crate) fn get_string<T: ReadTxn>(txn: &T, map: &MapRef, key: &str) -> Option<String> {
    match get_any(txn, map, key)? {
        Any::String(s) => Some(s.to_string()),
        _ => None,
    }
}

pub(crate) fn get_i64<T: ReadTxn>(txn: &T, map: &MapRef, key: &str) -> Option<i64> {
    match get_any(txn, map, key)? {
        Any::Number(n) if n.is_finite() => Some(n as i64),
        Any::BigInt(n) => Some(n),
        _ => None,
    }
}

pub(crate) fn get_u64<T: ReadTxn>(txn: &T, map: &MapRef, key: &str) -> u64 {
    get_i64(txn, map, key).map(|n| n.max(0) as u64).unwrap_or(0)
}

pub(crate) fn get_array<T: ReadTxn>(txn: &T, map: &MapRef, key: &str) -> Option<ArrayRef> {
    match map.get(txn, key)? {
        Out::YArray(array) => Some(array),
        _ => None,
    }
}

pub(crate) fn get_map<T: ReadTxn>(txn: &T, map: &MapRef, key: &str) -> Option<MapRef> {
    match map.get(txn, key)? {
        Out::YMap(inner) => Some(inner),
        _ => None,
    }
}

pub(crate) fn get_text<T: ReadTxn>(txn: &T, map: &MapRef, key: &str) -> Option<TextRef> {
    match map.get(txn, key)? {
        Out::YText(text) => Some(text),
        _ => None,
    }
}

/// The id of an entity map, empty when absent.
pub(crate) fn entity_id<T: ReadTxn>(txn: &T, map: &MapRef) -> String {
    get_string(txn, map, keys::ID).unwrap_or_default()
}

/// The `parentId` of a page map. Absent, null and empty all mean root.
pub(crate) fn parent_id<T: ReadTxn>(txn: &T, map: &MapRef) -> Option<String> {
    get_string(txn, map, keys::PARENT_ID).filter(|p| !p.is_empty())
}

pub(crate) fn set_string(txn: &mut TransactionMut, map: &MapRef, key: &'static str, value: &str) {
    map.insert(txn, key, Any::from(value));
}

/// Write a string only when it differs from the stored value.
pub(crate) fn set_string_if_changed(
    txn: &mut TransactionMut,
    map: &MapRef,
    key: &'static str,
    value: &str,
) -> bool {
    if get_string(&*txn, map, key).as_deref() == Some(value) {
        return false;
    }
    set_string(txn, map, key, value);
    true
}

pub(crate) fn set_number(txn: &mut TransactionMut, map: &MapRef, key: &'static str, value: i64) {
    map.insert(txn, key, number_to_any(value));
}

/// Write `order` only when it differs from the stored value.
pub(crate) fn set_order(txn: &mut TransactionMut, map: &MapRef, order: i64) -> bool {
    if get_i64(&*txn, map, keys::ORDER) == Some(order) {
        return false;
    }
    set_number(txn, map, keys::ORDER, order);
    true
}

/// Write `parentId` only when it differs from the stored value.
pub(crate) fn set_parent(txn: &mut TransactionMut, map: &MapRef, parent: Option<&str>) -> bool {
    if parent_id(&*txn, map).as_deref() == parent {
        return false;
    }
    match parent {
        Some(parent) => set_string(txn, map, keys::PARENT_ID, parent),
        None => {
            map.insert(txn, keys::PARENT_ID, Any::Null);
        }
    }
    true
}

pub(crate) fn set_lock_owner(txn: &mut TransactionMut, map: &MapRef, owner: Option<&ClientRef>) {
    let value = owner
        .and_then(|owner| serde_json::to_value(owner).ok())
        .map(|json| json_to_any(&json))
        .unwrap_or(Any::Null);
    map.insert(txn, keys::LOCK_OWNER, value);
}

fn read_lock_owner<T: ReadTxn>(txn: &T, map: &MapRef) -> Option<ClientRef> {
    let any = get_any(txn, map, keys::LOCK_OWNER)?;
    serde_json::from_value(any_to_json(&any)).ok()
}

/// The nested array stored under `key`, created empty when missing.
pub(crate) fn ensure_array(txn: &mut TransactionMut, map: &MapRef, key: &'static str) -> ArrayRef {
    if let Some(array) = get_array(&*txn, map, key) {
        return array;
    }
    map.insert(txn, key, ArrayPrelim::default())
}

/// The nested map stored under `key`, created empty when missing.
pub(crate) fn ensure_map(txn: &mut TransactionMut, map: &MapRef, key: &'static str) -> MapRef {
    if let Some(inner) = get_map(&*txn, map, key) {
        return inner;
    }
    map.insert(txn, key, MapPrelim::default())
}

/// Replace the content of the text container under `key`.
///
/// A missing text container is created; an existing one is edited in place
/// so concurrent edits from other clients keep merging.
pub(crate) fn replace_text(txn: &mut TransactionMut, map: &MapRef, key: &'static str, content: &str) {
    match get_text(&*txn, map, key) {
        Some(text) => {
            if text.get_string(&*txn) == content {
                return;
            }
            let len = text.len(&*txn);
            if len > 0 {
                text.remove_range(txn, 0, len);
            }
            text.insert(txn, 0, content);
        }
        None => {
            map.insert(txn, key, TextPrelim::new(content));
        }
    }
}

// ---------------------------------------------------------------------------
// Property maps
// ---------------------------------------------------------------------------

pub(crate) fn read_properties<T: ReadTxn>(txn: &T, map: &MapRef, key: &str) -> PropertyMap {
    match map.get(txn, key) {
        Some(Out::YMap(props)) => props
            .iter(txn)
            .map(|(k, v)| (k.to_string(), out_to_json(txn, &v)))
            .collect(),
        Some(Out::Any(Any::Map(entries))) => entries
            .iter()
            .map(|(k, v)| (k.to_string(), any_to_json(v)))
            .collect(),
        _ => PropertyMap::new(),
    }
}

/// Merge `entries` into the property map under `key`, skipping entries
/// whose stored value is already equal. Returns the number written.
pub(crate) fn merge_properties(
    txn: &mut TransactionMut,
    map: &MapRef,
    key: &'static str,
    entries: &PropertyMap,
) -> usize {
    let current = read_properties(&*txn, map, key);
    let pending: Vec<(&str, Any)> = entries
        .iter()
        .map(|(name, value)| (name.as_str(), json_to_any(value)))
        .filter(|(name, value)| current.get(*name) != Some(&any_to_json(value)))
        .collect();
    if pending.is_empty() {
        return 0;
    }
    let written = pending.len();
    let props = ensure_map(txn, map, key);
    for (name, value) in pending {
        props.insert(txn, name, value);
    }
    written
}

pub(crate) fn remove_property(
    txn: &mut TransactionMut,
    map: &MapRef,
    key: &'static str,
    name: &str,
) -> bool {
    match get_map(&*txn, map, key) {
        Some(props) => props.remove(txn, name).is_some(),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

fn number_to_any(value: i64) -> Any {
    if value.unsigned_abs() <= MAX_SAFE_INTEGER {
        Any::Number(value as f64)
    } else {
        Any::BigInt(value)
    }
}

pub(crate) fn json_to_any(value: &Value) -> Any {
    match value {
        Value::Null => Any::Null,
        Value::Bool(b) => Any::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => number_to_any(i),
            None => Any::Number(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Any::from(s.as_str()),
        Value::Array(items) => Any::Array(items.iter().map(json_to_any).collect::<Vec<_>>().into()),
        Value::Object(entries) => Any::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), json_to_any(v)))
                .collect::<HashMap<String, Any>>()
                .into(),
        ),
    }
}

#[allow(unreachable_patterns)]
pub(crate) fn any_to_json(any: &Any) -> Value {
    match any {
        Any::Null | Any::Undefined => Value::Null,
        Any::Bool(b) => Value::Bool(*b),
        Any::Number(n) => {
            if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER as f64 {
                Value::from(*n as i64)
            } else {
                Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null)
            }
        }
        Any::BigInt(n) => Value::from(*n),
        Any::String(s) => Value::String(s.to_string()),
        Any::Buffer(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
        Any::Array(items) => Value::Array(items.iter().map(any_to_json).collect()),
        Any::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), any_to_json(v)))
                .collect(),
        ),
        _ => Value::Null,
    }
}

fn out_to_json<T: ReadTxn>(txn: &T, out: &Out) -> Value {
    match out {
        Out::Any(any) => any_to_json(any),
        Out::YText(text) => Value::String(text.get_string(txn)),
        Out::YArray(array) => Value::Array(array.iter(txn).map(|v| out_to_json(txn, &v)).collect()),
        Out::YMap(map) => Value::Object(
            map.iter(txn)
                .map(|(k, v)| (k.to_string(), out_to_json(txn, &v)))
                .collect(),
        ),
        _ => Value::Null,
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Sort a projected sibling list by `order`, keeping storage position as
/// the tie breaker.
fn sort_by_order<E: super::Ordered>(items: &mut [E]) {
    items.sort_by_key(|item| item.order());
}

pub(crate) fn read_page<T: ReadTxn>(txn: &T, map: &MapRef, position: usize) -> Page {
    let id = entity_id(txn, map);
    let blocks = get_array(txn, map, keys::BLOCKS)
        .map(|blocks| read_blocks(txn, &blocks, &id))
        .unwrap_or_default();
    Page {
        parent_id: parent_id(txn, map),
        name: get_string(txn, map, keys::NAME).unwrap_or_default(),
        order: get_i64(txn, map, keys::ORDER).unwrap_or(position as i64),
        blocks,
        properties: read_properties(txn, map, keys::PROPERTIES),
        created_at: get_u64(txn, map, keys::CREATED_AT),
        id,
    }
}

pub(crate) fn read_blocks<T: ReadTxn>(txn: &T, blocks: &ArrayRef, page_id: &str) -> Vec<Block> {
    let mut out: Vec<Block> = blocks
        .iter(txn)
        .enumerate()
        .filter_map(|(position, value)| match value {
            Out::YMap(map) => Some(read_block(txn, &map, position, page_id)),
            _ => None,
        })
        .collect();
    sort_by_order(&mut out);
    out
}

pub(crate) fn read_block<T: ReadTxn>(txn: &T, map: &MapRef, position: usize, page_id: &str) -> Block {
    let id = entity_id(txn, map);
    let page_id = get_string(txn, map, keys::PAGE_ID).unwrap_or_else(|| page_id.to_string());
    let components = get_array(txn, map, keys::COMPONENTS)
        .map(|components| read_components(txn, &components, &id, &page_id))
        .unwrap_or_default();
    Block {
        name: get_string(txn, map, keys::NAME).unwrap_or_default(),
        icon_name: get_string(txn, map, keys::ICON_NAME).unwrap_or_default(),
        block_type: get_string(txn, map, keys::BLOCK_TYPE).unwrap_or_default(),
        order: get_i64(txn, map, keys::ORDER).unwrap_or(position as i64),
        components,
        properties: read_properties(txn, map, keys::PROPERTIES),
        created_at: get_u64(txn, map, keys::CREATED_AT),
        page_id,
        id,
    }
}

pub(crate) fn read_components<T: ReadTxn>(
    txn: &T,
    components: &ArrayRef,
    block_id: &str,
    page_id: &str,
) -> Vec<Component> {
    let mut out: Vec<Component> = components
        .iter(txn)
        .enumerate()
        .filter_map(|(position, value)| match value {
            Out::YMap(map) => Some(read_component(txn, &map, position, block_id, page_id)),
            _ => None,
        })
        .collect();
    sort_by_order(&mut out);
    out
}

pub(crate) fn read_component<T: ReadTxn>(
    txn: &T,
    map: &MapRef,
    position: usize,
    block_id: &str,
    page_id: &str,
) -> Component {
    let rich_text = match map.get(txn, keys::RICH_TEXT) {
        Some(Out::YText(text)) => text.get_string(txn),
        Some(Out::Any(Any::String(s))) => s.to_string(),
        _ => String::new(),
    };
    let created_at = get_u64(txn, map, keys::CREATED_AT);
    let updated_at = get_i64(txn, map, keys::UPDATED_AT)
        .map(|n| n.max(0) as u64)
        .unwrap_or(created_at);
    Component {
        id: entity_id(txn, map),
        block_id: get_string(txn, map, keys::BLOCK_ID).unwrap_or_else(|| block_id.to_string()),
        page_id: get_string(txn, map, keys::PAGE_ID).unwrap_or_else(|| page_id.to_string()),
        component_type: get_string(txn, map, keys::TYPE).unwrap_or_default(),
        order: get_i64(txn, map, keys::ORDER).unwrap_or(position as i64),
        rich_text,
        json_properties: read_properties(txn, map, keys::JSON_PROPERTIES),
        title: get_string(txn, map, keys::TITLE).unwrap_or_default(),
        subtitle: get_string(txn, map, keys::SUBTITLE).unwrap_or_default(),
        instructions: get_string(txn, map, keys::INSTRUCTIONS).unwrap_or_default(),
        feedback: get_string(txn, map, keys::FEEDBACK).unwrap_or_default(),
        lock_owner: read_lock_owner(txn, map),
        created_at,
        updated_at,
    }
}

/// Insert a fresh page map built from `page` (including its blocks) at
/// storage position `index`.
pub(crate) fn insert_page(txn: &mut TransactionMut, pages: &ArrayRef, index: u32, page: &Page) -> MapRef {
    let map = pages.insert(txn, index, MapPrelim::default());
    set_string(txn, &map, keys::ID, &page.id);
    set_parent(txn, &map, page.parent_id.as_deref());
    set_string(txn, &map, keys::NAME, &page.name);
    set_number(txn, &map, keys::ORDER, page.order);
    set_number(txn, &map, keys::CREATED_AT, page.created_at as i64);
    let props = map.insert(txn, keys::PROPERTIES, MapPrelim::default());
    for (name, value) in &page.properties {
        props.insert(txn, name.as_str(), json_to_any(value));
    }
    let blocks = map.insert(txn, keys::BLOCKS, ArrayPrelim::default());
    for (position, block) in page.blocks.iter().enumerate() {
        insert_block(txn, &blocks, position as u32, block);
    }
    map
}

/// Insert a fresh block map built from `block` (including its components).
pub(crate) fn insert_block(txn: &mut TransactionMut, blocks: &ArrayRef, index: u32, block: &Block) -> MapRef {
    let map = blocks.insert(txn, index, MapPrelim::default());
    set_string(txn, &map, keys::ID, &block.id);
    set_string(txn, &map, keys::PAGE_ID, &block.page_id);
    set_string(txn, &map, keys::NAME, &block.name);
    set_string(txn, &map, keys::ICON_NAME, &block.icon_name);
    set_string(txn, &map, keys::BLOCK_TYPE, &block.block_type);
    set_number(txn, &map, keys::ORDER, block.order);
    set_number(txn, &map, keys::CREATED_AT, block.created_at as i64);
    let props = map.insert(txn, keys::PROPERTIES, MapPrelim::default());
    for (name, value) in &block.properties {
        props.insert(txn, name.as_str(), json_to_any(value));
    }
    let components = map.insert(txn, keys::COMPONENTS, ArrayPrelim::default());
    for (position, component) in block.components.iter().enumerate() {
        insert_component(txn, &components, position as u32, component);
    }
    map
}

/// Insert a fresh component map built from `component`. The rich text is
/// copied by value into a new text container.
pub(crate) fn insert_component(
    txn: &mut TransactionMut,
    components: &ArrayRef,
    index: u32,
    component: &Component,
) -> MapRef {
    let map = components.insert(txn, index, MapPrelim::default());
    set_string(txn, &map, keys::ID, &component.id);
    set_string(txn, &map, keys::BLOCK_ID, &component.block_id);
    set_string(txn, &map, keys::PAGE_ID, &component.page_id);
    set_string(txn, &map, keys::TYPE, &component.component_type);
    set_number(txn, &map, keys::ORDER, component.order);
    map.insert(txn, keys::RICH_TEXT, TextPrelim::new(component.rich_text.as_str()));
    let props = map.insert(txn, keys::JSON_PROPERTIES, MapPrelim::default());
    for (name, value) in &component.json_properties {
        props.insert(txn, name.as_str(), json_to_any(value));
    }
    set_string(txn, &map, keys::TITLE, &component.title);
    set_string(txn, &map, keys::SUBTITLE, &component.subtitle);
    set_string(txn, &map, keys::INSTRUCTIONS, &component.instructions);
    set_string(txn, &map, keys::FEEDBACK, &component.feedback);
    set_lock_owner(txn, &map, component.lock_owner.as_ref());
    set_number(txn, &map, keys::CREATED_AT, component.created_at as i64);
    set_number(txn, &map, keys::UPDATED_AT, component.updated_at as i64);
    map
}
