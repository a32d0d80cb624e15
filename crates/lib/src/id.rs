//! Identifier generation for pages, blocks and components.
//!
//! Ids must never collide across clients that do not coordinate, so each id
//! combines the clock time, a per-generator sequence number and a random
//! suffix: `page_lx3k2a9c_1f_8c0d44e1`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// The three levels of the document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Page,
    Block,
    Component,
}

impl EntityKind {
    /// Prefix used in generated ids.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Page => "page",
            EntityKind::Block => "block",
            EntityKind::Component => "comp",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Page => "page",
            EntityKind::Block => "block",
            EntityKind::Component => "component",
        })
    }
}

/// Produces globally unique ids.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    clock: Arc<dyn Clock>,
    sequence: Arc<AtomicU64>,
}

impl IdGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Generate an id with a free-form prefix.
    pub fn next(&self, kind: &str) -> String {
        let millis = self.clock.now_millis();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let random: u32 = rand::thread_rng().r#gen();
        format!("{kind}_{}_{seq:x}_{random:08x}", to_base36(millis))
    }

    /// Generate an id for an entity of the given kind.
    pub fn next_for(&self, kind: EntityKind) -> String {
        self.next(kind.prefix())
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
