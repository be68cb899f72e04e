//! Chain state snapshots
//!
//! Serializable views of one target's hook set, taken under the chain lock
//! and meant for logs and bug reports ("which mods hook this and in what
//! order").

use serde::Serialize;

/// One hook record's diagnostic view.
#[derive(Debug, Clone, Serialize)]
pub struct HookSnapshot {
    pub id: String,
    pub index: u64,
    pub priority: i32,
    pub before: Vec<String>,
    pub after: Vec<String>,
    pub kind: &'static str,
    pub applied: bool,
    /// Position in the installed order; absent while not applied
    pub position: Option<usize>,
}

/// One target's diagnostic view.
#[derive(Debug, Clone, Serialize)]
pub struct ChainSnapshot {
    pub target: String,
    pub rebuilds: u64,
    /// Entry the native patch currently points the target at, if any
    pub installed_entry: Option<String>,
    /// Records in creation order
    pub hooks: Vec<HookSnapshot>,
}

impl ChainSnapshot {
    pub fn applied_len(&self) -> usize {
        self.hooks.iter().filter(|h| h.applied).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
