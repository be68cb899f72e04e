//! Hook record bookkeeping

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use slotmap::new_key_type;

use hookshim_sdk::{Entry, MethodId};

use super::trampoline::NextCell;

new_key_type! {
    /// Handle for a hook record within its target's chain
    pub struct HookKey;
}

/// Process-wide creation counter. Indices race across all targets, so this
/// is a single atomic independent of any per-target lock; values are never
/// reused.
static NEXT_INDEX: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_index() -> u64 {
    NEXT_INDEX.fetch_add(1, Ordering::Relaxed)
}

/// Body-transform callback: given the entry of the method-so-far, produce
/// the entry of the rewritten version. Re-run on every chain rebuild.
pub(crate) type BodyTransform = Arc<dyn Fn(Entry) -> Entry + Send + Sync>;

/// Replacement behavior carried by a hook record.
#[derive(Clone)]
pub(crate) enum HookKind {
    /// Redirect the target's dispatch to this entry point
    Entry(Entry),
    /// Rewrite the method body in place in the chain
    Rewrite(BodyTransform),
}

impl HookKind {
    pub fn name(&self) -> &'static str {
        match self {
            HookKind::Entry(_) => "entry",
            HookKind::Rewrite(_) => "rewrite",
        }
    }

    /// Default id derived from the hook's implementation target.
    pub fn derived_id(&self, index: u64) -> String {
        match self {
            HookKind::Entry(entry) => format!("hook:{:#x}", entry.addr()),
            HookKind::Rewrite(_) => format!("rewrite#{}", index),
        }
    }
}

/// One logical hook unit targeting a method.
///
/// Validity is represented by presence in the owning chain's record map;
/// freed records are removed outright and their keys never resolve again.
pub(crate) struct HookRecord {
    /// Global creation index, the last-resort deterministic tie-break
    pub index: u64,
    /// User-visible id, never empty (defaults to the derived name)
    pub id: String,
    /// Fallback id, restored when the user sets an empty id
    pub derived_id: String,
    /// Higher sorts earlier; soft key only, constraints always win
    pub priority: i32,
    /// Ids this record must precede
    pub before: Vec<String>,
    /// Ids this record must follow
    pub after: Vec<String>,
    /// Whether this record participates in the installed chain
    pub applied: bool,
    pub kind: HookKind,
    /// Method that must stay pinned alongside the target while applied
    /// (a plain detour's destination)
    pub aux: Option<MethodId>,
    /// Forwarding cell behind this record's trampolines
    pub next: Arc<NextCell>,
}

impl HookRecord {
    pub fn new(
        kind: HookKind,
        aux: Option<MethodId>,
        id: String,
        priority: i32,
        before: Vec<String>,
        after: Vec<String>,
        original: Entry,
    ) -> Self {
        let index = next_index();
        let derived_id = kind.derived_id(index);
        let id = if id.is_empty() { derived_id.clone() } else { id };
        Self {
            index,
            id,
            derived_id,
            priority,
            before,
            after,
            applied: false,
            kind,
            aux,
            next: Arc::new(NextCell::new(original)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_strictly_increase() {
        let a = next_index();
        let b = next_index();
        assert!(b > a);
    }

    #[test]
    fn test_empty_id_falls_back_to_derived() {
        let rec = HookRecord::new(
            HookKind::Entry(Entry(0xbeef)),
            None,
            String::new(),
            0,
            Vec::new(),
            Vec::new(),
            Entry(0x1),
        );
        assert_eq!(rec.id, "hook:0xbeef");
        assert_eq!(rec.id, rec.derived_id);
    }

    #[test]
    fn test_explicit_id_wins() {
        let rec = HookRecord::new(
            HookKind::Entry(Entry(0xbeef)),
            None,
            "MyMod".to_string(),
            0,
            Vec::new(),
            Vec::new(),
            Entry(0x1),
        );
        assert_eq!(rec.id, "MyMod");
        assert_eq!(rec.derived_id, "hook:0xbeef");
    }
}
