//! Indirection-cell trampolines
//!
//! The legacy API generated a forwarding stub per hook at runtime. Here a
//! stub is a shared atomic cell holding "the next entry down": the chain
//! rebuilder retargets the cell, callers resolve it at call time, so a
//! trampoline handed out once keeps working across later rebuilds.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hookshim_sdk::{Entry, Signature};

/// Mutable forwarding cell behind a hook's trampoline.
///
/// Created once per record and never replaced; only its target changes.
pub(crate) struct NextCell(AtomicUsize);

impl NextCell {
    pub fn new(entry: Entry) -> Self {
        Self(AtomicUsize::new(entry.addr()))
    }

    pub fn set(&self, entry: Entry) {
        self.0.store(entry.addr(), Ordering::SeqCst);
    }

    pub fn get(&self) -> Entry {
        Entry(self.0.load(Ordering::SeqCst))
    }
}

/// Forwarding stub handed to hook implementations.
///
/// Resolves, at call time, to the next applied hook below its owner as of
/// the last chain rebuild, or to the original method body when the owner is
/// innermost (or not applied at all).
#[derive(Clone)]
pub struct Trampoline {
    cell: Arc<NextCell>,
    sig: Signature,
}

impl Trampoline {
    pub(crate) fn new(cell: Arc<NextCell>, sig: Signature) -> Self {
        Self { cell, sig }
    }

    /// The entry point to invoke right now.
    ///
    /// Load this fresh on every call; caching the result defeats the
    /// indirection and dangles once other hooks rebuild the chain.
    pub fn entry(&self) -> Entry {
        self.cell.get()
    }

    pub fn signature(&self) -> &Signature {
        &self.sig
    }
}

impl std::fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trampoline")
            .field("entry", &self.cell.get())
            .field("sig", &self.sig)
            .finish()
    }
}
