//! Reference-counted method pinning
//!
//! The host pin primitive fires only on the 0->1 acquire and the 1->0
//! release; everything in between is bookkeeping. The map is concurrent and
//! keyed by method identity, so pins on different methods never contend and
//! same-method operations serialize on the map entry.

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;

use hookshim_runtime::{MethodPinner, PinHandle};
use hookshim_sdk::MethodId;

struct PinEntry {
    /// Outstanding acquires; at least 1 while the entry exists
    count: u32,
    /// Dropping this releases the external pin
    _handle: PinHandle,
}

#[derive(Default)]
pub(crate) struct PinTracker {
    pins: DashMap<MethodId, PinEntry>,
}

impl PinTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, method: &MethodId, pinner: &dyn MethodPinner) {
        match self.pins.entry(method.clone()) {
            MapEntry::Occupied(mut entry) => {
                entry.get_mut().count += 1;
            }
            MapEntry::Vacant(entry) => {
                tracing::debug!("pinning {}", method);
                entry.insert(PinEntry {
                    count: 1,
                    _handle: pinner.pin(method),
                });
            }
        }
    }

    /// Panics on release without a matching acquire: that is a bookkeeping
    /// bug in the caller, not a recoverable condition.
    pub fn release(&self, method: &MethodId) {
        match self.pins.entry(method.clone()) {
            MapEntry::Occupied(mut entry) => {
                entry.get_mut().count -= 1;
                if entry.get().count == 0 {
                    tracing::debug!("unpinning {}", method);
                    entry.remove();
                }
            }
            MapEntry::Vacant(_) => {
                panic!("unbalanced pin release for {}", method);
            }
        }
    }

    pub fn count(&self, method: &MethodId) -> u32 {
        self.pins.get(method).map(|e| e.count).unwrap_or(0)
    }
}
