//! Slot-dispatch patcher
//!
//! Many scripting and managed hosts dispatch calls through writable
//! function-pointer slots (vtable entries, dispatch tables, PLT-style
//! thunks). For those hosts "install a patch" is a single pointer swap,
//! which this patcher performs with an atomic store so concurrent callers
//! observe either the old or the new dispatch.
//!
//! The method identity's address is the slot itself, not the code it
//! currently points at.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use hookshim_sdk::{Entry, MethodId};

use crate::patcher::{MethodPatcher, PatchError};

/// Bookkeeping for one patched slot
struct SlotPatch {
    /// Slot content before the first install
    original: usize,
}

/// [`MethodPatcher`] for function-pointer-slot hosts.
#[derive(Default)]
pub struct SlotPatcher {
    patches: Mutex<HashMap<usize, SlotPatch>>,
}

impl SlotPatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(target: &MethodId) -> Result<*mut usize, PatchError> {
        let addr = target.addr();
        if addr == 0 {
            return Err(PatchError::InvalidTarget("null slot address".into()));
        }
        if addr % std::mem::align_of::<usize>() != 0 {
            return Err(PatchError::InvalidTarget(format!(
                "misaligned slot address {:#x}",
                addr
            )));
        }
        Ok(addr as *mut usize)
    }

    /// Atomically read the slot's current content.
    fn read_slot(slot: *mut usize) -> usize {
        // SAFETY: slot is non-null and aligned (checked in `slot`); the host
        // guarantees it stays mapped while hooks reference the method.
        unsafe { AtomicUsize::from_ptr(slot).load(Ordering::SeqCst) }
    }

    /// Atomically overwrite the slot, making it writable for the duration.
    fn write_slot(slot: *mut usize, value: usize) -> Result<(), PatchError> {
        let guard = unsafe {
            region::protect_with_handle(
                slot as *const u8,
                std::mem::size_of::<usize>(),
                region::Protection::READ_WRITE,
            )
        }
        .map_err(|e| PatchError::MemoryProtection(e.to_string()))?;

        // SAFETY: slot is non-null, aligned and writable under `guard`.
        unsafe { AtomicUsize::from_ptr(slot).store(value, Ordering::SeqCst) };

        drop(guard);
        Ok(())
    }
}

impl MethodPatcher for SlotPatcher {
    fn original(&self, target: &MethodId) -> Result<Entry, PatchError> {
        let slot = Self::slot(target)?;
        let patches = self.patches.lock();
        let value = match patches.get(&target.addr()) {
            Some(patch) => patch.original,
            None => Self::read_slot(slot),
        };
        if value == 0 {
            return Err(PatchError::InvalidTarget(format!(
                "slot {:#x} holds no entry",
                target.addr()
            )));
        }
        Ok(Entry(value))
    }

    fn entry(&self, target: &MethodId) -> Result<Entry, PatchError> {
        let slot = Self::slot(target)?;
        let value = Self::read_slot(slot);
        if value == 0 {
            return Err(PatchError::InvalidTarget(format!(
                "slot {:#x} holds no entry",
                target.addr()
            )));
        }
        Ok(Entry(value))
    }

    fn install(&self, target: &MethodId, entry: Entry) -> Result<(), PatchError> {
        if entry.is_null() {
            return Err(PatchError::InstallFailed("null entry".into()));
        }
        let slot = Self::slot(target)?;
        let mut patches = self.patches.lock();

        let current = Self::read_slot(slot);
        Self::write_slot(slot, entry.addr())?;

        // First install captures the original; retargets keep it.
        patches
            .entry(target.addr())
            .or_insert(SlotPatch { original: current });

        tracing::debug!("slot {:#x} -> {}", target.addr(), entry);
        Ok(())
    }

    fn remove(&self, target: &MethodId) -> Result<(), PatchError> {
        let slot = Self::slot(target)?;
        let mut patches = self.patches.lock();

        let patch = patches
            .remove(&target.addr())
            .ok_or_else(|| PatchError::NotInstalled(target.to_string()))?;

        if let Err(e) = Self::write_slot(slot, patch.original) {
            // Keep the bookkeeping consistent with the slot on failure.
            patches.insert(target.addr(), patch);
            return Err(e);
        }

        tracing::debug!("slot {:#x} restored", target.addr());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookshim_sdk::Signature;

    fn make_slot(initial: usize) -> MethodId {
        let slot: &'static mut usize = Box::leak(Box::new(initial));
        MethodId::new(slot as *mut usize as usize, Signature::nullary())
    }

    #[test]
    fn test_install_and_remove_roundtrip() {
        let patcher = SlotPatcher::new();
        let target = make_slot(0x1111);

        assert_eq!(patcher.original(&target).unwrap(), Entry(0x1111));
        patcher.install(&target, Entry(0x2222)).unwrap();
        assert_eq!(patcher.entry(&target).unwrap(), Entry(0x2222));
        // Original is remembered across the install
        assert_eq!(patcher.original(&target).unwrap(), Entry(0x1111));

        patcher.remove(&target).unwrap();
        assert_eq!(patcher.entry(&target).unwrap(), Entry(0x1111));
    }

    #[test]
    fn test_retarget_keeps_original() {
        let patcher = SlotPatcher::new();
        let target = make_slot(0xaaaa);

        patcher.install(&target, Entry(0xbbbb)).unwrap();
        patcher.install(&target, Entry(0xcccc)).unwrap();
        assert_eq!(patcher.entry(&target).unwrap(), Entry(0xcccc));
        assert_eq!(patcher.original(&target).unwrap(), Entry(0xaaaa));

        patcher.remove(&target).unwrap();
        assert_eq!(patcher.entry(&target).unwrap(), Entry(0xaaaa));
    }

    #[test]
    fn test_remove_without_install_fails() {
        let patcher = SlotPatcher::new();
        let target = make_slot(0x1234);
        assert!(matches!(
            patcher.remove(&target),
            Err(PatchError::NotInstalled(_))
        ));
    }

    #[test]
    fn test_null_slot_rejected() {
        let patcher = SlotPatcher::new();
        let target = MethodId::new(0, Signature::nullary());
        assert!(matches!(
            patcher.original(&target),
            Err(PatchError::InvalidTarget(_))
        ));
    }
}
