//! Legacy-compatibility violation reporting
//!
//! Old plugins occasionally do things the engine must survive: registering
//! the same replacement twice, asking for trampolines with the wrong shape,
//! declaring contradictory ordering constraints. Every violation is logged
//! loudly with hook-id attribution and prevented from corrupting shared
//! state; classes present in the engine's fatal mask panic instead, which
//! is what developer/strict mode selects.

use bitflags::bitflags;

bitflags! {
    /// Violation classes that can be escalated to panics.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Violations: u32 {
        /// Two live hooks route the same target through the same entry
        const DOUBLE_REGISTER = 1 << 0;
        /// Requested trampoline shape is not call-compatible with the target
        const SIGNATURE_MISMATCH = 1 << 1;
        /// before/after constraints form a cycle
        const CONSTRAINT_CYCLE = 1 << 2;
    }
}

/// Log `message` attributed to `class`; panic when the class is fatal.
pub(crate) fn report(fatal: Violations, class: Violations, message: &str) {
    tracing::error!("compat violation ({:?}): {}", class, message);
    if fatal.intersects(class) {
        panic!("compat violation ({:?}): {}", class, message);
    }
}
