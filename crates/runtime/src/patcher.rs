//! The native patch primitive seam
//!
//! Installing a redirection is host business (jump rewriting, slot swaps,
//! JIT recompilation); the engine only needs the three operations below and
//! relies on each being atomic with respect to threads calling the target.

use hookshim_sdk::{Entry, MethodId};

/// Error type for native patch operations
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The method identity does not resolve to anything patchable
    #[error("target method is not patchable: {0}")]
    InvalidTarget(String),

    /// Changing memory protection on the target failed
    #[error("memory protection failed: {0}")]
    MemoryProtection(String),

    /// The host refused or failed to install the redirection
    #[error("patch installation failed: {0}")]
    InstallFailed(String),

    /// Removal was requested for a target with no patch installed
    #[error("no patch installed at {0}")]
    NotInstalled(String),
}

/// Native detour primitive supplied by the host runtime.
///
/// Implementations must guarantee that `install` and `remove` are each
/// atomic from the point of view of threads concurrently calling the target:
/// a call observes either the previous dispatch or the new one, never a
/// half-written state.
pub trait MethodPatcher: Send + Sync {
    /// Resolve the entry point that runs the unpatched method body.
    ///
    /// Must answer consistently while a patch is installed; this is what the
    /// innermost hook forwards to.
    fn original(&self, target: &MethodId) -> Result<Entry, PatchError>;

    /// Resolve the entry point a caller would currently dispatch through.
    ///
    /// Equals `original` while unpatched; equals the installed redirection
    /// afterwards.
    fn entry(&self, target: &MethodId) -> Result<Entry, PatchError>;

    /// Point the target's dispatch at `entry`, installing the patch or
    /// retargeting an existing one in place.
    fn install(&self, target: &MethodId, entry: Entry) -> Result<(), PatchError>;

    /// Remove the patch, restoring the original dispatch.
    fn remove(&self, target: &MethodId) -> Result<(), PatchError>;
}
