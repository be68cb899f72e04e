//! Error types for detour operations

use hookshim_runtime::PatchError;

/// Error type for hook operations
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Operation attempted on a hook after it was freed
    #[error("hook has been freed")]
    Disposed,

    /// A plain detour's target and replacement are the same method
    #[error("detour source and destination are the same method ({0})")]
    SelfDetour(String),

    /// The target method identity cannot be resolved
    #[error("invalid hook target: {0}")]
    InvalidTarget(String),

    /// The native patch primitive failed; the previous chain state was kept
    #[error("failed to install patch: {0}")]
    PatchInstall(#[from] PatchError),

    /// The interception policy refused trampoline generation
    #[error("operation vetoed by interception policy")]
    Vetoed,
}
