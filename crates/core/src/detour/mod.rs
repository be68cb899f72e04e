//! Detour engine
//!
//! Per-target hook chains with deterministic ordering:
//! - Records carry priority, before/after constraints and a creation index
//! - The resolver turns one target's applied records into a total order
//! - The rebuilder rewires trampoline cells and the single native patch
//!   atomically from the caller's point of view
//! - Pins are refcounted so the host primitive fires only on the outermost
//!   acquire and release
//!
//! The physical patch primitive and the pin primitive are injected
//! ([`hookshim_runtime::MethodPatcher`], [`hookshim_runtime::MethodPinner`]);
//! this module only orders and manages logical hook records on top of them.

mod chain;
mod engine;
mod error;
mod handle;
mod ordering;
mod pinning;
mod policy;
mod record;
mod registry;
mod trampoline;

pub use engine::{global, DetourEngine};
pub use error::HookError;
pub use handle::HookHandle;
pub use policy::{DefaultPolicy, HookInfo, InterceptionPolicy};
pub use record::HookKey;
pub use trampoline::Trampoline;

pub(crate) use record::{BodyTransform, HookKind};
