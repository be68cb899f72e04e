//! hookshim runtime - Host capability seams
//!
//! The detour engine never touches process memory itself; it talks to the
//! host runtime through two narrow seams defined here:
//!
//! - [`MethodPatcher`] - the native "point this method's dispatch at entry E"
//!   primitive, assumed atomic per operation
//! - [`MethodPinner`] - the "keep this method's code from moving" primitive,
//!   a no-op on hosts without relocation hazards
//!
//! [`SlotPatcher`] is a concrete patcher for hosts that dispatch through
//! writable function-pointer slots.

pub mod patcher;
pub mod pinning;
pub mod slot;

pub use patcher::{MethodPatcher, PatchError};
pub use pinning::{MethodPinner, NoopPinner, PinHandle};
pub use slot::SlotPatcher;
