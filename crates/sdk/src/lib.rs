//! hookshim SDK - Method identity and signature type definitions
//!
//! This crate contains the plain-data types shared by the runtime seams and
//! the detour engine. It has no dependencies and compiles quickly, allowing
//! parallel compilation of dependent crates.
//!
//! # Modules
//!
//! - [`method`] - Patchable method identity, entry points, signatures

pub mod method;

pub use method::{CallConv, Entry, MethodId, Signature, ValueKind};
