//! # domains
//!
//! The central domain logic and interface definitions for the forum core:
//! models, the Role Policy, the error taxonomy and the store/identity ports.

pub mod errors;
pub mod models;
pub mod policy;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use policy::{decide, Action, Decision, Denial, PolicyContext, RoleChange};
pub use ports::*;
