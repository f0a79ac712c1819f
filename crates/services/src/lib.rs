//! # services
//!
//! Application logic of the forum core. `ForumService` is the engine every
//! caller-facing operation goes through; `ProvisioningService` covers the
//! operator-only setup performed at deployment time.

pub mod forum;
pub mod provisioning;
pub mod validation;

pub use forum::{ForumService, Ports};
pub use provisioning::{CategorySpec, ProvisioningService};
