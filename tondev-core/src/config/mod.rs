//! Configuration for the provisioning engine.
//!
//! The engine never reads configuration on its own; callers build or load
//! [`ProvisionSettings`] and hand it in.

mod settings;

pub use settings::{ProvisionSettings, DEFAULT_BINARIES_URL, DEFAULT_PACKAGE_MANAGER};
