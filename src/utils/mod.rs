//! Utilities Module
//!
//! Logging and configuration shared across the crate.

pub mod logging;
pub mod network_config;
pub mod signer_config;

pub use network_config::*;
pub use signer_config::*;
