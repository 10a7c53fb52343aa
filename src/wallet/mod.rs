//! Wallet Module
//!
//! Derivation paths, host-side public key derivation and the signing-key
//! index used to decide which path signs each transaction element.

mod derivation;
mod derivation_path;
pub mod keys;

pub use derivation::*;
pub use derivation_path::*;
pub use keys::{
    certificate_path, filter_signing_files, find_by_path, find_signing_path, input_path,
    key_hash, withdrawal_path, xpub_key_hash, SigningFiles,
};
