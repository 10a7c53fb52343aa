//! Cardano Hardware-Wallet Signer Core
//!
//! Signs Cardano transactions with a Ledger or Trezor device without the
//! host ever holding a private key.
//!
//! # Architecture
//!
//! This crate provides:
//! - **tx**: CBOR codec for unsigned/signed envelopes and witness records
//! - **wallet**: Derivation paths, public key derivation, signing-key index
//! - **signing**: Device contract, Ledger/Trezor adapters, orchestrator
//! - **utils**: Network and session configuration, structured logging
//!
//! # Trust Boundary
//!
//! The device is trusted to sign only what it displays. The host checks that
//! the transaction id the device reports equals the id of the bytes it was
//! given, and by default verifies every returned signature against that id.
//!
//! # Example
//!
//! ```rust,ignore
//! use cardano_hw_signer::signing::{LedgerWallet, SigningOrchestrator};
//! use cardano_hw_signer::SignerSettings;
//!
//! let mut device = LedgerWallet::new(transport, settings.derivation_scheme);
//! let mut orchestrator = SigningOrchestrator::new(&mut device, settings)?;
//! let signed = orchestrator.sign(&unsigned_tx_hex, &signing_files, &change_outputs)?;
//! println!("{}", serde_json::to_string(&signed.to_output()?)?);
//! ```

pub mod error;
pub mod serde_bytes;
pub mod signing;
pub mod tx;
pub mod types;
pub mod utils;
pub mod wallet;

// Re-export key types for convenience
pub use error::{ErrorCode, SignerError, SignerResult};
pub use types::*;

pub use signing::{HardwareWallet, SigningOrchestrator};
pub use tx::{SignedTransaction, UnsignedTransaction, WitnessRecord};
pub use utils::{NetworkConfig, SignerSettings};
pub use wallet::{DerivationPath, DerivationScheme};
