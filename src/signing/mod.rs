//! Hardware Wallet Signing
//!
//! The device contract, the Ledger and Trezor adapters and the orchestrator
//! that drives a signing session:
//! 1. Pre-flight checks on the transaction and the signing keys
//! 2. Signing-path resolution and the device round trip
//! 3. Integrity check of the device's transaction id
//! 4. Witness compilation into a signed transaction or a single witness

pub mod compiler;
pub mod device;
pub mod ledger;
pub mod orchestrator;
pub mod preflight;
pub mod trezor;

pub use compiler::*;
pub use device::{
    DeviceSignatures, DeviceWitness, HardwareWallet, ResolvedPaths, SigningRequest,
};
pub use ledger::{LedgerTransport, LedgerWallet};
pub use orchestrator::{SigningOrchestrator, SigningState};
pub use preflight::SigningMode;
pub use trezor::{TrezorTransport, TrezorWallet};
