//! Shared types for the signer core
//!
//! Values supplied by the excluded collaborators (signing-key files, change
//! address descriptors) and the device-facing key material live here so
//! every module sees the same shapes.

use crate::error::{SignerError, SignerResult};
use crate::wallet::DerivationPath;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Key Material
// =============================================================================

/// Ed25519 public key paired with BIP32 chain code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExtendedPublicKey {
    pub pub_key: [u8; 32],
    pub chain_code: [u8; 32],
}

impl ExtendedPublicKey {
    pub fn new(pub_key: [u8; 32], chain_code: [u8; 32]) -> Self {
        Self {
            pub_key,
            chain_code,
        }
    }

    /// Parse from 64 raw bytes (`pub_key || chain_code`)
    pub fn from_bytes(bytes: &[u8]) -> SignerResult<Self> {
        if bytes.len() != 64 {
            return Err(SignerError::invalid_xpub(format!(
                "Extended public key must be 64 bytes, got {}",
                bytes.len()
            )));
        }
        let mut pub_key = [0u8; 32];
        let mut chain_code = [0u8; 32];
        pub_key.copy_from_slice(&bytes[..32]);
        chain_code.copy_from_slice(&bytes[32..]);
        Ok(Self::new(pub_key, chain_code))
    }

    /// Parse from hex, either raw (128 chars) or CBOR-wrapped (`5840…`)
    /// as found in hardware signing files.
    pub fn from_hex(s: &str) -> SignerResult<Self> {
        let bytes = hex::decode(s.trim())?;
        if bytes.len() == 64 {
            return Self::from_bytes(&bytes);
        }
        let mut decoder = minicbor::Decoder::new(&bytes);
        let inner = decoder
            .bytes()
            .map_err(|e| SignerError::invalid_xpub(format!("Invalid CBOR key: {}", e)))?;
        if decoder.position() != bytes.len() {
            return Err(SignerError::invalid_xpub("Trailing bytes after CBOR key"));
        }
        Self::from_bytes(inner)
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.pub_key);
        out[32..].copy_from_slice(&self.chain_code);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl TryFrom<String> for ExtendedPublicKey {
    type Error = SignerError;

    fn try_from(value: String) -> SignerResult<Self> {
        Self::from_hex(&value)
    }
}

impl From<ExtendedPublicKey> for String {
    fn from(value: ExtendedPublicKey) -> Self {
        value.to_hex()
    }
}

impl fmt::Display for ExtendedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// =============================================================================
// Signing-Key Descriptors
// =============================================================================

/// What a signing key is allowed to authorize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsage {
    /// Spends inputs
    Payment,
    /// Signs certificates and reward withdrawals
    Stake,
}

/// A hardware signing-key descriptor: the device path and the public key
/// the device derived for it. Loaded from file by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HwSigningData {
    pub usage: KeyUsage,
    pub derivation_path: DerivationPath,
    #[serde(rename = "extendedPublicKeyHex")]
    pub xpub: ExtendedPublicKey,
}

impl HwSigningData {
    pub fn new(usage: KeyUsage, derivation_path: DerivationPath, xpub: ExtendedPublicKey) -> Self {
        Self {
            usage,
            derivation_path,
            xpub,
        }
    }

    pub fn payment(derivation_path: DerivationPath, xpub: ExtendedPublicKey) -> Self {
        Self::new(KeyUsage::Payment, derivation_path, xpub)
    }

    pub fn stake(derivation_path: DerivationPath, xpub: ExtendedPublicKey) -> Self {
        Self::new(KeyUsage::Stake, derivation_path, xpub)
    }
}

/// Describes one of the caller's own addresses so a matching output can be
/// sent to the device as a path (the device re-derives and verifies it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOutput {
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub address: Vec<u8>,
    pub payment_path: DerivationPath,
    #[serde(default)]
    pub stake_path: Option<DerivationPath>,
    pub address_type: u8,
}

// =============================================================================
// Devices
// =============================================================================

/// Supported hardware wallet families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Ledger,
    Trezor,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Ledger => f.write_str("Ledger"),
            DeviceKind::Trezor => f.write_str("Trezor"),
        }
    }
}
