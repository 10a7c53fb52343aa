//! Address helpers
//!
//! Only what the signing flow needs: header attributes for the device, the
//! human-readable form Trezor expects, and the stake key hash behind a
//! reward address.

use crate::error::{SignerError, SignerResult};
use bech32::{ToBase32, Variant};
use serde::{Deserialize, Serialize};

/// Header type nibbles
pub mod address_types {
    pub const BASE: u8 = 0b0000;
    pub const POINTER: u8 = 0b0100;
    pub const ENTERPRISE: u8 = 0b0110;
    /// CBOR array header `0x82` of a Byron address
    pub const BYRON: u8 = 0b1000;
    pub const REWARD: u8 = 0b1110;
}

/// Type and network nibbles from the address header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressAttributes {
    pub address_type: u8,
    pub network_id: u8,
}

pub fn address_attributes(address: &[u8]) -> SignerResult<AddressAttributes> {
    let header = address
        .first()
        .ok_or_else(|| SignerError::malformed_transaction("Empty address"))?;
    Ok(AddressAttributes {
        address_type: header >> 4,
        network_id: header & 0x0f,
    })
}

pub fn is_byron(address: &[u8]) -> bool {
    matches!(address.first(), Some(header) if header >> 4 == address_types::BYRON)
}

/// bech32 for Shelley addresses, base58 for Byron ones
pub fn encode_address(address: &[u8]) -> SignerResult<String> {
    if is_byron(address) {
        return Ok(bs58::encode(address).into_string());
    }

    let AddressAttributes {
        address_type,
        network_id,
    } = address_attributes(address)?;
    let prefix = match address_type {
        0..=7 => "addr",
        address_types::REWARD | 0b1111 => "stake",
        other => {
            return Err(SignerError::malformed_transaction(format!(
                "Unsupported address type {}",
                other
            ))
            .with_details(hex::encode(address)));
        }
    };
    let hrp = if network_id == crate::utils::network_ids::MAINNET {
        prefix.to_string()
    } else {
        format!("{}_test", prefix)
    };

    bech32::encode(&hrp, address.to_base32(), Variant::Bech32)
        .map_err(|e| SignerError::internal(format!("bech32 encoding failed: {}", e)))
}

/// Stake key hash of a reward address (header byte stripped)
pub fn reward_address_key_hash(reward_address: &[u8; 29]) -> [u8; 28] {
    let mut hash = [0u8; 28];
    hash.copy_from_slice(&reward_address[1..]);
    hash
}
