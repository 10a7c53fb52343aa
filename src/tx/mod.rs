//! Cardano Transaction Codec
//!
//! Decodes the unsigned transaction envelope `[body, auxiliary_data]` into a
//! typed model, computes the transaction id and re-encodes signed
//! transactions and witness records.
//!
//! The raw body bytes are kept verbatim: they are what gets hashed and what
//! is emitted in the signed envelope, so re-encoding never changes the id.

pub mod address;
mod decoder;
mod encoder;
pub mod types;

pub use decoder::{CodecError, CodecResult};
pub use types::*;

/// Keys of the transaction body map
pub mod body_keys {
    pub const INPUTS: u64 = 0;
    pub const OUTPUTS: u64 = 1;
    pub const FEE: u64 = 2;
    pub const TTL: u64 = 3;
    pub const CERTIFICATES: u64 = 4;
    pub const WITHDRAWALS: u64 = 5;
    pub const METADATA_HASH: u64 = 7;
}

/// Keys of the witness set map
pub mod witness_keys {
    pub const SHELLEY: u64 = 0;
    pub const BYRON: u64 = 2;
}

/// Certificate discriminants
pub mod certificate_tags {
    pub const STAKE_KEY_REGISTRATION: u64 = 0;
    pub const STAKE_KEY_DEREGISTRATION: u64 = 1;
    pub const DELEGATION: u64 = 2;
    pub const POOL_REGISTRATION: u64 = 3;
}

/// Pool relay discriminants
pub mod relay_tags {
    pub const SINGLE_HOST_IP: u64 = 0;
    pub const SINGLE_HOST_NAME: u64 = 1;
    pub const MULTI_HOST_NAME: u64 = 2;
}

/// CBOR tag wrapping the pool margin rational
pub const RATIONAL_TAG: u64 = 30;

/// Byte lengths of fixed-size fields
pub const TX_HASH_LEN: usize = 32;
pub const KEY_HASH_LEN: usize = 28;
pub const REWARD_ADDRESS_LEN: usize = 29;
pub const VRF_KEY_HASH_LEN: usize = 32;
pub const METADATA_HASH_LEN: usize = 32;
