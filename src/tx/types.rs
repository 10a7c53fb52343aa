//! Typed transaction model
//!
//! Values are only ever built by the decoder's shape guards or by the
//! constructors below, so every field already has its wire-level size.

use super::{decoder, encoder, witness_keys};
use crate::error::{SignerError, SignerResult};
use crate::wallet::WitnessEra;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

// =============================================================================
// Body Elements
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxInput {
    pub tx_hash: [u8; 32],
    pub output_index: u32,
}

impl TxInput {
    pub fn new(tx_hash: [u8; 32], output_index: u32) -> Self {
        Self {
            tx_hash,
            output_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxOutput {
    /// Network-encoded address, opaque to the codec
    pub address: Vec<u8>,
    pub coins: u64,
}

impl TxOutput {
    pub fn new(address: Vec<u8>, coins: u64) -> Self {
        Self { address, coins }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Withdrawal {
    /// Header byte followed by the 28-byte stake key hash
    pub reward_address: [u8; 29],
    pub coins: u64,
}

impl Withdrawal {
    pub fn new(reward_address: [u8; 29], coins: u64) -> Self {
        Self {
            reward_address,
            coins,
        }
    }

    /// Stake key hash the reward address pays to
    pub fn key_hash(&self) -> [u8; 28] {
        super::address::reward_address_key_hash(&self.reward_address)
    }
}

/// Stake credential `[kind, hash]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StakeCredential {
    pub kind: u64,
    pub pub_key_hash: [u8; 28],
}

impl StakeCredential {
    /// Key-hash credential (kind 0)
    pub fn key_hash(pub_key_hash: [u8; 28]) -> Self {
        Self {
            kind: 0,
            pub_key_hash,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Margin {
    pub numerator: u64,
    pub denominator: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolMetadata {
    pub url: String,
    pub hash: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Relay {
    SingleHostIp {
        port: Option<u16>,
        ipv4: Option<[u8; 4]>,
        ipv6: Option<[u8; 16]>,
    },
    SingleHostName {
        port: u16,
        dns_name: String,
    },
    MultiHostName {
        dns_name: String,
    },
}

impl Relay {
    pub fn tag(&self) -> u64 {
        use super::relay_tags::*;
        match self {
            Relay::SingleHostIp { .. } => SINGLE_HOST_IP,
            Relay::SingleHostName { .. } => SINGLE_HOST_NAME,
            Relay::MultiHostName { .. } => MULTI_HOST_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolParams {
    pub pool_key_hash: [u8; 28],
    pub vrf_key_hash: [u8; 32],
    pub pledge: u64,
    pub cost: u64,
    pub margin: Margin,
    pub reward_address: [u8; 29],
    pub owners: Vec<[u8; 28]>,
    pub relays: Vec<Relay>,
    pub metadata: Option<PoolMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Certificate {
    StakeKeyRegistration {
        credential: StakeCredential,
    },
    StakeKeyDeregistration {
        credential: StakeCredential,
    },
    Delegation {
        credential: StakeCredential,
        pool_hash: [u8; 28],
    },
    PoolRegistration(Box<PoolParams>),
}

impl Certificate {
    pub fn tag(&self) -> u64 {
        use super::certificate_tags::*;
        match self {
            Certificate::StakeKeyRegistration { .. } => STAKE_KEY_REGISTRATION,
            Certificate::StakeKeyDeregistration { .. } => STAKE_KEY_DEREGISTRATION,
            Certificate::Delegation { .. } => DELEGATION,
            Certificate::PoolRegistration(_) => POOL_REGISTRATION,
        }
    }

    pub fn is_pool_registration(&self) -> bool {
        matches!(self, Certificate::PoolRegistration(_))
    }
}

// =============================================================================
// Body
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TransactionBody {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub fee: u64,
    pub ttl: u64,
    pub certificates: Vec<Certificate>,
    pub withdrawals: Vec<Withdrawal>,
    pub metadata_hash: Option<[u8; 32]>,
}

impl TransactionBody {
    /// Canonical re-encoding: ascending keys, minimal-length integers,
    /// optional keys omitted when empty.
    pub fn to_cbor(&self) -> SignerResult<Vec<u8>> {
        encoder::encode_body(self)
    }

    pub fn has_pool_registration(&self) -> bool {
        self.certificates.iter().any(Certificate::is_pool_registration)
    }
}

// =============================================================================
// Envelopes
// =============================================================================

/// blake2b-256 of the raw body bytes
pub fn transaction_id(raw_body: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(raw_body);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// A decoded `[body, auxiliary_data]` envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub body: TransactionBody,
    raw_body: Vec<u8>,
    raw_auxiliary_data: Vec<u8>,
}

impl UnsignedTransaction {
    /// Wrap a typed body without auxiliary data
    pub fn new(body: TransactionBody) -> SignerResult<Self> {
        let raw_body = body.to_cbor()?;
        Ok(Self {
            body,
            raw_body,
            raw_auxiliary_data: vec![encoder::CBOR_NULL],
        })
    }

    pub(crate) fn from_parts(
        body: TransactionBody,
        raw_body: Vec<u8>,
        raw_auxiliary_data: Vec<u8>,
    ) -> Self {
        Self {
            body,
            raw_body,
            raw_auxiliary_data,
        }
    }

    pub fn from_cbor(bytes: &[u8]) -> SignerResult<Self> {
        Ok(decoder::decode_unsigned(bytes)?)
    }

    pub fn from_hex(s: &str) -> SignerResult<Self> {
        let bytes = hex::decode(s.trim())?;
        Self::from_cbor(&bytes)
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    pub fn raw_auxiliary_data(&self) -> &[u8] {
        &self.raw_auxiliary_data
    }

    /// Transaction id; depends on the body bytes only
    pub fn id(&self) -> [u8; 32] {
        transaction_id(&self.raw_body)
    }

    pub fn id_hex(&self) -> String {
        hex::encode(self.id())
    }

    /// Re-emit the envelope from the preserved bytes
    pub fn to_cbor(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.raw_body.len() + self.raw_auxiliary_data.len());
        out.push(encoder::CBOR_ARRAY_2);
        out.extend_from_slice(&self.raw_body);
        out.extend_from_slice(&self.raw_auxiliary_data);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShelleyWitness {
    pub pub_key: [u8; 32],
    pub signature: [u8; 64],
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ByronWitness {
    pub pub_key: [u8; 32],
    pub signature: [u8; 64],
    pub chain_code: [u8; 32],
    /// Raw CBOR of the address attributes
    pub attributes: Vec<u8>,
}

impl ByronWitness {
    /// Witness with empty address attributes
    pub fn new(pub_key: [u8; 32], signature: [u8; 64], chain_code: [u8; 32]) -> Self {
        Self {
            pub_key,
            signature,
            chain_code,
            attributes: vec![encoder::CBOR_EMPTY_MAP],
        }
    }
}

/// A `[body, witness_set, auxiliary_data]` envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: UnsignedTransaction,
    pub shelley_witnesses: Vec<ShelleyWitness>,
    pub byron_witnesses: Vec<ByronWitness>,
}

impl SignedTransaction {
    pub fn new(
        transaction: UnsignedTransaction,
        shelley_witnesses: Vec<ShelleyWitness>,
        byron_witnesses: Vec<ByronWitness>,
    ) -> Self {
        Self {
            transaction,
            shelley_witnesses,
            byron_witnesses,
        }
    }

    pub fn from_cbor(bytes: &[u8]) -> SignerResult<Self> {
        Ok(decoder::decode_signed(bytes)?)
    }

    pub fn from_hex(s: &str) -> SignerResult<Self> {
        let bytes = hex::decode(s.trim())?;
        Self::from_cbor(&bytes)
    }

    pub fn id(&self) -> [u8; 32] {
        self.transaction.id()
    }

    pub fn witness_count(&self) -> usize {
        self.shelley_witnesses.len() + self.byron_witnesses.len()
    }

    pub fn to_cbor(&self) -> SignerResult<Vec<u8>> {
        encoder::encode_signed(self)
    }

    pub fn to_hex(&self) -> SignerResult<String> {
        Ok(hex::encode(self.to_cbor()?))
    }

    /// Text envelope for the signed-transaction file writer
    pub fn to_output(&self) -> SignerResult<SignedTxOutput> {
        Ok(SignedTxOutput {
            r#type: SignedTxOutput::TYPE.to_string(),
            description: String::new(),
            cbor_hex: self.to_hex()?,
        })
    }
}

/// A single witness produced in witness-only mode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WitnessRecord {
    Shelley(ShelleyWitness),
    Byron(ByronWitness),
}

impl WitnessRecord {
    /// Witness-set key the record belongs under
    pub fn key(&self) -> u64 {
        match self {
            WitnessRecord::Shelley(_) => witness_keys::SHELLEY,
            WitnessRecord::Byron(_) => witness_keys::BYRON,
        }
    }

    pub fn era(&self) -> WitnessEra {
        match self {
            WitnessRecord::Shelley(_) => WitnessEra::Shelley,
            WitnessRecord::Byron(_) => WitnessEra::Byron,
        }
    }

    pub fn pub_key(&self) -> &[u8; 32] {
        match self {
            WitnessRecord::Shelley(w) => &w.pub_key,
            WitnessRecord::Byron(w) => &w.pub_key,
        }
    }

    pub fn signature(&self) -> &[u8; 64] {
        match self {
            WitnessRecord::Shelley(w) => &w.signature,
            WitnessRecord::Byron(w) => &w.signature,
        }
    }

    /// `[key, witness]`
    pub fn to_cbor(&self) -> SignerResult<Vec<u8>> {
        encoder::encode_witness_record(self)
    }

    pub fn to_output(&self) -> SignerResult<WitnessOutput> {
        let r#type = match self {
            WitnessRecord::Shelley(_) => WitnessOutput::SHELLEY_TYPE,
            WitnessRecord::Byron(_) => WitnessOutput::BYRON_TYPE,
        };
        Ok(WitnessOutput {
            r#type: r#type.to_string(),
            description: String::new(),
            cbor_hex: hex::encode(self.to_cbor()?),
        })
    }
}

// =============================================================================
// Text Envelopes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTxOutput {
    pub r#type: String,
    pub description: String,
    pub cbor_hex: String,
}

impl SignedTxOutput {
    pub const TYPE: &'static str = "TxSignedShelley";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessOutput {
    pub r#type: String,
    pub description: String,
    pub cbor_hex: String,
}

impl WitnessOutput {
    pub const SHELLEY_TYPE: &'static str = "TxWitnessShelley";
    pub const BYRON_TYPE: &'static str = "TxWitnessByron";

    /// Parse the witness back out of the envelope
    pub fn witness(&self) -> SignerResult<WitnessRecord> {
        let bytes = hex::decode(&self.cbor_hex)?;
        let record = decoder::decode_witness_record(&bytes)?;
        let expected = match record {
            WitnessRecord::Shelley(_) => Self::SHELLEY_TYPE,
            WitnessRecord::Byron(_) => Self::BYRON_TYPE,
        };
        if self.r#type != expected {
            return Err(SignerError::malformed_transaction(format!(
                "Witness type '{}' does not match its CBOR",
                self.r#type
            )));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_TX: &str = "82a40081825820941a33cf9d39bba4102c4eff8bd54efd72cf93e65a023a4475ba48a58fc0de000001818258390114c16d7f43243bd81478e68b9db53a8528fd4fb1078d58d54a7f11241d227aefa4b773149170885aadba30aab3127cc611ddbc4999def61c1a002b2b4b021a00029b75031a00a8474cf6";

    #[test]
    fn test_simple_tx_id() {
        let tx = UnsignedTransaction::from_hex(SIMPLE_TX).unwrap();
        assert_eq!(
            tx.id_hex(),
            "ca7b59e959a6a7cf570468438c728c7693bc1582450b89ea095f3d04ae312e6a"
        );
        assert_eq!(hex::encode(tx.to_cbor()), SIMPLE_TX);
    }

    #[test]
    fn test_id_ignores_auxiliary_data() {
        let tx = UnsignedTransaction::from_hex(SIMPLE_TX).unwrap();
        // same body, auxiliary data replaced by an empty metadata map
        let with_meta = format!("{}a0", &SIMPLE_TX[..SIMPLE_TX.len() - 2]);
        let other = UnsignedTransaction::from_hex(&with_meta).unwrap();
        assert_eq!(tx.id(), other.id());
        assert_ne!(tx.raw_auxiliary_data(), other.raw_auxiliary_data());
    }

    #[test]
    fn test_new_from_typed_body() {
        let tx = UnsignedTransaction::from_hex(SIMPLE_TX).unwrap();
        let rebuilt = UnsignedTransaction::new(tx.body.clone()).unwrap();
        // the source body is already canonical
        assert_eq!(rebuilt.raw_body(), tx.raw_body());
        assert_eq!(rebuilt.id(), tx.id());
    }

    #[test]
    fn test_witness_output_roundtrip() {
        let record = WitnessRecord::Shelley(ShelleyWitness {
            pub_key: [1u8; 32],
            signature: [2u8; 64],
        });
        let output = record.to_output().unwrap();
        assert_eq!(output.r#type, "TxWitnessShelley");
        assert!(output.cbor_hex.starts_with("82008258200101"));
        assert_eq!(output.witness().unwrap(), record);

        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"type\":\"TxWitnessShelley\""));
        assert!(json.contains("\"cborHex\""));
    }

    #[test]
    fn test_witness_output_type_mismatch() {
        let record = WitnessRecord::Byron(ByronWitness::new([1u8; 32], [2u8; 64], [3u8; 32]));
        let mut output = record.to_output().unwrap();
        assert_eq!(output.r#type, "TxWitnessByron");
        output.r#type = WitnessOutput::SHELLEY_TYPE.to_string();
        assert!(output.witness().is_err());
    }
}
