//! Shape-guarded CBOR decoding
//!
//! Every element is checked for arity, major type, byte-string length and
//! discriminant range before a typed value is built from it. A guard
//! failure aborts the whole decode with an element-specific error.

use super::types::*;
use super::{
    body_keys, certificate_tags, relay_tags, witness_keys, KEY_HASH_LEN, METADATA_HASH_LEN,
    RATIONAL_TAG, REWARD_ADDRESS_LEN, TX_HASH_LEN, VRF_KEY_HASH_LEN,
};
use crate::error::{ErrorCode, SignerError};
use minicbor::data::{Tag, Type};
use minicbor::Decoder;
use thiserror::Error;

/// Codec-level failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Malformed transaction: {0}")]
    Malformed(String),

    #[error("Invalid input: {0}")]
    InputShape(String),

    #[error("Invalid output: {0}")]
    OutputShape(String),

    #[error("Invalid withdrawal: {0}")]
    WithdrawalShape(String),

    #[error("Invalid certificate: {0}")]
    CertificateShape(String),

    #[error("Invalid pool relay: {0}")]
    RelayShape(String),

    #[error("Unknown certificate type {0}")]
    UnknownCertificateType(u64),
}

pub type CodecResult<T> = Result<T, CodecError>;

impl CodecError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CodecError::Malformed(_) => ErrorCode::MalformedTransaction,
            CodecError::InputShape(_) => ErrorCode::InputShape,
            CodecError::OutputShape(_) => ErrorCode::OutputShape,
            CodecError::WithdrawalShape(_) => ErrorCode::WithdrawalShape,
            CodecError::CertificateShape(_) => ErrorCode::CertificateShape,
            CodecError::RelayShape(_) => ErrorCode::RelayShape,
            CodecError::UnknownCertificateType(_) => ErrorCode::UnknownCertificateType,
        }
    }
}

impl From<CodecError> for SignerError {
    fn from(e: CodecError) -> Self {
        let code = e.code();
        let details = match &e {
            CodecError::UnknownCertificateType(tag) => Some(format!("type={}", tag)),
            _ => None,
        };
        let err = SignerError::new(code, e.to_string());
        match details {
            Some(details) => err.with_details(details),
            None => err,
        }
    }
}

/// Builds a variant-specific error from a message
type Shape = fn(String) -> CodecError;

fn guard<E: std::fmt::Display>(shape: Shape) -> impl Fn(E) -> CodecError {
    move |e| shape(e.to_string())
}

// =============================================================================
// Envelopes
// =============================================================================

pub(crate) fn decode_unsigned(bytes: &[u8]) -> CodecResult<UnsignedTransaction> {
    let mut d = Decoder::new(bytes);
    expect_array(&mut d, 2, CodecError::Malformed)?;

    let (body, raw_body) = decode_raw_body(&mut d, bytes)?;
    let raw_aux = decode_raw_auxiliary_data(&mut d, bytes)?;
    expect_end(&d, bytes)?;

    Ok(UnsignedTransaction::from_parts(body, raw_body, raw_aux))
}

pub(crate) fn decode_signed(bytes: &[u8]) -> CodecResult<SignedTransaction> {
    let mut d = Decoder::new(bytes);
    expect_array(&mut d, 3, CodecError::Malformed)?;

    let (body, raw_body) = decode_raw_body(&mut d, bytes)?;
    let (shelley, byron) = decode_witness_set(&mut d)?;
    let raw_aux = decode_raw_auxiliary_data(&mut d, bytes)?;
    expect_end(&d, bytes)?;

    Ok(SignedTransaction::new(
        UnsignedTransaction::from_parts(body, raw_body, raw_aux),
        shelley,
        byron,
    ))
}

/// `[key, witness]` as produced in witness-only mode
pub(crate) fn decode_witness_record(bytes: &[u8]) -> CodecResult<WitnessRecord> {
    let mut d = Decoder::new(bytes);
    expect_array(&mut d, 2, CodecError::Malformed)?;
    let key = d.u64().map_err(guard(CodecError::Malformed))?;
    let record = match key {
        witness_keys::SHELLEY => WitnessRecord::Shelley(decode_shelley_witness(&mut d)?),
        witness_keys::BYRON => WitnessRecord::Byron(decode_byron_witness(&mut d, bytes)?),
        other => {
            return Err(CodecError::Malformed(format!("unknown witness key {}", other)));
        }
    };
    expect_end(&d, bytes)?;
    Ok(record)
}

fn decode_raw_body(d: &mut Decoder<'_>, bytes: &[u8]) -> CodecResult<(TransactionBody, Vec<u8>)> {
    let start = d.position();
    let body = decode_body(d)?;
    Ok((body, bytes[start..d.position()].to_vec()))
}

/// Auxiliary data is null or a metadata map; kept as raw bytes
fn decode_raw_auxiliary_data(d: &mut Decoder<'_>, bytes: &[u8]) -> CodecResult<Vec<u8>> {
    let start = d.position();
    match d.datatype().map_err(guard(CodecError::Malformed))? {
        Type::Null | Type::Map | Type::MapIndef => {}
        other => {
            return Err(CodecError::Malformed(format!(
                "auxiliary data must be null or a map, got {:?}",
                other
            )));
        }
    }
    d.skip().map_err(guard(CodecError::Malformed))?;
    Ok(bytes[start..d.position()].to_vec())
}

fn expect_end(d: &Decoder<'_>, bytes: &[u8]) -> CodecResult<()> {
    if d.position() != bytes.len() {
        return Err(CodecError::Malformed(format!(
            "{} trailing bytes after envelope",
            bytes.len() - d.position()
        )));
    }
    Ok(())
}

// =============================================================================
// Body
// =============================================================================

fn decode_body(d: &mut Decoder<'_>) -> CodecResult<TransactionBody> {
    let entries = definite(d.map(), CodecError::Malformed, "body map")?;

    let mut inputs = None;
    let mut outputs = None;
    let mut fee = None;
    let mut ttl = None;
    let mut certificates = None;
    let mut withdrawals = None;
    let mut metadata_hash = None;

    for _ in 0..entries {
        let key = d.u64().map_err(guard(CodecError::Malformed))?;
        match key {
            body_keys::INPUTS => set_once(&mut inputs, key, || {
                decode_list(d, CodecError::InputShape, decode_input)
            })?,
            body_keys::OUTPUTS => set_once(&mut outputs, key, || {
                decode_list(d, CodecError::OutputShape, decode_output)
            })?,
            body_keys::FEE => set_once(&mut fee, key, || {
                d.u64().map_err(guard(CodecError::Malformed))
            })?,
            body_keys::TTL => set_once(&mut ttl, key, || {
                d.u64().map_err(guard(CodecError::Malformed))
            })?,
            body_keys::CERTIFICATES => set_once(&mut certificates, key, || {
                decode_list(d, CodecError::CertificateShape, decode_certificate)
            })?,
            body_keys::WITHDRAWALS => set_once(&mut withdrawals, key, || decode_withdrawals(d))?,
            body_keys::METADATA_HASH => set_once(&mut metadata_hash, key, || {
                fixed_bytes::<METADATA_HASH_LEN>(d, CodecError::Malformed)
            })?,
            other => {
                return Err(CodecError::Malformed(format!("unknown body key {}", other)));
            }
        }
    }

    Ok(TransactionBody {
        inputs: required(inputs, "inputs")?,
        outputs: required(outputs, "outputs")?,
        fee: required(fee, "fee")?,
        ttl: required(ttl, "ttl")?,
        certificates: certificates.unwrap_or_default(),
        withdrawals: withdrawals.unwrap_or_default(),
        metadata_hash,
    })
}

fn set_once<T>(
    slot: &mut Option<T>,
    key: u64,
    decode: impl FnOnce() -> CodecResult<T>,
) -> CodecResult<()> {
    if slot.is_some() {
        return Err(CodecError::Malformed(format!("duplicate body key {}", key)));
    }
    *slot = Some(decode()?);
    Ok(())
}

fn required<T>(slot: Option<T>, name: &str) -> CodecResult<T> {
    slot.ok_or_else(|| CodecError::Malformed(format!("missing {}", name)))
}

fn decode_input(d: &mut Decoder<'_>) -> CodecResult<TxInput> {
    expect_array(d, 2, CodecError::InputShape)?;
    let tx_hash = fixed_bytes::<TX_HASH_LEN>(d, CodecError::InputShape)?;
    let output_index = d.u32().map_err(guard(CodecError::InputShape))?;
    Ok(TxInput::new(tx_hash, output_index))
}

fn decode_output(d: &mut Decoder<'_>) -> CodecResult<TxOutput> {
    expect_array(d, 2, CodecError::OutputShape)?;
    let address = d.bytes().map_err(guard(CodecError::OutputShape))?;
    if address.is_empty() {
        return Err(CodecError::OutputShape("empty address".to_string()));
    }
    let coins = d.u64().map_err(guard(CodecError::OutputShape))?;
    Ok(TxOutput::new(address.to_vec(), coins))
}

fn decode_withdrawals(d: &mut Decoder<'_>) -> CodecResult<Vec<Withdrawal>> {
    let entries = definite(d.map(), CodecError::WithdrawalShape, "withdrawal map")?;
    (0..entries)
        .map(|_| {
            let reward_address = fixed_bytes::<REWARD_ADDRESS_LEN>(d, CodecError::WithdrawalShape)?;
            let coins = d.u64().map_err(guard(CodecError::WithdrawalShape))?;
            Ok(Withdrawal::new(reward_address, coins))
        })
        .collect()
}

// =============================================================================
// Certificates
// =============================================================================

fn decode_certificate(d: &mut Decoder<'_>) -> CodecResult<Certificate> {
    let len = definite(d.array(), CodecError::CertificateShape, "certificate")?;
    if len == 0 {
        return Err(CodecError::CertificateShape("empty certificate".to_string()));
    }
    let tag = d.u64().map_err(guard(CodecError::CertificateShape))?;

    let arity = match tag {
        certificate_tags::STAKE_KEY_REGISTRATION | certificate_tags::STAKE_KEY_DEREGISTRATION => 2,
        certificate_tags::DELEGATION => 3,
        certificate_tags::POOL_REGISTRATION => 10,
        other => return Err(CodecError::UnknownCertificateType(other)),
    };
    if len != arity {
        return Err(CodecError::CertificateShape(format!(
            "certificate type {} expects {} elements, got {}",
            tag, arity, len
        )));
    }

    match tag {
        certificate_tags::STAKE_KEY_REGISTRATION => Ok(Certificate::StakeKeyRegistration {
            credential: decode_credential(d)?,
        }),
        certificate_tags::STAKE_KEY_DEREGISTRATION => Ok(Certificate::StakeKeyDeregistration {
            credential: decode_credential(d)?,
        }),
        certificate_tags::DELEGATION => {
            let credential = decode_credential(d)?;
            let pool_hash = fixed_bytes::<KEY_HASH_LEN>(d, CodecError::CertificateShape)?;
            Ok(Certificate::Delegation {
                credential,
                pool_hash,
            })
        }
        _ => Ok(Certificate::PoolRegistration(Box::new(decode_pool_params(d)?))),
    }
}

fn decode_credential(d: &mut Decoder<'_>) -> CodecResult<StakeCredential> {
    expect_array(d, 2, CodecError::CertificateShape)?;
    let kind = d.u64().map_err(guard(CodecError::CertificateShape))?;
    let pub_key_hash = fixed_bytes::<KEY_HASH_LEN>(d, CodecError::CertificateShape)?;
    Ok(StakeCredential { kind, pub_key_hash })
}

fn decode_pool_params(d: &mut Decoder<'_>) -> CodecResult<PoolParams> {
    let shape = CodecError::CertificateShape;

    let pool_key_hash = fixed_bytes::<KEY_HASH_LEN>(d, shape)?;
    let vrf_key_hash = fixed_bytes::<VRF_KEY_HASH_LEN>(d, shape)?;
    let pledge = d.u64().map_err(guard(shape))?;
    let cost = d.u64().map_err(guard(shape))?;

    match d.tag().map_err(guard(shape))? {
        Tag::Unassigned(RATIONAL_TAG) => {}
        other => return Err(shape(format!("margin must be tagged {}, got {:?}", RATIONAL_TAG, other))),
    }
    expect_array(d, 2, shape)?;
    let margin = Margin {
        numerator: d.u64().map_err(guard(shape))?,
        denominator: d.u64().map_err(guard(shape))?,
    };

    let reward_address = fixed_bytes::<REWARD_ADDRESS_LEN>(d, shape)?;
    let owners = decode_list(d, shape, |d| fixed_bytes::<KEY_HASH_LEN>(d, shape))?;
    let relays = decode_list(d, CodecError::RelayShape, decode_relay)?;

    let metadata = if is_null(d, shape)? {
        None
    } else {
        expect_array(d, 2, shape)?;
        let url = d.str().map_err(guard(shape))?.to_string();
        let hash = fixed_bytes::<METADATA_HASH_LEN>(d, shape)?;
        Some(PoolMetadata { url, hash })
    };

    Ok(PoolParams {
        pool_key_hash,
        vrf_key_hash,
        pledge,
        cost,
        margin,
        reward_address,
        owners,
        relays,
        metadata,
    })
}

fn decode_relay(d: &mut Decoder<'_>) -> CodecResult<Relay> {
    let shape = CodecError::RelayShape;
    let len = definite(d.array(), shape, "relay")?;
    if len == 0 {
        return Err(shape("empty relay".to_string()));
    }
    let tag = d.u64().map_err(guard(shape))?;

    match (tag, len) {
        (relay_tags::SINGLE_HOST_IP, 1..=4) => {
            let port = if len > 1 {
                optional(d, shape, |d| d.u16().map_err(guard(shape)))?
            } else {
                None
            };
            let ipv4 = if len > 2 {
                optional(d, shape, |d| fixed_bytes::<4>(d, shape))?
            } else {
                None
            };
            let ipv6 = if len > 3 {
                optional(d, shape, |d| fixed_bytes::<16>(d, shape))?
            } else {
                None
            };
            Ok(Relay::SingleHostIp { port, ipv4, ipv6 })
        }
        (relay_tags::SINGLE_HOST_NAME, 3) => {
            let port = d.u16().map_err(guard(shape))?;
            let dns_name = d.str().map_err(guard(shape))?.to_string();
            Ok(Relay::SingleHostName { port, dns_name })
        }
        (relay_tags::MULTI_HOST_NAME, 2) => {
            let dns_name = d.str().map_err(guard(shape))?.to_string();
            Ok(Relay::MultiHostName { dns_name })
        }
        (relay_tags::SINGLE_HOST_IP..=relay_tags::MULTI_HOST_NAME, _) => Err(shape(format!(
            "relay type {} has wrong arity {}",
            tag, len
        ))),
        _ => Err(shape(format!("unknown relay type {}", tag))),
    }
}

// =============================================================================
// Witnesses
// =============================================================================

fn decode_witness_set(
    d: &mut Decoder<'_>,
) -> CodecResult<(Vec<ShelleyWitness>, Vec<ByronWitness>)> {
    let bytes = d.input();
    let entries = definite(d.map(), CodecError::Malformed, "witness set")?;
    let mut shelley = None;
    let mut byron = None;

    for _ in 0..entries {
        let key = d.u64().map_err(guard(CodecError::Malformed))?;
        match key {
            witness_keys::SHELLEY => set_once(&mut shelley, key, || {
                decode_list(d, CodecError::Malformed, decode_shelley_witness)
            })?,
            witness_keys::BYRON => set_once(&mut byron, key, || {
                decode_list(d, CodecError::Malformed, |d| decode_byron_witness(d, bytes))
            })?,
            other => {
                return Err(CodecError::Malformed(format!("unsupported witness key {}", other)));
            }
        }
    }

    Ok((shelley.unwrap_or_default(), byron.unwrap_or_default()))
}

fn decode_shelley_witness(d: &mut Decoder<'_>) -> CodecResult<ShelleyWitness> {
    let shape = CodecError::Malformed;
    expect_array(d, 2, shape)?;
    Ok(ShelleyWitness {
        pub_key: fixed_bytes::<32>(d, shape)?,
        signature: fixed_bytes::<64>(d, shape)?,
    })
}

fn decode_byron_witness(d: &mut Decoder<'_>, bytes: &[u8]) -> CodecResult<ByronWitness> {
    let shape = CodecError::Malformed;
    expect_array(d, 4, shape)?;
    let pub_key = fixed_bytes::<32>(d, shape)?;
    let signature = fixed_bytes::<64>(d, shape)?;
    let chain_code = fixed_bytes::<32>(d, shape)?;
    let start = d.position();
    d.skip().map_err(guard(shape))?;
    Ok(ByronWitness {
        pub_key,
        signature,
        chain_code,
        attributes: bytes[start..d.position()].to_vec(),
    })
}

// =============================================================================
// Guards
// =============================================================================

/// Length of a definite-length array or map
fn definite(
    header: Result<Option<u64>, minicbor::decode::Error>,
    shape: Shape,
    what: &str,
) -> CodecResult<u64> {
    header
        .map_err(guard(shape))?
        .ok_or_else(|| shape(format!("{} must have definite length", what)))
}

fn expect_array(d: &mut Decoder<'_>, len: u64, shape: Shape) -> CodecResult<()> {
    let actual = definite(d.array(), shape, "array")?;
    if actual != len {
        return Err(shape(format!("expected {} elements, got {}", len, actual)));
    }
    Ok(())
}

fn fixed_bytes<const N: usize>(d: &mut Decoder<'_>, shape: Shape) -> CodecResult<[u8; N]> {
    let bytes = d.bytes().map_err(guard(shape))?;
    bytes
        .try_into()
        .map_err(|_| shape(format!("expected {} bytes, got {}", N, bytes.len())))
}

fn decode_list<T>(
    d: &mut Decoder<'_>,
    shape: Shape,
    mut item: impl FnMut(&mut Decoder<'_>) -> CodecResult<T>,
) -> CodecResult<Vec<T>> {
    let len = definite(d.array(), shape, "list")?;
    (0..len).map(|_| item(d)).collect()
}

fn is_null(d: &mut Decoder<'_>, shape: Shape) -> CodecResult<bool> {
    if d.datatype().map_err(guard(shape))? == Type::Null {
        d.null().map_err(guard(shape))?;
        return Ok(true);
    }
    Ok(false)
}

fn optional<T>(
    d: &mut Decoder<'_>,
    shape: Shape,
    item: impl FnOnce(&mut Decoder<'_>) -> CodecResult<T>,
) -> CodecResult<Option<T>> {
    if is_null(d, shape)? {
        Ok(None)
    } else {
        item(d).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_TX: &str = "82a40081825820941a33cf9d39bba4102c4eff8bd54efd72cf93e65a023a4475ba48a58fc0de000001818258390114c16d7f43243bd81478e68b9db53a8528fd4fb1078d58d54a7f11241d227aefa4b773149170885aadba30aab3127cc611ddbc4999def61c1a002b2b4b021a00029b75031a00a8474cf6";
    const BYRON_OUTPUT_BODY_PREFIX: &str = "82a500818258201af8fa0b754ff99253d983894e63a2b09cbb56c833ba18c3384210163f63dcfc00018182582b82d818582183581c9e1c71de652ec8b85fec296f0685ca3988781c94a2e1a5d89d92f45fa0001a0d0c25611a002dd2e802182a030a04";
    const STAKE_HASH: &str = "1d227aefa4b773149170885aadba30aab3127cc611ddbc4999def61c";

    fn decode(hex_str: &str) -> CodecResult<UnsignedTransaction> {
        decode_unsigned(&hex::decode(hex_str).unwrap())
    }

    fn with_certificate(cert_hex: &str) -> String {
        format!("{}81{}f6", BYRON_OUTPUT_BODY_PREFIX, cert_hex)
    }

    #[test]
    fn test_decode_simple_transaction() {
        let tx = decode(SIMPLE_TX).unwrap();
        let body = &tx.body;
        assert_eq!(body.inputs.len(), 1);
        assert_eq!(body.outputs.len(), 1);
        assert_eq!(body.fee, 170_869);
        assert_eq!(body.ttl, 11_028_300);
        assert!(body.certificates.is_empty());
        assert!(body.withdrawals.is_empty());
        assert!(body.metadata_hash.is_none());
        assert_eq!(body.inputs[0].output_index, 0);
        assert_eq!(body.outputs[0].coins, 2_829_131);
        assert_eq!(tx.raw_auxiliary_data(), &[0xf6]);
    }

    #[test]
    fn test_decode_registration_certificate() {
        let tx = decode(&with_certificate(&format!("82008200581c{}", STAKE_HASH))).unwrap();
        match &tx.body.certificates[..] {
            [Certificate::StakeKeyRegistration { credential }] => {
                assert_eq!(hex::encode(credential.pub_key_hash), STAKE_HASH);
                assert_eq!(credential.kind, 0);
            }
            other => panic!("unexpected certificates {:?}", other),
        }
        assert_eq!(
            tx.id_hex(),
            "15116b11165fe2dad588fe87ae64211ded6d47a5ac29c6b8c5e5008a820fe73a"
        );
    }

    #[test]
    fn test_decode_delegation_certificate() {
        let pool = "f61c42cbf7c8c53af3f520508212ad3e72f674f957fe23ff0acb4973";
        let tx = decode(&with_certificate(&format!("83028200581c{}581c{}", STAKE_HASH, pool))).unwrap();
        match &tx.body.certificates[..] {
            [Certificate::Delegation {
                credential,
                pool_hash,
            }] => {
                assert_eq!(hex::encode(credential.pub_key_hash), STAKE_HASH);
                assert_eq!(hex::encode(pool_hash), pool);
            }
            other => panic!("unexpected certificates {:?}", other),
        }
        assert_eq!(
            tx.id_hex(),
            "17c2cf344736b8f4dbbd7f0b57ec13cee79f77fb4df7b32d859d26efbffe918c"
        );
    }

    #[test]
    fn test_unknown_certificate_type() {
        let err = decode(&with_certificate(&format!("82058200581c{}", STAKE_HASH))).unwrap_err();
        assert_eq!(err, CodecError::UnknownCertificateType(5));
        let signer_err: SignerError = err.into();
        assert_eq!(signer_err.code, ErrorCode::UnknownCertificateType);
        assert_eq!(signer_err.details.as_deref(), Some("type=5"));
    }

    #[test]
    fn test_certificate_shape_errors() {
        // registration with a 27-byte hash
        let err = decode(&with_certificate(&format!("82008200581b{}", &STAKE_HASH[2..]))).unwrap_err();
        assert!(matches!(err, CodecError::CertificateShape(_)));

        // delegation missing the pool hash
        let err = decode(&with_certificate(&format!("82028200581c{}", STAKE_HASH))).unwrap_err();
        assert!(matches!(err, CodecError::CertificateShape(_)));

        // credential that is not an array
        let err = decode(&with_certificate(&format!("8200581c{}", STAKE_HASH))).unwrap_err();
        assert!(matches!(err, CodecError::CertificateShape(_)));
    }

    #[test]
    fn test_input_and_output_shape_errors() {
        // input index is a byte string
        let bad_input = SIMPLE_TX.replacen("fc0de00000181", "fc0de0041000181", 1);
        assert!(matches!(decode(&bad_input), Err(CodecError::InputShape(_))));

        // output coins negative
        let bad_output = SIMPLE_TX.replacen("1a002b2b4b02", "3a002b2b4b02", 1);
        assert!(matches!(decode(&bad_output), Err(CodecError::OutputShape(_))));
    }

    #[test]
    fn test_withdrawal_shape_error() {
        // 28-byte reward address
        let tx = format!(
            "{}05a1581c{}186ff6",
            "82a500818258203b40265111d8bb3c3c608d95b3a0bf83461ace32d79336579a1939b3aad1c0b700018182582b82d818582183581c9e1c71de652ec8b85fec296f0685ca3988781c94a2e1a5d89d92f45fa0001a0d0c25611a002dd2e802182a030a",
            STAKE_HASH
        );
        assert!(matches!(decode(&tx), Err(CodecError::WithdrawalShape(_))));
    }

    #[test]
    fn test_envelope_errors() {
        // trailing byte
        assert!(matches!(decode(&format!("{}00", SIMPLE_TX)), Err(CodecError::Malformed(_))));
        // three-element envelope is not an unsigned transaction
        assert!(matches!(decode(&format!("83{}", &SIMPLE_TX[2..])), Err(CodecError::Malformed(_))));
        // auxiliary data of the wrong type
        let bad_aux = format!("{}01", &SIMPLE_TX[..SIMPLE_TX.len() - 2]);
        assert!(matches!(decode(&bad_aux), Err(CodecError::Malformed(_))));
        // missing ttl: map header claims 3 entries and ttl entry removed
        let missing_ttl = SIMPLE_TX.replacen("82a4", "82a3", 1).replacen("031a00a8474c", "", 1);
        assert!(matches!(decode(&missing_ttl), Err(CodecError::Malformed(_))));
        assert!(decode("").is_err());
    }

    #[test]
    fn test_unknown_and_duplicate_body_keys() {
        let unknown = SIMPLE_TX.replacen("82a4", "82a5", 1).replacen("031a00a8474c", "031a00a8474c0900", 1);
        assert!(matches!(decode(&unknown), Err(CodecError::Malformed(_))));

        let duplicate = SIMPLE_TX.replacen("82a4", "82a5", 1).replacen("031a00a8474c", "031a00a8474c0301", 1);
        assert!(matches!(decode(&duplicate), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_relay_guards() {
        let decode_relay_hex = |h: &str| {
            let bytes = hex::decode(h).unwrap();
            let mut d = Decoder::new(&bytes);
            decode_relay(&mut d)
        };
        assert_eq!(
            decode_relay_hex("8400190bb84436e44b9af6").unwrap(),
            Relay::SingleHostIp {
                port: Some(3000),
                ipv4: Some([0x36, 0xe4, 0x4b, 0x9a]),
                ipv6: None,
            }
        );
        assert_eq!(
            decode_relay_hex("8100").unwrap(),
            Relay::SingleHostIp {
                port: None,
                ipv4: None,
                ipv6: None,
            }
        );
        // ipv4 with 3 bytes
        assert!(matches!(decode_relay_hex("8400190bb84336e44bf6"), Err(CodecError::RelayShape(_))));
        // single host name without port
        assert!(matches!(decode_relay_hex("8201616161"), Err(CodecError::RelayShape(_))));
        // unknown relay type
        assert!(matches!(decode_relay_hex("820361"), Err(CodecError::RelayShape(_))));
        // port out of u16 range
        assert!(matches!(decode_relay_hex("82001a00010000"), Err(CodecError::RelayShape(_))));
    }

    #[test]
    fn test_decode_witness_record() {
        let hex_str = format!("8200825820{}5840{}", "01".repeat(32), "02".repeat(64));
        let record = decode_witness_record(&hex::decode(&hex_str).unwrap()).unwrap();
        assert_eq!(record.key(), witness_keys::SHELLEY);

        let byron = format!("8202845820{}5840{}5820{}a0", "01".repeat(32), "02".repeat(64), "03".repeat(32));
        let record = decode_witness_record(&hex::decode(&byron).unwrap()).unwrap();
        match record {
            WitnessRecord::Byron(w) => assert_eq!(w.attributes, vec![0xa0]),
            other => panic!("expected byron witness, got {:?}", other),
        }
    }
}
