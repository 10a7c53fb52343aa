//! CBOR encoding of bodies, signed envelopes and witness records

use super::types::*;
use super::{body_keys, witness_keys, RATIONAL_TAG};
use crate::error::{SignerError, SignerResult};
use minicbor::data::Tag;
use minicbor::encode::Error as EncodeError;
use minicbor::Encoder;
use std::convert::Infallible;

pub(crate) const CBOR_NULL: u8 = 0xf6;
pub(crate) const CBOR_ARRAY_2: u8 = 0x82;
pub(crate) const CBOR_EMPTY_MAP: u8 = 0xa0;

type Enc = Encoder<Vec<u8>>;
type EncodeResult = Result<(), EncodeError<Infallible>>;

fn finish(result: EncodeResult, e: Enc) -> SignerResult<Vec<u8>> {
    result
        .map(|_| e.into_writer())
        .map_err(|err| SignerError::internal(format!("CBOR encoding failed: {}", err)))
}

pub(crate) fn encode_body(body: &TransactionBody) -> SignerResult<Vec<u8>> {
    let mut e = Encoder::new(Vec::new());
    let result = write_body(&mut e, body);
    finish(result, e)
}

pub(crate) fn encode_signed(tx: &SignedTransaction) -> SignerResult<Vec<u8>> {
    let mut e = Encoder::new(Vec::new());
    let result = write_signed(&mut e, tx);
    finish(result, e)
}

pub(crate) fn encode_witness_record(record: &WitnessRecord) -> SignerResult<Vec<u8>> {
    let mut e = Encoder::new(Vec::new());
    let result = write_witness_record(&mut e, record);
    finish(result, e)
}

fn write_body(e: &mut Enc, body: &TransactionBody) -> EncodeResult {
    let entries = 4
        + u64::from(!body.certificates.is_empty())
        + u64::from(!body.withdrawals.is_empty())
        + u64::from(body.metadata_hash.is_some());
    e.map(entries)?;

    e.u64(body_keys::INPUTS)?.array(body.inputs.len() as u64)?;
    for input in &body.inputs {
        e.array(2)?.bytes(&input.tx_hash)?.u32(input.output_index)?;
    }

    e.u64(body_keys::OUTPUTS)?.array(body.outputs.len() as u64)?;
    for output in &body.outputs {
        e.array(2)?.bytes(&output.address)?.u64(output.coins)?;
    }

    e.u64(body_keys::FEE)?.u64(body.fee)?;
    e.u64(body_keys::TTL)?.u64(body.ttl)?;

    if !body.certificates.is_empty() {
        e.u64(body_keys::CERTIFICATES)?
            .array(body.certificates.len() as u64)?;
        for certificate in &body.certificates {
            write_certificate(e, certificate)?;
        }
    }

    if !body.withdrawals.is_empty() {
        e.u64(body_keys::WITHDRAWALS)?
            .map(body.withdrawals.len() as u64)?;
        for withdrawal in &body.withdrawals {
            e.bytes(&withdrawal.reward_address)?.u64(withdrawal.coins)?;
        }
    }

    if let Some(hash) = &body.metadata_hash {
        e.u64(body_keys::METADATA_HASH)?.bytes(hash)?;
    }
    Ok(())
}

fn write_credential(e: &mut Enc, credential: &StakeCredential) -> EncodeResult {
    e.array(2)?.u64(credential.kind)?.bytes(&credential.pub_key_hash)?;
    Ok(())
}

fn write_certificate(e: &mut Enc, certificate: &Certificate) -> EncodeResult {
    match certificate {
        Certificate::StakeKeyRegistration { credential }
        | Certificate::StakeKeyDeregistration { credential } => {
            e.array(2)?.u64(certificate.tag())?;
            write_credential(e, credential)
        }
        Certificate::Delegation {
            credential,
            pool_hash,
        } => {
            e.array(3)?.u64(certificate.tag())?;
            write_credential(e, credential)?;
            e.bytes(pool_hash)?;
            Ok(())
        }
        Certificate::PoolRegistration(params) => {
            e.array(10)?
                .u64(certificate.tag())?
                .bytes(&params.pool_key_hash)?
                .bytes(&params.vrf_key_hash)?
                .u64(params.pledge)?
                .u64(params.cost)?
                .tag(Tag::Unassigned(RATIONAL_TAG))?
                .array(2)?
                .u64(params.margin.numerator)?
                .u64(params.margin.denominator)?
                .bytes(&params.reward_address)?;

            e.array(params.owners.len() as u64)?;
            for owner in &params.owners {
                e.bytes(owner)?;
            }

            e.array(params.relays.len() as u64)?;
            for relay in &params.relays {
                write_relay(e, relay)?;
            }

            match &params.metadata {
                Some(metadata) => {
                    e.array(2)?.str(&metadata.url)?.bytes(&metadata.hash)?;
                }
                None => {
                    e.null()?;
                }
            }
            Ok(())
        }
    }
}

fn write_relay(e: &mut Enc, relay: &Relay) -> EncodeResult {
    match relay {
        Relay::SingleHostIp { port, ipv4, ipv6 } => {
            e.array(4)?.u64(relay.tag())?;
            match port {
                Some(port) => e.u16(*port)?,
                None => e.null()?,
            };
            match ipv4 {
                Some(ip) => e.bytes(ip)?,
                None => e.null()?,
            };
            match ipv6 {
                Some(ip) => e.bytes(ip)?,
                None => e.null()?,
            };
        }
        Relay::SingleHostName { port, dns_name } => {
            e.array(3)?.u64(relay.tag())?.u16(*port)?.str(dns_name)?;
        }
        Relay::MultiHostName { dns_name } => {
            e.array(2)?.u64(relay.tag())?.str(dns_name)?;
        }
    }
    Ok(())
}

fn write_signed(e: &mut Enc, tx: &SignedTransaction) -> EncodeResult {
    e.array(3)?;
    e.writer_mut().extend_from_slice(tx.transaction.raw_body());

    let entries = u64::from(!tx.shelley_witnesses.is_empty())
        + u64::from(!tx.byron_witnesses.is_empty());
    e.map(entries)?;

    if !tx.shelley_witnesses.is_empty() {
        e.u64(witness_keys::SHELLEY)?
            .array(tx.shelley_witnesses.len() as u64)?;
        for witness in &tx.shelley_witnesses {
            write_shelley_witness(e, witness)?;
        }
    }

    if !tx.byron_witnesses.is_empty() {
        e.u64(witness_keys::BYRON)?
            .array(tx.byron_witnesses.len() as u64)?;
        for witness in &tx.byron_witnesses {
            write_byron_witness(e, witness)?;
        }
    }

    e.writer_mut()
        .extend_from_slice(tx.transaction.raw_auxiliary_data());
    Ok(())
}

fn write_witness_record(e: &mut Enc, record: &WitnessRecord) -> EncodeResult {
    e.array(2)?.u64(record.key())?;
    match record {
        WitnessRecord::Shelley(witness) => write_shelley_witness(e, witness),
        WitnessRecord::Byron(witness) => write_byron_witness(e, witness),
    }
}

fn write_shelley_witness(e: &mut Enc, witness: &ShelleyWitness) -> EncodeResult {
    e.array(2)?.bytes(&witness.pub_key)?.bytes(&witness.signature)?;
    Ok(())
}

fn write_byron_witness(e: &mut Enc, witness: &ByronWitness) -> EncodeResult {
    e.array(4)?
        .bytes(&witness.pub_key)?
        .bytes(&witness.signature)?
        .bytes(&witness.chain_code)?;
    e.writer_mut().extend_from_slice(&witness.attributes);
    Ok(())
}
