//! Witness Compiler
//!
//! Turns the raw signatures a device returns into Shelley or Byron witness
//! records and folds them into a signed envelope.

use crate::error::{ErrorCode, SignerError, SignerResult};
use crate::signing::device::DeviceWitness;
use crate::tx::{
    ByronWitness, ShelleyWitness, SignedTransaction, UnsignedTransaction, WitnessRecord,
};
use crate::types::HwSigningData;
use crate::wallet::{find_by_path, WitnessEra};
use ed25519_dalek::{Signature, VerifyingKey};

/// Build one witness record per device signature.
///
/// The era comes from the signing path; key material comes from the
/// descriptor with that exact path.
pub fn build_witnesses(
    device_witnesses: &[DeviceWitness],
    signing_files: &[HwSigningData],
) -> SignerResult<Vec<WitnessRecord>> {
    device_witnesses
        .iter()
        .map(|witness| {
            let data = find_by_path(&witness.path, signing_files)?;
            let record = match WitnessEra::of(&witness.path) {
                WitnessEra::Shelley => WitnessRecord::Shelley(ShelleyWitness {
                    pub_key: data.xpub.pub_key,
                    signature: witness.signature,
                }),
                WitnessEra::Byron => WitnessRecord::Byron(ByronWitness::new(
                    data.xpub.pub_key,
                    witness.signature,
                    data.xpub.chain_code,
                )),
            };
            Ok(record)
        })
        .collect()
}

/// Check every signature against the transaction id
pub fn verify_witnesses(tx_id: &[u8; 32], records: &[WitnessRecord]) -> SignerResult<()> {
    for record in records {
        let key = VerifyingKey::from_bytes(record.pub_key()).map_err(|e| {
            SignerError::new(
                ErrorCode::WitnessVerification,
                format!("Witness public key is not a valid ed25519 key: {}", e),
            )
            .with_details(hex::encode(record.pub_key()))
        })?;
        let signature = Signature::from_bytes(record.signature());
        key.verify_strict(tx_id, &signature).map_err(|_| {
            SignerError::new(
                ErrorCode::WitnessVerification,
                "Witness signature does not verify against the transaction id",
            )
            .with_details(hex::encode(record.pub_key()))
        })?;
    }
    Ok(())
}

/// Signed envelope with the witnesses split by era
pub fn compile_signed(
    transaction: UnsignedTransaction,
    records: Vec<WitnessRecord>,
) -> SignedTransaction {
    let mut shelley = Vec::new();
    let mut byron = Vec::new();
    for record in records {
        match record {
            WitnessRecord::Shelley(w) => shelley.push(w),
            WitnessRecord::Byron(w) => byron.push(w),
        }
    }
    SignedTransaction::new(transaction, shelley, byron)
}

/// The only witness, or `MultipleWitnesses` for any other count
pub fn single_witness(records: Vec<WitnessRecord>) -> SignerResult<WitnessRecord> {
    let count = records.len();
    let mut records = records.into_iter();
    match (records.next(), records.next()) {
        (Some(record), None) => Ok(record),
        _ => Err(SignerError::multiple_witnesses(count)),
    }
}
