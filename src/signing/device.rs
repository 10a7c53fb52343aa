//! Hardware wallet capability contract
//!
//! One trait for both device families. The orchestrator is written once
//! against it; each adapter owns the translation into its vendor's request
//! vocabulary.

use crate::error::{ErrorCode, SignerError, SignerResult};
use crate::tx::{TransactionBody, TxOutput, UnsignedTransaction};
use crate::types::{ChangeOutput, DeviceKind, ExtendedPublicKey, HwSigningData};
use crate::utils::NetworkConfig;
use crate::wallet::{
    certificate_path, filter_signing_files, input_path, withdrawal_path, DerivationPath,
};
use serde::{Deserialize, Serialize};

/// Capabilities shared by every supported device
pub trait HardwareWallet {
    fn kind(&self) -> DeviceKind;

    /// Human-readable firmware/app version
    fn version(&mut self) -> SignerResult<String>;

    /// Ask the device to derive and display `address` for confirmation
    fn show_address(
        &mut self,
        payment_path: &DerivationPath,
        stake_path: Option<&DerivationPath>,
        address: &[u8],
        network: &NetworkConfig,
    ) -> SignerResult<()>;

    fn extended_public_key(&mut self, path: &DerivationPath) -> SignerResult<ExtendedPublicKey>;

    /// Sign the transaction; returns the id the device computed and one
    /// signature per signing path.
    fn sign_transaction(&mut self, request: &SigningRequest<'_>) -> SignerResult<DeviceSignatures>;
}

/// Signing paths for every element that needs a signature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPaths {
    /// `None` leaves the input for another signer
    pub inputs: Vec<Option<DerivationPath>>,
    pub certificates: Vec<DerivationPath>,
    pub withdrawals: Vec<DerivationPath>,
}

impl ResolvedPaths {
    pub fn resolve(body: &TransactionBody, signing_files: &[HwSigningData]) -> SignerResult<Self> {
        let files = filter_signing_files(signing_files);

        let inputs = (0..body.inputs.len())
            .map(|i| input_path(&files.payment, i))
            .collect();
        let certificates = body
            .certificates
            .iter()
            .map(|certificate| certificate_path(certificate, &files.stake))
            .collect::<SignerResult<Vec<_>>>()?;
        let withdrawals = body
            .withdrawals
            .iter()
            .map(|withdrawal| withdrawal_path(withdrawal, &files.stake))
            .collect::<SignerResult<Vec<_>>>()?;

        Ok(Self {
            inputs,
            certificates,
            withdrawals,
        })
    }
}

/// Everything an adapter needs to build its request
#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    pub transaction: &'a UnsignedTransaction,
    pub paths: &'a ResolvedPaths,
    pub change_outputs: &'a [ChangeOutput],
    pub signing_files: &'a [HwSigningData],
    pub network: NetworkConfig,
}

impl<'a> SigningRequest<'a> {
    pub fn body(&self) -> &'a TransactionBody {
        &self.transaction.body
    }

    /// Change descriptor whose address equals the output's exactly
    pub fn change_output_for(&self, output: &TxOutput) -> Option<&'a ChangeOutput> {
        self.change_outputs
            .iter()
            .find(|change| change.address == output.address)
    }
}

/// A raw signature as returned by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceWitness {
    pub path: DerivationPath,
    #[serde(with = "crate::serde_bytes::hex64")]
    pub signature: [u8; 64],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSignatures {
    #[serde(with = "crate::serde_bytes::hex32")]
    pub tx_id: [u8; 32],
    pub witnesses: Vec<DeviceWitness>,
}

/// Normalize a transport failure into a device-operation error
pub(crate) fn device_failure(kind: DeviceKind) -> impl Fn(SignerError) -> SignerError {
    move |e| {
        if e.code == ErrorCode::DeviceOperation {
            return e;
        }
        let err = SignerError::device_operation(format!("{}: {}", kind, e.message));
        match e.details {
            Some(details) => err.with_details(details),
            None => err,
        }
    }
}

/// Decode a fixed-size hex field from a device response
pub(crate) fn device_hex<const N: usize>(
    kind: DeviceKind,
    field: &str,
    value: &str,
) -> SignerResult<[u8; N]> {
    let bytes = hex::decode(value).map_err(|e| {
        SignerError::device_operation(format!("{} returned invalid {}: {}", kind, field, e))
    })?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        SignerError::device_operation(format!(
            "{} returned {} of {} bytes, expected {}",
            kind,
            field,
            bytes.len(),
            N
        ))
    })
}
