//! Signing Orchestrator
//!
//! Drives one signing session end to end:
//!
//! `Decoded → PathsResolved → RequestBuilt → DeviceInvoked →
//! ResponseValidated → WitnessesBuilt → Encoded`
//!
//! Each state is entered once and in order. Any failure aborts the session
//! without partial output.

use crate::error::{SignerError, SignerResult};
use crate::signing::compiler::{build_witnesses, compile_signed, single_witness, verify_witnesses};
use crate::signing::device::{HardwareWallet, ResolvedPaths, SigningRequest};
use crate::signing::preflight::{self, SigningMode};
use crate::tx::{SignedTransaction, UnsignedTransaction, WitnessRecord};
use crate::types::{ChangeOutput, ExtendedPublicKey, HwSigningData};
use crate::utils::SignerSettings;
use crate::wallet::DerivationPath;
use crate::{log_debug, log_error, log_info, log_warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

const MODULE: &str = "orchestrator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningState {
    Decoded,
    PathsResolved,
    RequestBuilt,
    DeviceInvoked,
    ResponseValidated,
    WitnessesBuilt,
    Encoded,
}

impl SigningState {
    /// State that must precede this one
    fn predecessor(self) -> Option<SigningState> {
        use SigningState::*;
        match self {
            Decoded => None,
            PathsResolved => Some(Decoded),
            RequestBuilt => Some(PathsResolved),
            DeviceInvoked => Some(RequestBuilt),
            ResponseValidated => Some(DeviceInvoked),
            WitnessesBuilt => Some(ResponseValidated),
            Encoded => Some(WitnessesBuilt),
        }
    }
}

impl fmt::Display for SigningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SigningState::Decoded => "decoded",
            SigningState::PathsResolved => "paths_resolved",
            SigningState::RequestBuilt => "request_built",
            SigningState::DeviceInvoked => "device_invoked",
            SigningState::ResponseValidated => "response_validated",
            SigningState::WitnessesBuilt => "witnesses_built",
            SigningState::Encoded => "encoded",
        };
        f.write_str(name)
    }
}

/// Progress through one signing session
#[derive(Debug, Default)]
struct Session {
    state: Option<SigningState>,
}

impl Session {
    fn enter(&mut self, next: SigningState) -> SignerResult<()> {
        if self.state != next.predecessor() {
            return Err(SignerError::internal(format!(
                "Invalid signing state transition to {}",
                next
            ))
            .with_details(format!("from={:?}", self.state)));
        }
        log_debug!(MODULE, "State transition", state = next);
        self.state = Some(next);
        Ok(())
    }
}

/// Witnesses collected for a decoded transaction
struct SessionOutput {
    transaction: UnsignedTransaction,
    records: Vec<WitnessRecord>,
}

/// Signs transactions through one exclusively held hardware wallet
pub struct SigningOrchestrator<'d, W: HardwareWallet + ?Sized> {
    device: &'d mut W,
    settings: SignerSettings,
}

impl<'d, W: HardwareWallet + ?Sized> SigningOrchestrator<'d, W> {
    /// The global debug log gate is left alone; call
    /// [`SignerSettings::apply_logging`] to switch it.
    pub fn new(device: &'d mut W, settings: SignerSettings) -> SignerResult<Self> {
        settings.validate()?;
        Ok(Self { device, settings })
    }

    pub fn settings(&self) -> &SignerSettings {
        &self.settings
    }

    /// Id of an unsigned transaction, no device involved
    pub fn transaction_id_hex(unsigned_tx_hex: &str) -> SignerResult<String> {
        Ok(UnsignedTransaction::from_hex(unsigned_tx_hex)?.id_hex())
    }

    pub fn device_version(&mut self) -> SignerResult<String> {
        let version = self.device.version()?;
        log_info!(MODULE, "Device version", device = self.device.kind(), version = version);
        Ok(version)
    }

    /// Have the device derive and display one of the caller's addresses
    pub fn show_address(
        &mut self,
        payment_path: &DerivationPath,
        stake_path: Option<&DerivationPath>,
        address: &[u8],
    ) -> SignerResult<()> {
        log_info!(
            MODULE,
            "Showing address on device",
            device = self.device.kind(),
            path = payment_path
        );
        self.device
            .show_address(payment_path, stake_path, address, &self.settings.network)
    }

    pub fn extended_public_key(&mut self, path: &DerivationPath) -> SignerResult<ExtendedPublicKey> {
        let xpub = self.device.extended_public_key(path)?;
        log_debug!(MODULE, "Exported public key", path = path, xpub = xpub);
        Ok(xpub)
    }

    /// Sign an unsigned transaction with every given key
    pub fn sign(
        &mut self,
        unsigned_tx_hex: &str,
        signing_files: &[HwSigningData],
        change_outputs: &[ChangeOutput],
    ) -> SignerResult<SignedTransaction> {
        let mut session = Session::default();
        let output = self.collect_witnesses(
            &mut session,
            unsigned_tx_hex,
            signing_files,
            change_outputs,
            SigningMode::Sign,
        )?;

        let signed = compile_signed(output.transaction, output.records);
        session.enter(SigningState::Encoded)?;
        log_info!(
            MODULE,
            "Transaction signed",
            tx_id = signed.transaction.id_hex(),
            witnesses = signed.witness_count()
        );
        Ok(signed)
    }

    /// Produce the single witness one key contributes to a multi-party transaction
    pub fn witness(
        &mut self,
        unsigned_tx_hex: &str,
        signing_file: &HwSigningData,
        change_outputs: &[ChangeOutput],
    ) -> SignerResult<WitnessRecord> {
        let mut session = Session::default();
        let output = self.collect_witnesses(
            &mut session,
            unsigned_tx_hex,
            std::slice::from_ref(signing_file),
            change_outputs,
            SigningMode::Witness,
        )?;

        let record = single_witness(output.records).map_err(|e| {
            log_warn!(MODULE, "Device returned an unexpected witness count", error = e);
            e
        })?;
        session.enter(SigningState::Encoded)?;
        log_info!(
            MODULE,
            "Witness created",
            tx_id = output.transaction.id_hex(),
            era = format!("{:?}", record.era())
        );
        Ok(record)
    }

    fn collect_witnesses(
        &mut self,
        session: &mut Session,
        unsigned_tx_hex: &str,
        signing_files: &[HwSigningData],
        change_outputs: &[ChangeOutput],
        mode: SigningMode,
    ) -> SignerResult<SessionOutput> {
        let transaction = UnsignedTransaction::from_hex(unsigned_tx_hex).map_err(|e| {
            log_warn!(MODULE, "Rejected unsigned transaction", error = e);
            e
        })?;
        session.enter(SigningState::Decoded)?;

        preflight::validate(&transaction.body, signing_files, mode)?;
        let paths = ResolvedPaths::resolve(&transaction.body, signing_files)?;
        session.enter(SigningState::PathsResolved)?;

        let request = SigningRequest {
            transaction: &transaction,
            paths: &paths,
            change_outputs,
            signing_files,
            network: self.settings.network,
        };
        session.enter(SigningState::RequestBuilt)?;

        let local_id = transaction.id();
        log_info!(
            MODULE,
            "Sending transaction to device",
            device = self.device.kind(),
            tx_id = hex::encode(local_id)
        );
        let signatures = self.device.sign_transaction(&request)?;
        session.enter(SigningState::DeviceInvoked)?;

        if !bool::from(signatures.tx_id.ct_eq(&local_id)) {
            let err = SignerError::tx_serialization_mismatch(
                &hex::encode(local_id),
                &hex::encode(signatures.tx_id),
            );
            log_error!(MODULE, "Device signed a different transaction", error = err);
            return Err(err);
        }
        session.enter(SigningState::ResponseValidated)?;

        let records = build_witnesses(&signatures.witnesses, signing_files)?;
        if self.settings.verify_witness_signatures {
            verify_witnesses(&local_id, &records)?;
        }
        session.enter(SigningState::WitnessesBuilt)?;

        Ok(SessionOutput {
            transaction,
            records,
        })
    }
}
