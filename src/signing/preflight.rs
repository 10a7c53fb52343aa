//! Pre-flight checks
//!
//! Structural rules on the transaction and the descriptor set that are
//! checked before any path is resolved or any device is touched.

use crate::error::{ErrorCode, SignerError, SignerResult};
use crate::tx::TransactionBody;
use crate::types::HwSigningData;
use crate::wallet::filter_signing_files;
use serde::{Deserialize, Serialize};

/// Whether the caller wants a full signed transaction or one witness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningMode {
    Sign,
    Witness,
}

pub fn validate(
    body: &TransactionBody,
    signing_files: &[HwSigningData],
    mode: SigningMode,
) -> SignerResult<()> {
    if body.inputs.is_empty() {
        return Err(SignerError::new(
            ErrorCode::MissingInput,
            "Transaction has no inputs",
        ));
    }
    if body.outputs.is_empty() {
        return Err(SignerError::new(
            ErrorCode::MissingOutput,
            "Transaction has no outputs",
        ));
    }
    if signing_files.is_empty() {
        return Err(SignerError::new(
            ErrorCode::MissingSigningFile,
            "No hardware signing file given",
        ));
    }
    if mode == SigningMode::Witness && signing_files.len() > 1 {
        return Err(SignerError::new(
            ErrorCode::TooManySigningFiles,
            "Witnessing takes exactly one hardware signing file",
        )
        .with_details(format!("files={}", signing_files.len())));
    }

    let files = filter_signing_files(signing_files);

    if body.has_pool_registration() {
        if body.certificates.len() != 1 {
            return Err(SignerError::new(
                ErrorCode::MultipleCertificatesWithPoolReg,
                "A pool registration must be the only certificate",
            )
            .with_details(format!("certificates={}", body.certificates.len())));
        }
        if !body.withdrawals.is_empty() {
            return Err(SignerError::new(
                ErrorCode::WithdrawalIncludedWithPoolReg,
                "Withdrawals are not allowed with a pool registration",
            ));
        }
        if !files.payment.is_empty() {
            return Err(SignerError::new(
                ErrorCode::PaymentFileIncludedWithPoolReg,
                "Payment signing files are not allowed with a pool registration",
            ));
        }
        return match files.stake.len() {
            0 => Err(missing_staking_file()),
            1 => Ok(()),
            n => Err(SignerError::new(
                ErrorCode::MultipleStakingSigningFilesWithPoolReg,
                "A pool registration takes exactly one staking signing file",
            )
            .with_details(format!("files={}", n))),
        };
    }

    if mode == SigningMode::Sign && files.payment.is_empty() {
        return Err(SignerError::new(
            ErrorCode::MissingPaymentSigningFile,
            "Signing needs at least one payment signing file",
        ));
    }

    let needs_stake_key = !body.certificates.is_empty() || !body.withdrawals.is_empty();
    if mode == SigningMode::Sign && needs_stake_key && files.stake.is_empty() {
        return Err(missing_staking_file());
    }

    Ok(())
}

fn missing_staking_file() -> SignerError {
    SignerError::new(
        ErrorCode::MissingStakingSigningFile,
        "A staking signing file is required",
    )
}
