//! Unified error types for the signer core
//!
//! Every component failure flows through [`SignerError`] so callers get a
//! machine-readable kind plus minimal diagnostic context (offending path,
//! hash or field) and can translate it into human text themselves.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all signing operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl SignerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn malformed_transaction(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedTransaction, msg)
    }

    pub fn no_matching_signing_key(key_hash: &[u8]) -> Self {
        Self::new(ErrorCode::NoMatchingSigningKey, "No signing key matches key hash")
            .with_details(hex::encode(key_hash))
    }

    pub fn missing_hw_signing_data_at_path(path: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::MissingHwSigningDataAtPath,
            "Can not find hw signing data with path",
        )
        .with_details(path.to_string())
    }

    pub fn device_operation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::DeviceOperation, msg)
    }

    pub fn tx_serialization_mismatch(local_hex: &str, device_hex: &str) -> Self {
        Self::new(ErrorCode::TxSerializationMismatch, "Tx serialization mismatch")
            .with_details(format!("local={} device={}", local_hex, device_hex))
    }

    pub fn multiple_witnesses(count: usize) -> Self {
        Self::new(
            ErrorCode::MultipleWitnesses,
            "Expected exactly one witness from the device",
        )
        .with_details(format!("witnesses={}", count))
    }

    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPath, msg)
    }

    pub fn invalid_xpub(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidExtendedPublicKey, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Whether the caller may retry after reconnecting the device.
    ///
    /// Integrity failures are never retryable: retrying blind-signs again.
    pub fn is_retryable(&self) -> bool {
        matches!(self.code, ErrorCode::DeviceOperation)
    }
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SignerError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Decode-time structural violations
    MalformedTransaction,
    InputShape,
    OutputShape,
    WithdrawalShape,
    CertificateShape,
    RelayShape,
    UnknownCertificateType,

    // Key resolution
    NoMatchingSigningKey,
    MissingHwSigningDataAtPath,
    MissingSigningFile,
    MissingPaymentSigningFile,
    MissingStakingSigningFile,
    TooManySigningFiles,

    // Pre-flight rules
    MissingInput,
    MissingOutput,
    MultipleCertificatesWithPoolReg,
    WithdrawalIncludedWithPoolReg,
    PaymentFileIncludedWithPoolReg,
    MultipleStakingSigningFilesWithPoolReg,

    // Device and integrity
    DeviceOperation,
    TxSerializationMismatch,
    MultipleWitnesses,
    WitnessVerification,
    UnexpectedWitnessKey,

    // Inputs from collaborators
    InvalidPath,
    InvalidExtendedPublicKey,
    InvalidConfig,
    HexError,
    JsonError,

    // Internal
    Internal,
}

/// Result type alias for signer operations
pub type SignerResult<T> = Result<T, SignerError>;

// Conversions from common error types

impl From<serde_json::Error> for SignerError {
    fn from(e: serde_json::Error) -> Self {
        SignerError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for SignerError {
    fn from(e: hex::FromHexError) -> Self {
        SignerError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<minicbor::decode::Error> for SignerError {
    fn from(e: minicbor::decode::Error) -> Self {
        SignerError::new(ErrorCode::MalformedTransaction, e.to_string())
    }
}
