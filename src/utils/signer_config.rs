//! Signer Configuration
//!
//! Runtime settings for one signing session:
//! - Network parameters passed through to the device
//! - Derivation scheme for locally derived child keys
//! - Witness signature verification toggle
//! - Debug logging switch

use crate::error::{SignerError, SignerResult};
use crate::utils::logging;
use crate::utils::network_config::NetworkConfig;
use crate::wallet::DerivationScheme;
use serde::{Deserialize, Serialize};

/// Settings threaded through the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignerSettings {
    /// Network id and protocol magic handed to the device
    pub network: NetworkConfig,
    /// Scheme used when deriving child public keys on the host
    pub derivation_scheme: DerivationScheme,
    /// Check every device signature against the transaction id
    pub verify_witness_signatures: bool,
    /// Emit debug-level log lines
    pub debug_logging: bool,
}

impl Default for SignerSettings {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl SignerSettings {
    /// Mainnet preset
    pub fn mainnet() -> Self {
        Self {
            network: NetworkConfig::MAINNET,
            derivation_scheme: DerivationScheme::V2,
            verify_witness_signatures: true,
            debug_logging: false,
        }
    }

    /// Legacy testnet preset
    pub fn testnet() -> Self {
        Self {
            network: NetworkConfig::TESTNET,
            ..Self::mainnet()
        }
    }

    /// Same settings on a different network
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_derivation_scheme(mut self, scheme: DerivationScheme) -> Self {
        self.derivation_scheme = scheme;
        self
    }

    /// Load settings from JSON; missing fields fall back to the mainnet preset
    pub fn from_json(json: &str) -> SignerResult<Self> {
        let settings: SignerSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> SignerResult<()> {
        self.network
            .validate()
            .map_err(|e| SignerError::invalid_config(format!("Invalid network: {}", e.message)))
    }

    /// Switch the global debug log gate to match these settings
    pub fn apply_logging(&self) {
        if self.debug_logging {
            logging::enable_debug();
        } else {
            logging::disable_debug();
        }
    }
}
