//! Network Configuration
//!
//! Network parameters handed to the device. They always come from
//! configuration and are never inferred from transaction bytes.

use crate::error::{SignerError, SignerResult};
use serde::{Deserialize, Serialize};

/// Mainnet protocol magic
pub const MAINNET_PROTOCOL_MAGIC: u32 = 764_824_073;

/// Legacy testnet protocol magic
pub const TESTNET_PROTOCOL_MAGIC: u32 = 42;

/// Network id nibble used in Shelley address headers
pub mod network_ids {
    pub const TESTNET: u8 = 0;
    pub const MAINNET: u8 = 1;
}

/// Network selection passed through to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub network_id: u8,
    pub protocol_magic: u32,
}

impl NetworkConfig {
    pub const MAINNET: NetworkConfig = NetworkConfig {
        network_id: network_ids::MAINNET,
        protocol_magic: MAINNET_PROTOCOL_MAGIC,
    };

    pub const TESTNET: NetworkConfig = NetworkConfig {
        network_id: network_ids::TESTNET,
        protocol_magic: TESTNET_PROTOCOL_MAGIC,
    };

    /// A custom testnet, e.g. a preview or private network
    pub fn custom(network_id: u8, protocol_magic: u32) -> SignerResult<Self> {
        let config = Self {
            network_id,
            protocol_magic,
        };
        config.validate()?;
        Ok(config)
    }

    /// Look up a preset by name (`mainnet`, `testnet`)
    pub fn from_name(name: &str) -> SignerResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Self::MAINNET),
            "testnet" => Ok(Self::TESTNET),
            other => Err(SignerError::invalid_config(format!("Unknown network '{}'", other))),
        }
    }

    pub fn is_mainnet(&self) -> bool {
        self.network_id == network_ids::MAINNET
    }

    /// Reject parameter combinations that would sign for the wrong chain
    pub fn validate(&self) -> SignerResult<()> {
        if self.network_id > 0x0f {
            return Err(SignerError::invalid_config(format!(
                "Network id {} does not fit in an address header nibble",
                self.network_id
            )));
        }
        if self.is_mainnet() != (self.protocol_magic == MAINNET_PROTOCOL_MAGIC) {
            return Err(SignerError::invalid_config(
                "Mainnet network id and mainnet protocol magic must be used together",
            )
            .with_details(format!(
                "network_id={} protocol_magic={}",
                self.network_id, self.protocol_magic
            )));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::MAINNET
    }
}
