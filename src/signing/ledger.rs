//! Ledger adapter
//!
//! Translates a signing request into the Ledger Cardano app's vocabulary:
//! hex strings, decimal amount strings and camelCase field names. The
//! transport that actually talks to the device is supplied by the caller.

use crate::error::SignerResult;
use crate::signing::device::{
    device_failure, device_hex, DeviceSignatures, DeviceWitness, HardwareWallet, SigningRequest,
};
use crate::tx::address::address_attributes;
use crate::tx::{Certificate, PoolParams, Relay, TxOutput};
use crate::types::{DeviceKind, ExtendedPublicKey, HwSigningData};
use crate::utils::NetworkConfig;
use crate::wallet::{
    derive_public_path, filter_signing_files, find_signing_path, DerivationPath,
    DerivationScheme,
};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Depth of the account-level key the app exports
const ACCOUNT_DEPTH: usize = 3;

// =============================================================================
// Transport
// =============================================================================

/// Raw Ledger Cardano app calls
pub trait LedgerTransport {
    fn get_version(&mut self) -> SignerResult<LedgerVersion>;

    fn get_extended_public_key(&mut self, path: &DerivationPath) -> SignerResult<LedgerXpub>;

    fn show_address(&mut self, request: &LedgerAddressRequest) -> SignerResult<()>;

    fn sign_transaction(&mut self, request: &LedgerSignRequest) -> SignerResult<LedgerSignResponse>;
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerXpub {
    pub public_key_hex: String,
    pub chain_code_hex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAddressRequest {
    pub address_type_nibble: u8,
    pub network_id: u8,
    pub protocol_magic: u32,
    pub spending_path: DerivationPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staking_path: Option<DerivationPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<DerivationPath>,
    pub tx_hash_hex: String,
    pub output_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerOutput {
    #[serde(rename_all = "camelCase")]
    Change {
        amount_str: String,
        address_type_nibble: u8,
        spending_path: DerivationPath,
        #[serde(skip_serializing_if = "Option::is_none")]
        staking_path: Option<DerivationPath>,
    },
    #[serde(rename_all = "camelCase")]
    Address {
        amount_str: String,
        address_hex: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerCertificate {
    pub r#type: u64,
    pub path: DerivationPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_key_hash_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_params: Option<LedgerPoolParams>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPoolParams {
    pub pool_key_hash_hex: String,
    pub vrf_key_hash_hex: String,
    pub pledge_str: String,
    pub cost_str: String,
    pub margin: LedgerMargin,
    pub reward_account_hex: String,
    pub pool_owners: Vec<LedgerPoolOwner>,
    pub relays: Vec<LedgerRelay>,
    pub metadata: Option<LedgerPoolMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerMargin {
    pub numerator_str: String,
    pub denominator_str: String,
}

/// A pool owner, either one of ours (by path) or a third party (by hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPoolOwner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staking_path: Option<DerivationPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staking_key_hash_hex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRelay {
    pub r#type: u64,
    pub params: LedgerRelayParams,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRelayParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_number: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPoolMetadata {
    pub metadata_url: String,
    pub metadata_hash_hex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerWithdrawal {
    pub path: DerivationPath,
    pub amount_str: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSignRequest {
    pub network_id: u8,
    pub protocol_magic: u32,
    pub inputs: Vec<LedgerInput>,
    pub outputs: Vec<LedgerOutput>,
    pub fee_str: String,
    pub ttl_str: String,
    pub certificates: Vec<LedgerCertificate>,
    pub withdrawals: Vec<LedgerWithdrawal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_hash_hex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerWitness {
    pub path: DerivationPath,
    pub witness_signature_hex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSignResponse {
    pub tx_hash_hex: String,
    pub witnesses: Vec<LedgerWitness>,
}

// =============================================================================
// Adapter
// =============================================================================

pub struct LedgerWallet<T: LedgerTransport> {
    transport: T,
    derivation_scheme: DerivationScheme,
}

impl<T: LedgerTransport> LedgerWallet<T> {
    pub fn new(transport: T, derivation_scheme: DerivationScheme) -> Self {
        Self {
            transport,
            derivation_scheme,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T: LedgerTransport> HardwareWallet for LedgerWallet<T> {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Ledger
    }

    fn version(&mut self) -> SignerResult<String> {
        let version = self
            .transport
            .get_version()
            .map_err(device_failure(DeviceKind::Ledger))?;
        Ok(format!(
            "Ledger app version {}.{}.{}",
            version.major, version.minor, version.patch
        ))
    }

    fn show_address(
        &mut self,
        payment_path: &DerivationPath,
        stake_path: Option<&DerivationPath>,
        address: &[u8],
        network: &NetworkConfig,
    ) -> SignerResult<()> {
        let attributes = address_attributes(address)?;
        let request = LedgerAddressRequest {
            address_type_nibble: attributes.address_type,
            network_id: attributes.network_id,
            protocol_magic: network.protocol_magic,
            spending_path: payment_path.clone(),
            staking_path: stake_path.cloned(),
        };
        self.transport
            .show_address(&request)
            .map_err(device_failure(DeviceKind::Ledger))
    }

    fn extended_public_key(&mut self, path: &DerivationPath) -> SignerResult<ExtendedPublicKey> {
        let (account_path, rest) = path.split_at(ACCOUNT_DEPTH);
        let response = self
            .transport
            .get_extended_public_key(&account_path)
            .map_err(device_failure(DeviceKind::Ledger))?;
        let account = ExtendedPublicKey::new(
            device_hex(DeviceKind::Ledger, "public key", &response.public_key_hex)?,
            device_hex(DeviceKind::Ledger, "chain code", &response.chain_code_hex)?,
        );
        derive_public_path(&account, &rest, self.derivation_scheme)
    }

    fn sign_transaction(&mut self, request: &SigningRequest<'_>) -> SignerResult<DeviceSignatures> {
        let ledger_request = build_sign_request(request)?;
        let response = self
            .transport
            .sign_transaction(&ledger_request)
            .map_err(device_failure(DeviceKind::Ledger))?;

        let tx_id = device_hex(DeviceKind::Ledger, "tx hash", &response.tx_hash_hex)?;
        let witnesses = response
            .witnesses
            .into_iter()
            .map(|witness| {
                Ok(DeviceWitness {
                    signature: device_hex(
                        DeviceKind::Ledger,
                        "witness signature",
                        &witness.witness_signature_hex,
                    )?,
                    path: witness.path,
                })
            })
            .collect::<SignerResult<Vec<_>>>()?;

        Ok(DeviceSignatures { tx_id, witnesses })
    }
}

// =============================================================================
// Request Building
// =============================================================================

/// Ledger request for a resolved signing request
pub fn build_sign_request(request: &SigningRequest<'_>) -> SignerResult<LedgerSignRequest> {
    let body = request.body();
    let stake_keys = filter_signing_files(request.signing_files).stake;

    let inputs = body
        .inputs
        .iter()
        .zip(&request.paths.inputs)
        .map(|(input, path)| LedgerInput {
            path: path.clone(),
            tx_hash_hex: hex::encode(input.tx_hash),
            output_index: input.output_index,
        })
        .collect();

    let outputs = body
        .outputs
        .iter()
        .map(|output| ledger_output(output, request))
        .collect();

    let certificates = body
        .certificates
        .iter()
        .zip(&request.paths.certificates)
        .map(|(certificate, path)| ledger_certificate(certificate, path, &stake_keys))
        .collect();

    let withdrawals = body
        .withdrawals
        .iter()
        .zip(&request.paths.withdrawals)
        .map(|(withdrawal, path)| LedgerWithdrawal {
            path: path.clone(),
            amount_str: withdrawal.coins.to_string(),
        })
        .collect();

    Ok(LedgerSignRequest {
        network_id: request.network.network_id,
        protocol_magic: request.network.protocol_magic,
        inputs,
        outputs,
        fee_str: body.fee.to_string(),
        ttl_str: body.ttl.to_string(),
        certificates,
        withdrawals,
        metadata_hash_hex: body.metadata_hash.map(hex::encode),
    })
}

fn ledger_output(output: &TxOutput, request: &SigningRequest<'_>) -> LedgerOutput {
    match request.change_output_for(output) {
        Some(change) => LedgerOutput::Change {
            amount_str: output.coins.to_string(),
            address_type_nibble: change.address_type,
            spending_path: change.payment_path.clone(),
            staking_path: change.stake_path.clone(),
        },
        None => LedgerOutput::Address {
            amount_str: output.coins.to_string(),
            address_hex: hex::encode(&output.address),
        },
    }
}

fn ledger_certificate(
    certificate: &Certificate,
    path: &DerivationPath,
    stake_keys: &[HwSigningData],
) -> LedgerCertificate {
    let (pool_key_hash_hex, pool_params) = match certificate {
        Certificate::Delegation { pool_hash, .. } => (Some(hex::encode(pool_hash)), None),
        Certificate::PoolRegistration(params) => {
            (None, Some(ledger_pool_params(params, path, stake_keys)))
        }
        _ => (None, None),
    };
    LedgerCertificate {
        r#type: certificate.tag(),
        path: path.clone(),
        pool_key_hash_hex,
        pool_params,
    }
}

fn ledger_pool_params(
    params: &PoolParams,
    path: &DerivationPath,
    stake_keys: &[HwSigningData],
) -> LedgerPoolParams {
    let pool_owners = params
        .owners
        .iter()
        .map(|owner| match find_signing_path(owner, stake_keys) {
            Ok(owner_path) if owner_path == *path => LedgerPoolOwner {
                staking_path: Some(owner_path),
                staking_key_hash_hex: None,
            },
            _ => LedgerPoolOwner {
                staking_path: None,
                staking_key_hash_hex: Some(hex::encode(owner)),
            },
        })
        .collect();

    LedgerPoolParams {
        pool_key_hash_hex: hex::encode(params.pool_key_hash),
        vrf_key_hash_hex: hex::encode(params.vrf_key_hash),
        pledge_str: params.pledge.to_string(),
        cost_str: params.cost.to_string(),
        margin: LedgerMargin {
            numerator_str: params.margin.numerator.to_string(),
            denominator_str: params.margin.denominator.to_string(),
        },
        reward_account_hex: hex::encode(params.reward_address),
        pool_owners,
        relays: params.relays.iter().map(ledger_relay).collect(),
        metadata: params.metadata.as_ref().map(|metadata| LedgerPoolMetadata {
            metadata_url: metadata.url.clone(),
            metadata_hash_hex: hex::encode(metadata.hash),
        }),
    }
}

fn ledger_relay(relay: &Relay) -> LedgerRelay {
    let params = match relay {
        Relay::SingleHostIp { port, ipv4, ipv6 } => LedgerRelayParams {
            port_number: *port,
            ipv4: ipv4.map(|octets| Ipv4Addr::from(octets).to_string()),
            ipv6: ipv6.map(|octets| Ipv6Addr::from(octets).to_string()),
            dns_name: None,
        },
        Relay::SingleHostName { port, dns_name } => LedgerRelayParams {
            port_number: Some(*port),
            dns_name: Some(dns_name.clone()),
            ..Default::default()
        },
        Relay::MultiHostName { dns_name } => LedgerRelayParams {
            dns_name: Some(dns_name.clone()),
            ..Default::default()
        },
    };
    LedgerRelay {
        r#type: relay.tag(),
        params,
    }
}
