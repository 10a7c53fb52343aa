//! Trezor adapter
//!
//! Trezor takes human-readable addresses and plain amounts, and answers with
//! a fully serialized signed transaction instead of bare signatures. The
//! witnesses are decoded back out of it and matched to descriptor paths by
//! public key.

use crate::error::{ErrorCode, SignerError, SignerResult};
use crate::signing::device::{
    device_failure, device_hex, DeviceSignatures, DeviceWitness, HardwareWallet, SigningRequest,
};
use crate::tx::address::{address_attributes, encode_address};
use crate::tx::{Certificate, PoolParams, Relay, SignedTransaction, TxOutput};
use crate::types::{DeviceKind, ExtendedPublicKey, HwSigningData};
use crate::utils::NetworkConfig;
use crate::wallet::{filter_signing_files, find_signing_path, DerivationPath};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

// =============================================================================
// Transport
// =============================================================================

/// Raw Trezor Connect calls
pub trait TrezorTransport {
    fn get_features(&mut self) -> SignerResult<TrezorFeatures>;

    fn get_public_key(&mut self, path: &DerivationPath) -> SignerResult<TrezorPublicKey>;

    fn show_address(&mut self, request: &TrezorAddressRequest) -> SignerResult<()>;

    fn sign_transaction(&mut self, request: &TrezorSignRequest) -> SignerResult<TrezorSignResponse>;
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrezorFeatures {
    pub major_version: u32,
    pub minor_version: u32,
    pub patch_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrezorPublicKey {
    /// `pub_key || chain_code` as hex
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrezorAddressParameters {
    pub address_type: u8,
    pub path: DerivationPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staking_path: Option<DerivationPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrezorAddressRequest {
    pub address_parameters: TrezorAddressParameters,
    pub protocol_magic: u32,
    pub network_id: u8,
    pub show_on_trezor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrezorInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<DerivationPath>,
    pub prev_hash: String,
    pub prev_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrezorOutput {
    Change {
        #[serde(rename = "addressParameters")]
        address_parameters: TrezorAddressParameters,
        amount: String,
    },
    Address {
        address: String,
        amount: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrezorCertificate {
    pub r#type: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<DerivationPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_parameters: Option<TrezorPoolParameters>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrezorPoolParameters {
    pub pool_id: String,
    pub vrf_key_hash: String,
    pub pledge: String,
    pub cost: String,
    pub margin_numerator: String,
    pub margin_denominator: String,
    /// bech32 reward address
    pub reward_account: String,
    pub owners: Vec<TrezorPoolOwner>,
    pub relays: Vec<TrezorRelay>,
    pub metadata: Option<TrezorPoolMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrezorPoolOwner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staking_key_path: Option<DerivationPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staking_key_hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrezorRelay {
    pub r#type: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrezorPoolMetadata {
    pub url: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrezorWithdrawal {
    pub path: DerivationPath,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrezorSignRequest {
    pub inputs: Vec<TrezorInput>,
    pub outputs: Vec<TrezorOutput>,
    pub fee: String,
    pub ttl: String,
    pub protocol_magic: u32,
    pub network_id: u8,
    pub certificates: Vec<TrezorCertificate>,
    pub withdrawals: Vec<TrezorWithdrawal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrezorSignResponse {
    /// Transaction id the device computed
    pub hash: String,
    pub serialized_tx: String,
}

// =============================================================================
// Adapter
// =============================================================================

pub struct TrezorWallet<T: TrezorTransport> {
    transport: T,
}

impl<T: TrezorTransport> TrezorWallet<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T: TrezorTransport> HardwareWallet for TrezorWallet<T> {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Trezor
    }

    fn version(&mut self) -> SignerResult<String> {
        let features = self
            .transport
            .get_features()
            .map_err(device_failure(DeviceKind::Trezor))?;
        Ok(format!(
            "Trezor app version {}.{}.{}",
            features.major_version, features.minor_version, features.patch_version
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
        let request = TrezorAddressRequest {
            address_parameters: TrezorAddressParameters {
                address_type: attributes.address_type,
                path: payment_path.clone(),
                staking_path: stake_path.cloned(),
            },
            protocol_magic: network.protocol_magic,
            network_id: network.network_id,
            show_on_trezor: true,
        };
        self.transport
            .show_address(&request)
            .map_err(device_failure(DeviceKind::Trezor))
    }

    fn extended_public_key(&mut self, path: &DerivationPath) -> SignerResult<ExtendedPublicKey> {
        let response = self
            .transport
            .get_public_key(path)
            .map_err(device_failure(DeviceKind::Trezor))?;
        let bytes: [u8; 64] = device_hex(DeviceKind::Trezor, "public key", &response.public_key)?;
        ExtendedPublicKey::from_bytes(&bytes)
    }

    fn sign_transaction(&mut self, request: &SigningRequest<'_>) -> SignerResult<DeviceSignatures> {
        let trezor_request = build_sign_request(request)?;
        let response = self
            .transport
            .sign_transaction(&trezor_request)
            .map_err(device_failure(DeviceKind::Trezor))?;

        let tx_id = device_hex(DeviceKind::Trezor, "tx hash", &response.hash)?;
        let signed = SignedTransaction::from_hex(&response.serialized_tx).map_err(|e| {
            SignerError::device_operation(format!(
                "Trezor returned an undecodable transaction: {}",
                e.message
            ))
        })?;
        // the serialized body has to agree with the hash reported next to it
        if signed.id() != tx_id {
            return Err(SignerError::tx_serialization_mismatch(
                &hex::encode(signed.id()),
                &response.hash,
            ));
        }

        let witnesses = extract_witnesses(&signed, request.signing_files)?;
        Ok(DeviceSignatures { tx_id, witnesses })
    }
}

/// Map each witness in a serialized transaction back to its signing path
pub fn extract_witnesses(
    signed: &SignedTransaction,
    signing_files: &[HwSigningData],
) -> SignerResult<Vec<DeviceWitness>> {
    let shelley = signed
        .shelley_witnesses
        .iter()
        .map(|w| (&w.pub_key, &w.signature));
    let byron = signed
        .byron_witnesses
        .iter()
        .map(|w| (&w.pub_key, &w.signature));

    shelley
        .chain(byron)
        .map(|(pub_key, signature)| {
            let data = signing_files
                .iter()
                .find(|data| &data.xpub.pub_key == pub_key)
                .ok_or_else(|| {
                    SignerError::new(
                        ErrorCode::UnexpectedWitnessKey,
                        "Device returned a witness for an unknown key",
                    )
                    .with_details(hex::encode(pub_key))
                })?;
            Ok(DeviceWitness {
                path: data.derivation_path.clone(),
                signature: *signature,
            })
        })
        .collect()
}

// =============================================================================
// Request Building
// =============================================================================

/// Trezor request for a resolved signing request
pub fn build_sign_request(request: &SigningRequest<'_>) -> SignerResult<TrezorSignRequest> {
    let body = request.body();
    let stake_keys = filter_signing_files(request.signing_files).stake;

    let inputs = body
        .inputs
        .iter()
        .zip(&request.paths.inputs)
        .map(|(input, path)| TrezorInput {
            path: path.clone(),
            prev_hash: hex::encode(input.tx_hash),
            prev_index: input.output_index,
        })
        .collect();

    let outputs = body
        .outputs
        .iter()
        .map(|output| trezor_output(output, request))
        .collect::<SignerResult<Vec<_>>>()?;

    let certificates = body
        .certificates
        .iter()
        .zip(&request.paths.certificates)
        .map(|(certificate, path)| trezor_certificate(certificate, path, &stake_keys))
        .collect::<SignerResult<Vec<_>>>()?;

    let withdrawals = body
        .withdrawals
        .iter()
        .zip(&request.paths.withdrawals)
        .map(|(withdrawal, path)| TrezorWithdrawal {
            path: path.clone(),
            amount: withdrawal.coins.to_string(),
        })
        .collect();

    Ok(TrezorSignRequest {
        inputs,
        outputs,
        fee: body.fee.to_string(),
        ttl: body.ttl.to_string(),
        protocol_magic: request.network.protocol_magic,
        network_id: request.network.network_id,
        certificates,
        withdrawals,
    })
}

fn trezor_output(output: &TxOutput, request: &SigningRequest<'_>) -> SignerResult<TrezorOutput> {
    let amount = output.coins.to_string();
    Ok(match request.change_output_for(output) {
        Some(change) => TrezorOutput::Change {
            address_parameters: TrezorAddressParameters {
                address_type: change.address_type,
                path: change.payment_path.clone(),
                staking_path: change.stake_path.clone(),
            },
            amount,
        },
        None => TrezorOutput::Address {
            address: encode_address(&output.address)?,
            amount,
        },
    })
}

fn trezor_certificate(
    certificate: &Certificate,
    path: &DerivationPath,
    stake_keys: &[HwSigningData],
) -> SignerResult<TrezorCertificate> {
    let mut trezor = TrezorCertificate {
        r#type: certificate.tag(),
        path: Some(path.clone()),
        pool: None,
        pool_parameters: None,
    };
    match certificate {
        Certificate::Delegation { pool_hash, .. } => {
            trezor.pool = Some(hex::encode(pool_hash));
        }
        Certificate::PoolRegistration(params) => {
            // owners carry the signing path instead
            trezor.path = None;
            trezor.pool_parameters = Some(trezor_pool_parameters(params, path, stake_keys)?);
        }
        _ => {}
    }
    Ok(trezor)
}

fn trezor_pool_parameters(
    params: &PoolParams,
    path: &DerivationPath,
    stake_keys: &[HwSigningData],
) -> SignerResult<TrezorPoolParameters> {
    let owners = params
        .owners
        .iter()
        .map(|owner| match find_signing_path(owner, stake_keys) {
            Ok(owner_path) if owner_path == *path => TrezorPoolOwner {
                staking_key_path: Some(owner_path),
                staking_key_hash: None,
            },
            _ => TrezorPoolOwner {
                staking_key_path: None,
                staking_key_hash: Some(hex::encode(owner)),
            },
        })
        .collect();

    Ok(TrezorPoolParameters {
        pool_id: hex::encode(params.pool_key_hash),
        vrf_key_hash: hex::encode(params.vrf_key_hash),
        pledge: params.pledge.to_string(),
        cost: params.cost.to_string(),
        margin_numerator: params.margin.numerator.to_string(),
        margin_denominator: params.margin.denominator.to_string(),
        reward_account: encode_address(&params.reward_address)?,
        owners,
        relays: params.relays.iter().map(trezor_relay).collect(),
        metadata: params.metadata.as_ref().map(|metadata| TrezorPoolMetadata {
            url: metadata.url.clone(),
            hash: hex::encode(metadata.hash),
        }),
    })
}

fn trezor_relay(relay: &Relay) -> TrezorRelay {
    match relay {
        Relay::SingleHostIp { port, ipv4, ipv6 } => TrezorRelay {
            r#type: relay.tag(),
            ipv4_address: ipv4.map(|octets| Ipv4Addr::from(octets).to_string()),
            ipv6_address: ipv6.map(|octets| Ipv6Addr::from(octets).to_string()),
            port: *port,
            ..Default::default()
        },
        Relay::SingleHostName { port, dns_name } => TrezorRelay {
            r#type: relay.tag(),
            host_name: Some(dns_name.clone()),
            port: Some(*port),
            ..Default::default()
        },
        Relay::MultiHostName { dns_name } => TrezorRelay {
            r#type: relay.tag(),
            host_name: Some(dns_name.clone()),
            ..Default::default()
        },
    }
}
