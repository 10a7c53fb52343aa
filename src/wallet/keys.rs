//! Signing-Key Index
//!
//! Resolves which descriptor path must sign each input, certificate and
//! withdrawal. Matching is by blake2b-224 hash of the descriptor's public
//! key; the first exact match wins.

use crate::error::{SignerError, SignerResult};
use crate::tx::{Certificate, Withdrawal};
use crate::types::{ExtendedPublicKey, HwSigningData, KeyUsage};
use crate::wallet::DerivationPath;
use blake2::digest::consts::U28;
use blake2::{Blake2b, Digest};

/// blake2b-224 of a 32-byte public key
pub fn key_hash(pub_key: &[u8; 32]) -> [u8; 28] {
    let mut hasher = Blake2b::<U28>::new();
    hasher.update(pub_key);
    let mut out = [0u8; 28];
    out.copy_from_slice(&hasher.finalize());
    out
}

pub fn xpub_key_hash(xpub: &ExtendedPublicKey) -> [u8; 28] {
    key_hash(&xpub.pub_key)
}

/// Path of the first descriptor whose key hash equals `hash`
pub fn find_signing_path(hash: &[u8], candidates: &[HwSigningData]) -> SignerResult<DerivationPath> {
    candidates
        .iter()
        .find(|data| xpub_key_hash(&data.xpub).as_slice() == hash)
        .map(|data| data.derivation_path.clone())
        .ok_or_else(|| SignerError::no_matching_signing_key(hash))
}

/// Descriptors split by usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningFiles {
    pub payment: Vec<HwSigningData>,
    pub stake: Vec<HwSigningData>,
}

pub fn filter_signing_files(signing_files: &[HwSigningData]) -> SigningFiles {
    let (payment, stake): (Vec<_>, Vec<_>) = signing_files
        .iter()
        .cloned()
        .partition(|data| data.usage == KeyUsage::Payment);
    SigningFiles { payment, stake }
}

/// Path that signs input `index`: none with no payment keys, the only key
/// for every input, or positional otherwise.
pub fn input_path(payment_keys: &[HwSigningData], index: usize) -> Option<DerivationPath> {
    match payment_keys {
        [] => None,
        [only] => Some(only.derivation_path.clone()),
        many => many.get(index).map(|data| data.derivation_path.clone()),
    }
}

/// Stake path that signs `certificate`.
///
/// Pool registrations resolve against the first owner only; a later owner
/// matching a descriptor is not found.
pub fn certificate_path(
    certificate: &Certificate,
    stake_keys: &[HwSigningData],
) -> SignerResult<DerivationPath> {
    match certificate {
        Certificate::StakeKeyRegistration { credential }
        | Certificate::StakeKeyDeregistration { credential }
        | Certificate::Delegation { credential, .. } => {
            find_signing_path(&credential.pub_key_hash, stake_keys)
        }
        Certificate::PoolRegistration(params) => {
            let first_owner = params.owners.first().ok_or_else(|| {
                SignerError::new(
                    crate::error::ErrorCode::CertificateShape,
                    "Pool registration has no owners",
                )
            })?;
            find_signing_path(first_owner, stake_keys)
        }
    }
}

pub fn withdrawal_path(
    withdrawal: &Withdrawal,
    stake_keys: &[HwSigningData],
) -> SignerResult<DerivationPath> {
    find_signing_path(&withdrawal.key_hash(), stake_keys)
}

/// Descriptor with exactly this path
pub fn find_by_path<'a>(
    path: &DerivationPath,
    signing_files: &'a [HwSigningData],
) -> SignerResult<&'a HwSigningData> {
    signing_files
        .iter()
        .find(|data| &data.derivation_path == path)
        .ok_or_else(|| SignerError::missing_hw_signing_data_at_path(path))
}
