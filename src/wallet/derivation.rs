//! Public Key Derivation
//!
//! BIP32-Ed25519 soft (non-hardened) child derivation from an extended
//! public key. Hardened children need the private key and can only be
//! derived on the device.

use crate::error::{SignerError, SignerResult};
use crate::types::ExtendedPublicKey;
use crate::wallet::derivation_path::{is_hardened, DerivationPath};
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Derivation algorithm version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivationScheme {
    /// Legacy Daedalus scheme: big-endian index, full 32-byte multiplier
    V1,
    /// Current scheme: little-endian index, multiplier truncated to 28 bytes
    #[default]
    V2,
}

impl DerivationScheme {
    fn serialize_index(self, index: u32) -> [u8; 4] {
        match self {
            DerivationScheme::V1 => index.to_be_bytes(),
            DerivationScheme::V2 => index.to_le_bytes(),
        }
    }

    /// `8 * zl` as a little-endian 256-bit integer (carry out of the top byte dropped)
    fn mul8(self, zl: &[u8]) -> [u8; 32] {
        let used = match self {
            DerivationScheme::V1 => 32,
            DerivationScheme::V2 => 28,
        };
        let mut out = [0u8; 32];
        let mut carry: u16 = 0;
        for (i, byte) in out.iter_mut().enumerate() {
            let y = if i < used { (zl[i] as u16) << 3 } else { 0 };
            let r = y + carry;
            *byte = (r & 0xff) as u8;
            carry = r >> 8;
        }
        out
    }
}

/// Derive the soft child `index` of `parent`
pub fn derive_public(
    parent: &ExtendedPublicKey,
    index: u32,
    scheme: DerivationScheme,
) -> SignerResult<ExtendedPublicKey> {
    if is_hardened(index) {
        return Err(SignerError::invalid_path(format!(
            "Cannot derive hardened index {} from a public key",
            index & !crate::wallet::HARDENED
        )));
    }

    let ser = scheme.serialize_index(index);
    let z = hmac_sha512(&parent.chain_code, 0x02, &parent.pub_key, &ser)?;
    let c = hmac_sha512(&parent.chain_code, 0x03, &parent.pub_key, &ser)?;

    let parent_point = CompressedEdwardsY(parent.pub_key)
        .decompress()
        .ok_or_else(|| SignerError::invalid_xpub("Public key is not a valid curve point"))?;

    let tweak = Scalar::from_bytes_mod_order(scheme.mul8(&z[..32]));
    let child_point = parent_point + EdwardsPoint::mul_base(&tweak);

    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&c[32..]);

    Ok(ExtendedPublicKey::new(
        child_point.compress().to_bytes(),
        chain_code,
    ))
}

/// Derive along every index of `path` in turn
pub fn derive_public_path(
    parent: &ExtendedPublicKey,
    path: &DerivationPath,
    scheme: DerivationScheme,
) -> SignerResult<ExtendedPublicKey> {
    path.indices()
        .iter()
        .try_fold(*parent, |xpub, &index| derive_public(&xpub, index, scheme))
}

fn hmac_sha512(key: &[u8], tag: u8, pub_key: &[u8], ser: &[u8]) -> SignerResult<[u8; 64]> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| SignerError::internal(format!("HMAC init failed: {}", e)))?;
    mac.update(&[tag]);
    mac.update(pub_key);
    mac.update(ser);
    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}
