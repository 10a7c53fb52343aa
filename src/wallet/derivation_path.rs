//! Key Derivation Paths
//!
//! BIP-32 style paths as used by Cardano hardware wallets:
//! - Shelley: `1852H/1815H/account H/role/index`
//! - Byron (Icarus/Ledger): `44H/1815H/account H/role/index`
//! - Byron (Daedalus): two-level legacy paths
//!
//! Paths are stored as full indices (hardened bit included) because that is
//! what both device protocols put on the wire.

use crate::error::{SignerError, SignerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Standard purposes
pub mod purposes {
    pub const BYRON: u32 = 44;
    pub const SHELLEY: u32 = 1852;
}

/// Coin type from SLIP-0044
pub const ADA_COIN_TYPE: u32 = 1815;

/// Hardened offset for BIP-32 derivation
pub const HARDENED: u32 = 0x8000_0000;

/// Key roles at depth 4 of a Shelley path
pub mod roles {
    pub const EXTERNAL: u32 = 0;
    pub const INTERNAL: u32 = 1;
    pub const STAKING: u32 = 2;
}

/// Mark an index as hardened
pub const fn harden(index: u32) -> u32 {
    index | HARDENED
}

/// Whether a full index carries the hardened bit
pub const fn is_hardened(index: u32) -> bool {
    index & HARDENED != 0
}

/// A derivation path as a sequence of full indices
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub fn new(indices: Vec<u32>) -> Self {
        Self(indices)
    }

    /// Shelley path for the given account, role and address index
    pub fn shelley(account: u32, role: u32, index: u32) -> Self {
        Self(vec![
            harden(purposes::SHELLEY),
            harden(ADA_COIN_TYPE),
            harden(account),
            role,
            index,
        ])
    }

    /// Byron (BIP-44) path for the given account, role and address index
    pub fn byron(account: u32, role: u32, index: u32) -> Self {
        Self(vec![
            harden(purposes::BYRON),
            harden(ADA_COIN_TYPE),
            harden(account),
            role,
            index,
        ])
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split the path after `depth` components
    pub fn split_at(&self, depth: usize) -> (DerivationPath, DerivationPath) {
        let depth = depth.min(self.0.len());
        let (parent, child) = self.0.split_at(depth);
        (Self(parent.to_vec()), Self(child.to_vec()))
    }

    /// Which witness era a signature made at this path belongs to
    pub fn era(&self) -> WitnessEra {
        WitnessEra::of(self)
    }
}

impl From<Vec<u32>> for DerivationPath {
    fn from(indices: Vec<u32>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(|&i| {
                if is_hardened(i) {
                    format!("{}H", i & !HARDENED)
                } else {
                    i.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("/");
        f.write_str(&rendered)
    }
}

impl FromStr for DerivationPath {
    type Err = SignerError;

    fn from_str(s: &str) -> SignerResult<Self> {
        parse_path(s)
    }
}

/// Witness encoding required for a signature, inferred from the signing path.
///
/// The device does not tag its signatures, so the era is recovered from the
/// shape of the path that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WitnessEra {
    Byron,
    Shelley,
}

impl WitnessEra {
    /// Shelley iff the path is `1852H/1815H/_/_/_`; every other path is Byron.
    pub fn of(path: &DerivationPath) -> Self {
        match path.indices() {
            [purpose, coin, _, _, _]
                if *purpose == harden(purposes::SHELLEY) && *coin == harden(ADA_COIN_TYPE) =>
            {
                WitnessEra::Shelley
            }
            _ => WitnessEra::Byron,
        }
    }
}

/// Parse a path such as `1852H/1815H/0H/0/0` or `m/44'/1815'/0'/0/1`
fn parse_path(path: &str) -> SignerResult<DerivationPath> {
    let trimmed = path.trim();
    let path_part = trimmed
        .strip_prefix("m/")
        .or_else(|| trimmed.strip_prefix("M/"))
        .unwrap_or(trimmed);

    if path_part.is_empty() {
        return Err(SignerError::invalid_path("Empty derivation path").with_details(path));
    }

    path_part
        .split('/')
        .map(|component| parse_component(component).map_err(|e| e.with_details(path)))
        .collect::<SignerResult<Vec<_>>>()
        .map(DerivationPath)
}

/// Parse a single path component into a full index
fn parse_component(s: &str) -> SignerResult<u32> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Err(SignerError::invalid_path("Empty path component"));
    }

    let (number_str, hardened) = match trimmed.strip_suffix(|c: char| matches!(c, '\'' | 'h' | 'H')) {
        Some(number) => (number, true),
        None => (trimmed, false),
    };

    let index: u32 = number_str
        .parse()
        .map_err(|e| SignerError::invalid_path(format!("Invalid path component '{}': {}", s, e)))?;

    if index >= HARDENED {
        return Err(SignerError::invalid_path(format!(
            "Path component {} exceeds maximum value",
            index
        )));
    }

    Ok(if hardened { harden(index) } else { index })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shelley_path() {
        let path: DerivationPath = "1852H/1815H/0H/2/0".parse().unwrap();
        assert_eq!(path, DerivationPath::shelley(0, roles::STAKING, 0));
        assert_eq!(path.to_string(), "1852H/1815H/0H/2/0");
    }

    #[test]
    fn test_parse_accepts_other_notations() {
        let a: DerivationPath = "m/44'/1815'/0'/0/1".parse().unwrap();
        let b: DerivationPath = "44h/1815h/0h/0/1".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, DerivationPath::byron(0, 0, 1));
    }

    #[test]
    fn test_invalid_paths() {
        assert!("".parse::<DerivationPath>().is_err());
        assert!("1852H//0".parse::<DerivationPath>().is_err());
        assert!("1852H/abc/0".parse::<DerivationPath>().is_err());
        assert!("2147483648/0".parse::<DerivationPath>().is_err());

        let err = "1852H/x".parse::<DerivationPath>().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidPath);
    }

    #[test]
    fn test_era_classification() {
        assert_eq!(DerivationPath::shelley(0, 0, 0).era(), WitnessEra::Shelley);
        assert_eq!(DerivationPath::shelley(3, 2, 7).era(), WitnessEra::Shelley);
        assert_eq!(DerivationPath::byron(0, 0, 0).era(), WitnessEra::Byron);
        // Daedalus legacy depth-2 path
        assert_eq!(
            DerivationPath::new(vec![harden(0), harden(1)]).era(),
            WitnessEra::Byron
        );
        // Shelley purpose but wrong depth
        assert_eq!(
            DerivationPath::new(vec![harden(1852), harden(1815), harden(0)]).era(),
            WitnessEra::Byron
        );
        // Unhardened purpose is not the Shelley shape
        assert_eq!(
            DerivationPath::new(vec![1852, harden(1815), harden(0), 0, 0]).era(),
            WitnessEra::Byron
        );
        assert_eq!(DerivationPath::default().era(), WitnessEra::Byron);
    }

    #[test]
    fn test_serde_as_index_array() {
        let path = DerivationPath::shelley(0, 0, 0);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "[2147485500,2147485463,2147483648,0,0]");
        let back: DerivationPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn test_split_at() {
        let (parent, child) = DerivationPath::shelley(0, 0, 5).split_at(3);
        assert_eq!(parent.to_string(), "1852H/1815H/0H");
        assert_eq!(child.indices(), &[0, 5]);
    }
}
