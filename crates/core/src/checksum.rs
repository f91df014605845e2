//! Checksum algorithms and digest utilities.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Checksum algorithms supported for assets and index documents.
///
/// `Sha256` is the primary algorithm: checksum rebuild computes it first and
/// only touches the remaining algorithms when the primary digest changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgo {
    Sha256,
    Sha512,
}

impl ChecksumAlgo {
    /// The primary algorithm, computed first during checksum rebuild.
    pub const PRIMARY: ChecksumAlgo = ChecksumAlgo::Sha256;

    /// All supported algorithms, primary first.
    pub const ALL: [ChecksumAlgo; 2] = [ChecksumAlgo::Sha256, ChecksumAlgo::Sha512];

    /// Algorithms other than the primary one.
    pub fn secondary() -> impl Iterator<Item = ChecksumAlgo> {
        Self::ALL.into_iter().filter(|a| *a != Self::PRIMARY)
    }

    /// Canonical key used in checksum sets and attribute bags.
    pub fn key(&self) -> &'static str {
        match self {
            ChecksumAlgo::Sha256 => "sha256",
            ChecksumAlgo::Sha512 => "sha512",
        }
    }

    /// File extension of a checksum side-file (`index.json.sha256`).
    pub fn extension(&self) -> &'static str {
        self.key()
    }

    /// Compute the lowercase hex digest of `data`.
    pub fn digest(&self, data: &[u8]) -> String {
        match self {
            ChecksumAlgo::Sha256 => hex(&Sha256::digest(data)),
            ChecksumAlgo::Sha512 => hex(&Sha512::digest(data)),
        }
    }
}

impl fmt::Display for ChecksumAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ChecksumAlgo {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "sha256" => Ok(ChecksumAlgo::Sha256),
            "sha512" => Ok(ChecksumAlgo::Sha512),
            other => Err(crate::Error::UnknownChecksumAlgo(other.to_string())),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// A set of digests keyed by algorithm, as recorded on an asset's blob.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksums(BTreeMap<ChecksumAlgo, String>);

impl Checksums {
    /// Compute all supported digests of `data`.
    pub fn compute(data: &[u8]) -> Self {
        Self(
            ChecksumAlgo::ALL
                .into_iter()
                .map(|algo| (algo, algo.digest(data)))
                .collect(),
        )
    }

    pub fn get(&self, algo: ChecksumAlgo) -> Option<&str> {
        self.0.get(&algo).map(String::as_str)
    }

    pub fn insert(&mut self, algo: ChecksumAlgo, digest: String) {
        self.0.insert(algo, digest);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
