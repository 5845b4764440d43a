//! Asset fingerprint of one reference-document snapshot.

use std::ops::Deref;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Ordered asset identifiers extracted from one fetch.
///
/// Order is significant and duplicates are kept as found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(Vec<String>);

impl Fingerprint {
    /// Short hex digest naming this build in logs.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for asset in &self.0 {
            hasher.update(asset.as_bytes());
            hasher.update([b'\n']);
        }
        hex::encode(&hasher.finalize()[..6])
    }
}

impl Deref for Fingerprint {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for Fingerprint {
    fn from(assets: Vec<String>) -> Self {
        Self(assets)
    }
}

impl<const N: usize> From<[&str; N]> for Fingerprint {
    fn from(assets: [&str; N]) -> Self {
        Self(assets.iter().map(|s| s.to_string()).collect())
    }
}

impl FromIterator<String> for Fingerprint {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
