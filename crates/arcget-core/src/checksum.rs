//! Streaming checksum computation for manifest verification.
//!
//! Digests are computed in fixed-size reads so large files never have to be
//! held in memory.

use anyhow::{Context, Result};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Digest algorithm for manifest checksums.
///
/// `md5` is the archive's legacy manifest format and therefore the default;
/// `sha256` is accepted for manifests that carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgo {
    #[default]
    Md5,
    Sha256,
}

impl ChecksumAlgo {
    /// Parse an algorithm label as it appears in manifest `algo:` prefixes.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "md5" => Some(ChecksumAlgo::Md5),
            "sha256" => Some(ChecksumAlgo::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for ChecksumAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumAlgo::Md5 => write!(f, "md5"),
            ChecksumAlgo::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Compute the digest of a file and return it as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn digest_path(algo: ChecksumAlgo, path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    match algo {
        ChecksumAlgo::Md5 => digest_reader::<Md5>(f, path),
        ChecksumAlgo::Sha256 => digest_reader::<Sha256>(f, path),
    }
}

fn digest_reader<D: Digest>(mut f: File, path: &Path) -> Result<String> {
    let mut hasher = D::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// True iff the file's digest equals `expected` (exact hex string comparison,
/// lowercase as produced).
pub fn verify(path: &Path, algo: ChecksumAlgo, expected: &str) -> Result<bool> {
    Ok(digest_path(algo, path)? == expected)
}
