//! Record manifest: the archive's file-listing API and its JSON shape.
//!
//! A record's manifest is a JSON array of `{filename, links.download,
//! checksum}` objects. Anything else fails fast; without a file list there is
//! nothing to download.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::checksum::ChecksumAlgo;

/// One file in a record manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    /// Relative path under the record directory; may contain `/` separators.
    pub filename: String,
    pub links: Links,
    /// Hex digest, optionally prefixed with the algorithm (`md5:<hex>`).
    pub checksum: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Links {
    pub download: String,
}

/// Manifest checksum split into algorithm and bare hex digest.
///
/// The archive's record API emits `md5:<hex>`; its deposition API emits bare
/// hex. A bare digest is interpreted with `default_algo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedChecksum {
    pub algo: ChecksumAlgo,
    pub hex: String,
}

impl ExpectedChecksum {
    pub fn parse(raw: &str, default_algo: ChecksumAlgo) -> Result<Self> {
        match raw.split_once(':') {
            Some((label, hex)) => {
                let algo = ChecksumAlgo::from_label(label)
                    .ok_or_else(|| anyhow!("unknown checksum algorithm {:?}", label))?;
                Ok(Self {
                    algo,
                    hex: hex.to_string(),
                })
            }
            None => Ok(Self {
                algo: default_algo,
                hex: raw.to_string(),
            }),
        }
    }
}

/// Parse a manifest body. Any departure from the expected shape is an error.
pub fn parse_manifest(body: &[u8]) -> Result<Vec<FileEntry>> {
    serde_json::from_slice(body).context("manifest JSON does not match the expected shape")
}

/// URL of the file-listing endpoint for one record.
pub fn record_files_url(api_base: &str, record_id: &str) -> Result<Url> {
    let raw = format!("{}/{}/files", api_base.trim_end_matches('/'), record_id);
    Url::parse(&raw).with_context(|| format!("invalid manifest URL {}", raw))
}

/// Fetch and parse the manifest for `record_id`.
///
/// Errors here are fatal to the whole run, unlike per-file download failures.
pub fn fetch_manifest(
    api_base: &str,
    record_id: &str,
    connect_timeout: Duration,
) -> Result<Vec<FileEntry>> {
    let url = record_files_url(api_base, record_id)?;
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url.as_str()).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(connect_timeout)?;
    easy.timeout(Duration::from_secs(60))?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform().context("manifest request failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    if code < 200 || code >= 300 {
        bail!("manifest GET {} returned HTTP {}", url, code);
    }

    parse_manifest(&body)
}
