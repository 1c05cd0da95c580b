//! Notation CLI release manifest
//!
//! Maps version -> platform -> arch -> {url, checksum}. The bundled copy is
//! compiled in; `--manifest` can point at a replacement file with the same
//! shape.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::checksum::{is_sha256_hex, normalize_checksum};
use crate::error::{ActionError, ActionResult};
use crate::platform::{Arch, Platform};

const BUNDLED_MANIFEST: &str = include_str!("../data/notation_releases.json");

/// One downloadable release asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub url: String,
    pub checksum: String,
}

type RawManifest = BTreeMap<String, BTreeMap<String, BTreeMap<String, ReleaseAsset>>>;

/// Validated, immutable release manifest
#[derive(Debug, Clone)]
pub struct ReleaseManifest {
    releases: BTreeMap<String, BTreeMap<Platform, BTreeMap<Arch, ReleaseAsset>>>,
}

/// Where to fetch an archive from, and what its SHA-256 must be
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSource {
    pub url: Url,
    pub checksum: String,
}

impl ReleaseManifest {
    /// The manifest shipped with this binary
    pub fn bundled() -> ActionResult<Self> {
        Self::from_json(BUNDLED_MANIFEST)
    }

    /// Load a manifest file with the bundled shape
    pub async fn load(path: &Path) -> ActionResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ActionError::io("read release manifest", path, e))?;
        debug!("Loaded release manifest from {:?}", path);
        Self::from_json(&content)
    }

    /// Parse and validate every entry
    pub fn from_json(content: &str) -> ActionResult<Self> {
        let raw: RawManifest = serde_json::from_str(content)
            .map_err(|e| ActionError::config(format!("invalid release manifest: {}", e)))?;

        let mut releases = BTreeMap::new();
        for (version, platforms) in raw {
            let mut by_platform = BTreeMap::new();
            for (platform_key, arches) in platforms {
                let platform: Platform = platform_key.parse().map_err(|_| {
                    ActionError::config(format!(
                        "invalid release manifest: unknown platform '{}' for version {}",
                        platform_key, version
                    ))
                })?;

                let mut by_arch = BTreeMap::new();
                for (arch_key, asset) in arches {
                    let arch: Arch = arch_key.parse().map_err(|_| {
                        ActionError::config(format!(
                            "invalid release manifest: unknown architecture '{}' for version {}",
                            arch_key, version
                        ))
                    })?;
                    validate_asset(&version, platform, arch, &asset)?;
                    by_arch.insert(arch, asset);
                }
                by_platform.insert(platform, by_arch);
            }
            releases.insert(version, by_platform);
        }

        Ok(Self { releases })
    }

    /// Known versions in ascending semantic-version order
    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.releases.keys().map(String::as_str).collect();
        versions.sort_by(|a, b| match (parse_version(a), parse_version(b)) {
            (Some(va), Some(vb)) => va.cmp(&vb),
            _ => a.cmp(b),
        });
        versions
    }

    /// Highest known version
    pub fn latest(&self) -> Option<&str> {
        self.versions().last().copied()
    }

    /// Find the asset for a version on a platform/arch
    pub fn lookup(&self, version: &str, platform: Platform, arch: Arch) -> ActionResult<&ReleaseAsset> {
        let key = version.trim().trim_start_matches('v');
        let release = self.releases.get(key).ok_or_else(|| {
            ActionError::NotSupported(format!(
                "official Notation CLI release does not support version {}",
                key
            ))
        })?;

        release
            .get(&platform)
            .and_then(|arches| arches.get(&arch))
            .ok_or_else(|| {
                ActionError::NotSupported(format!(
                    "official Notation CLI release for version {}, platform {}, arch {} is not supported",
                    key, platform, arch
                ))
            })
    }

    /// Every (version, platform, arch, asset) entry
    pub fn entries(&self) -> impl Iterator<Item = (&str, Platform, Arch, &ReleaseAsset)> {
        self.releases.iter().flat_map(|(version, platforms)| {
            platforms.iter().flat_map(move |(platform, arches)| {
                arches
                    .iter()
                    .map(move |(arch, asset)| (version.as_str(), *platform, *arch, asset))
            })
        })
    }

    /// Resolve the download source for the Notation CLI.
    ///
    /// An override URL must come with its own checksum; this is checked
    /// before anything else so a bad pairing never reaches the network.
    pub fn resolve(
        &self,
        version: &str,
        override_url: Option<&str>,
        override_checksum: Option<&str>,
        platform: Platform,
        arch: Arch,
    ) -> ActionResult<DownloadSource> {
        if let Some(url) = override_url {
            let checksum = override_checksum.ok_or_else(|| {
                ActionError::config(
                    "checksum required when URL override given: user provided url of customized Notation CLI release but without SHA256 checksum",
                )
            })?;
            return Ok(DownloadSource {
                url: parse_url(url)?,
                checksum: normalize_checksum(checksum)?,
            });
        }

        let asset = self.lookup(version, platform, arch)?;
        Ok(DownloadSource {
            url: parse_url(&asset.url)?,
            checksum: asset.checksum.clone(),
        })
    }
}

fn validate_asset(version: &str, platform: Platform, arch: Arch, asset: &ReleaseAsset) -> ActionResult<()> {
    if asset.url.trim().is_empty() || Url::parse(&asset.url).is_err() {
        return Err(ActionError::config(format!(
            "invalid release manifest: bad url '{}' for {} {}/{}",
            asset.url, version, platform, arch
        )));
    }
    if !is_sha256_hex(&asset.checksum) {
        return Err(ActionError::config(format!(
            "invalid release manifest: bad checksum '{}' for {} {}/{}",
            asset.checksum, version, platform, arch
        )));
    }
    if is_placeholder(&asset.checksum) {
        return Err(ActionError::config(format!(
            "invalid release manifest: placeholder checksum for {} {}/{}",
            version, platform, arch
        )));
    }
    Ok(())
}

/// All-zero digests stand in for "not filled in yet"
fn is_placeholder(checksum: &str) -> bool {
    checksum.bytes().all(|b| b == b'0')
}

fn parse_url(raw: &str) -> ActionResult<Url> {
    Url::parse(raw.trim()).map_err(|e| ActionError::config(format!("invalid url '{}': {}", raw, e)))
}

fn parse_version(raw: &str) -> Option<semver::Version> {
    semver::Version::parse(raw.trim_start_matches('v')).ok()
}
