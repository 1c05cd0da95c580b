//! Capability negotiation against the installed notation release
//!
//! The installed version is resolved once per run and reduced to a small
//! capability set; command assembly consults the set instead of comparing
//! versions itself.

use std::collections::BTreeSet;

use semver::Version;
use tracing::info;

use super::ToolRunner;
use crate::error::{ActionError, ActionResult};

/// Version-gated notation features
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// `notation plugin install --url --sha256sum` (v1.1.0+)
    PluginInstallCommand,
    /// `notation sign --force-referrers-tag` (v1.2.0+)
    ForceReferrersTag,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::PluginInstallCommand, Capability::ForceReferrersTag];

    /// First release that ships the capability
    pub fn min_version(&self) -> Version {
        match self {
            Capability::PluginInstallCommand => Version::new(1, 1, 0),
            Capability::ForceReferrersTag => Version::new(1, 2, 0),
        }
    }
}

/// What the installed notation release supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    version: Version,
    supported: BTreeSet<Capability>,
}

impl Capabilities {
    pub fn for_version(version: Version) -> Self {
        let supported = Capability::ALL
            .into_iter()
            .filter(|cap| version >= cap.min_version())
            .collect();
        Self { version, supported }
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.supported.contains(&capability)
    }

    /// Fail with `VersionIncompatible` unless `capability` is available
    pub fn require(&self, capability: Capability, input: &str) -> ActionResult<()> {
        if self.supports(capability) {
            return Ok(());
        }
        Err(ActionError::VersionIncompatible(format!(
            "{} is only valid for Notation v{} or later, installed version is v{}",
            input,
            capability.min_version(),
            self.version
        )))
    }
}

/// Extract the semantic version from `notation version` output
pub fn parse_version_output(stdout: &str) -> ActionResult<Version> {
    let raw = stdout
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("version"))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ActionError::VersionIncompatible("Notation CLI version is empty".to_string()))?;

    let cleaned = raw.trim_start_matches(['v', 'V', '=']);
    Version::parse(cleaned).map_err(|e| {
        ActionError::VersionIncompatible(format!(
            "cannot parse Notation CLI version '{}': {}",
            raw, e
        ))
    })
}

/// Ask the installed tool for its version and derive capabilities
pub async fn negotiate(runner: &dyn ToolRunner) -> ActionResult<Capabilities> {
    let output = runner.run(&["version".to_string()]).await?;
    let version = parse_version_output(&output.stdout)?;
    info!("Notation CLI version is {}", version);
    Ok(Capabilities::for_version(version))
}
