//! Per-entry-point configuration
//!
//! Raw inputs arrive as optional strings (CI runners hand unset inputs over
//! as empty strings). Each entry point validates them once into a typed
//! config that the pipeline borrows; nothing is read from global state.

use std::path::PathBuf;

use tracing::warn;

use crate::checksum::normalize_checksum;
use crate::error::{ActionError, ActionResult};

/// Signature envelope format used when none is given
pub const DEFAULT_SIGNATURE_FORMAT: &str = "cose";

/// Raw `setup` inputs
#[derive(Debug, Clone, Default)]
pub struct SetupInputs {
    pub version: Option<String>,
    pub url: Option<String>,
    pub checksum: Option<String>,
    pub install_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

/// Raw `sign` inputs
#[derive(Debug, Clone, Default)]
pub struct SignInputs {
    pub plugin_name: Option<String>,
    pub plugin_url: Option<String>,
    pub plugin_checksum: Option<String>,
    pub key_id: Option<String>,
    pub plugin_config: Option<String>,
    pub target_artifact_reference: Option<String>,
    pub signature_format: Option<String>,
    pub allow_referrers_api: Option<String>,
    pub force_referrers_tag: Option<String>,
    pub timestamp_url: Option<String>,
    pub timestamp_root_cert: Option<String>,
}

/// Raw `verify` inputs
#[derive(Debug, Clone, Default)]
pub struct VerifyInputs {
    pub target_artifact_reference: Option<String>,
    pub trust_policy: Option<String>,
    pub trust_store: Option<String>,
    pub allow_referrers_api: Option<String>,
}

/// User-supplied replacement for the manifest source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOverride {
    pub url: String,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupConfig {
    /// Requested release; `None` means the manifest's latest
    pub version: Option<String>,
    pub source_override: Option<SourceOverride>,
    pub install_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

/// RFC 3161 timestamping, always configured as a pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamping {
    pub url: String,
    pub root_cert: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignConfig {
    pub plugin_name: String,
    pub plugin_url: String,
    pub plugin_checksum: String,
    pub key_id: String,
    /// `--plugin-config` entries, in input order
    pub plugin_config: Vec<String>,
    pub references: Vec<String>,
    pub signature_format: String,
    pub allow_referrers_api: bool,
    pub force_referrers_tag: Option<bool>,
    pub timestamping: Option<Timestamping>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyConfig {
    pub references: Vec<String>,
    pub trust_policy: PathBuf,
    pub trust_store: PathBuf,
    pub allow_referrers_api: bool,
}

impl TryFrom<SetupInputs> for SetupConfig {
    type Error = ActionError;

    fn try_from(inputs: SetupInputs) -> ActionResult<Self> {
        let url = present(inputs.url);
        let checksum = present(inputs.checksum);

        let source_override = match (url, checksum) {
            (Some(url), Some(checksum)) => Some(SourceOverride {
                url,
                checksum: normalize_checksum(&checksum)?,
            }),
            (Some(_), None) => {
                return Err(ActionError::config(
                    "checksum required when URL override given: user provided url of customized Notation CLI release but without SHA256 checksum",
                ))
            }
            (None, Some(_)) => {
                warn!("checksum input is ignored without a url input");
                None
            }
            (None, None) => None,
        };

        Ok(Self {
            version: present(inputs.version).map(|v| v.trim_start_matches('v').to_string()),
            source_override,
            install_dir: inputs.install_dir.filter(|p| !p.as_os_str().is_empty()),
            manifest: inputs.manifest.filter(|p| !p.as_os_str().is_empty()),
        })
    }
}

impl TryFrom<SignInputs> for SignConfig {
    type Error = ActionError;

    fn try_from(inputs: SignInputs) -> ActionResult<Self> {
        let plugin_name = plugin_name(&required(inputs.plugin_name, "plugin_name")?)?;
        let plugin_url = required(inputs.plugin_url, "plugin_url")?;
        let plugin_checksum = normalize_checksum(&required(inputs.plugin_checksum, "plugin_checksum")?)?;
        let key_id = required(inputs.key_id, "key_id")?;
        let target = required(inputs.target_artifact_reference, "target_artifact_reference")?;

        let timestamping = match (present(inputs.timestamp_url), present(inputs.timestamp_root_cert)) {
            (Some(url), Some(root_cert)) => Some(Timestamping { url, root_cert }),
            (Some(_), None) => {
                return Err(ActionError::config(
                    "timestamp_url is set, missing input timestamp_root_cert",
                ))
            }
            (None, Some(_)) => {
                return Err(ActionError::config(
                    "timestamp_root_cert is set, missing input timestamp_url",
                ))
            }
            (None, None) => None,
        };

        let force_referrers_tag = match present(inputs.force_referrers_tag) {
            Some(raw) => Some(parse_strict_bool(&raw).ok_or_else(|| {
                ActionError::config(format!(
                    "force_referrers_tag must be set to 'true' or 'false'. Got '{}'",
                    raw
                ))
            })?),
            None => None,
        };

        let references = parse_references(&target)?;
        let plugin_config = parse_plugin_config(inputs.plugin_config.as_deref().unwrap_or(""))?;

        Ok(Self {
            plugin_name,
            plugin_url,
            plugin_checksum,
            key_id,
            plugin_config,
            references,
            signature_format: present(inputs.signature_format)
                .unwrap_or_else(|| DEFAULT_SIGNATURE_FORMAT.to_string()),
            allow_referrers_api: parse_flag(inputs.allow_referrers_api.as_deref()),
            force_referrers_tag,
            timestamping,
        })
    }
}

impl TryFrom<VerifyInputs> for VerifyConfig {
    type Error = ActionError;

    fn try_from(inputs: VerifyInputs) -> ActionResult<Self> {
        let target = required(inputs.target_artifact_reference, "target_artifact_reference")?;
        let trust_policy = required(inputs.trust_policy, "trust_policy")?;
        let trust_store = required(inputs.trust_store, "trust_store")?;

        Ok(Self {
            references: parse_references(&target)?,
            trust_policy: PathBuf::from(trust_policy),
            trust_store: PathBuf::from(trust_store),
            allow_referrers_api: parse_flag(inputs.allow_referrers_api.as_deref()),
        })
    }
}

/// Split multi-line input: trim each line, drop empties, keep order
pub fn split_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the artifact reference list; at least one must survive filtering
pub fn parse_references(input: &str) -> ActionResult<Vec<String>> {
    let references = split_lines(input);
    if references.is_empty() {
        return Err(ActionError::config(
            "input target_artifact_reference does not contain any valid reference",
        ));
    }
    Ok(references)
}

/// Parse `plugin_config`: a JSON array of strings, or one entry per line
pub fn parse_plugin_config(input: &str) -> ActionResult<Vec<String>> {
    let trimmed = input.trim();
    if trimmed.starts_with('[') {
        let entries: Vec<String> = serde_json::from_str(trimmed).map_err(|e| {
            ActionError::config(format!(
                "plugin_config looks like a JSON array but could not be parsed: {}",
                e
            ))
        })?;
        return Ok(entries
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect());
    }
    Ok(split_lines(trimmed))
}

/// Plugin names become a directory and a file name under the plugin
/// root, so they are limited to one plain path component.
fn plugin_name(raw: &str) -> ActionResult<String> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if raw.contains("..") || !raw.chars().all(allowed) {
        return Err(ActionError::config(format!(
            "plugin_name '{}' must be a single name without path separators or '..'",
            raw
        )));
    }
    if raw == "." {
        return Err(ActionError::config("plugin_name '.' is not a valid plugin name"));
    }
    Ok(raw.to_string())
}

/// Loose toggle: `true` (any case) is on, everything else off
pub fn parse_flag(raw: Option<&str>) -> bool {
    raw.map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parse_strict_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Treat empty / whitespace-only inputs as absent
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, name: &str) -> ActionResult<String> {
    present(value).ok_or_else(|| ActionError::config(format!("input {} is required", name)))
}
