//! Subcommand arguments and their runners

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tracing::{debug, info};

use notation_action_core::pipeline;
use notation_action_core::{
    Arch, HttpDownloader, NotationCli, NotationLayout, Platform, SetupConfig, SetupInputs,
    SignConfig, SignInputs, VerifyConfig, VerifyInputs,
};

use crate::github;

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Notation CLI version to install (default: latest in the manifest)
    #[arg(long, env = "INPUT_VERSION")]
    pub version: Option<String>,

    /// URL of a custom Notation CLI release archive
    #[arg(long, env = "INPUT_URL")]
    pub url: Option<String>,

    /// SHA-256 of the archive at --url
    #[arg(long, env = "INPUT_CHECKSUM")]
    pub checksum: Option<String>,

    /// Directory to install the binary into
    #[arg(long, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Release manifest to use instead of the bundled one
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Per-request download timeout
    #[arg(long, value_name = "SECONDS")]
    pub download_timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Name of the signing plugin
    #[arg(long, env = "INPUT_PLUGIN_NAME")]
    pub plugin_name: Option<String>,

    /// Download URL of the plugin archive
    #[arg(long, env = "INPUT_PLUGIN_URL")]
    pub plugin_url: Option<String>,

    /// SHA-256 of the plugin archive
    #[arg(long, env = "INPUT_PLUGIN_CHECKSUM")]
    pub plugin_checksum: Option<String>,

    /// Key identifier passed to the plugin
    #[arg(long, env = "INPUT_KEY_ID")]
    pub key_id: Option<String>,

    /// Plugin config entries, one `key=value` per line or a JSON array
    #[arg(long, env = "INPUT_PLUGIN_CONFIG")]
    pub plugin_config: Option<String>,

    /// Artifact references to sign, one per line
    #[arg(long, env = "INPUT_TARGET_ARTIFACT_REFERENCE")]
    pub target_artifact_reference: Option<String>,

    /// Signature envelope format (default: cose)
    #[arg(long, env = "INPUT_SIGNATURE_FORMAT")]
    pub signature_format: Option<String>,

    /// Deprecated; prefer --force-referrers-tag
    #[arg(long, env = "INPUT_ALLOW_REFERRERS_API")]
    pub allow_referrers_api: Option<String>,

    /// `true` stores signatures with the referrers tag schema only
    #[arg(long, env = "INPUT_FORCE_REFERRERS_TAG")]
    pub force_referrers_tag: Option<String>,

    /// RFC 3161 timestamp authority URL
    #[arg(long, env = "INPUT_TIMESTAMP_URL")]
    pub timestamp_url: Option<String>,

    /// Root certificate of the timestamp authority
    #[arg(long, env = "INPUT_TIMESTAMP_ROOT_CERT")]
    pub timestamp_root_cert: Option<String>,

    #[command(flatten)]
    pub tool: ToolArgs,

    /// Configuration home notation reads plugins from (default: platform config dir)
    #[arg(long, value_name = "DIR")]
    pub config_home: Option<PathBuf>,

    /// Per-request download timeout for the plugin archive
    #[arg(long, value_name = "SECONDS")]
    pub download_timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Artifact references to verify, one per line
    #[arg(long, env = "INPUT_TARGET_ARTIFACT_REFERENCE")]
    pub target_artifact_reference: Option<String>,

    /// Trust policy JSON file
    #[arg(long, env = "INPUT_TRUST_POLICY")]
    pub trust_policy: Option<String>,

    /// Trust store directory containing `x509/<type>/<name>/`
    #[arg(long, env = "INPUT_TRUST_STORE")]
    pub trust_store: Option<String>,

    #[arg(long, env = "INPUT_ALLOW_REFERRERS_API")]
    pub allow_referrers_api: Option<String>,

    #[command(flatten)]
    pub tool: ToolArgs,
}

/// Where to find the notation binary
#[derive(Args, Debug, Clone, Default)]
pub struct ToolArgs {
    /// Path to the notation binary (default: search PATH)
    #[arg(long, value_name = "PATH")]
    pub notation: Option<PathBuf>,
}

impl From<SetupArgs> for SetupInputs {
    fn from(args: SetupArgs) -> Self {
        Self {
            version: args.version,
            url: args.url,
            checksum: args.checksum,
            install_dir: args.install_dir,
            manifest: args.manifest,
        }
    }
}

impl From<SignArgs> for SignInputs {
    fn from(args: SignArgs) -> Self {
        Self {
            plugin_name: args.plugin_name,
            plugin_url: args.plugin_url,
            plugin_checksum: args.plugin_checksum,
            key_id: args.key_id,
            plugin_config: args.plugin_config,
            target_artifact_reference: args.target_artifact_reference,
            signature_format: args.signature_format,
            allow_referrers_api: args.allow_referrers_api,
            force_referrers_tag: args.force_referrers_tag,
            timestamp_url: args.timestamp_url,
            timestamp_root_cert: args.timestamp_root_cert,
        }
    }
}

impl From<VerifyArgs> for VerifyInputs {
    fn from(args: VerifyArgs) -> Self {
        Self {
            target_artifact_reference: args.target_artifact_reference,
            trust_policy: args.trust_policy,
            trust_store: args.trust_store,
            allow_referrers_api: args.allow_referrers_api,
        }
    }
}

impl ToolArgs {
    fn runner(&self) -> Result<NotationCli> {
        let runner = NotationCli::locate(self.notation.as_deref())?.echo(true);
        info!("Using notation at {}", runner.binary().display());
        Ok(runner)
    }
}

pub async fn setup(args: SetupArgs) -> Result<()> {
    let timeout = args.download_timeout.map(Duration::from_secs);
    let config = SetupConfig::try_from(SetupInputs::from(args))?;

    let downloader = HttpDownloader::with_timeout(timeout)?;
    let report = pipeline::setup(&config, &downloader, Platform::current()?, Arch::current()?).await?;

    if report.freshly_installed {
        info!("Notation CLI {} installed at {:?}", report.version, report.binary);
    }
    github::add_path(&report.install_dir)?;
    println!("{}", report.install_dir.display());
    Ok(())
}

pub async fn sign(args: SignArgs) -> Result<()> {
    let timeout = args.download_timeout.map(Duration::from_secs);
    let tool = args.tool.clone();
    let config_home = args.config_home.clone();
    let config = SignConfig::try_from(SignInputs::from(args))?;

    let runner = tool.runner()?;
    let layout = match config_home {
        Some(home) => NotationLayout::new(home),
        None => NotationLayout::detect()?,
    };
    debug!("Notation configuration at {:?}", layout.root());
    let downloader = HttpDownloader::with_timeout(timeout)?;

    let report = pipeline::sign(&config, &runner, &downloader, &layout, Platform::current()?).await?;
    info!(
        "signed {} artifact(s) with Notation v{}",
        report.signed.len(),
        report.notation_version
    );
    Ok(())
}

pub async fn verify(args: VerifyArgs) -> Result<()> {
    let tool = args.tool.clone();
    let config = VerifyConfig::try_from(VerifyInputs::from(args))?;
    let runner = tool.runner()?;

    let verified = pipeline::verify(&config, &runner).await?;
    info!("verified {} artifact(s)", verified.len());
    Ok(())
}
