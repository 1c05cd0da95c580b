use std::path::PathBuf;

use tracing::info;

use crate::config::SetupConfig;
use crate::download::Downloader;
use crate::error::{ActionError, ActionResult};
use crate::install::{ArchiveInstaller, InstallOutcome, InstallTarget};
use crate::manifest::ReleaseManifest;
use crate::paths::default_install_dir;
use crate::platform::{Arch, Platform};
use crate::tool::NOTATION_BINARY;

/// What `setup` left on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    /// Release label; `custom-<checksum prefix>` for URL overrides without a version
    pub version: String,
    pub binary: PathBuf,
    /// Directory to publish on the host's PATH
    pub install_dir: PathBuf,
    pub freshly_installed: bool,
}

/// Install the Notation CLI for `platform`/`arch`
pub async fn setup(
    config: &SetupConfig,
    downloader: &dyn Downloader,
    platform: Platform,
    arch: Arch,
) -> ActionResult<SetupReport> {
    let manifest = match &config.manifest {
        Some(path) => ReleaseManifest::load(path).await?,
        None => ReleaseManifest::bundled()?,
    };

    let version = match (&config.version, &config.source_override) {
        (Some(version), _) => version.clone(),
        (None, Some(source)) => format!("custom-{}", &source.checksum[..12]),
        (None, None) => manifest
            .latest()
            .map(str::to_string)
            .ok_or_else(|| {
                ActionError::NotSupported(
                    "release manifest lists no Notation CLI versions; pass --manifest, or --url with --checksum"
                        .to_string(),
                )
            })?,
    };

    let source = manifest.resolve(
        &version,
        config.source_override.as_ref().map(|o| o.url.as_str()),
        config.source_override.as_ref().map(|o| o.checksum.as_str()),
        platform,
        arch,
    )?;
    info!("Notation CLI {} for {}/{} from {}", version, platform, arch, source.url);

    let install_dir = config
        .install_dir
        .clone()
        .unwrap_or_else(|| default_install_dir(&version));
    let target = InstallTarget::new(platform.binary_name(NOTATION_BINARY), &install_dir);

    let outcome = ArchiveInstaller::new(downloader)
        .install(&source, platform.archive_kind(), &target, "Notation CLI")
        .await?;

    Ok(SetupReport {
        version,
        binary: outcome.path().to_path_buf(),
        install_dir,
        freshly_installed: matches!(outcome, InstallOutcome::Installed(_)),
    })
}
