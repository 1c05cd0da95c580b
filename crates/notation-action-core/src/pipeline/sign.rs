use semver::Version;
use tracing::info;
use url::Url;

use crate::config::SignConfig;
use crate::download::Downloader;
use crate::error::{ActionError, ActionResult};
use crate::install::{ArchiveInstaller, InstallTarget};
use crate::manifest::DownloadSource;
use crate::paths::{plugin_binary_name, NotationLayout};
use crate::platform::Platform;
use crate::tool::{self, Capabilities, Capability, ToolRunner};

/// How the signing plugin got onto disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginInstall {
    AlreadyInstalled,
    /// Via `notation plugin install`
    Command,
    /// Via the checksum-gated archive installer
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignReport {
    pub notation_version: Version,
    pub plugin: PluginInstall,
    /// References signed, in order
    pub signed: Vec<String>,
}

/// Install the signing plugin, then sign every reference in order.
///
/// The sign command is assembled before the plugin is touched, so a flag the
/// installed notation does not support fails without side effects.
pub async fn sign(
    config: &SignConfig,
    runner: &dyn ToolRunner,
    downloader: &dyn Downloader,
    layout: &NotationLayout,
    platform: Platform,
) -> ActionResult<SignReport> {
    let plugin_url = Url::parse(&config.plugin_url).map_err(|e| {
        ActionError::config(format!("invalid plugin_url '{}': {}", config.plugin_url, e))
    })?;

    let caps = tool::negotiate(runner).await?;
    let base_args = tool::sign_args(config, &caps)?;

    let plugin = install_plugin(config, plugin_url, &caps, runner, downloader, layout, platform).await?;
    runner.run(&["plugin".to_string(), "ls".to_string()]).await?;

    let mut signed = Vec::with_capacity(config.references.len());
    for reference in &config.references {
        let mut args = base_args.clone();
        args.push(reference.clone());
        runner.run(&args).await?;
        info!("successfully signed target artifact: {}", reference);
        signed.push(reference.clone());
    }

    Ok(SignReport {
        notation_version: caps.version().clone(),
        plugin,
        signed,
    })
}

async fn install_plugin(
    config: &SignConfig,
    plugin_url: Url,
    caps: &Capabilities,
    runner: &dyn ToolRunner,
    downloader: &dyn Downloader,
    layout: &NotationLayout,
    platform: Platform,
) -> ActionResult<PluginInstall> {
    let target = InstallTarget::new(
        plugin_binary_name(&config.plugin_name, platform),
        layout.plugin_dir(&config.plugin_name),
    );
    if target.is_installed() {
        info!("plugin {} is already installed", config.plugin_name);
        return Ok(PluginInstall::AlreadyInstalled);
    }

    if caps.supports(Capability::PluginInstallCommand) {
        info!("installing plugin {} with notation plugin install", config.plugin_name);
        runner
            .run(&tool::plugin_install_args(plugin_url.as_str(), &config.plugin_checksum))
            .await?;
        return Ok(PluginInstall::Command);
    }

    let source = DownloadSource {
        url: plugin_url,
        checksum: config.plugin_checksum.clone(),
    };
    let subject = format!("plugin {}", config.plugin_name);
    ArchiveInstaller::new(downloader)
        .install(&source, platform.archive_kind(), &target, &subject)
        .await?;
    Ok(PluginInstall::Archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::sha256_hex;
    use crate::install::test_support::{tar_gz, FakeDownloader};
    use crate::tool::test_support::ScriptedRunner;
    use tempfile::tempdir;

    fn config(checksum: &str, references: &[&str]) -> SignConfig {
        SignConfig {
            plugin_name: "local-signer".to_string(),
            plugin_url: "https://example.com/notation-local-signer_linux_amd64.tar.gz".to_string(),
            plugin_checksum: checksum.to_string(),
            key_id: "key-1".to_string(),
            plugin_config: vec!["region=us-west-2".to_string()],
            references: references.iter().map(|r| r.to_string()).collect(),
            signature_format: "cose".to_string(),
            allow_referrers_api: false,
            force_referrers_tag: None,
            timestamping: None,
        }
    }

    fn sign_call(reference: &str) -> Vec<String> {
        [
            "sign",
            "--signature-format",
            "cose",
            "--id",
            "key-1",
            "--plugin",
            "local-signer",
            "--plugin-config=region=us-west-2",
            reference,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn seed_plugin(layout: &NotationLayout) {
        let dir = layout.plugin_dir("local-signer");
        std::fs::create_dir_all(&dir).expect("mkdir");
        let binary = dir.join("notation-local-signer");
        std::fs::write(&binary, b"plugin").expect("seed");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        }
    }

    #[tokio::test]
    async fn installed_plugin_skips_download_and_signs_in_order() {
        let home = tempdir().expect("tempdir");
        let layout = NotationLayout::new(home.path());
        seed_plugin(&layout);

        let runner = ScriptedRunner::new("1.0.0");
        let downloader = FakeDownloader::new(Vec::new());
        let report = sign(
            &config(&"a".repeat(64), &["ref-a", "ref-b"]),
            &runner,
            &downloader,
            &layout,
            Platform::Linux,
        )
        .await
        .expect("sign");

        assert_eq!(report.plugin, PluginInstall::AlreadyInstalled);
        assert_eq!(report.signed, vec!["ref-a", "ref-b"]);
        assert_eq!(downloader.request_count(), 0);
        assert_eq!(
            runner.calls(),
            vec![
                vec!["version".to_string()],
                vec!["plugin".to_string(), "ls".to_string()],
                sign_call("ref-a"),
                sign_call("ref-b"),
            ]
        );
    }

    #[tokio::test]
    async fn old_notation_installs_plugin_from_archive() {
        let archive = tar_gz(&[("notation-local-signer", "#!/bin/sh\n")]);
        let home = tempdir().expect("tempdir");
        let layout = NotationLayout::new(home.path());
        let runner = ScriptedRunner::new("1.0.1");
        let downloader = FakeDownloader::new(archive.clone());

        let report = sign(
            &config(&sha256_hex(&archive), &["ref-a"]),
            &runner,
            &downloader,
            &layout,
            Platform::Linux,
        )
        .await
        .expect("sign");

        assert_eq!(report.plugin, PluginInstall::Archive);
        assert_eq!(downloader.request_count(), 1);
        assert!(layout
            .plugin_dir("local-signer")
            .join("notation-local-signer")
            .is_file());
        assert!(!runner
            .calls()
            .iter()
            .any(|call| call.iter().any(|arg| arg == "install")));
    }

    #[tokio::test]
    async fn plugin_checksum_mismatch_aborts_before_signing() {
        let archive = tar_gz(&[("notation-local-signer", "#!/bin/sh\n")]);
        let home = tempdir().expect("tempdir");
        let layout = NotationLayout::new(home.path());
        let runner = ScriptedRunner::new("1.0.0");
        let downloader = FakeDownloader::new(archive);

        let err = sign(
            &config(&"f".repeat(64), &["ref-a"]),
            &runner,
            &downloader,
            &layout,
            Platform::Linux,
        )
        .await
        .expect_err("mismatch");

        assert!(matches!(err, ActionError::ChecksumMismatch { .. }));
        assert!(!layout.plugin_dir("local-signer").exists());
        assert_eq!(runner.calls(), vec![vec!["version".to_string()]]);
    }

    #[tokio::test]
    async fn newer_notation_uses_plugin_install_command() {
        let home = tempdir().expect("tempdir");
        let layout = NotationLayout::new(home.path());
        let runner = ScriptedRunner::new("1.2.0");
        let downloader = FakeDownloader::new(Vec::new());
        let checksum = "c".repeat(64);

        let report = sign(&config(&checksum, &["ref-a"]), &runner, &downloader, &layout, Platform::Linux)
            .await
            .expect("sign");

        assert_eq!(report.plugin, PluginInstall::Command);
        assert_eq!(downloader.request_count(), 0);
        assert_eq!(
            runner.calls()[1],
            tool::plugin_install_args(
                "https://example.com/notation-local-signer_linux_amd64.tar.gz",
                &checksum
            )
        );
    }

    #[tokio::test]
    async fn force_referrers_tag_on_old_notation_fails_before_install() {
        let home = tempdir().expect("tempdir");
        let layout = NotationLayout::new(home.path());
        let runner = ScriptedRunner::new("1.1.0");
        let downloader = FakeDownloader::new(Vec::new());

        let mut config = config(&"a".repeat(64), &["ref-a"]);
        config.force_referrers_tag = Some(true);

        let err = sign(&config, &runner, &downloader, &layout, Platform::Linux)
            .await
            .expect_err("incompatible");
        assert!(matches!(err, ActionError::VersionIncompatible(_)));
        assert_eq!(runner.calls(), vec![vec!["version".to_string()]]);
        assert_eq!(downloader.request_count(), 0);
    }

    #[tokio::test]
    async fn failed_reference_stops_the_rest() {
        let home = tempdir().expect("tempdir");
        let layout = NotationLayout::new(home.path());
        seed_plugin(&layout);
        let runner = ScriptedRunner::new("1.2.0").failing_on("ref-b");
        let downloader = FakeDownloader::new(Vec::new());

        let err = sign(
            &config(&"a".repeat(64), &["ref-a", "ref-b", "ref-c"]),
            &runner,
            &downloader,
            &layout,
            Platform::Linux,
        )
        .await
        .expect_err("fail fast");

        assert!(matches!(err, ActionError::Subprocess { .. }));
        let calls = runner.calls();
        assert_eq!(calls.last(), Some(&sign_call("ref-b")));
        assert!(!calls.contains(&sign_call("ref-c")));
    }
}
