//! Argument vectors for notation subcommands

use std::path::Path;

use tracing::{info, warn};

use super::{Capabilities, Capability};
use crate::config::SignConfig;
use crate::error::ActionResult;

/// Human-readable command line for logs and errors
pub fn render_command(args: &[String]) -> String {
    std::iter::once(super::NOTATION_BINARY)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Referrers flags for `sign`.
///
/// `force_referrers_tag` takes precedence; `allow_referrers_api` is the
/// deprecated spelling and maps onto `--force-referrers-tag=false` on
/// releases that know the newer flag.
pub fn referrers_flags(
    force_referrers_tag: Option<bool>,
    allow_referrers_api: bool,
    caps: &Capabilities,
) -> ActionResult<Vec<String>> {
    if let Some(force) = force_referrers_tag {
        caps.require(Capability::ForceReferrersTag, "force_referrers_tag")?;
        if allow_referrers_api {
            warn!("both 'force_referrers_tag' and 'allow_referrers_api' are set, 'allow_referrers_api' is ignored");
        }
        if force {
            info!("'force_referrers_tag' set to true, use referrers tag schema only");
        } else {
            info!("'force_referrers_tag' set to false, try referrers api first");
        }
        return Ok(vec![format!("--force-referrers-tag={}", force)]);
    }

    if !allow_referrers_api {
        return Ok(Vec::new());
    }

    if caps.supports(Capability::ForceReferrersTag) {
        warn!("'allow_referrers_api' is deprecated. Use 'force_referrers_tag' instead, try referrers api first");
        Ok(vec!["--force-referrers-tag=false".to_string()])
    } else {
        info!("'allow_referrers_api' set to true, try referrers api first");
        Ok(vec!["--allow-referrers-api".to_string()])
    }
}

/// `sign` arguments up to (not including) the artifact reference
pub fn sign_args(config: &SignConfig, caps: &Capabilities) -> ActionResult<Vec<String>> {
    let mut args = vec![
        "sign".to_string(),
        "--signature-format".to_string(),
        config.signature_format.clone(),
        "--id".to_string(),
        config.key_id.clone(),
        "--plugin".to_string(),
        config.plugin_name.clone(),
    ];

    args.extend(
        config
            .plugin_config
            .iter()
            .map(|entry| format!("--plugin-config={}", entry)),
    );

    args.extend(referrers_flags(
        config.force_referrers_tag,
        config.allow_referrers_api,
        caps,
    )?);

    if let Some(timestamping) = &config.timestamping {
        info!("timestamping url is {}", timestamping.url);
        info!("timestamping root cert is {}", timestamping.root_cert);
        args.extend([
            "--timestamp-url".to_string(),
            timestamping.url.clone(),
            "--timestamp-root-cert".to_string(),
            timestamping.root_cert.clone(),
        ]);
    }

    Ok(args)
}

pub fn verify_args(reference: &str, allow_referrers_api: bool) -> Vec<String> {
    let mut args = vec!["verify".to_string()];
    if allow_referrers_api {
        args.push("--allow-referrers-api".to_string());
    }
    args.push(reference.to_string());
    args.push("-v".to_string());
    args
}

pub fn plugin_install_args(url: &str, checksum: &str) -> Vec<String> {
    vec![
        "plugin".to_string(),
        "install".to_string(),
        "--url".to_string(),
        url.to_string(),
        "--sha256sum".to_string(),
        checksum.to_string(),
    ]
}

pub fn policy_import_args(trust_policy: &Path) -> Vec<String> {
    vec![
        "policy".to_string(),
        "import".to_string(),
        "--force".to_string(),
        trust_policy.to_string_lossy().into_owned(),
    ]
}

pub fn cert_add_args(store_type: &str, store_name: &str, certificates: &[impl AsRef<Path>]) -> Vec<String> {
    let mut args = vec![
        "cert".to_string(),
        "add".to_string(),
        "-t".to_string(),
        store_type.to_string(),
        "-s".to_string(),
        store_name.to_string(),
    ];
    args.extend(
        certificates
            .iter()
            .map(|cert| cert.as_ref().to_string_lossy().into_owned()),
    );
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timestamping;
    use crate::error::ActionError;
    use semver::Version;

    fn caps(major: u64, minor: u64, patch: u64) -> Capabilities {
        Capabilities::for_version(Version::new(major, minor, patch))
    }

    fn config() -> SignConfig {
        SignConfig {
            plugin_name: "local-signer".to_string(),
            plugin_url: "https://example.com/plugin.tar.gz".to_string(),
            plugin_checksum: "a".repeat(64),
            key_id: "key-1".to_string(),
            plugin_config: vec!["b=2".to_string(), "a=1".to_string()],
            references: vec!["registry.local/app:v1".to_string()],
            signature_format: "cose".to_string(),
            allow_referrers_api: false,
            force_referrers_tag: None,
            timestamping: None,
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sign_args_preserve_plugin_config_order() {
        let args = sign_args(&config(), &caps(1, 2, 0)).expect("args");
        assert_eq!(
            args,
            strings(&[
                "sign",
                "--signature-format",
                "cose",
                "--id",
                "key-1",
                "--plugin",
                "local-signer",
                "--plugin-config=b=2",
                "--plugin-config=a=1",
            ])
        );
    }

    #[test]
    fn sign_args_append_timestamping_pair() {
        let mut config = config();
        config.plugin_config.clear();
        config.timestamping = Some(Timestamping {
            url: "http://timestamp.digicert.com".to_string(),
            root_cert: "tsa_root.crt".to_string(),
        });
        let args = sign_args(&config, &caps(1, 2, 0)).expect("args");
        assert_eq!(
            &args[7..],
            &strings(&[
                "--timestamp-url",
                "http://timestamp.digicert.com",
                "--timestamp-root-cert",
                "tsa_root.crt",
            ])[..]
        );
    }

    #[test]
    fn force_referrers_tag_on_old_release_is_incompatible() {
        let err = referrers_flags(Some(true), false, &caps(1, 1, 1)).expect_err("too old");
        assert!(matches!(err, ActionError::VersionIncompatible(_)));
    }

    #[test]
    fn force_referrers_tag_wins_over_allow_referrers_api() {
        assert_eq!(
            referrers_flags(Some(true), true, &caps(1, 2, 0)).expect("flags"),
            strings(&["--force-referrers-tag=true"])
        );
        assert_eq!(
            referrers_flags(Some(false), false, &caps(1, 3, 0)).expect("flags"),
            strings(&["--force-referrers-tag=false"])
        );
    }

    #[test]
    fn allow_referrers_api_maps_by_release() {
        assert_eq!(
            referrers_flags(None, true, &caps(1, 1, 0)).expect("flags"),
            strings(&["--allow-referrers-api"])
        );
        assert_eq!(
            referrers_flags(None, true, &caps(1, 2, 0)).expect("flags"),
            strings(&["--force-referrers-tag=false"])
        );
        assert!(referrers_flags(None, false, &caps(1, 2, 0))
            .expect("flags")
            .is_empty());
    }

    #[test]
    fn verify_and_cert_args() {
        assert_eq!(
            verify_args("registry.local/app:v1", true),
            strings(&["verify", "--allow-referrers-api", "registry.local/app:v1", "-v"])
        );
        assert_eq!(
            cert_add_args("ca", "acme", &["a.pem", "b.crt"]),
            strings(&["cert", "add", "-t", "ca", "-s", "acme", "a.pem", "b.crt"])
        );
        assert_eq!(
            render_command(&plugin_install_args("https://e.com/p.zip", "abc")),
            "notation plugin install --url https://e.com/p.zip --sha256sum abc"
        );
    }
}
