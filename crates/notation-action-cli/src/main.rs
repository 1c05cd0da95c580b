//! notation-action - install Notation and sign or verify OCI artifacts from CI
//!
//! Every input can be passed as a flag or through the `INPUT_<NAME>`
//! environment variable a CI runner sets for action inputs.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;
mod github;

use commands::{SetupArgs, SignArgs, VerifyArgs};

/// Notation CLI setup, signing and verification for CI pipelines
#[derive(Parser)]
#[command(name = "notation-action", version)]
#[command(about = "Install Notation and sign or verify OCI artifacts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the Notation CLI and publish it on PATH
    ///
    /// The release comes from the bundled manifest (or --manifest) unless
    /// --url and --checksum name a custom archive.
    Setup(SetupArgs),

    /// Install a signing plugin and sign each artifact reference
    Sign(SignArgs),

    /// Import trust policy and trust store, then verify each reference
    Verify(VerifyArgs),
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Setup(args) => commands::setup(args).await,
        Commands::Sign(args) => commands::sign(args).await,
        Commands::Verify(args) => commands::verify(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            github::report_failure(&e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use notation_action_core::{SignConfig, SignInputs};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sign_flags_map_onto_inputs() {
        let checksum = "a".repeat(64);
        let cli = Cli::try_parse_from([
            "notation-action",
            "sign",
            "--plugin-name",
            "local-signer",
            "--plugin-url",
            "https://example.com/plugin.tar.gz",
            "--plugin-checksum",
            checksum.as_str(),
            "--key-id",
            "key-1",
            "--target-artifact-reference",
            "registry.local/app:v1\nregistry.local/app:v2",
            "--force-referrers-tag",
            "true",
            "--config-home",
            "/tmp/config",
        ])
        .expect("parse");

        let Commands::Sign(args) = cli.command else {
            panic!("expected sign");
        };
        assert_eq!(args.config_home.as_deref(), Some(std::path::Path::new("/tmp/config")));

        let config = SignConfig::try_from(SignInputs::from(args)).expect("valid");
        assert_eq!(config.references, vec!["registry.local/app:v1", "registry.local/app:v2"]);
        assert_eq!(config.force_referrers_tag, Some(true));
        assert_eq!(config.signature_format, "cose");
    }

    #[test]
    fn setup_accepts_custom_manifest() {
        let cli = Cli::try_parse_from([
            "notation-action",
            "setup",
            "--version",
            "v1.2.0",
            "--manifest",
            "releases.json",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Setup(SetupArgs { ref version, .. }) if version.as_deref() == Some("v1.2.0")
        ));
    }
}
