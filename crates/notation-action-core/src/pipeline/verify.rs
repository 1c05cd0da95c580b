use tracing::info;

use crate::config::VerifyConfig;
use crate::error::ActionResult;
use crate::tool::{self, ToolRunner};
use crate::truststore;

/// Import the trust policy and trust store, then verify every reference.
///
/// Returns the references verified, in order.
pub async fn verify(config: &VerifyConfig, runner: &dyn ToolRunner) -> ActionResult<Vec<String>> {
    runner.run(&tool::policy_import_args(&config.trust_policy)).await?;
    runner.run(&["policy".to_string(), "show".to_string()]).await?;

    for store in truststore::discover(&config.trust_store)? {
        runner
            .run(&tool::cert_add_args(&store.store_type, &store.name, store.certificates.as_slice()))
            .await?;
    }
    runner.run(&["cert".to_string(), "ls".to_string()]).await?;

    let mut verified = Vec::with_capacity(config.references.len());
    for reference in &config.references {
        runner
            .run(&tool::verify_args(reference, config.allow_referrers_api))
            .await?;
        info!("successfully verified target artifact: {}", reference);
        verified.push(reference.clone());
    }
    Ok(verified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::tool::test_support::ScriptedRunner;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn trust_store(root: &Path) -> PathBuf {
        let store = root.join("truststore/x509/ca/acme");
        std::fs::create_dir_all(&store).expect("mkdir");
        std::fs::write(store.join("root.crt"), b"cert").expect("write");
        root.join("truststore")
    }

    fn config(root: &Path, references: &[&str]) -> VerifyConfig {
        VerifyConfig {
            references: args(references),
            trust_policy: root.join("trustpolicy.json"),
            trust_store: root.join("truststore"),
            allow_referrers_api: false,
        }
    }

    #[tokio::test]
    async fn configures_trust_then_verifies_each_reference() {
        let dir = tempdir().expect("tempdir");
        let store = trust_store(dir.path());
        let mut config = config(dir.path(), &["ref-a", "ref-b"]);
        config.allow_referrers_api = true;
        let runner = ScriptedRunner::new("1.2.0");

        let verified = verify(&config, &runner).await.expect("verify");
        assert_eq!(verified, vec!["ref-a", "ref-b"]);

        let policy = config.trust_policy.to_string_lossy().into_owned();
        let cert = store.join("x509/ca/acme/root.crt").to_string_lossy().into_owned();
        assert_eq!(
            runner.calls(),
            vec![
                args(&["policy", "import", "--force", policy.as_str()]),
                args(&["policy", "show"]),
                args(&["cert", "add", "-t", "ca", "-s", "acme", cert.as_str()]),
                args(&["cert", "ls"]),
                args(&["verify", "--allow-referrers-api", "ref-a", "-v"]),
                args(&["verify", "--allow-referrers-api", "ref-b", "-v"]),
            ]
        );
    }

    #[tokio::test]
    async fn missing_trust_store_fails_before_verification() {
        let dir = tempdir().expect("tempdir");
        let runner = ScriptedRunner::new("1.2.0");

        let err = verify(&config(dir.path(), &["ref-a"]), &runner)
            .await
            .expect_err("missing store");
        assert!(matches!(err, ActionError::Configuration(_)));
        assert!(runner.calls().iter().all(|call| call[0] != "verify"));
    }

    #[tokio::test]
    async fn failed_verification_stops_the_rest() {
        let dir = tempdir().expect("tempdir");
        trust_store(dir.path());
        let runner = ScriptedRunner::new("1.2.0").failing_on("ref-a");

        let err = verify(&config(dir.path(), &["ref-a", "ref-b"]), &runner)
            .await
            .expect_err("fail fast");
        assert!(matches!(err, ActionError::Subprocess { .. }));
        assert!(!runner.calls().contains(&args(&["verify", "ref-b", "-v"])));
    }
}
