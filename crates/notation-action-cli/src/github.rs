//! Reporting back to the CI host (workflow commands and the PATH file)

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info};

use notation_action_core::ActionError;

/// Label used when a failure did not come from a pipeline stage
const UNKNOWN_STAGE: &str = "notation-action";

fn running_in_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|value| value == "true")
}

/// Stage of the first `ActionError` in the chain
pub fn stage_of(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ActionError>())
        .map(ActionError::stage)
        .unwrap_or(UNKNOWN_STAGE)
}

/// `::error::` workflow command; `%`, CR and LF are escaped so the
/// message stays on one line.
pub fn error_annotation(stage: &str, message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{} failed: {}", stage, escaped)
}

pub fn report_failure(err: &anyhow::Error) {
    let stage = stage_of(err);
    let message = format!("{:#}", err);
    error!("{} failed: {}", stage, message);

    if running_in_actions() {
        println!("{}", error_annotation(stage, &message));
    }
}

/// Publish `dir` on PATH for later workflow steps
pub fn add_path(dir: &Path) -> Result<()> {
    match std::env::var_os("GITHUB_PATH").filter(|value| !value.is_empty()) {
        Some(path_file) => append_path(Path::new(&path_file), dir),
        None => {
            info!("GITHUB_PATH is not set, add {} to PATH manually", dir.display());
            Ok(())
        }
    }
}

/// Append one line naming `dir` to the host's path file
pub fn append_path(path_file: &Path, dir: &Path) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path_file)
        .with_context(|| format!("failed to open path file {}", path_file.display()))?;
    writeln!(file, "{}", dir.display())
        .with_context(|| format!("failed to write path file {}", path_file.display()))?;
    info!("Added {} to PATH", dir.display());
    Ok(())
}
