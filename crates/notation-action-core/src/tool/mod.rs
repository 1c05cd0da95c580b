//! The external `notation` CLI
//!
//! All signing and verification is delegated to it. This module locates the
//! binary, runs it one invocation at a time, negotiates what the installed
//! release supports, and assembles argument vectors.

mod command;
mod version;

pub use command::{
    cert_add_args, plugin_install_args, policy_import_args, referrers_flags, render_command,
    sign_args, verify_args,
};
pub use version::{negotiate, parse_version_output, Capabilities, Capability};

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ActionError, ActionResult};

/// Name of the notation executable (without platform suffix)
pub const NOTATION_BINARY: &str = "notation";

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs the notation CLI with an argument vector
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run once and wait. Non-zero exit is a `Subprocess` error.
    async fn run(&self, args: &[String]) -> ActionResult<CommandOutput>;
}

/// Runs a real `notation` binary as a subprocess
pub struct NotationCli {
    binary: PathBuf,
    echo: bool,
}

impl NotationCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            echo: false,
        }
    }

    /// Use `explicit` if given, otherwise find `notation` on PATH
    pub fn locate(explicit: Option<&Path>) -> ActionResult<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }

        let path = which::which(NOTATION_BINARY).map_err(|e| {
            ActionError::config(format!(
                "{} not found on PATH ({}); run setup first or pass --notation",
                NOTATION_BINARY, e
            ))
        })?;
        debug!("Found {} in PATH: {:?}", NOTATION_BINARY, path);
        Ok(Self::new(path))
    }

    /// Copy the tool's stdout/stderr to our own as it finishes
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl ToolRunner for NotationCli {
    async fn run(&self, args: &[String]) -> ActionResult<CommandOutput> {
        let command = render_command(args);
        debug!("Running: {}", command);

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ActionError::Subprocess {
                command: command.clone(),
                status: "failed to start".to_string(),
                stderr: e.to_string(),
            })?;

        if self.echo {
            // A closed stdout must not mask the tool's own result
            if let Err(e) = tokio::io::stdout().write_all(&output.stdout).await {
                debug!("failed to echo {} stdout: {}", command, e);
            }
            if let Err(e) = tokio::io::stderr().write_all(&output.stderr).await {
                debug!("failed to echo {} stderr: {}", command, e);
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ActionError::Subprocess {
                command,
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        if !stderr.trim().is_empty() {
            warn!("`{}` wrote to stderr: {}", command, stderr.trim());
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{CommandOutput, ToolRunner};
    use crate::error::{ActionError, ActionResult};

    /// Records every invocation; answers `version` with a fixed release
    /// and fails any invocation whose args contain `fail_on`.
    pub struct ScriptedRunner {
        version: String,
        fail_on: Option<String>,
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        pub fn new(version: &str) -> Self {
            Self {
                version: version.to_string(),
                fail_on: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_on(mut self, arg: &str) -> Self {
            self.fail_on = Some(arg.to_string());
            self
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl ToolRunner for ScriptedRunner {
        async fn run(&self, args: &[String]) -> ActionResult<CommandOutput> {
            self.calls.lock().expect("lock").push(args.to_vec());

            if let Some(fail_on) = &self.fail_on {
                if args.iter().any(|arg| arg == fail_on) {
                    return Err(ActionError::Subprocess {
                        command: super::render_command(args),
                        status: "exit status: 1".to_string(),
                        stderr: format!("Error: {} rejected", fail_on),
                    });
                }
            }

            if args.first().map(String::as_str) == Some("version") {
                return Ok(CommandOutput {
                    stdout: format!(
                        "Notation - a tool to sign and verify artifacts.\n\nVersion:     {}\nGo version:  go1.22.3\nGit commit:  abc123\n",
                        self.version
                    ),
                    stderr: String::new(),
                });
            }

            Ok(CommandOutput::default())
        }
    }
}
