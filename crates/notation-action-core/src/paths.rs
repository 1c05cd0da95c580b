//! Centralized path utilities
//!
//! Notation's user-level directory layout, and where we install the CLI.
//! Reference: https://notaryproject.dev/docs/concepts/directory-structure/#user-level

use std::path::{Path, PathBuf};

use crate::error::{ActionError, ActionResult};
use crate::platform::Platform;

/// Name of the notation directory under the config home
const NOTATION_DIR_NAME: &str = "notation";

/// Prefix every Notation plugin executable carries
pub const PLUGIN_BINARY_PREFIX: &str = "notation";

/// Platform configuration home
///
/// `%APPDATA%` on Windows, `~/Library/Application Support` on macOS,
/// `$XDG_CONFIG_HOME` or `~/.config` on Linux.
pub fn config_home() -> ActionResult<PathBuf> {
    dirs::config_dir()
        .ok_or_else(|| ActionError::config("cannot determine the user configuration directory"))
}

/// Default install directory for a Notation CLI version
/// (`<cache>/notation-action/notation/<version>`)
pub fn default_install_dir(version: &str) -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("notation-action")
        .join(NOTATION_DIR_NAME)
        .join(version)
}

/// Notation's directories under a configuration home
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotationLayout {
    root: PathBuf,
}

impl NotationLayout {
    pub fn new(config_home: impl AsRef<Path>) -> Self {
        Self {
            root: config_home.as_ref().join(NOTATION_DIR_NAME),
        }
    }

    /// Layout under the detected platform configuration home
    pub fn detect() -> ActionResult<Self> {
        Ok(Self::new(config_home()?))
    }

    /// `<config_home>/notation`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<config_home>/notation/plugins`
    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join("plugins")
    }

    /// `<config_home>/notation/plugins/<plugin_name>`
    pub fn plugin_dir(&self, plugin_name: &str) -> PathBuf {
        self.plugins_dir().join(plugin_name)
    }

    /// `<config_home>/notation/truststore`
    pub fn truststore_dir(&self) -> PathBuf {
        self.root.join("truststore")
    }
}

/// Executable name of a plugin: `notation-<plugin_name>[.exe]`
pub fn plugin_binary_name(plugin_name: &str, platform: Platform) -> String {
    platform.binary_name(&format!("{}-{}", PLUGIN_BINARY_PREFIX, plugin_name))
}
