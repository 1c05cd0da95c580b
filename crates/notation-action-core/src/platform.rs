//! Host platform and architecture detection
//!
//! Notation releases are published for a fixed set of platforms and
//! architectures. Host identifiers are normalized into that set here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// Operating systems Notation publishes releases for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
}

/// CPU architectures Notation publishes releases for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
}

/// Archive format of a release asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl Platform {
    /// Platform of the running host
    pub fn current() -> Result<Self, ActionError> {
        std::env::consts::OS.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Windows => "windows",
        }
    }

    /// Archive format used by releases for this platform.
    /// Never inferred from response content.
    pub fn archive_kind(&self) -> ArchiveKind {
        match self {
            Platform::Windows => ArchiveKind::Zip,
            Platform::Linux | Platform::Darwin => ArchiveKind::TarGz,
        }
    }

    pub fn exe_suffix(&self) -> &'static str {
        match self {
            Platform::Windows => ".exe",
            Platform::Linux | Platform::Darwin => "",
        }
    }

    /// File name of an executable on this platform
    pub fn binary_name(&self, stem: &str) -> String {
        format!("{}{}", stem, self.exe_suffix())
    }
}

impl FromStr for Platform {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "darwin" | "macos" => Ok(Platform::Darwin),
            "windows" | "win32" => Ok(Platform::Windows),
            _ => Err(ActionError::UnsupportedPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Arch {
    /// Architecture of the running host
    pub fn current() -> Result<Self, ActionError> {
        std::env::consts::ARCH.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl FromStr for Arch {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "x64" | "amd64" => Ok(Arch::Amd64),
            "aarch64" | "arm64" => Ok(Arch::Arm64),
            _ => Err(ActionError::UnsupportedArchitecture(s.to_string())),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ArchiveKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::Zip => "zip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_host_identifiers() {
        assert_eq!("macos".parse::<Platform>().unwrap(), Platform::Darwin);
        assert_eq!("win32".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!("linux".parse::<Platform>().unwrap(), Platform::Linux);
        assert_eq!("x86_64".parse::<Arch>().unwrap(), Arch::Amd64);
        assert_eq!("aarch64".parse::<Arch>().unwrap(), Arch::Arm64);
    }

    #[test]
    fn rejects_unknown_hosts() {
        assert!(matches!(
            "freebsd".parse::<Platform>(),
            Err(ActionError::UnsupportedPlatform(p)) if p == "freebsd"
        ));
        assert!(matches!(
            "riscv64".parse::<Arch>(),
            Err(ActionError::UnsupportedArchitecture(a)) if a == "riscv64"
        ));
    }

    #[test]
    fn archive_kind_follows_platform() {
        assert_eq!(Platform::Windows.archive_kind(), ArchiveKind::Zip);
        assert_eq!(Platform::Linux.archive_kind(), ArchiveKind::TarGz);
        assert_eq!(Platform::Darwin.archive_kind(), ArchiveKind::TarGz);
        assert_eq!(Platform::Windows.binary_name("notation"), "notation.exe");
        assert_eq!(Platform::Linux.binary_name("notation"), "notation");
    }
}
