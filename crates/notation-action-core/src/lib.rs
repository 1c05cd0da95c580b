//! notation-action-core - install, sign and verify with the Notation CLI
//!
//! - `setup`: resolve a Notation CLI release, download it, verify its
//!   SHA-256, extract it and install the binary
//! - `sign`: install a signing plugin and sign artifact references
//! - `verify`: import trust policy and trust store, verify references
//!
//! All cryptography lives in the external `notation` binary; this crate only
//! gets it onto disk and drives it.

pub mod checksum;
pub mod config;
pub mod download;
pub mod error;
pub mod install;
pub mod manifest;
pub mod paths;
pub mod pipeline;
pub mod platform;
pub mod tool;
pub mod truststore;

pub use config::{SetupConfig, SetupInputs, SignConfig, SignInputs, VerifyConfig, VerifyInputs};
pub use download::{Downloader, HttpDownloader};
pub use error::{ActionError, ActionResult};
pub use paths::NotationLayout;
pub use platform::{Arch, Platform};
pub use tool::{NotationCli, ToolRunner};
