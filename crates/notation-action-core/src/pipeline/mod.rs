//! The three entry points: setup, sign, verify
//!
//! Each one runs strictly in sequence and stops at the first failure.
//! Collaborators (downloader, tool runner, directory layout) are passed in.

mod setup;
mod sign;
mod verify;

pub use setup::{setup, SetupReport};
pub use sign::{sign, PluginInstall, SignReport};
pub use verify::verify;
