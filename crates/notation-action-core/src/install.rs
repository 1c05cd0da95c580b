//! Checksum-gated archive installer
//!
//! download -> verify SHA-256 -> extract -> locate binary -> place -> chmod.
//! Every step is awaited and checked before the next one starts, and nothing
//! is extracted from an archive that failed verification.
//!
//! The binary is only taken from the archive root or its `bin/` directory.
//! It is staged next to its destination and renamed into place once it is
//! executable, so an interrupted install never leaves a half-written file
//! under the final name.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::checksum;
use crate::download::Downloader;
use crate::error::{ActionError, ActionResult};
use crate::manifest::DownloadSource;
use crate::platform::ArchiveKind;

/// Permission bits applied to installed executables
pub const EXECUTABLE_MODE: u32 = 0o755;

/// The one subdirectory of an archive we look into for the binary
const BIN_DIR: &str = "bin";

/// Where an executable ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    pub binary_name: String,
    pub dest_dir: PathBuf,
    pub mode: u32,
}

/// Result of an install request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Binary was already present; nothing was downloaded
    AlreadyInstalled(PathBuf),
    Installed(PathBuf),
}

impl InstallTarget {
    pub fn new(binary_name: impl Into<String>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary_name: binary_name.into(),
            dest_dir: dest_dir.into(),
            mode: EXECUTABLE_MODE,
        }
    }

    pub fn dest_path(&self) -> PathBuf {
        self.dest_dir.join(&self.binary_name)
    }

    /// A regular file under the final name that we can execute
    pub fn is_installed(&self) -> bool {
        is_executable_file(&self.dest_path())
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

impl InstallOutcome {
    pub fn path(&self) -> &Path {
        match self {
            InstallOutcome::AlreadyInstalled(path) | InstallOutcome::Installed(path) => path,
        }
    }
}

/// Installs a binary out of a verified release archive
pub struct ArchiveInstaller<'a> {
    downloader: &'a dyn Downloader,
}

impl<'a> ArchiveInstaller<'a> {
    pub fn new(downloader: &'a dyn Downloader) -> Self {
        Self { downloader }
    }

    /// Install `target` from `source`, skipping all work if it already exists.
    ///
    /// `subject` names the download in logs and checksum errors.
    pub async fn install(
        &self,
        source: &DownloadSource,
        kind: ArchiveKind,
        target: &InstallTarget,
        subject: &str,
    ) -> ActionResult<InstallOutcome> {
        let dest_path = target.dest_path();
        if target.is_installed() {
            info!("{} is already installed at {:?}", subject, dest_path);
            return Ok(InstallOutcome::AlreadyInstalled(dest_path));
        }

        let scratch = tempfile::Builder::new()
            .prefix("notation-action-")
            .tempdir()
            .map_err(|e| ActionError::io("create scratch directory", std::env::temp_dir(), e))?;
        let download_dir = scratch.path().join("download");
        let extract_dir = scratch.path().join("extracted");
        create_dir(&download_dir).await?;

        info!("Downloading {}", subject);
        let archive = self.downloader.download(&source.url, &download_dir).await?;

        checksum::verify_file(&archive, &source.checksum, subject).await?;
        info!("Successfully verified download checksum");

        create_dir(&extract_dir).await?;
        extract_archive_blocking(archive, kind, extract_dir.clone()).await?;

        let binary = locate_binary(&extract_dir, &target.binary_name)?;
        debug!("Found {} at {:?}", target.binary_name, binary);

        let installed = place_binary(&binary, target).await?;
        info!("Installed {} to {:?}", subject, installed);
        Ok(InstallOutcome::Installed(installed))
    }
}

async fn create_dir(path: &Path) -> ActionResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| ActionError::io("create directory", path, e))
}

async fn extract_archive_blocking(archive: PathBuf, kind: ArchiveKind, dest: PathBuf) -> ActionResult<()> {
    let archive_for_err = archive.clone();
    tokio::task::spawn_blocking(move || extract_archive(&archive, kind, &dest))
        .await
        .map_err(|e| ActionError::Extraction {
            archive: archive_for_err,
            reason: e.to_string(),
        })?
}

/// Extract a tarball or zip into `dest`
pub fn extract_archive(archive: &Path, kind: ArchiveKind, dest: &Path) -> ActionResult<()> {
    let extraction_err = |reason: String| ActionError::Extraction {
        archive: archive.to_path_buf(),
        reason,
    };

    let file = File::open(archive).map_err(|e| ActionError::io("open", archive, e))?;
    match kind {
        ArchiveKind::TarGz => {
            let mut tarball = tar::Archive::new(GzDecoder::new(file));
            tarball
                .unpack(dest)
                .map_err(|e| extraction_err(e.to_string()))?;
        }
        ArchiveKind::Zip => {
            let mut zipball =
                zip::ZipArchive::new(file).map_err(|e| extraction_err(e.to_string()))?;
            zipball
                .extract(dest)
                .map_err(|e| extraction_err(e.to_string()))?;
        }
    }

    debug!("Extracted {:?} into {:?}", archive, dest);
    Ok(())
}

/// Find `binary_name` at the root of an extracted tree or in its `bin/`
/// directory, preferring the root.
///
/// A missing binary means the archive is not what the user said it was.
pub fn locate_binary(extracted: &Path, binary_name: &str) -> ActionResult<PathBuf> {
    WalkDir::new(extracted)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == binary_name)
        .filter(|entry| entry.depth() == 1 || in_bin_dir(entry.path()))
        .min_by_key(|entry| entry.depth())
        .map(|entry| entry.into_path())
        .ok_or_else(|| ActionError::NameMismatch {
            expected: binary_name.to_string(),
        })
}

fn in_bin_dir(path: &Path) -> bool {
    path.parent()
        .and_then(Path::file_name)
        .is_some_and(|dir| dir == BIN_DIR)
}

/// Copy a binary into the target directory and mark it executable.
///
/// The copy lands in a temporary file in `dest_dir` first; the final name
/// only appears once the contents and mode are complete. The temporary
/// file is removed if any step fails.
pub async fn place_binary(binary: &Path, target: &InstallTarget) -> ActionResult<PathBuf> {
    create_dir(&target.dest_dir).await?;

    let dest = target.dest_path();
    let staged = tempfile::Builder::new()
        .prefix(".notation-action-")
        .tempfile_in(&target.dest_dir)
        .map_err(|e| ActionError::io("create staging file in", &target.dest_dir, e))?;

    tokio::fs::copy(binary, staged.path())
        .await
        .map_err(|e| ActionError::io("copy binary to", staged.path(), e))?;
    set_mode(staged.path(), target.mode).await?;

    staged
        .persist(&dest)
        .map_err(|e| ActionError::io("move binary into place at", &dest, e.error))?;
    Ok(dest)
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> ActionResult<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| ActionError::io("set permissions on", path, e))
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> ActionResult<()> {
    Ok(())
}
