//! Trust store discovery
//!
//! Layout: `<trust_store>/x509/<store_type>/<store_name>/<certificate files>`.
//! Only one level of each is read; nothing is recursed into.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ActionError, ActionResult};

/// Directory under the trust store root holding X.509 stores
pub const X509_DIR: &str = "x509";

/// One named certificate store, e.g. `ca/acme-rockets`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertStore {
    pub store_type: String,
    pub name: String,
    pub certificates: Vec<PathBuf>,
}

/// Find every store under `<root>/x509`, sorted by type then name.
///
/// Stores with no certificate files are skipped.
pub fn discover(root: &Path) -> ActionResult<Vec<CertStore>> {
    let x509 = root.join(X509_DIR);
    if !x509.is_dir() {
        return Err(ActionError::config(format!(
            "cannot find trust store dir: {}",
            x509.display()
        )));
    }

    let mut stores = Vec::new();
    for type_dir in subdirs(&x509)? {
        let store_type = file_name(&type_dir);
        for store_dir in subdirs(&type_dir)? {
            let name = file_name(&store_dir);
            let certificates = files(&store_dir)?;
            if certificates.is_empty() {
                warn!("trust store {}/{} has no certificates, skipping", store_type, name);
                continue;
            }
            debug!(
                "Found trust store {}/{} with {} certificate(s)",
                store_type,
                name,
                certificates.len()
            );
            stores.push(CertStore {
                store_type: store_type.clone(),
                name,
                certificates,
            });
        }
    }
    Ok(stores)
}

fn subdirs(dir: &Path) -> ActionResult<Vec<PathBuf>> {
    list(dir, |file_type| file_type.is_dir())
}

fn files(dir: &Path) -> ActionResult<Vec<PathBuf>> {
    list(dir, |file_type| !file_type.is_dir())
}

fn list(dir: &Path, keep: impl Fn(&fs::FileType) -> bool) -> ActionResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| ActionError::io("read trust store", dir, e))?;

    let mut paths = Vec::new();
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if keep(&file_type) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
