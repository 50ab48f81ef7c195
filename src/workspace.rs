//! Ephemeral packaging workspace.
//!
//! Every pipeline run owns a uniquely-named temporary directory holding all
//! intermediate artifacts under fixed names. The directory is removed on every
//! exit path: `Drop` covers success and failure, and a process-wide registry
//! lets the interrupt watcher tear down workspaces that are still live when
//! the user hits Ctrl-C. Removal is what keeps the leaf private key from
//! outliving the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::TempDir;

use crate::config::PackagingRequest;
use crate::error::Result;

pub const CA_CERT: &str = "ca.crt";
pub const CA_KEY: &str = "ca.key";
pub const CONTENT: &str = "content.html";
pub const LEAF_KEY: &str = "sxg.key";
pub const LEAF_CSR: &str = "sxg.csr";
pub const LEAF_CERT: &str = "sxg.crt";
pub const EXTENSION_CONFIG: &str = "sxg_ext.cnf";
pub const OCSP_LEDGER: &str = "index.txt";
pub const OCSP_REQUEST: &str = "req.der";
pub const OCSP_RESPONSE: &str = "ocsp.der";
pub const CERT_CHAIN: &str = "cert.cbor";

static ACTIVE_WORKSPACES: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

/// Exclusively-owned scratch directory for one packaging run.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace and materialize copies of the CA certificate,
    /// CA key, and HTML content under their fixed names.
    pub fn create(request: &PackagingRequest) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("sxg_pack_").tempdir()?;
        let workspace = Self { dir };

        if let Ok(mut active) = ACTIVE_WORKSPACES.lock() {
            active.push(workspace.root().to_path_buf());
        }

        workspace.import(&request.ca_crt, CA_CERT)?;
        workspace.import(&request.ca_key, CA_KEY)?;
        workspace.import(&request.html, CONTENT)?;
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Copy an external file into the workspace verbatim.
    pub fn import(&self, source: &Path, name: &str) -> Result<()> {
        fs::copy(source, self.path(name))?;
        Ok(())
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.path(name))?)
    }

    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        Ok(fs::write(self.path(name), bytes)?)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Ok(mut active) = ACTIVE_WORKSPACES.lock() {
            active.retain(|path| path != self.dir.path());
        }
    }
}

/// Remove every workspace still registered as live.
///
/// Called from the interrupt watcher, where `Drop` will not run before the
/// process exits.
pub fn remove_registered() {
    if let Ok(active) = ACTIVE_WORKSPACES.lock() {
        for path in active.iter() {
            let _ = fs::remove_dir_all(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_inputs(dir: &Path) -> PackagingRequest {
        let ca_crt = dir.join("ca.crt");
        let ca_key = dir.join("ca.key");
        let html = dir.join("index.html");
        fs::write(&ca_crt, b"cert bytes").unwrap();
        fs::write(&ca_key, b"key bytes").unwrap();
        fs::write(&html, b"<html></html>").unwrap();

        PackagingRequest {
            ca_crt,
            ca_key,
            html,
            sxg_domain: "example.com".to_string(),
            sxg_uri: "https://example.com/".to_string(),
            cert_url: "https://localhost/cert.cbor".to_string(),
            validity_url: "https://example.com/resource.validity".to_string(),
            out_dir: dir.join("output"),
            out_sxg: "index.sxg".to_string(),
            validity_days: 1,
            sxg_key: None,
            sxg_crt: None,
        }
    }

    #[test]
    fn test_create_copies_inputs_under_fixed_names() {
        let inputs = tempfile::tempdir().unwrap();
        let request = request_with_inputs(inputs.path());

        let workspace = Workspace::create(&request).unwrap();
        assert_eq!(workspace.read(CA_CERT).unwrap(), b"cert bytes");
        assert_eq!(workspace.read(CA_KEY).unwrap(), b"key bytes");
        assert_eq!(workspace.read(CONTENT).unwrap(), b"<html></html>");
    }

    #[test]
    fn test_workspace_removed_on_drop() {
        let inputs = tempfile::tempdir().unwrap();
        let request = request_with_inputs(inputs.path());

        let root = {
            let workspace = Workspace::create(&request).unwrap();
            workspace.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_workspaces_never_collide() {
        let inputs = tempfile::tempdir().unwrap();
        let request = request_with_inputs(inputs.path());

        let first = Workspace::create(&request).unwrap();
        let second = Workspace::create(&request).unwrap();
        assert_ne!(first.root(), second.root());
    }

    #[test]
    fn test_unreadable_input_is_an_error() {
        let inputs = tempfile::tempdir().unwrap();
        let mut request = request_with_inputs(inputs.path());
        request.html = inputs.path().join("missing.html");

        assert!(Workspace::create(&request).is_err());
    }
}
