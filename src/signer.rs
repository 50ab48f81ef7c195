//! Signing service seam.
//!
//! The pipeline delegates every cryptographic signing and wire-encoding
//! operation through this trait; it never cares whether an implementation
//! wraps a native crypto library or invokes subprocesses. Production use goes
//! through [`crate::local_signer::LocalSigner`]; tests substitute recording
//! stubs.

use crate::error::Result;
use crate::leaf_certificate::ExtensionConfig;
use crate::runner::CommandRunner;
use crate::workspace::Workspace;

/// External executables the production signer depends on.
pub const REQUIRED_COMMANDS: &[&str] = &["openssl", "gen-certurl", "gen-signedexchange"];

/// Inputs the exchange encoder needs beyond the workspace artifacts.
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    pub uri: String,
    pub cert_url: String,
    pub validity_url: String,
    pub out_sxg: String,
}

/// Signing and encoding operations the pipeline delegates.
///
/// Every method works against the fixed file names inside the workspace; the
/// pipeline has already written whatever inputs the operation consumes.
pub trait SigningService {
    /// Write a fresh EC P-256 private key to `sxg.key`.
    fn generate_key(&self, workspace: &Workspace) -> Result<()>;

    /// Build a CSR for the provisioned key and obtain a CA-signed leaf
    /// certificate at `sxg.crt`, carrying the given extension set and valid
    /// for `validity_days` from now.
    fn issue_certificate(
        &self,
        workspace: &Workspace,
        extensions: &ExtensionConfig,
        validity_days: u32,
    ) -> Result<()>;

    /// Produce a nonce-free OCSP request (`req.der`) and a CA-signed response
    /// (`ocsp.der`) for the ledger already written to `index.txt`, bounded to
    /// `response_days`.
    fn sign_ocsp_response(&self, workspace: &Workspace, response_days: u32) -> Result<()>;

    /// Combine leaf certificate and OCSP response into a CBOR byte stream.
    /// The returned bytes are opaque to the pipeline.
    fn encode_cert_chain(&self, workspace: &Workspace) -> Result<Vec<u8>>;

    /// Build the final signed-exchange file inside the workspace under the
    /// requested output name.
    fn encode_exchange(&self, workspace: &Workspace, exchange: &ExchangeRequest) -> Result<()>;
}

/// Check that every required external tool is present.
///
/// Runs once, up front, before any workspace or file I/O.
pub fn require_tools() -> Result<()> {
    CommandRunner::require(REQUIRED_COMMANDS)
}
