//! SXG packaging pipeline.
//!
//! Runs the stages strictly forward: workspace preparation, key
//! provisioning, leaf certificate issuance, OCSP attestation, cert-chain
//! encoding, exchange encoding, and finalization. Each stage's output is a
//! named workspace file consumed by name downstream, so the pipeline is a
//! linear chain with no backward dependency. The first stage error aborts
//! the run; the finalizer only executes after every prior stage succeeded,
//! which is what makes the output directory all-or-nothing.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::PackagingRequest;
use crate::error::{PackagerError, Result};
use crate::leaf_certificate::ExtensionConfig;
use crate::ocsp::{LeafIdentity, LedgerEntry};
use crate::signer::{ExchangeRequest, SigningService};
use crate::workspace::{self, Workspace};

/// Final artifact locations reported after a successful run.
#[derive(Debug, Serialize)]
pub struct PackagingSummary {
    pub out_dir: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Drives one packaging run against a signing service.
pub struct SxgPackager<S: SigningService> {
    request: PackagingRequest,
    signer: S,
    issuance_time: DateTime<Utc>,
}

impl<S: SigningService> SxgPackager<S> {
    pub fn new(request: PackagingRequest, signer: S) -> Self {
        Self {
            request,
            signer,
            issuance_time: Utc::now(),
        }
    }

    /// Pin the issuance time instead of sampling the clock. The expiry of
    /// the OCSP ledger entry is computed from this instant.
    pub fn with_issuance_time(mut self, at: DateTime<Utc>) -> Self {
        self.issuance_time = at;
        self
    }

    /// Execute the full packaging workflow.
    ///
    /// The workspace is torn down on every return path, success or failure.
    pub fn package(&self) -> Result<PackagingSummary> {
        info!(domain = %self.request.sxg_domain, "packaging signed exchange");

        let ws = Workspace::create(&self.request)?;
        self.provision_key(&ws)?;
        self.provision_certificate(&ws)?;
        self.attest_ocsp(&ws)?;
        self.encode_cert_chain(&ws)?;
        self.encode_exchange(&ws)?;
        self.finalize(&ws)
    }

    fn provision_key(&self, ws: &Workspace) -> Result<()> {
        if let Some(key) = &self.request.sxg_key {
            info!(path = %key.display(), "using existing leaf key");
            return ws.import(key, workspace::LEAF_KEY);
        }
        info!("generating fresh EC P-256 leaf key");
        self.signer.generate_key(ws)
    }

    fn provision_certificate(&self, ws: &Workspace) -> Result<()> {
        if let Some(cert) = &self.request.sxg_crt {
            info!(path = %cert.display(), "using existing leaf certificate");
            return ws.import(cert, workspace::LEAF_CERT);
        }

        // Issuance input for the signer: a subprocess-backed implementation
        // feeds it to `openssl x509 -req -extfile`, the native one checks it
        // against the extension set it applies.
        let extensions = ExtensionConfig::new(&self.request.sxg_domain);
        ws.write(workspace::EXTENSION_CONFIG, extensions.render().as_bytes())?;

        info!(
            domain = %self.request.sxg_domain,
            days = self.request.validity_days,
            "issuing leaf certificate"
        );
        self.signer
            .issue_certificate(ws, &extensions, self.request.validity_days)
    }

    fn attest_ocsp(&self, ws: &Workspace) -> Result<()> {
        let cert_pem = ws.read(workspace::LEAF_CERT)?;
        let requested_expiry =
            self.issuance_time + Duration::days(i64::from(self.request.validity_days));
        let identity =
            LeafIdentity::from_certificate(&cert_pem, &self.request.sxg_domain, requested_expiry)?;

        let ledger = LedgerEntry::new(&identity);
        ws.write(workspace::OCSP_LEDGER, ledger.render().as_bytes())?;

        let response_days = identity.response_days(self.issuance_time);
        info!(serial = %identity.serial, days = response_days, "requesting OCSP response");
        self.signer.sign_ocsp_response(ws, response_days)
    }

    fn encode_cert_chain(&self, ws: &Workspace) -> Result<()> {
        info!("encoding certificate chain");
        let cbor = self.signer.encode_cert_chain(ws)?;
        if cbor.is_empty() {
            return Err(PackagerError::encoding(
                "certificate chain encoder produced no output",
            ));
        }
        ws.write(workspace::CERT_CHAIN, &cbor)
    }

    fn encode_exchange(&self, ws: &Workspace) -> Result<()> {
        let exchange = ExchangeRequest {
            uri: self.request.sxg_uri.clone(),
            cert_url: self.request.cert_url.clone(),
            validity_url: self.request.validity_url.clone(),
            out_sxg: self.request.out_sxg.clone(),
        };
        info!(uri = %exchange.uri, cert_url = %exchange.cert_url, "building signed exchange");
        self.signer.encode_exchange(ws, &exchange)?;

        let sxg = ws.read(&self.request.out_sxg).map_err(|_| {
            PackagerError::encoding("exchange encoder produced no output file")
        })?;
        if sxg.is_empty() {
            return Err(PackagerError::encoding("exchange encoder produced no output"));
        }
        Ok(())
    }

    fn finalize(&self, ws: &Workspace) -> Result<PackagingSummary> {
        info!(out_dir = %self.request.out_dir.display(), "copying outputs");
        fs::create_dir_all(&self.request.out_dir)?;

        let names = [
            workspace::LEAF_KEY,
            workspace::LEAF_CERT,
            workspace::OCSP_RESPONSE,
            workspace::CERT_CHAIN,
            self.request.out_sxg.as_str(),
        ];
        let mut files = Vec::with_capacity(names.len());
        for name in names {
            let dest = self.request.out_dir.join(name);
            fs::copy(ws.path(name), &dest)?;
            files.push(dest);
        }

        Ok(PackagingSummary {
            out_dir: self.request.out_dir.clone(),
            files,
        })
    }
}
