//! Production signing service.
//!
//! Key generation and certificate issuance run natively through the
//! `openssl` crate. OCSP signing and both wire encoders invoke the external
//! `openssl`, `gen-certurl`, and `gen-signedexchange` executables inside the
//! workspace, so every artifact they read or write stays under the fixed
//! workspace names.
//!
//! Certificate issuance consumes the rendered extension config from the
//! workspace and refuses to sign if it disagrees with the extension set it
//! is asked to apply, so the `sxg_ext.cnf` artifact and the issued
//! certificate cannot drift apart.

use openssl::pkey::PKey;
use openssl::x509::X509;

use crate::error::{PackagerError, Result};
use crate::leaf_certificate::{self, ExtensionConfig};
use crate::runner::CommandRunner;
use crate::signer::{ExchangeRequest, SigningService};
use crate::workspace::{self, Workspace};

pub struct LocalSigner;

impl SigningService for LocalSigner {
    fn generate_key(&self, ws: &Workspace) -> Result<()> {
        let key = leaf_certificate::generate_p256_key()?;
        let pem = key
            .private_key_to_pem_pkcs8()
            .map_err(|e| PackagerError::key_generation(format!("failed to encode key: {e}")))?;
        ws.write(workspace::LEAF_KEY, &pem)
    }

    fn issue_certificate(
        &self,
        ws: &Workspace,
        extensions: &ExtensionConfig,
        validity_days: u32,
    ) -> Result<()> {
        let rendered = ws.read(workspace::EXTENSION_CONFIG)?;
        if rendered != extensions.render().as_bytes() {
            return Err(PackagerError::certificate_issuance(
                "workspace extension config does not match the requested extension set",
            ));
        }

        let leaf_key = PKey::private_key_from_pem(&ws.read(workspace::LEAF_KEY)?)
            .map_err(|e| PackagerError::certificate_issuance(format!("failed to load leaf key: {e}")))?;
        let ca_cert = X509::from_pem(&ws.read(workspace::CA_CERT)?).map_err(|e| {
            PackagerError::certificate_issuance(format!("failed to load CA certificate: {e}"))
        })?;
        let ca_key = PKey::private_key_from_pem(&ws.read(workspace::CA_KEY)?)
            .map_err(|e| PackagerError::certificate_issuance(format!("failed to load CA key: {e}")))?;

        let csr = leaf_certificate::build_csr(extensions.domain(), &leaf_key)?;
        let csr_pem = csr
            .to_pem()
            .map_err(|e| PackagerError::certificate_issuance(format!("failed to encode CSR: {e}")))?;
        ws.write(workspace::LEAF_CSR, &csr_pem)?;

        let cert = leaf_certificate::issue(&csr, extensions, &ca_cert, &ca_key, validity_days)?;
        let cert_pem = cert.to_pem().map_err(|e| {
            PackagerError::certificate_issuance(format!("failed to encode certificate: {e}"))
        })?;
        ws.write(workspace::LEAF_CERT, &cert_pem)
    }

    fn sign_ocsp_response(&self, ws: &Workspace, response_days: u32) -> Result<()> {
        CommandRunner::run(
            "openssl",
            &[
                "ocsp",
                "-issuer",
                workspace::CA_CERT,
                "-cert",
                workspace::LEAF_CERT,
                "-reqout",
                workspace::OCSP_REQUEST,
                "-no_nonce",
            ],
            ws.root(),
        )
        .map_err(PackagerError::OcspGeneration)?;

        let ndays = response_days.to_string();
        CommandRunner::run(
            "openssl",
            &[
                "ocsp",
                "-index",
                workspace::OCSP_LEDGER,
                "-rsigner",
                workspace::CA_CERT,
                "-rkey",
                workspace::CA_KEY,
                "-CA",
                workspace::CA_CERT,
                "-reqin",
                workspace::OCSP_REQUEST,
                "-respout",
                workspace::OCSP_RESPONSE,
                "-ndays",
                &ndays,
            ],
            ws.root(),
        )
        .map_err(PackagerError::OcspGeneration)
    }

    fn encode_cert_chain(&self, ws: &Workspace) -> Result<Vec<u8>> {
        CommandRunner::check_output(
            "gen-certurl",
            &[
                "-pem",
                workspace::LEAF_CERT,
                "-ocsp",
                workspace::OCSP_RESPONSE,
            ],
            ws.root(),
        )
        .map_err(PackagerError::Encoding)
    }

    fn encode_exchange(&self, ws: &Workspace, exchange: &ExchangeRequest) -> Result<()> {
        CommandRunner::run(
            "gen-signedexchange",
            &[
                "-uri",
                &exchange.uri,
                "-content",
                workspace::CONTENT,
                "-certificate",
                workspace::LEAF_CERT,
                "-privateKey",
                workspace::LEAF_KEY,
                "-certUrl",
                &exchange.cert_url,
                "-validityUrl",
                &exchange.validity_url,
                "-o",
                &exchange.out_sxg,
            ],
            ws.root(),
        )
        .map_err(PackagerError::Encoding)
    }
}
