//! sxg-pack - Signed HTTP Exchange Packager
//!
//! Packages a static HTML resource into a Signed HTTP Exchange (SXG): a
//! self-contained artifact proving, via a certificate chain and a detached
//! signature, that specific bytes were served under a specific origin at a
//! specific time.
//!
//! # Pipeline
//!
//! One run walks an isolated ephemeral workspace through seven ordered
//! stages:
//!
//! ```text
//! Workspace Preparer   → ca.crt, ca.key, content.html
//!   Key Provisioner    → sxg.key            (fresh P-256 or caller-supplied)
//!   Certificate Issuer → sxg.csr, sxg.crt   (CA-signed, SXG extension OID)
//!   OCSP Attestor      → index.txt, req.der, ocsp.der
//!   Cert-Chain Encoder → cert.cbor          (external)
//!   Exchange Builder   → index.sxg          (external)
//!   Output Finalizer   → copies artifacts into the output directory
//! ```
//!
//! The workspace is destroyed on every exit path, including failures and
//! interrupts, so leaf key material never outlives the run.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use sxg_pack::config::PackagingRequest;
//! use sxg_pack::local_signer::LocalSigner;
//! use sxg_pack::packager::SxgPackager;
//!
//! fn main() -> Result<(), sxg_pack::error::PackagerError> {
//!     let request = PackagingRequest {
//!         ca_crt: PathBuf::from("ca.crt"),
//!         ca_key: PathBuf::from("ca.key"),
//!         html: PathBuf::from("index.html"),
//!         sxg_domain: "example.com".to_string(),
//!         sxg_uri: "https://example.com/".to_string(),
//!         cert_url: "https://localhost/cert.cbor".to_string(),
//!         validity_url: "https://example.com/resource.validity".to_string(),
//!         out_dir: PathBuf::from("./output"),
//!         out_sxg: "index.sxg".to_string(),
//!         validity_days: 1,
//!         sxg_key: None,
//!         sxg_crt: None,
//!     };
//!     request.validate()?;
//!
//!     let summary = SxgPackager::new(request, LocalSigner).package()?;
//!     for file in &summary.files {
//!         println!("{}", file.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`config`]: the immutable [`config::PackagingRequest`] with derived
//!   URI/URL defaults and input validation
//! - [`workspace`]: the ephemeral, exclusively-owned scratch directory and
//!   its fixed artifact names
//! - [`leaf_certificate`]: CSR construction and CA-signed leaf issuance with
//!   the SXG extension set
//! - [`ocsp`]: leaf identity extraction, the certificate-status ledger, and
//!   ASN.1 UTCTime rendering
//! - [`signer`]: the [`signer::SigningService`] seam between the pipeline
//!   and signing/encoding capabilities
//! - [`local_signer`]: the production implementation (native `openssl`
//!   crate plus the `openssl`, `gen-certurl`, `gen-signedexchange` tools)
//! - [`packager`]: pipeline orchestration and output finalization
//! - [`server`]: HTTP(S) responder for `cert.cbor` and the `.sxg` file
//!
//! # Error Handling
//!
//! Every pipeline operation returns [`error::PackagerError`]; a failing
//! external command keeps its exit code so the binary can propagate it.

pub mod cli;
pub mod config;
pub mod error;
pub mod leaf_certificate;
pub mod local_signer;
pub mod ocsp;
pub mod packager;
pub mod runner;
pub mod server;
pub mod signer;
pub mod workspace;
