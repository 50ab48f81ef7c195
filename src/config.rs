//! Packaging request configuration.
//!
//! A [`PackagingRequest`] is built once from parsed CLI arguments and is
//! read-only for the rest of the run. URI and URL fields that the caller
//! leaves unset derive deterministically from the SXG domain.

use std::fs::File;
use std::path::PathBuf;

use url::Url;

use crate::cli::PackArgs;
use crate::error::{PackagerError, Result};

pub const DEFAULT_CERT_PATH: &str = "/cert.cbor";
pub const DEFAULT_OUT_DIR: &str = "./output";
pub const DEFAULT_OUT_SXG: &str = "index.sxg";
pub const DEFAULT_VALIDITY_DAYS: u32 = 1;

/// Immutable description of one packaging run.
#[derive(Debug, Clone)]
pub struct PackagingRequest {
    pub ca_crt: PathBuf,
    pub ca_key: PathBuf,
    pub html: PathBuf,
    pub sxg_domain: String,
    pub sxg_uri: String,
    pub cert_url: String,
    pub validity_url: String,
    pub out_dir: PathBuf,
    pub out_sxg: String,
    pub validity_days: u32,
    pub sxg_key: Option<PathBuf>,
    pub sxg_crt: Option<PathBuf>,
}

impl PackagingRequest {
    /// Build a request from parsed arguments, filling in the derived
    /// defaults: `https://{domain}/` for the exchange URI,
    /// `https://{domain}/resource.validity` for the validity URL, and
    /// `https://{certurl_host}{certurl_path}` for the certificate URL.
    pub fn from_args(args: PackArgs) -> Self {
        let sxg_uri = args
            .sxg_uri
            .unwrap_or_else(|| format!("https://{}/", args.sxg_domain));
        let validity_url = args
            .validity_url
            .unwrap_or_else(|| format!("https://{}/resource.validity", args.sxg_domain));
        let cert_url = format!("https://{}{}", args.certurl_host, args.certurl_path);

        Self {
            ca_crt: args.ca_crt,
            ca_key: args.ca_key,
            html: args.html,
            sxg_domain: args.sxg_domain,
            sxg_uri,
            cert_url,
            validity_url,
            out_dir: args.out_dir,
            out_sxg: args.out_sxg,
            validity_days: args.validity_days,
            sxg_key: args.sxg_key,
            sxg_crt: args.sxg_crt,
        }
    }

    /// Validate the request before any workspace is created.
    ///
    /// Checks that every input file is readable, the validity period is at
    /// least one day, and all embedded URLs are absolute HTTPS URLs.
    pub fn validate(&self) -> Result<()> {
        if self.validity_days == 0 {
            return Err(PackagerError::InputValidation(
                "validity period must be at least one day".to_string(),
            ));
        }

        let mut inputs = vec![
            ("CA certificate", &self.ca_crt),
            ("CA key", &self.ca_key),
            ("HTML content", &self.html),
        ];
        if let Some(key) = &self.sxg_key {
            inputs.push(("leaf key", key));
        }
        if let Some(cert) = &self.sxg_crt {
            inputs.push(("leaf certificate", cert));
        }
        for (label, path) in inputs {
            File::open(path).map_err(|e| {
                PackagerError::InputValidation(format!(
                    "{label} {} is not readable: {e}",
                    path.display()
                ))
            })?;
        }

        for raw in [&self.sxg_uri, &self.cert_url, &self.validity_url] {
            require_https(raw)?;
        }
        Ok(())
    }
}

fn require_https(raw: &str) -> Result<()> {
    let parsed = Url::parse(raw)
        .map_err(|e| PackagerError::InputValidation(format!("invalid URL `{raw}`: {e}")))?;
    if parsed.scheme() != "https" {
        return Err(PackagerError::InputValidation(format!(
            "URL `{raw}` must be an absolute https URL"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dir: &std::path::Path) -> PackArgs {
        PackArgs {
            ca_crt: dir.join("ca.crt"),
            ca_key: dir.join("ca.key"),
            html: dir.join("index.html"),
            sxg_domain: "example.com".to_string(),
            certurl_host: "localhost".to_string(),
            certurl_path: DEFAULT_CERT_PATH.to_string(),
            sxg_uri: None,
            validity_url: None,
            validity_days: DEFAULT_VALIDITY_DAYS,
            sxg_key: None,
            sxg_crt: None,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            out_sxg: DEFAULT_OUT_SXG.to_string(),
            json: false,
        }
    }

    fn write_inputs(dir: &std::path::Path) {
        std::fs::write(dir.join("ca.crt"), b"crt").unwrap();
        std::fs::write(dir.join("ca.key"), b"key").unwrap();
        std::fs::write(dir.join("index.html"), b"<html></html>").unwrap();
    }

    #[test]
    fn test_urls_derive_from_domain() {
        let dir = tempfile::tempdir().unwrap();
        let request = PackagingRequest::from_args(args(dir.path()));

        assert_eq!(request.sxg_uri, "https://example.com/");
        assert_eq!(request.validity_url, "https://example.com/resource.validity");
        assert_eq!(request.cert_url, "https://localhost/cert.cbor");
    }

    #[test]
    fn test_explicit_urls_win_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = args(dir.path());
        raw.sxg_uri = Some("https://example.com/page.html".to_string());
        raw.certurl_path = "/chain/cert.cbor".to_string();

        let request = PackagingRequest::from_args(raw);
        assert_eq!(request.sxg_uri, "https://example.com/page.html");
        assert_eq!(request.cert_url, "https://localhost/chain/cert.cbor");
    }

    #[test]
    fn test_missing_html_is_input_validation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ca.crt"), b"crt").unwrap();
        std::fs::write(dir.path().join("ca.key"), b"key").unwrap();

        let request = PackagingRequest::from_args(args(dir.path()));
        match request.validate() {
            Err(PackagerError::InputValidation(msg)) => assert!(msg.contains("HTML content")),
            other => panic!("expected InputValidation, got {other:?}"),
        }
    }

    #[test]
    fn test_non_https_uri_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());

        let mut raw = args(dir.path());
        raw.sxg_uri = Some("http://example.com/".to_string());
        let request = PackagingRequest::from_args(raw);
        assert!(matches!(
            request.validate(),
            Err(PackagerError::InputValidation(_))
        ));
    }

    #[test]
    fn test_zero_validity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());

        let mut raw = args(dir.path());
        raw.validity_days = 0;
        let request = PackagingRequest::from_args(raw);
        assert!(matches!(
            request.validate(),
            Err(PackagerError::InputValidation(_))
        ));
    }

    #[test]
    fn test_valid_request_passes() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());

        let request = PackagingRequest::from_args(args(dir.path()));
        request.validate().unwrap();
    }
}
