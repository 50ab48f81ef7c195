//! OCSP attestation inputs.
//!
//! The OCSP responder consults a single-entry certificate-status ledger (the
//! classic OpenSSL `index.txt` format) describing exactly the leaf being
//! packaged. This module derives that entry from the certificate that was
//! actually issued or supplied: the serial number is always read back from
//! the certificate bytes, never assumed.
//!
//! Invariant: the attested window never exceeds the certificate's own
//! validity. A caller-supplied certificate that expires before
//! `issuance_time + validity_days` clamps both the ledger expiry and the
//! response window to its `notAfter`.
//!
//! All window arithmetic happens at whole-second granularity, the precision
//! of certificate time. A sub-second issuance timestamp would otherwise make
//! a freshly issued leaf (whose `notAfter` is `floor(now) + N` days) look a
//! fraction of a second shorter-lived than the requested window and truncate
//! the response window to `N - 1` days.

use chrono::{DateTime, SubsecRound, Utc};
use openssl::asn1::Asn1Time;
use openssl::x509::{X509Ref, X509};

use crate::error::{PackagerError, Result};

/// The triple binding certificate, ledger entry, and exchange validity
/// window together. Any mismatch between these artifacts is a pipeline
/// defect, not a user error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafIdentity {
    pub domain: String,
    pub serial: String,
    pub not_after: DateTime<Utc>,
}

impl LeafIdentity {
    /// Derive the identity from the leaf certificate bytes.
    ///
    /// `requested_expiry` is `issuance_time + validity_days`, truncated here
    /// to whole seconds before comparing against the certificate's
    /// second-granular `notAfter`; the effective `not_after` is clamped to
    /// the certificate's own expiry.
    pub fn from_certificate(
        cert_pem: &[u8],
        domain: &str,
        requested_expiry: DateTime<Utc>,
    ) -> Result<Self> {
        let cert = X509::from_pem(cert_pem).map_err(|e| {
            PackagerError::ocsp_generation(format!("failed to parse leaf certificate: {e}"))
        })?;
        let serial = extract_serial(&cert)?;
        let cert_expiry = not_after_timestamp(&cert)?;
        let requested_expiry = requested_expiry.trunc_subsecs(0);

        Ok(Self {
            domain: domain.to_string(),
            serial,
            not_after: requested_expiry.min(cert_expiry),
        })
    }

    /// Whole days the OCSP response may vouch for, measured from issuance.
    ///
    /// `issued_at` is truncated to whole seconds so a fresh leaf issued for
    /// N days yields exactly N; only a certificate that genuinely expires
    /// sooner shortens the window.
    pub fn response_days(&self, issued_at: DateTime<Utc>) -> u32 {
        let days = (self.not_after - issued_at.trunc_subsecs(0)).num_days();
        u32::try_from(days).unwrap_or(0)
    }
}

/// Read the serial number from a certificate as uppercase hex, matching the
/// form `openssl x509 -serial` prints and the `index.txt` format expects.
pub fn extract_serial(cert: &X509Ref) -> Result<String> {
    let serial = cert
        .serial_number()
        .to_bn()
        .map_err(|e| PackagerError::ocsp_generation(format!("failed to read serial number: {e}")))?;
    let hex = serial
        .to_hex_str()
        .map_err(|e| PackagerError::ocsp_generation(format!("failed to format serial number: {e}")))?;
    Ok(hex.to_string())
}

/// Render a timestamp as ASN.1 UTCTime (`YYMMDDHHMMSSZ`).
pub fn format_asn1_utc_time(at: DateTime<Utc>) -> String {
    at.format("%y%m%d%H%M%SZ").to_string()
}

fn not_after_timestamp(cert: &X509Ref) -> Result<DateTime<Utc>> {
    let epoch = Asn1Time::from_unix(0)
        .map_err(|e| PackagerError::ocsp_generation(format!("failed to create epoch time: {e}")))?;
    let diff = epoch.diff(cert.not_after()).map_err(|e| {
        PackagerError::ocsp_generation(format!("failed to read certificate expiry: {e}"))
    })?;
    let seconds = i64::from(diff.days) * 86_400 + i64::from(diff.secs);
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        PackagerError::ocsp_generation("certificate expiry is out of range".to_string())
    })
}

/// One row of the certificate-status ledger. Status is always `V` (valid):
/// the ledger exists solely to let the responder vouch for the leaf being
/// packaged.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub serial: String,
    pub expiry: String,
    pub subject: String,
}

impl LedgerEntry {
    pub fn new(identity: &LeafIdentity) -> Self {
        Self {
            serial: identity.serial.clone(),
            expiry: format_asn1_utc_time(identity.not_after),
            subject: format!("/CN={}", identity.domain),
        }
    }

    /// Render the entry in OpenSSL `index.txt` column format.
    pub fn render(&self) -> String {
        format!(
            "V\t{}\t\t{}\tunknown\t{}\n",
            self.expiry, self.serial, self.subject
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf_certificate::{self, ExtensionConfig};
    use chrono::Duration;

    fn issued_leaf_pem(domain: &str, validity_days: u32) -> Vec<u8> {
        let (ca_key, ca_cert) = leaf_certificate::test_ca();
        let leaf_key = leaf_certificate::generate_p256_key().unwrap();
        let csr = leaf_certificate::build_csr(domain, &leaf_key).unwrap();
        let cert = leaf_certificate::issue(
            &csr,
            &ExtensionConfig::new(domain),
            &ca_cert,
            &ca_key,
            validity_days,
        )
        .unwrap();
        cert.to_pem().unwrap()
    }

    #[test]
    fn test_utc_time_format() {
        // 2023-11-14 22:13:20 UTC
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(format_asn1_utc_time(at), "231114221320Z");
    }

    #[test]
    fn test_ledger_entry_column_format() {
        let entry = LedgerEntry {
            serial: "0A1B2C".to_string(),
            expiry: "231114221320Z".to_string(),
            subject: "/CN=example.com".to_string(),
        };
        assert_eq!(
            entry.render(),
            "V\t231114221320Z\t\t0A1B2C\tunknown\t/CN=example.com\n"
        );
    }

    #[test]
    fn test_serial_read_from_certificate_bytes() {
        let pem = issued_leaf_pem("example.com", 1);
        let now = Utc::now();
        let identity =
            LeafIdentity::from_certificate(&pem, "example.com", now + Duration::days(1)).unwrap();

        let cert = X509::from_pem(&pem).unwrap();
        let expected = cert
            .serial_number()
            .to_bn()
            .unwrap()
            .to_hex_str()
            .unwrap()
            .to_string();
        assert_eq!(identity.serial, expected);
        assert!(!identity.serial.is_empty());
    }

    #[test]
    fn test_window_clamped_to_certificate_expiry() {
        let pem = issued_leaf_pem("example.com", 1);
        let now = Utc::now();

        // Requesting five days against a one-day certificate must clamp.
        let identity =
            LeafIdentity::from_certificate(&pem, "example.com", now + Duration::days(5)).unwrap();
        assert!(identity.not_after <= now + Duration::days(1) + Duration::minutes(2));
        assert!(identity.response_days(now) <= 1);
    }

    #[test]
    fn test_fresh_window_keeps_requested_days() {
        let pem = issued_leaf_pem("example.com", 7);
        let now = Utc::now();

        let requested = now + Duration::days(3);
        let identity = LeafIdentity::from_certificate(&pem, "example.com", requested).unwrap();
        assert_eq!(identity.not_after, requested.trunc_subsecs(0));
        assert_eq!(identity.response_days(now), 3);
    }

    #[test]
    fn test_fresh_issuance_keeps_whole_day_window() {
        // The default packaging path: a leaf issued for exactly the
        // requested day count, with an untruncated wall-clock issuance time.
        // The window must come out as the full day count, not one less.
        let now = Utc::now();
        let pem = issued_leaf_pem("example.com", 1);

        let identity =
            LeafIdentity::from_certificate(&pem, "example.com", now + Duration::days(1)).unwrap();
        assert_eq!(identity.response_days(now), 1);
        assert_eq!(identity.not_after, now.trunc_subsecs(0) + Duration::days(1));
    }

    #[test]
    fn test_malformed_certificate_is_ocsp_error() {
        let result = LeafIdentity::from_certificate(b"not a pem", "example.com", Utc::now());
        assert!(matches!(result, Err(PackagerError::OcspGeneration(_))));
    }

    #[test]
    fn test_ledger_entry_matches_identity() {
        let pem = issued_leaf_pem("example.com", 1);
        let now = Utc::now();
        let identity =
            LeafIdentity::from_certificate(&pem, "example.com", now + Duration::days(1)).unwrap();

        let entry = LedgerEntry::new(&identity);
        assert_eq!(entry.serial, identity.serial);
        assert_eq!(entry.subject, "/CN=example.com");
        assert_eq!(entry.expiry, format_asn1_utc_time(identity.not_after));
    }
}
