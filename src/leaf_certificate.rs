//! Leaf certificate issuance.
//!
//! Builds the CSR and the CA-signed end-entity certificate that signs the
//! exchange. The certificate is what proves to an SXG-aware verifier that it
//! was issued for exchange-signing rather than general TLS:
//!
//! - **Basic Constraints**: CA=false, critical
//! - **Key Usage**: digitalSignature, critical
//! - **Subject Alternative Name**: `DNS:{domain}`
//! - **SXG extension**: OID `1.3.6.1.4.1.11129.2.1.22`, value `NULL`
//!
//! The same extension set is rendered in OpenSSL config syntax by
//! [`ExtensionConfig::render`] and written into the workspace, so a signer
//! that shells out to `openssl x509 -req -extfile` applies extensions
//! identical to the native path here.

use openssl::asn1::{Asn1Object, Asn1OctetString, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::x509::extension::{BasicConstraints, KeyUsage, SubjectAlternativeName};
use openssl::x509::{X509Extension, X509Name, X509Ref, X509Req, X509ReqRef, X509};

use crate::error::{PackagerError, Result};

/// OID marking a certificate as usable for signed-exchange signing.
pub const SXG_EXTENSION_OID: &str = "1.3.6.1.4.1.11129.2.1.22";

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2
const SERIAL_NUMBER_BITS: i32 = 128;

// DER encoding of ASN.1 NULL, the SXG extension's fixed value.
const ASN1_NULL: [u8; 2] = [0x05, 0x00];

/// X.509v3 extension set carried by the leaf certificate.
#[derive(Debug, Clone)]
pub struct ExtensionConfig {
    domain: String,
}

impl ExtensionConfig {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Render the extension set in OpenSSL config syntax.
    pub fn render(&self) -> String {
        format!(
            "basicConstraints = critical, CA:FALSE\n\
             keyUsage = critical, digitalSignature\n\
             subjectAltName = DNS:{}\n\
             {SXG_EXTENSION_OID} = ASN1:NULL\n",
            self.domain
        )
    }
}

/// Generate a fresh EC P-256 private key.
pub fn generate_p256_key() -> Result<PKey<Private>> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)
        .map_err(|e| PackagerError::key_generation(format!("failed to load P-256 parameters: {e}")))?;
    let ec_key = EcKey::generate(&group)
        .map_err(|e| PackagerError::key_generation(format!("failed to generate EC keypair: {e}")))?;
    PKey::from_ec_key(ec_key)
        .map_err(|e| PackagerError::key_generation(format!("failed to create private key: {e}")))
}

/// Build a certificate signing request with `CN = domain` for the leaf key.
pub fn build_csr(domain: &str, leaf_key: &PKeyRef<Private>) -> Result<X509Req> {
    let mut builder = X509Req::builder()
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to create CSR builder: {e}")))?;

    let mut name_builder = X509Name::builder()
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to create name builder: {e}")))?;
    name_builder
        .append_entry_by_nid(Nid::COMMONNAME, domain)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to set CN: {e}")))?;
    let name = name_builder.build();

    builder
        .set_subject_name(&name)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to set CSR subject: {e}")))?;
    builder
        .set_pubkey(leaf_key)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to set CSR public key: {e}")))?;
    builder
        .sign(leaf_key, MessageDigest::sha256())
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to sign CSR: {e}")))?;

    Ok(builder.build())
}

/// Sign a leaf certificate for the CSR with the CA identity.
///
/// The certificate is valid for exactly `validity_days` from issuance:
/// `notBefore = now`, `notAfter = now + validity_days`. SHA-256 digest, a
/// random 128-bit serial number, and the extensions from `extensions`.
pub fn issue(
    csr: &X509ReqRef,
    extensions: &ExtensionConfig,
    ca_cert: &X509Ref,
    ca_key: &PKeyRef<Private>,
    validity_days: u32,
) -> Result<X509> {
    let csr_pubkey = csr
        .public_key()
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to read CSR public key: {e}")))?;
    let verified = csr
        .verify(&csr_pubkey)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to verify CSR: {e}")))?;
    if !verified {
        return Err(PackagerError::certificate_issuance(
            "CSR signature verification failed",
        ));
    }

    let mut builder = X509::builder()
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to create X509 builder: {e}")))?;
    builder
        .set_version(X509_VERSION_3)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to set version: {e}")))?;

    let mut serial = BigNum::new()
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to create serial: {e}")))?;
    serial
        .rand(SERIAL_NUMBER_BITS, MsbOption::MAYBE_ZERO, false)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to randomize serial: {e}")))?;
    let asn1_serial = serial
        .to_asn1_integer()
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to convert serial: {e}")))?;
    builder
        .set_serial_number(&asn1_serial)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to set serial: {e}")))?;

    builder
        .set_subject_name(csr.subject_name())
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to set subject: {e}")))?;
    builder
        .set_issuer_name(ca_cert.subject_name())
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to set issuer: {e}")))?;
    builder
        .set_pubkey(&csr_pubkey)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to set public key: {e}")))?;

    let not_before = Asn1Time::days_from_now(0)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to create notBefore: {e}")))?;
    builder
        .set_not_before(&not_before)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to set notBefore: {e}")))?;
    let not_after = Asn1Time::days_from_now(validity_days)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to create notAfter: {e}")))?;
    builder
        .set_not_after(&not_after)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to set notAfter: {e}")))?;

    let mut bc = BasicConstraints::new();
    bc.critical();
    let bc_extension = bc
        .build()
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to build BasicConstraints: {e}")))?;
    builder
        .append_extension(bc_extension)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to add BasicConstraints: {e}")))?;

    let mut ku = KeyUsage::new();
    ku.critical();
    ku.digital_signature();
    let ku_extension = ku
        .build()
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to build KeyUsage: {e}")))?;
    builder
        .append_extension(ku_extension)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to add KeyUsage: {e}")))?;

    let san_extension = {
        let context = builder.x509v3_context(Some(ca_cert), None);
        SubjectAlternativeName::new()
            .dns(extensions.domain())
            .build(&context)
            .map_err(|e| PackagerError::certificate_issuance(format!("failed to build SAN: {e}")))?
    };
    builder
        .append_extension(san_extension)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to add SAN: {e}")))?;

    let sxg_oid = Asn1Object::from_str(SXG_EXTENSION_OID)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to parse SXG OID: {e}")))?;
    let sxg_value = Asn1OctetString::new_from_bytes(&ASN1_NULL)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to encode SXG value: {e}")))?;
    let sxg_extension = X509Extension::new_from_der(&sxg_oid, false, &sxg_value)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to build SXG extension: {e}")))?;
    builder
        .append_extension(sxg_extension)
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to add SXG extension: {e}")))?;

    builder
        .sign(ca_key, MessageDigest::sha256())
        .map_err(|e| PackagerError::certificate_issuance(format!("failed to sign certificate: {e}")))?;

    Ok(builder.build())
}

/// Self-signed CA fixture for tests.
#[cfg(test)]
pub(crate) fn test_ca() -> (PKey<Private>, X509) {
    use openssl::rsa::Rsa;

    let rsa = Rsa::generate(2048).unwrap();
    let key = PKey::from_rsa(rsa).unwrap();

    let mut name_builder = X509Name::builder().unwrap();
    name_builder
        .append_entry_by_nid(Nid::COMMONNAME, "SXG Test CA")
        .unwrap();
    let name = name_builder.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(X509_VERSION_3).unwrap();
    let mut serial = BigNum::new().unwrap();
    serial.rand(SERIAL_NUMBER_BITS, MsbOption::MAYBE_ZERO, false).unwrap();
    builder
        .set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(7).unwrap())
        .unwrap();
    let mut bc = BasicConstraints::new();
    bc.critical().ca();
    builder.append_extension(bc.build().unwrap()).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    (key, builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    // DER form of the SXG extension OID as it appears inside the certificate.
    const SXG_OID_DER: [u8; 12] = [
        0x06, 0x0A, 0x2B, 0x06, 0x01, 0x04, 0x01, 0xD6, 0x79, 0x02, 0x01, 0x16,
    ];

    fn issued_for(domain: &str, validity_days: u32) -> X509 {
        let (ca_key, ca_cert) = test_ca();
        let leaf_key = generate_p256_key().unwrap();
        let csr = build_csr(domain, &leaf_key).unwrap();
        issue(&csr, &ExtensionConfig::new(domain), &ca_cert, &ca_key, validity_days).unwrap()
    }

    #[test]
    fn test_extension_config_renders_openssl_syntax() {
        let rendered = ExtensionConfig::new("example.com").render();
        assert_eq!(
            rendered,
            "basicConstraints = critical, CA:FALSE\n\
             keyUsage = critical, digitalSignature\n\
             subjectAltName = DNS:example.com\n\
             1.3.6.1.4.1.11129.2.1.22 = ASN1:NULL\n"
        );
    }

    #[test]
    fn test_csr_carries_domain_as_cn() {
        let leaf_key = generate_p256_key().unwrap();
        let csr = build_csr("example.com", &leaf_key).unwrap();

        let cn = csr
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .unwrap()
            .data()
            .as_utf8()
            .unwrap()
            .to_string();
        assert_eq!(cn, "example.com");
    }

    #[test]
    fn test_issued_certificate_has_san_and_sxg_extension() {
        let cert = issued_for("example.com", 1);

        let san = cert.subject_alt_names().unwrap();
        let dns: Vec<&str> = san.iter().filter_map(|name| name.dnsname()).collect();
        assert_eq!(dns, vec!["example.com"]);

        let der = cert.to_der().unwrap();
        assert!(
            der.windows(SXG_OID_DER.len()).any(|w| w == SXG_OID_DER.as_slice()),
            "SXG extension OID missing from certificate"
        );
    }

    #[test]
    fn test_issued_certificate_verifies_against_ca() {
        let (ca_key, ca_cert) = test_ca();
        let leaf_key = generate_p256_key().unwrap();
        let csr = build_csr("example.com", &leaf_key).unwrap();
        let cert = issue(&csr, &ExtensionConfig::new("example.com"), &ca_cert, &ca_key, 1).unwrap();

        assert!(cert.verify(&ca_key).unwrap());
        assert_eq!(
            cert.issuer_name().entries().count(),
            ca_cert.subject_name().entries().count()
        );
    }

    #[test]
    fn test_generated_key_is_p256() {
        let key = generate_p256_key().unwrap();
        let ec = key.ec_key().unwrap();
        assert_eq!(ec.group().curve_name(), Some(Nid::X9_62_PRIME256V1));
    }
}
