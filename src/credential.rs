//! Signing and TLS credentials.
//!
//! Both credentials are loaded and owned by the caller. Clients only borrow
//! them for their lifetime and never rotate or destroy them.

use crate::error::HiError;
use chrono::{DateTime, Utc};
use rustls::sign::Signer;
use rustls::SignatureScheme;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::fmt;

/// XML-DSig identifier of RSA PKCS#1 v1.5 with SHA-256.
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// Summary of an X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// Subject distinguished name
    pub subject: String,
    /// Serial number (hex)
    pub serial: String,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

impl CertificateInfo {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, HiError> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| HiError::Credential(format!("Invalid certificate: {}", e)))?;
        let validity = cert.validity();
        Ok(Self {
            subject: cert.subject().to_string(),
            serial: cert.raw_serial_as_string(),
            not_before: DateTime::from_timestamp(validity.not_before.timestamp(), 0),
            not_after: DateTime::from_timestamp(validity.not_after.timestamp(), 0),
        })
    }

    /// Whether `at` falls inside the validity window.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before.map_or(true, |nb| at >= nb) && self.not_after.map_or(true, |na| at <= na)
    }
}

/// Produces raw signature values for envelope signing.
pub trait SignatureProvider: Send + Sync {
    /// XML-DSig `SignatureMethod` algorithm URI.
    fn algorithm(&self) -> &str;

    /// Sign `data` and return the raw signature bytes.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, HiError>;
}

/// RSA-SHA256 signer backed by a rustls signing key.
pub struct RsaSha256Provider {
    signer: Box<dyn Signer>,
}

impl RsaSha256Provider {
    /// Load a PKCS#8 or PKCS#1 RSA private key from PEM.
    pub fn from_pem(key_pem: &[u8]) -> Result<Self, HiError> {
        let key = PrivateKeyDer::from_pem_slice(key_pem)
            .map_err(|e| HiError::Credential(format!("Invalid private key: {}", e)))?;
        let signing_key = rustls::crypto::aws_lc_rs::sign::any_supported_type(&key)
            .map_err(|e| HiError::Credential(format!("Unsupported private key: {}", e)))?;
        let signer = signing_key
            .choose_scheme(&[SignatureScheme::RSA_PKCS1_SHA256])
            .ok_or_else(|| HiError::Credential("Signing key is not an RSA key".to_string()))?;
        Ok(Self { signer })
    }
}

impl SignatureProvider for RsaSha256Provider {
    fn algorithm(&self) -> &str {
        RSA_SHA256
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, HiError> {
        self.signer
            .sign(data)
            .map_err(|e| HiError::Credential(format!("Signing failed: {}", e)))
    }
}

/// Certificate used to sign outgoing envelopes.
pub struct SigningCredential {
    certificate: Vec<u8>,
    info: CertificateInfo,
    provider: Box<dyn SignatureProvider>,
}

impl SigningCredential {
    /// Load a certificate and RSA key from PEM.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, HiError> {
        Self::with_provider(cert_pem, Box::new(RsaSha256Provider::from_pem(key_pem)?))
    }

    /// Pair a PEM certificate with an external signature provider.
    pub fn with_provider(cert_pem: &[u8], provider: Box<dyn SignatureProvider>) -> Result<Self, HiError> {
        let der = CertificateDer::from_pem_slice(cert_pem)
            .map_err(|e| HiError::Credential(format!("Invalid certificate PEM: {}", e)))?;
        let info = CertificateInfo::from_der(der.as_ref())?;
        Ok(Self {
            certificate: der.as_ref().to_vec(),
            info,
            provider,
        })
    }

    /// DER-encoded certificate.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate
    }

    pub fn info(&self) -> &CertificateInfo {
        &self.info
    }

    pub fn provider(&self) -> &dyn SignatureProvider {
        self.provider.as_ref()
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("subject", &self.info.subject)
            .field("algorithm", &self.provider.algorithm())
            .finish()
    }
}

/// Client certificate presented on the TLS channel.
pub struct TransportCredential {
    identity_pem: Vec<u8>,
    info: CertificateInfo,
}

impl TransportCredential {
    /// Load from a PEM certificate and PEM private key.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, HiError> {
        let der = CertificateDer::from_pem_slice(cert_pem)
            .map_err(|e| HiError::Credential(format!("Invalid certificate PEM: {}", e)))?;
        let info = CertificateInfo::from_der(der.as_ref())?;
        PrivateKeyDer::from_pem_slice(key_pem)
            .map_err(|e| HiError::Credential(format!("Invalid private key: {}", e)))?;

        let mut identity_pem = Vec::with_capacity(cert_pem.len() + key_pem.len() + 1);
        identity_pem.extend_from_slice(key_pem);
        identity_pem.push(b'\n');
        identity_pem.extend_from_slice(cert_pem);
        Ok(Self { identity_pem, info })
    }

    pub fn info(&self) -> &CertificateInfo {
        &self.info
    }

    /// Identity for the reqwest TLS stack.
    pub fn identity(&self) -> Result<reqwest::Identity, HiError> {
        reqwest::Identity::from_pem(&self.identity_pem)
            .map_err(|e| HiError::Credential(format!("Invalid TLS identity: {}", e)))
    }
}

impl fmt::Debug for TransportCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportCredential")
            .field("subject", &self.info.subject)
            .finish()
    }
}
