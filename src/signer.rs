//! Envelope signing.
//!
//! Produces an enveloped XML-DSig `Signature` over every signed part of a
//! request envelope and places it in the signature header.

use crate::credential::SigningCredential;
use crate::envelope::{RequestEnvelope, SignedPart};
use crate::error::HiError;
use crate::xml::XmlWriter;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use tracing::debug;

pub const DS_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const SHA256_DIGEST: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

/// Stamps outgoing envelopes with the signing certificate.
///
/// Borrows the credential; the caller keeps ownership.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeSigner<'a> {
    credential: &'a SigningCredential,
}

impl<'a> EnvelopeSigner<'a> {
    pub fn new(credential: &'a SigningCredential) -> Self {
        Self { credential }
    }

    pub fn credential(&self) -> &'a SigningCredential {
        self.credential
    }

    /// Sign the envelope in place.
    pub fn sign(&self, envelope: &mut RequestEnvelope) -> Result<(), HiError> {
        let provider = self.credential.provider();
        let signed_info = signed_info_xml(envelope.parts(), provider.algorithm())?;
        let value = provider.sign(signed_info.as_bytes())?;

        let mut w = XmlWriter::new();
        w.start("ds:Signature", &[("xmlns:ds", DS_NS)])?;
        w.raw(&signed_info);
        w.element("ds:SignatureValue", &STANDARD.encode(value))?;
        w.start("ds:KeyInfo", &[])?;
        w.start("ds:X509Data", &[])?;
        w.element(
            "ds:X509Certificate",
            &STANDARD.encode(self.credential.certificate_der()),
        )?;
        w.end("ds:X509Data")?;
        w.end("ds:KeyInfo")?;
        w.end("ds:Signature")?;

        debug!(
            references = envelope.parts().len(),
            subject = %self.credential.info().subject,
            "Envelope signed"
        );
        envelope.set_signature(w.into_string()?);
        Ok(())
    }
}

/// Base64 SHA-256 digest of a serialised part.
pub fn digest(xml: &str) -> String {
    STANDARD.encode(Sha256::digest(xml.as_bytes()))
}

fn signed_info_xml(parts: &[SignedPart], algorithm: &str) -> Result<String, HiError> {
    let mut w = XmlWriter::new();
    w.start("ds:SignedInfo", &[("xmlns:ds", DS_NS)])?;
    w.start("ds:CanonicalizationMethod", &[("Algorithm", EXC_C14N)])?;
    w.end("ds:CanonicalizationMethod")?;
    w.start("ds:SignatureMethod", &[("Algorithm", algorithm)])?;
    w.end("ds:SignatureMethod")?;

    for part in parts {
        let uri = format!("#{}", part.id);
        w.start("ds:Reference", &[("URI", uri.as_str())])?;
        w.start("ds:Transforms", &[])?;
        w.start("ds:Transform", &[("Algorithm", EXC_C14N)])?;
        w.end("ds:Transform")?;
        w.end("ds:Transforms")?;
        w.start("ds:DigestMethod", &[("Algorithm", SHA256_DIGEST)])?;
        w.end("ds:DigestMethod")?;
        w.element("ds:DigestValue", &digest(&part.xml))?;
        w.end("ds:Reference")?;
    }

    w.end("ds:SignedInfo")?;
    w.into_string()
}
