//! Request envelope assembly.
//!
//! Every signed part is serialised once, when the envelope is built, in the
//! exact form later digested by the signer and written to the wire.

use crate::error::HiError;
use crate::identity::{QualifiedId, ServiceIdentity, Timestamp};
use crate::parser::{SOAP_11_NS, WSU_NS};
use crate::xml::XmlWriter;

/// HI common core elements (product, signature, timestamp).
pub const CE_NS: &str = "http://ns.electronichealth.net.au/hi/xsd/common/CommonCoreElements/3.0";
/// HI qualified identifier headers (user, hpio).
pub const QID_NS: &str = "http://ns.electronichealth.net.au/hi/xsd/common/QualifiedIdentifier/3.0";

/// A header or body part covered by the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPart {
    /// `wsu:Id` of the part
    pub id: &'static str,
    /// Serialised element
    pub xml: String,
}

/// One outbound message.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    timestamp: Timestamp,
    parts: Vec<SignedPart>,
    /// `None` until the signer fills the placeholder
    signature: Option<String>,
}

impl RequestEnvelope {
    /// Assemble an envelope around a serialised body payload.
    pub fn new(identity: &ServiceIdentity, payload: &str, timestamp: Timestamp) -> Result<Self, HiError> {
        let mut parts = vec![
            SignedPart {
                id: "product",
                xml: product_xml(identity)?,
            },
            SignedPart {
                id: "user",
                xml: qualified_id_xml("qid:user", "user", &identity.user)?,
            },
        ];
        if let Some(hpio) = &identity.hpio {
            parts.push(SignedPart {
                id: "hpio",
                xml: qualified_id_xml("qid:hpio", "hpio", hpio)?,
            });
        }
        parts.push(SignedPart {
            id: "timestamp",
            xml: timestamp_xml(&timestamp)?,
        });
        parts.push(SignedPart {
            id: "body",
            xml: body_xml(payload)?,
        });

        Ok(Self {
            timestamp,
            parts,
            signature: None,
        })
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn parts(&self) -> &[SignedPart] {
        &self.parts
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Fill the signature placeholder.
    pub fn set_signature(&mut self, signature_xml: String) {
        self.signature = Some(signature_xml);
    }

    /// Serialise the full envelope.
    pub fn to_xml(&self) -> Result<String, HiError> {
        let mut w = XmlWriter::new();
        w.start("soap:Envelope", &[("xmlns:soap", SOAP_11_NS)])?;
        w.start("soap:Header", &[])?;
        for part in self.parts.iter().filter(|p| p.id != "body") {
            w.raw(&part.xml);
        }
        w.start("ce:signature", &[("xmlns:ce", CE_NS)])?;
        if let Some(signature) = &self.signature {
            w.raw(signature);
        }
        w.end("ce:signature")?;
        w.end("soap:Header")?;
        for part in self.parts.iter().filter(|p| p.id == "body") {
            w.raw(&part.xml);
        }
        w.end("soap:Envelope")?;
        w.into_string()
    }
}

fn product_xml(identity: &ServiceIdentity) -> Result<String, HiError> {
    let product = &identity.product;
    let mut w = XmlWriter::new();
    w.start(
        "ce:product",
        &[("xmlns:ce", CE_NS), ("xmlns:wsu", WSU_NS), ("wsu:Id", "product")],
    )?;
    w.optional("ce:organisation", product.organisation.as_deref())?;
    w.element("ce:platform", &product.platform)?;
    w.element("ce:productName", &product.product_name)?;
    w.element("ce:productVersion", &product.product_version)?;
    w.start("ce:vendor", &[])?;
    w.element("ce:qualifier", &product.vendor.qualifier)?;
    w.element("ce:id", &product.vendor.id)?;
    w.end("ce:vendor")?;
    w.end("ce:product")?;
    w.into_string()
}

fn qualified_id_xml(name: &str, id: &str, value: &QualifiedId) -> Result<String, HiError> {
    let mut w = XmlWriter::new();
    w.start(name, &[("xmlns:qid", QID_NS), ("xmlns:wsu", WSU_NS), ("wsu:Id", id)])?;
    w.element("qid:qualifier", &value.qualifier)?;
    w.element("qid:id", &value.id)?;
    w.end(name)?;
    w.into_string()
}

fn timestamp_xml(timestamp: &Timestamp) -> Result<String, HiError> {
    let mut w = XmlWriter::new();
    w.start(
        "ce:timestamp",
        &[("xmlns:ce", CE_NS), ("xmlns:wsu", WSU_NS), ("wsu:Id", "timestamp")],
    )?;
    w.element("ce:created", &timestamp.created_str())?;
    w.element("ce:expires", &timestamp.expires_str())?;
    w.end("ce:timestamp")?;
    w.into_string()
}

fn body_xml(payload: &str) -> Result<String, HiError> {
    let mut w = XmlWriter::new();
    w.start(
        "soap:Body",
        &[("xmlns:soap", SOAP_11_NS), ("xmlns:wsu", WSU_NS), ("wsu:Id", "body")],
    )?;
    w.raw(payload);
    w.end("soap:Body")?;
    w.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::tests::{product, user};
    use crate::parser::parse_response_envelope;
    use chrono::{TimeZone, Utc};

    fn identity(hpio: bool) -> ServiceIdentity {
        ServiceIdentity::new(
            product(),
            user(),
            hpio.then(|| QualifiedId::hpio("8003621234567890")),
            false,
        )
        .unwrap()
    }

    fn fixed_timestamp() -> Timestamp {
        Timestamp::at(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_parts_order() {
        let envelope = RequestEnvelope::new(&identity(true), "<p></p>", fixed_timestamp()).unwrap();
        let ids: Vec<_> = envelope.parts().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["product", "user", "hpio", "timestamp", "body"]);

        let envelope = RequestEnvelope::new(&identity(false), "<p></p>", fixed_timestamp()).unwrap();
        assert!(envelope.parts().iter().all(|p| p.id != "hpio"));
    }

    #[test]
    fn test_unsigned_envelope_has_placeholder() {
        let envelope = RequestEnvelope::new(&identity(false), "<p></p>", fixed_timestamp()).unwrap();
        assert!(!envelope.is_signed());
        let xml = envelope.to_xml().unwrap();
        assert!(xml.contains(&format!(r#"<ce:signature xmlns:ce="{}"></ce:signature>"#, CE_NS)));
    }

    #[test]
    fn test_envelope_round_trips_through_parser() {
        let envelope = RequestEnvelope::new(
            &identity(true),
            r#"<x:ping xmlns:x="urn:x"><x:value>1</x:value></x:ping>"#,
            fixed_timestamp(),
        )
        .unwrap();
        let xml = envelope.to_xml().unwrap();
        let parsed = parse_response_envelope(xml.as_bytes()).unwrap();

        let header = parsed.header.as_ref().unwrap();
        let ts = header.child("timestamp").unwrap();
        assert_eq!(ts.child_text("created"), Some("2024-05-01T00:00:00.000Z"));
        assert_eq!(ts.child_text("expires"), Some("2024-05-31T00:00:00.000Z"));
        assert_eq!(header.child("hpio").unwrap().child_text("id"), Some("8003621234567890"));
        assert_eq!(header.child("product").unwrap().attribute("Id"), Some("product"));

        let payload = parsed.payload().unwrap();
        assert_eq!(payload.name, "ping");
        assert_eq!(payload.child_text("value"), Some("1"));
    }
}
