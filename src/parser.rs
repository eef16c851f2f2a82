//! SOAP response parsing.
//!
//! Uses quick-xml's namespace-aware reader, which never expands entities.
//! DOCTYPE and ENTITY declarations are rejected up front.

use crate::error::{HiError, ServiceMessage, ServiceMessages, Severity};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::fmt;

/// SOAP namespace URIs.
pub const SOAP_11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP_12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const WSU_NS: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";

/// Deepest element nesting accepted in a response document.
pub const MAX_DOCUMENT_DEPTH: usize = 512;

/// SOAP versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapVersion {
    /// SOAP 1.1 (namespace: http://schemas.xmlsoap.org/soap/envelope/)
    Soap11,
    /// SOAP 1.2 (namespace: http://www.w3.org/2003/05/soap-envelope)
    Soap12,
}

/// An element of a parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local name, prefix stripped
    pub name: String,
    /// Resolved namespace URI
    pub namespace: Option<String>,
    /// Attributes by local name
    pub attributes: Vec<(String, String)>,
    /// Concatenated text content
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name.
    pub fn children_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s XmlElement> + 's {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child with the given name. Blank text is `None`.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }

    /// Depth-first search for a descendant (or self) with the given name.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A SOAP fault returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    /// `faultcode` (1.1) or `Code/Value` (1.2)
    pub code: String,
    /// `faultstring` (1.1) or `Reason/Text` (1.2)
    pub reason: String,
    /// Structured service messages from the fault detail, if any
    pub service_messages: Option<ServiceMessages>,
}

impl fmt::Display for SoapFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.reason)
    }
}

impl std::error::Error for SoapFault {}

/// Parsed response envelope.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    /// Detected SOAP version
    pub version: SoapVersion,
    /// SOAP Header (if present)
    pub header: Option<XmlElement>,
    /// SOAP Body (if present)
    pub body: Option<XmlElement>,
}

impl ResponseEnvelope {
    /// The fault carried in the body, if any.
    pub fn fault(&self) -> Option<SoapFault> {
        let fault = self.body.as_ref()?.child("Fault")?;
        Some(parse_fault(fault, self.version))
    }

    /// First element inside the body, skipping faults.
    pub fn payload(&self) -> Option<&XmlElement> {
        self.body
            .as_ref()?
            .children
            .iter()
            .find(|c| c.name != "Fault")
    }
}

/// Parse raw bytes as a SOAP response envelope.
pub fn parse_response_envelope(data: &[u8]) -> Result<ResponseEnvelope, HiError> {
    let root = parse_document(data)?;

    let version = match (root.name.as_str(), root.namespace.as_deref()) {
        ("Envelope", Some(SOAP_11_NS)) => SoapVersion::Soap11,
        ("Envelope", Some(SOAP_12_NS)) => SoapVersion::Soap12,
        _ => {
            return Err(HiError::Xml(
                "No valid SOAP Envelope found with recognized namespace".to_string(),
            ))
        }
    };

    let mut header = None;
    let mut body = None;
    for child in root.children {
        match child.name.as_str() {
            "Header" if header.is_none() => header = Some(child),
            "Body" if body.is_none() => body = Some(child),
            _ => {}
        }
    }

    Ok(ResponseEnvelope {
        version,
        header,
        body,
    })
}

/// Parse a document into an element tree rooted at the document element.
pub fn parse_document(data: &[u8]) -> Result<XmlElement, HiError> {
    let xml_str = std::str::from_utf8(data)
        .map_err(|e| HiError::Xml(format!("Invalid UTF-8: {}", e)))?;

    check_xxe_patterns(xml_str)?;

    let mut reader = NsReader::from_str(xml_str);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(ref e))) => {
                check_depth(stack.len())?;
                stack.push(element_from_start(ns, e)?);
            }

            Ok((ns, Event::Empty(ref e))) => {
                check_depth(stack.len())?;
                let element = element_from_start(ns, e)?;
                attach(&mut stack, &mut root, element);
            }

            Ok((_, Event::End(_))) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }

            Ok((_, Event::Text(ref e))) => {
                if let Some(current) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| HiError::Xml(format!("Invalid text content: {}", e)))?;
                    current.text.push_str(&text);
                }
            }

            Ok((_, Event::CData(ref e))) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(e));
                }
            }

            Ok((_, Event::DocType(_))) => {
                return Err(HiError::Xml("DOCTYPE declarations are not allowed".to_string()));
            }

            Ok((_, Event::Eof)) => break,

            Err(e) => {
                return Err(HiError::Xml(format!("XML parse error: {}", e)));
            }

            _ => {}
        }

        buf.clear();
    }

    if !stack.is_empty() {
        return Err(HiError::Xml("Unexpected end of document".to_string()));
    }
    root.ok_or_else(|| HiError::Xml("Empty document".to_string()))
}

/// The element tree is dropped and searched recursively, so nesting is bounded.
fn check_depth(open_elements: usize) -> Result<(), HiError> {
    if open_elements >= MAX_DOCUMENT_DEPTH {
        return Err(HiError::Xml(format!(
            "Document nesting exceeds {} elements",
            MAX_DOCUMENT_DEPTH
        )));
    }
    Ok(())
}

/// Attach a finished element to its parent, or make it the root.
fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn element_from_start(ns: ResolveResult, e: &BytesStart) -> Result<XmlElement, HiError> {
    let namespace = match ns {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    };

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| HiError::Xml(format!("Invalid attribute: {}", e)))?;
        let key = attr.key.local_name();
        let key = String::from_utf8_lossy(key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| HiError::Xml(format!("Invalid attribute value: {}", e)))?;
        attributes.push((key, value.into_owned()));
    }

    Ok(XmlElement {
        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        namespace,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

/// Check for XXE attack patterns.
fn check_xxe_patterns(xml: &str) -> Result<(), HiError> {
    if xml.contains("<!DOCTYPE") || xml.contains("<!doctype") {
        return Err(HiError::Xml("DOCTYPE declarations are not allowed".to_string()));
    }

    if xml.contains("<!ENTITY") || xml.contains("<!entity") {
        return Err(HiError::Xml("Entity declarations are not allowed".to_string()));
    }

    Ok(())
}

fn parse_fault(fault: &XmlElement, version: SoapVersion) -> SoapFault {
    let (code, reason, detail) = match version {
        SoapVersion::Soap11 => (
            fault.child_text("faultcode").map(str::to_string),
            fault.child_text("faultstring").map(str::to_string),
            fault.child("detail"),
        ),
        SoapVersion::Soap12 => (
            fault
                .child("Code")
                .and_then(|c| c.child_text("Value"))
                .map(str::to_string),
            fault
                .child("Reason")
                .and_then(|r| r.child_text("Text"))
                .map(str::to_string),
            fault.child("Detail"),
        ),
    };

    SoapFault {
        code: code.unwrap_or_default(),
        reason: reason.unwrap_or_default(),
        service_messages: detail
            .and_then(|d| d.find("serviceMessages"))
            .map(parse_service_messages),
    }
}

/// Parse a `serviceMessages` block.
pub fn parse_service_messages(element: &XmlElement) -> ServiceMessages {
    let messages: Vec<ServiceMessage> = element
        .children_named("serviceMessage")
        .map(parse_service_message)
        .collect();

    match element.child_text("highestSeverity") {
        Some(severity) => ServiceMessages {
            highest_severity: Severity::parse(severity),
            messages,
        },
        None => ServiceMessages::from_messages(messages),
    }
}

fn parse_service_message(element: &XmlElement) -> ServiceMessage {
    ServiceMessage {
        code: element.child_text("code").unwrap_or_default().to_string(),
        severity: element
            .child_text("severity")
            .map(Severity::parse)
            .unwrap_or(Severity::Error),
        reason: element.child_text("reason").unwrap_or_default().to_string(),
        details: element
            .child("details")
            .map(|d| d.children_named("serviceMessage").map(parse_service_message).collect())
            .unwrap_or_default(),
    }
}
