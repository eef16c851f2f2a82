//! Error types for the HI service clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Boxed cause carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// HI client errors.
#[derive(Error, Debug)]
pub enum HiError {
    /// A required constructor or call argument was missing or blank.
    /// Raised before any network I/O.
    #[error("Argument `{0}` is required")]
    Argument(&'static str),

    /// The service processed the request and rejected it with diagnostic codes.
    #[error("Service fault {fault_code}: {fault_string} ({messages})")]
    ServiceFault {
        /// SOAP fault code
        fault_code: String,
        /// SOAP fault string / reason
        fault_string: String,
        /// Structured detail returned by the service
        messages: ServiceMessages,
    },

    /// Network or protocol failure without structured service detail.
    #[error("Transport error: {message}")]
    Transport {
        /// Short description of the failure
        message: String,
        /// Original cause
        #[source]
        source: BoxError,
    },

    /// The call succeeded but the response carried no usable payload.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HiError {
    /// Wrap an arbitrary cause as a transport error.
    pub fn transport(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Whether a caller may reasonably retry the call.
    ///
    /// Only transport failures qualify; service faults carry business-rule
    /// rejections that a retry would repeat.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Structured service messages, if this is a service fault.
    pub fn service_messages(&self) -> Option<&ServiceMessages> {
        match self {
            Self::ServiceFault { messages, .. } => Some(messages),
            _ => None,
        }
    }
}

/// Severity attached to a service message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Severity {
    #[default]
    Informational,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Parse the wire representation. Unknown values map to `Error`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "informational" | "info" => Self::Informational,
            "warning" => Self::Warning,
            "fatal" => Self::Fatal,
            _ => Self::Error,
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Informational => "Informational",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }
}

/// A single diagnostic returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMessage {
    /// Service code, e.g. `WSE0035`
    pub code: String,
    /// Message severity
    pub severity: Severity,
    /// Human-readable reason
    pub reason: String,
    /// Nested detail messages
    pub details: Vec<ServiceMessage>,
}

impl ServiceMessage {
    /// Create a new message without nested detail.
    pub fn new(code: impl Into<String>, severity: Severity, reason: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity,
            reason: reason.into(),
            details: Vec::new(),
        }
    }
}

/// The structured "service messages" block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceMessages {
    /// Highest severity across all messages
    pub highest_severity: Severity,
    /// Messages in the order returned
    pub messages: Vec<ServiceMessage>,
}

impl ServiceMessages {
    /// Build a block, deriving the highest severity from the messages.
    pub fn from_messages(messages: Vec<ServiceMessage>) -> Self {
        let highest_severity = messages
            .iter()
            .map(|m| m.severity)
            .max()
            .unwrap_or_default();
        Self {
            highest_severity,
            messages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl fmt::Display for ServiceMessages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .messages
            .iter()
            .map(|m| format!("[{}] {}", m.code, m.reason))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}: {}", self.highest_severity.as_str(), joined)
    }
}
