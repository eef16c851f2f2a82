//! HTTPS channel over a blocking reqwest client with rustls mutual TLS.

use crate::channel::{Channel, ChannelError, ChannelFactory, ChannelState};
use crate::config::{HiClientConfig, ServiceBinding};
use crate::credential::TransportCredential;
use crate::error::HiError;
use crate::parser::parse_response_envelope;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{Certificate, Url};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::CertificateDer;
use std::io::Read;
use tracing::{debug, warn};

const SOAP_11_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Channel posting SOAP 1.1 envelopes to one endpoint.
#[derive(Debug)]
pub struct HttpChannel {
    client: Client,
    endpoint: Url,
    state: ChannelState,
    max_response_bytes: usize,
}

impl HttpChannel {
    /// Build the HTTP client described by `binding`.
    ///
    /// `roots` are trusted in addition to the built-in web PKI roots.
    pub fn new(
        endpoint: Url,
        binding: &ServiceBinding,
        tls: &TransportCredential,
        roots: &[Certificate],
    ) -> Result<Self, HiError> {
        if endpoint.scheme() != "https" {
            return Err(HiError::Config(format!(
                "Endpoint must use https, got '{}'",
                endpoint.scheme()
            )));
        }

        let mut builder = Client::builder()
            .use_rustls_tls()
            .https_only(true)
            .redirect(Policy::none())
            .connect_timeout(binding.timeouts.open())
            .timeout(binding.timeouts.send() + binding.timeouts.receive())
            .user_agent(concat!("hi-soap-client/", env!("CARGO_PKG_VERSION")));
        if binding.require_client_certificate {
            builder = builder.identity(tls.identity()?);
        }
        for root in roots {
            builder = builder.add_root_certificate(root.clone());
        }
        let client = builder
            .build()
            .map_err(|e| HiError::Config(format!("Failed to build HTTPS client: {}", e)))?;

        let max_response_bytes = usize::try_from(binding.quotas.max_received_message_size)
            .map_err(|_| HiError::Config("max_received_message_size must not be negative".to_string()))?;

        Ok(Self {
            client,
            endpoint,
            state: ChannelState::Created,
            max_response_bytes,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn fail(&mut self, message: &str, source: impl Into<crate::error::BoxError>) -> ChannelError {
        self.state = ChannelState::Faulted;
        ChannelError::transport(message, source)
    }
}

impl Channel for HttpChannel {
    fn state(&self) -> ChannelState {
        self.state
    }

    fn open(&mut self) -> Result<(), ChannelError> {
        match self.state {
            ChannelState::Created => {
                self.state = ChannelState::Opened;
                Ok(())
            }
            ChannelState::Opened => Ok(()),
            state => Err(ChannelError::transport(
                "Cannot open channel",
                format!("channel is {:?}", state),
            )),
        }
    }

    fn invoke(&mut self, action: &str, envelope: &str) -> Result<String, ChannelError> {
        if self.state != ChannelState::Opened {
            return Err(ChannelError::transport(
                "Channel is not open",
                format!("channel is {:?}", self.state),
            ));
        }

        debug!(endpoint = %self.endpoint, action = %action, "Posting SOAP request");

        let result = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, SOAP_11_CONTENT_TYPE)
            .header("SOAPAction", format!("\"{}\"", action))
            .body(envelope.to_string())
            .send();
        let mut response = match result {
            Ok(response) => response,
            Err(e) => return Err(self.fail("HTTP request failed", e)),
        };

        let status = response.status();
        let body = match read_response_limited(&mut response, self.max_response_bytes) {
            Ok(body) => body,
            Err(e) => return Err(self.fail("Failed to read response", e)),
        };

        if status.is_success() {
            return String::from_utf8(body).map_err(|e| self.fail("Response is not UTF-8", e));
        }

        // Faults arrive with HTTP 500 and keep the channel usable.
        match parse_response_envelope(&body).ok().and_then(|env| env.fault()) {
            Some(fault) => {
                warn!(status = status.as_u16(), code = %fault.code, "SOAP fault received");
                Err(ChannelError::Fault(fault))
            }
            None => Err(self.fail(
                "Unexpected HTTP status",
                format!("HTTP {}", status.as_u16()),
            )),
        }
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        self.state = ChannelState::Closed;
        Ok(())
    }

    fn abort(&mut self) {
        self.state = ChannelState::Closed;
    }
}

/// Read at most `max_bytes` of a response body.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, HiError> {
    let max_bytes_u64 = max_bytes as u64;
    if let Some(expected) = response.content_length() {
        if expected > max_bytes_u64 {
            return Err(HiError::UnexpectedResponse(
                "response exceeds max_received_message_size".to_string(),
            ));
        }
    }
    let mut buf = Vec::new();
    response.take(max_bytes_u64.saturating_add(1)).read_to_end(&mut buf)?;
    if buf.len() > max_bytes {
        return Err(HiError::UnexpectedResponse(
            "response exceeds max_received_message_size".to_string(),
        ));
    }
    Ok(buf)
}

/// Factory resolving named profiles from a [`HiClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct HttpChannelFactory {
    config: HiClientConfig,
    roots: Vec<Certificate>,
}

impl HttpChannelFactory {
    pub fn new(config: HiClientConfig) -> Self {
        Self {
            config,
            roots: Vec::new(),
        }
    }

    /// Trust an extra CA (PEM) for every channel, e.g. a test environment's private CA.
    pub fn with_root_certificate(mut self, pem: &[u8]) -> Result<Self, HiError> {
        let der = CertificateDer::from_pem_slice(pem)
            .map_err(|e| HiError::Credential(format!("Invalid CA certificate: {}", e)))?;
        let root = Certificate::from_der(der.as_ref())
            .map_err(|e| HiError::Credential(format!("Invalid CA certificate: {}", e)))?;
        self.roots.push(root);
        Ok(self)
    }
}

impl ChannelFactory for HttpChannelFactory {
    type Channel = HttpChannel;

    fn create(
        &self,
        endpoint: &Url,
        binding: &ServiceBinding,
        tls: &TransportCredential,
    ) -> Result<HttpChannel, HiError> {
        HttpChannel::new(endpoint.clone(), binding, tls, &self.roots)
    }

    fn create_for_profile(&self, profile: &str, tls: &TransportCredential) -> Result<HttpChannel, HiError> {
        let resolved = self.config.profile(profile)?;
        let endpoint = Url::parse(&resolved.endpoint)
            .map_err(|e| HiError::Config(format!("Invalid endpoint for profile '{}': {}", profile, e)))?;
        HttpChannel::new(endpoint, &resolved.binding(), tls, &self.roots)
    }
}
