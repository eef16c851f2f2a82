//! Generic signed SOAP client.
//!
//! Every HI service client is a [`SoapClient`] parameterised by a [`Service`]
//! marker; each remote operation is a [`SoapOperation`] of that service.
//!
//! A client issues blocking calls through `&mut self`, so one instance can
//! never be shared between threads mid-call. Independent instances may run
//! on separate threads.

use crate::channel::{Channel, ChannelError, ChannelFactory, ChannelGuard, ChannelState};
use crate::config::{ServiceBinding, TimeoutProfile};
use crate::credential::{SigningCredential, TransportCredential};
use crate::envelope::RequestEnvelope;
use crate::error::HiError;
use crate::identity::{require, ProductType, QualifiedId, ServiceIdentity, Timestamp};
use crate::parser::{parse_response_envelope, SoapFault, XmlElement};
use crate::signer::EnvelopeSigner;
use crate::xml::XmlWriter;
use reqwest::Url;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

/// Static description of one HI web service.
pub trait Service {
    /// Service name used in logs
    const NAME: &'static str;
    /// Whether every call must carry an HPI-O
    const REQUIRES_HPIO: bool;
    const TIMEOUT_PROFILE: TimeoutProfile;
}

/// One remote operation of a service.
pub trait SoapOperation {
    type Service: Service;
    type Request: ?Sized;
    type Response;

    /// SOAPAction of the operation
    const ACTION: &'static str;

    /// Reject missing arguments before any I/O.
    fn validate(request: &Self::Request) -> Result<(), HiError>;

    /// Write the body payload.
    fn write(request: &Self::Request, w: &mut XmlWriter) -> Result<(), HiError>;

    /// Decode the response payload. `None` when the expected content is absent.
    fn read(payload: &XmlElement) -> Result<Option<Self::Response>, HiError>;
}

/// Caller identity and credentials shared by every constructor.
#[derive(Debug, Clone)]
pub struct ClientSettings<'a> {
    pub product: ProductType,
    pub user: QualifiedId,
    pub hpio: Option<QualifiedId>,
    pub signing: &'a SigningCredential,
    pub tls: &'a TransportCredential,
}

/// Signed SOAP client for service `S` over channel `C`.
pub struct SoapClient<'a, S: Service, C: Channel> {
    identity: ServiceIdentity,
    signer: EnvelopeSigner<'a>,
    binding: Option<ServiceBinding>,
    channel: ChannelGuard<C>,
    last_timestamp: Option<Timestamp>,
    _service: PhantomData<S>,
}

impl<'a, S: Service, C: Channel> SoapClient<'a, S, C> {
    /// Build a client for an explicit endpoint address.
    pub fn with_address<F>(endpoint: &str, settings: ClientSettings<'a>, factory: &F) -> Result<Self, HiError>
    where
        F: ChannelFactory<Channel = C>,
    {
        require(endpoint, "endpoint")?;
        let identity = validate_settings::<S>(&settings)?;
        let endpoint = Url::parse(endpoint)
            .map_err(|e| HiError::Config(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

        let binding = ServiceBinding::for_profile(S::TIMEOUT_PROFILE);
        let channel = factory.create(&endpoint, &binding, settings.tls)?;
        info!(service = S::NAME, endpoint = %endpoint, "Client created");
        Self::from_channel(identity, settings.signing, Some(binding), channel)
    }

    /// Build a client for a named configuration profile.
    pub fn with_profile<F>(profile: &str, settings: ClientSettings<'a>, factory: &F) -> Result<Self, HiError>
    where
        F: ChannelFactory<Channel = C>,
    {
        require(profile, "profile")?;
        let identity = validate_settings::<S>(&settings)?;

        let channel = factory.create_for_profile(profile, settings.tls)?;
        info!(service = S::NAME, profile = %profile, "Client created");
        Self::from_channel(identity, settings.signing, None, channel)
    }

    fn from_channel(
        identity: ServiceIdentity,
        signing: &'a SigningCredential,
        binding: Option<ServiceBinding>,
        channel: C,
    ) -> Result<Self, HiError> {
        let mut channel = ChannelGuard::new(channel);
        channel
            .channel_mut()
            .open()
            .map_err(|e| translate_fault(e, S::NAME))?;

        Ok(Self {
            identity,
            signer: EnvelopeSigner::new(signing),
            binding,
            channel,
            last_timestamp: None,
            _service: PhantomData,
        })
    }

    /// Binding built for an explicit address; `None` for profile clients.
    pub fn binding(&self) -> Option<&ServiceBinding> {
        self.binding.as_ref()
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Timestamp of the most recent request, successful or not.
    pub fn last_request_timestamp(&self) -> Option<&Timestamp> {
        self.last_timestamp.as_ref()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.channel().state()
    }

    pub fn channel(&self) -> &C {
        self.channel.channel()
    }

    /// Invoke one remote operation.
    pub fn call<O>(&mut self, request: &O::Request) -> Result<O::Response, HiError>
    where
        O: SoapOperation<Service = S>,
    {
        O::validate(request)?;
        if self.channel.is_disposed() {
            return Err(HiError::transport(
                "Client is closed",
                format!("{} channel already disposed", S::NAME),
            ));
        }

        let mut w = XmlWriter::new();
        O::write(request, &mut w)?;
        let payload = w.into_string()?;

        let timestamp = Timestamp::now();
        let mut envelope = RequestEnvelope::new(&self.identity, &payload, timestamp)?;
        self.last_timestamp = Some(timestamp);

        self.signer.sign(&mut envelope)?;
        let xml = envelope.to_xml()?;

        debug!(
            service = S::NAME,
            action = O::ACTION,
            created = %timestamp.created_str(),
            "Invoking operation"
        );

        let response = self
            .channel
            .channel_mut()
            .invoke(O::ACTION, &xml)
            .map_err(|e| translate_fault(e, S::NAME))?;

        let envelope = parse_response_envelope(response.as_bytes())
            .map_err(|e| HiError::transport("Malformed response envelope", e))?;
        if let Some(fault) = envelope.fault() {
            return Err(translate_fault(ChannelError::Fault(fault), S::NAME));
        }

        let payload = envelope.payload().ok_or_else(|| {
            HiError::UnexpectedResponse(format!("{} returned an empty body", O::ACTION))
        })?;
        O::read(payload)?.ok_or_else(|| {
            HiError::UnexpectedResponse(format!("{} returned no {}", O::ACTION, payload.name))
        })
    }

    /// Release the channel. Safe to call more than once.
    pub fn close(&mut self) {
        self.channel.dispose();
    }
}

fn validate_settings<S: Service>(settings: &ClientSettings<'_>) -> Result<ServiceIdentity, HiError> {
    ServiceIdentity::new(
        settings.product.clone(),
        settings.user.clone(),
        settings.hpio.clone(),
        S::REQUIRES_HPIO,
    )
}

/// Re-type a channel failure.
///
/// Faults with a service messages block become [`HiError::ServiceFault`];
/// everything else is a transport error wrapping the cause.
pub fn translate_fault(error: ChannelError, service: &str) -> HiError {
    match error {
        ChannelError::Fault(SoapFault {
            code,
            reason,
            service_messages: Some(messages),
        }) => {
            warn!(service = %service, code = %code, messages = %messages, "Service fault");
            HiError::ServiceFault {
                fault_code: code,
                fault_string: reason,
                messages,
            }
        }
        ChannelError::Fault(fault) => {
            warn!(service = %service, code = %fault.code, "SOAP fault without service messages");
            HiError::transport(format!("SOAP fault {}", fault.code), fault)
        }
        ChannelError::Transport { message, source } => {
            warn!(service = %service, error = %message, "Transport failure");
            HiError::Transport { message, source }
        }
    }
}
