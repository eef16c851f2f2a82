//! HI services and their operations.
//!
//! Each service is a marker type implementing [`Service`]; concrete clients
//! are aliases of [`SoapClient`] over those markers.

pub mod ihi_batch;
pub mod provider;

use crate::client::{Service, SoapClient};
use crate::config::TimeoutProfile;
use crate::error::ServiceMessages;
use crate::http::HttpChannel;
use crate::parser::{parse_service_messages, XmlElement};

/// Provider directory search for organisations (HPI-O scoped).
#[derive(Debug, Clone, Copy)]
pub struct ProviderSearchForProviderOrganisation;

impl Service for ProviderSearchForProviderOrganisation {
    const NAME: &'static str = "ProviderSearchForProviderOrganisation";
    const REQUIRES_HPIO: bool = true;
    const TIMEOUT_PROFILE: TimeoutProfile = TimeoutProfile::Interactive;
}

/// Synchronous consumer IHI batch search.
#[derive(Debug, Clone, Copy)]
pub struct ConsumerSearchIhiBatchSync;

impl Service for ConsumerSearchIhiBatchSync {
    const NAME: &'static str = "ConsumerSearchIHIBatchSync";
    const REQUIRES_HPIO: bool = false;
    const TIMEOUT_PROFILE: TimeoutProfile = TimeoutProfile::Batch;
}

/// Asynchronous consumer IHI batch search (submit, status, retrieve, delete).
#[derive(Debug, Clone, Copy)]
pub struct ConsumerSearchIhiBatchAsync;

impl Service for ConsumerSearchIhiBatchAsync {
    const NAME: &'static str = "ConsumerSearchIHIBatchAsync";
    const REQUIRES_HPIO: bool = false;
    const TIMEOUT_PROFILE: TimeoutProfile = TimeoutProfile::Batch;
}

pub type ProviderOrganisationClient<'a, C = HttpChannel> =
    SoapClient<'a, ProviderSearchForProviderOrganisation, C>;
pub type SearchIhiBatchSyncClient<'a, C = HttpChannel> = SoapClient<'a, ConsumerSearchIhiBatchSync, C>;
pub type SearchIhiBatchAsyncClient<'a, C = HttpChannel> = SoapClient<'a, ConsumerSearchIhiBatchAsync, C>;

/// The result element nested in an operation response, if `payload` is that response.
pub(crate) fn unwrap_result<'x>(
    payload: &'x XmlElement,
    response: &str,
    result: &str,
) -> Option<&'x XmlElement> {
    if payload.name != response {
        return None;
    }
    payload.child(result)
}

/// Service messages attached to a result element, if any.
pub(crate) fn messages_of(element: &XmlElement) -> Option<ServiceMessages> {
    element.child("serviceMessages").map(parse_service_messages)
}

pub(crate) fn text_of(element: &XmlElement, name: &str) -> Option<String> {
    element.child_text(name).map(str::to_string)
}
