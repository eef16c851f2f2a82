//! Integration tests for the hi-soap-client crate.
//!
//! These tests drive the public client API end-to-end over a scripted
//! in-memory channel: validation, envelope signing, fault translation and
//! channel disposal together.

use chrono::{Duration, NaiveDate};
use hi_soap_client::channel::{Channel, ChannelError, ChannelFactory, ChannelState};
use hi_soap_client::config::{MessageEncoding, ServiceBinding, TimeoutProfile};
use hi_soap_client::credential::{SignatureProvider, SigningCredential, TransportCredential, RSA_SHA256};
use hi_soap_client::error::{HiError, ServiceMessage, ServiceMessages, Severity};
use hi_soap_client::identity::{ProductType, QualifiedId};
use hi_soap_client::parser::{parse_document, SoapFault};
use hi_soap_client::services::ihi_batch::BatchProcessingStatus;
use hi_soap_client::signer::digest;
use hi_soap_client::{
    ClientSettings, ProviderOrganisationClient, SearchIhi, SearchIhiBatchAsyncClient,
    SearchIhiBatchSyncClient, Sex,
};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use reqwest::Url;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

// ============================================================================
// Helper: scripted channel and factory
// ============================================================================

/// What the scripted channel answers to the next invocation.
enum Reply {
    Body(String),
    Fault(SoapFault),
    Transport(&'static str),
}

/// Shared record of everything the channel and factory saw.
#[derive(Default)]
struct Log {
    factory_calls: Cell<u32>,
    invokes: Cell<u32>,
    closes: Cell<u32>,
    aborts: Cell<u32>,
    /// (SOAPAction, envelope)
    requests: RefCell<Vec<(String, String)>>,
    replies: RefCell<VecDeque<Reply>>,
    last_endpoint: RefCell<Option<String>>,
    last_binding: RefCell<Option<ServiceBinding>>,
}

impl Log {
    fn reply(&self, reply: Reply) {
        self.replies.borrow_mut().push_back(reply);
    }
}

struct ScriptedChannel {
    state: ChannelState,
    log: Rc<Log>,
}

impl Channel for ScriptedChannel {
    fn state(&self) -> ChannelState {
        self.state
    }

    fn open(&mut self) -> Result<(), ChannelError> {
        self.state = ChannelState::Opened;
        Ok(())
    }

    fn invoke(&mut self, action: &str, envelope: &str) -> Result<String, ChannelError> {
        self.log.invokes.set(self.log.invokes.get() + 1);
        self.log
            .requests
            .borrow_mut()
            .push((action.to_string(), envelope.to_string()));

        match self.log.replies.borrow_mut().pop_front() {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Fault(fault)) => Err(ChannelError::Fault(fault)),
            Some(Reply::Transport(cause)) => {
                self.state = ChannelState::Faulted;
                Err(ChannelError::transport("connection reset", cause))
            }
            None => Err(ChannelError::transport("no scripted reply", "empty script")),
        }
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        self.log.closes.set(self.log.closes.get() + 1);
        self.state = ChannelState::Closed;
        Ok(())
    }

    fn abort(&mut self) {
        self.log.aborts.set(self.log.aborts.get() + 1);
        self.state = ChannelState::Closed;
    }
}

type ProviderClient<'a> = ProviderOrganisationClient<'a, ScriptedChannel>;
type SyncClient<'a> = SearchIhiBatchSyncClient<'a, ScriptedChannel>;
type AsyncClient<'a> = SearchIhiBatchAsyncClient<'a, ScriptedChannel>;

struct ScriptedFactory {
    log: Rc<Log>,
}

impl ScriptedFactory {
    fn new() -> (Self, Rc<Log>) {
        let log = Rc::new(Log::default());
        (Self { log: log.clone() }, log)
    }

    fn channel(&self) -> ScriptedChannel {
        self.log.factory_calls.set(self.log.factory_calls.get() + 1);
        ScriptedChannel {
            state: ChannelState::Created,
            log: self.log.clone(),
        }
    }
}

impl ChannelFactory for ScriptedFactory {
    type Channel = ScriptedChannel;

    fn create(
        &self,
        endpoint: &Url,
        binding: &ServiceBinding,
        _tls: &TransportCredential,
    ) -> Result<ScriptedChannel, HiError> {
        *self.log.last_endpoint.borrow_mut() = Some(endpoint.to_string());
        *self.log.last_binding.borrow_mut() = Some(binding.clone());
        Ok(self.channel())
    }

    fn create_for_profile(&self, profile: &str, _tls: &TransportCredential) -> Result<ScriptedChannel, HiError> {
        *self.log.last_endpoint.borrow_mut() = Some(format!("profile:{}", profile));
        Ok(self.channel())
    }
}

// ============================================================================
// Helper: credentials and caller identity
// ============================================================================

/// Predictable signature values so tests need no RSA key.
struct ReversingProvider;

impl SignatureProvider for ReversingProvider {
    fn algorithm(&self) -> &str {
        RSA_SHA256
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, HiError> {
        Ok(data.iter().rev().take(32).copied().collect())
    }
}

fn certificate(name: &str) -> (String, String) {
    let mut params = CertificateParams::default();
    let mut subject = DistinguishedName::new();
    subject.push(DnType::CommonName, name);
    params.distinguished_name = subject;
    let key_pair = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key_pair).unwrap();
    (cert.pem(), key_pair.serialize_pem())
}

struct Credentials {
    signing: SigningCredential,
    tls: TransportCredential,
}

fn credentials() -> Credentials {
    let (signing_cert, _) = certificate("Integration Signer");
    let (tls_cert, tls_key) = certificate("Integration TLS");
    Credentials {
        signing: SigningCredential::with_provider(signing_cert.as_bytes(), Box::new(ReversingProvider))
            .unwrap(),
        tls: TransportCredential::from_pem(tls_cert.as_bytes(), tls_key.as_bytes()).unwrap(),
    }
}

fn settings<'a>(credentials: &'a Credentials, hpio: Option<&str>) -> ClientSettings<'a> {
    ClientSettings {
        product: ProductType {
            organisation: None,
            platform: "linux".to_string(),
            product_name: "Integration".to_string(),
            product_version: "1.0".to_string(),
            vendor: QualifiedId::new("http://ns.electronichealth.net.au/id/hi/vendorid/1.0", "TEST0001"),
        },
        user: QualifiedId::new("http://example.org/id/user", "clerk"),
        hpio: hpio.map(QualifiedId::hpio),
        signing: &credentials.signing,
        tls: &credentials.tls,
    }
}

const ENDPOINT: &str = "https://hi.example.org/soap";

fn search(family_name: &str) -> SearchIhi {
    SearchIhi {
        request_identifier: Some("req-1".to_string()),
        ihi_number: None,
        medicare_card_number: Some("2950 14133 1".to_string()),
        medicare_irn: Some("1".to_string()),
        dva_file_number: None,
        family_name: family_name.to_string(),
        given_name: Some("Frank".to_string()),
        date_of_birth: NaiveDate::from_ymd_opt(1980, 1, 31).unwrap(),
        sex: Sex::Male,
    }
}

fn response(payload: &str) -> String {
    format!(
        r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Header/><soap:Body>{}</soap:Body></soap:Envelope>"#,
        payload
    )
}

fn status_response(status: &str) -> String {
    response(&format!(
        r#"<ib:getSearchIHIBatchStatusResponse xmlns:ib="urn:ib">
  <ib:getSearchIHIBatchStatusResult>
    <ib:batchIdentifier>batch-42</ib:batchIdentifier>
    <ib:processingStatus>{}</ib:processingStatus>
  </ib:getSearchIHIBatchStatusResult>
</ib:getSearchIHIBatchStatusResponse>"#,
        status
    ))
}

/// `created` stamp of the most recent envelope the channel saw.
fn sent_created(log: &Log) -> String {
    let requests = log.requests.borrow();
    let (_, envelope) = requests.last().unwrap();
    let document = parse_document(envelope.as_bytes()).unwrap();
    document
        .find("timestamp")
        .and_then(|t| t.child_text("created"))
        .unwrap()
        .to_string()
}

fn fatal_messages() -> ServiceMessages {
    ServiceMessages::from_messages(vec![ServiceMessage::new(
        "WSE0035",
        Severity::Fatal,
        "The batch identifier is unknown",
    )])
}

// ============================================================================
// Argument validation: fails before any channel work
// ============================================================================

#[test]
fn test_e2e_missing_hpio_never_reaches_factory() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();

    let result = ProviderClient::with_address(ENDPOINT, settings(&creds, None), &factory);

    assert!(matches!(result, Err(HiError::Argument("hpio"))));
    assert_eq!(log.factory_calls.get(), 0);
}

#[test]
fn test_e2e_blank_identity_fields_rejected() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();

    let mut blank_vendor = settings(&creds, None);
    blank_vendor.product.vendor.id = "  ".to_string();
    let result = AsyncClient::with_address(ENDPOINT, blank_vendor, &factory);
    assert!(matches!(result, Err(HiError::Argument("product.vendor.id"))));

    let mut blank_user = settings(&creds, None);
    blank_user.user.id = String::new();
    let result = AsyncClient::with_profile("batch", blank_user, &factory);
    assert!(matches!(result, Err(HiError::Argument("user.id"))));

    let result = AsyncClient::with_address("", settings(&creds, None), &factory);
    assert!(matches!(result, Err(HiError::Argument("endpoint"))));

    assert_eq!(log.factory_calls.get(), 0);
}

#[test]
fn test_e2e_blank_operation_argument_never_invokes() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    let mut client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();

    assert!(matches!(
        client.get_search_ihi_batch_status(" "),
        Err(HiError::Argument("batch_identifier"))
    ));
    assert!(matches!(
        client.submit_search_ihi_batch(&[]),
        Err(HiError::Argument("requests"))
    ));
    assert_eq!(log.invokes.get(), 0);
    assert!(client.last_request_timestamp().is_none());
}

#[test]
fn test_e2e_irn_without_card_number_rejected() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    let mut client = SyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();

    let mut request = search("Citizen");
    request.medicare_card_number = None;
    assert!(matches!(
        client.search_ihi_batch_sync(&[request]),
        Err(HiError::Argument("medicare_card_number"))
    ));
    assert_eq!(log.invokes.get(), 0);
}

// ============================================================================
// Construction: explicit address vs named profile
// ============================================================================

#[test]
fn test_e2e_address_construction_builds_binding() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    let client = SyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();

    let binding = client.binding().unwrap();
    assert!(binding.require_client_certificate);
    assert_eq!(binding.encoding, MessageEncoding::Text);
    assert_eq!(binding.quotas.max_received_message_size, i32::MAX);
    assert_eq!(binding.quotas.max_string_content_length, i32::MAX);
    assert_eq!(binding.timeouts.receive().as_secs(), 600);
    assert_eq!(client.channel_state(), ChannelState::Opened);

    assert_eq!(log.factory_calls.get(), 1);
    assert_eq!(log.last_endpoint.borrow().as_deref(), Some(ENDPOINT));
    assert_eq!(log.last_binding.borrow().as_ref(), Some(binding));
}

#[test]
fn test_e2e_provider_search_uses_interactive_timeouts() {
    let creds = credentials();
    let (factory, _log) = ScriptedFactory::new();
    let client =
        ProviderClient::with_address(ENDPOINT, settings(&creds, Some("8003621234567890")), &factory)
            .unwrap();

    let binding = client.binding().unwrap();
    assert_eq!(binding, &ServiceBinding::for_profile(TimeoutProfile::Interactive));
    assert_eq!(binding.timeouts.receive().as_secs(), 180);
}

#[test]
fn test_e2e_profile_construction_has_no_binding() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    let client = AsyncClient::with_profile("ihi-batch", settings(&creds, None), &factory).unwrap();

    assert!(client.binding().is_none());
    assert_eq!(log.factory_calls.get(), 1);
    assert_eq!(log.last_endpoint.borrow().as_deref(), Some("profile:ihi-batch"));
    assert!(log.last_binding.borrow().is_none());
}

// ============================================================================
// Successful calls: signed envelope and payload unwrapping
// ============================================================================

#[test]
fn test_e2e_batch_status_round_trip() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    log.reply(Reply::Body(status_response("COMPLETED")));

    let mut client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();
    let status = client.get_search_ihi_batch_status("batch-42").unwrap();

    assert_eq!(status.batch_identifier, "batch-42");
    assert_eq!(status.processing_status, BatchProcessingStatus::Completed);
    assert!(status.processing_status.is_complete());

    let requests = log.requests.borrow();
    let (action, envelope) = &requests[0];
    assert!(action.ends_with("getSearchIHIBatchStatusRequest"));
    assert!(envelope.contains("<ib:batchIdentifier>batch-42</ib:batchIdentifier>"));
}

#[test]
fn test_e2e_timestamp_expires_after_thirty_days() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    log.reply(Reply::Body(status_response("PROCESSING")));

    let mut client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();
    client.get_search_ihi_batch_status("batch-42").unwrap();

    let timestamp = *client.last_request_timestamp().unwrap();
    assert_eq!(timestamp.expires - timestamp.created, Duration::days(30));

    let requests = log.requests.borrow();
    let envelope = &requests[0].1;
    assert!(envelope.contains(&format!("<ce:created>{}</ce:created>", timestamp.created_str())));
    assert!(envelope.contains(&format!("<ce:expires>{}</ce:expires>", timestamp.expires_str())));
}

#[test]
fn test_e2e_envelope_signature_covers_body() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    log.reply(Reply::Body(status_response("RECEIVED")));

    let mut client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();
    client.get_search_ihi_batch_status("batch-42").unwrap();

    let requests = log.requests.borrow();
    let wire = &requests[0].1;

    // The body is written verbatim after the header, so its digest can be recomputed
    let start = wire.find("<soap:Body").unwrap();
    let end = wire.find("</soap:Body>").unwrap() + "</soap:Body>".len();
    let body = &wire[start..end];

    let document = parse_document(wire.as_bytes()).unwrap();
    let signed_info = document.find("SignedInfo").unwrap();
    let references: Vec<_> = signed_info.children_named("Reference").collect();
    let uris: Vec<_> = references.iter().filter_map(|r| r.attribute("URI")).collect();
    assert_eq!(uris, vec!["#product", "#user", "#timestamp", "#body"]);

    let body_reference = references
        .iter()
        .find(|r| r.attribute("URI") == Some("#body"))
        .unwrap();
    assert_eq!(body_reference.child_text("DigestValue"), Some(digest(body).as_str()));

    let signature = document.find("Signature").unwrap();
    assert!(signature.child_text("SignatureValue").is_some());
    assert!(signature.find("X509Certificate").is_some());
}

#[test]
fn test_e2e_hpio_header_is_signed_for_provider_search() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    log.reply(Reply::Body(response(
        r#"<p:searchForProviderOrganisationResponse xmlns:p="urn:p">
  <p:searchForProviderOrganisationResult>
    <p:hpioNumber>8003629900000000</p:hpioNumber>
    <p:status>A</p:status>
    <p:organisationName><p:name>Example Clinic</p:name><p:nameType>Business</p:nameType></p:organisationName>
  </p:searchForProviderOrganisationResult>
</p:searchForProviderOrganisationResponse>"#,
    )));

    let mut client =
        ProviderClient::with_address(ENDPOINT, settings(&creds, Some("8003621234567890")), &factory)
            .unwrap();
    let organisation = client.search_for_provider_organisation("8003629900000000").unwrap();
    assert_eq!(organisation.hpio_number, "8003629900000000");
    assert_eq!(organisation.names[0].name, "Example Clinic");

    let requests = log.requests.borrow();
    let document = parse_document(requests[0].1.as_bytes()).unwrap();
    let uris: Vec<_> = document
        .find("SignedInfo")
        .unwrap()
        .children_named("Reference")
        .filter_map(|r| r.attribute("URI"))
        .collect();
    assert!(uris.contains(&"#hpio"));
    assert_eq!(
        document.find("hpio").and_then(|h| h.child_text("id")),
        Some("8003621234567890")
    );
}

#[test]
fn test_e2e_batch_sync_maps_requests_and_results() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    log.reply(Reply::Body(response(
        r#"<is:searchIHIBatchSyncResponse xmlns:is="urn:is">
  <is:searchIHIBatchResponse>
    <is:searchIHIBatchResult>
      <is:requestIdentifier>req-1</is:requestIdentifier>
      <is:searchIHIResult>
        <is:ihiNumber>8003608166690503</is:ihiNumber>
        <is:ihiRecordStatus>Verified</is:ihiRecordStatus>
        <is:ihiStatus>Active</is:ihiStatus>
        <is:familyName>Citizen</is:familyName>
        <is:sex>M</is:sex>
      </is:searchIHIResult>
    </is:searchIHIBatchResult>
  </is:searchIHIBatchResponse>
</is:searchIHIBatchSyncResponse>"#,
    )));

    let mut client = SyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();
    let results = client.search_ihi_batch_sync(&[search(" Citizen ")]).unwrap();

    assert_eq!(results.len(), 1);
    let record = results[0].record.as_ref().unwrap();
    assert_eq!(results[0].request_identifier, "req-1");
    assert_eq!(record.ihi_number, "8003608166690503");
    assert_eq!(record.sex, Some(Sex::Male));

    let requests = log.requests.borrow();
    let envelope = &requests[0].1;
    assert!(envelope.contains("<is:medicareCardNumber>2950141331</is:medicareCardNumber>"));
    assert!(envelope.contains("<is:familyName>Citizen</is:familyName>"));
    assert!(envelope.contains("<is:dateOfBirth>1980-01-31</is:dateOfBirth>"));
}

#[test]
fn test_e2e_missing_inner_result_is_unexpected() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    log.reply(Reply::Body(response(
        r#"<ib:getSearchIHIBatchStatusResponse xmlns:ib="urn:ib"></ib:getSearchIHIBatchStatusResponse>"#,
    )));
    log.reply(Reply::Body(response("")));

    let mut client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();
    assert!(matches!(
        client.get_search_ihi_batch_status("batch-42"),
        Err(HiError::UnexpectedResponse(_))
    ));
    assert!(matches!(
        client.get_search_ihi_batch_status("batch-42"),
        Err(HiError::UnexpectedResponse(_))
    ));
}

// ============================================================================
// Fault translation
// ============================================================================

#[test]
fn test_e2e_service_fault_keeps_detail() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    log.reply(Reply::Fault(SoapFault {
        code: "soap:Server".to_string(),
        reason: "Batch rejected".to_string(),
        service_messages: Some(fatal_messages()),
    }));

    let mut client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();
    let error = client.delete_search_ihi_batch("batch-42").unwrap_err();

    match &error {
        HiError::ServiceFault {
            fault_code,
            fault_string,
            messages,
        } => {
            assert_eq!(fault_code, "soap:Server");
            assert_eq!(fault_string, "Batch rejected");
            assert_eq!(messages.highest_severity, Severity::Fatal);
            assert_eq!(messages.messages[0].code, "WSE0035");
        }
        other => panic!("expected service fault, got {:?}", other),
    }
    assert!(!error.is_retryable());
    assert_eq!(error.service_messages(), Some(&fatal_messages()));

    // Timestamp is recorded even when the call fails
    assert_eq!(
        client.last_request_timestamp().map(|t| t.created_str()),
        Some(sent_created(&log))
    );
    // Faults leave the channel usable
    assert_eq!(client.channel_state(), ChannelState::Opened);
}

#[test]
fn test_e2e_fault_in_success_body_is_translated() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    log.reply(Reply::Body(response(
        r#"<soap:Fault>
  <faultcode>soap:Server</faultcode>
  <faultstring>Invalid HPI-O</faultstring>
  <detail>
    <ce:serviceMessages xmlns:ce="urn:ce">
      <ce:highestSeverity>Error</ce:highestSeverity>
      <ce:serviceMessage>
        <ce:code>01439</ce:code>
        <ce:severity>Error</ce:severity>
        <ce:reason>HPI-O not found</ce:reason>
      </ce:serviceMessage>
    </ce:serviceMessages>
  </detail>
</soap:Fault>"#,
    )));

    let mut client =
        ProviderClient::with_address(ENDPOINT, settings(&creds, Some("8003621234567890")), &factory)
            .unwrap();
    let error = client.search_for_provider_organisation("8003620000000000").unwrap_err();

    let messages = error.service_messages().unwrap();
    assert_eq!(messages.highest_severity, Severity::Error);
    assert_eq!(messages.messages[0].reason, "HPI-O not found");
}

#[test]
fn test_e2e_transport_failure_wraps_cause() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    log.reply(Reply::Transport("tls handshake failed"));

    let mut client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();
    let error = client.retrieve_search_ihi_batch("batch-42").unwrap_err();

    assert!(error.is_retryable());
    match &error {
        HiError::Transport { message, source } => {
            assert_eq!(message, "connection reset");
            assert_eq!(source.to_string(), "tls handshake failed");
        }
        other => panic!("expected transport error, got {:?}", other),
    }
    assert_eq!(
        client.last_request_timestamp().map(|t| t.created_str()),
        Some(sent_created(&log))
    );
    assert_eq!(client.channel_state(), ChannelState::Faulted);
}

#[test]
fn test_e2e_malformed_response_is_transport() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    log.reply(Reply::Body("<not-closed>".to_string()));

    let mut client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();
    assert!(matches!(
        client.get_search_ihi_batch_status("batch-42"),
        Err(HiError::Transport { .. })
    ));
}

#[test]
fn test_e2e_deeply_nested_response_is_transport() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    let depth = 100_000;
    log.reply(Reply::Body(response(&format!(
        "{}{}",
        "<a>".repeat(depth),
        "</a>".repeat(depth)
    ))));

    let mut client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();
    assert!(matches!(
        client.get_search_ihi_batch_status("batch-42"),
        Err(HiError::Transport { .. })
    ));
}

// ============================================================================
// Disposal
// ============================================================================

#[test]
fn test_e2e_close_is_idempotent() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    let mut client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();

    client.close();
    client.close();
    drop(client);

    assert_eq!(log.closes.get(), 1);
    assert_eq!(log.aborts.get(), 0);
}

#[test]
fn test_e2e_call_after_close_fails_without_invoke() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    let mut client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();

    client.close();
    assert!(matches!(
        client.get_search_ihi_batch_status("batch-42"),
        Err(HiError::Transport { .. })
    ));
    assert_eq!(log.invokes.get(), 0);
}

#[test]
fn test_e2e_faulted_channel_is_aborted_on_drop() {
    let creds = credentials();
    let (factory, log) = ScriptedFactory::new();
    log.reply(Reply::Transport("broken pipe"));

    {
        let mut client =
            AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();
        let _ = client.get_search_ihi_batch_status("batch-42");
    }

    assert_eq!(log.aborts.get(), 1);
    assert_eq!(log.closes.get(), 0);
}

#[test]
fn test_e2e_credentials_outlive_clients() {
    let creds = credentials();
    let (factory, _log) = ScriptedFactory::new();
    for _ in 0..2 {
        let client = AsyncClient::with_address(ENDPOINT, settings(&creds, None), &factory).unwrap();
        drop(client);
    }
    assert!(creds.signing.info().subject.contains("Integration Signer"));
    assert!(creds.tls.identity().is_ok());
}
