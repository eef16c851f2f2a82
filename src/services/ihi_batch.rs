//! Consumer IHI batch search, synchronous and asynchronous.
//!
//! A batch is a single remote call carrying many search requests; nothing is
//! queued locally.

use super::{
    messages_of, text_of, unwrap_result, ConsumerSearchIhiBatchAsync, ConsumerSearchIhiBatchSync,
};
use crate::channel::Channel;
use crate::client::{SoapClient, SoapOperation};
use crate::error::{HiError, ServiceMessages};
use crate::identity::require;
use crate::mapping::{map_search_requests, SearchIhi, SearchIhiRequestItem, Sex};
use crate::parser::XmlElement;
use crate::xml::XmlWriter;

pub const BATCH_SYNC_NS: &str =
    "http://ns.electronichealth.net.au/hi/svc/ConsumerSearchIHIBatchSync/3.0";
pub const BATCH_ASYNC_NS: &str =
    "http://ns.electronichealth.net.au/hi/svc/ConsumerSearchIHIBatchAsync/3.0";

/// IHI details returned for a matched search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IhiRecord {
    pub ihi_number: String,
    /// `Verified`, `Unverified`, `Provisional`
    pub record_status: Option<String>,
    /// `Active`, `Deceased`, `Retired`, ...
    pub status: Option<String>,
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub sex: Option<Sex>,
}

/// Outcome of one search within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIhiResult {
    pub request_identifier: String,
    /// `None` when the search found no match
    pub record: Option<IhiRecord>,
    pub service_messages: Option<ServiceMessages>,
}

/// Processing state of an asynchronous batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchProcessingStatus {
    Received,
    Processing,
    Completed,
    Error,
    Other(String),
}

impl BatchProcessingStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "RECEIVED" | "NOT_STARTED" => Self::Received,
            "PROCESSING" | "IN_PROGRESS" => Self::Processing,
            "COMPLETED" => Self::Completed,
            "ERROR" => Self::Error,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Acknowledgement of a submitted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSubmission {
    pub batch_identifier: String,
    pub service_messages: Option<ServiceMessages>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchStatus {
    pub batch_identifier: String,
    pub processing_status: BatchProcessingStatus,
    pub submitted: Option<String>,
    pub completed: Option<String>,
    pub service_messages: Option<ServiceMessages>,
}

/// Results of a completed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRetrieval {
    pub batch_identifier: String,
    pub processing_status: Option<BatchProcessingStatus>,
    pub results: Vec<SearchIhiResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDeletion {
    pub batch_identifier: String,
    pub status: Option<String>,
    pub service_messages: Option<ServiceMessages>,
}

// ============================================================================
// Request validation and writing
// ============================================================================

fn validate_searches(requests: &[SearchIhi]) -> Result<(), HiError> {
    if requests.is_empty() {
        return Err(HiError::Argument("requests"));
    }
    for request in requests {
        require(&request.family_name, "family_name")?;
        let has_irn = request
            .medicare_irn
            .as_deref()
            .is_some_and(|irn| !irn.trim().is_empty());
        let has_card = request
            .medicare_card_number
            .as_deref()
            .is_some_and(|card| !card.trim().is_empty());
        if has_irn && !has_card {
            return Err(HiError::Argument("medicare_card_number"));
        }
    }
    Ok(())
}

fn write_search_items(prefix: &str, items: &[SearchIhiRequestItem], w: &mut XmlWriter) -> Result<(), HiError> {
    let el = |name: &str| format!("{}:{}", prefix, name);
    for item in items {
        let search = &item.search;
        w.start(&el("searchIHIBatchRequest"), &[])?;
        w.element(&el("requestIdentifier"), &item.request_identifier)?;
        w.start(&el("searchIHI"), &[])?;
        w.optional(&el("ihiNumber"), search.ihi_number.as_deref())?;
        w.optional(&el("medicareCardNumber"), search.medicare_card_number.as_deref())?;
        w.optional(&el("medicareIRN"), search.medicare_irn.as_deref())?;
        w.optional(&el("dvaFileNumber"), search.dva_file_number.as_deref())?;
        w.element(&el("dateOfBirth"), &search.date_of_birth)?;
        w.element(&el("sex"), search.sex)?;
        w.element(&el("familyName"), &search.family_name)?;
        w.optional(&el("givenName"), search.given_name.as_deref())?;
        w.end(&el("searchIHI"))?;
        w.end(&el("searchIHIBatchRequest"))?;
    }
    Ok(())
}

fn write_batch_identifier(operation: &str, batch_identifier: &str, w: &mut XmlWriter) -> Result<(), HiError> {
    let root = format!("ib:{}", operation);
    w.start(&root, &[("xmlns:ib", BATCH_ASYNC_NS)])?;
    w.element("ib:batchIdentifier", batch_identifier.trim())?;
    w.end(&root)
}

// ============================================================================
// Response reading
// ============================================================================

fn read_results(container: &XmlElement) -> Vec<SearchIhiResult> {
    container
        .children_named("searchIHIBatchResult")
        .map(|result| SearchIhiResult {
            request_identifier: text_of(result, "requestIdentifier").unwrap_or_default(),
            record: result.child("searchIHIResult").and_then(read_record),
            service_messages: messages_of(result),
        })
        .collect()
}

fn read_record(element: &XmlElement) -> Option<IhiRecord> {
    Some(IhiRecord {
        ihi_number: text_of(element, "ihiNumber")?,
        record_status: text_of(element, "ihiRecordStatus"),
        status: text_of(element, "ihiStatus"),
        family_name: text_of(element, "familyName"),
        given_name: text_of(element, "givenName"),
        date_of_birth: text_of(element, "dateOfBirth"),
        sex: element.child_text("sex").and_then(Sex::from_code),
    })
}

// ============================================================================
// Operations
// ============================================================================

/// `searchIHIBatchSync`: search many IHIs in one blocking call.
pub struct SearchIhiBatchSync;

impl SoapOperation for SearchIhiBatchSync {
    type Service = ConsumerSearchIhiBatchSync;
    type Request = [SearchIhi];
    type Response = Vec<SearchIhiResult>;

    const ACTION: &'static str =
        "http://ns.electronichealth.net.au/hi/svc/ConsumerSearchIHIBatchSync/3.0/ConsumerSearchIHIBatchSyncPortType/searchIHIBatchSyncRequest";

    fn validate(requests: &[SearchIhi]) -> Result<(), HiError> {
        validate_searches(requests)
    }

    fn write(requests: &[SearchIhi], w: &mut XmlWriter) -> Result<(), HiError> {
        w.start("is:searchIHIBatchSync", &[("xmlns:is", BATCH_SYNC_NS)])?;
        write_search_items("is", &map_search_requests(requests), w)?;
        w.end("is:searchIHIBatchSync")
    }

    fn read(payload: &XmlElement) -> Result<Option<Vec<SearchIhiResult>>, HiError> {
        Ok(unwrap_result(payload, "searchIHIBatchSyncResponse", "searchIHIBatchResponse").map(read_results))
    }
}

/// `submitSearchIHIBatch`: queue a batch on the service for later retrieval.
pub struct SubmitSearchIhiBatch;

impl SoapOperation for SubmitSearchIhiBatch {
    type Service = ConsumerSearchIhiBatchAsync;
    type Request = [SearchIhi];
    type Response = BatchSubmission;

    const ACTION: &'static str =
        "http://ns.electronichealth.net.au/hi/svc/ConsumerSearchIHIBatchAsync/3.0/ConsumerSearchIHIBatchAsyncPortType/submitSearchIHIBatchRequest";

    fn validate(requests: &[SearchIhi]) -> Result<(), HiError> {
        validate_searches(requests)
    }

    fn write(requests: &[SearchIhi], w: &mut XmlWriter) -> Result<(), HiError> {
        w.start("ib:submitSearchIHIBatch", &[("xmlns:ib", BATCH_ASYNC_NS)])?;
        write_search_items("ib", &map_search_requests(requests), w)?;
        w.end("ib:submitSearchIHIBatch")
    }

    fn read(payload: &XmlElement) -> Result<Option<BatchSubmission>, HiError> {
        let result = unwrap_result(payload, "submitSearchIHIBatchResponse", "submitSearchIHIBatchResult");
        Ok(result.and_then(|r| {
            Some(BatchSubmission {
                batch_identifier: text_of(r, "batchIdentifier")?,
                service_messages: messages_of(r),
            })
        }))
    }
}

/// `getSearchIHIBatchStatus`
pub struct GetSearchIhiBatchStatus;

impl SoapOperation for GetSearchIhiBatchStatus {
    type Service = ConsumerSearchIhiBatchAsync;
    type Request = str;
    type Response = BatchStatus;

    const ACTION: &'static str =
        "http://ns.electronichealth.net.au/hi/svc/ConsumerSearchIHIBatchAsync/3.0/ConsumerSearchIHIBatchAsyncPortType/getSearchIHIBatchStatusRequest";

    fn validate(batch_identifier: &str) -> Result<(), HiError> {
        require(batch_identifier, "batch_identifier")
    }

    fn write(batch_identifier: &str, w: &mut XmlWriter) -> Result<(), HiError> {
        write_batch_identifier("getSearchIHIBatchStatus", batch_identifier, w)
    }

    fn read(payload: &XmlElement) -> Result<Option<BatchStatus>, HiError> {
        let result = unwrap_result(payload, "getSearchIHIBatchStatusResponse", "getSearchIHIBatchStatusResult");
        Ok(result.and_then(|r| {
            Some(BatchStatus {
                batch_identifier: text_of(r, "batchIdentifier")?,
                processing_status: BatchProcessingStatus::parse(r.child_text("processingStatus")?),
                submitted: text_of(r, "submittedTime"),
                completed: text_of(r, "completedTime"),
                service_messages: messages_of(r),
            })
        }))
    }
}

/// `retrieveSearchIHIBatch`
pub struct RetrieveSearchIhiBatch;

impl SoapOperation for RetrieveSearchIhiBatch {
    type Service = ConsumerSearchIhiBatchAsync;
    type Request = str;
    type Response = BatchRetrieval;

    const ACTION: &'static str =
        "http://ns.electronichealth.net.au/hi/svc/ConsumerSearchIHIBatchAsync/3.0/ConsumerSearchIHIBatchAsyncPortType/retrieveSearchIHIBatchRequest";

    fn validate(batch_identifier: &str) -> Result<(), HiError> {
        require(batch_identifier, "batch_identifier")
    }

    fn write(batch_identifier: &str, w: &mut XmlWriter) -> Result<(), HiError> {
        write_batch_identifier("retrieveSearchIHIBatch", batch_identifier, w)
    }

    fn read(payload: &XmlElement) -> Result<Option<BatchRetrieval>, HiError> {
        let result = unwrap_result(payload, "retrieveSearchIHIBatchResponse", "retrieveSearchIHIBatchResult");
        Ok(result.and_then(|r| {
            Some(BatchRetrieval {
                batch_identifier: text_of(r, "batchIdentifier")?,
                processing_status: r.child_text("processingStatus").map(BatchProcessingStatus::parse),
                results: read_results(r),
            })
        }))
    }
}

/// `deleteSearchIHIBatch`
pub struct DeleteSearchIhiBatch;

impl SoapOperation for DeleteSearchIhiBatch {
    type Service = ConsumerSearchIhiBatchAsync;
    type Request = str;
    type Response = BatchDeletion;

    const ACTION: &'static str =
        "http://ns.electronichealth.net.au/hi/svc/ConsumerSearchIHIBatchAsync/3.0/ConsumerSearchIHIBatchAsyncPortType/deleteSearchIHIBatchRequest";

    fn validate(batch_identifier: &str) -> Result<(), HiError> {
        require(batch_identifier, "batch_identifier")
    }

    fn write(batch_identifier: &str, w: &mut XmlWriter) -> Result<(), HiError> {
        write_batch_identifier("deleteSearchIHIBatch", batch_identifier, w)
    }

    fn read(payload: &XmlElement) -> Result<Option<BatchDeletion>, HiError> {
        let result = unwrap_result(payload, "deleteSearchIHIBatchResponse", "deleteSearchIHIBatchResult");
        Ok(result.and_then(|r| {
            Some(BatchDeletion {
                batch_identifier: text_of(r, "batchIdentifier")?,
                status: text_of(r, "status"),
                service_messages: messages_of(r),
            })
        }))
    }
}

impl<C: Channel> SoapClient<'_, ConsumerSearchIhiBatchSync, C> {
    pub fn search_ihi_batch_sync(&mut self, requests: &[SearchIhi]) -> Result<Vec<SearchIhiResult>, HiError> {
        self.call::<SearchIhiBatchSync>(requests)
    }
}

impl<C: Channel> SoapClient<'_, ConsumerSearchIhiBatchAsync, C> {
    pub fn submit_search_ihi_batch(&mut self, requests: &[SearchIhi]) -> Result<BatchSubmission, HiError> {
        self.call::<SubmitSearchIhiBatch>(requests)
    }

    pub fn get_search_ihi_batch_status(&mut self, batch_identifier: &str) -> Result<BatchStatus, HiError> {
        self.call::<GetSearchIhiBatchStatus>(batch_identifier)
    }

    pub fn retrieve_search_ihi_batch(&mut self, batch_identifier: &str) -> Result<BatchRetrieval, HiError> {
        self.call::<RetrieveSearchIhiBatch>(batch_identifier)
    }

    pub fn delete_search_ihi_batch(&mut self, batch_identifier: &str) -> Result<BatchDeletion, HiError> {
        self.call::<DeleteSearchIhiBatch>(batch_identifier)
    }
}
