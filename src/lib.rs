//! Signed SOAP clients for the Healthcare Identifiers (HI) service.
//!
//! Every client shares one call path: validate arguments, stamp a request
//! envelope with the caller identity and a timestamp, sign it, send it over a
//! mutual-TLS channel and translate faults into [`HiError`].
//!
//! # Features
//!
//! - Provider directory search for organisations (HPI-O scoped)
//! - Consumer IHI batch search, synchronous and asynchronous
//! - XML-DSig envelope signing with a caller-owned certificate
//! - Typed fault translation (`ServiceFault` vs `Transport`)
//! - Guaranteed channel release on drop
//!
//! # Example
//!
//! ```ignore
//! use hi_soap_client::{ClientSettings, HttpChannelFactory, SearchIhiBatchAsyncClient};
//!
//! let factory = HttpChannelFactory::default();
//! let mut client = SearchIhiBatchAsyncClient::with_address(
//!     "https://hi.example.org/ihi-batch",
//!     settings,
//!     &factory,
//! )?;
//! let status = client.get_search_ihi_batch_status("3f2a...")?;
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod credential;
pub mod envelope;
pub mod error;
pub mod http;
pub mod identity;
pub mod mapping;
pub mod parser;
pub mod services;
pub mod signer;
pub mod xml;

pub use channel::{Channel, ChannelError, ChannelFactory, ChannelState};
pub use client::{ClientSettings, Service, SoapClient, SoapOperation};
pub use config::{HiClientConfig, ServiceBinding, TimeoutProfile};
pub use credential::{SigningCredential, TransportCredential};
pub use error::{HiError, ServiceMessage, ServiceMessages, Severity};
pub use http::{HttpChannel, HttpChannelFactory};
pub use identity::{ProductType, QualifiedId, ServiceIdentity, Timestamp};
pub use mapping::{SearchIhi, Sex};
pub use services::{
    ProviderOrganisationClient, SearchIhiBatchAsyncClient, SearchIhiBatchSyncClient,
};
