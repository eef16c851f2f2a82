//! Provider directory search for organisations.

use super::{messages_of, text_of, unwrap_result, ProviderSearchForProviderOrganisation};
use crate::channel::Channel;
use crate::client::{SoapClient, SoapOperation};
use crate::error::{HiError, ServiceMessages};
use crate::identity::require;
use crate::parser::XmlElement;
use crate::xml::XmlWriter;

pub const PROVIDER_SEARCH_NS: &str =
    "http://ns.electronichealth.net.au/hi/svc/ProviderSearchForProviderOrganisation/5.0";

/// A name recorded against an organisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganisationName {
    pub name: String,
    /// e.g. `Legal`, `Business`
    pub name_type: Option<String>,
}

/// Organisation details returned by the provider directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOrganisation {
    pub hpio_number: String,
    /// Identifier status (`A`ctive, `D`eactivated, `R`etired)
    pub status: Option<String>,
    pub organisation_type: Option<String>,
    pub names: Vec<OrganisationName>,
    pub service_messages: Option<ServiceMessages>,
}

/// `searchForProviderOrganisation`: look up one organisation by HPI-O.
pub struct SearchForProviderOrganisation;

impl SoapOperation for SearchForProviderOrganisation {
    type Service = ProviderSearchForProviderOrganisation;
    type Request = str;
    type Response = ProviderOrganisation;

    const ACTION: &'static str =
        "http://ns.electronichealth.net.au/hi/svc/ProviderSearchForProviderOrganisation/5.0/ProviderSearchForProviderOrganisationPortType/searchForProviderOrganisationRequest";

    fn validate(hpio_number: &str) -> Result<(), HiError> {
        require(hpio_number, "hpio_number")
    }

    fn write(hpio_number: &str, w: &mut XmlWriter) -> Result<(), HiError> {
        w.start(
            "ps:searchForProviderOrganisation",
            &[("xmlns:ps", PROVIDER_SEARCH_NS)],
        )?;
        w.element("ps:hpioNumber", hpio_number.trim())?;
        w.end("ps:searchForProviderOrganisation")
    }

    fn read(payload: &XmlElement) -> Result<Option<ProviderOrganisation>, HiError> {
        let result = match unwrap_result(
            payload,
            "searchForProviderOrganisationResponse",
            "searchForProviderOrganisationResult",
        ) {
            Some(result) => result,
            None => return Ok(None),
        };
        let hpio_number = match text_of(result, "hpioNumber") {
            Some(hpio) => hpio,
            None => return Ok(None),
        };

        Ok(Some(ProviderOrganisation {
            hpio_number,
            status: text_of(result, "status"),
            organisation_type: text_of(result, "organisationType"),
            names: result
                .children_named("organisationName")
                .filter_map(|n| {
                    Some(OrganisationName {
                        name: text_of(n, "name")?,
                        name_type: text_of(n, "nameType"),
                    })
                })
                .collect(),
            service_messages: messages_of(result),
        }))
    }
}

impl<C: Channel> SoapClient<'_, ProviderSearchForProviderOrganisation, C> {
    /// Search the provider directory for an organisation.
    pub fn search_for_provider_organisation(
        &mut self,
        hpio_number: &str,
    ) -> Result<ProviderOrganisation, HiError> {
        self.call::<SearchForProviderOrganisation>(hpio_number)
    }
}
