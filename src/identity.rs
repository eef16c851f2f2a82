//! Caller identity and envelope timestamps.

use crate::error::HiError;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Qualifier used for HPI-O identifiers.
pub const HPIO_QUALIFIER: &str = "http://ns.electronichealth.net.au/id/hi/hpio/1.0";

/// How long a request envelope stays valid after creation.
pub const REQUEST_VALIDITY_DAYS: i64 = 30;

/// Product descriptor sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    /// HPI-O of the organisation that owns the product, if registered
    #[serde(default)]
    pub organisation: Option<String>,
    /// Platform the product runs on
    pub platform: String,
    pub product_name: String,
    pub product_version: String,
    /// Vendor qualifier and identifier
    pub vendor: QualifiedId,
}

impl ProductType {
    pub(crate) fn validate(&self) -> Result<(), HiError> {
        require(&self.platform, "product.platform")?;
        require(&self.product_name, "product.product_name")?;
        require(&self.product_version, "product.product_version")?;
        require(&self.vendor.qualifier, "product.vendor.qualifier")?;
        require(&self.vendor.id, "product.vendor.id")?;
        Ok(())
    }
}

/// An identifier scoped by a qualifier URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedId {
    pub qualifier: String,
    pub id: String,
}

impl QualifiedId {
    pub fn new(qualifier: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            id: id.into(),
        }
    }

    /// An HPI-O number with the standard qualifier.
    pub fn hpio(number: impl Into<String>) -> Self {
        Self::new(HPIO_QUALIFIER, number)
    }
}

/// Identity fields stamped into every envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub product: ProductType,
    /// Calling user
    pub user: QualifiedId,
    /// Organisation scope (required for organisation-scoped services)
    pub hpio: Option<QualifiedId>,
}

impl ServiceIdentity {
    /// Validate and build an identity.
    pub fn new(
        product: ProductType,
        user: QualifiedId,
        hpio: Option<QualifiedId>,
        requires_hpio: bool,
    ) -> Result<Self, HiError> {
        product.validate()?;
        require(&user.qualifier, "user.qualifier")?;
        require(&user.id, "user.id")?;
        match &hpio {
            Some(h) => {
                require(&h.qualifier, "hpio.qualifier")?;
                require(&h.id, "hpio.id")?;
            }
            None if requires_hpio => return Err(HiError::Argument("hpio")),
            None => {}
        }
        Ok(Self { product, user, hpio })
    }
}

/// Creation and expiry stamp of a request envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl Timestamp {
    /// Stamp with the current wall clock.
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Stamp with an explicit creation time.
    pub fn at(created: DateTime<Utc>) -> Self {
        Self {
            created,
            expires: created + Duration::days(REQUEST_VALIDITY_DAYS),
        }
    }

    pub fn created_str(&self) -> String {
        self.created.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn expires_str(&self) -> String {
        self.expires.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Fail with an argument error if `value` is blank.
pub(crate) fn require(value: &str, name: &'static str) -> Result<(), HiError> {
    if value.trim().is_empty() {
        Err(HiError::Argument(name))
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn product() -> ProductType {
        ProductType {
            organisation: None,
            platform: "Linux".to_string(),
            product_name: "hi-soap-client".to_string(),
            product_version: "0.1.0".to_string(),
            vendor: QualifiedId::new("http://ns.electronichealth.net.au/id/hi/vendorid/1.0", "ABCD1234"),
        }
    }

    pub(crate) fn user() -> QualifiedId {
        QualifiedId::new("http://ns.example.org/id/user/1.0", "jsmith")
    }

    #[test]
    fn test_timestamp_expiry() {
        let created = Utc.with_ymd_and_hms(2024, 2, 10, 8, 30, 0).unwrap();
        let ts = Timestamp::at(created);
        assert_eq!(ts.expires - ts.created, Duration::days(30));
        assert_eq!(ts.created_str(), "2024-02-10T08:30:00.000Z");
        assert_eq!(ts.expires_str(), "2024-03-11T08:30:00.000Z");
    }

    #[test]
    fn test_identity_requires_user() {
        let err = ServiceIdentity::new(product(), QualifiedId::new("q", " "), None, false).unwrap_err();
        assert!(matches!(err, HiError::Argument("user.id")));
    }

    #[test]
    fn test_identity_requires_product_fields() {
        let mut p = product();
        p.vendor.id = String::new();
        let err = ServiceIdentity::new(p, user(), None, false).unwrap_err();
        assert!(matches!(err, HiError::Argument("product.vendor.id")));
    }

    #[test]
    fn test_hpio_required_for_organisation_scope() {
        let err = ServiceIdentity::new(product(), user(), None, true).unwrap_err();
        assert!(matches!(err, HiError::Argument("hpio")));

        let identity =
            ServiceIdentity::new(product(), user(), Some(QualifiedId::hpio("8003621234567890")), true)
                .unwrap();
        assert_eq!(identity.hpio.unwrap().qualifier, HPIO_QUALIFIER);
    }

    #[test]
    fn test_hpio_optional_otherwise() {
        assert!(ServiceIdentity::new(product(), user(), None, false).is_ok());
    }
}
