//! Mapping from caller-facing request shapes to wire request shapes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Administrative sex as recorded against an IHI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "I")]
    Intersex,
    #[serde(rename = "N")]
    NotStated,
}

impl Sex {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Intersex => "I",
            Self::NotStated => "N",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            "I" => Some(Self::Intersex),
            "N" => Some(Self::NotStated),
            _ => None,
        }
    }
}

/// One IHI search as callers describe it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIhi {
    /// Caller correlation id; generated when absent
    #[serde(default)]
    pub request_identifier: Option<String>,
    #[serde(default)]
    pub ihi_number: Option<String>,
    #[serde(default)]
    pub medicare_card_number: Option<String>,
    /// Individual reference number on the Medicare card
    #[serde(default)]
    pub medicare_irn: Option<String>,
    #[serde(default)]
    pub dva_file_number: Option<String>,
    pub family_name: String,
    #[serde(default)]
    pub given_name: Option<String>,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
}

/// Search fields in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireSearchIhi {
    pub ihi_number: Option<String>,
    pub medicare_card_number: Option<String>,
    pub medicare_irn: Option<String>,
    pub dva_file_number: Option<String>,
    /// `YYYY-MM-DD`
    pub date_of_birth: String,
    /// Single-letter code
    pub sex: &'static str,
    pub family_name: String,
    pub given_name: Option<String>,
}

/// One entry of a batch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIhiRequestItem {
    pub request_identifier: String,
    pub search: WireSearchIhi,
}

impl From<&SearchIhi> for SearchIhiRequestItem {
    fn from(request: &SearchIhi) -> Self {
        Self {
            request_identifier: request
                .request_identifier
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            search: WireSearchIhi {
                ihi_number: clean(&request.ihi_number),
                medicare_card_number: clean(&request.medicare_card_number),
                medicare_irn: clean(&request.medicare_irn),
                dva_file_number: clean(&request.dva_file_number),
                date_of_birth: request.date_of_birth.format("%Y-%m-%d").to_string(),
                sex: request.sex.code(),
                family_name: request.family_name.trim().to_string(),
                given_name: clean(&request.given_name),
            },
        }
    }
}

/// Map a caller request list into batch request items, preserving order.
pub fn map_search_requests(requests: &[SearchIhi]) -> Vec<SearchIhiRequestItem> {
    requests.iter().map(SearchIhiRequestItem::from).collect()
}

/// Trim, and treat blank values as absent. Spaces inside card numbers are dropped.
fn clean(value: &Option<String>) -> Option<String> {
    let words: Vec<&str> = value.as_deref()?.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }
    let numeric = words.iter().all(|w| w.chars().all(|c| c.is_ascii_digit()));
    Some(if numeric { words.concat() } else { words.join(" ") })
}
