use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::present;

/// Request body for creating a vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorParameters {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Weight of an empty container from this vendor, in grams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_container_weight: Option<f64>,
}

/// Request body for a partial vendor update.
///
/// Absent keys are left untouched; `null` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorUpdateParameters {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub comment: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub empty_container_weight: Option<Option<f64>>,
}

/// Vendor snapshot as returned by the API and carried in change events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorResponse {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub registered: OffsetDateTime,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_container_weight: Option<f64>,
}
