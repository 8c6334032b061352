use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::present;
use super::vendor::VendorResponse;

/// Request body for creating a material type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTypeParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<i64>,
    /// Material class label, e.g. "ABS-like".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Density in g/cm³.
    pub density: f64,
    /// Cross-section diameter in mm.
    pub diameter: f64,
    /// Net weight of a full container, in grams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Weight of the empty container, in grams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Curing temperature, in °C.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cure_temp: Option<i32>,
    /// Curing time, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cure_time: Option<i32>,
    /// Washing time, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wash_time: Option<i32>,
    /// Hex RGB or RGBA color, with or without a leading `#`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
}

/// Request body for a partial material type update.
///
/// Absent keys are left untouched; `null` clears the field. `density` and
/// `diameter` cannot be cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialTypeUpdateParameters {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub material: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub density: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub diameter: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub weight: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub container_weight: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub article_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub comment: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub cure_temp: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub cure_time: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub wash_time: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<Option<String>>,
}

/// Material type snapshot, with its vendor embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTypeResponse {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub registered: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<VendorResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub density: f64,
    pub diameter: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cure_temp: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cure_time: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wash_time: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
}
