use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::material_type::MaterialTypeResponse;
use super::{present, rfc3339_patch};

/// Request body for creating a container.
///
/// Only one of `remaining_weight` and `used_weight` may be given. With
/// neither, the container is assumed to be full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerParameters {
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub first_used: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_used: Option<OffsetDateTime>,
    pub material_type_id: i64,
    /// Remaining net weight, in grams. Requires the material type to declare
    /// a full-container weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_weight: Option<f64>,
    /// Used weight, in grams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Vendor manufacturing lot / batch number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_nr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

/// Request body for a partial container update.
///
/// Absent keys are left untouched; `null` clears the field.
/// `material_type_id` cannot be cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerUpdateParameters {
    #[serde(default, with = "rfc3339_patch", skip_serializing_if = "Option::is_none")]
    pub first_used: Option<Option<OffsetDateTime>>,
    #[serde(default, with = "rfc3339_patch", skip_serializing_if = "Option::is_none")]
    pub last_used: Option<Option<OffsetDateTime>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub material_type_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub remaining_weight: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub used_weight: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub lot_nr: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub comment: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub archived: Option<Option<bool>>,
}

/// Request body for consuming material from a container.
///
/// Exactly one of the two fields must be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerUseParameters {
    /// Length of material to consume, in mm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_length: Option<f64>,
    /// Weight of material to consume, in grams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_weight: Option<f64>,
}

impl ContainerUseParameters {
    pub fn weight(grams: f64) -> Self {
        Self {
            use_weight: Some(grams),
            use_length: None,
        }
    }

    pub fn length(millimeters: f64) -> Self {
        Self {
            use_length: Some(millimeters),
            use_weight: None,
        }
    }
}

/// Container snapshot, with its material type (and vendor) embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerResponse {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub registered: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub first_used: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_used: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub material_type: MaterialTypeResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_weight: Option<f64>,
    pub used_weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_length: Option<f64>,
    pub used_length: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_nr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub archived: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_parameters_distinguish_clear_from_absent() {
        let patch: ContainerUpdateParameters =
            serde_json::from_str(r#"{"last_used":null,"location":"Shelf B"}"#).unwrap();
        assert_eq!(patch.last_used, Some(None));
        assert_eq!(patch.first_used, None);
        assert_eq!(patch.location, Some(Some("Shelf B".to_string())));
        assert_eq!(patch.material_type_id, None);

        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"last_used":null,"location":"Shelf B"}"#);
    }

    #[test]
    fn test_update_parameters_parse_timestamps() {
        let patch: ContainerUpdateParameters =
            serde_json::from_str(r#"{"first_used":"2024-03-01T10:00:00+02:00"}"#).unwrap();
        let first_used = patch.first_used.flatten().unwrap();
        assert_eq!(first_used.unix_timestamp(), 1_709_280_000);
    }
}
