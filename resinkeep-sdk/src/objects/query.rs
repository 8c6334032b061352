//! Query-string DTOs for the search endpoints.
//!
//! Text filters are comma-separated lists of case-insensitive substrings;
//! an empty entry matches rows where the field is unset. Id filters are
//! comma-separated integer lists where `-1` selects rows without the
//! relation. `sort` is a comma-separated list of `field:asc|desc` tokens.
//!
//! Dotted keys (`vendor.name`, `material_type.vendor.id`, ...) are the
//! canonical names; the flat underscore spellings are accepted as aliases.

use serde::{Deserialize, Serialize};

/// Default CIEDE2000 threshold applied when `color_hex` is given alone.
pub const DEFAULT_COLOR_SIMILARITY_THRESHOLD: f64 = 20.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub offset: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialTypeQuery {
    #[serde(
        default,
        rename = "vendor.name",
        alias = "vendor_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub vendor_name: Option<String>,
    #[serde(
        default,
        rename = "vendor.id",
        alias = "vendor_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_number: Option<String>,
    /// Hex color to compare against, with or without a leading `#`.
    ///
    /// Every material type with a color is compared in memory, so this
    /// filter costs a full scan of colored rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
    /// Maximum CIEDE2000 difference, 0 to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_similarity_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub offset: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerQuery {
    #[serde(
        default,
        rename = "material_type.name",
        alias = "material_type_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub material_type_name: Option<String>,
    #[serde(
        default,
        rename = "material_type.id",
        alias = "material_type_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub material_type_id: Option<String>,
    #[serde(
        default,
        rename = "material_type.material",
        alias = "material_type_material",
        skip_serializing_if = "Option::is_none"
    )]
    pub material_type_material: Option<String>,
    #[serde(
        default,
        rename = "material_type.vendor.name",
        alias = "vendor_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub vendor_name: Option<String>,
    #[serde(
        default,
        rename = "material_type.vendor.id",
        alias = "vendor_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_nr: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub offset: u64,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}
