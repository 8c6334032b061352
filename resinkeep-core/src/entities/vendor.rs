use resinkeep_sdk::objects::VendorResponse;
use time::OffsetDateTime;

use super::patch_field;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Vendor {
    pub id: i64,
    pub registered: OffsetDateTime,
    pub name: String,
    pub comment: Option<String>,
    pub empty_container_weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VendorInsert {
    pub registered: OffsetDateTime,
    pub name: String,
    pub comment: Option<String>,
    pub empty_container_weight: Option<f64>,
}

/// Validated partial update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorPatch {
    pub name: Option<String>,
    pub comment: Option<Option<String>>,
    pub empty_container_weight: Option<Option<f64>>,
}

impl VendorPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.comment.is_none() && self.empty_container_weight.is_none()
    }
}

impl Vendor {
    pub fn from_insert(id: i64, insert: VendorInsert) -> Self {
        Self {
            id,
            registered: insert.registered,
            name: insert.name,
            comment: insert.comment,
            empty_container_weight: insert.empty_container_weight,
        }
    }

    pub fn apply(&mut self, patch: &VendorPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        patch_field(&mut self.comment, &patch.comment);
        patch_field(&mut self.empty_container_weight, &patch.empty_container_weight);
    }
}

impl From<&Vendor> for VendorResponse {
    fn from(vendor: &Vendor) -> Self {
        VendorResponse {
            id: vendor.id,
            registered: vendor.registered,
            name: vendor.name.clone(),
            comment: vendor.comment.clone(),
            empty_container_weight: vendor.empty_container_weight,
        }
    }
}
