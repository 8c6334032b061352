use resinkeep_sdk::objects::{ContainerResponse, MaterialTypeResponse};
use time::OffsetDateTime;

use super::material_type::MaterialType;
use super::patch_field;
use super::vendor::Vendor;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Container {
    pub id: i64,
    pub registered: OffsetDateTime,
    pub first_used: Option<OffsetDateTime>,
    pub last_used: Option<OffsetDateTime>,
    pub material_type_id: i64,
    /// Grams consumed so far, never negative.
    pub used_weight: f64,
    pub location: Option<String>,
    pub lot_nr: Option<String>,
    pub comment: Option<String>,
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInsert {
    pub registered: OffsetDateTime,
    pub first_used: Option<OffsetDateTime>,
    pub last_used: Option<OffsetDateTime>,
    pub material_type_id: i64,
    pub used_weight: f64,
    pub location: Option<String>,
    pub lot_nr: Option<String>,
    pub comment: Option<String>,
    pub archived: bool,
}

/// Validated partial update. `None` leaves a column untouched.
///
/// `used_weight` is only written when the caller set it explicitly, so a
/// metadata edit never overwrites a concurrent consumption.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerPatch {
    pub first_used: Option<Option<OffsetDateTime>>,
    pub last_used: Option<Option<OffsetDateTime>>,
    pub material_type_id: Option<i64>,
    pub used_weight: Option<f64>,
    pub location: Option<Option<String>>,
    pub lot_nr: Option<Option<String>>,
    pub comment: Option<Option<String>>,
    pub archived: Option<bool>,
}

impl ContainerPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Container {
    pub fn from_insert(id: i64, insert: ContainerInsert) -> Self {
        Self {
            id,
            registered: insert.registered,
            first_used: insert.first_used,
            last_used: insert.last_used,
            material_type_id: insert.material_type_id,
            used_weight: insert.used_weight,
            location: insert.location,
            lot_nr: insert.lot_nr,
            comment: insert.comment,
            archived: insert.archived,
        }
    }

    pub fn apply(&mut self, patch: &ContainerPatch) {
        patch_field(&mut self.first_used, &patch.first_used);
        patch_field(&mut self.last_used, &patch.last_used);
        if let Some(id) = patch.material_type_id {
            self.material_type_id = id;
        }
        if let Some(used) = patch.used_weight {
            self.used_weight = used;
        }
        patch_field(&mut self.location, &patch.location);
        patch_field(&mut self.lot_nr, &patch.lot_nr);
        patch_field(&mut self.comment, &patch.comment);
        if let Some(archived) = patch.archived {
            self.archived = archived;
        }
    }
}

/// A container with its material type and vendor resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRow {
    pub container: Container,
    pub material_type: MaterialType,
    pub vendor: Option<Vendor>,
}

impl ContainerRow {
    /// `weight - used_weight` clamped at zero, or `None` when the material
    /// type has no declared full weight.
    pub fn remaining_weight(&self) -> Option<f64> {
        self.material_type
            .weight
            .map(|weight| (weight - self.container.used_weight).max(0.0))
    }

    pub fn used_length(&self) -> f64 {
        self.material_type
            .length_from_weight(self.container.used_weight)
    }

    pub fn remaining_length(&self) -> Option<f64> {
        self.remaining_weight()
            .map(|weight| self.material_type.length_from_weight(weight))
    }
}

impl From<&ContainerRow> for ContainerResponse {
    fn from(row: &ContainerRow) -> Self {
        let c = &row.container;
        let material_type = super::MaterialTypeRow {
            material_type: row.material_type.clone(),
            vendor: row.vendor.clone(),
        };
        ContainerResponse {
            id: c.id,
            registered: c.registered,
            first_used: c.first_used,
            last_used: c.last_used,
            price: row.material_type.price,
            material_type: MaterialTypeResponse::from(&material_type),
            remaining_weight: row.remaining_weight(),
            used_weight: c.used_weight,
            remaining_length: row.remaining_length(),
            used_length: row.used_length(),
            location: c.location.clone(),
            lot_nr: c.lot_nr.clone(),
            comment: c.comment.clone(),
            archived: c.archived,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(weight: Option<f64>, used_weight: f64) -> ContainerRow {
        let registered = OffsetDateTime::UNIX_EPOCH;
        ContainerRow {
            container: Container {
                id: 1,
                registered,
                first_used: None,
                last_used: None,
                material_type_id: 2,
                used_weight,
                location: None,
                lot_nr: None,
                comment: None,
                archived: false,
            },
            material_type: MaterialType {
                id: 2,
                registered,
                name: Some("Grey Standard".to_string()),
                vendor_id: None,
                material: Some("Standard".to_string()),
                price: Some(29.9),
                density: 1.1,
                diameter: 1.75,
                weight,
                container_weight: None,
                article_number: None,
                comment: None,
                cure_temp: None,
                cure_time: None,
                wash_time: None,
                color_hex: None,
            },
            vendor: None,
        }
    }

    #[test]
    fn test_remaining_weight_is_clamped() {
        assert_eq!(row(Some(1000.0), 250.0).remaining_weight(), Some(750.0));
        assert_eq!(row(Some(1000.0), 1200.0).remaining_weight(), Some(0.0));
        assert_eq!(row(None, 250.0).remaining_weight(), None);
    }

    #[test]
    fn test_response_carries_derived_values() {
        let response = ContainerResponse::from(&row(Some(1000.0), 250.0));
        assert_eq!(response.price, Some(29.9));
        assert_eq!(response.remaining_weight, Some(750.0));
        let expected = crate::units::length_from_weight(750.0, 1.75, 1.1);
        assert!((response.remaining_length.unwrap() - expected).abs() < 1e-9);
        assert!(response.used_length > 0.0);
        assert!(response.material_type.vendor.is_none());
    }
}
