use resinkeep_sdk::objects::{MaterialTypeResponse, VendorResponse};
use time::OffsetDateTime;

use super::patch_field;
use super::vendor::Vendor;
use crate::units;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MaterialType {
    pub id: i64,
    pub registered: OffsetDateTime,
    pub name: Option<String>,
    pub vendor_id: Option<i64>,
    pub material: Option<String>,
    pub price: Option<f64>,
    /// g/cm³
    pub density: f64,
    /// mm
    pub diameter: f64,
    /// Net weight of a full container, g.
    pub weight: Option<f64>,
    pub container_weight: Option<f64>,
    pub article_number: Option<String>,
    pub comment: Option<String>,
    pub cure_temp: Option<i32>,
    pub cure_time: Option<i32>,
    pub wash_time: Option<i32>,
    /// Upper-case hex without `#`, 6 or 8 digits.
    pub color_hex: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTypeInsert {
    pub registered: OffsetDateTime,
    pub name: Option<String>,
    pub vendor_id: Option<i64>,
    pub material: Option<String>,
    pub price: Option<f64>,
    pub density: f64,
    pub diameter: f64,
    pub weight: Option<f64>,
    pub container_weight: Option<f64>,
    pub article_number: Option<String>,
    pub comment: Option<String>,
    pub cure_temp: Option<i32>,
    pub cure_time: Option<i32>,
    pub wash_time: Option<i32>,
    pub color_hex: Option<String>,
}

/// Validated partial update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialTypePatch {
    pub name: Option<Option<String>>,
    pub vendor_id: Option<Option<i64>>,
    pub material: Option<Option<String>>,
    pub price: Option<Option<f64>>,
    pub density: Option<f64>,
    pub diameter: Option<f64>,
    pub weight: Option<Option<f64>>,
    pub container_weight: Option<Option<f64>>,
    pub article_number: Option<Option<String>>,
    pub comment: Option<Option<String>>,
    pub cure_temp: Option<Option<i32>>,
    pub cure_time: Option<Option<i32>>,
    pub wash_time: Option<Option<i32>>,
    pub color_hex: Option<Option<String>>,
}

impl MaterialTypePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl MaterialType {
    pub fn from_insert(id: i64, insert: MaterialTypeInsert) -> Self {
        Self {
            id,
            registered: insert.registered,
            name: insert.name,
            vendor_id: insert.vendor_id,
            material: insert.material,
            price: insert.price,
            density: insert.density,
            diameter: insert.diameter,
            weight: insert.weight,
            container_weight: insert.container_weight,
            article_number: insert.article_number,
            comment: insert.comment,
            cure_temp: insert.cure_temp,
            cure_time: insert.cure_time,
            wash_time: insert.wash_time,
            color_hex: insert.color_hex,
        }
    }

    pub fn apply(&mut self, patch: &MaterialTypePatch) {
        patch_field(&mut self.name, &patch.name);
        patch_field(&mut self.vendor_id, &patch.vendor_id);
        patch_field(&mut self.material, &patch.material);
        patch_field(&mut self.price, &patch.price);
        if let Some(density) = patch.density {
            self.density = density;
        }
        if let Some(diameter) = patch.diameter {
            self.diameter = diameter;
        }
        patch_field(&mut self.weight, &patch.weight);
        patch_field(&mut self.container_weight, &patch.container_weight);
        patch_field(&mut self.article_number, &patch.article_number);
        patch_field(&mut self.comment, &patch.comment);
        patch_field(&mut self.cure_temp, &patch.cure_temp);
        patch_field(&mut self.cure_time, &patch.cure_time);
        patch_field(&mut self.wash_time, &patch.wash_time);
        patch_field(&mut self.color_hex, &patch.color_hex);
    }

    /// Mass in grams of `length` mm of this material.
    pub fn weight_from_length(&self, length: f64) -> f64 {
        units::weight_from_length(length, self.diameter, self.density)
    }

    /// Length in mm of `weight` grams of this material.
    pub fn length_from_weight(&self, weight: f64) -> f64 {
        units::length_from_weight(weight, self.diameter, self.density)
    }
}

/// A material type with its vendor resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTypeRow {
    pub material_type: MaterialType,
    pub vendor: Option<Vendor>,
}

impl From<&MaterialTypeRow> for MaterialTypeResponse {
    fn from(row: &MaterialTypeRow) -> Self {
        let m = &row.material_type;
        MaterialTypeResponse {
            id: m.id,
            registered: m.registered,
            name: m.name.clone(),
            vendor: row.vendor.as_ref().map(VendorResponse::from),
            material: m.material.clone(),
            price: m.price,
            density: m.density,
            diameter: m.diameter,
            weight: m.weight,
            container_weight: m.container_weight,
            article_number: m.article_number.clone(),
            comment: m.comment.clone(),
            cure_temp: m.cure_temp,
            cure_time: m.cure_time,
            wash_time: m.wash_time,
            color_hex: m.color_hex.clone(),
        }
    }
}
