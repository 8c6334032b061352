//! Per-entity field registries.
//!
//! Every sortable or filterable path is listed here with the SQL expression
//! it maps to and an accessor reading the same value from a loaded row.
//! SQL expressions use the aliases `v` (vendor), `m` (material_type) and
//! `c` (container) set up by each schema's `SQL_FROM`.

use std::cmp::Ordering;

use futures_util::future::BoxFuture;
use resinkeep_sdk::objects::Resource;
use time::OffsetDateTime;

use super::plan::Plan;
use crate::entities::{ContainerRow, MaterialTypeRow, Vendor};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Null,
    Int(i64),
    Float(f64),
    Text(&'a str),
    Bool(bool),
    Time(OffsetDateTime),
}

impl FieldValue<'_> {
    /// Total order with `Null` above every value, matching PostgreSQL's
    /// default `NULLS LAST` for ascending sorts.
    pub fn compare(&self, other: &Self) -> Ordering {
        use FieldValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Greater,
            (_, Null) => Ordering::Less,
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
            (Text(a), Text(b)) => a.cmp(b),
            (Bool(a), Bool(b)) => a.cmp(b),
            (Time(a), Time(b)) => a.cmp(b),
            // mixed kinds never occur within one field
            _ => Ordering::Equal,
        }
    }
}

impl From<i64> for FieldValue<'_> {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue<'_> {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue<'_> {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<OffsetDateTime> for FieldValue<'_> {
    fn from(value: OffsetDateTime) -> Self {
        FieldValue::Time(value)
    }
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Text(value)
    }
}

impl<'a, T: Into<FieldValue<'a>>> From<Option<T>> for FieldValue<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl From<i32> for FieldValue<'_> {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

pub struct FieldDef<R> {
    pub path: &'static str,
    /// SQL expression evaluating to the field's value.
    pub column: &'static str,
    pub read: for<'a> fn(&'a R) -> FieldValue<'a>,
}

impl<R> FieldDef<R> {
    pub const fn new(
        path: &'static str,
        column: &'static str,
        read: for<'a> fn(&'a R) -> FieldValue<'a>,
    ) -> Self {
        Self { path, column, read }
    }
}

impl<R> std::fmt::Debug for FieldDef<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDef")
            .field("path", &self.path)
            .field("column", &self.column)
            .finish()
    }
}

/// An entity row type the query engine can search.
pub trait Schema: std::fmt::Debug + Clone + Send + Sync + Sized + 'static {
    const RESOURCE: Resource;
    /// `FROM` clause with the joins every field expression relies on.
    const SQL_FROM: &'static str;
    const SQL_ID: &'static str;

    fn fields() -> &'static [FieldDef<Self>];

    fn id(&self) -> i64;

    /// Normalized hex color, for entities that carry one.
    fn color_hex(&self) -> Option<&str> {
        None
    }

    fn count<'a>(store: &'a dyn Store, plan: &'a Plan<Self>) -> BoxFuture<'a, Result<u64, StoreError>>;

    fn search<'a>(
        store: &'a dyn Store,
        plan: &'a Plan<Self>,
    ) -> BoxFuture<'a, Result<Vec<Self>, StoreError>>;

    fn field(path: &str) -> Option<&'static FieldDef<Self>> {
        Self::fields().iter().find(|field| field.path == path)
    }
}

// ----------------------------------------------------------------------------
// Vendor
// ----------------------------------------------------------------------------

static VENDOR_FIELDS: &[FieldDef<Vendor>] = &[
    FieldDef::new("id", "v.id", |v| v.id.into()),
    FieldDef::new("registered", "v.registered", |v| v.registered.into()),
    FieldDef::new("name", "v.name", |v| v.name.as_str().into()),
    FieldDef::new("comment", "v.comment", |v| v.comment.as_deref().into()),
    FieldDef::new("empty_container_weight", "v.empty_container_weight", |v| {
        v.empty_container_weight.into()
    }),
];

impl Schema for Vendor {
    const RESOURCE: Resource = Resource::Vendor;
    const SQL_FROM: &'static str = "vendor v";
    const SQL_ID: &'static str = "v.id";

    fn fields() -> &'static [FieldDef<Self>] {
        VENDOR_FIELDS
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn count<'a>(store: &'a dyn Store, plan: &'a Plan<Self>) -> BoxFuture<'a, Result<u64, StoreError>> {
        store.count_vendors(plan)
    }

    fn search<'a>(
        store: &'a dyn Store,
        plan: &'a Plan<Self>,
    ) -> BoxFuture<'a, Result<Vec<Self>, StoreError>> {
        store.search_vendors(plan)
    }
}

// ----------------------------------------------------------------------------
// Material type
// ----------------------------------------------------------------------------

static MATERIAL_TYPE_FIELDS: &[FieldDef<MaterialTypeRow>] = &[
    FieldDef::new("id", "m.id", |r| r.material_type.id.into()),
    FieldDef::new("registered", "m.registered", |r| r.material_type.registered.into()),
    FieldDef::new("name", "m.name", |r| r.material_type.name.as_deref().into()),
    FieldDef::new("vendor_id", "m.vendor_id", |r| r.material_type.vendor_id.into()),
    FieldDef::new("material", "m.material", |r| r.material_type.material.as_deref().into()),
    FieldDef::new("price", "m.price", |r| r.material_type.price.into()),
    FieldDef::new("density", "m.density", |r| r.material_type.density.into()),
    FieldDef::new("diameter", "m.diameter", |r| r.material_type.diameter.into()),
    FieldDef::new("weight", "m.weight", |r| r.material_type.weight.into()),
    FieldDef::new("container_weight", "m.container_weight", |r| {
        r.material_type.container_weight.into()
    }),
    FieldDef::new("article_number", "m.article_number", |r| {
        r.material_type.article_number.as_deref().into()
    }),
    FieldDef::new("comment", "m.comment", |r| r.material_type.comment.as_deref().into()),
    FieldDef::new("cure_temp", "m.cure_temp", |r| r.material_type.cure_temp.into()),
    FieldDef::new("cure_time", "m.cure_time", |r| r.material_type.cure_time.into()),
    FieldDef::new("wash_time", "m.wash_time", |r| r.material_type.wash_time.into()),
    FieldDef::new("color_hex", "m.color_hex", |r| r.material_type.color_hex.as_deref().into()),
    FieldDef::new("vendor.id", "v.id", |r| r.vendor.as_ref().map(|v| v.id).into()),
    FieldDef::new("vendor.registered", "v.registered", |r| {
        r.vendor.as_ref().map(|v| v.registered).into()
    }),
    FieldDef::new("vendor.name", "v.name", |r| {
        r.vendor.as_ref().map(|v| v.name.as_str()).into()
    }),
    FieldDef::new("vendor.comment", "v.comment", |r| {
        r.vendor.as_ref().and_then(|v| v.comment.as_deref()).into()
    }),
    FieldDef::new("vendor.empty_container_weight", "v.empty_container_weight", |r| {
        r.vendor.as_ref().and_then(|v| v.empty_container_weight).into()
    }),
];

impl Schema for MaterialTypeRow {
    const RESOURCE: Resource = Resource::MaterialType;
    const SQL_FROM: &'static str = "material_type m LEFT JOIN vendor v ON v.id = m.vendor_id";
    const SQL_ID: &'static str = "m.id";

    fn fields() -> &'static [FieldDef<Self>] {
        MATERIAL_TYPE_FIELDS
    }

    fn id(&self) -> i64 {
        self.material_type.id
    }

    fn color_hex(&self) -> Option<&str> {
        self.material_type.color_hex.as_deref()
    }

    fn count<'a>(store: &'a dyn Store, plan: &'a Plan<Self>) -> BoxFuture<'a, Result<u64, StoreError>> {
        store.count_material_types(plan)
    }

    fn search<'a>(
        store: &'a dyn Store,
        plan: &'a Plan<Self>,
    ) -> BoxFuture<'a, Result<Vec<Self>, StoreError>> {
        store.search_material_types(plan)
    }
}

// ----------------------------------------------------------------------------
// Container
// ----------------------------------------------------------------------------

const REMAINING_WEIGHT_SQL: &str =
    "(CASE WHEN m.weight IS NULL THEN NULL ELSE GREATEST(m.weight - c.used_weight, 0) END)";
const USED_LENGTH_SQL: &str =
    "(c.used_weight / m.density * 1000 / (PI() * POWER(m.diameter / 2, 2)))";
const REMAINING_LENGTH_SQL: &str = "(CASE WHEN m.weight IS NULL THEN NULL \
     ELSE GREATEST(m.weight - c.used_weight, 0) / m.density * 1000 / (PI() * POWER(m.diameter / 2, 2)) END)";

static CONTAINER_FIELDS: &[FieldDef<ContainerRow>] = &[
    FieldDef::new("id", "c.id", |r| r.container.id.into()),
    FieldDef::new("registered", "c.registered", |r| r.container.registered.into()),
    FieldDef::new("first_used", "c.first_used", |r| r.container.first_used.into()),
    FieldDef::new("last_used", "c.last_used", |r| r.container.last_used.into()),
    FieldDef::new("material_type_id", "c.material_type_id", |r| {
        r.container.material_type_id.into()
    }),
    FieldDef::new("used_weight", "c.used_weight", |r| r.container.used_weight.into()),
    FieldDef::new("location", "c.location", |r| r.container.location.as_deref().into()),
    FieldDef::new("lot_nr", "c.lot_nr", |r| r.container.lot_nr.as_deref().into()),
    FieldDef::new("comment", "c.comment", |r| r.container.comment.as_deref().into()),
    FieldDef::new("archived", "c.archived", |r| r.container.archived.into()),
    FieldDef::new("price", "m.price", |r| r.material_type.price.into()),
    FieldDef::new("remaining_weight", REMAINING_WEIGHT_SQL, |r| r.remaining_weight().into()),
    FieldDef::new("used_length", USED_LENGTH_SQL, |r| r.used_length().into()),
    FieldDef::new("remaining_length", REMAINING_LENGTH_SQL, |r| r.remaining_length().into()),
    FieldDef::new("material_type.id", "m.id", |r| r.material_type.id.into()),
    FieldDef::new("material_type.registered", "m.registered", |r| {
        r.material_type.registered.into()
    }),
    FieldDef::new("material_type.name", "m.name", |r| r.material_type.name.as_deref().into()),
    FieldDef::new("material_type.vendor_id", "m.vendor_id", |r| {
        r.material_type.vendor_id.into()
    }),
    FieldDef::new("material_type.material", "m.material", |r| {
        r.material_type.material.as_deref().into()
    }),
    FieldDef::new("material_type.price", "m.price", |r| r.material_type.price.into()),
    FieldDef::new("material_type.density", "m.density", |r| r.material_type.density.into()),
    FieldDef::new("material_type.diameter", "m.diameter", |r| r.material_type.diameter.into()),
    FieldDef::new("material_type.weight", "m.weight", |r| r.material_type.weight.into()),
    FieldDef::new("material_type.container_weight", "m.container_weight", |r| {
        r.material_type.container_weight.into()
    }),
    FieldDef::new("material_type.article_number", "m.article_number", |r| {
        r.material_type.article_number.as_deref().into()
    }),
    FieldDef::new("material_type.comment", "m.comment", |r| {
        r.material_type.comment.as_deref().into()
    }),
    FieldDef::new("material_type.cure_temp", "m.cure_temp", |r| r.material_type.cure_temp.into()),
    FieldDef::new("material_type.cure_time", "m.cure_time", |r| r.material_type.cure_time.into()),
    FieldDef::new("material_type.wash_time", "m.wash_time", |r| r.material_type.wash_time.into()),
    FieldDef::new("material_type.color_hex", "m.color_hex", |r| {
        r.material_type.color_hex.as_deref().into()
    }),
    FieldDef::new("material_type.vendor.id", "v.id", |r| r.vendor.as_ref().map(|v| v.id).into()),
    FieldDef::new("material_type.vendor.registered", "v.registered", |r| {
        r.vendor.as_ref().map(|v| v.registered).into()
    }),
    FieldDef::new("material_type.vendor.name", "v.name", |r| {
        r.vendor.as_ref().map(|v| v.name.as_str()).into()
    }),
    FieldDef::new("material_type.vendor.comment", "v.comment", |r| {
        r.vendor.as_ref().and_then(|v| v.comment.as_deref()).into()
    }),
    FieldDef::new(
        "material_type.vendor.empty_container_weight",
        "v.empty_container_weight",
        |r| r.vendor.as_ref().and_then(|v| v.empty_container_weight).into(),
    ),
];

impl Schema for ContainerRow {
    const RESOURCE: Resource = Resource::Container;
    const SQL_FROM: &'static str = "container c \
         JOIN material_type m ON m.id = c.material_type_id \
         LEFT JOIN vendor v ON v.id = m.vendor_id";
    const SQL_ID: &'static str = "c.id";

    fn fields() -> &'static [FieldDef<Self>] {
        CONTAINER_FIELDS
    }

    fn id(&self) -> i64 {
        self.container.id
    }

    fn count<'a>(store: &'a dyn Store, plan: &'a Plan<Self>) -> BoxFuture<'a, Result<u64, StoreError>> {
        store.count_containers(plan)
    }

    fn search<'a>(
        store: &'a dyn Store,
        plan: &'a Plan<Self>,
    ) -> BoxFuture<'a, Result<Vec<Self>, StoreError>> {
        store.search_containers(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_unique_paths<R: Schema>() {
        let mut seen = HashSet::new();
        for field in R::fields() {
            assert!(seen.insert(field.path), "duplicate path {}", field.path);
        }
    }

    #[test]
    fn test_registries_have_unique_paths() {
        assert_unique_paths::<Vendor>();
        assert_unique_paths::<MaterialTypeRow>();
        assert_unique_paths::<ContainerRow>();
    }

    #[test]
    fn test_nested_paths_resolve() {
        assert!(MaterialTypeRow::field("vendor.name").is_some());
        assert!(ContainerRow::field("material_type.vendor.name").is_some());
        assert!(ContainerRow::field("remaining_weight").is_some());
        assert!(ContainerRow::field("vendor.name").is_none());
        assert!(Vendor::field("material").is_none());
    }

    #[test]
    fn test_nulls_sort_above_values() {
        assert_eq!(FieldValue::Null.compare(&FieldValue::Int(5)), Ordering::Greater);
        assert_eq!(FieldValue::Text("a").compare(&FieldValue::Null), Ordering::Less);
        assert_eq!(
            FieldValue::Float(1.5).compare(&FieldValue::Float(2.0)),
            Ordering::Less
        );
    }
}
