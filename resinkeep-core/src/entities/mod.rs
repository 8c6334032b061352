//! Stored entities and their joined row views.
//!
//! Relations are plain foreign-key fields. Reads that need the related
//! entity return a row view (`MaterialTypeRow`, `ContainerRow`) with the
//! relation already resolved by explicit lookup.

pub mod container;
pub mod material_type;
pub mod vendor;

pub use container::{Container, ContainerInsert, ContainerPatch, ContainerRow};
pub use material_type::{MaterialType, MaterialTypeInsert, MaterialTypePatch, MaterialTypeRow};
pub use vendor::{Vendor, VendorInsert, VendorPatch};

use time::{OffsetDateTime, UtcOffset};

/// Current UTC time truncated to whole seconds, used for `registered`,
/// `first_used` and `last_used` stamps.
pub fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(0).unwrap_or(now)
}

/// Normalize a caller-supplied timestamp to UTC.
pub fn to_utc(value: OffsetDateTime) -> OffsetDateTime {
    value.to_offset(UtcOffset::UTC)
}

/// Apply a double-option patch value to an optional field.
pub(crate) fn patch_field<T: Clone>(field: &mut Option<T>, patch: &Option<Option<T>>) {
    if let Some(value) = patch {
        *field = value.clone();
    }
}
