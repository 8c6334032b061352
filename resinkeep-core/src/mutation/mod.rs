//! Creates, updates, deletes and consumption.
//!
//! Every operation is a [`Processor`](kanau::processor::Processor) on
//! [`MutationCoordinator`]. Input is validated before anything is written,
//! and a change event is published to `(resource, id)` once the write has
//! committed.

mod container;
mod material_type;
mod vendor;

pub use container::{ConsumeContainer, CreateContainer, DeleteContainer, UpdateContainer};
pub use material_type::{CreateMaterialType, DeleteMaterialType, UpdateMaterialType};
pub use vendor::{CreateVendor, DeleteVendor, UpdateVendor};

use std::sync::Arc;

use resinkeep_sdk::objects::{ChangeEvent, EventKind, EventPayload, Resource};

use crate::broker::{NotificationBroker, Topic};
use crate::entities::{ContainerRow, MaterialTypeRow, Vendor, now_utc};
use crate::error::DomainError;
use crate::store::Store;

pub const MAX_NAME_LEN: usize = 64;
pub const MAX_COMMENT_LEN: usize = 1024;

#[derive(Clone)]
pub struct MutationCoordinator {
    store: Arc<dyn Store>,
    broker: NotificationBroker,
}

impl MutationCoordinator {
    pub fn new(store: Arc<dyn Store>, broker: NotificationBroker) -> Self {
        Self { store, broker }
    }

    fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    fn publish(&self, kind: EventKind, payload: EventPayload) {
        let resource = payload.resource();
        let id = payload.id();
        let event = ChangeEvent::new(kind, payload, now_utc());
        let delivered = self.broker.publish(&Topic::entity(resource, id), event);
        tracing::debug!(%resource, id, ?kind, delivered, "Published change event");
    }

    async fn require_vendor(&self, id: i64) -> Result<Vendor, DomainError> {
        self.store()
            .vendor(id)
            .await?
            .ok_or(DomainError::NotFound {
                resource: Resource::Vendor,
                id,
            })
    }

    async fn require_material_type(&self, id: i64) -> Result<MaterialTypeRow, DomainError> {
        self.store()
            .material_type(id)
            .await?
            .ok_or(DomainError::NotFound {
                resource: Resource::MaterialType,
                id,
            })
    }

    async fn require_container(&self, id: i64) -> Result<ContainerRow, DomainError> {
        self.store()
            .container(id)
            .await?
            .ok_or(DomainError::NotFound {
                resource: Resource::Container,
                id,
            })
    }
}

// ------------------------------------------------------------------
// Field validation
// ------------------------------------------------------------------

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<(), DomainError> {
    match value {
        Some(value) if value.chars().count() > max => Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

fn check_non_negative(field: &str, value: Option<f64>) -> Result<(), DomainError> {
    match value {
        Some(value) if !value.is_finite() || value < 0.0 => Err(DomainError::validation(format!(
            "{field} must be a non-negative number"
        ))),
        _ => Ok(()),
    }
}

fn check_positive(field: &str, value: Option<f64>) -> Result<(), DomainError> {
    match value {
        Some(value) if !value.is_finite() || value <= 0.0 => Err(DomainError::validation(format!(
            "{field} must be greater than zero"
        ))),
        _ => Ok(()),
    }
}

fn check_non_negative_int(field: &str, value: Option<i32>) -> Result<(), DomainError> {
    match value {
        Some(value) if value < 0 => Err(DomainError::validation(format!(
            "{field} must not be negative"
        ))),
        _ => Ok(()),
    }
}

/// Reject an explicit `null` for a field that cannot be cleared.
fn required<T>(field: &str, value: Option<Option<T>>) -> Result<Option<T>, DomainError> {
    match value {
        Some(None) => Err(DomainError::validation(format!("{field} cannot be cleared"))),
        Some(Some(value)) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Borrow the new value of a double-option patch field, if one was set.
fn patched<T>(value: &Option<Option<T>>) -> Option<&T> {
    value.as_ref().and_then(Option::as_ref)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_checks() {
        assert!(check_len("name", Some("abc"), 3).is_ok());
        assert!(check_len("name", Some("abcd"), 3).is_err());
        assert!(check_len("name", None, 0).is_ok());
        assert!(check_non_negative("weight", Some(0.0)).is_ok());
        assert!(check_non_negative("weight", Some(-0.1)).is_err());
        assert!(check_non_negative("weight", Some(f64::NAN)).is_err());
        assert!(check_positive("density", Some(0.0)).is_err());
        assert!(check_positive("density", Some(f64::INFINITY)).is_err());
        assert!(check_non_negative_int("cure_time", Some(-1)).is_err());
        assert!(matches!(
            required::<i64>("material_type_id", Some(None)),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(required("material_type_id", Some(Some(3))).unwrap(), Some(3));
    }
}
