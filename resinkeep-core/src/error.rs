use resinkeep_sdk::objects::Resource;
use thiserror::Error;

use crate::color::InvalidHexColor;
use crate::query::QueryError;
use crate::store::StoreError;

/// Errors surfaced by the query engine and the mutation coordinator.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed input. Raised before anything is written.
    #[error("{0}")]
    Validation(String),

    #[error("no {resource} with id {id} found")]
    NotFound { resource: Resource, id: i64 },

    /// A creation-time precondition does not hold.
    #[error("{0}")]
    Create(String),

    /// The entity is still referenced and the delete was rolled back.
    #[error("{resource} {id} is still referenced and cannot be deleted")]
    DeleteBlocked { resource: Resource, id: i64 },

    #[error("store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }
}

impl From<QueryError> for DomainError {
    fn from(err: QueryError) -> Self {
        DomainError::Validation(err.to_string())
    }
}

impl From<InvalidHexColor> for DomainError {
    fn from(err: InvalidHexColor) -> Self {
        DomainError::Validation(err.to_string())
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Referenced { resource, id } => DomainError::DeleteBlocked { resource, id },
            StoreError::MissingReference { resource, id } => DomainError::NotFound { resource, id },
            other => DomainError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_domain() {
        let err: DomainError = StoreError::MissingReference {
            resource: Resource::MaterialType,
            id: 999,
        }
        .into();
        assert!(matches!(
            err,
            DomainError::NotFound { resource: Resource::MaterialType, id: 999 }
        ));

        let err: DomainError = StoreError::Referenced {
            resource: Resource::Vendor,
            id: 1,
        }
        .into();
        assert!(matches!(err, DomainError::DeleteBlocked { resource: Resource::Vendor, id: 1 }));
    }
}
