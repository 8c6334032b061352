//! Persistence boundary.
//!
//! [`Store`] is object safe so the server can pick a backend at startup
//! and share it as `Arc<dyn Store>`. [`PgStore`] is the production
//! backend; [`MemoryStore`] has the same semantics and backs tests and the
//! `memory` storage mode.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use resinkeep_sdk::objects::Resource;
use thiserror::Error;
use time::OffsetDateTime;

use crate::entities::{
    ContainerInsert, ContainerPatch, ContainerRow, MaterialType, MaterialTypeInsert,
    MaterialTypePatch, MaterialTypeRow, Vendor, VendorInsert, VendorPatch,
};
use crate::query::Plan;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The delete would orphan rows referencing the entity. Nothing was
    /// removed.
    #[error("{resource} {id} is still referenced")]
    Referenced { resource: Resource, id: i64 },

    /// An insert or update pointed a foreign key at a row that does not
    /// exist. `resource` names the referenced table. Nothing was written.
    #[error("referenced {resource} {id} does not exist")]
    MissingReference { resource: Resource, id: i64 },
}

/// Columns whose distinct values are listed by the auxiliary endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctField {
    Material,
    ArticleNumber,
    Location,
    LotNr,
}

#[async_trait]
pub trait Store: Send + Sync {
    // ------------------------------------------------------------------
    // Vendors
    // ------------------------------------------------------------------

    async fn insert_vendor(&self, insert: VendorInsert) -> Result<Vendor, StoreError>;

    async fn vendor(&self, id: i64) -> Result<Option<Vendor>, StoreError>;

    /// Returns `None` when the vendor does not exist.
    async fn update_vendor(&self, id: i64, patch: VendorPatch) -> Result<Option<Vendor>, StoreError>;

    /// Returns `false` when the vendor does not exist. Fails with
    /// [`StoreError::Referenced`] while material types point at it.
    async fn delete_vendor(&self, id: i64) -> Result<bool, StoreError>;

    async fn count_vendors(&self, plan: &Plan<Vendor>) -> Result<u64, StoreError>;

    async fn search_vendors(&self, plan: &Plan<Vendor>) -> Result<Vec<Vendor>, StoreError>;

    // ------------------------------------------------------------------
    // Material types
    // ------------------------------------------------------------------

    /// Fails with [`StoreError::MissingReference`] when `vendor_id` names
    /// no vendor. The same holds for [`Store::update_material_type`].
    async fn insert_material_type(&self, insert: MaterialTypeInsert) -> Result<MaterialType, StoreError>;

    async fn material_type(&self, id: i64) -> Result<Option<MaterialTypeRow>, StoreError>;

    async fn update_material_type(
        &self,
        id: i64,
        patch: MaterialTypePatch,
    ) -> Result<Option<MaterialType>, StoreError>;

    /// Fails with [`StoreError::Referenced`] while containers point at it.
    async fn delete_material_type(&self, id: i64) -> Result<bool, StoreError>;

    async fn count_material_types(&self, plan: &Plan<MaterialTypeRow>) -> Result<u64, StoreError>;

    async fn search_material_types(
        &self,
        plan: &Plan<MaterialTypeRow>,
    ) -> Result<Vec<MaterialTypeRow>, StoreError>;

    // ------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------

    /// Fails with [`StoreError::MissingReference`] when `material_type_id`
    /// names no material type. The same holds for [`Store::update_container`].
    async fn insert_container(&self, insert: ContainerInsert) -> Result<i64, StoreError>;

    async fn container(&self, id: i64) -> Result<Option<ContainerRow>, StoreError>;

    async fn update_container(&self, id: i64, patch: ContainerPatch) -> Result<bool, StoreError>;

    async fn delete_container(&self, id: i64) -> Result<bool, StoreError>;

    async fn count_containers(&self, plan: &Plan<ContainerRow>) -> Result<u64, StoreError>;

    async fn search_containers(&self, plan: &Plan<ContainerRow>) -> Result<Vec<ContainerRow>, StoreError>;

    /// Atomically set `used_weight = max(used_weight + delta, 0)` in a
    /// single conditional update. Returns `false` when the container does
    /// not exist.
    async fn add_used_weight(&self, id: i64, delta: f64) -> Result<bool, StoreError>;

    /// Set `last_used` to `at`, and `first_used` to `at` if it is unset.
    async fn mark_used(&self, id: i64, at: OffsetDateTime) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // Misc
    // ------------------------------------------------------------------

    /// Distinct non-null values of `field`, sorted.
    async fn distinct_values(&self, field: DistinctField) -> Result<Vec<String>, StoreError>;
}
