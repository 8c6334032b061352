use std::sync::Arc;

use kanau::processor::Processor;
use tracing::debug;

use resinkeep_sdk::objects::Resource;

use super::plan::Plan;
use super::schema::Schema;
use super::{ColorFilter, Query};
use crate::color::{Lab, delta_e_2000};
use crate::entities::{ContainerRow, MaterialTypeRow, Vendor};
use crate::error::DomainError;
use crate::store::{DistinctField, Store};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<R> {
    pub items: Vec<R>,
    /// Number of rows matching the filters, regardless of paging.
    pub total: u64,
}

/// Executes [`Query`]s against the store.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn Store>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// First pass of the color filter: ids of every row that passes the
    /// other filters and whose color is within the threshold.
    ///
    /// Every colored candidate is loaded and compared in memory, so the
    /// cost grows with the number of matching rows, not the page size.
    async fn similar_color_ids<R: Schema>(
        &self,
        plan: &Plan<R>,
        color: ColorFilter,
    ) -> Result<Vec<i64>, DomainError> {
        let candidates = R::search(self.store.as_ref(), &plan.unpaged()).await?;
        let scanned = candidates.len();
        let ids: Vec<i64> = candidates
            .iter()
            .filter(|row| {
                row.color_hex()
                    .and_then(Lab::from_hex)
                    .is_some_and(|lab| delta_e_2000(color.lab, lab) <= color.threshold)
            })
            .map(R::id)
            .collect();
        debug!(
            resource = R::RESOURCE.as_str(),
            scanned,
            matched = ids.len(),
            "Color similarity pass"
        );
        Ok(ids)
    }
}

impl<R: Schema> Processor<Query<R>> for QueryEngine {
    type Output = SearchResult<R>;
    type Error = DomainError;

    async fn process(&self, query: Query<R>) -> Result<SearchResult<R>, DomainError> {
        let mut plan = Plan::resolve(&query)?;

        if let Some(color) = query.color {
            let ids = self.similar_color_ids(&plan, color).await?;
            plan.restrict_ids(ids)?;
        }

        let store = self.store.as_ref();
        match plan.limit {
            Some(_) => {
                let total = R::count(store, &plan).await?;
                let items = if plan.offset >= total {
                    Vec::new()
                } else {
                    R::search(store, &plan).await?
                };
                Ok(SearchResult { items, total })
            }
            None => {
                let items = R::search(store, &plan).await?;
                let total = items.len() as u64;
                Ok(SearchResult { items, total })
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Single-entity reads
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct GetVendor {
    pub id: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct GetMaterialType {
    pub id: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct GetContainer {
    pub id: i64,
}

/// Distinct non-null values of a free-text column, sorted.
#[derive(Debug, Clone, Copy)]
pub struct ListDistinct(pub DistinctField);

fn not_found(resource: Resource, id: i64) -> DomainError {
    DomainError::NotFound { resource, id }
}

impl Processor<GetVendor> for QueryEngine {
    type Output = Vendor;
    type Error = DomainError;

    async fn process(&self, GetVendor { id }: GetVendor) -> Result<Vendor, DomainError> {
        self.store
            .vendor(id)
            .await?
            .ok_or_else(|| not_found(Resource::Vendor, id))
    }
}

impl Processor<GetMaterialType> for QueryEngine {
    type Output = MaterialTypeRow;
    type Error = DomainError;

    async fn process(&self, GetMaterialType { id }: GetMaterialType) -> Result<MaterialTypeRow, DomainError> {
        self.store
            .material_type(id)
            .await?
            .ok_or_else(|| not_found(Resource::MaterialType, id))
    }
}

impl Processor<GetContainer> for QueryEngine {
    type Output = ContainerRow;
    type Error = DomainError;

    async fn process(&self, GetContainer { id }: GetContainer) -> Result<ContainerRow, DomainError> {
        self.store
            .container(id)
            .await?
            .ok_or_else(|| not_found(Resource::Container, id))
    }
}

impl Processor<ListDistinct> for QueryEngine {
    type Output = Vec<String>;
    type Error = DomainError;

    async fn process(&self, ListDistinct(field): ListDistinct) -> Result<Vec<String>, DomainError> {
        Ok(self.store.distinct_values(field).await?)
    }
}
