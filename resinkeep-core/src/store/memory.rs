use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use resinkeep_sdk::objects::Resource;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{DistinctField, Store, StoreError};
use crate::entities::{
    Container, ContainerInsert, ContainerPatch, ContainerRow, MaterialType, MaterialTypeInsert,
    MaterialTypePatch, MaterialTypeRow, Vendor, VendorInsert, VendorPatch,
};
use crate::query::{Plan, Schema};

#[derive(Default)]
struct Tables {
    vendors: BTreeMap<i64, Vendor>,
    material_types: BTreeMap<i64, MaterialType>,
    containers: BTreeMap<i64, Container>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn material_type_row(&self, material_type: &MaterialType) -> MaterialTypeRow {
        MaterialTypeRow {
            material_type: material_type.clone(),
            vendor: material_type
                .vendor_id
                .and_then(|id| self.vendors.get(&id))
                .cloned(),
        }
    }

    fn container_row(&self, container: &Container) -> Option<ContainerRow> {
        let material_type = self.material_types.get(&container.material_type_id)?;
        Some(ContainerRow {
            container: container.clone(),
            material_type: material_type.clone(),
            vendor: material_type
                .vendor_id
                .and_then(|id| self.vendors.get(&id))
                .cloned(),
        })
    }

    fn require_vendor(&self, id: Option<i64>) -> Result<(), StoreError> {
        match id {
            Some(id) if !self.vendors.contains_key(&id) => Err(StoreError::MissingReference {
                resource: Resource::Vendor,
                id,
            }),
            _ => Ok(()),
        }
    }

    fn require_material_type(&self, id: Option<i64>) -> Result<(), StoreError> {
        match id {
            Some(id) if !self.material_types.contains_key(&id) => Err(StoreError::MissingReference {
                resource: Resource::MaterialType,
                id,
            }),
            _ => Ok(()),
        }
    }

    fn vendor_rows(&self) -> Vec<Vendor> {
        self.vendors.values().cloned().collect()
    }

    fn material_type_rows(&self) -> Vec<MaterialTypeRow> {
        self.material_types
            .values()
            .map(|m| self.material_type_row(m))
            .collect()
    }

    fn container_rows(&self) -> Vec<ContainerRow> {
        self.containers
            .values()
            .filter_map(|c| self.container_row(c))
            .collect()
    }
}

fn count<R: Schema>(rows: Vec<R>, plan: &Plan<R>) -> u64 {
    rows.iter().filter(|row| plan.matches(row)).count() as u64
}

fn search<R: Schema>(rows: Vec<R>, plan: &Plan<R>) -> Vec<R> {
    let mut rows: Vec<R> = rows.into_iter().filter(|row| plan.matches(row)).collect();
    rows.sort_by(|a, b| plan.compare(a, b));
    match plan.limit {
        Some(limit) => rows
            .into_iter()
            .skip(plan.offset as usize)
            .take(limit as usize)
            .collect(),
        None => rows,
    }
}

/// Process-local store with the same observable semantics as [`super::PgStore`],
/// including the foreign key checks on writes and the guard on deletes.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_vendor(&self, insert: VendorInsert) -> Result<Vendor, StoreError> {
        let mut tables = self.tables.write().await;
        let vendor = Vendor::from_insert(tables.next_id(), insert);
        tables.vendors.insert(vendor.id, vendor.clone());
        Ok(vendor)
    }

    async fn vendor(&self, id: i64) -> Result<Option<Vendor>, StoreError> {
        Ok(self.tables.read().await.vendors.get(&id).cloned())
    }

    async fn update_vendor(&self, id: i64, patch: VendorPatch) -> Result<Option<Vendor>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.vendors.get_mut(&id).map(|vendor| {
            vendor.apply(&patch);
            vendor.clone()
        }))
    }

    async fn delete_vendor(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.vendors.contains_key(&id) {
            return Ok(false);
        }
        if tables
            .material_types
            .values()
            .any(|m| m.vendor_id == Some(id))
        {
            return Err(StoreError::Referenced {
                resource: Resource::Vendor,
                id,
            });
        }
        tables.vendors.remove(&id);
        Ok(true)
    }

    async fn count_vendors(&self, plan: &Plan<Vendor>) -> Result<u64, StoreError> {
        let rows = self.tables.read().await.vendor_rows();
        Ok(count(rows, plan))
    }

    async fn search_vendors(&self, plan: &Plan<Vendor>) -> Result<Vec<Vendor>, StoreError> {
        let rows = self.tables.read().await.vendor_rows();
        Ok(search(rows, plan))
    }

    async fn insert_material_type(&self, insert: MaterialTypeInsert) -> Result<MaterialType, StoreError> {
        let mut tables = self.tables.write().await;
        tables.require_vendor(insert.vendor_id)?;
        let material_type = MaterialType::from_insert(tables.next_id(), insert);
        tables
            .material_types
            .insert(material_type.id, material_type.clone());
        Ok(material_type)
    }

    async fn material_type(&self, id: i64) -> Result<Option<MaterialTypeRow>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .material_types
            .get(&id)
            .map(|m| tables.material_type_row(m)))
    }

    async fn update_material_type(
        &self,
        id: i64,
        patch: MaterialTypePatch,
    ) -> Result<Option<MaterialType>, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.material_types.contains_key(&id) {
            return Ok(None);
        }
        tables.require_vendor(patch.vendor_id.flatten())?;
        Ok(tables.material_types.get_mut(&id).map(|material_type| {
            material_type.apply(&patch);
            material_type.clone()
        }))
    }

    async fn delete_material_type(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.material_types.contains_key(&id) {
            return Ok(false);
        }
        if tables
            .containers
            .values()
            .any(|c| c.material_type_id == id)
        {
            return Err(StoreError::Referenced {
                resource: Resource::MaterialType,
                id,
            });
        }
        tables.material_types.remove(&id);
        Ok(true)
    }

    async fn count_material_types(&self, plan: &Plan<MaterialTypeRow>) -> Result<u64, StoreError> {
        let rows = self.tables.read().await.material_type_rows();
        Ok(count(rows, plan))
    }

    async fn search_material_types(
        &self,
        plan: &Plan<MaterialTypeRow>,
    ) -> Result<Vec<MaterialTypeRow>, StoreError> {
        let rows = self.tables.read().await.material_type_rows();
        Ok(search(rows, plan))
    }

    async fn insert_container(&self, insert: ContainerInsert) -> Result<i64, StoreError> {
        let mut tables = self.tables.write().await;
        tables.require_material_type(Some(insert.material_type_id))?;
        let container = Container::from_insert(tables.next_id(), insert);
        let id = container.id;
        tables.containers.insert(id, container);
        Ok(id)
    }

    async fn container(&self, id: i64) -> Result<Option<ContainerRow>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .containers
            .get(&id)
            .and_then(|c| tables.container_row(c)))
    }

    async fn update_container(&self, id: i64, patch: ContainerPatch) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.containers.contains_key(&id) {
            return Ok(false);
        }
        tables.require_material_type(patch.material_type_id)?;
        match tables.containers.get_mut(&id) {
            Some(container) => {
                container.apply(&patch);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_container(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.containers.remove(&id).is_some())
    }

    async fn count_containers(&self, plan: &Plan<ContainerRow>) -> Result<u64, StoreError> {
        let rows = self.tables.read().await.container_rows();
        Ok(count(rows, plan))
    }

    async fn search_containers(&self, plan: &Plan<ContainerRow>) -> Result<Vec<ContainerRow>, StoreError> {
        let rows = self.tables.read().await.container_rows();
        Ok(search(rows, plan))
    }

    async fn add_used_weight(&self, id: i64, delta: f64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.containers.get_mut(&id) {
            Some(container) => {
                container.used_weight = (container.used_weight + delta).max(0.0);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_used(&self, id: i64, at: OffsetDateTime) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(container) = tables.containers.get_mut(&id) {
            container.first_used.get_or_insert(at);
            container.last_used = Some(at);
        }
        Ok(())
    }

    async fn distinct_values(&self, field: DistinctField) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        let values: BTreeSet<&String> = match field {
            DistinctField::Material => tables
                .material_types
                .values()
                .filter_map(|m| m.material.as_ref())
                .collect(),
            DistinctField::ArticleNumber => tables
                .material_types
                .values()
                .filter_map(|m| m.article_number.as_ref())
                .collect(),
            DistinctField::Location => tables
                .containers
                .values()
                .filter_map(|c| c.location.as_ref())
                .collect(),
            DistinctField::LotNr => tables
                .containers
                .values()
                .filter_map(|c| c.lot_nr.as_ref())
                .collect(),
        };
        Ok(values.into_iter().cloned().collect())
    }
}
