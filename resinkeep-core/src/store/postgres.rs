use std::collections::HashMap;

use async_trait::async_trait;
use resinkeep_sdk::objects::Resource;
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use super::{DistinctField, Store, StoreError};
use crate::entities::{
    Container, ContainerInsert, ContainerPatch, ContainerRow, MaterialType, MaterialTypeInsert,
    MaterialTypePatch, MaterialTypeRow, Vendor, VendorInsert, VendorPatch,
};
use crate::query::{Direction, Plan, Predicate, Schema};

/// SQLSTATE foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL-backed [`Store`].
///
/// Searches run in two steps: the filtered, ordered and paged id list is
/// selected over the joined tables, then the entities are loaded by id and
/// assembled in that order.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn count_plan<R: Schema>(&self, plan: &Plan<R>) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        qb.push(R::SQL_FROM);
        push_predicates(&mut qb, &plan.predicates);
        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn select_ids<R: Schema>(&self, plan: &Plan<R>) -> Result<Vec<i64>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(R::SQL_ID).push(" FROM ").push(R::SQL_FROM);
        push_predicates(&mut qb, &plan.predicates);

        qb.push(" ORDER BY ");
        for key in &plan.sort {
            qb.push(key.field.column);
            qb.push(match key.direction {
                Direction::Asc => " ASC NULLS LAST, ",
                Direction::Desc => " DESC NULLS FIRST, ",
            });
        }
        qb.push(R::SQL_ID).push(" ASC");

        if let Some(limit) = plan.limit {
            qb.push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX))
                .push(" OFFSET ")
                .push_bind(i64::try_from(plan.offset).unwrap_or(i64::MAX));
        }

        let ids = qb.build_query_scalar().fetch_all(&self.pool).await?;
        Ok(ids)
    }

    async fn vendors_by_id(&self, ids: &[i64]) -> Result<HashMap<i64, Vendor>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let vendors = sqlx::query_as::<_, Vendor>(
            "SELECT id, registered, name, comment, empty_container_weight \
             FROM vendor WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(vendors.into_iter().map(|v| (v.id, v)).collect())
    }

    async fn material_types_by_id(&self, ids: &[i64]) -> Result<HashMap<i64, MaterialType>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let material_types = sqlx::query_as::<_, MaterialType>(
            "SELECT id, registered, name, vendor_id, material, price, density, diameter, weight, \
             container_weight, article_number, comment, cure_temp, cure_time, wash_time, color_hex \
             FROM material_type WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(material_types.into_iter().map(|m| (m.id, m)).collect())
    }

    async fn containers_by_id(&self, ids: &[i64]) -> Result<HashMap<i64, Container>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let containers = sqlx::query_as::<_, Container>(
            "SELECT id, registered, first_used, last_used, material_type_id, used_weight, \
             location, lot_nr, comment, archived \
             FROM container WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(containers.into_iter().map(|c| (c.id, c)).collect())
    }

    /// Load material types with their vendors, in the order of `ids`.
    async fn material_type_rows(&self, ids: &[i64]) -> Result<Vec<MaterialTypeRow>, StoreError> {
        let mut material_types = self.material_types_by_id(ids).await?;
        let vendor_ids: Vec<i64> = material_types.values().filter_map(|m| m.vendor_id).collect();
        let vendors = self.vendors_by_id(&vendor_ids).await?;
        Ok(ids
            .iter()
            .filter_map(|id| material_types.remove(id))
            .map(|material_type| MaterialTypeRow {
                vendor: material_type
                    .vendor_id
                    .and_then(|id| vendors.get(&id))
                    .cloned(),
                material_type,
            })
            .collect())
    }

    /// Load containers with their material types and vendors, in the order
    /// of `ids`.
    async fn container_rows(&self, ids: &[i64]) -> Result<Vec<ContainerRow>, StoreError> {
        let mut containers = self.containers_by_id(ids).await?;
        let material_type_ids: Vec<i64> = containers.values().map(|c| c.material_type_id).collect();
        let material_types = self.material_types_by_id(&material_type_ids).await?;
        let vendor_ids: Vec<i64> = material_types.values().filter_map(|m| m.vendor_id).collect();
        let vendors = self.vendors_by_id(&vendor_ids).await?;
        Ok(ids
            .iter()
            .filter_map(|id| containers.remove(id))
            .filter_map(|container| {
                let material_type = material_types.get(&container.material_type_id)?.clone();
                Some(ContainerRow {
                    vendor: material_type
                        .vendor_id
                        .and_then(|id| vendors.get(&id))
                        .cloned(),
                    material_type,
                    container,
                })
            })
            .collect())
    }

    /// Run `sql` (a single-row delete bound to `id`) in a transaction,
    /// translating a foreign key violation into [`StoreError::Referenced`].
    async fn guarded_delete(&self, sql: &'static str, resource: Resource, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        match sqlx::query(sql).bind(id).execute(&mut *tx).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result.rows_affected() > 0)
            }
            Err(err) if is_foreign_key_violation(&err) => {
                tx.rollback().await?;
                Err(StoreError::Referenced { resource, id })
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == FOREIGN_KEY_VIOLATION)
}

/// Error mapper for writes whose only foreign key points at `resource`.
fn missing_reference(resource: Resource, id: Option<i64>) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| match id {
        Some(id) if is_foreign_key_violation(&err) => StoreError::MissingReference { resource, id },
        _ => err.into(),
    }
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_predicates<R: 'static>(qb: &mut QueryBuilder<'_, Postgres>, predicates: &[Predicate<R>]) {
    for (i, predicate) in predicates.iter().enumerate() {
        qb.push(if i == 0 { " WHERE (" } else { " AND (" });
        match predicate {
            Predicate::IdIn {
                field,
                ids,
                include_null,
            } => {
                if ids.is_empty() && !include_null {
                    qb.push("FALSE");
                } else if ids.is_empty() {
                    qb.push(field.column).push(" IS NULL");
                } else {
                    qb.push(field.column)
                        .push(" = ANY(")
                        .push_bind(ids.clone())
                        .push(")");
                    if *include_null {
                        qb.push(" OR ").push(field.column).push(" IS NULL");
                    }
                }
            }
            Predicate::TextContains {
                field,
                terms,
                include_empty,
            } => {
                let mut alternatives = qb.separated(" OR ");
                for term in terms {
                    alternatives
                        .push(field.column)
                        .push_unseparated(" ILIKE ")
                        .push_bind_unseparated(format!("%{}%", escape_like(term)))
                        .push_unseparated(" ESCAPE '\\'");
                }
                if *include_empty {
                    alternatives
                        .push(field.column)
                        .push_unseparated(" IS NULL OR ")
                        .push_unseparated(field.column)
                        .push_unseparated(" = ''");
                }
                if terms.is_empty() && !include_empty {
                    alternatives.push("FALSE");
                }
            }
            Predicate::NotTrue { field } => {
                qb.push(field.column).push(" IS NOT TRUE");
            }
        }
        qb.push(")");
    }
}

fn assign<'args, T>(set: &mut Separated<'_, 'args, Postgres, &'static str>, column: &'static str, value: Option<T>)
where
    T: 'args + sqlx::Encode<'args, Postgres> + sqlx::Type<Postgres> + Send,
{
    if let Some(value) = value {
        set.push(column)
            .push_unseparated(" = ")
            .push_bind_unseparated(value);
    }
}

#[async_trait]
impl Store for PgStore {
    #[tracing::instrument(skip_all, err, name = "SQL:InsertVendor")]
    async fn insert_vendor(&self, insert: VendorInsert) -> Result<Vendor, StoreError> {
        let vendor = sqlx::query_as::<_, Vendor>(
            "INSERT INTO vendor (registered, name, comment, empty_container_weight) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, registered, name, comment, empty_container_weight",
        )
        .bind(insert.registered)
        .bind(insert.name)
        .bind(insert.comment)
        .bind(insert.empty_container_weight)
        .fetch_one(&self.pool)
        .await?;
        Ok(vendor)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:GetVendor")]
    async fn vendor(&self, id: i64) -> Result<Option<Vendor>, StoreError> {
        Ok(self.vendors_by_id(&[id]).await?.remove(&id))
    }

    #[tracing::instrument(skip_all, err, name = "SQL:UpdateVendor")]
    async fn update_vendor(&self, id: i64, patch: VendorPatch) -> Result<Option<Vendor>, StoreError> {
        if patch.is_empty() {
            return self.vendor(id).await;
        }
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE vendor SET ");
        let mut set = qb.separated(", ");
        assign(&mut set, "name", patch.name);
        assign(&mut set, "comment", patch.comment);
        assign(&mut set, "empty_container_weight", patch.empty_container_weight);
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING id, registered, name, comment, empty_container_weight");
        let vendor = qb.build_query_as::<Vendor>().fetch_optional(&self.pool).await?;
        Ok(vendor)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:DeleteVendor")]
    async fn delete_vendor(&self, id: i64) -> Result<bool, StoreError> {
        self.guarded_delete("DELETE FROM vendor WHERE id = $1", Resource::Vendor, id)
            .await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:CountVendors")]
    async fn count_vendors(&self, plan: &Plan<Vendor>) -> Result<u64, StoreError> {
        self.count_plan(plan).await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:SearchVendors")]
    async fn search_vendors(&self, plan: &Plan<Vendor>) -> Result<Vec<Vendor>, StoreError> {
        let ids = self.select_ids(plan).await?;
        let mut vendors = self.vendors_by_id(&ids).await?;
        Ok(ids.iter().filter_map(|id| vendors.remove(id)).collect())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:InsertMaterialType")]
    async fn insert_material_type(&self, insert: MaterialTypeInsert) -> Result<MaterialType, StoreError> {
        let vendor_id = insert.vendor_id;
        let material_type = sqlx::query_as::<_, MaterialType>(
            "INSERT INTO material_type (registered, name, vendor_id, material, price, density, \
             diameter, weight, container_weight, article_number, comment, cure_temp, cure_time, \
             wash_time, color_hex) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING id, registered, name, vendor_id, material, price, density, diameter, weight, \
             container_weight, article_number, comment, cure_temp, cure_time, wash_time, color_hex",
        )
        .bind(insert.registered)
        .bind(insert.name)
        .bind(insert.vendor_id)
        .bind(insert.material)
        .bind(insert.price)
        .bind(insert.density)
        .bind(insert.diameter)
        .bind(insert.weight)
        .bind(insert.container_weight)
        .bind(insert.article_number)
        .bind(insert.comment)
        .bind(insert.cure_temp)
        .bind(insert.cure_time)
        .bind(insert.wash_time)
        .bind(insert.color_hex)
        .fetch_one(&self.pool)
        .await
        .map_err(missing_reference(Resource::Vendor, vendor_id))?;
        Ok(material_type)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:GetMaterialType")]
    async fn material_type(&self, id: i64) -> Result<Option<MaterialTypeRow>, StoreError> {
        Ok(self.material_type_rows(&[id]).await?.pop())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:UpdateMaterialType")]
    async fn update_material_type(
        &self,
        id: i64,
        patch: MaterialTypePatch,
    ) -> Result<Option<MaterialType>, StoreError> {
        if patch.is_empty() {
            return Ok(self.material_types_by_id(&[id]).await?.remove(&id));
        }
        let vendor_id = patch.vendor_id.flatten();
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE material_type SET ");
        let mut set = qb.separated(", ");
        assign(&mut set, "name", patch.name);
        assign(&mut set, "vendor_id", patch.vendor_id);
        assign(&mut set, "material", patch.material);
        assign(&mut set, "price", patch.price);
        assign(&mut set, "density", patch.density);
        assign(&mut set, "diameter", patch.diameter);
        assign(&mut set, "weight", patch.weight);
        assign(&mut set, "container_weight", patch.container_weight);
        assign(&mut set, "article_number", patch.article_number);
        assign(&mut set, "comment", patch.comment);
        assign(&mut set, "cure_temp", patch.cure_temp);
        assign(&mut set, "cure_time", patch.cure_time);
        assign(&mut set, "wash_time", patch.wash_time);
        assign(&mut set, "color_hex", patch.color_hex);
        qb.push(" WHERE id = ").push_bind(id).push(
            " RETURNING id, registered, name, vendor_id, material, price, density, diameter, \
             weight, container_weight, article_number, comment, cure_temp, cure_time, wash_time, \
             color_hex",
        );
        let material_type = qb
            .build_query_as::<MaterialType>()
            .fetch_optional(&self.pool)
            .await
            .map_err(missing_reference(Resource::Vendor, vendor_id))?;
        Ok(material_type)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:DeleteMaterialType")]
    async fn delete_material_type(&self, id: i64) -> Result<bool, StoreError> {
        self.guarded_delete(
            "DELETE FROM material_type WHERE id = $1",
            Resource::MaterialType,
            id,
        )
        .await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:CountMaterialTypes")]
    async fn count_material_types(&self, plan: &Plan<MaterialTypeRow>) -> Result<u64, StoreError> {
        self.count_plan(plan).await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:SearchMaterialTypes")]
    async fn search_material_types(
        &self,
        plan: &Plan<MaterialTypeRow>,
    ) -> Result<Vec<MaterialTypeRow>, StoreError> {
        let ids = self.select_ids(plan).await?;
        self.material_type_rows(&ids).await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:InsertContainer")]
    async fn insert_container(&self, insert: ContainerInsert) -> Result<i64, StoreError> {
        let material_type_id = insert.material_type_id;
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO container (registered, first_used, last_used, material_type_id, \
             used_weight, location, lot_nr, comment, archived) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
        )
        .bind(insert.registered)
        .bind(insert.first_used)
        .bind(insert.last_used)
        .bind(insert.material_type_id)
        .bind(insert.used_weight)
        .bind(insert.location)
        .bind(insert.lot_nr)
        .bind(insert.comment)
        .bind(insert.archived)
        .fetch_one(&self.pool)
        .await
        .map_err(missing_reference(Resource::MaterialType, Some(material_type_id)))?;
        Ok(id)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:GetContainer")]
    async fn container(&self, id: i64) -> Result<Option<ContainerRow>, StoreError> {
        Ok(self.container_rows(&[id]).await?.pop())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:UpdateContainer")]
    async fn update_container(&self, id: i64, patch: ContainerPatch) -> Result<bool, StoreError> {
        if patch.is_empty() {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM container WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            return Ok(exists.is_some());
        }
        let material_type_id = patch.material_type_id;
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE container SET ");
        let mut set = qb.separated(", ");
        assign(&mut set, "first_used", patch.first_used);
        assign(&mut set, "last_used", patch.last_used);
        assign(&mut set, "material_type_id", patch.material_type_id);
        assign(&mut set, "used_weight", patch.used_weight);
        assign(&mut set, "location", patch.location);
        assign(&mut set, "lot_nr", patch.lot_nr);
        assign(&mut set, "comment", patch.comment);
        assign(&mut set, "archived", patch.archived);
        qb.push(" WHERE id = ").push_bind(id);
        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(missing_reference(Resource::MaterialType, material_type_id))?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:DeleteContainer")]
    async fn delete_container(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM container WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:CountContainers")]
    async fn count_containers(&self, plan: &Plan<ContainerRow>) -> Result<u64, StoreError> {
        self.count_plan(plan).await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:SearchContainers")]
    async fn search_containers(&self, plan: &Plan<ContainerRow>) -> Result<Vec<ContainerRow>, StoreError> {
        let ids = self.select_ids(plan).await?;
        self.container_rows(&ids).await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:AddUsedWeight")]
    async fn add_used_weight(&self, id: i64, delta: f64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE container SET used_weight = GREATEST(used_weight + $1, 0) WHERE id = $2",
        )
        .bind(delta)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:MarkContainerUsed")]
    async fn mark_used(&self, id: i64, at: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE container SET last_used = $1, first_used = COALESCE(first_used, $1) \
             WHERE id = $2",
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:DistinctValues")]
    async fn distinct_values(&self, field: DistinctField) -> Result<Vec<String>, StoreError> {
        let sql = match field {
            DistinctField::Material => {
                "SELECT DISTINCT material FROM material_type WHERE material IS NOT NULL ORDER BY 1"
            }
            DistinctField::ArticleNumber => {
                "SELECT DISTINCT article_number FROM material_type \
                 WHERE article_number IS NOT NULL ORDER BY 1"
            }
            DistinctField::Location => {
                "SELECT DISTINCT location FROM container WHERE location IS NOT NULL ORDER BY 1"
            }
            DistinctField::LotNr => {
                "SELECT DISTINCT lot_nr FROM container WHERE lot_nr IS NOT NULL ORDER BY 1"
            }
        };
        let values = sqlx::query_scalar::<_, String>(sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Filter, IdSet, Query, TermSet};

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("grey"), "grey");
    }

    #[test]
    fn test_missing_reference_keeps_other_errors() {
        let err = missing_reference(Resource::Vendor, Some(7))(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
        let err = missing_reference(Resource::MaterialType, None)(sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Database(sqlx::Error::PoolClosed)));
    }

    #[test]
    fn test_search_sql_shape() {
        let query = Query::<ContainerRow>::new()
            .filter(Filter::IdIn {
                path: "material_type.vendor.id",
                set: IdSet {
                    ids: vec![2],
                    include_null: true,
                },
            })
            .filter(Filter::TextContains {
                path: "location",
                set: TermSet {
                    terms: vec!["shelf".to_string()],
                    include_empty: false,
                },
            })
            .filter(Filter::NotTrue { path: "archived" })
            .sort_by("remaining_weight", Direction::Desc)
            .page(Some(10), 0);
        let plan = Plan::resolve(&query).unwrap();

        let mut qb = QueryBuilder::<Postgres>::new("SELECT c.id FROM ");
        qb.push(ContainerRow::SQL_FROM);
        push_predicates(&mut qb, &plan.predicates);
        let sql = qb.sql();
        assert!(sql.contains(" WHERE (v.id = ANY($1) OR v.id IS NULL)"));
        assert!(sql.contains(" AND (c.location ILIKE $2 ESCAPE '\\')"));
        assert!(sql.ends_with(" AND (c.archived IS NOT TRUE)"));
    }
}
