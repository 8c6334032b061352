use kanau::processor::Processor;
use resinkeep_sdk::objects::{
    ContainerParameters, ContainerResponse, ContainerUpdateParameters, ContainerUseParameters,
    EventKind, EventPayload, Resource,
};

use super::{
    MAX_COMMENT_LEN, MAX_NAME_LEN, MutationCoordinator, check_len, check_non_negative, patched,
    required,
};
use crate::entities::{ContainerInsert, ContainerPatch, MaterialType, now_utc, to_utc};
use crate::error::DomainError;

#[derive(Debug, Clone)]
pub struct CreateContainer(pub ContainerParameters);

#[derive(Debug, Clone)]
pub struct UpdateContainer {
    pub id: i64,
    pub params: ContainerUpdateParameters,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteContainer {
    pub id: i64,
}

/// Consume material from a container, by weight or by length.
#[derive(Debug, Clone, Copy)]
pub struct ConsumeContainer {
    pub id: i64,
    pub usage: ContainerUseParameters,
}

/// `used_weight` implied by a remaining weight, given the material type's
/// full weight.
fn used_from_remaining(material_type: &MaterialType, remaining: f64) -> Result<f64, DomainError> {
    let capacity = material_type.weight.ok_or_else(|| {
        DomainError::Create(format!(
            "material type {} has no weight, cannot derive used weight from remaining weight",
            material_type.id
        ))
    })?;
    Ok((capacity - remaining).max(0.0))
}

fn check_text_fields(
    location: Option<&str>,
    lot_nr: Option<&str>,
    comment: Option<&str>,
) -> Result<(), DomainError> {
    check_len("location", location, MAX_NAME_LEN)?;
    check_len("lot_nr", lot_nr, MAX_NAME_LEN)?;
    check_len("comment", comment, MAX_COMMENT_LEN)
}

impl MutationCoordinator {
    async fn container_response(&self, id: i64) -> Result<ContainerResponse, DomainError> {
        Ok(ContainerResponse::from(&self.require_container(id).await?))
    }
}

impl Processor<CreateContainer> for MutationCoordinator {
    type Output = ContainerResponse;
    type Error = DomainError;

    async fn process(
        &self,
        CreateContainer(params): CreateContainer,
    ) -> Result<ContainerResponse, DomainError> {
        check_text_fields(
            params.location.as_deref(),
            params.lot_nr.as_deref(),
            params.comment.as_deref(),
        )?;
        check_non_negative("remaining_weight", params.remaining_weight)?;
        check_non_negative("used_weight", params.used_weight)?;
        if params.remaining_weight.is_some() && params.used_weight.is_some() {
            return Err(DomainError::validation(
                "remaining_weight and used_weight cannot both be set",
            ));
        }

        let material_type = self.require_material_type(params.material_type_id).await?;
        let used_weight = match (params.remaining_weight, params.used_weight) {
            (Some(remaining), _) => used_from_remaining(&material_type.material_type, remaining)?,
            (None, Some(used)) => used,
            (None, None) => 0.0,
        };

        let id = self
            .store()
            .insert_container(ContainerInsert {
                registered: now_utc(),
                first_used: params.first_used.map(to_utc),
                last_used: params.last_used.map(to_utc),
                material_type_id: params.material_type_id,
                used_weight,
                location: params.location,
                lot_nr: params.lot_nr,
                comment: params.comment,
                archived: params.archived,
            })
            .await?;
        tracing::info!(container_id = id, "Container created");

        let response = self.container_response(id).await?;
        self.publish(EventKind::Added, EventPayload::Container(response.clone()));
        Ok(response)
    }
}

impl Processor<UpdateContainer> for MutationCoordinator {
    type Output = ContainerResponse;
    type Error = DomainError;

    async fn process(
        &self,
        UpdateContainer { id, params }: UpdateContainer,
    ) -> Result<ContainerResponse, DomainError> {
        let material_type_id = required("material_type_id", params.material_type_id)?;
        let remaining_weight = required("remaining_weight", params.remaining_weight)?;
        let used_weight = required("used_weight", params.used_weight)?;
        let archived = required("archived", params.archived)?;
        check_text_fields(
            patched(&params.location).map(String::as_str),
            patched(&params.lot_nr).map(String::as_str),
            patched(&params.comment).map(String::as_str),
        )?;
        check_non_negative("remaining_weight", remaining_weight)?;
        check_non_negative("used_weight", used_weight)?;
        if remaining_weight.is_some() && used_weight.is_some() {
            return Err(DomainError::validation(
                "remaining_weight and used_weight cannot both be set",
            ));
        }

        let new_material_type = match material_type_id {
            Some(material_type_id) => Some(self.require_material_type(material_type_id).await?),
            None => None,
        };
        let used_weight = match remaining_weight {
            Some(remaining) => {
                let material_type = match new_material_type {
                    Some(row) => row.material_type,
                    None => self.require_container(id).await?.material_type,
                };
                Some(used_from_remaining(&material_type, remaining)?)
            }
            None => used_weight,
        };

        let patch = ContainerPatch {
            first_used: params.first_used.map(|value| value.map(to_utc)),
            last_used: params.last_used.map(|value| value.map(to_utc)),
            material_type_id,
            used_weight,
            location: params.location,
            lot_nr: params.lot_nr,
            comment: params.comment,
            archived,
        };
        if !patch.is_empty() && !self.store().update_container(id, patch).await? {
            return Err(DomainError::NotFound {
                resource: Resource::Container,
                id,
            });
        }
        tracing::info!(container_id = id, "Container updated");

        let response = self.container_response(id).await?;
        self.publish(EventKind::Updated, EventPayload::Container(response.clone()));
        Ok(response)
    }
}

impl Processor<DeleteContainer> for MutationCoordinator {
    type Output = ContainerResponse;
    type Error = DomainError;

    async fn process(&self, DeleteContainer { id }: DeleteContainer) -> Result<ContainerResponse, DomainError> {
        let snapshot = self.container_response(id).await?;
        if !self.store().delete_container(id).await? {
            return Err(DomainError::NotFound {
                resource: Resource::Container,
                id,
            });
        }
        tracing::info!(container_id = id, "Container deleted");

        self.publish(EventKind::Deleted, EventPayload::Container(snapshot.clone()));
        Ok(snapshot)
    }
}

impl Processor<ConsumeContainer> for MutationCoordinator {
    type Output = ContainerResponse;
    type Error = DomainError;

    /// The used weight is adjusted by one conditional update in the store,
    /// so concurrent consumers on the same container never lose an update.
    /// The usage timestamps are written afterwards and may race.
    async fn process(
        &self,
        ConsumeContainer { id, usage }: ConsumeContainer,
    ) -> Result<ContainerResponse, DomainError> {
        let delta = match (usage.use_weight, usage.use_length) {
            (Some(_), Some(_)) => {
                return Err(DomainError::validation(
                    "use_weight and use_length cannot both be set",
                ));
            }
            (None, None) => {
                return Err(DomainError::validation(
                    "either use_weight or use_length must be set",
                ));
            }
            (Some(weight), None) => weight,
            (None, Some(length)) => {
                if !length.is_finite() {
                    return Err(DomainError::validation("use_length must be a finite number"));
                }
                self.require_container(id)
                    .await?
                    .material_type
                    .weight_from_length(length)
            }
        };
        if !delta.is_finite() {
            return Err(DomainError::validation("use_weight must be a finite number"));
        }

        if !self.store().add_used_weight(id, delta).await? {
            return Err(DomainError::NotFound {
                resource: Resource::Container,
                id,
            });
        }
        // The weight change above is committed regardless of this write.
        if let Err(e) = self.store().mark_used(id, now_utc()).await {
            tracing::warn!(container_id = id, error = %e, "Failed to record container usage time");
        }
        tracing::debug!(container_id = id, grams = delta, "Container consumed");

        let response = self.container_response(id).await?;
        self.publish(EventKind::Updated, EventPayload::Container(response.clone()));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::broker::Topic;
    use crate::entities::{
        ContainerInsert, ContainerPatch, ContainerRow, MaterialType as MaterialTypeEntity,
        MaterialTypeInsert, MaterialTypePatch, MaterialTypeRow, Vendor, VendorInsert, VendorPatch,
    };
    use crate::mutation::test_support::{container, container_params, coordinator, material_type, watch};
    use crate::query::Plan;
    use crate::store::{DistinctField, Store, StoreError};

    #[tokio::test]
    async fn test_create_from_remaining_weight() {
        let coordinator = coordinator();
        let resin = material_type(&coordinator, None, Some(1000.0)).await;

        let mut params = container_params(resin.id);
        params.remaining_weight = Some(250.0);
        let created = coordinator.process(CreateContainer(params)).await.unwrap();
        assert_eq!(created.used_weight, 750.0);
        assert_eq!(created.remaining_weight, Some(250.0));

        // Overfilled containers clamp to zero used.
        let mut params = container_params(resin.id);
        params.remaining_weight = Some(1500.0);
        let created = coordinator.process(CreateContainer(params)).await.unwrap();
        assert_eq!(created.used_weight, 0.0);
    }

    #[tokio::test]
    async fn test_create_defaults_to_full() {
        let coordinator = coordinator();
        let resin = material_type(&coordinator, None, Some(1000.0)).await;
        let mut events = watch(&coordinator, Topic::resource(Resource::Container));

        let created = container(&coordinator, resin.id).await;
        assert_eq!(created.used_weight, 0.0);
        assert_eq!(created.remaining_weight, Some(1000.0));
        assert_eq!(created.material_type, resin);

        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::Added);
        assert_eq!(event.payload.id(), created.id);
    }

    #[tokio::test]
    async fn test_create_rejects_conflicting_weights() {
        let coordinator = coordinator();
        let resin = material_type(&coordinator, None, Some(1000.0)).await;

        let mut params = container_params(resin.id);
        params.remaining_weight = Some(100.0);
        params.used_weight = Some(900.0);
        let err = coordinator.process(CreateContainer(params)).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_remaining_without_capacity() {
        let coordinator = coordinator();
        let resin = material_type(&coordinator, None, None).await;

        let mut params = container_params(resin.id);
        params.remaining_weight = Some(100.0);
        let err = coordinator.process(CreateContainer(params)).await.unwrap_err();
        assert!(matches!(err, DomainError::Create(_)));
    }

    #[tokio::test]
    async fn test_create_unknown_material_type() {
        let coordinator = coordinator();
        let err = coordinator
            .process(CreateContainer(container_params(404)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::NotFound {
                resource: Resource::MaterialType,
                id: 404
            }
        ));
    }

    #[tokio::test]
    async fn test_update_rules() {
        let coordinator = coordinator();
        let small = material_type(&coordinator, None, Some(500.0)).await;
        let large = material_type(&coordinator, None, Some(1000.0)).await;
        let bottle = container(&coordinator, small.id).await;

        let update = |params| UpdateContainer { id: bottle.id, params };

        let err = coordinator
            .process(update(ContainerUpdateParameters {
                material_type_id: Some(None),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = coordinator
            .process(update(ContainerUpdateParameters {
                material_type_id: Some(Some(9999)),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: Resource::MaterialType, .. }));

        // Remaining weight resolves against the newly assigned material type.
        let updated = coordinator
            .process(update(ContainerUpdateParameters {
                material_type_id: Some(Some(large.id)),
                remaining_weight: Some(Some(400.0)),
                location: Some(Some("Shelf A".to_string())),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(updated.material_type.id, large.id);
        assert_eq!(updated.used_weight, 600.0);
        assert_eq!(updated.location.as_deref(), Some("Shelf A"));

        // Untouched fields survive.
        let updated = coordinator
            .process(update(ContainerUpdateParameters {
                archived: Some(Some(true)),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert!(updated.archived);
        assert_eq!(updated.used_weight, 600.0);
        assert_eq!(updated.location.as_deref(), Some("Shelf A"));
    }

    #[tokio::test]
    async fn test_consume_by_weight_clamps_at_zero() {
        let coordinator = coordinator();
        let resin = material_type(&coordinator, None, Some(1000.0)).await;
        let bottle = container(&coordinator, resin.id).await;
        let mut events = watch(&coordinator, Topic::entity(Resource::Container, bottle.id));

        let used = coordinator
            .process(ConsumeContainer {
                id: bottle.id,
                usage: ContainerUseParameters::weight(120.0),
            })
            .await
            .unwrap();
        assert_eq!(used.used_weight, 120.0);
        assert!(used.first_used.is_some());
        assert_eq!(used.first_used, used.last_used);
        assert_eq!(events.recv().await.unwrap().kind, EventKind::Updated);

        let returned = coordinator
            .process(ConsumeContainer {
                id: bottle.id,
                usage: ContainerUseParameters::weight(-500.0),
            })
            .await
            .unwrap();
        assert_eq!(returned.used_weight, 0.0);
        assert_eq!(returned.first_used, used.first_used);
    }

    #[tokio::test]
    async fn test_consume_by_length() {
        let coordinator = coordinator();
        let resin = material_type(&coordinator, None, Some(1000.0)).await;
        let bottle = container(&coordinator, resin.id).await;

        let used = coordinator
            .process(ConsumeContainer {
                id: bottle.id,
                usage: ContainerUseParameters::length(1000.0),
            })
            .await
            .unwrap();
        // pi * (1.75 / 2)^2 * 1000 mm³ = 2.405 cm³ at 1.25 g/cm³
        assert!((used.used_weight - 3.0066).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_consume_rejects_ambiguous_usage() {
        let coordinator = coordinator();
        let resin = material_type(&coordinator, None, Some(1000.0)).await;
        let bottle = container(&coordinator, resin.id).await;

        for usage in [
            ContainerUseParameters::default(),
            ContainerUseParameters {
                use_weight: Some(1.0),
                use_length: Some(1.0),
            },
            ContainerUseParameters::weight(f64::NAN),
        ] {
            let err = coordinator
                .process(ConsumeContainer { id: bottle.id, usage })
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }

        let err = coordinator
            .process(ConsumeContainer {
                id: bottle.id + 1,
                usage: ContainerUseParameters::weight(1.0),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: Resource::Container, .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumption_sums_all_deltas() {
        let coordinator = Arc::new(coordinator());
        let resin = material_type(&coordinator, None, Some(1000.0)).await;
        let bottle = container(&coordinator, resin.id).await;

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    coordinator
                        .process(ConsumeContainer {
                            id: bottle.id,
                            usage: ContainerUseParameters::weight(2.0),
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let final_state = coordinator.container_response(bottle.id).await.unwrap();
        assert_eq!(final_state.used_weight, 100.0);
    }

    #[tokio::test]
    async fn test_delete_publishes_snapshot() {
        let coordinator = coordinator();
        let resin = material_type(&coordinator, None, Some(1000.0)).await;
        let bottle = container(&coordinator, resin.id).await;
        let mut events = watch(&coordinator, Topic::resource(Resource::Container));

        let deleted = coordinator
            .process(DeleteContainer { id: bottle.id })
            .await
            .unwrap();
        assert_eq!(deleted, bottle);
        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::Deleted);
        assert_eq!(event.payload, EventPayload::Container(bottle));
    }

    /// Delegates to [`MemoryStore`] but fails every `mark_used`.
    struct UnmarkableStore(crate::store::MemoryStore);

    #[async_trait::async_trait]
    impl Store for UnmarkableStore {
        async fn insert_vendor(&self, insert: VendorInsert) -> Result<Vendor, StoreError> {
            self.0.insert_vendor(insert).await
        }
        async fn vendor(&self, id: i64) -> Result<Option<Vendor>, StoreError> {
            self.0.vendor(id).await
        }
        async fn update_vendor(&self, id: i64, patch: VendorPatch) -> Result<Option<Vendor>, StoreError> {
            self.0.update_vendor(id, patch).await
        }
        async fn delete_vendor(&self, id: i64) -> Result<bool, StoreError> {
            self.0.delete_vendor(id).await
        }
        async fn count_vendors(&self, plan: &Plan<Vendor>) -> Result<u64, StoreError> {
            self.0.count_vendors(plan).await
        }
        async fn search_vendors(&self, plan: &Plan<Vendor>) -> Result<Vec<Vendor>, StoreError> {
            self.0.search_vendors(plan).await
        }
        async fn insert_material_type(&self, insert: MaterialTypeInsert) -> Result<MaterialTypeEntity, StoreError> {
            self.0.insert_material_type(insert).await
        }
        async fn material_type(&self, id: i64) -> Result<Option<MaterialTypeRow>, StoreError> {
            self.0.material_type(id).await
        }
        async fn update_material_type(
            &self,
            id: i64,
            patch: MaterialTypePatch,
        ) -> Result<Option<MaterialTypeEntity>, StoreError> {
            self.0.update_material_type(id, patch).await
        }
        async fn delete_material_type(&self, id: i64) -> Result<bool, StoreError> {
            self.0.delete_material_type(id).await
        }
        async fn count_material_types(&self, plan: &Plan<MaterialTypeRow>) -> Result<u64, StoreError> {
            self.0.count_material_types(plan).await
        }
        async fn search_material_types(
            &self,
            plan: &Plan<MaterialTypeRow>,
        ) -> Result<Vec<MaterialTypeRow>, StoreError> {
            self.0.search_material_types(plan).await
        }
        async fn insert_container(&self, insert: ContainerInsert) -> Result<i64, StoreError> {
            self.0.insert_container(insert).await
        }
        async fn container(&self, id: i64) -> Result<Option<ContainerRow>, StoreError> {
            self.0.container(id).await
        }
        async fn update_container(&self, id: i64, patch: ContainerPatch) -> Result<bool, StoreError> {
            self.0.update_container(id, patch).await
        }
        async fn delete_container(&self, id: i64) -> Result<bool, StoreError> {
            self.0.delete_container(id).await
        }
        async fn count_containers(&self, plan: &Plan<ContainerRow>) -> Result<u64, StoreError> {
            self.0.count_containers(plan).await
        }
        async fn search_containers(&self, plan: &Plan<ContainerRow>) -> Result<Vec<ContainerRow>, StoreError> {
            self.0.search_containers(plan).await
        }
        async fn add_used_weight(&self, id: i64, delta: f64) -> Result<bool, StoreError> {
            self.0.add_used_weight(id, delta).await
        }
        async fn mark_used(&self, _id: i64, _at: time::OffsetDateTime) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
        async fn distinct_values(&self, field: DistinctField) -> Result<Vec<String>, StoreError> {
            self.0.distinct_values(field).await
        }
    }

    #[tokio::test]
    async fn test_consume_publishes_when_usage_time_fails() {
        let coordinator = MutationCoordinator::new(
            Arc::new(UnmarkableStore(crate::store::MemoryStore::new())),
            crate::broker::NotificationBroker::new(8),
        );
        let resin = material_type(&coordinator, None, Some(1000.0)).await;
        let bottle = container(&coordinator, resin.id).await;
        let mut events = watch(&coordinator, Topic::entity(Resource::Container, bottle.id));

        let consumed = coordinator
            .process(ConsumeContainer {
                id: bottle.id,
                usage: ContainerUseParameters::weight(40.0),
            })
            .await
            .unwrap();
        assert_eq!(consumed.used_weight, 40.0);
        assert_eq!(consumed.last_used, None);

        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::Updated);
        assert_eq!(event.payload, EventPayload::Container(consumed));
    }
}
