use kanau::processor::Processor;
use resinkeep_sdk::objects::{
    EventKind, EventPayload, MaterialTypeParameters, MaterialTypeResponse,
    MaterialTypeUpdateParameters, Resource,
};

use super::{
    MAX_COMMENT_LEN, MAX_NAME_LEN, MutationCoordinator, check_len, check_non_negative,
    check_non_negative_int, check_positive, patched, required,
};
use crate::color::normalize_hex;
use crate::entities::{MaterialTypeInsert, MaterialTypePatch, now_utc};
use crate::error::DomainError;

#[derive(Debug, Clone)]
pub struct CreateMaterialType(pub MaterialTypeParameters);

#[derive(Debug, Clone)]
pub struct UpdateMaterialType {
    pub id: i64,
    pub params: MaterialTypeUpdateParameters,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteMaterialType {
    pub id: i64,
}

impl Processor<CreateMaterialType> for MutationCoordinator {
    type Output = MaterialTypeResponse;
    type Error = DomainError;

    async fn process(
        &self,
        CreateMaterialType(params): CreateMaterialType,
    ) -> Result<MaterialTypeResponse, DomainError> {
        check_len("name", params.name.as_deref(), MAX_NAME_LEN)?;
        check_len("material", params.material.as_deref(), MAX_NAME_LEN)?;
        check_len("article_number", params.article_number.as_deref(), MAX_NAME_LEN)?;
        check_len("comment", params.comment.as_deref(), MAX_COMMENT_LEN)?;
        check_non_negative("price", params.price)?;
        check_positive("density", Some(params.density))?;
        check_positive("diameter", Some(params.diameter))?;
        check_positive("weight", params.weight)?;
        check_positive("container_weight", params.container_weight)?;
        check_non_negative_int("cure_temp", params.cure_temp)?;
        check_non_negative_int("cure_time", params.cure_time)?;
        check_non_negative_int("wash_time", params.wash_time)?;
        let color_hex = match params.color_hex.as_deref() {
            Some(hex) => normalize_hex(hex)?,
            None => None,
        };
        if let Some(vendor_id) = params.vendor_id {
            self.require_vendor(vendor_id).await?;
        }

        let material_type = self
            .store()
            .insert_material_type(MaterialTypeInsert {
                registered: now_utc(),
                name: params.name,
                vendor_id: params.vendor_id,
                material: params.material,
                price: params.price,
                density: params.density,
                diameter: params.diameter,
                weight: params.weight,
                container_weight: params.container_weight,
                article_number: params.article_number,
                comment: params.comment,
                cure_temp: params.cure_temp,
                cure_time: params.cure_time,
                wash_time: params.wash_time,
                color_hex,
            })
            .await?;
        tracing::info!(material_type_id = material_type.id, "Material type created");

        let row = self.require_material_type(material_type.id).await?;
        let response = MaterialTypeResponse::from(&row);
        self.publish(EventKind::Added, EventPayload::MaterialType(response.clone()));
        Ok(response)
    }
}

impl Processor<UpdateMaterialType> for MutationCoordinator {
    type Output = MaterialTypeResponse;
    type Error = DomainError;

    async fn process(
        &self,
        UpdateMaterialType { id, params }: UpdateMaterialType,
    ) -> Result<MaterialTypeResponse, DomainError> {
        let color_hex = match params.color_hex {
            Some(Some(hex)) => Some(normalize_hex(&hex)?),
            Some(None) => Some(None),
            None => None,
        };
        let patch = MaterialTypePatch {
            name: params.name,
            vendor_id: params.vendor_id,
            material: params.material,
            price: params.price,
            density: required("density", params.density)?,
            diameter: required("diameter", params.diameter)?,
            weight: params.weight,
            container_weight: params.container_weight,
            article_number: params.article_number,
            comment: params.comment,
            cure_temp: params.cure_temp,
            cure_time: params.cure_time,
            wash_time: params.wash_time,
            color_hex,
        };
        check_len("name", patched(&patch.name).map(String::as_str), MAX_NAME_LEN)?;
        check_len("material", patched(&patch.material).map(String::as_str), MAX_NAME_LEN)?;
        check_len(
            "article_number",
            patched(&patch.article_number).map(String::as_str),
            MAX_NAME_LEN,
        )?;
        check_len("comment", patched(&patch.comment).map(String::as_str), MAX_COMMENT_LEN)?;
        check_non_negative("price", patched(&patch.price).copied())?;
        check_positive("density", patch.density)?;
        check_positive("diameter", patch.diameter)?;
        check_positive("weight", patched(&patch.weight).copied())?;
        check_positive("container_weight", patched(&patch.container_weight).copied())?;
        check_non_negative_int("cure_temp", patched(&patch.cure_temp).copied())?;
        check_non_negative_int("cure_time", patched(&patch.cure_time).copied())?;
        check_non_negative_int("wash_time", patched(&patch.wash_time).copied())?;
        if let Some(vendor_id) = patched(&patch.vendor_id) {
            self.require_vendor(*vendor_id).await?;
        }

        if !patch.is_empty()
            && self.store().update_material_type(id, patch).await?.is_none()
        {
            return Err(DomainError::NotFound {
                resource: Resource::MaterialType,
                id,
            });
        }
        tracing::info!(material_type_id = id, "Material type updated");

        let row = self.require_material_type(id).await?;
        let response = MaterialTypeResponse::from(&row);
        self.publish(EventKind::Updated, EventPayload::MaterialType(response.clone()));
        Ok(response)
    }
}

impl Processor<DeleteMaterialType> for MutationCoordinator {
    type Output = MaterialTypeResponse;
    type Error = DomainError;

    async fn process(
        &self,
        DeleteMaterialType { id }: DeleteMaterialType,
    ) -> Result<MaterialTypeResponse, DomainError> {
        let snapshot = MaterialTypeResponse::from(&self.require_material_type(id).await?);
        if !self.store().delete_material_type(id).await? {
            return Err(DomainError::NotFound {
                resource: Resource::MaterialType,
                id,
            });
        }
        tracing::info!(material_type_id = id, "Material type deleted");

        self.publish(EventKind::Deleted, EventPayload::MaterialType(snapshot.clone()));
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Topic;
    use crate::mutation::test_support::{
        container, coordinator, material_type, material_type_params, vendor, watch,
    };

    #[tokio::test]
    async fn test_create_normalizes_color_and_embeds_vendor() {
        let coordinator = coordinator();
        let acme = vendor(&coordinator, "Acme").await;
        let mut params = material_type_params(Some(acme.id), Some(1000.0));
        params.color_hex = Some("#ff8800".to_string());

        let created = coordinator.process(CreateMaterialType(params)).await.unwrap();
        assert_eq!(created.color_hex.as_deref(), Some("FF8800"));
        assert_eq!(created.vendor, Some(acme));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let coordinator = coordinator();

        let mut params = material_type_params(None, None);
        params.color_hex = Some("#12345".to_string());
        let err = coordinator.process(CreateMaterialType(params)).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut params = material_type_params(None, None);
        params.density = 0.0;
        let err = coordinator.process(CreateMaterialType(params)).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = coordinator
            .process(CreateMaterialType(material_type_params(Some(42), None)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::NotFound {
                resource: Resource::Vendor,
                id: 42
            }
        ));
    }

    #[tokio::test]
    async fn test_update_vendor_relation() {
        let coordinator = coordinator();
        let acme = vendor(&coordinator, "Acme").await;
        let resin = material_type(&coordinator, None, None).await;

        let err = coordinator
            .process(UpdateMaterialType {
                id: resin.id,
                params: MaterialTypeUpdateParameters {
                    vendor_id: Some(Some(acme.id + 100)),
                    ..Default::default()
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: Resource::Vendor, .. }));

        let mut events = watch(&coordinator, Topic::entity(Resource::MaterialType, resin.id));
        let updated = coordinator
            .process(UpdateMaterialType {
                id: resin.id,
                params: MaterialTypeUpdateParameters {
                    vendor_id: Some(Some(acme.id)),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(updated.vendor, Some(acme));
        assert_eq!(events.recv().await.unwrap().kind, EventKind::Updated);

        let cleared = coordinator
            .process(UpdateMaterialType {
                id: resin.id,
                params: MaterialTypeUpdateParameters {
                    vendor_id: Some(None),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(cleared.vendor, None);
    }

    #[tokio::test]
    async fn test_update_cannot_clear_density() {
        let coordinator = coordinator();
        let resin = material_type(&coordinator, None, None).await;
        let err = coordinator
            .process(UpdateMaterialType {
                id: resin.id,
                params: MaterialTypeUpdateParameters {
                    density: Some(None),
                    ..Default::default()
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_container() {
        let coordinator = coordinator();
        let resin = material_type(&coordinator, None, Some(1000.0)).await;
        let bottle = container(&coordinator, resin.id).await;

        let err = coordinator
            .process(DeleteMaterialType { id: resin.id })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::DeleteBlocked {
                resource: Resource::MaterialType,
                ..
            }
        ));

        coordinator
            .process(crate::mutation::DeleteContainer { id: bottle.id })
            .await
            .unwrap();
        let deleted = coordinator
            .process(DeleteMaterialType { id: resin.id })
            .await
            .unwrap();
        assert_eq!(deleted, resin);
        let err = coordinator
            .process(DeleteMaterialType { id: resin.id })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
