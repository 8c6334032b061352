use kanau::processor::Processor;
use resinkeep_sdk::objects::{EventKind, EventPayload, Resource, VendorParameters, VendorResponse, VendorUpdateParameters};

use super::{MAX_COMMENT_LEN, MAX_NAME_LEN, MutationCoordinator, check_len, check_non_negative, patched, required};
use crate::entities::{VendorInsert, VendorPatch, now_utc};
use crate::error::DomainError;

#[derive(Debug, Clone)]
pub struct CreateVendor(pub VendorParameters);

#[derive(Debug, Clone)]
pub struct UpdateVendor {
    pub id: i64,
    pub params: VendorUpdateParameters,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteVendor {
    pub id: i64,
}

impl Processor<CreateVendor> for MutationCoordinator {
    type Output = VendorResponse;
    type Error = DomainError;

    async fn process(&self, CreateVendor(params): CreateVendor) -> Result<VendorResponse, DomainError> {
        check_len("name", Some(params.name.as_str()), MAX_NAME_LEN)?;
        check_len("comment", params.comment.as_deref(), MAX_COMMENT_LEN)?;
        check_non_negative("empty_container_weight", params.empty_container_weight)?;

        let vendor = self
            .store()
            .insert_vendor(VendorInsert {
                registered: now_utc(),
                name: params.name,
                comment: params.comment,
                empty_container_weight: params.empty_container_weight,
            })
            .await?;
        tracing::info!(vendor_id = vendor.id, "Vendor created");

        let response = VendorResponse::from(&vendor);
        self.publish(EventKind::Added, EventPayload::Vendor(response.clone()));
        Ok(response)
    }
}

impl Processor<UpdateVendor> for MutationCoordinator {
    type Output = VendorResponse;
    type Error = DomainError;

    async fn process(&self, UpdateVendor { id, params }: UpdateVendor) -> Result<VendorResponse, DomainError> {
        let patch = VendorPatch {
            name: required("name", params.name)?,
            comment: params.comment,
            empty_container_weight: params.empty_container_weight,
        };
        check_len("name", patch.name.as_deref(), MAX_NAME_LEN)?;
        check_len("comment", patched(&patch.comment).map(String::as_str), MAX_COMMENT_LEN)?;
        check_non_negative(
            "empty_container_weight",
            patched(&patch.empty_container_weight).copied(),
        )?;

        let vendor = if patch.is_empty() {
            self.require_vendor(id).await?
        } else {
            self.store()
                .update_vendor(id, patch)
                .await?
                .ok_or(DomainError::NotFound {
                    resource: Resource::Vendor,
                    id,
                })?
        };
        tracing::info!(vendor_id = id, "Vendor updated");

        let response = VendorResponse::from(&vendor);
        self.publish(EventKind::Updated, EventPayload::Vendor(response.clone()));
        Ok(response)
    }
}

impl Processor<DeleteVendor> for MutationCoordinator {
    type Output = VendorResponse;
    type Error = DomainError;

    /// Returns the snapshot taken just before the delete.
    async fn process(&self, DeleteVendor { id }: DeleteVendor) -> Result<VendorResponse, DomainError> {
        let snapshot = VendorResponse::from(&self.require_vendor(id).await?);
        if !self.store().delete_vendor(id).await? {
            return Err(DomainError::NotFound {
                resource: Resource::Vendor,
                id,
            });
        }
        tracing::info!(vendor_id = id, "Vendor deleted");

        self.publish(EventKind::Deleted, EventPayload::Vendor(snapshot.clone()));
        Ok(snapshot)
    }
}
