use crate::{
    errors::ServiceError,
    models::{Partner, PartnerInput, PartnerType},
    store::{collections, Collection, DocumentStore},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Vendor and customer directory
#[derive(Clone)]
pub struct PartnerService {
    partners: Collection<Partner>,
}

impl PartnerService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            partners: Collection::new(store, collections::PARTNERS),
        }
    }

    /// Creates a partner after validating the submitted fields
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_partner(&self, input: PartnerInput) -> Result<Partner, ServiceError> {
        let input = input.normalized();
        input.validate()?;

        let partner = input.into_partner(Uuid::new_v4().to_string(), Utc::now());
        self.partners.put(&partner.id, &partner).await?;
        info!(partner_id = %partner.id, partner_type = %partner.partner_type, "partner created");
        Ok(partner)
    }

    #[instrument(skip(self))]
    pub async fn get_partner(&self, id: &str) -> Result<Option<Partner>, ServiceError> {
        Ok(self.partners.get(id).await?)
    }

    /// Replaces a partner's fields, keeping its id and creation time
    #[instrument(skip(self, input))]
    pub async fn update_partner(
        &self,
        id: &str,
        input: PartnerInput,
    ) -> Result<Partner, ServiceError> {
        let input = input.normalized();
        input.validate()?;

        let existing = self
            .partners
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("partner {}", id)))?;

        let partner = input.into_partner(existing.id, existing.created_at);
        self.partners.put(&partner.id, &partner).await?;
        info!(partner_id = %partner.id, "partner updated");
        Ok(partner)
    }

    #[instrument(skip(self))]
    pub async fn delete_partner(&self, id: &str) -> Result<(), ServiceError> {
        if !self.partners.delete(id).await? {
            return Err(ServiceError::NotFound(format!("partner {}", id)));
        }
        info!(partner_id = %id, "partner deleted");
        Ok(())
    }

    /// Lists partners ordered by name, optionally only one type
    #[instrument(skip(self))]
    pub async fn list_partners(
        &self,
        partner_type: Option<PartnerType>,
    ) -> Result<Vec<Partner>, ServiceError> {
        let mut partners: Vec<Partner> = self
            .partners
            .list()
            .await?
            .into_iter()
            .filter(|p| partner_type.map_or(true, |t| p.partner_type == t))
            .collect();
        partners.sort_by_key(|p| p.name.to_lowercase());
        Ok(partners)
    }
}
