use crate::{
    errors::ServiceError,
    models::{Material, MaterialInput},
    store::{collections, Collection, DocumentStore},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Raw material catalog
#[derive(Clone)]
pub struct MaterialService {
    materials: Collection<Material>,
}

impl MaterialService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            materials: Collection::new(store, collections::MATERIALS),
        }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_material(&self, input: MaterialInput) -> Result<Material, ServiceError> {
        let input = input.normalized();
        input.validate()?;

        let material = input.into_material(Uuid::new_v4().to_string(), Utc::now());
        self.materials.put(&material.id, &material).await?;
        info!(material_id = %material.id, "material created");
        Ok(material)
    }

    #[instrument(skip(self))]
    pub async fn get_material(&self, id: &str) -> Result<Option<Material>, ServiceError> {
        Ok(self.materials.get(id).await?)
    }

    /// Like [`get_material`](Self::get_material) but a missing entry is an error
    pub async fn require_material(&self, id: &str) -> Result<Material, ServiceError> {
        self.get_material(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("material {}", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn update_material(
        &self,
        id: &str,
        input: MaterialInput,
    ) -> Result<Material, ServiceError> {
        let input = input.normalized();
        input.validate()?;

        let existing = self.require_material(id).await?;
        let material = input.into_material(existing.id, existing.created_at);
        self.materials.put(&material.id, &material).await?;
        info!(material_id = %material.id, "material updated");
        Ok(material)
    }

    #[instrument(skip(self))]
    pub async fn delete_material(&self, id: &str) -> Result<(), ServiceError> {
        if !self.materials.delete(id).await? {
            return Err(ServiceError::NotFound(format!("material {}", id)));
        }
        info!(material_id = %id, "material deleted");
        Ok(())
    }

    /// Lists the catalog ordered by name. `search` matches a case-insensitive
    /// substring of the name or code.
    #[instrument(skip(self))]
    pub async fn list_materials(&self, search: Option<&str>) -> Result<Vec<Material>, ServiceError> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut materials: Vec<Material> = self
            .materials
            .list()
            .await?
            .into_iter()
            .filter(|m| match &needle {
                Some(needle) => {
                    m.name.to_lowercase().contains(needle.as_str())
                        || m.code.to_lowercase().contains(needle.as_str())
                }
                None => true,
            })
            .collect();
        materials.sort_by_key(|m| m.name.to_lowercase());
        Ok(materials)
    }
}
