use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Raw material catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub color: String,
    /// Unit of measure, e.g. `MTR`, `KG`, `PCS`
    pub unit: String,
    #[schema(value_type = String, example = "120.50")]
    pub price: Decimal,
    #[schema(value_type = String, example = "5")]
    pub gst_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub color: String,
    #[validate(length(min = 1, message = "Unit is required"))]
    pub unit: String,
    #[validate(custom = "validate_price")]
    #[schema(value_type = String)]
    pub price: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_gst_rate")]
    #[schema(value_type = String)]
    pub gst_rate: Decimal,
}

impl MaterialInput {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.code = self.code.trim().to_string();
        self.unit = self.unit.trim().to_uppercase();
        self
    }

    pub fn into_material(self, id: String, created_at: DateTime<Utc>) -> Material {
        Material {
            id,
            name: self.name,
            code: self.code,
            size: self.size,
            color: self.color,
            unit: self.unit,
            price: self.price,
            gst_rate: self.gst_rate,
            created_at,
            updated_at: Utc::now(),
        }
    }
}

fn validate_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

fn validate_gst_rate(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("range");
        err.message = Some("GST rate must be between 0 and 100".into());
        return Err(err);
    }
    Ok(())
}
