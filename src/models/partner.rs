use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

static GSTIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][0-9A-Z]Z[0-9A-Z]$").expect("valid GSTIN pattern")
});
static PAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("valid PAN pattern"));

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum PartnerType {
    Vendor,
    Customer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    pub fn is_blank(&self) -> bool {
        [
            &self.line1,
            &self.line2,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .all(|part| part.trim().is_empty())
    }
}

/// Vendor or customer record as persisted in the `partners` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: String,
    #[serde(rename = "type")]
    pub partner_type: PartnerType,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Address,
    #[serde(default)]
    pub pan_no: Option<String>,
    #[serde(default)]
    pub cin: Option<String>,
    #[serde(default)]
    pub gst_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a client submits to create or replace a partner.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnerInput {
    #[serde(rename = "type")]
    pub partner_type: PartnerType,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "Email is not a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[serde(default)]
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Address,
    /// Copies the shipping address over the billing address
    #[serde(default)]
    pub billing_same_as_shipping: bool,
    #[serde(default)]
    #[validate(custom = "validate_pan")]
    pub pan_no: Option<String>,
    #[serde(default)]
    pub cin: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_gstin")]
    pub gst_number: Option<String>,
}

impl PartnerInput {
    /// Trims text, upper-cases tax identifiers and turns empty optionals
    /// into `None` so "when present" rules only see real values.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.phone = self.phone.trim().to_string();
        self.email = non_empty(self.email);
        self.cin = non_empty(self.cin).map(|v| v.to_uppercase());
        self.pan_no = non_empty(self.pan_no).map(|v| v.to_uppercase());
        self.gst_number = non_empty(self.gst_number).map(|v| v.to_uppercase());
        if self.billing_same_as_shipping {
            self.billing_address = self.shipping_address.clone();
        }
        self
    }

    pub fn into_partner(self, id: String, created_at: DateTime<Utc>) -> Partner {
        Partner {
            id,
            partner_type: self.partner_type,
            name: self.name,
            email: self.email,
            phone: self.phone,
            shipping_address: self.shipping_address,
            billing_address: self.billing_address,
            pan_no: self.pan_no,
            cin: self.cin,
            gst_number: self.gst_number,
            created_at,
            updated_at: Utc::now(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_gstin(value: &str) -> Result<(), ValidationError> {
    if GSTIN_RE.is_match(&value.trim().to_ascii_uppercase()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("gstin");
        err.message = Some("GST number must be a 15 character GSTIN".into());
        Err(err)
    }
}

fn validate_pan(value: &str) -> Result<(), ValidationError> {
    if PAN_RE.is_match(&value.trim().to_ascii_uppercase()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("pan");
        err.message = Some("PAN must be 5 letters, 4 digits and a letter".into());
        Err(err)
    }
}
