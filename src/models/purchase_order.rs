use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;
use validator::Validate;

use crate::store::collections;

/// Which book an order belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderKind {
    /// Orders received from customers
    Received,
    /// Orders given to vendors
    Given,
}

impl OrderKind {
    pub fn collection(self) -> &'static str {
        match self {
            OrderKind::Received => collections::ORDERS_RECEIVED,
            OrderKind::Given => collections::ORDERS_GIVEN,
        }
    }

    /// Letter used in generated order numbers.
    pub fn code(self) -> char {
        match self {
            OrderKind::Received => 'R',
            OrderKind::Given => 'G',
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum PurchaseOrderStatus {
    #[default]
    Draft,
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    PartiallyPaid,
    Paid,
}

/// One item within a purchase order.
///
/// `line_total` is derived; it is only ever written by
/// [`crate::services::pricing::OrderForm`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderLine {
    pub id: String,
    /// Catalog material this line was populated from
    pub material_id: String,
    pub name: String,
    pub size: String,
    pub color: String,
    pub unit: String,
    #[schema(value_type = String)]
    pub quantity: Decimal,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub tax_rate_percent: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

impl OrderLine {
    pub fn has_material(&self) -> bool {
        !self.material_id.trim().is_empty()
    }
}

/// Order header with its lines, as persisted in either book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: String,
    pub kind: OrderKind,
    /// Partner the order is placed with or received from
    pub supplier: String,
    pub po_no: String,
    pub po_date: NaiveDate,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub status: PurchaseOrderStatus,
    #[serde(default)]
    pub remarks: String,
    pub products: Vec<OrderLine>,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub bank: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub terms: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Header and lines submitted by a client. Totals are never read from it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderInput {
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub po_no: Option<String>,
    #[serde(default)]
    pub po_date: Option<NaiveDate>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub status: PurchaseOrderStatus,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub remarks: String,
    #[serde(default)]
    pub products: Vec<OrderLine>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub bank: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: String,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub terms: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_parses_from_path_segment() {
        assert_eq!(OrderKind::from_str("received").unwrap(), OrderKind::Received);
        assert_eq!(OrderKind::from_str("Given").unwrap(), OrderKind::Given);
        assert!(OrderKind::from_str("sold").is_err());
        assert_eq!(OrderKind::Given.to_string(), "given");
    }

    #[test]
    fn status_round_trips_through_json() {
        let json = serde_json::to_string(&PurchaseOrderStatus::InProgress).unwrap();
        assert_eq!(json, "\"InProgress\"");
        assert_eq!(
            PurchaseOrderStatus::from_str("inprogress").unwrap(),
            PurchaseOrderStatus::InProgress
        );
    }

    #[test]
    fn input_defaults_missing_fields() {
        let input: PurchaseOrderInput =
            serde_json::from_str(r#"{ "supplier": "p-1", "products": [{ "materialId": "m-1" }] }"#)
                .unwrap();
        assert_eq!(input.status, PurchaseOrderStatus::Draft);
        assert_eq!(input.payment_status, PaymentStatus::Unpaid);
        assert!(input.products[0].has_material());
        assert!(input.po_no.is_none());
    }
}
