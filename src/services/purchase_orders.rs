use crate::{
    errors::ServiceError,
    models::{
        OrderKind, OrderLine, PurchaseOrder, PurchaseOrderInput, PurchaseOrderStatus,
    },
    services::{
        materials::MaterialService,
        pricing::{LineEdit, LineField, OrderForm},
    },
    store::{Collection, DocumentStore},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One pricing-engine operation applied to a client-held draft.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DraftEdit {
    Update {
        index: usize,
        field: LineField,
        value: Value,
    },
    Add,
    Remove {
        index: usize,
    },
    SelectMaterial {
        index: usize,
        #[serde(rename = "materialId")]
        material_id: String,
    },
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    #[serde(default)]
    pub lines: Vec<OrderLine>,
    pub edit: DraftEdit,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub lines: Vec<OrderLine>,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    /// `false` when the edit was refused, e.g. removing the only line
    pub applied: bool,
}

/// Purchase orders in the received and given books
#[derive(Clone)]
pub struct PurchaseOrderService {
    store: Arc<dyn DocumentStore>,
    materials: MaterialService,
    default_currency: String,
}

impl PurchaseOrderService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        materials: MaterialService,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            materials,
            default_currency: default_currency.into(),
        }
    }

    fn book(&self, kind: OrderKind) -> Collection<PurchaseOrder> {
        Collection::new(self.store.clone(), kind.collection())
    }

    /// Creates an order. Line totals and the grand total are recomputed
    /// from the submitted lines.
    #[instrument(skip(self, input), fields(supplier = %input.supplier))]
    pub async fn create_order(
        &self,
        kind: OrderKind,
        input: PurchaseOrderInput,
    ) -> Result<PurchaseOrder, ServiceError> {
        validate_order(&input)?;
        let book = self.book(kind);
        let existing = book.list().await?;

        let po_date = input.po_date.unwrap_or_else(|| Utc::now().date_naive());
        let po_no = match non_blank(input.po_no.as_deref()) {
            Some(po_no) => {
                ensure_unique_po_no(&existing, &po_no, None)?;
                po_no
            }
            None => next_po_no(kind, &existing, po_date),
        };

        let now = Utc::now();
        let order = self.build_order(kind, Uuid::new_v4().to_string(), po_no, po_date, input, now)?;
        book.put(&order.id, &order).await?;

        info!(
            order_id = %order.id,
            po_no = %order.po_no,
            total = %order.total_amount,
            lines = order.products.len(),
            "purchase order created"
        );
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        kind: OrderKind,
        id: &str,
    ) -> Result<Option<PurchaseOrder>, ServiceError> {
        Ok(self.book(kind).get(id).await?)
    }

    /// Replaces an order. A blank `poNo` keeps the stored number.
    #[instrument(skip(self, input))]
    pub async fn update_order(
        &self,
        kind: OrderKind,
        id: &str,
        input: PurchaseOrderInput,
    ) -> Result<PurchaseOrder, ServiceError> {
        validate_order(&input)?;
        let book = self.book(kind);
        let existing = book
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {}", id)))?;

        let po_no = match non_blank(input.po_no.as_deref()) {
            Some(po_no) if po_no != existing.po_no => {
                ensure_unique_po_no(&book.list().await?, &po_no, Some(id))?;
                po_no
            }
            _ => existing.po_no,
        };
        let po_date = input.po_date.unwrap_or(existing.po_date);
        let order =
            self.build_order(kind, existing.id, po_no, po_date, input, existing.created_at)?;
        book.put(&order.id, &order).await?;

        info!(order_id = %order.id, total = %order.total_amount, "purchase order updated");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, kind: OrderKind, id: &str) -> Result<(), ServiceError> {
        if !self.book(kind).delete(id).await? {
            return Err(ServiceError::NotFound(format!("purchase order {}", id)));
        }
        info!(order_id = %id, "purchase order deleted");
        Ok(())
    }

    /// Orders of one book, newest `poDate` first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        kind: OrderKind,
        status: Option<PurchaseOrderStatus>,
    ) -> Result<Vec<PurchaseOrder>, ServiceError> {
        let mut orders: Vec<PurchaseOrder> = self
            .book(kind)
            .list()
            .await?
            .into_iter()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .collect();
        orders.sort_by(|a, b| {
            b.po_date
                .cmp(&a.po_date)
                .then_with(|| b.po_no.cmp(&a.po_no))
        });
        Ok(orders)
    }

    /// Applies one edit to a draft held by the client and returns the
    /// resulting lines and total. Nothing is persisted.
    #[instrument(skip(self, request))]
    pub async fn apply_draft(&self, request: DraftRequest) -> Result<DraftResponse, ServiceError> {
        let mut form = OrderForm::from_lines(request.lines)?;
        let applied = match request.edit {
            DraftEdit::Update {
                index,
                field,
                value,
            } => {
                form.update_line(index, LineEdit::from_json(field, &value))?;
                true
            }
            DraftEdit::Add => {
                form.add_line();
                true
            }
            DraftEdit::Remove { index } => form.remove_line(index)?,
            DraftEdit::SelectMaterial { index, material_id } => {
                let material = self.materials.require_material(&material_id).await?;
                form.select_material(index, &material)?;
                true
            }
        };
        debug!(applied, total = %form.total(), "draft edit applied");

        let (lines, total_amount) = form.into_parts();
        Ok(DraftResponse {
            lines,
            total_amount,
            applied,
        })
    }

    fn build_order(
        &self,
        kind: OrderKind,
        id: String,
        po_no: String,
        po_date: NaiveDate,
        input: PurchaseOrderInput,
        created_at: chrono::DateTime<Utc>,
    ) -> Result<PurchaseOrder, ServiceError> {
        let mut form = OrderForm::from_lines(input.products)?;
        form.assign_missing_ids();
        let (products, total_amount) = form.into_parts();

        Ok(PurchaseOrder {
            id,
            kind,
            supplier: input.supplier.trim().to_string(),
            po_no,
            po_date,
            delivery_date: input.delivery_date,
            payment_status: input.payment_status,
            status: input.status,
            remarks: input.remarks,
            products,
            total_amount,
            currency: non_blank(input.currency.as_deref())
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| self.default_currency.clone()),
            bank: input.bank,
            notes: input.notes,
            terms: input.terms,
            created_at,
            updated_at: Utc::now(),
        })
    }
}

/// One past the highest sequence already issued in the book, so numbers
/// freed by a delete are never handed out again.
fn next_po_no(kind: OrderKind, orders: &[PurchaseOrder], po_date: NaiveDate) -> String {
    let highest = orders
        .iter()
        .filter_map(|order| po_sequence(kind, &order.po_no))
        .max()
        .unwrap_or(0);
    format_po_no(kind, po_date, highest + 1)
}

/// The `NNNN` part of a generated number for this book.
fn po_sequence(kind: OrderKind, po_no: &str) -> Option<usize> {
    let rest = po_no.strip_prefix("PO-")?.strip_prefix(kind.code())?;
    let (_, sequence) = rest.strip_prefix('-')?.rsplit_once('-')?;
    sequence.parse().ok()
}

fn ensure_unique_po_no(
    orders: &[PurchaseOrder],
    po_no: &str,
    own_id: Option<&str>,
) -> Result<(), ServiceError> {
    let taken = orders
        .iter()
        .any(|order| order.po_no == po_no && Some(order.id.as_str()) != own_id);
    if taken {
        return Err(ServiceError::Conflict(format!(
            "purchase order number {} is already in use",
            po_no
        )));
    }
    Ok(())
}

/// `PO-<R|G>-YYYYMMDD-NNNN`
pub fn format_po_no(kind: OrderKind, po_date: NaiveDate, sequence: usize) -> String {
    format!(
        "PO-{}-{}-{:04}",
        kind.code(),
        po_date.format("%Y%m%d"),
        sequence
    )
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validate_order(input: &PurchaseOrderInput) -> Result<(), ServiceError> {
    input.validate()?;

    let mut problems = Vec::new();
    if input.supplier.trim().is_empty() {
        problems.push("supplier is required".to_string());
    }
    if input.products.is_empty() {
        problems.push("at least one line is required".to_string());
    }
    for (index, line) in input.products.iter().enumerate() {
        if !line.has_material() {
            problems.push(format!("line {}: material is required", index + 1));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MaterialInput;
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn service() -> PurchaseOrderService {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        PurchaseOrderService::new(store.clone(), MaterialService::new(store), "INR")
    }

    fn line(material: &str, price: Decimal, tax: Decimal, qty: Decimal) -> OrderLine {
        OrderLine {
            material_id: material.into(),
            unit_price: price,
            tax_rate_percent: tax,
            quantity: qty,
            ..Default::default()
        }
    }

    fn input(date: &str, lines: Vec<OrderLine>) -> PurchaseOrderInput {
        serde_json::from_value(json!({
            "supplier": "p-1",
            "poDate": date,
            "products": lines,
        }))
        .unwrap()
    }

    #[test]
    fn po_numbers_are_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(format_po_no(OrderKind::Given, date, 7), "PO-G-20240309-0007");
    }

    #[tokio::test]
    async fn create_recomputes_totals_and_numbers_the_order() {
        let svc = service();
        let mut sent = line("m-1", dec!(100), dec!(10), dec!(2));
        sent.line_total = dec!(1);
        let order = svc
            .create_order(
                OrderKind::Received,
                input("2024-03-01", vec![sent, line("m-2", dec!(50), dec!(0), dec!(3))]),
            )
            .await
            .unwrap();

        assert_eq!(order.total_amount, dec!(370));
        assert_eq!(order.products[0].line_total, dec!(220));
        assert_eq!(order.po_no, "PO-R-20240301-0001");
        assert_eq!(order.currency, "INR");
        assert!(order.products.iter().all(|l| !l.id.is_empty()));
    }

    #[tokio::test]
    async fn books_are_independent() {
        let svc = service();
        svc.create_order(OrderKind::Given, input("2024-03-01", vec![line("m", dec!(1), dec!(0), dec!(1))]))
            .await
            .unwrap();
        let received = svc
            .create_order(
                OrderKind::Received,
                input("2024-03-01", vec![line("m", dec!(1), dec!(0), dec!(1))]),
            )
            .await
            .unwrap();

        assert_eq!(received.po_no, "PO-R-20240301-0001");
        assert_eq!(svc.list_orders(OrderKind::Given, None).await.unwrap().len(), 1);
        assert!(svc
            .get_order(OrderKind::Given, &received.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn numbers_freed_by_a_delete_are_not_reissued() {
        let svc = service();
        let one = || input("2024-03-01", vec![line("m", dec!(1), dec!(0), dec!(1))]);
        let first = svc.create_order(OrderKind::Given, one()).await.unwrap();
        let second = svc.create_order(OrderKind::Given, one()).await.unwrap();
        assert_eq!(second.po_no, "PO-G-20240301-0002");

        svc.delete_order(OrderKind::Given, &first.id).await.unwrap();
        let third = svc.create_order(OrderKind::Given, one()).await.unwrap();
        assert_eq!(third.po_no, "PO-G-20240301-0003");
    }

    #[rstest::rstest]
    #[case(OrderKind::Given, "PO-G-20240301-0012", Some(12))]
    #[case(OrderKind::Received, "PO-G-20240301-0012", None)]
    #[case(OrderKind::Given, "GIVEN-17", None)]
    fn sequences_are_read_from_generated_numbers(
        #[case] kind: OrderKind,
        #[case] po_no: &str,
        #[case] expected: Option<usize>,
    ) {
        assert_eq!(po_sequence(kind, po_no), expected);
    }

    #[tokio::test]
    async fn supplied_numbers_must_be_unique() {
        let svc = service();
        let mut custom = input("2024-03-01", vec![line("m", dec!(1), dec!(0), dec!(1))]);
        custom.po_no = Some("GIVEN-17".into());
        let kept = svc.create_order(OrderKind::Given, custom.clone()).await.unwrap();

        let err = svc
            .create_order(OrderKind::Given, custom.clone())
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Conflict(msg) if msg.contains("GIVEN-17"));

        let other = svc
            .create_order(
                OrderKind::Given,
                input("2024-03-01", vec![line("m", dec!(1), dec!(0), dec!(1))]),
            )
            .await
            .unwrap();
        let err = svc
            .update_order(OrderKind::Given, &other.id, custom.clone())
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));

        // Resubmitting an order's own number is fine.
        svc.update_order(OrderKind::Given, &kept.id, custom)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn oversized_amounts_are_rejected_as_input_errors() {
        let svc = service();
        let err = svc
            .create_order(
                OrderKind::Received,
                input("2024-03-01", vec![line("m", Decimal::MAX, dec!(18), dec!(2))]),
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(msg) if msg.contains("too large"));
        assert!(svc
            .list_orders(OrderKind::Received, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn lines_without_material_are_rejected() {
        let svc = service();
        let err = svc
            .create_order(
                OrderKind::Given,
                input("2024-03-01", vec![line("", dec!(10), dec!(0), dec!(1))]),
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("line 1"));

        let err = svc
            .create_order(OrderKind::Given, input("2024-03-01", Vec::new()))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }

    #[tokio::test]
    async fn update_keeps_number_and_creation_time() {
        let svc = service();
        let created = svc
            .create_order(
                OrderKind::Given,
                input("2024-03-05", vec![line("m", dec!(10), dec!(0), dec!(1))]),
            )
            .await
            .unwrap();

        let mut change = input("2024-03-06", vec![line("m", dec!(10), dec!(0), dec!(4))]);
        change.status = PurchaseOrderStatus::Completed;
        let updated = svc
            .update_order(OrderKind::Given, &created.id, change)
            .await
            .unwrap();

        assert_eq!(updated.po_no, created.po_no);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.total_amount, dec!(40));
        assert_eq!(updated.status, PurchaseOrderStatus::Completed);
    }

    #[tokio::test]
    async fn list_filters_status_newest_first() {
        let svc = service();
        for date in ["2024-01-10", "2024-03-02", "2024-02-20"] {
            svc.create_order(
                OrderKind::Received,
                input(date, vec![line("m", dec!(1), dec!(0), dec!(1))]),
            )
            .await
            .unwrap();
        }
        let dates: Vec<String> = svc
            .list_orders(OrderKind::Received, Some(PurchaseOrderStatus::Draft))
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.po_date.to_string())
            .collect();
        assert_eq!(dates, vec!["2024-03-02", "2024-02-20", "2024-01-10"]);
        assert!(svc
            .list_orders(OrderKind::Received, Some(PurchaseOrderStatus::Paid))
            .await
            .is_ok_and(|orders| orders.is_empty()));
    }

    #[tokio::test]
    async fn draft_select_material_uses_catalog_price() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let materials = MaterialService::new(store.clone());
        let svc = PurchaseOrderService::new(store, materials.clone(), "INR");
        let material = materials
            .create_material(MaterialInput {
                name: "Button 18L".into(),
                code: "BT-18".into(),
                size: "18L".into(),
                color: "Black".into(),
                unit: "PCS".into(),
                price: dec!(2),
                gst_rate: dec!(18),
            })
            .await
            .unwrap();

        let selected = svc
            .apply_draft(DraftRequest {
                lines: vec![OrderLine::default()],
                edit: DraftEdit::SelectMaterial {
                    index: 0,
                    material_id: material.id.clone(),
                },
            })
            .await
            .unwrap();
        assert_eq!(selected.lines[0].unit_price, dec!(2));
        assert_eq!(selected.total_amount, Decimal::ZERO);

        let priced = svc
            .apply_draft(DraftRequest {
                lines: selected.lines,
                edit: DraftEdit::Update {
                    index: 0,
                    field: LineField::Quantity,
                    value: json!("100"),
                },
            })
            .await
            .unwrap();
        assert_eq!(priced.total_amount, dec!(236));
    }

    #[tokio::test]
    async fn draft_remove_of_only_line_is_not_applied() {
        let svc = service();
        let response = svc
            .apply_draft(DraftRequest {
                lines: vec![line("m", dec!(5), dec!(0), dec!(1))],
                edit: DraftEdit::Remove { index: 0 },
            })
            .await
            .unwrap();
        assert!(!response.applied);
        assert_eq!(response.lines.len(), 1);
        assert_eq!(response.total_amount, dec!(5));
    }

    #[tokio::test]
    async fn draft_edit_with_bad_index_is_invalid_input() {
        let svc = service();
        let err = svc
            .apply_draft(DraftRequest {
                lines: Vec::new(),
                edit: DraftEdit::Remove { index: 3 },
            })
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(_));
    }

    #[test]
    fn draft_edit_json_shape() {
        let edit: DraftEdit = serde_json::from_value(json!({
            "op": "selectMaterial",
            "index": 1,
            "materialId": "m-3"
        }))
        .unwrap();
        assert_matches!(edit, DraftEdit::SelectMaterial { index: 1, .. });
    }
}
