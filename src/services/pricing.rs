//! Order line pricing.
//!
//! [`OrderForm`] is the only place line totals and the grand total are
//! computed. Every transition recomputes the grand total as a full sum over
//! the current lines, so no edit sequence can leave a stale aggregate.
//! Raw form input is sanitized into [`LineEdit`] before it reaches the
//! arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::{Material, OrderLine};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("line {index} does not exist (order has {len} lines)")]
    LineOutOfRange { index: usize, len: usize },
    #[error("amount is too large to price")]
    AmountOverflow,
}

impl From<PricingError> for ServiceError {
    fn from(err: PricingError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

/// Editable fields of an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum LineField {
    Quantity,
    UnitPrice,
    TaxRatePercent,
    MaterialId,
    Name,
    Size,
    Color,
    Unit,
}

/// A single-field change with its value already sanitized.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEdit {
    Quantity(Decimal),
    UnitPrice(Decimal),
    TaxRatePercent(Decimal),
    MaterialId(String),
    Name(String),
    Size(String),
    Color(String),
    Unit(String),
}

impl LineEdit {
    /// Builds an edit from raw text input.
    ///
    /// Empty or non-numeric input for a numeric field becomes zero, negative
    /// amounts become zero, and tax rates are clamped to 0..=100.
    pub fn parse(field: LineField, raw: &str) -> Self {
        match field {
            LineField::Quantity => LineEdit::Quantity(sanitize_amount(raw)),
            LineField::UnitPrice => LineEdit::UnitPrice(sanitize_amount(raw)),
            LineField::TaxRatePercent => LineEdit::TaxRatePercent(sanitize_tax_rate(raw)),
            LineField::MaterialId => LineEdit::MaterialId(raw.trim().to_string()),
            LineField::Name => LineEdit::Name(raw.to_string()),
            LineField::Size => LineEdit::Size(raw.to_string()),
            LineField::Color => LineEdit::Color(raw.to_string()),
            LineField::Unit => LineEdit::Unit(raw.to_string()),
        }
    }

    /// Same as [`LineEdit::parse`] for a JSON value; numbers and strings are
    /// accepted, anything else counts as empty input.
    pub fn from_json(field: LineField, value: &Value) -> Self {
        let raw = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        Self::parse(field, &raw)
    }

    fn touches_total(&self) -> bool {
        matches!(
            self,
            LineEdit::Quantity(_) | LineEdit::UnitPrice(_) | LineEdit::TaxRatePercent(_)
        )
    }
}

pub fn sanitize_amount(raw: &str) -> Decimal {
    let parsed = Decimal::from_str(raw.trim()).unwrap_or(Decimal::ZERO);
    parsed.max(Decimal::ZERO)
}

pub fn sanitize_tax_rate(raw: &str) -> Decimal {
    clamp_tax_rate(sanitize_amount(raw))
}

fn clamp_tax_rate(rate: Decimal) -> Decimal {
    rate.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED)
}

/// `(unit_price + unit_price * tax_rate_percent / 100) * quantity`
///
/// Fails with [`PricingError::AmountOverflow`] when any step leaves the
/// `Decimal` range.
pub fn line_total(
    unit_price: Decimal,
    tax_rate_percent: Decimal,
    quantity: Decimal,
) -> Result<Decimal, PricingError> {
    unit_price
        .checked_mul(tax_rate_percent)
        .and_then(|tax| tax.checked_div(Decimal::ONE_HUNDRED))
        .and_then(|tax| unit_price.checked_add(tax))
        .and_then(|gross| gross.checked_mul(quantity))
        .ok_or(PricingError::AmountOverflow)
}

fn recompute(line: &mut OrderLine) -> Result<(), PricingError> {
    line.line_total = line_total(line.unit_price, line.tax_rate_percent, line.quantity)?;
    Ok(())
}

fn checked_sum(totals: impl IntoIterator<Item = Decimal>) -> Result<Decimal, PricingError> {
    totals
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, total| acc.checked_add(total))
        .ok_or(PricingError::AmountOverflow)
}

/// Lines of one order plus their grand total.
///
/// Always holds at least one line.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderForm {
    lines: Vec<OrderLine>,
    total: Decimal,
}

impl Default for OrderForm {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderForm {
    /// A form with a single blank line.
    pub fn new() -> Self {
        Self {
            lines: vec![OrderLine::default()],
            total: Decimal::ZERO,
        }
    }

    /// Rebuilds a form from submitted lines. Numeric inputs are sanitized and
    /// every derived total is recomputed; submitted totals are discarded.
    pub fn from_lines(lines: Vec<OrderLine>) -> Result<Self, PricingError> {
        let mut lines = lines
            .into_iter()
            .map(|mut line| {
                line.quantity = line.quantity.max(Decimal::ZERO);
                line.unit_price = line.unit_price.max(Decimal::ZERO);
                line.tax_rate_percent = clamp_tax_rate(line.tax_rate_percent);
                recompute(&mut line)?;
                Ok(line)
            })
            .collect::<Result<Vec<OrderLine>, PricingError>>()?;
        if lines.is_empty() {
            lines.push(OrderLine::default());
        }
        let total = checked_sum(lines.iter().map(|line| line.line_total))?;
        Ok(Self { lines, total })
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn into_parts(self) -> (Vec<OrderLine>, Decimal) {
        (self.lines, self.total)
    }

    /// Gives every line without an id a fresh one.
    pub fn assign_missing_ids(&mut self) {
        for line in self.lines.iter_mut().filter(|line| line.id.is_empty()) {
            line.id = uuid::Uuid::new_v4().to_string();
        }
    }

    /// Replaces one field of one line. Only that line's total is recomputed;
    /// the grand total is re-summed over all lines. On error the form is
    /// left unchanged.
    pub fn update_line(&mut self, index: usize, edit: LineEdit) -> Result<(), PricingError> {
        let mut line = self.line(index)?.clone();
        let touches_total = edit.touches_total();
        match edit {
            LineEdit::Quantity(v) => line.quantity = v,
            LineEdit::UnitPrice(v) => line.unit_price = v,
            LineEdit::TaxRatePercent(v) => line.tax_rate_percent = v,
            LineEdit::MaterialId(v) => line.material_id = v,
            LineEdit::Name(v) => line.name = v,
            LineEdit::Size(v) => line.size = v,
            LineEdit::Color(v) => line.color = v,
            LineEdit::Unit(v) => line.unit = v,
        }
        if touches_total {
            recompute(&mut line)?;
        }
        self.replace_line(index, line)
    }

    /// Appends a line with zero amounts and blank identifiers.
    pub fn add_line(&mut self) {
        self.lines.push(OrderLine::default());
    }

    /// Removes a line unless it is the last one.
    ///
    /// Returns `Ok(false)` when the removal was refused.
    pub fn remove_line(&mut self, index: usize) -> Result<bool, PricingError> {
        self.check_index(index)?;
        if self.lines.len() == 1 {
            return Ok(false);
        }
        let total = checked_sum(
            self.lines
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, line)| line.line_total),
        )?;
        self.lines.remove(index);
        self.total = total;
        Ok(true)
    }

    /// Copies a catalog entry into a line. Quantity resets to zero, so the
    /// line contributes nothing until a quantity is entered.
    pub fn select_material(&mut self, index: usize, material: &Material) -> Result<(), PricingError> {
        let mut line = self.line(index)?.clone();
        line.material_id = material.id.clone();
        line.name = material.name.clone();
        line.size = material.size.clone();
        line.color = material.color.clone();
        line.unit = material.unit.clone();
        line.unit_price = material.price.max(Decimal::ZERO);
        line.tax_rate_percent = clamp_tax_rate(material.gst_rate);
        line.quantity = Decimal::ZERO;
        recompute(&mut line)?;
        self.replace_line(index, line)
    }

    fn check_index(&self, index: usize) -> Result<(), PricingError> {
        if index < self.lines.len() {
            Ok(())
        } else {
            Err(PricingError::LineOutOfRange {
                index,
                len: self.lines.len(),
            })
        }
    }

    fn line(&self, index: usize) -> Result<&OrderLine, PricingError> {
        self.lines.get(index).ok_or(PricingError::LineOutOfRange {
            index,
            len: self.lines.len(),
        })
    }

    /// Swaps in a recomputed line and re-sums, committing only when the new
    /// grand total fits.
    fn replace_line(&mut self, index: usize, line: OrderLine) -> Result<(), PricingError> {
        let total = checked_sum(self.lines.iter().enumerate().map(|(i, current)| {
            if i == index {
                line.line_total
            } else {
                current.line_total
            }
        }))?;
        self.lines[index] = line;
        self.total = total;
        Ok(())
    }
}
