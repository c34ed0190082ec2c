//! The one place rent, dues, metered utilities, adjustments and late fees are added up.
//!
//! Late fees are always part of `total_due` and appear as their own line item, so tenants and
//! landlords see the same amount. `base_total` is kept alongside for views that show the
//! amount before penalties.

mod late_fee;
mod utility;

pub use late_fee::{assess_late_fee, days_late, due_date, LateFeeAssessment};
pub use utility::{utility_cost, utility_usage};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    AdjustmentKind, BillingInputs, BillingPeriod, LateFeePolicy, LateFeeType, Money, UtilityKind,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    #[error("billing due day must be between 1 and 31 (found {0})")]
    InvalidDueDay(u8),
    #[error("percentage late fee must be between 0 and 100 (found {0})")]
    InvalidLateFeePercentage(String),
    #[error("{field} must not be negative")]
    NegativeAmount { field: String },
    #[error("{} meter reading must be finite and non-negative", .utility.label())]
    InvalidReading { utility: UtilityKind },
    #[error("{} is submetered but no meter reading was provided", .0.label())]
    MissingMeterReading(UtilityKind),
    #[error("unit {unit} does not belong to property {property}")]
    PropertyMismatch { unit: String, property: String },
    #[error("'{0}' is not a valid billing period (expected YYYY-MM)")]
    InvalidPeriod(String),
    #[error("{field} is too large to bill")]
    AmountOutOfRange { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Rent,
    AssociationDues,
    Utility,
    Charge,
    Discount,
    LateFee,
}

/// One row of an itemized bill. Discounts carry negative amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub label: String,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Money>,
}

impl LineItem {
    fn simple(kind: LineItemKind, label: impl Into<String>, amount: Money) -> Self {
        Self {
            kind,
            label: label.into(),
            amount,
            usage: None,
            rate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingStatement {
    pub period: BillingPeriod,
    pub as_of: NaiveDate,
    pub line_items: Vec<LineItem>,
    pub base_total: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_fee: Option<LateFeeAssessment>,
    pub total_due: Money,
}

impl BillingStatement {
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.late_fee.map(|assessment| assessment.due_date)
    }

    pub fn late_fee_amount(&self) -> Money {
        self.late_fee
            .map(|assessment| assessment.fee)
            .unwrap_or(Money::ZERO)
    }
}

/// Compute the itemized statement for one unit and period, evaluated on `as_of`.
pub fn compute_statement(
    inputs: &BillingInputs,
    period: BillingPeriod,
    policy: Option<&LateFeePolicy>,
    as_of: NaiveDate,
) -> Result<BillingStatement, BillingError> {
    validate_inputs(inputs)?;
    if let Some(policy) = policy {
        validate_policy(policy)?;
    }

    let mut line_items = vec![LineItem::simple(LineItemKind::Rent, "Rent", inputs.rent)];

    if !inputs.association_dues.is_zero() {
        line_items.push(LineItem::simple(
            LineItemKind::AssociationDues,
            "Association dues",
            inputs.association_dues,
        ));
    }

    for charge in &inputs.utilities {
        line_items.push(LineItem {
            kind: LineItemKind::Utility,
            label: charge.utility.label().to_string(),
            amount: utility_cost(charge.reading, charge.rate)?,
            usage: Some(utility_usage(charge.reading)),
            rate: Some(charge.rate),
        });
    }

    for adjustment in &inputs.adjustments {
        let item = match adjustment.kind {
            AdjustmentKind::Charge => LineItem::simple(
                LineItemKind::Charge,
                label_or(&adjustment.label, "Additional charge"),
                adjustment.amount,
            ),
            AdjustmentKind::Discount => LineItem::simple(
                LineItemKind::Discount,
                label_or(&adjustment.label, "Discount"),
                -adjustment.amount,
            ),
        };
        line_items.push(item);
    }

    let base_total = line_items
        .iter()
        .try_fold(Money::ZERO, |total, item| total.checked_add(item.amount))
        .ok_or_else(|| out_of_range("base_total"))?
        .max(Money::ZERO);

    let late_fee = policy
        .map(|policy| assess_late_fee(policy, inputs.rent, period, as_of))
        .transpose()?;
    let mut total_due = base_total;
    if let Some(assessment) = late_fee.filter(|assessment| !assessment.fee.is_zero()) {
        line_items.push(LineItem::simple(
            LineItemKind::LateFee,
            format!("Late fee ({} days late)", assessment.days_late),
            assessment.fee,
        ));
        total_due = total_due
            .checked_add(assessment.fee)
            .ok_or_else(|| out_of_range("total_due"))?;
    }

    Ok(BillingStatement {
        period,
        as_of,
        line_items,
        base_total,
        late_fee,
        total_due,
    })
}

fn label_or(label: &str, fallback: &str) -> String {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn validate_inputs(inputs: &BillingInputs) -> Result<(), BillingError> {
    ensure_non_negative(inputs.rent, "rent")?;
    ensure_non_negative(inputs.association_dues, "association_dues")?;

    for charge in &inputs.utilities {
        if !utility::reading_is_valid(charge.reading) {
            return Err(BillingError::InvalidReading {
                utility: charge.utility,
            });
        }
        ensure_non_negative(charge.rate, &format!("{} rate", charge.utility.label()))?;
    }

    for adjustment in &inputs.adjustments {
        ensure_non_negative(adjustment.amount, &label_or(&adjustment.label, "adjustment"))?;
    }

    Ok(())
}

fn validate_policy(policy: &LateFeePolicy) -> Result<(), BillingError> {
    if !(1..=31).contains(&policy.billing_due_day) {
        return Err(BillingError::InvalidDueDay(policy.billing_due_day));
    }

    match policy.fee_type {
        LateFeeType::Percentage => {
            if !policy.amount.is_finite() || !(0.0..=100.0).contains(&policy.amount) {
                return Err(BillingError::InvalidLateFeePercentage(
                    policy.amount.to_string(),
                ));
            }
        }
        LateFeeType::Flat => {
            let amount = Money::from_major(policy.amount).ok_or_else(|| {
                BillingError::NegativeAmount {
                    field: "late_fee_amount".to_string(),
                }
            })?;
            ensure_non_negative(amount, "late_fee_amount")?;
        }
    }

    Ok(())
}

fn out_of_range(field: &str) -> BillingError {
    BillingError::AmountOutOfRange {
        field: field.to_string(),
    }
}

fn ensure_non_negative(amount: Money, field: &str) -> Result<(), BillingError> {
    if amount.is_negative() {
        return Err(BillingError::NegativeAmount {
            field: field.to_string(),
        });
    }
    Ok(())
}
