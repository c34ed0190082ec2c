use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::calculation::{compute_statement, BillingError, BillingStatement};
use super::super::domain::{
    BillingInputs, BillingPeriod, LateFeePolicy, Money, PropertyId, TenantId, UnitId,
};

/// Identifier wrapper for issued bills.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BillingId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Online,
    /// Post-dated check; the funds count once the check date is reached.
    PostDatedCheck {
        check_number: String,
        check_date: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: Money,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Payment {
    /// Date the payment starts reducing the balance.
    pub fn cleared_on(&self) -> NaiveDate {
        match &self.method {
            PaymentMethod::PostDatedCheck { check_date, .. } => (*check_date).max(self.paid_on),
            _ => self.paid_on,
        }
    }

    pub fn is_cleared(&self, as_of: NaiveDate) -> bool {
        self.cleared_on() <= as_of
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Overdue,
}

impl BillingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BillingStatus::Unpaid => "unpaid",
            BillingStatus::PartiallyPaid => "partially_paid",
            BillingStatus::Paid => "paid",
            BillingStatus::Overdue => "overdue",
        }
    }
}

/// Repository record for one unit's bill in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    pub billing_id: BillingId,
    pub unit_id: UnitId,
    pub property_id: PropertyId,
    pub tenant_id: Option<TenantId>,
    pub period: BillingPeriod,
    pub issued_on: NaiveDate,
    pub inputs: BillingInputs,
    pub late_fee_policy: Option<LateFeePolicy>,
    /// Statement as computed on the issue date.
    pub statement: BillingStatement,
    pub payments: Vec<Payment>,
    /// Bumped on every stored update; repositories reject writes based on a stale revision.
    #[serde(default)]
    pub revision: u64,
}

impl BillingRecord {
    pub fn cleared_total(&self, as_of: NaiveDate) -> Money {
        self.payments
            .iter()
            .filter(|payment| payment.is_cleared(as_of))
            .map(|payment| payment.amount)
            .sum()
    }

    pub fn pending_total(&self, as_of: NaiveDate) -> Money {
        self.payments
            .iter()
            .filter(|payment| !payment.is_cleared(as_of))
            .map(|payment| payment.amount)
            .sum()
    }

    pub fn paid_total(&self) -> Money {
        self.payments.iter().map(|payment| payment.amount).sum()
    }

    /// First date on which cleared payments covered the amount due on that date.
    pub fn settled_on(&self) -> Result<Option<NaiveDate>, BillingError> {
        let mut clearing_dates: Vec<NaiveDate> =
            self.payments.iter().map(Payment::cleared_on).collect();
        clearing_dates.sort_unstable();
        clearing_dates.dedup();

        for date in clearing_dates {
            let due = self.compute_on(date)?.total_due;
            if self.cleared_total(date) >= due {
                return Ok(Some(date));
            }
        }

        Ok(None)
    }

    /// Statement re-evaluated on `as_of`. Late fees stop accruing once the bill is settled.
    pub fn statement_as_of(&self, as_of: NaiveDate) -> Result<BillingStatement, BillingError> {
        let evaluation_date = match self.settled_on()? {
            Some(settled) if settled <= as_of => settled,
            _ => as_of,
        };

        let mut statement = self.compute_on(evaluation_date)?;
        statement.as_of = as_of;
        Ok(statement)
    }

    pub fn balance_as_of(&self, as_of: NaiveDate) -> Result<Money, BillingError> {
        let statement = self.statement_as_of(as_of)?;
        Ok((statement.total_due - self.cleared_total(as_of)).max(Money::ZERO))
    }

    pub fn status_as_of(&self, as_of: NaiveDate) -> Result<BillingStatus, BillingError> {
        let statement = self.statement_as_of(as_of)?;
        Ok(self.status_for(&statement, as_of))
    }

    pub fn view(&self, as_of: NaiveDate) -> Result<BillingStatementView, BillingError> {
        let statement = self.statement_as_of(as_of)?;
        let amount_paid = self.cleared_total(as_of);
        let balance = (statement.total_due - amount_paid).max(Money::ZERO);
        let status = self.status_for(&statement, as_of);

        Ok(BillingStatementView {
            billing_id: self.billing_id.clone(),
            unit_id: self.unit_id.clone(),
            period: self.period,
            issued_on: self.issued_on,
            status: status.label(),
            amount_paid,
            pending_payments: self.pending_total(as_of),
            balance,
            statement,
            payments: self.payments.clone(),
        })
    }

    fn compute_on(&self, date: NaiveDate) -> Result<BillingStatement, BillingError> {
        compute_statement(
            &self.inputs,
            self.period,
            self.late_fee_policy.as_ref(),
            date,
        )
    }

    fn status_for(&self, statement: &BillingStatement, as_of: NaiveDate) -> BillingStatus {
        let cleared = self.cleared_total(as_of);
        if cleared >= statement.total_due {
            BillingStatus::Paid
        } else if statement
            .late_fee
            .map(|assessment| assessment.days_late > 0)
            .unwrap_or(false)
        {
            BillingStatus::Overdue
        } else if cleared > Money::ZERO {
            BillingStatus::PartiallyPaid
        } else {
            BillingStatus::Unpaid
        }
    }
}

/// Bill as shown to tenants and landlords on a given date.
#[derive(Debug, Clone, Serialize)]
pub struct BillingStatementView {
    pub billing_id: BillingId,
    pub unit_id: UnitId,
    pub period: BillingPeriod,
    pub issued_on: NaiveDate,
    pub status: &'static str,
    pub amount_paid: Money,
    pub pending_payments: Money,
    pub balance: Money,
    pub statement: BillingStatement,
    pub payments: Vec<Payment>,
}
