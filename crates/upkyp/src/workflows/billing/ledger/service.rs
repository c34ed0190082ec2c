use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::super::calculation::{compute_statement, BillingError};
use super::super::domain::{
    Adjustment, BillingPeriod, Money, Property, TenantId, Unit, UnitId, UnitReadings,
};
use super::record::{BillingId, BillingRecord, BillingStatementView, Payment};
use super::repository::{
    BillingNotification, BillingRepository, NotificationPublisher, RepositoryError,
};

/// Landlord request to bill one unit for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueBillingRequest {
    pub property: Property,
    pub unit: Unit,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    pub period: BillingPeriod,
    #[serde(default)]
    pub readings: UnitReadings,
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
    #[serde(default)]
    pub issued_on: Option<NaiveDate>,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment amount must be greater than zero")]
    NonPositiveAmount,
    #[error("payment of {attempted} exceeds outstanding balance of {outstanding}")]
    ExceedsBalance { outstanding: Money, attempted: Money },
}

#[derive(Debug, thiserror::Error)]
pub enum BillingServiceError {
    #[error(transparent)]
    Billing(#[from] BillingError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Issues bills, records payments and answers balance questions over a repository.
pub struct BillingLedgerService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
}

static BILLING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_billing_id() -> BillingId {
    let id = BILLING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BillingId(format!("bill-{id:06}"))
}

impl<R, N> BillingLedgerService<R, N>
where
    R: BillingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    /// Compute and persist the bill for a unit, one bill per unit and period.
    pub fn issue(
        &self,
        request: IssueBillingRequest,
        today: NaiveDate,
    ) -> Result<BillingRecord, BillingServiceError> {
        let IssueBillingRequest {
            property,
            unit,
            tenant_id,
            period,
            readings,
            adjustments,
            issued_on,
        } = request;

        let issued_on = issued_on.unwrap_or(today);
        let inputs = property.billing_inputs(&unit, &readings, adjustments)?;
        let late_fee_policy = property.late_fee;
        let statement = compute_statement(&inputs, period, late_fee_policy.as_ref(), issued_on)?;

        if self
            .repository
            .find_for_period(&unit.unit_id, period)?
            .is_some()
        {
            warn!(unit = %unit.unit_id.0, %period, "unit already billed for period");
            return Err(RepositoryError::Conflict.into());
        }

        let unit_id = unit.unit_id;
        let record = BillingRecord {
            billing_id: next_billing_id(),
            unit_id: unit_id.clone(),
            property_id: property.property_id,
            tenant_id,
            period,
            issued_on,
            inputs,
            late_fee_policy,
            statement,
            payments: Vec::new(),
            revision: 0,
        };

        let stored = self.repository.insert(record).map_err(|err| {
            if matches!(err, RepositoryError::Conflict) {
                warn!(unit = %unit_id.0, %period, "unit billed concurrently for period");
            }
            err
        })?;
        info!(
            billing_id = %stored.billing_id.0,
            unit = %stored.unit_id.0,
            %period,
            total_due = %stored.statement.total_due,
            "billing issued"
        );

        let mut details = BTreeMap::new();
        details.insert("period".to_string(), period.to_string());
        details.insert(
            "total_due".to_string(),
            stored.statement.total_due.to_string(),
        );
        if let Some(due_date) = stored.statement.due_date() {
            details.insert("due_date".to_string(), due_date.to_string());
        }
        self.notify(&stored, "billing_issued", details);

        Ok(stored)
    }

    /// Apply a payment. Amounts above what is still owed on the payment date are rejected.
    ///
    /// The write is conditional on the revision that was read, so a payment racing another
    /// write to the same bill fails with `Conflict` instead of being lost.
    pub fn record_payment(
        &self,
        billing_id: &BillingId,
        payment: Payment,
    ) -> Result<BillingRecord, BillingServiceError> {
        if payment.amount <= Money::ZERO {
            return Err(PaymentError::NonPositiveAmount.into());
        }

        let mut record = self.get(billing_id)?;
        let due_on_payment = record.statement_as_of(payment.paid_on)?.total_due;
        let outstanding = (due_on_payment - record.paid_total()).max(Money::ZERO);
        if payment.amount > outstanding {
            warn!(
                billing_id = %billing_id.0,
                attempted = %payment.amount,
                %outstanding,
                "payment rejected"
            );
            return Err(PaymentError::ExceedsBalance {
                outstanding,
                attempted: payment.amount,
            }
            .into());
        }

        let cleared_on = payment.cleared_on();
        let amount = payment.amount;
        let expected_revision = record.revision;
        record.payments.push(payment);
        record.revision = expected_revision + 1;
        self.repository
            .update(record.clone(), expected_revision)
            .map_err(|err| {
                if matches!(err, RepositoryError::Conflict) {
                    warn!(billing_id = %billing_id.0, %amount, "payment lost a concurrent update");
                }
                err
            })?;

        let balance = record.balance_as_of(cleared_on)?;
        info!(
            billing_id = %billing_id.0,
            %amount,
            %balance,
            %cleared_on,
            "payment recorded"
        );

        let mut details = BTreeMap::new();
        details.insert("amount".to_string(), amount.to_string());
        details.insert("cleared_on".to_string(), cleared_on.to_string());
        details.insert("balance".to_string(), balance.to_string());
        self.notify(&record, "payment_received", details);

        if balance.is_zero() {
            let mut details = BTreeMap::new();
            details.insert("period".to_string(), record.period.to_string());
            self.notify(&record, "billing_settled", details);
        }

        Ok(record)
    }

    pub fn statement_as_of(
        &self,
        billing_id: &BillingId,
        as_of: NaiveDate,
    ) -> Result<BillingStatementView, BillingServiceError> {
        let record = self.get(billing_id)?;
        Ok(record.view(as_of)?)
    }

    /// Billing history for a unit, newest period first.
    pub fn history(&self, unit_id: &UnitId) -> Result<Vec<BillingRecord>, BillingServiceError> {
        let mut records = self.repository.for_unit(unit_id)?;
        records.sort_by(|left, right| right.period.cmp(&left.period));
        Ok(records)
    }

    pub fn get(&self, billing_id: &BillingId) -> Result<BillingRecord, BillingServiceError> {
        let record = self
            .repository
            .fetch(billing_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// The bill is already stored at this point, so delivery failures are logged, not returned.
    fn notify(&self, record: &BillingRecord, template: &str, details: BTreeMap<String, String>) {
        let notification = BillingNotification {
            template: template.to_string(),
            billing_id: record.billing_id.clone(),
            recipient: record.tenant_id.clone(),
            details,
        };
        if let Err(err) = self.notifications.publish(notification) {
            warn!(
                billing_id = %record.billing_id.0,
                template,
                error = %err,
                "tenant notification failed"
            );
        }
    }
}
