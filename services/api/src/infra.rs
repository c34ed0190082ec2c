use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;
use upkyp::config::BillingConfig;
use upkyp::workflows::billing::domain::{Adjustment, BillingPeriod, Money, UnitId};
use upkyp::workflows::billing::ledger::{
    BillingId, BillingNotification, BillingRecord, BillingRepository, NotificationError,
    NotificationPublisher, RepositoryError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) billing: Arc<BillingConfig>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryBillingRepository {
    records: Arc<Mutex<HashMap<BillingId, BillingRecord>>>,
}

impl InMemoryBillingRepository {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<BillingId, BillingRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BillingRepository for InMemoryBillingRepository {
    fn insert(&self, record: BillingRecord) -> Result<BillingRecord, RepositoryError> {
        let mut guard = self.lock();
        let already_billed = guard.values().any(|existing| {
            existing.unit_id == record.unit_id && existing.period == record.period
        });
        if already_billed || guard.contains_key(&record.billing_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.billing_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: BillingRecord, expected_revision: u64) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        match guard.get(&record.billing_id) {
            None => Err(RepositoryError::NotFound),
            Some(stored) if stored.revision != expected_revision => Err(RepositoryError::Conflict),
            Some(_) => {
                guard.insert(record.billing_id.clone(), record);
                Ok(())
            }
        }
    }

    fn fetch(&self, id: &BillingId) -> Result<Option<BillingRecord>, RepositoryError> {
        Ok(self.lock().get(id).cloned())
    }

    fn for_unit(&self, unit_id: &UnitId) -> Result<Vec<BillingRecord>, RepositoryError> {
        Ok(self
            .lock()
            .values()
            .filter(|record| &record.unit_id == unit_id)
            .cloned()
            .collect())
    }

    fn find_for_period(
        &self,
        unit_id: &UnitId,
        period: BillingPeriod,
    ) -> Result<Option<BillingRecord>, RepositoryError> {
        Ok(self
            .lock()
            .values()
            .find(|record| &record.unit_id == unit_id && record.period == period)
            .cloned())
    }
}

/// Writes tenant notifications to the service log until a push/e-mail adapter is wired in.
#[derive(Default, Clone)]
pub(crate) struct LogNotificationPublisher;

impl NotificationPublisher for LogNotificationPublisher {
    fn publish(&self, notification: BillingNotification) -> Result<(), NotificationError> {
        let recipient = notification
            .recipient
            .as_ref()
            .map(|tenant| tenant.0.as_str())
            .unwrap_or("unassigned");
        info!(
            template = %notification.template,
            billing_id = %notification.billing_id.0,
            recipient,
            details = ?notification.details,
            "tenant notification"
        );
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_period(raw: &str) -> Result<BillingPeriod, String> {
    raw.parse::<BillingPeriod>().map_err(|err| err.to_string())
}

pub(crate) fn parse_amount(raw: &str) -> Result<Money, String> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .and_then(Money::from_major)
        .filter(|amount| !amount.is_negative())
        .ok_or_else(|| format!("'{raw}' is not a valid non-negative amount"))
}

/// `previous:current`, for example `1180:1302`.
pub(crate) fn parse_reading_pair(raw: &str) -> Result<(f64, f64), String> {
    let (previous, current) = raw
        .split_once(':')
        .ok_or_else(|| format!("'{raw}' must look like PREVIOUS:CURRENT"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|err| format!("'{value}' is not a meter reading ({err})"))
    };
    Ok((parse(previous)?, parse(current)?))
}

/// `Label=Amount`, for example `Parking=300`.
pub(crate) fn parse_charge(raw: &str) -> Result<Adjustment, String> {
    let (label, amount) = split_labelled(raw)?;
    Ok(Adjustment::charge(label, amount))
}

pub(crate) fn parse_discount(raw: &str) -> Result<Adjustment, String> {
    let (label, amount) = split_labelled(raw)?;
    Ok(Adjustment::discount(label, amount))
}

fn split_labelled(raw: &str) -> Result<(String, Money), String> {
    let (label, amount) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("'{raw}' must look like LABEL=AMOUNT"))?;
    Ok((label.trim().to_string(), parse_amount(amount)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use upkyp::workflows::billing::domain::AdjustmentKind;

    #[test]
    fn parses_labelled_adjustments() {
        let charge = parse_charge("Parking slot=1,500").expect("charge parses");
        assert_eq!(charge.kind, AdjustmentKind::Charge);
        assert_eq!(charge.label, "Parking slot");
        assert_eq!(charge.amount, Money::from_whole(1500));

        let discount = parse_discount("Promo=200.50").expect("discount parses");
        assert_eq!(discount.kind, AdjustmentKind::Discount);
        assert_eq!(discount.amount, Money::from_minor(20_050));

        assert!(parse_charge("Parking").is_err());
        assert!(parse_discount("Promo=-5").is_err());
    }

    #[test]
    fn parses_reading_pairs() {
        assert_eq!(parse_reading_pair("1180:1302.5"), Ok((1180.0, 1302.5)));
        assert!(parse_reading_pair("1180").is_err());
    }

    #[test]
    fn update_requires_existing_record_at_expected_revision() {
        let repository = InMemoryBillingRepository::default();
        let record = sample_record();
        assert!(matches!(
            repository.update(record.clone(), 0),
            Err(RepositoryError::NotFound)
        ));
        repository.insert(record.clone()).expect("insert succeeds");

        let mut first = record.clone();
        first.revision = 1;
        repository.update(first, 0).expect("fresh revision applies");

        let mut stale = record;
        stale.revision = 1;
        assert!(matches!(
            repository.update(stale, 0),
            Err(RepositoryError::Conflict)
        ));
    }

    #[test]
    fn insert_rejects_second_bill_for_unit_and_period() {
        let repository = InMemoryBillingRepository::default();
        repository.insert(sample_record()).expect("insert succeeds");

        let mut duplicate = sample_record();
        duplicate.billing_id = BillingId("bill-infra-2".to_string());
        assert!(matches!(
            repository.insert(duplicate),
            Err(RepositoryError::Conflict)
        ));
    }

    fn sample_record() -> BillingRecord {
        use upkyp::workflows::billing::calculation::compute_statement;
        use upkyp::workflows::billing::domain::{BillingInputs, PropertyId};

        let inputs = BillingInputs {
            rent: Money::from_whole(4000),
            association_dues: Money::ZERO,
            utilities: Vec::new(),
            adjustments: Vec::new(),
        };
        let period = BillingPeriod::new(2025, 10).expect("valid period");
        let issued_on = NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date");
        let statement = compute_statement(&inputs, period, None, issued_on).expect("computes");

        BillingRecord {
            billing_id: BillingId("bill-infra".to_string()),
            unit_id: UnitId("D-1".to_string()),
            property_id: PropertyId("prop-d".to_string()),
            tenant_id: None,
            period,
            issued_on,
            inputs,
            late_fee_policy: None,
            statement,
            payments: Vec::new(),
            revision: 0,
        }
    }
}
