use std::collections::HashMap;
use std::sync::{Arc, Barrier, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::billing::domain::{
    Adjustment, BillingPeriod, LateFeePolicy, LateFeeType, MeterReading, Money, Property,
    PropertyId, TenantId, Unit, UnitId, UnitReadings, UtilityBilling,
};
use crate::workflows::billing::ledger::record::{BillingId, BillingRecord};
use crate::workflows::billing::ledger::repository::{
    BillingNotification, BillingRepository, NotificationError, NotificationPublisher,
    RepositoryError,
};
use crate::workflows::billing::ledger::service::{BillingLedgerService, IssueBillingRequest};
use crate::workflows::billing::ledger::billing_router;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn october() -> BillingPeriod {
    BillingPeriod::new(2025, 10).expect("valid period")
}

pub(super) fn property() -> Property {
    Property {
        property_id: PropertyId("prop-sunrise".to_string()),
        name: "Sunrise Residences".to_string(),
        association_dues: Money::from_whole(500),
        water: UtilityBilling::Submetered {
            rate: Money::from_whole(20),
        },
        electricity: UtilityBilling::Included,
        late_fee: Some(LateFeePolicy {
            fee_type: LateFeeType::Flat,
            amount: 50.0,
            billing_due_day: 5,
            grace_period_days: 3,
        }),
    }
}

pub(super) fn unit(unit_id: &str) -> Unit {
    Unit {
        unit_id: UnitId(unit_id.to_string()),
        property_id: PropertyId("prop-sunrise".to_string()),
        name: "Studio".to_string(),
        rent: Money::from_whole(5000),
    }
}

/// Rent 5000 + dues 500 + 10 units of water at 20 = 5700 before adjustments.
pub(super) fn issue_request(unit_id: &str) -> IssueBillingRequest {
    IssueBillingRequest {
        property: property(),
        unit: unit(unit_id),
        tenant_id: Some(TenantId("tenant-ana".to_string())),
        period: october(),
        readings: UnitReadings {
            water: Some(MeterReading::new(40.0, 50.0)),
            electricity: None,
        },
        adjustments: vec![
            Adjustment::charge("Parking", Money::from_whole(300)),
            Adjustment::discount("Loyalty", Money::from_whole(100)),
        ],
        issued_on: Some(date(2025, 10, 1)),
    }
}

pub(super) fn build_service() -> (
    BillingLedgerService<MemoryRepository, MemoryNotifications>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifications>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = BillingLedgerService::new(repository.clone(), notifications.clone());
    (service, repository, notifications)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<BillingId, BillingRecord>>>,
}

impl BillingRepository for MemoryRepository {
    fn insert(&self, record: BillingRecord) -> Result<BillingRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
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
        let mut guard = self.records.lock().expect("repository mutex poisoned");
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
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_unit(&self, unit_id: &UnitId) -> Result<Vec<BillingRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
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
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|record| &record.unit_id == unit_id && record.period == period)
            .cloned())
    }
}

/// Which read the gated repository holds until every caller has reached it.
#[derive(Clone, Copy)]
pub(super) enum Gate {
    Fetch,
    FindForPeriod,
}

/// Wraps a [`MemoryRepository`] and parks callers on a barrier at one read, so concurrent
/// requests all observe the same state before any of them writes.
pub(super) struct GatedRepository {
    pub(super) inner: MemoryRepository,
    barrier: Barrier,
    gate: Gate,
}

impl GatedRepository {
    pub(super) fn new(inner: MemoryRepository, gate: Gate, callers: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(callers),
            gate,
        }
    }
}

impl BillingRepository for GatedRepository {
    fn insert(&self, record: BillingRecord) -> Result<BillingRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn update(&self, record: BillingRecord, expected_revision: u64) -> Result<(), RepositoryError> {
        self.inner.update(record, expected_revision)
    }

    fn fetch(&self, id: &BillingId) -> Result<Option<BillingRecord>, RepositoryError> {
        let found = self.inner.fetch(id);
        if matches!(self.gate, Gate::Fetch) {
            self.barrier.wait();
        }
        found
    }

    fn for_unit(&self, unit_id: &UnitId) -> Result<Vec<BillingRecord>, RepositoryError> {
        self.inner.for_unit(unit_id)
    }

    fn find_for_period(
        &self,
        unit_id: &UnitId,
        period: BillingPeriod,
    ) -> Result<Option<BillingRecord>, RepositoryError> {
        let found = self.inner.find_for_period(unit_id, period);
        if matches!(self.gate, Gate::FindForPeriod) {
            self.barrier.wait();
        }
        found
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<BillingNotification>>>,
}

impl MemoryNotifications {
    pub(super) fn templates(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .iter()
            .map(|event| event.template.clone())
            .collect()
    }

    pub(super) fn events(&self) -> Vec<BillingNotification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: BillingNotification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl BillingRepository for UnavailableRepository {
    fn insert(&self, _record: BillingRecord) -> Result<BillingRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: BillingRecord, _expected_revision: u64) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &BillingId) -> Result<Option<BillingRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_unit(&self, _unit_id: &UnitId) -> Result<Vec<BillingRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_for_period(
        &self,
        _unit_id: &UnitId,
        _period: BillingPeriod,
    ) -> Result<Option<BillingRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct OfflineNotifications;

impl NotificationPublisher for OfflineNotifications {
    fn publish(&self, _notification: BillingNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("push gateway offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, status: StatusCode) {
    assert_eq!(response.status(), status);
}

pub(super) fn billing_router_with_service(
    service: BillingLedgerService<MemoryRepository, MemoryNotifications>,
) -> axum::Router {
    billing_router(Arc::new(service))
}
