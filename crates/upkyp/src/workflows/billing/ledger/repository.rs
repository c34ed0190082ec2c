use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::domain::{BillingPeriod, TenantId, UnitId};
use super::record::{BillingId, BillingRecord};

/// Storage abstraction so the ledger service can run against any backend.
pub trait BillingRepository: Send + Sync {
    /// Store a new bill. `Conflict` when the id or the unit and period is already billed.
    fn insert(&self, record: BillingRecord) -> Result<BillingRecord, RepositoryError>;
    /// Replace a stored bill only while its revision still equals `expected_revision`.
    /// `Conflict` when another write got there first, `NotFound` when it was never stored.
    fn update(&self, record: BillingRecord, expected_revision: u64) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &BillingId) -> Result<Option<BillingRecord>, RepositoryError>;
    fn for_unit(&self, unit_id: &UnitId) -> Result<Vec<BillingRecord>, RepositoryError>;
    fn find_for_period(
        &self,
        unit_id: &UnitId,
        period: BillingPeriod,
    ) -> Result<Option<BillingRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound tenant notification hook (push, e-mail or in-app feed adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: BillingNotification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingNotification {
    pub template: String,
    pub billing_id: BillingId,
    pub recipient: Option<TenantId>,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
