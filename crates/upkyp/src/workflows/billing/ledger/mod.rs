//! Issued bills, payments and balances for tenant units.

pub mod record;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use record::{
    BillingId, BillingRecord, BillingStatementView, BillingStatus, Payment, PaymentMethod,
};
pub use repository::{
    BillingNotification, BillingRepository, NotificationError, NotificationPublisher,
    RepositoryError,
};
pub use router::billing_router;
pub use service::{BillingLedgerService, BillingServiceError, IssueBillingRequest, PaymentError};
