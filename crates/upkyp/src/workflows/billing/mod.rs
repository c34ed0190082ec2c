//! Tenant billing: itemized statements, late fees and the payment ledger.

pub mod calculation;
pub mod domain;
pub mod ledger;

pub use calculation::{
    assess_late_fee, compute_statement, days_late, due_date, utility_cost, utility_usage,
    BillingError, BillingStatement, LateFeeAssessment, LineItem, LineItemKind,
};
pub use domain::{
    Adjustment, AdjustmentKind, BillingInputs, BillingPeriod, LateFeePolicy, LateFeeType,
    MeterReading, Money, Property, PropertyId, TenantId, Unit, UnitId, UnitReadings,
    UtilityBilling, UtilityCharge, UtilityKind,
};
