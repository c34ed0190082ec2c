use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::domain::{BillingPeriod, LateFeePolicy, LateFeeType, Money};
use super::BillingError;

/// Late fee evaluated for one bill on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateFeeAssessment {
    pub due_date: NaiveDate,
    pub days_late: u32,
    pub fee: Money,
}

/// Due date inside the period's month. Days past the end of a short month fall on its last day.
pub fn due_date(period: BillingPeriod, billing_due_day: u8) -> NaiveDate {
    let day = u32::from(billing_due_day.max(1));
    NaiveDate::from_ymd_opt(period.year(), period.month(), day).unwrap_or_else(|| period.last_day())
}

pub fn days_late(due_date: NaiveDate, grace_period_days: u32, as_of: NaiveDate) -> u32 {
    let overdue = (as_of - due_date).num_days() - i64::from(grace_period_days);
    u32::try_from(overdue.max(0)).unwrap_or(u32::MAX)
}

pub fn assess_late_fee(
    policy: &LateFeePolicy,
    rent: Money,
    period: BillingPeriod,
    as_of: NaiveDate,
) -> Result<LateFeeAssessment, BillingError> {
    let due_date = due_date(period, policy.billing_due_day);
    let days_late = days_late(due_date, policy.grace_period_days, as_of);

    let fee = if days_late == 0 {
        Some(Money::ZERO)
    } else {
        match policy.fee_type {
            LateFeeType::Percentage => rent.checked_percent_of(policy.amount),
            LateFeeType::Flat => Money::from_major(policy.amount)
                .and_then(|daily| daily.checked_times(f64::from(days_late))),
        }
    };
    let fee = fee.ok_or_else(|| BillingError::AmountOutOfRange {
        field: "late_fee".to_string(),
    })?;

    Ok(LateFeeAssessment {
        due_date,
        days_late,
        fee,
    })
}
