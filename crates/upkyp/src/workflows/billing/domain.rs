use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use super::calculation::BillingError;

/// Signed monetary amount held in minor units (centavos).
///
/// JSON carries the amount in major units (`5000.5`) so payloads match what landlords type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn from_whole(major: i64) -> Self {
        Self(major * 100)
    }

    /// Convert a major-unit amount, rounding half away from zero. Non-finite input yields `None`.
    pub fn from_major(major: f64) -> Option<Self> {
        if !major.is_finite() {
            return None;
        }
        let minor = (major * 100.0).round();
        if minor.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Self(minor as i64))
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn max(self, other: Money) -> Money {
        Money(self.0.max(other.0))
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// `percent` of this amount (5.0 means five percent), rounded to the nearest minor unit.
    /// `None` when the result does not fit.
    pub fn checked_percent_of(self, percent: f64) -> Option<Money> {
        self.checked_times(percent / 100.0)
    }

    /// Multiply by a fractional quantity such as metered usage. `None` when the product is not
    /// finite or does not fit.
    pub fn checked_times(self, quantity: f64) -> Option<Money> {
        let product = (self.0 as f64 * quantity).round();
        if !product.is_finite() || product.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Money(product as i64))
    }
}

// Operators saturate so running balances can never panic; statement totals go through the
// checked methods instead.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        f.pad(&format!("{sign}{}.{:02}", abs / 100, abs % 100))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        Money::from_major(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("'{raw}' is not a valid amount")))
    }
}

/// Calendar month a bill covers, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, BillingError> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(BillingError::InvalidPeriod(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> u32 {
        self.month
    }

    pub fn last_day(self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingPeriod {
    type Err = BillingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || BillingError::InvalidPeriod(raw.to_string());
        let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        BillingPeriod::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for BillingPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BillingPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityKind {
    Water,
    Electricity,
}

impl UtilityKind {
    pub const fn ordered() -> [Self; 2] {
        [Self::Water, Self::Electricity]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Water => "Water",
            Self::Electricity => "Electricity",
        }
    }
}

/// How a property bills a utility to its units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum UtilityBilling {
    /// Consumption is part of the rent; no per-unit charge.
    Included,
    /// Each unit is metered and charged `rate` per consumption unit.
    Submetered { rate: Money },
}

impl Default for UtilityBilling {
    fn default() -> Self {
        Self::Included
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    pub previous: f64,
    pub current: f64,
}

impl MeterReading {
    pub const fn new(previous: f64, current: f64) -> Self {
        Self { previous, current }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Charge,
    Discount,
}

/// Ad hoc additional charge or discount entered on a single bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    #[serde(rename = "type")]
    pub kind: AdjustmentKind,
    #[serde(default)]
    pub label: String,
    pub amount: Money,
}

impl Adjustment {
    pub fn charge(label: impl Into<String>, amount: Money) -> Self {
        Self {
            kind: AdjustmentKind::Charge,
            label: label.into(),
            amount,
        }
    }

    pub fn discount(label: impl Into<String>, amount: Money) -> Self {
        Self {
            kind: AdjustmentKind::Discount,
            label: label.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateFeeType {
    Percentage,
    Flat,
}

/// Property-level late-fee configuration.
///
/// `amount` is a percent of base rent for [`LateFeeType::Percentage`] and a per-day amount in
/// major units for [`LateFeeType::Flat`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LateFeePolicy {
    pub fee_type: LateFeeType,
    pub amount: f64,
    pub billing_due_day: u8,
    #[serde(default)]
    pub grace_period_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

/// Property snapshot carrying the billing configuration shared by its units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub property_id: PropertyId,
    pub name: String,
    #[serde(default)]
    pub association_dues: Money,
    #[serde(default)]
    pub water: UtilityBilling,
    #[serde(default)]
    pub electricity: UtilityBilling,
    #[serde(default)]
    pub late_fee: Option<LateFeePolicy>,
}

impl Property {
    pub fn utility_billing(&self, utility: UtilityKind) -> UtilityBilling {
        match utility {
            UtilityKind::Water => self.water,
            UtilityKind::Electricity => self.electricity,
        }
    }

    /// Assemble calculation inputs for one unit of this property.
    ///
    /// Readings for utilities the property does not submeter are ignored.
    pub fn billing_inputs(
        &self,
        unit: &Unit,
        readings: &UnitReadings,
        adjustments: Vec<Adjustment>,
    ) -> Result<BillingInputs, BillingError> {
        if unit.property_id != self.property_id {
            return Err(BillingError::PropertyMismatch {
                unit: unit.unit_id.0.clone(),
                property: self.property_id.0.clone(),
            });
        }

        let mut utilities = Vec::new();
        for utility in UtilityKind::ordered() {
            if let UtilityBilling::Submetered { rate } = self.utility_billing(utility) {
                let reading = readings
                    .get(utility)
                    .ok_or(BillingError::MissingMeterReading(utility))?;
                utilities.push(UtilityCharge {
                    utility,
                    reading,
                    rate,
                });
            }
        }

        Ok(BillingInputs {
            rent: unit.rent,
            association_dues: self.association_dues,
            utilities,
            adjustments,
        })
    }
}

/// Rentable sub-space of a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub unit_id: UnitId,
    pub property_id: PropertyId,
    #[serde(default)]
    pub name: String,
    pub rent: Money,
}

/// Meter readings captured for a unit in one billing period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitReadings {
    #[serde(default)]
    pub water: Option<MeterReading>,
    #[serde(default)]
    pub electricity: Option<MeterReading>,
}

impl UnitReadings {
    pub fn get(&self, utility: UtilityKind) -> Option<MeterReading> {
        match utility {
            UtilityKind::Water => self.water,
            UtilityKind::Electricity => self.electricity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilityCharge {
    pub utility: UtilityKind,
    pub reading: MeterReading,
    pub rate: Money,
}

/// Everything the calculation needs for one unit and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingInputs {
    pub rent: Money,
    #[serde(default)]
    pub association_dues: Money,
    #[serde(default)]
    pub utilities: Vec<UtilityCharge>,
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
}
