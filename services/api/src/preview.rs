use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use upkyp::workflows::billing::calculation::{compute_statement, BillingError, BillingStatement};
use upkyp::workflows::billing::domain::{
    Adjustment, BillingPeriod, Money, Property, Unit, UnitId, UnitReadings,
};
use upkyp::workflows::meter_readings::UnitBillingRow;

/// One unit to price in a preview.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PreviewUnit {
    pub(crate) unit_id: UnitId,
    pub(crate) rent: Money,
    #[serde(default)]
    pub(crate) association_dues: Option<Money>,
    #[serde(default)]
    pub(crate) readings: UnitReadings,
    #[serde(default)]
    pub(crate) adjustments: Vec<Adjustment>,
}

impl From<UnitBillingRow> for PreviewUnit {
    fn from(row: UnitBillingRow) -> Self {
        Self {
            unit_id: row.unit_id,
            rent: row.rent,
            association_dues: row.association_dues,
            readings: row.readings,
            adjustments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UnitStatement {
    pub(crate) unit_id: UnitId,
    pub(crate) statement: BillingStatement,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PreviewSummary {
    pub(crate) period: BillingPeriod,
    pub(crate) as_of: NaiveDate,
    pub(crate) statements: Vec<UnitStatement>,
    pub(crate) base_total: Money,
    pub(crate) late_fees: Money,
    pub(crate) total_due: Money,
}

/// Price one unit. A unit-level dues figure overrides the property's association dues.
pub(crate) fn price_unit(
    property: &Property,
    preview: PreviewUnit,
    period: BillingPeriod,
    as_of: NaiveDate,
) -> Result<UnitStatement, BillingError> {
    let mut property = property.clone();
    if let Some(dues) = preview.association_dues {
        property.association_dues = dues;
    }

    let unit = Unit {
        unit_id: preview.unit_id,
        property_id: property.property_id.clone(),
        name: String::new(),
        rent: preview.rent,
    };
    let inputs = property.billing_inputs(&unit, &preview.readings, preview.adjustments)?;
    let statement = compute_statement(&inputs, period, property.late_fee.as_ref(), as_of)?;

    Ok(UnitStatement {
        unit_id: unit.unit_id,
        statement,
    })
}

/// Price every unit against the property's rates and late-fee schedule, failing on the first error.
pub(crate) fn preview_statements(
    property: &Property,
    units: Vec<PreviewUnit>,
    period: BillingPeriod,
    as_of: NaiveDate,
) -> Result<PreviewSummary, BillingError> {
    let statements = units
        .into_iter()
        .map(|preview| price_unit(property, preview, period, as_of))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(summarize(period, as_of, statements))
}

pub(crate) fn summarize(
    period: BillingPeriod,
    as_of: NaiveDate,
    statements: Vec<UnitStatement>,
) -> PreviewSummary {
    let base_total = statements.iter().map(|entry| entry.statement.base_total).sum();
    let late_fees = statements
        .iter()
        .map(|entry| entry.statement.late_fee_amount())
        .sum();
    let total_due = statements.iter().map(|entry| entry.statement.total_due).sum();

    PreviewSummary {
        period,
        as_of,
        statements,
        base_total,
        late_fees,
        total_due,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upkyp::workflows::billing::domain::{
        LateFeePolicy, LateFeeType, MeterReading, PropertyId, UtilityBilling,
    };

    fn property() -> Property {
        Property {
            property_id: PropertyId("prop-1".to_string()),
            name: "Mabini Apartments".to_string(),
            association_dues: Money::from_whole(500),
            water: UtilityBilling::Submetered {
                rate: Money::from_whole(20),
            },
            electricity: UtilityBilling::Included,
            late_fee: Some(LateFeePolicy {
                fee_type: LateFeeType::Flat,
                amount: 25.0,
                billing_due_day: 10,
                grace_period_days: 0,
            }),
        }
    }

    fn preview_unit(unit_id: &str, dues: Option<Money>) -> PreviewUnit {
        PreviewUnit {
            unit_id: UnitId(unit_id.to_string()),
            rent: Money::from_whole(5000),
            association_dues: dues,
            readings: UnitReadings {
                water: Some(MeterReading::new(0.0, 10.0)),
                electricity: None,
            },
            adjustments: Vec::new(),
        }
    }

    #[test]
    fn sums_statements_across_units() {
        let period = BillingPeriod::new(2025, 10).expect("valid period");
        let as_of = NaiveDate::from_ymd_opt(2025, 10, 12).expect("valid date");

        let summary = preview_statements(
            &property(),
            vec![
                preview_unit("1A", None),
                preview_unit("1B", Some(Money::ZERO)),
            ],
            period,
            as_of,
        )
        .expect("preview computes");

        assert_eq!(summary.statements.len(), 2);
        assert_eq!(summary.statements[0].statement.base_total, Money::from_whole(5700));
        assert_eq!(summary.statements[1].statement.base_total, Money::from_whole(5200));
        assert_eq!(summary.base_total, Money::from_whole(10_900));
        assert_eq!(summary.late_fees, Money::from_whole(100));
        assert_eq!(summary.total_due, Money::from_whole(11_000));
    }
}
