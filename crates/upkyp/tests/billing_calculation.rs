use chrono::NaiveDate;
use upkyp::workflows::billing::{
    compute_statement, Adjustment, BillingError, BillingPeriod, LateFeePolicy, LateFeeType,
    LineItemKind, MeterReading, Money, Property, PropertyId, Unit, UnitId, UnitReadings,
    UtilityBilling, UtilityKind,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn property(late_fee: Option<LateFeePolicy>) -> Property {
    Property {
        property_id: PropertyId("prop-harbor".to_string()),
        name: "Harbor View".to_string(),
        association_dues: Money::from_whole(500),
        water: UtilityBilling::Submetered {
            rate: Money::from_whole(20),
        },
        electricity: UtilityBilling::Submetered {
            rate: Money::from_minor(1_150),
        },
        late_fee,
    }
}

fn unit() -> Unit {
    Unit {
        unit_id: UnitId("HV-7".to_string()),
        property_id: PropertyId("prop-harbor".to_string()),
        name: "Unit 7".to_string(),
        rent: Money::from_whole(5000),
    }
}

fn readings() -> UnitReadings {
    UnitReadings {
        water: Some(MeterReading::new(100.0, 110.0)),
        electricity: Some(MeterReading::new(500.0, 500.0)),
    }
}

#[test]
fn rent_dues_and_water_add_up_to_base_total() {
    let property = property(None);
    let inputs = property
        .billing_inputs(&unit(), &readings(), Vec::new())
        .expect("inputs assemble");
    let period = BillingPeriod::new(2025, 10).expect("valid period");

    let statement = compute_statement(&inputs, period, None, date(2025, 10, 1)).expect("computes");

    assert_eq!(statement.base_total, Money::from_whole(5700));
    let utility_lines: Vec<_> = statement
        .line_items
        .iter()
        .filter(|item| item.kind == LineItemKind::Utility)
        .collect();
    assert_eq!(utility_lines.len(), 2);
    assert_eq!(utility_lines[0].usage, Some(10.0));
    assert_eq!(utility_lines[1].amount, Money::ZERO);
}

#[test]
fn additional_charges_and_discounts_shift_the_total() {
    let property = property(None);
    let adjustments = vec![
        Adjustment::charge("Pet fee", Money::from_whole(250)),
        Adjustment::charge("Parking", Money::from_whole(300)),
        Adjustment::discount("Referral", Money::from_whole(150)),
    ];
    let inputs = property
        .billing_inputs(&unit(), &readings(), adjustments)
        .expect("inputs assemble");
    let period = BillingPeriod::new(2025, 10).expect("valid period");

    let statement = compute_statement(&inputs, period, None, date(2025, 10, 1)).expect("computes");

    assert_eq!(statement.base_total, Money::from_whole(6100));
    assert_eq!(statement.total_due, Money::from_whole(6100));
}

#[test]
fn percentage_late_fee_after_grace_is_added_to_total_due() {
    let policy = LateFeePolicy {
        fee_type: LateFeeType::Percentage,
        amount: 10.0,
        billing_due_day: 31,
        grace_period_days: 2,
    };
    let property = property(Some(policy));
    let inputs = property
        .billing_inputs(&unit(), &readings(), Vec::new())
        .expect("inputs assemble");
    let february = BillingPeriod::new(2025, 2).expect("valid period");

    let on_grace_end = compute_statement(&inputs, february, Some(&policy), date(2025, 3, 2))
        .expect("computes");
    assert_eq!(on_grace_end.late_fee_amount(), Money::ZERO);
    assert_eq!(on_grace_end.due_date(), Some(date(2025, 2, 28)));

    let late = compute_statement(&inputs, february, Some(&policy), date(2025, 3, 3))
        .expect("computes");
    assert_eq!(late.late_fee_amount(), Money::from_whole(500));
    assert_eq!(late.total_due, Money::from_whole(6200));
}

#[test]
fn submetered_property_requires_readings_and_matching_unit() {
    let property = property(None);

    let missing = property.billing_inputs(
        &unit(),
        &UnitReadings {
            water: Some(MeterReading::new(1.0, 2.0)),
            electricity: None,
        },
        Vec::new(),
    );
    assert_eq!(
        missing,
        Err(BillingError::MissingMeterReading(UtilityKind::Electricity))
    );

    let mut stranger = unit();
    stranger.property_id = PropertyId("prop-elsewhere".to_string());
    assert!(matches!(
        property.billing_inputs(&stranger, &readings(), Vec::new()),
        Err(BillingError::PropertyMismatch { .. })
    ));
}

#[test]
fn included_utilities_ignore_readings() {
    let mut property = property(None);
    property.water = UtilityBilling::Included;
    property.electricity = UtilityBilling::Included;

    let inputs = property
        .billing_inputs(&unit(), &readings(), Vec::new())
        .expect("inputs assemble");
    assert!(inputs.utilities.is_empty());
}
