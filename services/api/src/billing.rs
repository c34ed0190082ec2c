use crate::infra::{
    parse_amount, parse_charge, parse_date, parse_discount, parse_period, parse_reading_pair,
};
use crate::preview::{price_unit, summarize, PreviewUnit};
use crate::render::{render_statement, render_summary};
use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use upkyp::config::{AppConfig, BillingConfig};
use upkyp::error::AppError;
use upkyp::workflows::billing::domain::{
    Adjustment, BillingPeriod, LateFeePolicy, LateFeeType, MeterReading, Money, Property,
    PropertyId, UnitId, UnitReadings, UtilityBilling,
};
use upkyp::workflows::meter_readings::MeterReadingImporter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum LateFeeKind {
    /// Fixed amount per day late
    #[default]
    Flat,
    /// Percentage of monthly rent, charged once
    Percentage,
}

impl From<LateFeeKind> for LateFeeType {
    fn from(kind: LateFeeKind) -> Self {
        match kind {
            LateFeeKind::Flat => LateFeeType::Flat,
            LateFeeKind::Percentage => LateFeeType::Percentage,
        }
    }
}

/// Property-level rates shared by single and batch billing.
#[derive(Args, Debug, Default)]
pub(crate) struct PropertyArgs {
    /// Property name printed above batch totals
    #[arg(long = "property", default_value = "Property")]
    pub(crate) name: String,
    /// Monthly association dues
    #[arg(long, value_parser = parse_amount)]
    pub(crate) dues: Option<Money>,
    /// Water rate per cubic meter. Omit when water is included in rent.
    #[arg(long, value_parser = parse_amount)]
    pub(crate) water_rate: Option<Money>,
    /// Electricity rate per kWh. Omit when electricity is included in rent.
    #[arg(long, value_parser = parse_amount)]
    pub(crate) electricity_rate: Option<Money>,
    /// Late fee amount: currency per day for flat fees, percent of rent otherwise
    #[arg(long)]
    pub(crate) late_fee: Option<f64>,
    #[arg(long, value_enum, default_value_t = LateFeeKind::Flat)]
    pub(crate) late_fee_type: LateFeeKind,
    /// Day of month rent is due (defaults to BILLING_DUE_DAY)
    #[arg(long)]
    pub(crate) due_day: Option<u8>,
    /// Days after the due date before late fees start (defaults to BILLING_GRACE_DAYS)
    #[arg(long)]
    pub(crate) grace_days: Option<u32>,
    /// Billing month as YYYY-MM (defaults to the month of --as-of)
    #[arg(long, value_parser = parse_period)]
    pub(crate) period: Option<BillingPeriod>,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
}

impl PropertyArgs {
    fn property(&self, defaults: &BillingConfig) -> Property {
        let late_fee = self.late_fee.map(|amount| LateFeePolicy {
            fee_type: self.late_fee_type.into(),
            amount,
            billing_due_day: self.due_day.unwrap_or(defaults.default_due_day),
            grace_period_days: self.grace_days.unwrap_or(defaults.default_grace_period_days),
        });

        Property {
            property_id: PropertyId("cli".to_string()),
            name: self.name.clone(),
            association_dues: self.dues.unwrap_or(Money::ZERO),
            water: utility_billing(self.water_rate),
            electricity: utility_billing(self.electricity_rate),
            late_fee,
        }
    }

    fn schedule(&self) -> (BillingPeriod, NaiveDate) {
        let as_of = self.as_of.unwrap_or_else(|| Local::now().date_naive());
        let period = self.period.unwrap_or_else(|| BillingPeriod::containing(as_of));
        (period, as_of)
    }
}

fn utility_billing(rate: Option<Money>) -> UtilityBilling {
    match rate {
        Some(rate) => UtilityBilling::Submetered { rate },
        None => UtilityBilling::Included,
    }
}

#[derive(Args, Debug)]
pub(crate) struct PreviewArgs {
    /// Unit label printed on the statement
    #[arg(long, default_value = "UNIT")]
    pub(crate) unit: String,
    /// Monthly rent
    #[arg(long, value_parser = parse_amount)]
    pub(crate) rent: Money,
    /// Water meter as PREVIOUS:CURRENT
    #[arg(long, value_parser = parse_reading_pair)]
    pub(crate) water: Option<(f64, f64)>,
    /// Electricity meter as PREVIOUS:CURRENT
    #[arg(long, value_parser = parse_reading_pair)]
    pub(crate) electricity: Option<(f64, f64)>,
    /// Additional charge as LABEL=AMOUNT (repeatable)
    #[arg(long = "charge", value_parser = parse_charge)]
    pub(crate) charges: Vec<Adjustment>,
    /// Discount as LABEL=AMOUNT (repeatable)
    #[arg(long = "discount", value_parser = parse_discount)]
    pub(crate) discounts: Vec<Adjustment>,
    #[command(flatten)]
    pub(crate) rates: PropertyArgs,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV export with Unit, Rent, Dues and meter reading columns
    #[arg(long)]
    pub(crate) readings: PathBuf,
    /// Print every unit's itemized statement, not just the totals
    #[arg(long)]
    pub(crate) itemized: bool,
    #[command(flatten)]
    pub(crate) rates: PropertyArgs,
}

pub(crate) fn run_preview(args: PreviewArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let PreviewArgs {
        unit,
        rent,
        water,
        electricity,
        charges,
        discounts,
        rates,
    } = args;

    let (period, as_of) = rates.schedule();
    let preview = PreviewUnit {
        unit_id: UnitId(unit),
        rent,
        association_dues: None,
        readings: UnitReadings {
            water: water.map(|(previous, current)| MeterReading::new(previous, current)),
            electricity: electricity.map(|(previous, current)| MeterReading::new(previous, current)),
        },
        adjustments: charges.into_iter().chain(discounts).collect(),
    };

    let entry = price_unit(&rates.property(&config.billing), preview, period, as_of)?;
    print!("{}", render_statement(&entry, &config.billing.currency));
    Ok(())
}

/// Bill every unit in the readings file. Units that cannot be billed are reported and skipped.
pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let BatchArgs {
        readings,
        itemized,
        rates,
    } = args;

    let (period, as_of) = rates.schedule();
    let property = rates.property(&config.billing);
    let rows = MeterReadingImporter::from_path(&readings)?;
    let currency = config.billing.currency.as_str();

    let mut statements = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();
    for row in rows {
        let unit_id = row.unit_id.0.clone();
        match price_unit(&property, PreviewUnit::from(row), period, as_of) {
            Ok(entry) => statements.push(entry),
            Err(err) => skipped.push((unit_id, err)),
        }
    }

    if itemized {
        for entry in &statements {
            println!("{}", render_statement(entry, currency));
        }
    }

    let summary = summarize(period, as_of, statements);
    println!("{}", property.name);
    print!("{}", render_summary(&summary, currency));

    if !skipped.is_empty() {
        println!("Skipped {} unit(s):", skipped.len());
        for (unit_id, err) in skipped {
            println!("  {unit_id}: {err}");
        }
    }

    Ok(())
}
