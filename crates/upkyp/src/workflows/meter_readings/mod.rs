//! Bulk meter-reading import from spreadsheet exports.

mod normalizer;
mod parser;

use crate::workflows::billing::domain::{MeterReading, Money, UnitId, UnitReadings, UtilityKind};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use parser::RawReadingRow;

/// Rent, dues and meter readings for one unit as captured by the landlord.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitBillingRow {
    pub unit_id: UnitId,
    pub rent: Money,
    pub association_dues: Option<Money>,
    pub readings: UnitReadings,
}

#[derive(Debug)]
pub enum MeterReadingImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },
    IncompleteReading {
        line: u64,
        unit: String,
        utility: UtilityKind,
    },
}

impl std::fmt::Display for MeterReadingImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeterReadingImportError::Io(err) => {
                write!(f, "failed to read meter readings: {}", err)
            }
            MeterReadingImportError::Csv(err) => write!(f, "invalid meter reading CSV: {}", err),
            MeterReadingImportError::InvalidNumber {
                line,
                column,
                value,
            } => write!(f, "line {}: '{}' in {} is not a number", line, value, column),
            MeterReadingImportError::IncompleteReading {
                line,
                unit,
                utility,
            } => write!(
                f,
                "line {}: unit {} has only one of the previous/current {} readings",
                line,
                unit,
                utility.label().to_ascii_lowercase()
            ),
        }
    }
}

impl std::error::Error for MeterReadingImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MeterReadingImportError::Io(err) => Some(err),
            MeterReadingImportError::Csv(err) => Some(err),
            MeterReadingImportError::InvalidNumber { .. }
            | MeterReadingImportError::IncompleteReading { .. } => None,
        }
    }
}

impl From<std::io::Error> for MeterReadingImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for MeterReadingImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct MeterReadingImporter;

impl MeterReadingImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<UnitBillingRow>, MeterReadingImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse rows in file order. A unit listed twice keeps its first position and last values.
    pub fn from_reader<R: Read>(
        reader: R,
    ) -> Result<Vec<UnitBillingRow>, MeterReadingImportError> {
        let mut rows: Vec<UnitBillingRow> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for raw in parser::parse_rows(reader)? {
            let row = convert_row(raw)?;
            match positions.get(&row.unit_id.0) {
                Some(&index) => rows[index] = row,
                None => {
                    positions.insert(row.unit_id.0.clone(), rows.len());
                    rows.push(row);
                }
            }
        }

        Ok(rows)
    }
}

fn convert_row(raw: RawReadingRow) -> Result<UnitBillingRow, MeterReadingImportError> {
    let line = raw.line;
    let rent = parse_amount(line, "Rent", &raw.rent)?;
    let association_dues = raw
        .dues
        .as_deref()
        .map(|value| parse_amount(line, "Dues", value))
        .transpose()?;

    let water = parse_reading(line, &raw.unit, UtilityKind::Water, raw.water)?;
    let electricity = parse_reading(line, &raw.unit, UtilityKind::Electricity, raw.electricity)?;

    Ok(UnitBillingRow {
        unit_id: UnitId(raw.unit),
        rent,
        association_dues,
        readings: UnitReadings { water, electricity },
    })
}

fn parse_reading(
    line: u64,
    unit: &str,
    utility: UtilityKind,
    pair: (Option<String>, Option<String>),
) -> Result<Option<MeterReading>, MeterReadingImportError> {
    let (previous_column, current_column) = match utility {
        UtilityKind::Water => ("Water Previous", "Water Current"),
        UtilityKind::Electricity => ("Electricity Previous", "Electricity Current"),
    };

    match pair {
        (None, None) => Ok(None),
        (Some(previous), Some(current)) => Ok(Some(MeterReading::new(
            parse_number(line, previous_column, &previous)?,
            parse_number(line, current_column, &current)?,
        ))),
        _ => Err(MeterReadingImportError::IncompleteReading {
            line,
            unit: unit.to_string(),
            utility,
        }),
    }
}

fn parse_amount(
    line: u64,
    column: &'static str,
    value: &str,
) -> Result<Money, MeterReadingImportError> {
    let number = parse_number(line, column, value)?;
    Money::from_major(number).ok_or_else(|| invalid_number(line, column, value))
}

fn parse_number(
    line: u64,
    column: &'static str,
    value: &str,
) -> Result<f64, MeterReadingImportError> {
    let cleaned = value.trim().replace(',', "");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| invalid_number(line, column, value))
}

fn invalid_number(line: u64, column: &'static str, value: &str) -> MeterReadingImportError {
    MeterReadingImportError::InvalidNumber {
        line,
        column,
        value: value.to_string(),
    }
}
