use super::normalizer::normalize_unit;
use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug)]
pub(crate) struct RawReadingRow {
    pub(crate) line: u64,
    pub(crate) unit: String,
    pub(crate) rent: String,
    pub(crate) dues: Option<String>,
    pub(crate) water: (Option<String>, Option<String>),
    pub(crate) electricity: (Option<String>, Option<String>),
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<RawReadingRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in csv_reader.deserialize::<ReadingRow>().enumerate() {
        let row = record?;
        let unit = normalize_unit(&row.unit);
        if unit.is_empty() {
            continue;
        }

        rows.push(RawReadingRow {
            line: index as u64 + 2,
            unit,
            rent: row.rent,
            dues: row.dues,
            water: (row.water_previous, row.water_current),
            electricity: (row.electricity_previous, row.electricity_current),
        });
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct ReadingRow {
    #[serde(rename = "Unit")]
    unit: String,
    #[serde(rename = "Rent")]
    rent: String,
    #[serde(rename = "Dues", default, deserialize_with = "empty_string_as_none")]
    dues: Option<String>,
    #[serde(
        rename = "Water Previous",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    water_previous: Option<String>,
    #[serde(
        rename = "Water Current",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    water_current: Option<String>,
    #[serde(
        rename = "Electricity Previous",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    electricity_previous: Option<String>,
    #[serde(
        rename = "Electricity Current",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    electricity_current: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
