//! CSV schedule import.
//!
//! Accepts the snake_case export columns as well as the headings used by
//! the published schedule downloads.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use duty_core::{HtsNumber, TariffRecord};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "HTS Number", default)]
    hts_number: Option<String>,
    #[serde(alias = "Description", default)]
    description: Option<String>,
    #[serde(alias = "General Rate of Duty", default)]
    general_rate: Option<String>,
    #[serde(alias = "Special Rate of Duty", default)]
    special_rate: Option<String>,
    #[serde(alias = "Column 2 Rate of Duty", default)]
    column2_rate: Option<String>,
    #[serde(alias = "Section", default)]
    section: Option<String>,
    #[serde(alias = "Chapter", default)]
    chapter: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CsvImport {
    pub records: Vec<TariffRecord>,
    /// Rows dropped for a missing or malformed HTS number.
    pub skipped: usize,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

pub fn read_tariff_csv<R: Read>(reader: R) -> Result<CsvImport> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let mut import = CsvImport::default();

    for (idx, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let line = idx + 2;
        let row = row.with_context(|| format!("malformed CSV row at line {line}"))?;

        let Some(raw_number) = clean(row.hts_number) else {
            import.skipped += 1;
            continue;
        };
        let hts = match HtsNumber::parse(&raw_number) {
            Ok(hts) => hts,
            Err(err) => {
                warn!(line, hts = %raw_number, error = %err, "skipping CSV row");
                import.skipped += 1;
                continue;
            }
        };

        import.records.push(TariffRecord {
            hts_number: raw_number,
            description: clean(row.description).unwrap_or_default(),
            general_rate: clean(row.general_rate),
            special_rate: clean(row.special_rate),
            column2_rate: clean(row.column2_rate),
            section: clean(row.section),
            chapter: clean(row.chapter).or_else(|| Some(hts.chapter().to_string())),
        });
    }

    Ok(import)
}

pub fn read_tariff_csv_path(path: impl AsRef<Path>) -> Result<CsvImport> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("failed opening {}", path.display()))?;
    read_tariff_csv(file).with_context(|| format!("failed reading {}", path.display()))
}
