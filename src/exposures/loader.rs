//! Load exposures from CSV

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use csv::Reader;

use super::{Exposure, ExposureBasis, ExposureMetaData, ExposureValues, Exposures};

/// Raw CSV row
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    exposure_id: String,
    #[serde(default)]
    exposure_name: Option<String>,
    period_start: NaiveDate,
    period_end: NaiveDate,
    currency: String,
    #[serde(default)]
    line_of_business: Option<String>,
    #[serde(default)]
    basis: Option<String>,
    exposure_value: f64,
    #[serde(default)]
    attachment_point: Option<f64>,
    #[serde(default)]
    limit: Option<f64>,
}

impl CsvRow {
    fn to_exposure(self) -> Result<Exposure> {
        let basis = match self.basis.as_deref() {
            None | Some("") | Some("Earned") => ExposureBasis::Earned,
            Some("Written") => ExposureBasis::Written,
            Some(other) => bail!("Unknown exposure basis for {}: {}", self.exposure_id, other),
        };

        let meta = ExposureMetaData {
            exposure_name: self.exposure_name.unwrap_or_else(|| self.exposure_id.clone()),
            exposure_id: self.exposure_id,
            period_start: self.period_start,
            period_end: self.period_end,
            currency: self.currency,
            line_of_business: self.line_of_business.filter(|s| !s.is_empty()),
            basis,
        };
        let values = ExposureValues {
            exposure_value: self.exposure_value,
            attachment_point: self.attachment_point.unwrap_or(0.0),
            limit: self.limit.unwrap_or(f64::INFINITY),
        };

        Ok(Exposure::new(meta, values)?)
    }
}

/// Load exposures from a CSV file
pub fn load_exposures<P: AsRef<Path>>(path: P) -> Result<Exposures> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening exposures file {}", path.display()))?;
    load_exposures_from_reader(file)
}

/// Load exposures from any reader
pub fn load_exposures_from_reader<R: Read>(reader: R) -> Result<Exposures> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut exposures = Exposures::default();

    for (line, result) in csv_reader.deserialize().enumerate() {
        let row: CsvRow = result.with_context(|| format!("parsing exposures row {}", line + 1))?;
        exposures.push(row.to_exposure()?);
    }

    log::info!("Loaded {} exposures", exposures.len());
    Ok(exposures)
}
