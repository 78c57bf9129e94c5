//! Load claims from a long-format CSV
//!
//! One row per claim per development period. Rows for a claim need not be
//! contiguous. Claims keep their order of first appearance and take their
//! claim-level columns from the first row seen.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use csv::Reader;

use super::{Claim, ClaimDevelopmentHistory, ClaimStatus, ClaimYearType, Claims, ClaimsMetaData};

/// Raw CSV row
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    claim_id: String,
    currency: String,
    #[serde(default)]
    contract_limit: Option<f64>,
    #[serde(default)]
    contract_deductible: Option<f64>,
    #[serde(default)]
    in_xs_of_deductible: Option<bool>,
    #[serde(default)]
    year_basis: Option<String>,
    #[serde(default)]
    loss_date: Option<NaiveDate>,
    #[serde(default)]
    policy_inception_date: Option<NaiveDate>,
    #[serde(default)]
    report_date: Option<NaiveDate>,
    #[serde(default)]
    line_of_business: Option<String>,
    #[serde(default)]
    status: Option<String>,
    development_period: u32,
    cumulative_paid: f64,
    cumulative_incurred: f64,
}

impl CsvRow {
    fn to_meta(&self) -> Result<ClaimsMetaData> {
        let year_basis = match self.year_basis.as_deref() {
            None | Some("") | Some("Accident") => ClaimYearType::AccidentYear,
            Some("Underwriting") => ClaimYearType::UnderwritingYear,
            Some("Reported") => ClaimYearType::ReportedYear,
            Some(other) => bail!("Unknown year basis for claim {}: {}", self.claim_id, other),
        };

        let status = match self.status.as_deref() {
            None | Some("") | Some("Open") => ClaimStatus::Open,
            Some("Closed") => ClaimStatus::Closed,
            Some("Reopened") => ClaimStatus::Reopened,
            Some(other) => bail!("Unknown status for claim {}: {}", self.claim_id, other),
        };

        let mut meta = ClaimsMetaData::new(&self.claim_id, &self.currency)
            .with_policy_terms(
                self.contract_deductible.unwrap_or(0.0),
                self.contract_limit,
                self.in_xs_of_deductible.unwrap_or(false),
            )
            .with_dates(self.loss_date, self.policy_inception_date, self.report_date)
            .with_year_basis(year_basis)
            .with_status(status);
        meta.line_of_business = self.line_of_business.clone().filter(|s| !s.is_empty());
        Ok(meta)
    }
}

/// Points collected for one claim before the history is built
struct PendingClaim {
    meta: ClaimsMetaData,
    periods: Vec<u32>,
    paid: Vec<f64>,
    incurred: Vec<f64>,
}

/// Load claims from a CSV file
pub fn load_claims<P: AsRef<Path>>(path: P) -> Result<Claims> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening claims file {}", path.display()))?;
    load_claims_from_reader(file)
}

/// Load claims from any reader
pub fn load_claims_from_reader<R: Read>(reader: R) -> Result<Claims> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut order: Vec<String> = Vec::new();
    let mut pending: HashMap<String, PendingClaim> = HashMap::new();

    for (line, result) in csv_reader.deserialize().enumerate() {
        let row: CsvRow = result.with_context(|| format!("parsing claims row {}", line + 1))?;

        if !pending.contains_key(&row.claim_id) {
            order.push(row.claim_id.clone());
            pending.insert(
                row.claim_id.clone(),
                PendingClaim {
                    meta: row.to_meta()?,
                    periods: Vec::new(),
                    paid: Vec::new(),
                    incurred: Vec::new(),
                },
            );
        }

        if let Some(entry) = pending.get_mut(&row.claim_id) {
            entry.periods.push(row.development_period);
            entry.paid.push(row.cumulative_paid);
            entry.incurred.push(row.cumulative_incurred);
        }
    }

    let mut claims = Claims::default();
    for claim_id in order {
        let Some(entry) = pending.remove(&claim_id) else {
            continue;
        };

        // Sort by period so out-of-order rows still form a valid history
        let mut points: Vec<(u32, f64, f64)> = entry
            .periods
            .into_iter()
            .zip(entry.paid)
            .zip(entry.incurred)
            .map(|((p, paid), incurred)| (p, paid, incurred))
            .collect();
        points.sort_by_key(|&(p, _, _)| p);

        let history = ClaimDevelopmentHistory::new(
            &claim_id,
            points.iter().map(|p| p.0).collect(),
            points.iter().map(|p| p.1).collect(),
            points.iter().map(|p| p.2).collect(),
        )?;
        claims.push(Claim::new(entry.meta, history));
    }

    log::info!("Loaded {} claims", claims.len());
    Ok(claims)
}
