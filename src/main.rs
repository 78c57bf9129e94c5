//! Reinsurance Pricing CLI
//!
//! Runs the experience rating pipeline for a contract and reports burn costs per layer

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use reinsurance_pricing::claims::load_claims;
use reinsurance_pricing::exposures::load_exposures;
use reinsurance_pricing::treaty::load_contract;
use reinsurance_pricing::trending::{load_trend_factors, TrendLookup, Trending, YearlyFactors};
use reinsurance_pricing::triangles::{AverageMethod, Triangle, TriangleValue};
use reinsurance_pricing::{ExperienceModel, ModellingAssumptions, ProjectionMethod};

/// Reinsurance experience rating CLI
#[derive(Parser)]
#[command(name = "reinsurance_pricing")]
#[command(about = "Burn cost projection for reinsurance treaty layers", long_about = None)]
#[command(version)]
struct Cli {
    /// Claims CSV, one row per claim per development period
    #[arg(long)]
    claims: PathBuf,

    /// Exposures CSV
    #[arg(long)]
    exposures: PathBuf,

    /// Contract JSON with metadata and layers
    #[arg(long)]
    contract: PathBuf,

    /// Trend factor CSV (year,claim_factor,exposure_factor)
    #[arg(long)]
    trend: Option<PathBuf>,

    /// Year claims and exposures are trended to
    #[arg(long)]
    base_year: i32,

    /// Date exposures are earned to (YYYY-MM-DD)
    #[arg(long)]
    analysis_date: NaiveDate,

    /// Restrict output to one layer
    #[arg(long)]
    layer: Option<u32>,

    /// Projection method applied to every year
    #[arg(long, default_value = "cape-cod")]
    method: ProjectionMethod,

    /// Generalised Cape Cod decay rate
    #[arg(long, default_value_t = 0.1)]
    decay: f64,

    /// Develop paid rather than incurred
    #[arg(long)]
    paid: bool,

    /// Fail on years missing from the trend factor file
    #[arg(long)]
    strict_trend: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

/// Projection results for one layer
#[derive(Debug, Serialize)]
struct LayerReport {
    layer_id: u32,
    layer_name: String,
    method: ProjectionMethod,
    development_factors: BTreeMap<i32, f64>,
    ultimates: BTreeMap<i32, f64>,
    burn_cost: BTreeMap<i32, f64>,
    weighted_burn_cost: Option<f64>,
    ibner_pattern: BTreeMap<u32, Option<f64>>,
    #[serde(skip)]
    triangle: Triangle,
}

fn layer_report(
    model: &ExperienceModel,
    layer_id: u32,
    assumptions: ModellingAssumptions,
    value: TriangleValue,
) -> reinsurance_pricing::Result<LayerReport> {
    let burn_model = model.developed_burn_cost_model(layer_id, assumptions, value, AverageMethod::VolumeWeighted)?;
    let development_factors = burn_model
        .modelling_years()
        .into_iter()
        .map(|year| (year, burn_model.selection(year).development_factor))
        .collect();
    let layer_name = model
        .contract()
        .layer(layer_id)
        .map(|layer| layer.layer_name.clone())
        .unwrap_or_default();

    Ok(LayerReport {
        layer_id,
        layer_name,
        method: assumptions.method,
        development_factors,
        ultimates: burn_model.calculate_ultimates(),
        burn_cost: burn_model.calculate_burn_cost(),
        weighted_burn_cost: burn_model.weighted_burn_cost(),
        ibner_pattern: model.ibner(layer_id)?.ibner_pattern(),
        triangle: model.triangle(layer_id, value)?,
    })
}

fn print_report(report: &LayerReport) {
    println!("Layer {}: {} ({})", report.layer_id, report.layer_name, report.method);
    println!("{}", "-".repeat(60));
    println!("{}", report.triangle);

    println!("{:>6} {:>12} {:>16} {:>12}", "Year", "Dev Factor", "Ultimate", "Burn Cost");
    for (year, ultimate) in &report.ultimates {
        let factor = report.development_factors.get(year).copied().unwrap_or(1.0);
        match report.burn_cost.get(year) {
            Some(burn_cost) => println!("{:>6} {:>12.4} {:>16.2} {:>12.6}", year, factor, ultimate, burn_cost),
            None => println!("{:>6} {:>12.4} {:>16.2} {:>12}", year, factor, ultimate, "n/a"),
        }
    }
    match report.weighted_burn_cost {
        Some(weighted) => println!("Weighted burn cost: {:.6}", weighted),
        None => println!("Weighted burn cost: n/a"),
    }
    println!();
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    let claims = load_claims(&cli.claims)?;
    let exposures = load_exposures(&cli.exposures)?;
    let contract = load_contract(&cli.contract)?;
    let (claim_factors, exposure_factors) = match &cli.trend {
        Some(path) => load_trend_factors(path)?,
        None => (YearlyFactors::new(), YearlyFactors::new()),
    };

    let lookup = if cli.strict_trend { TrendLookup::Strict } else { TrendLookup::Lenient };
    let trending = Trending::new(claim_factors, exposure_factors, cli.base_year).with_lookup(lookup);

    let model = ExperienceModel::new(contract, &claims, &exposures, trending, cli.analysis_date)
        .context("running experience pipeline")?;

    let layer_ids = match cli.layer {
        Some(layer_id) if model.layer_ids().contains(&layer_id) => vec![layer_id],
        Some(layer_id) => bail!("contract has no layer {}", layer_id),
        None => model.layer_ids(),
    };

    let assumptions = ModellingAssumptions {
        method: cli.method,
        cape_cod_decay: cli.decay,
        ..ModellingAssumptions::default()
    };
    let value = if cli.paid { TriangleValue::Paid } else { TriangleValue::Incurred };

    // Layers are independent
    let reports = layer_ids
        .par_iter()
        .map(|&layer_id| layer_report(&model, layer_id, assumptions, value))
        .collect::<reinsurance_pricing::Result<Vec<_>>>()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("Contract {} ({} layers)", model.contract().contract_id(), reports.len());
        println!();
        for report in &reports {
            print_report(report);
        }
    }

    log::info!("Completed {} layers in {:?}", reports.len(), start.elapsed());
    Ok(())
}
