use crate::infra::load_policy;
use crate::report::render_markdown;
use chrono::{Local, NaiveDate};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::info;
use xpendit::config::{AppConfig, RatesConfig};
use xpendit::error::AppError;
use xpendit::telemetry;
use xpendit::workflows::expenses::{
    BatchPipeline, BatchReport, ExpenseCsvSource, ExpenseStatus, OpenExchangeRatesClient,
    PolicyEngine, RateResolver,
};

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// Historical expense CSV export
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Write a Markdown analysis to this path
    #[arg(long)]
    pub(crate) analysis_md: Option<PathBuf>,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the full batch report as JSON instead of the summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let AnalyzeArgs {
        csv,
        analysis_md,
        today,
        json,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let policy = load_policy(&config)?;
    let pipeline = BatchPipeline::new(PolicyEngine::new(policy));
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let batch = ExpenseCsvSource::from_path(&csv)?;
    info!(
        path = %csv.display(),
        expenses = batch.expenses.len(),
        skipped = batch.skipped.len(),
        "loaded expense batch"
    );

    let resolver = rate_resolver(&config.rates)?;
    let report = pipeline.run(&batch, resolver.as_ref(), today).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if let Some(path) = analysis_md {
        write_analysis(&path, &report)?;
        if !json {
            println!("\nAnalysis written to {}", path.display());
        }
    }

    Ok(())
}

/// Resolver for the configured credential. Without one the pipeline warns only
/// when the batch actually needs conversions.
fn rate_resolver(
    config: &RatesConfig,
) -> Result<Option<RateResolver<OpenExchangeRatesClient>>, AppError> {
    let resolver = OpenExchangeRatesClient::from_config(config)?.map(|client| {
        RateResolver::new(client).with_limits(config.max_concurrency, config.timeout)
    });
    Ok(resolver)
}

fn print_summary(report: &BatchReport) {
    println!("Expense batch analysis ({})", report.evaluated_on);
    println!(
        "- {} expenses evaluated | {} rows skipped",
        report.total_expenses,
        report.skipped_rows.len()
    );
    for status in ExpenseStatus::ordered() {
        println!("- {}: {}", status.label(), report.status_counts.get(status));
    }
    println!(
        "- Anomalies: {} duplicate groups | {} negative amounts",
        report.duplicate_groups.len(),
        report.negative_ids.len()
    );
    println!(
        "- Rates: {} non-{} expenses over {} dates | {} lookups | {} failed",
        report.non_base_expenses,
        report.base_currency,
        report.non_base_dates,
        report.rate_lookups,
        report.failed_rate_dates.len()
    );
    for skipped in &report.skipped_rows {
        let line = skipped
            .line
            .map(|line| line.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!("  skipped line {}: {}", line, skipped.reason);
    }
}

fn write_analysis(path: &Path, report: &BatchReport) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_markdown(report))?;
    Ok(())
}
