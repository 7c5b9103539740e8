use crate::analyze::{run_analyze, AnalyzeArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use xpendit::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "xpendit",
    about = "Validate expenses against the reimbursement policy and reconcile historical batches",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate a historical expense CSV and report statuses and anomalies
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Analyze(args) => run_analyze(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_parses_flags() {
        let cli = Cli::try_parse_from([
            "xpendit-api",
            "analyze",
            "--csv",
            "gastos.csv",
            "--analysis-md",
            "out/ANALYSIS.md",
            "--today",
            "2025-06-30",
            "--json",
        ])
        .expect("arguments parse");

        let Some(Command::Analyze(args)) = cli.command else {
            panic!("expected analyze command");
        };
        assert_eq!(args.csv, std::path::PathBuf::from("gastos.csv"));
        assert!(args.json);
        assert_eq!(
            args.today,
            chrono::NaiveDate::from_ymd_opt(2025, 6, 30)
        );
    }

    #[test]
    fn serve_is_default() {
        let cli = Cli::try_parse_from(["xpendit-api"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
