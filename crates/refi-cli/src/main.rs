mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::amortization::{PaymentArgs, RemainingBalanceArgs, ScheduleArgs};
use commands::refinance::{ExportSchedulesArgs, RefinanceArgs};

/// Environment variable holding a tracing filter directive, e.g. `refi_core=debug`.
const LOG_ENV: &str = "REFI_LOG";

/// Mortgage amortization and refinance economics
#[derive(Parser)]
#[command(
    name = "refi",
    version,
    about = "Mortgage amortization and refinance economics",
    long_about = "A CLI for fixed-rate mortgage math with decimal precision. Computes \
                  level payments, remaining balances and amortization schedules, and \
                  compares a current loan against a refinance offer: break-even, NPV of \
                  monthly savings, loan-to-value and side-by-side schedule export."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log debug detail to stderr (overridden by REFI_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Level periodic payment for a fixed-rate loan
    Payment(PaymentArgs),
    /// Outstanding balance after a number of payments
    RemainingBalance(RemainingBalanceArgs),
    /// Full amortization schedule, optionally with extra principal
    Schedule(ScheduleArgs),
    /// Compare a current loan against a refinance offer
    Refinance(RefinanceArgs),
    /// Write both schedules of a refinance comparison side by side as CSV
    ExportSchedules(ExportSchedulesArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Payment(args) => commands::amortization::run_payment(args),
        Commands::RemainingBalance(args) => commands::amortization::run_remaining_balance(args),
        Commands::Schedule(args) => commands::amortization::run_schedule(args),
        Commands::Refinance(args) => commands::refinance::run_refinance(args),
        Commands::ExportSchedules(args) => commands::refinance::run_export_schedules(args),
        Commands::Version => {
            println!("refi {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        // Already streamed to stdout (CSV export)
        Ok(serde_json::Value::Null) => process::exit(0),
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
