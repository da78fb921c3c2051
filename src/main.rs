use clap::{Parser, Subcommand};

mod cmd;
mod fifo;
mod fy;
mod splits;
mod trades;
mod utils;

#[derive(Parser, Debug)]
#[command(name = "capgains")]
#[command(version, about = "Compute capital gains using FIFO per-ticker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Match the financial year's sales and write per-sale gains
    Report(cmd::report::ReportCommand),
    /// Show lots still open after matching
    Holdings(cmd::holdings::HoldingsCommand),
    /// List sales that could not be matched against prior purchases
    Validate(cmd::validate::ValidateCommand),
}

fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Report(report) => report.exec(),
        Commands::Holdings(holdings) => holdings.exec(),
        Commands::Validate(validate) => validate.exec(),
    }
}

/// Diagnostics go to stderr at `info` unless RUST_LOG says otherwise
fn init_logger() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}
