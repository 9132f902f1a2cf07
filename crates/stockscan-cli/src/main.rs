mod commands;
mod logging;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use stockscan_core::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(
    name = "stockscan",
    version,
    about = "Extract stock lists from emailed spreadsheets into a priced inventory report"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch recent mail, extract every Excel attachment and write Report.xlsx
    Run {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
    /// Run header detection and row extraction on a local workbook
    Extract {
        /// Path to an .xlsx or .xls file
        input_file: PathBuf,

        /// Barcode column header (skips the oracle when any label is given)
        #[arg(long, value_name = "LABEL")]
        barcode: Option<String>,

        /// Quantity column header
        #[arg(long, value_name = "LABEL")]
        quantity: Option<String>,

        /// Product description column header
        #[arg(long, value_name = "LABEL")]
        product: Option<String>,

        /// Unit price column header
        #[arg(long, value_name = "LABEL")]
        price: Option<String>,

        /// Configuration file (needed for the oracle)
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a configuration file and list missing secrets
    Check {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config } => commands::run::run(&config),
        Commands::Extract {
            input_file,
            barcode,
            quantity,
            product,
            price,
            config,
            output,
        } => commands::extract::run(
            input_file,
            commands::extract::LabelArgs {
                barcode,
                quantity,
                product,
                price,
            },
            &config,
            &output,
        ),
        Commands::Config { action } => match action {
            ConfigAction::Check { config } => commands::config::check(&config),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
