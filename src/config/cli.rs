use crate::config::toml_config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "csv-refinery")]
#[command(about = "Clean scraped CSV exports into a normalized product file")]
#[command(version)]
pub struct CliConfig {
    /// Path to the TOML settings document
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Map, filter and enrich the input file into the output file
    Clean {
        /// Input CSV (overrides files.input_file)
        input: Option<PathBuf>,

        /// Output CSV (overrides files.output_file)
        output: Option<PathBuf>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the first rows of the output file
    Preview {
        /// Number of rows to show
        #[arg(short = 'n', long, default_value_t = 5)]
        rows: usize,
    },

    /// Show header listing and a sample of one column of the output file
    Stats {
        /// Column to sample (defaults to the first column)
        #[arg(long)]
        column: Option<String>,

        /// Number of values to sample
        #[arg(short = 'n', long, default_value_t = 10)]
        sample: usize,
    },

    /// Reset sequential counters past the largest id in an existing products file
    Maxid {
        /// Products CSV whose first column holds ids (overrides files.products_file)
        products: Option<PathBuf>,

        /// Sequential column to reset (defaults to all of them)
        #[arg(long)]
        key: Option<String>,
    },
}
