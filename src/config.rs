use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueHint};

use crate::comps::DEFAULT_LATENCY;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Loan, ROI and property tax comparison calculators", long_about = None)]
pub struct Args {
    /// Directory that CSV and text exports are written to
    #[arg(short, long, default_value = ".", value_hint = ValueHint::DirPath)]
    pub output_dir: PathBuf,

    /// Directory holding saved calculations (defaults to the platform data dir)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = "taxcompare.log", value_hint = ValueHint::FilePath)]
    pub log_file: PathBuf,

    /// Log level or filter directive; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Simulated latency of the comparable search, in milliseconds
    #[arg(long, default_value_t = DEFAULT_LATENCY.as_millis() as u64)]
    pub search_latency_ms: u64,
}

/// Resolved settings handed to the app.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub output_dir: PathBuf,
    pub data_dir: PathBuf,
    pub search_latency: Duration,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        let data_dir = args
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("taxcompare")))
            .unwrap_or_else(|| args.output_dir.clone());
        Self {
            output_dir: args.output_dir.clone(),
            data_dir,
            search_latency: Duration::from_millis(args.search_latency_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            data_dir: PathBuf::from("."),
            search_latency: DEFAULT_LATENCY,
        }
    }
}
