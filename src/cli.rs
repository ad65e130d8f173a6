use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Infer column types and normalize amounts and dates in financial CSV extracts",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify every column as date, number or string and report the evidence
    Probe(ProbeArgs),
    /// Write a normalized copy of the input plus an optional failure ledger
    Normalize(NormalizeArgs),
    /// Show the first rows raw and normalized side by side
    Preview(PreviewArgs),
    /// List rows whose normalized value falls inside an inclusive range
    Query(QueryArgs),
    /// Sum an amount column per distinct value of another column
    Aggregate(AggregateArgs),
}

/// Options shared by every command that loads a table.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input CSV file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML file with sampling, threshold and per-column overrides
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Keep columns whose every cell is empty
    #[arg(long = "keep-empty")]
    pub keep_empty: bool,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Emit the column profiles as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Write every failed cell (row, column, kind, raw text) to this CSV file
    #[arg(long = "failures")]
    pub failures: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 5)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Date or amount column to filter on
    #[arg(long)]
    pub column: String,
    /// Inclusive lower bound, parsed like the column's values
    #[arg(long, allow_hyphen_values = true)]
    pub from: String,
    /// Inclusive upper bound, parsed like the column's values
    #[arg(long, allow_hyphen_values = true)]
    pub to: String,
}

#[derive(Debug, Args)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Column whose values define the groups
    #[arg(long = "group-by")]
    pub group_by: String,
    /// Amount column to sum
    #[arg(long)]
    pub sum: String,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
