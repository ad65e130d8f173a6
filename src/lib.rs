//! Column type inference and value normalization for financial extracts.
//!
//! The core is four pieces that build on each other:
//!
//! - [`amount`]: one raw token to a signed magnitude (`"(1,234.50)"` → `-1234.5`),
//! - [`date`]: one raw token to a timestamp (serial days, `Q3-24`, free-form text),
//! - [`classify`]: a sample of a column to a [`classify::TypeVerdict`],
//! - [`pipeline`]: a classified column to an aligned typed column plus a
//!   failure ledger.
//!
//! [`table`] and [`store`] wrap the core with a CSV source and a small
//! in-memory store for range queries and group sums.

pub mod amount;
pub mod classify;
pub mod cli;
mod commands;
pub mod config;
pub mod date;
pub mod error;
pub mod io_utils;
pub mod pipeline;
pub mod render;
pub mod store;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    amount::normalize_amount,
    classify::{TypeVerdict, classify_column},
    date::normalize_date,
    error::ParseFailure,
    pipeline::{NormalizedColumn, normalize_column},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("ledger_typer", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => commands::probe(&args),
        Commands::Normalize(args) => commands::normalize(&args),
        Commands::Preview(args) => commands::preview(&args),
        Commands::Query(args) => commands::query(&args),
        Commands::Aggregate(args) => commands::aggregate(&args),
    }
}
