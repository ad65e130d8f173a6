//! Command handlers behind the CLI. Each loads the input table, runs the
//! pipeline and renders the result.

use anyhow::{Context, Result, bail};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    amount::normalize_amount,
    classify::{ColumnProfile, TypeVerdict},
    cli::{AggregateArgs, InputArgs, NormalizeArgs, PreviewArgs, ProbeArgs, QueryArgs},
    config::NormalizerConfig,
    date::normalize_date,
    io_utils,
    pipeline::{NormalizedColumn, NormalizedTable, Pipeline, Slot, TypedValue},
    render::{Align, print_table},
    store::FinancialStore,
    table::Table,
};

fn load_input(args: &InputArgs) -> Result<(Table, Pipeline)> {
    let config = NormalizerConfig::load_or_default(args.config.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Loading '{}' with delimiter '{}'",
        args.input.display(),
        io_utils::printable_delimiter(delimiter)
    );
    let mut table = Table::from_csv_path(&args.input, delimiter, encoding)
        .with_context(|| format!("Loading table from {:?}", args.input))?;
    if !args.keep_empty {
        let dropped = table.drop_all_null_columns();
        if !dropped.is_empty() {
            debug!("Dropped empty column(s): {}", dropped.join(", "));
        }
    }
    Ok((table, Pipeline::new(config)))
}

fn header_row(table: &NormalizedTable) -> Vec<String> {
    table.columns.iter().map(|c| c.name.clone()).collect()
}

fn rendered_row(table: &NormalizedTable, row: usize) -> Vec<String> {
    table
        .columns
        .iter()
        .map(|c| c.values.rendered(row).unwrap_or_default())
        .collect()
}

fn column_aligns(table: &NormalizedTable) -> Vec<Align> {
    table
        .columns
        .iter()
        .map(|c| Align::from(c.values.verdict()))
        .collect()
}

#[derive(Debug, Serialize)]
struct ProbeEntry<'a> {
    column: &'a str,
    verdict: TypeVerdict,
    forced: bool,
    /// Every sampled value has the shape of a spreadsheet serial date.
    serial_like: bool,
    profile: ColumnProfile,
}

pub fn probe(args: &ProbeArgs) -> Result<()> {
    let (table, pipeline) = load_input(&args.input)?;
    let config = pipeline.classifier().config();
    let entries: Vec<ProbeEntry<'_>> = table
        .columns
        .iter()
        .map(|column| {
            let profile = pipeline.classifier().profile(&column.cells);
            let forced = config.forced_verdict(&column.name);
            let verdict = forced.unwrap_or(profile.verdict);
            ProbeEntry {
                column: &column.name,
                verdict,
                forced: forced.is_some(),
                serial_like: forced.is_none()
                    && verdict == TypeVerdict::Number
                    && pipeline.classifier().serial_like(&column.cells),
                profile,
            }
        })
        .collect();

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&entries).context("Serializing probe results")?;
        println!("{rendered}");
    } else if entries.is_empty() {
        println!("No columns found.");
    } else {
        let headers = ["column", "verdict", "sampled", "date %", "number %"]
            .map(String::from)
            .to_vec();
        let rows: Vec<Vec<String>> = entries
            .iter()
            .map(|entry| {
                let verdict = if entry.forced {
                    format!("{} (forced)", entry.verdict)
                } else {
                    entry.verdict.to_string()
                };
                vec![
                    entry.column.to_string(),
                    verdict,
                    entry.profile.sampled.to_string(),
                    percent(Some(entry.profile.date_ratio())),
                    percent(entry.profile.number_ratio()),
                ]
            })
            .collect();
        print_table(
            &headers,
            &rows,
            &[Align::Left, Align::Left, Align::Right, Align::Right, Align::Right],
        );
        for entry in entries.iter().filter(|entry| entry.serial_like) {
            println!(
                "hint: '{0}' looks like spreadsheet serial dates; add `overrides: {{\"{0}\": date}}` to the config to read it as dates",
                entry.column
            );
        }
    }
    info!("Classified {} column(s) of '{}'", entries.len(), table.name);
    Ok(())
}

fn percent(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| "-".to_string(), |r| format!("{:.1}", r * 100.0))
}

pub fn normalize(args: &NormalizeArgs) -> Result<()> {
    let (table, pipeline) = load_input(&args.input)?;
    let normalized = pipeline.normalize_table(&table);
    let delimiter = io_utils::resolve_input_delimiter(&args.input.input, args.input.delimiter);

    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), delimiter)?;
    writer
        .write_record(header_row(&normalized))
        .context("Writing output headers")?;
    for row in 0..normalized.row_count() {
        writer
            .write_record(rendered_row(&normalized, row))
            .with_context(|| format!("Writing output row {}", row + 2))?;
    }
    writer.flush().context("Flushing normalized output")?;

    let failure_count = normalized.failure_count();
    if let Some(path) = &args.failures {
        let mut ledger = io_utils::open_csv_writer(Some(path), b',')?;
        ledger.write_record(["row", "column", "kind", "raw"])?;
        for column in &normalized.columns {
            for (row, failure) in column.values.failures() {
                ledger.write_record([
                    (row + 1).to_string(),
                    column.name.clone(),
                    failure.kind().to_string(),
                    failure.raw().unwrap_or_default().to_string(),
                ])?;
            }
        }
        ledger.flush().context("Flushing failure ledger")?;
        info!("Failure ledger written to {path:?}");
    }

    if failure_count > 0 {
        warn!(
            "{failure_count} cell(s) of '{}' could not be normalized",
            normalized.name
        );
    }
    info!(
        "Normalized {} row(s) across {} column(s)",
        normalized.row_count(),
        normalized.columns.len()
    );
    Ok(())
}

pub fn preview(args: &PreviewArgs) -> Result<()> {
    let (table, pipeline) = load_input(&args.input)?;
    let normalized = pipeline.normalize_table(&table);
    let shown = args.rows.min(normalized.row_count());

    let headers = ["row", "column", "type", "raw", "normalized"]
        .map(String::from)
        .to_vec();
    let rows: Vec<Vec<String>> = (0..shown)
        .cartesian_product(table.columns.iter().zip(&normalized.columns))
        .map(|(row, (raw, column))| {
            let raw_text = raw.cells[row].clone().unwrap_or_default();
            let shown_value = match column.values.typed_slot(row) {
                None | Some(Slot::Missing) => column.values.rendered(row).unwrap_or_default(),
                Some(Slot::Value(value)) => value.render(),
                Some(Slot::Failed(failure)) => format!("<{}>", failure.kind()),
            };
            vec![
                (row + 1).to_string(),
                column.name.clone(),
                column.values.verdict().to_string(),
                raw_text,
                shown_value,
            ]
        })
        .collect();

    let (row_count, column_count) = table.shape();
    println!("{}: {row_count} row(s) x {column_count} column(s)", table.name);
    print_table(&headers, &rows, &[Align::Right]);
    Ok(())
}

fn parse_bound(column: &NormalizedColumn, text: &str) -> Result<TypedValue> {
    let bound = match column {
        NormalizedColumn::Amounts(_) => TypedValue::Amount(normalize_amount(text)?),
        NormalizedColumn::Timestamps(_) => TypedValue::Timestamp(normalize_date(text)?),
        NormalizedColumn::Text(_) => bail!("Range queries need a date or number column"),
    };
    Ok(bound)
}

pub fn query(args: &QueryArgs) -> Result<()> {
    let (table, pipeline) = load_input(&args.input)?;
    let mut store = FinancialStore::new();
    let name = table.name.clone();
    store.add_dataset(pipeline.normalize_table(&table));
    let dataset = store.dataset(&name)?;

    let column = dataset
        .column(&args.column)
        .with_context(|| format!("Column '{}' not found", args.column))?;
    let start = parse_bound(column, &args.from).context("Parsing --from")?;
    let end = parse_bound(column, &args.to).context("Parsing --to")?;

    let matches = store.query_range(&name, &args.column, start, end)?;
    let rows: Vec<Vec<String>> = matches
        .iter()
        .map(|row| rendered_row(dataset, *row))
        .collect();
    print_table(&header_row(dataset), &rows, &column_aligns(dataset));
    info!(
        "{} of {} row(s) matched {} in [{}, {}]",
        matches.len(),
        dataset.row_count(),
        args.column,
        start.render(),
        end.render()
    );
    Ok(())
}

pub fn aggregate(args: &AggregateArgs) -> Result<()> {
    let (table, pipeline) = load_input(&args.input)?;
    let mut store = FinancialStore::new();
    let name = table.name.clone();
    store.add_dataset(pipeline.normalize_table(&table));

    let groups = store.aggregate(&name, &args.group_by, &args.sum)?;
    let headers = vec![args.group_by.clone(), args.sum.clone(), "rows".to_string()];
    let rows: Vec<Vec<String>> = groups
        .iter()
        .map(|group| {
            vec![
                group.key.clone(),
                group.total.to_string(),
                group.rows.to_string(),
            ]
        })
        .collect();
    print_table(&headers, &rows, &[Align::Left, Align::Right, Align::Right]);
    info!("Aggregated {} group(s)", groups.len());
    Ok(())
}
