use anyhow::Result;
use prettytable::{Table, cell, format::consts::FORMAT_CLEAN, row};

use crate::Report;
use crate::settings::OutputFormat;

pub fn print(report: &Report, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Compact => print_compact(report),
    }
    Ok(())
}

fn print_compact(report: &Report) {
    let mut table = Table::new();
    table.set_format(*FORMAT_CLEAN);

    for path in &report.paths {
        table.add_row(row![r->"Path:", path.display()]);
    }
    table.add_row(row![r->"Files:", report.totals.count]);
    table.add_row(row![r->format!("Total {}:", report.property), report.totals.size]);
    table.add_row(row![r->"Batches:", report.batches]);
    table.add_row(row![r->"Cached entities:", report.cached_entities]);
    if !report.complete {
        table.add_row(row![r->"Status:", "interrupted, totals are partial"]);
    }

    table.printstd();
}
