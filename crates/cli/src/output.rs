// Output rendering for the current page

use std::io::Write;

use clap::ValueEnum;
use plugtable_io::{IoError, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text columns
    #[default]
    Table,
    /// Array of objects keyed by header
    Json,
    Csv,
}

pub fn write_rows<W: Write>(
    format: OutputFormat,
    headers: &[String],
    rows: &[Record],
    out: &mut W,
) -> Result<(), IoError> {
    match format {
        OutputFormat::Table => write_table(headers, rows, out),
        OutputFormat::Json => {
            plugtable_io::json::write(headers, rows, &mut *out)?;
            writeln!(out)?;
            Ok(())
        }
        OutputFormat::Csv => plugtable_io::csv::write(headers, rows, out),
    }
}

/// Left-aligned text, numbers right-aligned
fn write_table<W: Write>(headers: &[String], rows: &[Record], out: &mut W) -> Result<(), IoError> {
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .map(|row| (0..headers.len()).map(|i| row.cell(i).to_string()).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rendered
                .iter()
                .map(|cells| cells[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect();
    writeln!(out, "{}", header_line.join("  ").trim_end())?;

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join("  "))?;

    for (row, cells) in rows.iter().zip(&rendered) {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (text, w))| {
                if row.cell(i).as_number().is_some() {
                    format!("{:>w$}", text, w = *w)
                } else {
                    format!("{:<w$}", text, w = *w)
                }
            })
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
    }
    Ok(())
}
