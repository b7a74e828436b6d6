//! Table and record output for CLI list/show commands
//!
//! List commands build [`TableRow`]s and hand them to a [`TableFormatter`],
//! which prints TSV (coloured when on a terminal), CSV, Markdown or bare ids.
//! YAML and JSON print the full records through [`print_records`].

use chrono::{DateTime, Local, NaiveDate, Utc};
use console::style;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::core::lab::Lab;
use crate::core::shortid::ShortIdIndex;

/// A typed cell value
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Entity id, cyan
    Id(String),
    Text(String),
    /// Status word, coloured by its meaning
    Status(String),
    /// Amount with two decimals, right aligned
    Money(Decimal),
    Quantity(Decimal),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Number(i64),
    /// Shown highlighted when true
    Flag(bool),
    Empty,
}

impl CellValue {
    pub fn opt_text(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => CellValue::Text(v.to_string()),
            _ => CellValue::Empty,
        }
    }

    pub fn opt_date(value: Option<NaiveDate>) -> Self {
        value.map(CellValue::Date).unwrap_or(CellValue::Empty)
    }

    /// Plain text, no colour
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(s) | CellValue::Text(s) | CellValue::Status(s) => s.clone(),
            CellValue::Money(d) => format!("{:.2}", d),
            CellValue::Quantity(d) => d.normalize().to_string(),
            CellValue::Date(d) => d.to_string(),
            CellValue::DateTime(dt) => dt
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Flag(b) => if *b { "yes" } else { "no" }.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    fn display_width(&self) -> usize {
        match self {
            CellValue::Empty => 1,
            other => other.raw().chars().count(),
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            CellValue::Money(_) | CellValue::Quantity(_) | CellValue::Number(_)
        )
    }

    /// Padded, coloured cell for terminal output
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => format!("{:<width$}", style(id).cyan(), width = width),
            CellValue::Text(s) => {
                format!("{:<width$}", truncate_str(s, width), width = width)
            }
            CellValue::Status(s) => {
                let styled = match s.as_str() {
                    "draft" | "open" => style(s).dim(),
                    "in_production" | "qc_pending" | "issued" | "expiring" => style(s).yellow(),
                    "qc_approved" | "delivered" | "paid" | "pass" | "available" | "closed" => {
                        style(s).green()
                    }
                    "qc_rejected" | "fail" | "expired" | "quarantined" => style(s).red().bold(),
                    "cancelled" | "voided" | "depleted" => style(s).red().dim(),
                    _ => style(s).white(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Flag(true) => format!("{:<width$}", style("yes").red().bold(), width = width),
            CellValue::Flag(false) => format!("{:<width$}", style("no").dim(), width = width),
            CellValue::Empty => format!("{:<width$}", "-", width = width),
            other if other.is_numeric() => format!("{:>width$}", other.raw(), width = width),
            other => format!("{:<width$}", other.raw(), width = width),
        }
    }

    pub fn format_csv(&self) -> String {
        escape_csv(&self.raw())
    }

    pub fn format_md(&self) -> String {
        match self {
            CellValue::Empty => "-".to_string(),
            other => other.raw().replace('|', "\\|"),
        }
    }
}

/// Column definition: row key, header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// One record in a listing
pub struct TableRow {
    pub short_id: String,
    pub full_id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(id: &EntityId, short_ids: &ShortIdIndex) -> Self {
        Self {
            short_id: short_ids.label(id),
            full_id: id.to_string(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Prints rows in the requested format
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    show_summary: bool,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            show_summary: true,
        }
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.show_summary = !quiet;
        self
    }

    pub fn output(&self, rows: Vec<TableRow>, format: OutputFormat) {
        match format {
            OutputFormat::Csv => self.output_csv(&rows),
            OutputFormat::Md => self.output_md(&rows),
            OutputFormat::Id => {
                for row in &rows {
                    println!("{}", row.full_id);
                }
            }
            _ => self.output_tsv(&rows),
        }
    }

    fn widths(&self, rows: &[TableRow]) -> Vec<usize> {
        let mut widths = vec![rows
            .iter()
            .map(|r| r.short_id.len())
            .max()
            .unwrap_or(0)
            .max(5)];
        for col in self.columns {
            let content = rows
                .iter()
                .filter_map(|r| r.get(col.key))
                .map(CellValue::display_width)
                .max()
                .unwrap_or(0);
            widths.push(col.header.len().max(content).min(col.width));
        }
        widths
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let widths = self.widths(rows);

        let mut header = vec![format!(
            "{:<width$}",
            style("SHORT").bold().dim(),
            width = widths[0]
        )];
        for (col, w) in self.columns.iter().zip(&widths[1..]) {
            header.push(format!("{:<width$}", style(col.header).bold(), width = *w));
        }
        println!("{}", header.join(" "));
        let total: usize = widths.iter().sum::<usize>() + widths.len() - 1;
        println!("{}", "-".repeat(total));

        for row in rows {
            let mut parts = vec![format!(
                "{:<width$}",
                style(&row.short_id).cyan(),
                width = widths[0]
            )];
            for (col, w) in self.columns.iter().zip(&widths[1..]) {
                parts.push(match row.get(col.key) {
                    Some(value) => value.format_tsv(*w),
                    None => format!("{:<width$}", "-", width = *w),
                });
            }
            println!("{}", parts.join(" "));
        }

        if self.show_summary {
            println!();
            println!(
                "{} {}(s) found. Use {} to reference by short ID.",
                style(rows.len()).cyan(),
                self.entity_name,
                style("@N").cyan()
            );
        }
    }

    fn output_csv(&self, rows: &[TableRow]) {
        let mut headers = vec!["short_id", "id"];
        headers.extend(self.columns.iter().map(|c| c.key));
        println!("{}", headers.join(","));

        for row in rows {
            let mut values = vec![escape_csv(&row.short_id), escape_csv(&row.full_id)];
            for col in self.columns {
                values.push(row.get(col.key).map(CellValue::format_csv).unwrap_or_default());
            }
            println!("{}", values.join(","));
        }
    }

    fn output_md(&self, rows: &[TableRow]) {
        let mut headers = vec!["Short", "ID"];
        headers.extend(self.columns.iter().map(|c| c.header));
        println!("| {} |", headers.join(" | "));
        println!("|{}|", vec!["---"; headers.len()].join("|"));

        for row in rows {
            let mut values = vec![row.short_id.clone(), row.full_id.clone()];
            for col in self.columns {
                values.push(
                    row.get(col.key)
                        .map(CellValue::format_md)
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
            println!("| {} |", values.join(" | "));
        }
    }
}

/// Replace the short-ID index with the ids of a fresh listing
pub fn index_listing<'e, T: Entity + 'e>(
    lab: &Lab,
    entities: impl IntoIterator<Item = &'e T>,
) -> ShortIdIndex {
    let mut index = ShortIdIndex::load(lab);
    index.record_listing(T::PREFIX, entities.into_iter().map(|e| e.id().clone()));
    if let Err(e) = index.save(lab) {
        tracing::warn!("could not save short id index: {}", e);
    }
    index
}

/// Print whole records as YAML or JSON
pub fn print_records<T: Serialize>(records: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(records).into_diagnostic()?);
        }
        _ => {
            print!("{}", serde_yml::to_string(records).into_diagnostic()?);
        }
    }
    Ok(())
}

/// Whether a listing should print full records instead of a table
pub fn wants_records(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Yaml | OutputFormat::Json)
}

/// Report a newly created record: just the id for `-f id`, otherwise a summary line
pub fn print_created<T: Entity>(global: &GlobalOpts, lab: &Lab, entity: &T, path: &Path) {
    if global.format == OutputFormat::Id {
        println!("{}", entity.id());
        return;
    }
    let mut index = ShortIdIndex::load(lab);
    let short = index.add(entity.id());
    if let Err(e) = index.save(lab) {
        tracing::warn!("could not save short id index: {}", e);
    }
    if !global.quiet {
        println!(
            "{} Created {} {} {}",
            style("✓").green(),
            T::NAME,
            style(format!("@{}", short)).cyan(),
            style(entity.id()).dim()
        );
        println!("   {}", style(lab.relative(path).display()).dim());
        println!("   {}", entity.title());
    }
}

/// Labelled line in a `show` view
pub fn field(label: &str, value: impl std::fmt::Display) {
    if label.is_empty() {
        println!("{:<14} {}", "", value);
    } else {
        println!("{:<14} {}", style(format!("{}:", label)).bold(), value);
    }
}

pub fn rule() {
    println!("{}", style("─".repeat(60)).dim());
}

/// Print a one-line confirmation unless `-q` was given
pub fn confirm(quiet: bool, message: impl std::fmt::Display) {
    if !quiet {
        println!("{} {}", style("✓").green(), message);
    }
}
