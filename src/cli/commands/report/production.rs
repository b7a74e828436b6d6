//! Production report

use miette::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{today, truncate_str, Session};
use crate::cli::GlobalOpts;
use crate::core::report::production_report;
use crate::entities::dentist::Dentist;
use crate::entities::worksheet::Worksheet;

use super::write_output;

#[derive(clap::Args, Debug)]
pub struct ProductionArgs {
    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: ProductionArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let today = today();

    let worksheets: Vec<Worksheet> = session.load_all()?;
    let dentists: HashMap<_, String> = session
        .load_all::<Dentist>()?
        .into_iter()
        .map(|d| (d.id, d.title))
        .collect();
    let report = production_report(&worksheets, today);
    let dentist_name = |ws: &Worksheet| {
        ws.dentist
            .as_ref()
            .and_then(|d| dentists.get(d).cloned())
            .unwrap_or_default()
    };

    let mut output = String::new();
    output.push_str("# Production Report\n\n");
    output.push_str(&format!("Date: {}\n\n", today));

    output.push_str("## Worksheets by Status\n\n");
    let mut summary = Builder::default();
    summary.push_record(["Status", "Count"]);
    for (status, count) in &report.by_status {
        summary.push_record([status.to_string(), count.to_string()]);
    }
    summary.push_record(["Total".to_string(), worksheets.len().to_string()]);
    output.push_str(&summary.build().with(Style::markdown()).to_string());
    output.push('\n');

    if !report.overdue.is_empty() {
        output.push_str("\n## Overdue\n\n");
        let mut overdue = Builder::default();
        overdue.push_record(["Worksheet", "Title", "Dentist", "Due", "Days Late", "Status"]);
        for ws in &report.overdue {
            let due = ws.due_date.unwrap_or(today);
            overdue.push_record([
                ws.id.short(),
                truncate_str(&ws.title, 40),
                dentist_name(ws),
                due.to_string(),
                (today - due).num_days().to_string(),
                ws.status.to_string(),
            ]);
        }
        output.push_str(&overdue.build().with(Style::markdown()).to_string());
        output.push('\n');
    }

    if !report.awaiting_invoice.is_empty() {
        output.push_str("\n## Delivered, Not Invoiced\n\n");
        let mut pending = Builder::default();
        pending.push_record(["Worksheet", "Title", "Dentist", "Delivered"]);
        for ws in &report.awaiting_invoice {
            pending.push_record([
                ws.id.short(),
                truncate_str(&ws.title, 40),
                dentist_name(ws),
                ws.delivered_at
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ]);
        }
        output.push_str(&pending.build().with(Style::markdown()).to_string());
        output.push('\n');
    }

    write_output(&output, args.output)
}
