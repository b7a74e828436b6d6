//! Receivables report

use miette::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{today, Session};
use crate::cli::GlobalOpts;
use crate::core::report::receivables;
use crate::entities::dentist::Dentist;
use crate::entities::invoice::{Invoice, InvoiceStatus};

use super::write_output;

#[derive(clap::Args, Debug)]
pub struct ReceivablesArgs {
    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: ReceivablesArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let today = today();

    let mut invoices: Vec<Invoice> = session
        .load_all::<Invoice>()?
        .into_iter()
        .filter(|i| i.status == InvoiceStatus::Issued)
        .collect();
    invoices.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    let dentists: HashMap<_, String> = session
        .load_all::<Dentist>()?
        .into_iter()
        .map(|d| (d.id, d.title))
        .collect();

    let mut output = String::new();
    output.push_str("# Receivables\n\n");
    output.push_str(&format!("Date: {}\n\n", today));

    if invoices.is_empty() {
        output.push_str("No unpaid invoices.\n");
        return write_output(&output, args.output);
    }

    let mut table = Builder::default();
    table.push_record(["Number", "Dentist", "Issued", "Due", "Total", "Overdue"]);
    for inv in &invoices {
        table.push_record([
            inv.reference(),
            dentists.get(&inv.dentist).cloned().unwrap_or_default(),
            inv.issue_date.map(|d| d.to_string()).unwrap_or_default(),
            inv.due_date.map(|d| d.to_string()).unwrap_or_default(),
            format!("{:.2} {}", inv.totals().total, inv.currency),
            if inv.is_overdue(today) { "yes".to_string() } else { String::new() },
        ]);
    }
    output.push_str(&table.build().with(Style::markdown()).to_string());
    output.push('\n');

    output.push_str("\n## Outstanding\n\n");
    for (currency, sum) in receivables(&invoices) {
        output.push_str(&format!("- {:.2} {}\n", sum, currency));
    }

    write_output(&output, args.output)
}
