//! `dlab report` command - Stock, production and receivables reports

mod production;
mod receivables;
mod stock;

use clap::Subcommand;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::cli::GlobalOpts;

pub use production::ProductionArgs;
pub use receivables::ReceivablesArgs;
pub use stock::StockArgs;

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Stock per material with low-stock and expiry warnings
    Stock(StockArgs),

    /// Worksheets per status, overdue work and uninvoiced deliveries
    Production(ProductionArgs),

    /// Issued, unpaid invoices
    Receivables(ReceivablesArgs),
}

pub fn run(cmd: ReportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReportCommands::Stock(args) => stock::run(args, global),
        ReportCommands::Production(args) => production::run(args, global),
        ReportCommands::Receivables(args) => receivables::run(args, global),
    }
}

/// Write a report to a file, or print it
pub(crate) fn write_output(content: &str, output_path: Option<PathBuf>) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            println!("Report written to: {}", path.display());
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
