//! `dlab export` command - CSV export for accounting and audits

use clap::ValueEnum;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use crate::cli::helpers::Session;
use crate::cli::output::confirm;
use crate::cli::GlobalOpts;
use crate::core::export;
use crate::entities::invoice::Invoice;
use crate::entities::worksheet::Worksheet;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportKind {
    /// One row per invoice with totals
    Invoices,
    /// One row per worksheet
    Worksheets,
    /// One row per lot consumption (material traceability)
    Consumptions,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// What to export
    pub kind: ExportKind,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path).into_diagnostic()?;
            write(&session, args.kind, BufWriter::new(file))?;
            confirm(global.quiet, format!("Exported to {}", path.display()));
        }
        None => write(&session, args.kind, io::stdout().lock())?,
    }
    Ok(())
}

fn write<W: io::Write>(session: &Session, kind: ExportKind, out: W) -> Result<()> {
    match kind {
        ExportKind::Invoices => {
            let mut invoices: Vec<Invoice> = session.load_all()?;
            invoices.sort_by(|a, b| a.number.cmp(&b.number).then(a.created.cmp(&b.created)));
            export::write_invoices(out, &invoices).into_diagnostic()
        }
        ExportKind::Worksheets => {
            let mut worksheets: Vec<Worksheet> = session.load_all()?;
            worksheets.sort_by(|a, b| a.created.cmp(&b.created));
            export::write_worksheets(out, &worksheets).into_diagnostic()
        }
        ExportKind::Consumptions => {
            let mut worksheets: Vec<Worksheet> = session.load_all()?;
            worksheets.sort_by(|a, b| a.created.cmp(&b.created));
            export::write_consumptions(out, &worksheets).into_diagnostic()
        }
    }
}
