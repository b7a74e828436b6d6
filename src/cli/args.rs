//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    chart::ChartArgs, completions::CompletionsArgs, dentist::DentistCommands,
    doc::DocCommands, export::ExportArgs, init::InitArgs, invoice::InvoiceCommands,
    lot::LotCommands, material::MaterialCommands, order::OrderCommands,
    product::ProductCommands, qc::QcCommands, report::ReportCommands, team::TeamCommands,
    ws::WsCommands,
};

#[derive(Parser)]
#[command(name = "dlab")]
#[command(author, version, about = "Dental laboratory production toolkit")]
#[command(long_about = "Worksheets on an FDI tooth chart, FIFO material lots, QC sign-off, invoices and MDR Annex XIII statements, kept as plain-text records.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Lab root (default: auto-detect by finding .dlab/)
    #[arg(long, global = true)]
    pub lab: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new lab
    Init(InitArgs),

    /// Prescribing dentists
    #[command(subcommand)]
    Dentist(DentistCommands),

    /// Work orders received from dentists
    #[command(subcommand)]
    Order(OrderCommands),

    /// Production worksheets
    #[command(subcommand, visible_alias = "worksheet")]
    Ws(WsCommands),

    /// Render a worksheet's FDI tooth chart as SVG
    Chart(ChartArgs),

    /// Product catalog (billable restorations)
    #[command(subcommand)]
    Product(ProductCommands),

    /// Materials
    #[command(subcommand)]
    Material(MaterialCommands),

    /// Material lots (receiving, stock)
    #[command(subcommand)]
    Lot(LotCommands),

    /// Quality-control sign-off
    #[command(subcommand)]
    Qc(QcCommands),

    /// Invoices
    #[command(subcommand)]
    Invoice(InvoiceCommands),

    /// Generated documents (Annex XIII, invoice sheets, job cards)
    #[command(subcommand)]
    Doc(DocCommands),

    /// Team roster and roles
    #[command(subcommand)]
    Team(TeamCommands),

    /// Stock and production reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Export records as CSV
    Export(ExportArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}
