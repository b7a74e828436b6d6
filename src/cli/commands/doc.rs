//! `dlab doc` command - Generated documents

use clap::Subcommand;
use console::style;
use miette::{bail, IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::Session;
use crate::cli::output::{
    confirm, field, index_listing, print_created, print_records, rule, wants_records, CellValue,
    ColumnDef, TableFormatter, TableRow,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::documents::Documents;
use crate::entities::document::{Document, DocumentFormat};
use crate::entities::invoice::Invoice;
use crate::entities::worksheet::Worksheet;

#[derive(Subcommand, Debug)]
pub enum DocCommands {
    /// Generate the MDR Annex XIII statement for an approved worksheet
    Annex(AnnexArgs),

    /// Render an invoice as markdown
    Invoice(InvoiceArgs),

    /// Render a worksheet job card with its tooth chart
    Card(WsArgs),

    /// List generated documents
    List(ListArgs),

    /// Show a document record
    Show(IdArgs),

    /// Check rendered files against their recorded checksums
    Verify(VerifyArgs),
}

#[derive(clap::Args, Debug)]
pub struct AnnexArgs {
    /// Worksheet ID or short ID (@N)
    pub ws: String,

    #[arg(long, value_enum, default_value = "markdown")]
    pub format: DocumentFormat,

    /// General safety and performance requirement not fully met, with reason (repeatable)
    #[arg(long = "gspr-exception")]
    pub gspr_exceptions: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct InvoiceArgs {
    /// Invoice ID, short ID (@N) or number
    pub id: String,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct WsArgs {
    /// Worksheet ID or short ID (@N)
    pub ws: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only documents for this worksheet
    #[arg(long, short = 'w')]
    pub ws: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Document ID or short ID (@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Document to verify (default: all)
    pub id: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("kind", "KIND", 10),
    ColumnDef::new("worksheet", "WORKSHEET", 16),
    ColumnDef::new("format", "FORMAT", 8),
    ColumnDef::new("file", "FILE", 48),
    ColumnDef::new("generated", "GENERATED", 16),
];

pub fn run(cmd: DocCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DocCommands::Annex(args) => run_annex(args, global),
        DocCommands::Invoice(args) => run_invoice(args, global),
        DocCommands::Card(args) => run_card(args, global),
        DocCommands::List(args) => run_list(args, global),
        DocCommands::Show(args) => run_show(args, global),
        DocCommands::Verify(args) => run_verify(args, global),
    }
}

fn documents(session: &Session) -> Result<Documents<'_>> {
    Documents::open(&session.lab).map_err(|e| miette::miette!("{}", e))
}

fn run_annex(args: AnnexArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut ws: Worksheet = session.find(&args.ws)?;
    let previous = ws.annex_xiii.clone();

    let doc = documents(&session)?
        .annex_xiii(
            &mut ws,
            args.format,
            args.gspr_exceptions,
            &session.config.author(),
        )
        .map_err(|e| miette::miette!("{}", e))?;

    let path = session.lab.root().join(&doc.file);
    print_created(global, &session.lab, &doc, &path);
    if let (Some(prev), false) = (previous, global.quiet) {
        println!(
            "   supersedes {} (kept for the record)",
            style(prev.short()).dim()
        );
    }
    Ok(())
}

fn run_invoice(args: InvoiceArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let invoice: Invoice = session.find(&args.id)?;

    let sheet = documents(&session)?
        .invoice_sheet(&invoice)
        .map_err(|e| miette::miette!("{}", e))?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, sheet).into_diagnostic()?;
            confirm(global.quiet, format!("Wrote {}", path.display()));
        }
        None => print!("{}", sheet),
    }
    Ok(())
}

fn run_card(args: WsArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let ws: Worksheet = session.find(&args.ws)?;
    let (_, path) = documents(&session)?
        .worksheet_card(&ws)
        .map_err(|e| miette::miette!("{}", e))?;
    confirm(
        global.quiet,
        format!("Wrote {}", session.lab.relative(&path).display()),
    );
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let format = session.format(global);

    let worksheet = match &args.ws {
        Some(r) => Some(session.find::<Worksheet>(r)?.id),
        None => None,
    };
    let mut docs: Vec<Document> = session
        .load_all::<Document>()?
        .into_iter()
        .filter(|d| worksheet.as_ref().map_or(true, |w| *w == d.worksheet))
        .collect();
    docs.sort_by(|a, b| a.generated_at.cmp(&b.generated_at));

    if wants_records(format) {
        return print_records(&docs, format);
    }
    if docs.is_empty() {
        println!("No documents found.");
        return Ok(());
    }

    let index = index_listing(&session.lab, &docs);
    let rows = docs
        .iter()
        .map(|d| {
            TableRow::new(&d.id, &index)
                .cell("kind", CellValue::Text(d.kind.to_string()))
                .cell("worksheet", CellValue::Text(d.worksheet.short()))
                .cell("format", CellValue::Text(d.format.to_string()))
                .cell("file", CellValue::Text(d.file.clone()))
                .cell("generated", CellValue::DateTime(d.generated_at))
        })
        .collect();
    TableFormatter::new(COLUMNS, "document")
        .quiet(global.quiet)
        .output(rows, format);
    Ok(())
}

fn run_show(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let doc: Document = session.find(&args.id)?;

    match session.format(global) {
        OutputFormat::Id => println!("{}", doc.id),
        f @ (OutputFormat::Yaml | OutputFormat::Json) => print_records(&doc, f)?,
        _ => {
            rule();
            field("ID", style(&doc.id).cyan());
            field("Title", style(&doc.title).yellow());
            field("Kind", doc.kind);
            field("Worksheet", &doc.worksheet);
            field("File", &doc.file);
            field("SHA-256", &doc.sha256);
            if let Some(s) = &doc.signatory {
                field("Signatory", s);
            }
            field("Generated", doc.generated_at.format("%Y-%m-%d %H:%M"));
            rule();
        }
    }
    Ok(())
}

fn run_verify(args: VerifyArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let docs: Vec<Document> = match &args.id {
        Some(r) => vec![session.find(r)?],
        None => session.load_all()?,
    };
    let documents = documents(&session)?;

    let mut bad = 0usize;
    for doc in &docs {
        let ok = match documents.verify(doc) {
            Ok(ok) => ok,
            Err(e) => {
                eprintln!("{} {}: {}", style("✗").red(), doc.id.short(), e);
                bad += 1;
                continue;
            }
        };
        if ok {
            if !global.quiet {
                println!("{} {} {}", style("✓").green(), doc.id.short(), doc.file);
            }
        } else {
            eprintln!(
                "{} {} {} was modified after generation",
                style("✗").red(),
                doc.id.short(),
                doc.file
            );
            bad += 1;
        }
    }

    if bad > 0 {
        bail!("{} of {} document(s) failed verification", bad, docs.len());
    }
    confirm(global.quiet, format!("{} document(s) verified", docs.len()));
    Ok(())
}
