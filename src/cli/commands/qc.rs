//! `dlab qc` command - Quality-control sign-off

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::Session;
use crate::cli::output::{
    confirm, field, index_listing, print_records, rule, wants_records, CellValue, ColumnDef,
    TableFormatter, TableRow,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::production::Production;
use crate::core::profile::LabProfile;
use crate::entities::qc::{QcVerdict, QualityControl};
use crate::entities::worksheet::Worksheet;

#[derive(Subcommand, Debug)]
pub enum QcCommands {
    /// Pass a worksheet: every checklist item is signed off
    Approve(ApproveArgs),

    /// Send a worksheet back to production
    Reject(RejectArgs),

    /// List QC records
    List(ListArgs),

    /// Show a QC record
    Show(IdArgs),

    /// Print the lab's QC checklist
    Checklist,
}

#[derive(clap::Args, Debug)]
pub struct ApproveArgs {
    /// Worksheet ID or short ID (@N)
    pub ws: String,

    #[arg(long, short = 'n')]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RejectArgs {
    /// Worksheet ID or short ID (@N)
    pub ws: String,

    /// Checklist item that failed (repeatable)
    #[arg(long = "fail", short = 'x')]
    pub failed: Vec<String>,

    /// Reason for the rejection
    #[arg(long, short = 'r')]
    pub reason: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only records for this worksheet
    #[arg(long, short = 'w')]
    pub ws: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// QC record ID or short ID (@N)
    pub id: String,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("worksheet", "WORKSHEET", 16),
    ColumnDef::new("inspector", "INSPECTOR", 12),
    ColumnDef::new("at", "INSPECTED", 16),
    ColumnDef::new("verdict", "VERDICT", 7),
    ColumnDef::new("failed", "FAILED", 30),
];

pub fn run(cmd: QcCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        QcCommands::Approve(args) => run_inspect(&args.ws, Vec::new(), args.notes, QcVerdict::Pass, global),
        QcCommands::Reject(args) => {
            run_inspect(&args.ws, args.failed, args.reason, QcVerdict::Fail, global)
        }
        QcCommands::List(args) => run_list(args, global),
        QcCommands::Show(args) => run_show(args, global),
        QcCommands::Checklist => run_checklist(global),
    }
}

fn run_inspect(
    reference: &str,
    failed: Vec<String>,
    notes: Option<String>,
    verdict: QcVerdict,
    global: &GlobalOpts,
) -> Result<()> {
    let session = Session::open(global)?;
    let mut ws: Worksheet = session.find(reference)?;
    let actor = session.actor()?;

    let production = Production::open(&session.lab).map_err(|e| miette::miette!("{}", e))?;
    let checks = production
        .checklist(&failed)
        .map_err(|e| miette::miette!("{}", e))?;
    let qc = production
        .inspect(&mut ws, &actor, checks, verdict, notes)
        .map_err(|e| miette::miette!("{}", e))?;

    match verdict {
        QcVerdict::Pass => confirm(
            global.quiet,
            format!("{} approved by {} ({})", ws.id.short(), qc.inspector, qc.id.short()),
        ),
        QcVerdict::Fail => confirm(
            global.quiet,
            format!(
                "{} rejected by {}, back to production ({})",
                ws.id.short(),
                qc.inspector,
                qc.id.short()
            ),
        ),
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let format = session.format(global);

    let worksheet = match &args.ws {
        Some(r) => Some(session.find::<Worksheet>(r)?.id),
        None => None,
    };
    let mut records: Vec<QualityControl> = session
        .load_all::<QualityControl>()?
        .into_iter()
        .filter(|q| worksheet.as_ref().map_or(true, |w| *w == q.worksheet))
        .collect();
    records.sort_by(|a, b| a.inspected_at.cmp(&b.inspected_at));

    if wants_records(format) {
        return print_records(&records, format);
    }
    if records.is_empty() {
        println!("No QC records found.");
        return Ok(());
    }

    let index = index_listing(&session.lab, &records);
    let rows = records
        .iter()
        .map(|q| {
            TableRow::new(&q.id, &index)
                .cell("worksheet", CellValue::Text(q.worksheet.short()))
                .cell("inspector", CellValue::Text(q.inspector.clone()))
                .cell("at", CellValue::DateTime(q.inspected_at))
                .cell("verdict", CellValue::Status(q.verdict.to_string()))
                .cell("failed", CellValue::Text(q.failed_items().join(", ")))
        })
        .collect();
    TableFormatter::new(COLUMNS, "qc")
        .quiet(global.quiet)
        .output(rows, format);
    Ok(())
}

fn run_show(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let qc: QualityControl = session.find(&args.id)?;

    match session.format(global) {
        OutputFormat::Id => println!("{}", qc.id),
        f @ (OutputFormat::Yaml | OutputFormat::Json) => print_records(&qc, f)?,
        _ => {
            rule();
            field("ID", style(&qc.id).cyan());
            field("Worksheet", &qc.worksheet);
            field("Inspector", &qc.inspector);
            field("Inspected", qc.inspected_at.format("%Y-%m-%d %H:%M"));
            let verdict = match qc.verdict {
                QcVerdict::Pass => style(qc.verdict.to_string()).green(),
                QcVerdict::Fail => style(qc.verdict.to_string()).red(),
            };
            field("Verdict", verdict);
            println!();
            for c in &qc.checks {
                let mark = if c.passed {
                    style("✓").green()
                } else {
                    style("✗").red()
                };
                match &c.note {
                    Some(n) => println!("  {} {} ({})", mark, c.item, n),
                    None => println!("  {} {}", mark, c.item),
                }
            }
            if let Some(n) = &qc.notes {
                println!();
                field("Notes", n);
            }
            rule();
        }
    }
    Ok(())
}

fn run_checklist(global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let profile = LabProfile::load(&session.lab).map_err(|e| miette::miette!("{}", e))?;
    for item in &profile.qc_checklist {
        println!("{}", item);
    }
    if !global.quiet && profile.independent_qc {
        eprintln!(
            "{} QC must be signed off by someone other than the worksheet technician",
            style("→").blue()
        );
    }
    Ok(())
}
