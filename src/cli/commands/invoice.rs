//! `dlab invoice` command - Invoicing delivered work

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{bail, IntoDiagnostic, Result};

use crate::cli::helpers::{parse_date, today, Session};
use crate::cli::output::{
    confirm, field, index_listing, print_created, print_records, rule, wants_records, CellValue,
    ColumnDef, TableFormatter, TableRow,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::billing::Billing;
use crate::core::identity::EntityId;
use crate::entities::dentist::Dentist;
use crate::entities::invoice::{Invoice, InvoiceStatus};
use crate::entities::worksheet::{Worksheet, WorksheetStatus};

#[derive(Subcommand, Debug)]
pub enum InvoiceCommands {
    /// List invoices
    List(ListArgs),

    /// Draft an invoice for delivered worksheets of one dentist
    Draft(DraftArgs),

    /// Issue a draft: assigns the next invoice number
    Issue(IdArgs),

    /// Record payment of an issued invoice
    Pay(PayArgs),

    /// Cancel a draft or issued invoice
    Cancel(CancelArgs),

    /// Show an invoice with lines and totals
    Show(IdArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[arg(long, short = 's')]
    pub status: Option<InvoiceStatus>,

    #[arg(long, short = 'd')]
    pub dentist: Option<String>,

    /// Only issued invoices past their due date
    #[arg(long)]
    pub overdue: bool,
}

#[derive(clap::Args, Debug)]
pub struct DraftArgs {
    /// Dentist to invoice
    #[arg(long, short = 'd')]
    pub dentist: String,

    /// Worksheets to include (IDs or short IDs)
    pub worksheets: Vec<String>,

    /// Include every delivered, uninvoiced worksheet of the dentist
    #[arg(long, conflicts_with = "worksheets")]
    pub all_delivered: bool,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Invoice ID, short ID (@N) or invoice number
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct PayArgs {
    /// Invoice ID, short ID (@N) or invoice number
    pub id: String,

    /// Payment date (default today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct CancelArgs {
    /// Invoice ID, short ID (@N) or invoice number
    pub id: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "NUMBER", 14),
    ColumnDef::new("dentist", "DENTIST", 24),
    ColumnDef::new("issued", "ISSUED", 10),
    ColumnDef::new("due", "DUE", 10),
    ColumnDef::new("total", "TOTAL", 12),
    ColumnDef::new("status", "STATUS", 9),
];

pub fn run(cmd: InvoiceCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        InvoiceCommands::List(args) => run_list(args, global),
        InvoiceCommands::Draft(args) => run_draft(args, global),
        InvoiceCommands::Issue(args) => run_issue(args, global),
        InvoiceCommands::Pay(args) => run_pay(args, global),
        InvoiceCommands::Cancel(args) => run_cancel(args, global),
        InvoiceCommands::Show(args) => run_show(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let format = session.format(global);
    let today = today();

    let dentist = match &args.dentist {
        Some(r) => Some(session.find::<Dentist>(r)?.id),
        None => None,
    };
    let dentists: Vec<Dentist> = session.load_all()?;

    let mut invoices: Vec<Invoice> = session
        .load_all::<Invoice>()?
        .into_iter()
        .filter(|i| args.status.map_or(true, |s| i.status == s))
        .filter(|i| dentist.as_ref().map_or(true, |d| *d == i.dentist))
        .filter(|i| !args.overdue || i.is_overdue(today))
        .collect();
    invoices.sort_by(|a, b| {
        a.number
            .is_none()
            .cmp(&b.number.is_none())
            .then(a.number.cmp(&b.number))
            .then(a.created.cmp(&b.created))
    });

    if wants_records(format) {
        return print_records(&invoices, format);
    }
    if invoices.is_empty() {
        println!("No invoices found.");
        return Ok(());
    }

    let index = index_listing(&session.lab, &invoices);
    let rows = invoices
        .iter()
        .map(|i| {
            let name = dentists
                .iter()
                .find(|d| d.id == i.dentist)
                .map(|d| d.title.clone())
                .unwrap_or_else(|| i.dentist.short());
            let status = if i.is_overdue(today) {
                "overdue".to_string()
            } else {
                i.status.to_string()
            };
            TableRow::new(&i.id, &index)
                .cell("number", CellValue::opt_text(i.number.as_deref()))
                .cell("dentist", CellValue::Text(name))
                .cell("issued", CellValue::opt_date(i.issue_date))
                .cell("due", CellValue::opt_date(i.due_date))
                .cell("total", CellValue::Money(i.totals().total))
                .cell("status", CellValue::Status(status))
        })
        .collect();
    TableFormatter::new(COLUMNS, "invoice")
        .quiet(global.quiet)
        .output(rows, format);
    Ok(())
}

fn run_draft(args: DraftArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let dentist: Dentist = session.find(&args.dentist)?;

    let worksheets: Vec<EntityId> = if args.all_delivered {
        session
            .load_all::<Worksheet>()?
            .into_iter()
            .filter(|w| w.status == WorksheetStatus::Delivered)
            .filter(|w| w.invoice.is_none())
            .filter(|w| w.dentist.as_ref() == Some(&dentist.id))
            .map(|w| w.id)
            .collect()
    } else {
        args.worksheets
            .iter()
            .map(|r| session.find::<Worksheet>(r).map(|w| w.id))
            .collect::<Result<_>>()?
    };
    if worksheets.is_empty() {
        bail!("No worksheets to invoice for {}", dentist.title);
    }

    let billing = Billing::open(&session.lab).map_err(|e| miette::miette!("{}", e))?;
    let invoice = billing
        .draft(&dentist.id, &worksheets, &session.config.author())
        .map_err(|e| miette::miette!("{}", e))?;

    let path = session.lab.entity_path(&invoice.id);
    print_created(global, &session.lab, &invoice, &path);
    if !global.quiet && global.format != OutputFormat::Id {
        let totals = invoice.totals();
        println!(
            "   {} line(s), total {:.2} {}",
            invoice.lines.len(),
            totals.total,
            invoice.currency
        );
    }
    Ok(())
}

fn run_issue(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut invoice = session.find::<Invoice>(&args.id)?;
    let billing = Billing::open(&session.lab).map_err(|e| miette::miette!("{}", e))?;
    let number = billing
        .issue(&mut invoice)
        .map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Id {
        println!("{}", number);
    } else {
        confirm(
            global.quiet,
            format!(
                "Issued {} ({:.2} {}, due {})",
                style(&number).yellow(),
                invoice.totals().total,
                invoice.currency,
                invoice
                    .due_date
                    .map(|d| d.to_string())
                    .unwrap_or_default()
            ),
        );
    }
    Ok(())
}

fn run_pay(args: PayArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut invoice = session.find::<Invoice>(&args.id)?;
    let paid = match &args.date {
        Some(d) => parse_date(d)?,
        None => today(),
    };
    let billing = Billing::open(&session.lab).map_err(|e| miette::miette!("{}", e))?;
    billing
        .mark_paid(&mut invoice, paid)
        .map_err(|e| miette::miette!("{}", e))?;
    confirm(
        global.quiet,
        format!("{} paid on {}", invoice.reference(), paid),
    );
    Ok(())
}

fn run_cancel(args: CancelArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut invoice = session.find::<Invoice>(&args.id)?;

    if !args.yes {
        let prompt = match &invoice.number {
            Some(n) => format!("Cancel issued invoice {}? Its number stays used", n),
            None => format!("Cancel draft {}?", invoice.id.short()),
        };
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !proceed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let billing = Billing::open(&session.lab).map_err(|e| miette::miette!("{}", e))?;
    billing
        .cancel(&mut invoice)
        .map_err(|e| miette::miette!("{}", e))?;
    confirm(
        global.quiet,
        format!(
            "Invoice {} cancelled, {} worksheet(s) released",
            invoice.reference(),
            invoice.worksheets.len()
        ),
    );
    Ok(())
}

fn run_show(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let invoice = session.find::<Invoice>(&args.id)?;

    match session.format(global) {
        OutputFormat::Id => println!("{}", invoice.id),
        f @ (OutputFormat::Yaml | OutputFormat::Json) => print_records(&invoice, f)?,
        _ => {
            let dentist = session
                .lab
                .load::<Dentist>(&invoice.dentist)
                .map(|d| d.display_name())
                .unwrap_or_else(|_| invoice.dentist.to_string());
            let totals = invoice.totals();

            rule();
            field("ID", style(&invoice.id).cyan());
            field(
                "Number",
                style(invoice.number.as_deref().unwrap_or("(draft)")).yellow(),
            );
            field("Dentist", dentist);
            field("Status", &invoice.status);
            if let Some(d) = invoice.issue_date {
                field("Issued", d);
            }
            if let Some(d) = invoice.due_date {
                if invoice.is_overdue(today()) {
                    field("Due", style(format!("{} (overdue)", d)).red());
                } else {
                    field("Due", d);
                }
            }
            if let Some(d) = invoice.paid_date {
                field("Paid", d);
            }
            println!();
            for line in &invoice.lines {
                println!(
                    "  {:>4} x {:>10.2}  {:>10.2}  {}",
                    line.quantity,
                    line.unit_price,
                    line.net(),
                    line.description
                );
            }
            println!();
            field("Net", format!("{:.2} {}", totals.net, invoice.currency));
            for b in &totals.breakdown {
                field(
                    &format!("VAT {}%", b.rate),
                    format!("{:.2} on {:.2}", b.vat, b.base),
                );
            }
            field(
                "Total",
                style(format!("{:.2} {}", totals.total, invoice.currency)).bold(),
            );
            rule();
        }
    }
    Ok(())
}
