//! `dlab order` command - Work orders from dentists

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{bail, Result};

use crate::cli::helpers::{parse_date, today, Session};
use crate::cli::output::{
    confirm, field, index_listing, print_created, print_records, rule, wants_records, CellValue,
    ColumnDef, TableFormatter, TableRow,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::dentist::Dentist;
use crate::entities::order::{Order, OrderStatus};
use crate::entities::worksheet::{Worksheet, WorksheetStatus};

#[derive(Subcommand, Debug)]
pub enum OrderCommands {
    /// List orders
    List(ListArgs),

    /// Record a new order
    New(NewArgs),

    /// Show an order with its worksheets
    Show(IdArgs),

    /// Edit an order in your editor
    Edit(IdArgs),

    /// Close an order whose worksheets are all finished
    Close(IdArgs),

    /// Cancel an order whose worksheets are all cancelled or voided
    Cancel(IdArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Open,
    Closed,
    Cancelled,
    All,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[arg(long, short = 's', default_value = "open")]
    pub status: StatusFilter,

    /// Only orders from this dentist
    #[arg(long, short = 'd')]
    pub dentist: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Prescribing dentist (ID or short ID)
    #[arg(long, short = 'd')]
    pub dentist: String,

    /// Pseudonymised patient code (not a name)
    #[arg(long, short = 'p')]
    pub patient: Option<String>,

    /// Order title (default: "Order <patient>")
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Date the order was received (YYYY-MM-DD, default today)
    #[arg(long)]
    pub received: Option<String>,

    /// Requested delivery date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,

    /// Prescription text
    #[arg(long)]
    pub prescription: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Order ID or short ID (@N)
    pub id: String,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("title", "TITLE", 30),
    ColumnDef::new("dentist", "DENTIST", 24),
    ColumnDef::new("patient", "PATIENT", 12),
    ColumnDef::new("received", "RECEIVED", 10),
    ColumnDef::new("due", "DUE", 10),
    ColumnDef::new("ws", "WS", 4),
    ColumnDef::new("status", "STATUS", 10),
];

pub fn run(cmd: OrderCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        OrderCommands::List(args) => run_list(args, global),
        OrderCommands::New(args) => run_new(args, global),
        OrderCommands::Show(args) => run_show(args, global),
        OrderCommands::Edit(args) => Session::open(global)?.edit::<Order>(&args.id),
        OrderCommands::Close(args) => run_close(args, global, OrderStatus::Closed),
        OrderCommands::Cancel(args) => run_close(args, global, OrderStatus::Cancelled),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let format = session.format(global);

    let dentist = match &args.dentist {
        Some(r) => Some(session.find::<Dentist>(r)?.id),
        None => None,
    };
    let dentists: Vec<Dentist> = session.load_all()?;

    let mut orders: Vec<Order> = session
        .load_all::<Order>()?
        .into_iter()
        .filter(|o| match args.status {
            StatusFilter::Open => o.status == OrderStatus::Open,
            StatusFilter::Closed => o.status == OrderStatus::Closed,
            StatusFilter::Cancelled => o.status == OrderStatus::Cancelled,
            StatusFilter::All => true,
        })
        .filter(|o| dentist.as_ref().map_or(true, |d| *d == o.dentist))
        .collect();
    orders.sort_by(|a, b| a.received.cmp(&b.received).then(a.created.cmp(&b.created)));

    if wants_records(format) {
        return print_records(&orders, format);
    }
    if orders.is_empty() {
        println!("No orders found.");
        return Ok(());
    }

    let index = index_listing(&session.lab, &orders);
    let rows = orders
        .iter()
        .map(|o| {
            let dentist_name = dentists
                .iter()
                .find(|d| d.id == o.dentist)
                .map(|d| d.title.clone())
                .unwrap_or_else(|| o.dentist.short());
            TableRow::new(&o.id, &index)
                .cell("title", CellValue::Text(o.title.clone()))
                .cell("dentist", CellValue::Text(dentist_name))
                .cell("patient", CellValue::opt_text(o.patient_ref.as_deref()))
                .cell("received", CellValue::Date(o.received))
                .cell("due", CellValue::opt_date(o.due_date))
                .cell("ws", CellValue::Number(o.worksheets.len() as i64))
                .cell("status", CellValue::Status(o.status.to_string()))
        })
        .collect();
    TableFormatter::new(COLUMNS, "order")
        .quiet(global.quiet)
        .output(rows, format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let dentist: Dentist = session.find(&args.dentist)?;
    if !dentist.active {
        bail!("{} is inactive and cannot receive new orders", dentist.title);
    }

    let received = match &args.received {
        Some(d) => parse_date(d)?,
        None => today(),
    };
    let title = args.title.unwrap_or_else(|| match &args.patient {
        Some(p) => format!("Order {}", p),
        None => format!("Order {}", received),
    });

    let mut order = Order::new(title, dentist.id.clone(), received, session.config.author());
    order.patient_ref = args.patient;
    order.due_date = args.due.as_deref().map(parse_date).transpose()?;
    order.prescription = args.prescription;

    let path = session.save(&order)?;
    print_created(global, &session.lab, &order, &path);
    Ok(())
}

fn run_show(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let order: Order = session.find(&args.id)?;

    match session.format(global) {
        OutputFormat::Id => println!("{}", order.id),
        f @ (OutputFormat::Yaml | OutputFormat::Json) => print_records(&order, f)?,
        _ => {
            let dentist = session
                .lab
                .load::<Dentist>(&order.dentist)
                .map(|d| d.display_name())
                .unwrap_or_else(|_| order.dentist.to_string());

            rule();
            field("ID", style(&order.id).cyan());
            field("Title", style(&order.title).yellow());
            field("Dentist", dentist);
            field("Patient", order.patient_ref.as_deref().unwrap_or("-"));
            field("Received", order.received);
            if let Some(due) = order.due_date {
                field("Due", due);
            }
            field("Status", &order.status);
            if let Some(p) = &order.prescription {
                field("Prescription", p);
            }
            if !order.worksheets.is_empty() {
                println!();
                println!("{}", style("Worksheets").bold());
                for id in &order.worksheets {
                    match session.lab.load::<Worksheet>(id) {
                        Ok(ws) => println!(
                            "  {} {} [{}] teeth {}",
                            style(ws.id.short()).cyan(),
                            ws.title,
                            ws.status,
                            ws.teeth_display()
                        ),
                        Err(_) => println!("  {} (missing)", style(id).red()),
                    }
                }
            }
            rule();
        }
    }
    Ok(())
}

fn run_close(args: IdArgs, global: &GlobalOpts, to: OrderStatus) -> Result<()> {
    let session = Session::open(global)?;
    let mut order: Order = session.find(&args.id)?;
    if order.status != OrderStatus::Open {
        bail!("Order {} is already {}", order.id.short(), order.status);
    }

    for id in &order.worksheets {
        let ws: Worksheet = session
            .lab
            .load(id)
            .map_err(|e| miette::miette!("{}", e))?;
        let finished = match to {
            OrderStatus::Cancelled => ws.status.is_terminal(),
            _ => !ws.status.is_open(),
        };
        if !finished {
            bail!(
                "Worksheet {} is still {}; finish or cancel it first",
                ws.id.short(),
                ws.status
            );
        }
        if to == OrderStatus::Closed && ws.status == WorksheetStatus::Delivered && ws.invoice.is_none() {
            tracing::warn!(worksheet = %ws.id, "closing order with an uninvoiced worksheet");
        }
    }

    order.status = to;
    order.entity_revision += 1;
    session.save(&order)?;
    confirm(global.quiet, format!("Order {} {}", order.id.short(), to));
    Ok(())
}
