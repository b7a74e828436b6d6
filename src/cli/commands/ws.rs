//! `dlab ws` command - Production worksheets

use clap::Subcommand;
use console::style;
use miette::{bail, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::cli::helpers::{parse_date, parse_decimal, today, Session};
use crate::cli::output::{
    confirm, field, index_listing, print_created, print_records, rule, wants_records, CellValue,
    ColumnDef, TableFormatter, TableRow,
};
use crate::cli::commands::product;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityId;
use crate::core::production::Production;
use crate::entities::dentist::Dentist;
use crate::entities::material::Material;
use crate::entities::order::{Order, OrderStatus};
use crate::entities::product::Product;
use crate::entities::worksheet::{ToothWork, WorkKind, Worksheet, WorksheetStatus};
use crate::fdi::{self, ToothNumber};

#[derive(Subcommand, Debug)]
pub enum WsCommands {
    /// List worksheets (open ones by default)
    List(ListArgs),

    /// Create a worksheet, usually for an order
    New(NewArgs),

    /// Show a worksheet with its tooth chart, materials and history
    Show(IdArgs),

    /// Set the work on one or more teeth (e.g. "11,21" or "13-23")
    Tooth(ToothArgs),

    /// Remove teeth from a draft worksheet
    Untooth(UntoothArgs),

    /// Plan a bridge: end teeth become abutments, the teeth between pontics
    Bridge(BridgeArgs),

    /// Add a planned material requirement
    Material(MaterialArgs),

    /// Move a worksheet to another status
    #[command(visible_alias = "mv")]
    Transition(TransitionArgs),

    /// Book extra material (FIFO) while in production
    Consume(MaterialArgs),

    /// Edit a draft worksheet in your editor
    Edit(IdArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only worksheets in this status
    #[arg(long, short = 's')]
    pub status: Option<WorksheetStatus>,

    /// Include delivered, cancelled and voided worksheets
    #[arg(long)]
    pub all: bool,

    /// Only open worksheets past their due date
    #[arg(long)]
    pub overdue: bool,

    /// Only worksheets for this dentist
    #[arg(long, short = 'd')]
    pub dentist: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Order the worksheet belongs to (dentist, patient and due date are taken from it)
    #[arg(long, short = 'o')]
    pub order: Option<String>,

    /// Dentist, when there is no order
    #[arg(long, short = 'd')]
    pub dentist: Option<String>,

    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Pseudonymised patient code
    #[arg(long, short = 'p')]
    pub patient: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,

    /// Responsible technician (username)
    #[arg(long)]
    pub technician: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Worksheet ID or short ID (@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ToothArgs {
    /// Worksheet ID or short ID (@N)
    pub id: String,

    /// FDI teeth, e.g. "11,21" or "13-23"
    pub teeth: String,

    #[arg(long, short = 'w', default_value = "crown")]
    pub work: WorkKind,

    /// Product (ID, short ID or catalog code)
    #[arg(long, short = 'p')]
    pub product: Option<String>,

    /// Shade, e.g. A2
    #[arg(long, short = 's')]
    pub shade: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Do not add the product's default materials
    #[arg(long)]
    pub no_materials: bool,
}

#[derive(clap::Args, Debug)]
pub struct UntoothArgs {
    /// Worksheet ID or short ID (@N)
    pub id: String,

    /// FDI teeth to remove
    pub teeth: String,
}

#[derive(clap::Args, Debug)]
pub struct BridgeArgs {
    /// Worksheet ID or short ID (@N)
    pub id: String,

    /// First abutment (FDI)
    pub from: ToothNumber,

    /// Last abutment (FDI)
    pub to: ToothNumber,

    /// Product (ID, short ID or catalog code)
    #[arg(long, short = 'p')]
    pub product: Option<String>,

    #[arg(long, short = 's')]
    pub shade: Option<String>,

    /// Do not add the product's default materials
    #[arg(long)]
    pub no_materials: bool,
}

#[derive(clap::Args, Debug)]
pub struct MaterialArgs {
    /// Worksheet ID or short ID (@N)
    pub id: String,

    /// Material ID or short ID
    pub material: String,

    /// Quantity in the material's unit
    pub quantity: String,
}

#[derive(clap::Args, Debug)]
pub struct TransitionArgs {
    /// Worksheet ID or short ID (@N)
    pub id: String,

    /// Target status (in_production, qc_pending, delivered, cancelled, voided, ...)
    pub to: WorksheetStatus,

    /// Comment stored in the history (required to void)
    #[arg(long, short = 'm')]
    pub comment: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("title", "TITLE", 28),
    ColumnDef::new("dentist", "DENTIST", 22),
    ColumnDef::new("patient", "PATIENT", 10),
    ColumnDef::new("teeth", "TEETH", 18),
    ColumnDef::new("tech", "TECH", 10),
    ColumnDef::new("due", "DUE", 10),
    ColumnDef::new("status", "STATUS", 13),
];

pub fn run(cmd: WsCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        WsCommands::List(args) => run_list(args, global),
        WsCommands::New(args) => run_new(args, global),
        WsCommands::Show(args) => run_show(args, global),
        WsCommands::Tooth(args) => run_tooth(args, global),
        WsCommands::Untooth(args) => run_untooth(args, global),
        WsCommands::Bridge(args) => run_bridge(args, global),
        WsCommands::Material(args) => run_material(args, global),
        WsCommands::Transition(args) => run_transition(args, global),
        WsCommands::Consume(args) => run_consume(args, global),
        WsCommands::Edit(args) => run_edit(args, global),
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

    let mut sheets: Vec<Worksheet> = session
        .load_all::<Worksheet>()?
        .into_iter()
        .filter(|w| match args.status {
            Some(s) => w.status == s,
            None => args.all || w.status.is_open(),
        })
        .filter(|w| !args.overdue || w.is_overdue(today))
        .filter(|w| dentist.as_ref().map_or(true, |d| w.dentist.as_ref() == Some(d)))
        .collect();
    sheets.sort_by(|a, b| {
        a.due_date
            .is_none()
            .cmp(&b.due_date.is_none())
            .then(a.due_date.cmp(&b.due_date))
            .then(a.created.cmp(&b.created))
    });

    if wants_records(format) {
        return print_records(&sheets, format);
    }
    if sheets.is_empty() {
        println!("No worksheets found.");
        return Ok(());
    }

    let index = index_listing(&session.lab, &sheets);
    let rows = sheets
        .iter()
        .map(|w| {
            let dentist_name = w.dentist.as_ref().map(|id| {
                dentists
                    .iter()
                    .find(|d| d.id == *id)
                    .map(|d| d.title.clone())
                    .unwrap_or_else(|| id.short())
            });
            let status = if w.is_overdue(today) {
                format!("{} (late)", w.status)
            } else {
                w.status.to_string()
            };
            TableRow::new(&w.id, &index)
                .cell("title", CellValue::Text(w.title.clone()))
                .cell("dentist", CellValue::opt_text(dentist_name.as_deref()))
                .cell("patient", CellValue::opt_text(w.patient_ref.as_deref()))
                .cell("teeth", CellValue::Text(w.teeth_display()))
                .cell("tech", CellValue::opt_text(w.technician.as_deref()))
                .cell("due", CellValue::opt_date(w.due_date))
                .cell("status", CellValue::Status(status))
        })
        .collect();
    TableFormatter::new(COLUMNS, "worksheet")
        .quiet(global.quiet)
        .output(rows, format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;

    let mut order = match &args.order {
        Some(r) => {
            let order: Order = session.find(r)?;
            if order.status != OrderStatus::Open {
                bail!("Order {} is {}; worksheets can only be added to open orders", order.id.short(), order.status);
            }
            Some(order)
        }
        None => None,
    };

    let dentist = match (&args.dentist, &order) {
        (Some(r), _) => session.find::<Dentist>(r)?.id,
        (None, Some(o)) => o.dentist.clone(),
        (None, None) => bail!("Give either --order or --dentist"),
    };

    let patient = args
        .patient
        .or_else(|| order.as_ref().and_then(|o| o.patient_ref.clone()));
    let title = args.title.unwrap_or_else(|| match (&order, &patient) {
        (Some(o), _) => o.title.clone(),
        (None, Some(p)) => format!("Worksheet {}", p),
        (None, None) => format!("Worksheet {}", today()),
    });

    let mut ws = Worksheet::new(title, session.config.author());
    ws.dentist = Some(dentist);
    ws.patient_ref = patient;
    ws.due_date = match &args.due {
        Some(d) => Some(parse_date(d)?),
        None => order.as_ref().and_then(|o| o.due_date),
    };
    ws.technician = args.technician;
    ws.notes = args.notes;

    if let Some(order) = order.as_mut() {
        ws.order = Some(order.id.clone());
        order.link_worksheet(&ws.id);
        order.entity_revision += 1;
        session.save(order)?;
    }

    let path = session.save(&ws)?;
    print_created(global, &session.lab, &ws, &path);
    Ok(())
}

fn run_show(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let ws: Worksheet = session.find(&args.id)?;

    match session.format(global) {
        OutputFormat::Id => println!("{}", ws.id),
        f @ (OutputFormat::Yaml | OutputFormat::Json) => print_records(&ws, f)?,
        _ => print_worksheet(&session, &ws)?,
    }
    Ok(())
}

fn print_worksheet(session: &Session, ws: &Worksheet) -> Result<()> {
    let products: HashMap<EntityId, Product> = session
        .load_all::<Product>()?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();
    let materials: HashMap<EntityId, Material> = session
        .load_all::<Material>()?
        .into_iter()
        .map(|m| (m.id.clone(), m))
        .collect();

    rule();
    field("ID", style(&ws.id).cyan());
    field("Title", style(&ws.title).yellow());
    if let Some(d) = &ws.dentist {
        let name = session
            .lab
            .load::<Dentist>(d)
            .map(|d| d.display_name())
            .unwrap_or_else(|_| d.to_string());
        field("Dentist", name);
    }
    if let Some(o) = &ws.order {
        field("Order", o.short());
    }
    field("Patient", ws.patient_ref.as_deref().unwrap_or("-"));
    field("Technician", ws.technician.as_deref().unwrap_or("-"));
    if let Some(due) = ws.due_date {
        if ws.is_overdue(today()) {
            field("Due", style(format!("{} (overdue)", due)).red());
        } else {
            field("Due", due);
        }
    }
    field("Status", style(ws.status).bold());

    if !ws.teeth.is_empty() {
        println!();
        println!("{}", style("Teeth").bold());
        for w in &ws.teeth {
            let product = w
                .product
                .as_ref()
                .map(|p| products.get(p).map(|p| p.code.clone()).unwrap_or_else(|| p.short()));
            println!(
                "  {:>3}  {:<14} {:<10} {}",
                style(w.tooth).cyan(),
                w.work,
                product.as_deref().unwrap_or("-"),
                w.shade.as_deref().unwrap_or("")
            );
        }
    }

    if !ws.materials.is_empty() {
        println!();
        println!("{}", style("Planned materials").bold());
        for m in &ws.materials {
            let (name, unit) = materials
                .get(&m.material)
                .map(|mat| (mat.title.clone(), mat.unit.clone()))
                .unwrap_or_else(|| (m.material.short(), String::new()));
            println!("  {} {} {}", name, m.quantity, unit);
        }
    }

    if !ws.consumptions.is_empty() {
        println!();
        println!("{}", style("Consumed lots").bold());
        for c in &ws.consumptions {
            let name = materials
                .get(&c.material)
                .map(|m| m.title.clone())
                .unwrap_or_else(|| c.material.short());
            let returned = if c.returned { " (returned)" } else { "" };
            println!("  {} lot {} {}{}", name, c.lot_number, c.quantity, returned);
        }
    }

    if !ws.history.is_empty() {
        println!();
        println!("{}", style("History").bold());
        for h in &ws.history {
            println!(
                "  {} {} -> {} by {}{}{}",
                h.at.format("%Y-%m-%d %H:%M"),
                h.from,
                h.to,
                h.by,
                h.role.map(|r| format!(" ({})", r)).unwrap_or_default(),
                h.comment
                    .as_deref()
                    .map(|c| format!(": {}", c))
                    .unwrap_or_default()
            );
        }
    }

    let production = Production::open(&session.lab).map_err(|e| miette::miette!("{}", e))?;
    let next = production.engine().allowed_transitions(ws.status);
    if !next.is_empty() {
        println!();
        field(
            "Next",
            next.iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        );
    }
    rule();
    Ok(())
}

fn load_draft(session: &Session, reference: &str) -> Result<Worksheet> {
    let ws: Worksheet = session.find(reference)?;
    if !ws.is_editable() {
        bail!(
            "Worksheet {} is {}; teeth and materials can only change in draft",
            ws.id.short(),
            ws.status
        );
    }
    Ok(ws)
}

/// Add the product's per-unit materials for `units` teeth
fn add_default_materials(ws: &mut Worksheet, product: &Product, units: usize) {
    let units = Decimal::from(units as u64);
    for req in &product.default_materials {
        ws.add_material(req.material.clone(), req.quantity * units);
    }
}

fn run_tooth(args: ToothArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut ws = load_draft(&session, &args.id)?;
    let teeth = fdi::parse_selection(&args.teeth).map_err(|e| miette::miette!("{}", e))?;
    if teeth.is_empty() {
        bail!("No teeth given");
    }

    let product = args
        .product
        .as_deref()
        .map(|r| product::find(&session, r))
        .transpose()?;
    if let Some(p) = &product {
        if !p.active {
            bail!("Product {} is inactive", p.code);
        }
    }

    for tooth in &teeth {
        ws.set_tooth(ToothWork {
            tooth: *tooth,
            work: args.work,
            product: product.as_ref().map(|p| p.id.clone()),
            shade: args.shade.clone(),
            notes: args.notes.clone(),
        });
    }
    if let (Some(p), false) = (&product, args.no_materials) {
        add_default_materials(&mut ws, p, teeth.len());
    }
    ws.entity_revision += 1;
    session.save(&ws)?;

    confirm(
        global.quiet,
        format!("{} {}: {}", ws.id.short(), args.work, join_teeth(&teeth)),
    );
    Ok(())
}

fn run_untooth(args: UntoothArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut ws = load_draft(&session, &args.id)?;
    let teeth = fdi::parse_selection(&args.teeth).map_err(|e| miette::miette!("{}", e))?;

    let removed: Vec<ToothNumber> = teeth.into_iter().filter(|t| ws.remove_tooth(*t)).collect();
    if removed.is_empty() {
        bail!("None of those teeth are on worksheet {}", ws.id.short());
    }
    ws.entity_revision += 1;
    session.save(&ws)?;
    confirm(
        global.quiet,
        format!("{} removed {}", ws.id.short(), join_teeth(&removed)),
    );
    Ok(())
}

fn run_bridge(args: BridgeArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut ws = load_draft(&session, &args.id)?;
    let product = args
        .product
        .as_deref()
        .map(|r| product::find(&session, r))
        .transpose()?;

    let teeth = ws
        .add_bridge(
            args.from,
            args.to,
            product.as_ref().map(|p| p.id.clone()),
            args.shade.clone(),
        )
        .map_err(|e| miette::miette!("{}", e))?;
    if let (Some(p), false) = (&product, args.no_materials) {
        add_default_materials(&mut ws, p, teeth.len());
    }
    ws.entity_revision += 1;
    session.save(&ws)?;

    confirm(
        global.quiet,
        format!(
            "{} bridge {}-{} ({} units)",
            ws.id.short(),
            args.from,
            args.to,
            teeth.len()
        ),
    );
    Ok(())
}

fn run_material(args: MaterialArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut ws = load_draft(&session, &args.id)?;
    let material: Material = session.find(&args.material)?;
    let quantity = parse_decimal(&args.quantity)?;
    if quantity <= Decimal::ZERO {
        bail!("Quantity must be positive");
    }

    ws.add_material(material.id.clone(), quantity);
    ws.entity_revision += 1;
    session.save(&ws)?;
    confirm(
        global.quiet,
        format!(
            "{} plans {} {} {}",
            ws.id.short(),
            quantity,
            material.unit,
            material.title
        ),
    );
    Ok(())
}

fn run_transition(args: TransitionArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut ws: Worksheet = session.find(&args.id)?;
    let actor = session.actor()?;

    let production = Production::open(&session.lab).map_err(|e| miette::miette!("{}", e))?;
    let record = production
        .transition(&mut ws, args.to, &actor, args.comment)
        .map_err(|e| miette::miette!("{}", e))?;

    confirm(
        global.quiet,
        format!("{} {} → {}", ws.id.short(), record.from, record.to),
    );
    if record.to == WorksheetStatus::InProduction && !global.quiet {
        for c in ws.active_consumptions() {
            println!("  drew {} from lot {}", c.quantity, c.lot_number);
        }
    }
    Ok(())
}

fn run_consume(args: MaterialArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut ws: Worksheet = session.find(&args.id)?;
    let material: Material = session.find(&args.material)?;
    let quantity = parse_decimal(&args.quantity)?;

    let production = Production::open(&session.lab).map_err(|e| miette::miette!("{}", e))?;
    let draws = production
        .consume_extra(&mut ws, &material.id, quantity)
        .map_err(|e| miette::miette!("{}", e))?;

    confirm(
        global.quiet,
        format!("{} consumed {} {} {}", ws.id.short(), quantity, material.unit, material.title),
    );
    if !global.quiet {
        for d in &draws {
            println!("  lot {} {}", d.lot_number, d.quantity);
        }
    }
    Ok(())
}

fn run_edit(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let ws = load_draft(&session, &args.id)?;
    session.edit::<Worksheet>(&ws.id.to_string())
}

fn join_teeth(teeth: &[ToothNumber]) -> String {
    teeth
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
