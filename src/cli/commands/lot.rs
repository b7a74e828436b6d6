//! `dlab lot` command - Receiving and tracking material lots

use clap::Subcommand;
use console::style;
use csv::{ReaderBuilder, StringRecord};
use miette::{bail, IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::cli::helpers::{parse_date, parse_decimal, today, Session};
use crate::cli::output::{
    confirm, field, index_listing, print_created, print_records, rule, wants_records, CellValue,
    ColumnDef, TableFormatter, TableRow,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::inventory;
use crate::entities::lot::MaterialLot;
use crate::entities::material::Material;
use crate::entities::worksheet::Worksheet;

#[derive(Subcommand, Debug)]
pub enum LotCommands {
    /// List lots with stock left
    List(ListArgs),

    /// Receive a new lot into stock
    Receive(ReceiveArgs),

    /// Show a lot and the worksheets it went into
    Show(IdArgs),

    /// Block a lot from consumption (or release it with --release)
    Quarantine(QuarantineArgs),

    /// Edit a lot in your editor
    Edit(IdArgs),

    /// Receive lots from a CSV file
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only lots of this material
    #[arg(long, short = 'm')]
    pub material: Option<String>,

    /// Include depleted lots
    #[arg(long)]
    pub all: bool,

    /// Only lots expiring within this many days
    #[arg(long)]
    pub expiring: Option<i64>,
}

#[derive(clap::Args, Debug)]
pub struct ReceiveArgs {
    /// Material ID or short ID
    #[arg(long, short = 'm')]
    pub material: String,

    /// Manufacturer's lot / batch number
    #[arg(long, short = 'l')]
    pub lot: String,

    /// Quantity received in the material's unit
    #[arg(long, short = 'n')]
    pub quantity: String,

    /// Arrival date (default today)
    #[arg(long)]
    pub arrival: Option<String>,

    /// Expiry date (YYYY-MM-DD)
    #[arg(long)]
    pub expiry: Option<String>,

    #[arg(long)]
    pub supplier: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Lot ID or short ID (@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct QuarantineArgs {
    /// Lot ID or short ID (@N)
    pub id: String,

    /// Release the lot back into stock
    #[arg(long)]
    pub release: bool,

    /// Reason, appended to the lot notes
    #[arg(long, short = 'r')]
    pub reason: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV with columns material, lot_number, quantity, arrival, expiry, supplier
    pub file: PathBuf,

    /// Validate without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip bad rows instead of stopping
    #[arg(long)]
    pub skip_errors: bool,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("lot", "LOT", 14),
    ColumnDef::new("material", "MATERIAL", 24),
    ColumnDef::new("arrival", "ARRIVED", 10),
    ColumnDef::new("expiry", "EXPIRES", 10),
    ColumnDef::new("remaining", "REMAINING", 10),
    ColumnDef::new("unit", "UNIT", 6),
    ColumnDef::new("state", "STATE", 11),
];

pub fn run(cmd: LotCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        LotCommands::List(args) => run_list(args, global),
        LotCommands::Receive(args) => run_receive(args, global),
        LotCommands::Show(args) => run_show(args, global),
        LotCommands::Quarantine(args) => run_quarantine(args, global),
        LotCommands::Edit(args) => Session::open(global)?.edit::<MaterialLot>(&args.id),
        LotCommands::Import(args) => run_import(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let format = session.format(global);
    let today = today();

    let material = match &args.material {
        Some(r) => Some(session.find::<Material>(r)?.id),
        None => None,
    };
    let materials: HashMap<_, Material> = session
        .load_all::<Material>()?
        .into_iter()
        .map(|m| (m.id.clone(), m))
        .collect();

    let horizon = args
        .expiring
        .map(|days| inventory::warning_horizon(today, days))
        .transpose()
        .map_err(|e| miette::miette!("{}", e))?;
    let mut lots: Vec<MaterialLot> = session
        .load_all::<MaterialLot>()?
        .into_iter()
        .filter(|l| args.all || !l.is_depleted())
        .filter(|l| material.as_ref().map_or(true, |m| *m == l.material))
        .filter(|l| match horizon {
            Some(h) => l.expiry_date.is_some_and(|d| d <= h),
            None => true,
        })
        .collect();
    lots.sort_by(|a, b| {
        a.material
            .cmp(&b.material)
            .then(a.arrival_date.cmp(&b.arrival_date))
            .then(a.created.cmp(&b.created))
    });

    if wants_records(format) {
        return print_records(&lots, format);
    }
    if lots.is_empty() {
        println!("No lots found.");
        return Ok(());
    }

    let index = index_listing(&session.lab, &lots);
    let rows = lots
        .iter()
        .map(|l| {
            let (name, unit) = materials
                .get(&l.material)
                .map(|m| (m.title.clone(), m.unit.clone()))
                .unwrap_or_else(|| (l.material.short(), String::new()));
            TableRow::new(&l.id, &index)
                .cell("lot", CellValue::Text(l.lot_number.clone()))
                .cell("material", CellValue::Text(name))
                .cell("arrival", CellValue::Date(l.arrival_date))
                .cell("expiry", CellValue::opt_date(l.expiry_date))
                .cell("remaining", CellValue::Quantity(l.quantity_remaining))
                .cell("unit", CellValue::Text(unit))
                .cell("state", CellValue::Status(l.state(today).to_string()))
        })
        .collect();
    TableFormatter::new(COLUMNS, "lot")
        .quiet(global.quiet)
        .output(rows, format);
    Ok(())
}

/// Validated fields of a lot to receive
struct Receipt {
    material: Material,
    lot_number: String,
    quantity: Decimal,
    arrival: chrono::NaiveDate,
    expiry: Option<chrono::NaiveDate>,
    supplier: Option<String>,
}

impl Receipt {
    fn into_lot(self, author: String) -> MaterialLot {
        let mut lot = MaterialLot::receive(
            self.material.id,
            self.lot_number,
            self.arrival,
            self.quantity,
            author,
        );
        lot.expiry_date = self.expiry;
        lot.supplier = self.supplier;
        lot
    }
}

fn check_receipt(
    existing: &[MaterialLot],
    material: &Material,
    lot_number: &str,
    quantity: Decimal,
    arrival: chrono::NaiveDate,
    expiry: Option<chrono::NaiveDate>,
) -> Result<()> {
    if lot_number.trim().is_empty() {
        bail!("Lot number cannot be empty");
    }
    if quantity <= Decimal::ZERO {
        bail!("Quantity must be positive (got {})", quantity);
    }
    if expiry.is_some_and(|e| e < arrival) {
        bail!("Lot {} expires before it arrived", lot_number);
    }
    if existing
        .iter()
        .any(|l| l.material == material.id && l.lot_number == lot_number)
    {
        bail!("Lot {} of {} was already received", lot_number, material.title);
    }
    Ok(())
}

fn run_receive(args: ReceiveArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let material: Material = session.find(&args.material)?;
    let quantity = parse_decimal(&args.quantity)?;
    let arrival = match &args.arrival {
        Some(d) => parse_date(d)?,
        None => today(),
    };
    let expiry = args.expiry.as_deref().map(parse_date).transpose()?;

    let existing: Vec<MaterialLot> = session.load_all()?;
    check_receipt(&existing, &material, &args.lot, quantity, arrival, expiry)?;

    let mut lot = Receipt {
        material,
        lot_number: args.lot,
        quantity,
        arrival,
        expiry,
        supplier: args.supplier,
    }
    .into_lot(session.config.author());
    lot.notes = args.notes;

    if lot.is_expired(today()) {
        eprintln!(
            "{} Lot {} is already past its expiry date and will not be consumed",
            style("!").yellow(),
            lot.lot_number
        );
    }

    let path = session.save(&lot)?;
    tracing::info!(lot = %lot.id, material = %lot.material, quantity = %lot.quantity_received, "received lot");
    print_created(global, &session.lab, &lot, &path);
    Ok(())
}

fn run_show(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let lot: MaterialLot = session.find(&args.id)?;

    match session.format(global) {
        OutputFormat::Id => println!("{}", lot.id),
        f @ (OutputFormat::Yaml | OutputFormat::Json) => print_records(&lot, f)?,
        _ => {
            let material = session.lab.load::<Material>(&lot.material).ok();
            let unit = material.as_ref().map(|m| m.unit.as_str()).unwrap_or("");

            rule();
            field("ID", style(&lot.id).cyan());
            field("Lot number", style(&lot.lot_number).yellow());
            field(
                "Material",
                material
                    .as_ref()
                    .map(|m| m.title.clone())
                    .unwrap_or_else(|| lot.material.to_string()),
            );
            if let Some(s) = &lot.supplier {
                field("Supplier", s);
            }
            field("Arrived", lot.arrival_date);
            if let Some(e) = lot.expiry_date {
                field("Expires", e);
            }
            field(
                "Remaining",
                format!("{} / {} {}", lot.quantity_remaining, lot.quantity_received, unit),
            );
            field("State", lot.state(today()));
            if let Some(n) = &lot.notes {
                field("Notes", n);
            }

            let usage: Vec<(Worksheet, Decimal)> = session
                .load_all::<Worksheet>()?
                .into_iter()
                .filter_map(|ws| {
                    let qty: Decimal = ws
                        .active_consumptions()
                        .filter(|c| c.lot == lot.id)
                        .map(|c| c.quantity)
                        .sum();
                    (qty > Decimal::ZERO).then_some((ws, qty))
                })
                .collect();
            if !usage.is_empty() {
                println!();
                println!("{}", style("Used in").bold());
                for (ws, qty) in &usage {
                    println!(
                        "  {} {} [{}] {} {}",
                        style(ws.id.short()).cyan(),
                        ws.title,
                        ws.status,
                        qty,
                        unit
                    );
                }
            }
            rule();
        }
    }
    Ok(())
}

fn run_quarantine(args: QuarantineArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut lot: MaterialLot = session.find(&args.id)?;

    let quarantine = !args.release;
    if lot.quarantined == quarantine {
        bail!(
            "Lot {} is {}",
            lot.lot_number,
            if quarantine { "already quarantined" } else { "not quarantined" }
        );
    }
    lot.quarantined = quarantine;
    if let Some(reason) = args.reason {
        let line = format!(
            "{} {}: {}",
            today(),
            if quarantine { "quarantined" } else { "released" },
            reason
        );
        lot.notes = Some(match lot.notes.take() {
            Some(n) => format!("{}\n{}", n, line),
            None => line,
        });
    }
    lot.entity_revision += 1;
    session.save(&lot)?;

    tracing::info!(lot = %lot.id, quarantined = quarantine, "lot quarantine changed");
    confirm(
        global.quiet,
        format!(
            "Lot {} {}",
            lot.lot_number,
            if quarantine { "quarantined" } else { "released" }
        ),
    );
    Ok(())
}

fn header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect()
}

fn get_field(record: &StringRecord, headers: &HashMap<String, usize>, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|&i| record.get(i))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Material by exact title (case-insensitive) or by ID
fn resolve_material(session: &Session, materials: &[Material], reference: &str) -> Result<Material> {
    match materials
        .iter()
        .find(|m| m.title.eq_ignore_ascii_case(reference))
    {
        Some(m) => Ok(m.clone()),
        None => session.find(reference),
    }
}

fn parse_row(
    session: &Session,
    materials: &[Material],
    existing: &[MaterialLot],
    record: &StringRecord,
    headers: &HashMap<String, usize>,
) -> Result<Receipt> {
    let required = |name: &str| {
        get_field(record, headers, name).ok_or_else(|| miette::miette!("missing '{}'", name))
    };
    let material = resolve_material(session, materials, &required("material")?)?;
    let lot_number = required("lot_number")?;
    let quantity = parse_decimal(&required("quantity")?)?;
    let arrival = match get_field(record, headers, "arrival") {
        Some(d) => parse_date(&d)?,
        None => today(),
    };
    let expiry = get_field(record, headers, "expiry")
        .as_deref()
        .map(parse_date)
        .transpose()?;

    check_receipt(existing, &material, &lot_number, quantity, arrival, expiry)?;
    Ok(Receipt {
        material,
        lot_number,
        quantity,
        arrival,
        expiry,
        supplier: get_field(record, headers, "supplier"),
    })
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let materials: Vec<Material> = session.load_all()?;
    let mut existing: Vec<MaterialLot> = session.load_all()?;

    let file = File::open(&args.file).into_diagnostic()?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));
    let headers = header_map(&rdr.headers().into_diagnostic()?.clone());

    let mut created = 0usize;
    let mut errors = 0usize;
    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2;
        let receipt = result
            .map_err(|e| miette::miette!("CSV parse error: {}", e))
            .and_then(|record| parse_row(&session, &materials, &existing, &record, &headers));

        let receipt = match receipt {
            Ok(r) => r,
            Err(e) => {
                eprintln!("{} Row {}: {}", style("✗").red(), row_num, e);
                errors += 1;
                if !args.skip_errors {
                    bail!("Import stopped at row {}", row_num);
                }
                continue;
            }
        };

        let lot = receipt.into_lot(session.config.author());
        if !args.dry_run {
            session.save(&lot)?;
        }
        if !global.quiet {
            println!(
                "{} Row {}: lot {} ({})",
                style("✓").green(),
                row_num,
                lot.lot_number,
                lot.quantity_received
            );
        }
        existing.push(lot);
        created += 1;
    }

    if !global.quiet {
        println!();
        let verb = if args.dry_run { "Would receive" } else { "Received" };
        println!("{} {} lot(s), {} error(s)", verb, created, errors);
    }
    Ok(())
}
