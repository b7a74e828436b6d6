//! `dlab material` command - Materials and their stock

use clap::Subcommand;
use console::style;
use miette::{bail, Result};
use rust_decimal::Decimal;

use crate::cli::helpers::{parse_decimal, today, Session};
use crate::cli::output::{
    field, index_listing, print_created, print_records, rule, wants_records, CellValue, ColumnDef,
    TableFormatter, TableRow,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::inventory;
use crate::entities::lot::MaterialLot;
use crate::entities::material::{Material, MaterialCategory};

#[derive(Subcommand, Debug)]
pub enum MaterialCommands {
    /// List materials with available stock
    List(ListArgs),

    /// Register a material
    New(NewArgs),

    /// Show a material and its lots
    Show(IdArgs),

    /// Edit a material in your editor
    Edit(IdArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[arg(long, short = 'c')]
    pub category: Option<MaterialCategory>,

    /// Only materials at or below their reorder level
    #[arg(long)]
    pub low: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Trade name
    #[arg(long, short = 't')]
    pub title: String,

    /// Stock unit (g, ml, pcs, disc)
    #[arg(long, short = 'u')]
    pub unit: String,

    #[arg(long, short = 'c', default_value = "other")]
    pub category: MaterialCategory,

    #[arg(long, short = 'm')]
    pub manufacturer: Option<String>,

    /// CE certificate or declaration reference
    #[arg(long)]
    pub ce: Option<String>,

    /// Reorder level in stock units
    #[arg(long)]
    pub reorder: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Material ID or short ID (@N)
    pub id: String,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("title", "MATERIAL", 28),
    ColumnDef::new("category", "CATEGORY", 10),
    ColumnDef::new("available", "AVAILABLE", 10),
    ColumnDef::new("unit", "UNIT", 6),
    ColumnDef::new("lots", "LOTS", 4),
    ColumnDef::new("reorder", "REORDER", 8),
    ColumnDef::new("low", "LOW", 4),
];

pub fn run(cmd: MaterialCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MaterialCommands::List(args) => run_list(args, global),
        MaterialCommands::New(args) => run_new(args, global),
        MaterialCommands::Show(args) => run_show(args, global),
        MaterialCommands::Edit(args) => Session::open(global)?.edit::<Material>(&args.id),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let format = session.format(global);

    let mut materials: Vec<Material> = session
        .load_all::<Material>()?
        .into_iter()
        .filter(|m| args.category.map_or(true, |c| m.category == c))
        .collect();
    materials.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
    let lots: Vec<MaterialLot> = session.load_all()?;

    let levels = inventory::stock_levels(&materials, &lots, today());
    let (materials, levels): (Vec<Material>, Vec<_>) = materials
        .into_iter()
        .zip(levels)
        .filter(|(_, level)| !args.low || level.is_low())
        .unzip();

    if wants_records(format) {
        return print_records(&materials, format);
    }
    if materials.is_empty() {
        println!("No materials found.");
        return Ok(());
    }

    let index = index_listing(&session.lab, &materials);
    let rows = materials
        .iter()
        .zip(&levels)
        .map(|(m, level)| {
            TableRow::new(&m.id, &index)
                .cell("title", CellValue::Text(m.title.clone()))
                .cell("category", CellValue::Text(m.category.to_string()))
                .cell("available", CellValue::Quantity(level.available))
                .cell("unit", CellValue::Text(m.unit.clone()))
                .cell("lots", CellValue::Number(level.usable_lots as i64))
                .cell(
                    "reorder",
                    m.reorder_level
                        .map(CellValue::Quantity)
                        .unwrap_or(CellValue::Empty),
                )
                .cell("low", CellValue::Flag(level.is_low()))
        })
        .collect();
    TableFormatter::new(COLUMNS, "material")
        .quiet(global.quiet)
        .output(rows, format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    if args.unit.trim().is_empty() {
        bail!("Unit cannot be empty");
    }

    let mut material = Material::new(args.title, args.unit, session.config.author());
    material.category = args.category;
    material.manufacturer = args.manufacturer;
    material.ce_reference = args.ce;
    material.reorder_level = args.reorder.as_deref().map(parse_decimal).transpose()?;
    if material.reorder_level.is_some_and(|r| r < Decimal::ZERO) {
        bail!("Reorder level cannot be negative");
    }

    let path = session.save(&material)?;
    print_created(global, &session.lab, &material, &path);
    Ok(())
}

fn run_show(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let material: Material = session.find(&args.id)?;

    match session.format(global) {
        OutputFormat::Id => println!("{}", material.id),
        f @ (OutputFormat::Yaml | OutputFormat::Json) => print_records(&material, f)?,
        _ => {
            let today = today();
            let mut lots: Vec<MaterialLot> = session
                .load_all::<MaterialLot>()?
                .into_iter()
                .filter(|l| l.material == material.id)
                .collect();
            lots.sort_by(|a, b| a.arrival_date.cmp(&b.arrival_date));
            let available = inventory::available_quantity(&lots, &material.id, today);

            rule();
            field("ID", style(&material.id).cyan());
            field("Title", style(&material.title).yellow());
            field("Category", material.category);
            if let Some(m) = &material.manufacturer {
                field("Manufacturer", m);
            }
            if let Some(ce) = &material.ce_reference {
                field("CE ref", ce);
            }
            field("Available", format!("{} {}", available, material.unit));
            if let Some(r) = material.reorder_level {
                let level = format!("{} {}", r, material.unit);
                if available <= r {
                    field("Reorder at", style(format!("{} (low)", level)).red());
                } else {
                    field("Reorder at", level);
                }
            }
            if !lots.is_empty() {
                println!();
                println!("{}", style("Lots (FIFO order)").bold());
                for lot in &lots {
                    println!(
                        "  {} {:<14} arrived {} expires {} remaining {}/{} [{}]",
                        style(lot.id.short()).cyan(),
                        lot.lot_number,
                        lot.arrival_date,
                        lot.expiry_date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        lot.quantity_remaining,
                        lot.quantity_received,
                        lot.state(today)
                    );
                }
            }
            rule();
        }
    }
    Ok(())
}
