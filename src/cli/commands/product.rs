//! `dlab product` command - Product catalog

use clap::Subcommand;
use console::style;
use miette::{bail, Result};
use rust_decimal::Decimal;

use crate::cli::helpers::{parse_decimal, Session};
use crate::cli::output::{
    confirm, field, index_listing, print_created, print_records, rule, wants_records, CellValue,
    ColumnDef, TableFormatter, TableRow,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::profile::LabProfile;
use crate::entities::material::Material;
use crate::entities::product::Product;
use crate::entities::worksheet::{MaterialRequirement, WorkKind};

#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    /// List catalog products
    List(ListArgs),

    /// Add a product to the catalog
    New(NewArgs),

    /// Show a product
    Show(IdArgs),

    /// Edit a product in your editor
    Edit(IdArgs),

    /// Withdraw a product from new worksheets
    Deactivate(IdArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include inactive products
    #[arg(long)]
    pub all: bool,

    /// Only products of this work kind
    #[arg(long, short = 'c')]
    pub category: Option<WorkKind>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Catalog code, e.g. ZR-CR
    #[arg(long)]
    pub code: String,

    /// Product name
    #[arg(long, short = 't')]
    pub title: String,

    /// Net price per unit
    #[arg(long)]
    pub price: String,

    /// VAT rate in percent (default: lab default)
    #[arg(long)]
    pub vat: Option<String>,

    #[arg(long, short = 'c', default_value = "crown")]
    pub category: WorkKind,

    /// Device description printed on Annex XIII statements
    #[arg(long)]
    pub device: Option<String>,

    /// Material used per unit as MATERIAL=QTY (repeatable)
    #[arg(long, short = 'm')]
    pub material: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Product ID, short ID (@N) or catalog code
    pub id: String,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 10),
    ColumnDef::new("title", "TITLE", 32),
    ColumnDef::new("category", "KIND", 13),
    ColumnDef::new("price", "PRICE", 10),
    ColumnDef::new("vat", "VAT %", 6),
];

pub fn run(cmd: ProductCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ProductCommands::List(args) => run_list(args, global),
        ProductCommands::New(args) => run_new(args, global),
        ProductCommands::Show(args) => run_show(args, global),
        ProductCommands::Edit(args) => {
            let session = Session::open(global)?;
            let product = find(&session, &args.id)?;
            session.edit::<Product>(&product.id.to_string())
        }
        ProductCommands::Deactivate(args) => run_deactivate(args, global),
    }
}

/// Resolve a product by catalog code, falling back to ID lookup
pub(crate) fn find(session: &Session, reference: &str) -> Result<Product> {
    let products: Vec<Product> = session.load_all()?;
    match products
        .into_iter()
        .find(|p| p.code.eq_ignore_ascii_case(reference))
    {
        Some(p) => Ok(p),
        None => session.find(reference),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let format = session.format(global);
    let default_vat = LabProfile::load(&session.lab)
        .map(|p| p.vat_rate)
        .map_err(|e| miette::miette!("{}", e))?;

    let mut products: Vec<Product> = session
        .load_all::<Product>()?
        .into_iter()
        .filter(|p| args.all || p.active)
        .filter(|p| args.category.map_or(true, |c| p.category == c))
        .collect();
    products.sort_by(|a, b| a.code.cmp(&b.code));

    if wants_records(format) {
        return print_records(&products, format);
    }
    if products.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    let index = index_listing(&session.lab, &products);
    let rows = products
        .iter()
        .map(|p| {
            TableRow::new(&p.id, &index)
                .cell("code", CellValue::Text(p.code.clone()))
                .cell("title", CellValue::Text(p.title.clone()))
                .cell("category", CellValue::Text(p.category.to_string()))
                .cell("price", CellValue::Money(p.unit_price))
                .cell("vat", CellValue::Quantity(p.effective_vat(default_vat)))
        })
        .collect();
    TableFormatter::new(COLUMNS, "product")
        .quiet(global.quiet)
        .output(rows, format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;

    let existing: Vec<Product> = session.load_all()?;
    if existing.iter().any(|p| p.code.eq_ignore_ascii_case(&args.code)) {
        bail!("A product with code '{}' already exists", args.code);
    }

    let price = parse_decimal(&args.price)?;
    if price < Decimal::ZERO {
        bail!("Price cannot be negative");
    }

    let mut product = Product::new(args.code, args.title, price, session.config.author());
    product.category = args.category;
    product.vat_rate = args.vat.as_deref().map(parse_decimal).transpose()?;
    product.device_description = args.device;

    for spec in &args.material {
        let Some((reference, qty)) = spec.split_once('=') else {
            bail!("Expected MATERIAL=QTY, got '{}'", spec);
        };
        let material: Material = session.find(reference.trim())?;
        let quantity = parse_decimal(qty)?;
        if quantity <= Decimal::ZERO {
            bail!("Material quantity must be positive ({})", spec);
        }
        product.default_materials.push(MaterialRequirement {
            material: material.id,
            quantity,
        });
    }

    let path = session.save(&product)?;
    print_created(global, &session.lab, &product, &path);
    Ok(())
}

fn run_show(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let product = find(&session, &args.id)?;

    match session.format(global) {
        OutputFormat::Id => println!("{}", product.id),
        f @ (OutputFormat::Yaml | OutputFormat::Json) => print_records(&product, f)?,
        _ => {
            rule();
            field("ID", style(&product.id).cyan());
            field("Code", style(&product.code).yellow());
            field("Title", &product.title);
            field("Kind", product.category);
            field("Price", format!("{:.2}", product.unit_price));
            match product.vat_rate {
                Some(v) => field("VAT", format!("{}%", v)),
                None => field("VAT", "lab default"),
            }
            if let Some(d) = &product.device_description {
                field("Device", d);
            }
            for (i, req) in product.default_materials.iter().enumerate() {
                let name = session
                    .lab
                    .load::<Material>(&req.material)
                    .map(|m| format!("{} {} {}", req.quantity, m.unit, m.title))
                    .unwrap_or_else(|_| format!("{} {}", req.quantity, req.material));
                field(if i == 0 { "Materials" } else { "" }, name);
            }
            if !product.active {
                field("Active", style("no").red());
            }
            rule();
        }
    }
    Ok(())
}

fn run_deactivate(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut product = find(&session, &args.id)?;
    product.active = false;
    product.entity_revision += 1;
    session.save(&product)?;
    confirm(global.quiet, format!("Deactivated {}", product.code));
    Ok(())
}
