//! `dlab dentist` command - Prescribing dentists

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input};
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::Session;
use crate::cli::output::{
    confirm, field, index_listing, print_created, print_records, rule, wants_records, CellValue,
    ColumnDef, TableFormatter, TableRow,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::dentist::Dentist;
use crate::entities::order::Order;

#[derive(Subcommand, Debug)]
pub enum DentistCommands {
    /// List dentists
    List(ListArgs),

    /// Register a dentist
    New(NewArgs),

    /// Show a dentist's details
    Show(ShowArgs),

    /// Edit a dentist in your editor
    Edit(ShowArgs),

    /// Hide a dentist from listings and new orders
    Deactivate(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include inactive dentists
    #[arg(long)]
    pub all: bool,

    /// Search in name and practice
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Full name, e.g. "Dr. Maja Horvat" (prompted if omitted)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    #[arg(long, short = 'p')]
    pub practice: Option<String>,

    /// License / chamber registration number
    #[arg(long, short = 'l')]
    pub license: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// Address line (repeat for several lines)
    #[arg(long, short = 'a')]
    pub address: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Dentist ID or short ID (@N)
    pub id: String,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("name", "NAME", 28),
    ColumnDef::new("practice", "PRACTICE", 28),
    ColumnDef::new("license", "LICENSE", 14),
    ColumnDef::new("email", "EMAIL", 28),
];

pub fn run(cmd: DentistCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DentistCommands::List(args) => run_list(args, global),
        DentistCommands::New(args) => run_new(args, global),
        DentistCommands::Show(args) => run_show(args, global),
        DentistCommands::Edit(args) => Session::open(global)?.edit::<Dentist>(&args.id),
        DentistCommands::Deactivate(args) => run_deactivate(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let format = session.format(global);

    let mut dentists: Vec<Dentist> = session
        .load_all::<Dentist>()?
        .into_iter()
        .filter(|d| args.all || d.active)
        .filter(|d| match &args.search {
            Some(q) => {
                let q = q.to_lowercase();
                d.title.to_lowercase().contains(&q)
                    || d.practice
                        .as_deref()
                        .is_some_and(|p| p.to_lowercase().contains(&q))
            }
            None => true,
        })
        .collect();
    dentists.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));

    if wants_records(format) {
        return print_records(&dentists, format);
    }
    if dentists.is_empty() {
        println!("No dentists found.");
        return Ok(());
    }

    let index = index_listing(&session.lab, &dentists);
    let rows = dentists
        .iter()
        .map(|d| {
            TableRow::new(&d.id, &index)
                .cell("name", CellValue::Text(d.title.clone()))
                .cell("practice", CellValue::opt_text(d.practice.as_deref()))
                .cell("license", CellValue::opt_text(d.license_number.as_deref()))
                .cell("email", CellValue::opt_text(d.email.as_deref()))
        })
        .collect();
    TableFormatter::new(COLUMNS, "dentist")
        .quiet(global.quiet)
        .output(rows, format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;

    let name = match args.name {
        Some(name) => name,
        None => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Dentist name")
            .interact_text()
            .into_diagnostic()?,
    };

    let mut dentist = Dentist::new(name, session.config.author());
    dentist.practice = args.practice;
    dentist.license_number = args.license;
    dentist.email = args.email;
    dentist.phone = args.phone;
    dentist.address = args.address;

    let path = session.save(&dentist)?;
    print_created(global, &session.lab, &dentist, &path);
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let dentist: Dentist = session.find(&args.id)?;

    match session.format(global) {
        OutputFormat::Id => println!("{}", dentist.id),
        f @ (OutputFormat::Yaml | OutputFormat::Json) => print_records(&dentist, f)?,
        _ => {
            let orders: Vec<Order> = session
                .load_all::<Order>()?
                .into_iter()
                .filter(|o| o.dentist == dentist.id)
                .collect();

            rule();
            field("ID", style(&dentist.id).cyan());
            field("Name", style(&dentist.title).yellow());
            if let Some(p) = &dentist.practice {
                field("Practice", p);
            }
            if let Some(l) = &dentist.license_number {
                field("License", l);
            }
            if let Some(e) = &dentist.email {
                field("Email", e);
            }
            if let Some(p) = &dentist.phone {
                field("Phone", p);
            }
            for (i, line) in dentist.address.iter().enumerate() {
                field(if i == 0 { "Address" } else { "" }, line);
            }
            if !dentist.active {
                field("Active", style("no").red());
            }
            field("Orders", orders.len());
            rule();
        }
    }
    Ok(())
}

fn run_deactivate(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let mut dentist: Dentist = session.find(&args.id)?;
    dentist.active = false;
    dentist.entity_revision += 1;
    session.save(&dentist)?;
    confirm(global.quiet, format!("Deactivated {}", dentist.title));
    Ok(())
}
