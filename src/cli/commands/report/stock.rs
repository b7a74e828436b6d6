//! Stock report

use miette::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{today, Session};
use crate::cli::GlobalOpts;
use crate::core::profile::LabProfile;
use crate::core::report::stock_report;
use crate::entities::lot::MaterialLot;
use crate::entities::material::Material;

use super::write_output;

#[derive(clap::Args, Debug)]
pub struct StockArgs {
    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Expiry warning window in days (default: lab setting)
    #[arg(long)]
    pub days: Option<i64>,
}

pub fn run(args: StockArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let profile = LabProfile::load(&session.lab).map_err(|e| miette::miette!("{}", e))?;
    let today = today();
    let days = args.days.unwrap_or(profile.expiry_warning_days);

    let materials: Vec<Material> = session.load_all()?;
    let lots: Vec<MaterialLot> = session.load_all()?;
    let names: HashMap<_, _> = materials
        .iter()
        .map(|m| (m.id.clone(), (m.title.clone(), m.unit.clone())))
        .collect();
    let report =
        stock_report(&materials, &lots, today, days).map_err(|e| miette::miette!("{}", e))?;

    let mut output = String::new();
    output.push_str("# Stock Report\n\n");
    output.push_str(&format!("Date: {}\n\n", today));

    output.push_str("## Stock Levels\n\n");
    let mut levels = Builder::default();
    levels.push_record(["Material", "Available", "Unit", "Lots", "Reorder At", "Low"]);
    for level in &report.levels {
        levels.push_record([
            level.name.clone(),
            level.available.normalize().to_string(),
            level.unit.clone(),
            level.usable_lots.to_string(),
            level
                .reorder_level
                .map(|r| r.normalize().to_string())
                .unwrap_or_default(),
            if level.is_low() { "yes".to_string() } else { String::new() },
        ]);
    }
    output.push_str(&levels.build().with(Style::markdown()).to_string());
    output.push('\n');

    let lot_table = |lots: &[&MaterialLot]| {
        let mut table = Builder::default();
        table.push_record(["Material", "Lot", "Expires", "Remaining"]);
        for lot in lots {
            let (name, unit) = names
                .get(&lot.material)
                .cloned()
                .unwrap_or_else(|| (lot.material.short(), String::new()));
            table.push_record([
                name,
                lot.lot_number.clone(),
                lot.expiry_date.map(|d| d.to_string()).unwrap_or_default(),
                format!("{} {}", lot.quantity_remaining.normalize(), unit),
            ]);
        }
        table.build().with(Style::markdown()).to_string()
    };

    let low: Vec<_> = report.low().collect();
    if !low.is_empty() {
        output.push_str("\n## Reorder\n\n");
        for level in low {
            output.push_str(&format!(
                "- {}: {} {} left\n",
                level.name,
                level.available.normalize(),
                level.unit
            ));
        }
    }

    if !report.expiring.is_empty() {
        output.push_str(&format!("\n## Expiring Within {} Days\n\n", days));
        output.push_str(&lot_table(report.expiring.as_slice()));
        output.push('\n');
    }

    if !report.expired.is_empty() {
        output.push_str("\n## Expired With Stock Left\n\n");
        output.push_str(&lot_table(report.expired.as_slice()));
        output.push('\n');
    }

    write_output(&output, args.output)
}
