//! `dlab chart` command - Render a worksheet's tooth chart as SVG

use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::Session;
use crate::cli::output::confirm;
use crate::cli::GlobalOpts;
use crate::entities::worksheet::Worksheet;
use crate::fdi::{render_svg, ChartLayout, DentitionMode};

#[derive(clap::Args, Debug)]
pub struct ChartArgs {
    /// Worksheet ID or short ID (@N)
    pub ws: String,

    /// Output file (default: print the SVG to stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Show both permanent and deciduous teeth
    #[arg(long)]
    pub mixed: bool,
}

pub fn run(args: ChartArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let ws: Worksheet = session.find(&args.ws)?;

    let mode = if args.mixed {
        DentitionMode::Mixed
    } else {
        DentitionMode::covering(&ws.tooth_numbers())
    };
    let svg = render_svg(&ChartLayout::new(mode), &ws.chart_marks());

    match args.output {
        Some(path) => {
            std::fs::write(&path, svg).into_diagnostic()?;
            confirm(global.quiet, format!("Wrote {}", path.display()));
        }
        None => print!("{}", svg),
    }
    Ok(())
}
