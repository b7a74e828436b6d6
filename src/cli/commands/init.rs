//! `dlab init` command - Initialize a new lab directory

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::identity::EntityPrefix;
use crate::core::lab::{Lab, LabError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Re-create missing directories even if .dlab/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let lab = if args.force {
        Lab::init_force(&path)
    } else {
        Lab::init(&path)
    };

    match lab {
        Ok(lab) => {
            println!(
                "{} Initialized lab at {}",
                style("✓").green(),
                style(lab.root().display()).cyan()
            );
            println!();
            println!("Created lab structure:");
            print_structure(lab.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Fill in manufacturer name, SRN and bank accounts",
                style("$EDITOR .dlab/lab.yaml").yellow()
            );
            println!(
                "  {} Register a prescribing dentist",
                style("dlab dentist new").yellow()
            );
            println!(
                "  {} Add your staff and their roles",
                style("dlab team add").yellow()
            );
            Ok(())
        }
        Err(LabError::AlreadyExists(path)) => {
            println!(
                "{} Lab already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("dlab init --force").yellow());
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let mut entries = vec![
        ".dlab/config.yaml".to_string(),
        ".dlab/lab.yaml".to_string(),
    ];
    entries.extend(
        EntityPrefix::all()
            .iter()
            .map(|p| format!("{}/", p.directory())),
    );
    entries.push(format!("{}/", Lab::RENDERED_DIR));

    for entry in entries {
        if root.join(&entry).exists() {
            println!("  {}", style(entry).dim());
        }
    }
}
