//! `dlab team` command - Lab staff roster

use clap::{Args, Subcommand};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{bail, miette, IntoDiagnostic, Result};

use crate::cli::helpers::{truncate_str, Session};
use crate::cli::output::{confirm, print_records, wants_records};
use crate::cli::GlobalOpts;
use crate::core::team::{Role, TeamMember, TeamRoster};
use crate::core::workflow::{Actor, WorkflowEngine};
use crate::entities::worksheet::WorksheetStatus;

#[derive(Debug, Subcommand)]
pub enum TeamCommands {
    /// List team members
    List(TeamListArgs),
    /// Show the configured user and what they may do
    Whoami,
    /// Write a team roster template
    Init(TeamInitArgs),
    /// Add a team member
    Add(TeamAddArgs),
    /// Remove a team member
    Remove(TeamRemoveArgs),
}

#[derive(Debug, Args)]
pub struct TeamListArgs {
    /// Filter by role
    #[arg(long, short = 'r')]
    pub role: Option<Role>,
}

#[derive(Debug, Args)]
pub struct TeamInitArgs {
    /// Overwrite an existing team.yaml
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct TeamAddArgs {
    /// Member's full name
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub email: String,

    /// Username (matches `user` in config or DLAB_USER)
    #[arg(long)]
    pub username: String,

    /// Roles (comma-separated: technician,inspector,manager,admin)
    #[arg(long, value_delimiter = ',', required = true)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Args)]
pub struct TeamRemoveArgs {
    pub username: String,

    /// Skip confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl TeamCommands {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        match self {
            TeamCommands::List(args) => args.run(global),
            TeamCommands::Whoami => run_whoami(global),
            TeamCommands::Init(args) => args.run(global),
            TeamCommands::Add(args) => args.run(global),
            TeamCommands::Remove(args) => args.run(global),
        }
    }
}

impl TeamListArgs {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        let session = Session::open(global)?;
        let Some(roster) = session.roster()? else {
            bail!("No team roster found. Run 'dlab team init' to create one.");
        };

        let members: Vec<&TeamMember> = match self.role {
            Some(role) => roster.members_with_role(role).collect(),
            None => roster.active_members().collect(),
        };

        if wants_records(session.format(global)) {
            return print_records(&members, session.format(global));
        }
        if members.is_empty() {
            println!("No team members found.");
            return Ok(());
        }

        println!(
            "{:<20} {:<25} {:<15} {}",
            style("NAME").bold(),
            style("EMAIL").bold(),
            style("USERNAME").bold(),
            style("ROLES").bold()
        );
        println!("{}", "-".repeat(75));
        for member in members {
            println!(
                "{:<20} {:<25} {:<15} {}",
                truncate_str(&member.name, 18),
                truncate_str(&member.email, 23),
                style(truncate_str(&member.username, 13)).cyan(),
                roles_display(&member.roles)
            );
        }
        Ok(())
    }
}

fn run_whoami(global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let roster = session.roster()?;
    let actor = Actor::resolve(&session.config.username(), roster.as_ref());

    println!("Username: {}", style(&actor.username).cyan());
    let Some(roster) = roster else {
        println!("No team roster; every transition is allowed.");
        return Ok(());
    };
    let Some(member) = actor.member.as_ref() else {
        bail!(
            "'{}' is not in the team roster.\n\
             Add yourself with: dlab team add --name \"Your Name\" --username {} --roles technician",
            actor.username,
            actor.username
        );
    };

    println!("Name:     {}", member.name);
    println!("Roles:    {}", roles_display(&member.roles));
    println!("Active:   {}", member.active);

    let engine = WorkflowEngine::new(Some(roster));
    let allowed: Vec<String> = WorksheetStatus::all()
        .iter()
        .filter(|s| **s != WorksheetStatus::Draft)
        .filter(|s| engine.may_enter(**s, &actor))
        .map(|s| s.to_string())
        .collect();
    println!();
    println!("May move worksheets to: {}", allowed.join(", "));
    Ok(())
}

impl TeamInitArgs {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        let session = Session::open(global)?;
        let team_path = session.lab.dlab_dir().join("team.yaml");

        if team_path.exists() && !self.force {
            bail!(
                "Team roster already exists at {}\nUse --force to overwrite.",
                team_path.display()
            );
        }
        std::fs::write(&team_path, TeamRoster::default_template()).into_diagnostic()?;
        confirm(global.quiet, format!("Created team roster at {}", team_path.display()));
        Ok(())
    }
}

impl TeamAddArgs {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        let session = Session::open(global)?;
        let mut roster = session.roster()?.unwrap_or_default();

        if roster.find_member(&self.username).is_some() {
            bail!(
                "User '{}' already exists in the team roster.\n\
                 Use 'dlab team remove {}' first to update.",
                self.username,
                self.username
            );
        }

        roster.add_member(TeamMember {
            name: self.name.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            roles: self.roles.clone(),
            active: true,
        });
        roster.save(&session.lab).into_diagnostic()?;

        confirm(
            global.quiet,
            format!(
                "Added {} ({}) as {}",
                self.name,
                self.username,
                roles_display(&self.roles)
            ),
        );
        Ok(())
    }
}

impl TeamRemoveArgs {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        let session = Session::open(global)?;
        let mut roster = session
            .roster()?
            .ok_or_else(|| miette!("No team roster found."))?;

        let name = roster
            .find_member(&self.username)
            .map(|m| m.name.clone())
            .ok_or_else(|| miette!("User '{}' not found in team roster.", self.username))?;

        if !self.yes {
            let proceed = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("Remove {} ({}) from the roster?", name, self.username))
                .default(false)
                .interact()
                .into_diagnostic()?;
            if !proceed {
                println!("Aborted.");
                return Ok(());
            }
        }

        roster.remove_member(&self.username);
        roster.save(&session.lab).into_diagnostic()?;
        confirm(global.quiet, format!("Removed {} ({})", name, self.username));
        Ok(())
    }
}

fn roles_display(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
