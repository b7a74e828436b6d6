//! Shared helper functions for CLI commands

use chrono::{Local, NaiveDate};
use clap::ValueEnum;
use console::style;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::entity::Entity;
use crate::core::lab::Lab;
use crate::core::loader;
use crate::core::team::TeamRoster;
use crate::core::workflow::Actor;

/// Everything a command needs about the lab it runs in
pub struct Session {
    pub lab: Lab,
    pub config: Config,
}

impl Session {
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let lab = Lab::open(global.lab.as_deref()).map_err(|e| miette::miette!("{}", e))?;
        let config = Config::load(Some(&lab));
        Ok(Self { lab, config })
    }

    /// Format to use for list/show output
    pub fn format(&self, global: &GlobalOpts) -> OutputFormat {
        if global.format != OutputFormat::Auto {
            return global.format;
        }
        self.config
            .default_format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
            .unwrap_or(OutputFormat::Auto)
    }

    /// The configured user, resolved against the team roster
    pub fn actor(&self) -> Result<Actor> {
        let roster = self.roster()?;
        Ok(Actor::resolve(&self.config.username(), roster.as_ref()))
    }

    /// The lab's team roster, if one is configured
    pub fn roster(&self) -> Result<Option<TeamRoster>> {
        TeamRoster::load(&self.lab).map_err(|e| miette::miette!("{}", e))
    }

    /// Resolve a reference (`@N`, id or id prefix) and load the record
    pub fn find<T: Entity>(&self, reference: &str) -> Result<T> {
        self.lab
            .find(reference)
            .map_err(|e| miette::miette!("{}", e))
    }

    pub fn save<T: Entity>(&self, entity: &T) -> Result<std::path::PathBuf> {
        self.lab.save(entity).map_err(|e| miette::miette!("{}", e))
    }

    pub fn load_all<T: Entity>(&self) -> Result<Vec<T>> {
        self.lab.load_all().map_err(|e| miette::miette!("{}", e))
    }

    /// Open a record in the editor, then check it still parses
    pub fn edit<T: Entity>(&self, reference: &str) -> Result<()> {
        let id = self
            .lab
            .resolve_id(T::PREFIX, reference)
            .map_err(|e| miette::miette!("{}", e))?;
        let path = self.lab.entity_path(&id);

        println!(
            "Opening {} in {}...",
            style(&id).cyan(),
            style(self.config.editor()).yellow()
        );
        self.config.run_editor(&path).into_diagnostic()?;

        loader::read_entity::<T>(&path)
            .map_err(|e| miette::miette!("{} was saved but no longer parses: {}", id, e))?;
        Ok(())
    }
}

/// Truncate a string to `max_len` characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output (RFC 4180)
pub fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Parse a `YYYY-MM-DD` date; `today` is accepted too
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    if s.eq_ignore_ascii_case("today") {
        return Ok(today());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| miette::miette!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s.trim()).map_err(|_| miette::miette!("Invalid number '{}'", s))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
