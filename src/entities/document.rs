//! DOC entity type - Generated compliance document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};
use crate::impl_entity;

/// Kind of generated document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// MDR Annex XIII statement for a custom-made device
    AnnexXiii,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::AnnexXiii => write!(f, "annex_xiii"),
        }
    }
}

/// Output format of a rendered document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    #[default]
    Markdown,
    Html,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Markdown => "md",
            DocumentFormat::Html => "html",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Markdown => write!(f, "markdown"),
            DocumentFormat::Html => write!(f, "html"),
        }
    }
}

/// Record of a rendered document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (DOC-xxx)
    pub id: EntityId,

    pub title: String,

    pub kind: DocumentKind,

    /// Worksheet the document was issued for (WS-xxx)
    pub worksheet: EntityId,

    pub format: DocumentFormat,

    /// Rendered file, relative to the lab root
    pub file: String,

    /// Hex SHA-256 of the rendered content
    pub sha256: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatory: Option<String>,

    pub generated_at: DateTime<Utc>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "crate::core::entity::default_revision")]
    pub entity_revision: u32,
}

impl_entity!(Document, EntityPrefix::Doc, "document");
