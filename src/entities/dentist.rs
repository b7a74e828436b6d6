//! DENT entity type - Prescribing dentist / practice

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};
use crate::impl_entity;

/// Dentist who prescribes custom-made devices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dentist {
    /// Unique identifier (DENT-xxx)
    pub id: EntityId,

    /// Full name, e.g. "Dr. Maja Horvat"
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice: Option<String>,

    /// Chamber / license registration number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Postal address, one line per entry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<String>,

    /// Inactive dentists are hidden from listings and cannot receive new orders
    #[serde(default = "crate::core::entity::default_true")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "crate::core::entity::default_revision")]
    pub entity_revision: u32,
}

impl_entity!(Dentist, EntityPrefix::Dent, "dentist");

impl Dentist {
    pub fn new(name: String, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Dent),
            title: name,
            practice: None,
            license_number: None,
            email: None,
            phone: None,
            address: Vec::new(),
            active: true,
            notes: None,
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }

    /// "Name, Practice" for document headers
    pub fn display_name(&self) -> String {
        match &self.practice {
            Some(p) if !p.is_empty() => format!("{}, {}", self.title, p),
            _ => self.title.clone(),
        }
    }
}
