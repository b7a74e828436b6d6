//! MAT entity type - Material master record

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};
use crate::impl_entity;

/// Material family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MaterialCategory {
    Ceramic,
    Zirconia,
    Alloy,
    Resin,
    Wax,
    Investment,
    #[default]
    Other,
}

impl std::fmt::Display for MaterialCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MaterialCategory::Ceramic => "ceramic",
            MaterialCategory::Zirconia => "zirconia",
            MaterialCategory::Alloy => "alloy",
            MaterialCategory::Resin => "resin",
            MaterialCategory::Wax => "wax",
            MaterialCategory::Investment => "investment",
            MaterialCategory::Other => "other",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for MaterialCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ceramic" => Ok(MaterialCategory::Ceramic),
            "zirconia" => Ok(MaterialCategory::Zirconia),
            "alloy" | "metal" => Ok(MaterialCategory::Alloy),
            "resin" | "acrylic" => Ok(MaterialCategory::Resin),
            "wax" => Ok(MaterialCategory::Wax),
            "investment" => Ok(MaterialCategory::Investment),
            "other" => Ok(MaterialCategory::Other),
            _ => Err(format!("Unknown material category: {}", s)),
        }
    }
}

/// Material used in restorations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// Unique identifier (MAT-xxx)
    pub id: EntityId,

    /// Trade name
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(default)]
    pub category: MaterialCategory,

    /// Stock unit (g, ml, pcs, disc)
    pub unit: String,

    /// CE certificate / declaration reference quoted on Annex XIII statements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ce_reference: Option<String>,

    /// Warn when available stock falls to or below this level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorder_level: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "crate::core::entity::default_revision")]
    pub entity_revision: u32,
}

impl_entity!(Material, EntityPrefix::Mat, "material");

impl Material {
    pub fn new(title: String, unit: String, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Mat),
            title,
            manufacturer: None,
            category: MaterialCategory::default(),
            unit,
            ce_reference: None,
            reorder_level: None,
            notes: None,
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_creation() {
        let mat = Material::new("Katana UTML".to_string(), "disc".to_string(), "ana".to_string());
        assert!(mat.id.to_string().starts_with("MAT-"));
        assert_eq!(mat.category, MaterialCategory::Other);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(
            "Zirconia".parse::<MaterialCategory>().unwrap(),
            MaterialCategory::Zirconia
        );
        assert_eq!(
            "metal".parse::<MaterialCategory>().unwrap(),
            MaterialCategory::Alloy
        );
        assert!("glass".parse::<MaterialCategory>().is_err());
    }
}
