//! PROD entity type - Catalog product (billable restoration type)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::worksheet::{MaterialRequirement, WorkKind};
use crate::impl_entity;

/// Catalog product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (PROD-xxx)
    pub id: EntityId,

    /// Product name, e.g. "Monolithic zirconia crown"
    pub title: String,

    /// Short catalog code, e.g. "ZR-CR"
    pub code: String,

    /// Work kind this product is normally charted as
    #[serde(default)]
    pub category: WorkKind,

    /// Net price per unit (per tooth)
    pub unit_price: Decimal,

    /// VAT rate in percent; falls back to the lab default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_rate: Option<Decimal>,

    /// Device description used on Annex XIII statements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_description: Option<String>,

    /// Materials consumed per unit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_materials: Vec<MaterialRequirement>,

    #[serde(default = "crate::core::entity::default_true")]
    pub active: bool,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "crate::core::entity::default_revision")]
    pub entity_revision: u32,
}

impl_entity!(Product, EntityPrefix::Prod, "product");

impl Product {
    pub fn new(code: String, title: String, unit_price: Decimal, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Prod),
            title,
            code,
            category: WorkKind::default(),
            unit_price,
            vat_rate: None,
            device_description: None,
            default_materials: Vec::new(),
            active: true,
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }

    /// VAT rate for this product given the lab default
    pub fn effective_vat(&self, lab_default: Decimal) -> Decimal {
        self.vat_rate.unwrap_or(lab_default)
    }

    pub fn describe(&self) -> &str {
        self.device_description.as_deref().unwrap_or(&self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_product_creation() {
        let p = Product::new(
            "ZR-CR".to_string(),
            "Zirconia crown".to_string(),
            dec!(180),
            "ana".to_string(),
        );
        assert!(p.id.to_string().starts_with("PROD-"));
        assert!(p.active);
        assert_eq!(p.describe(), "Zirconia crown");
    }

    #[test]
    fn test_effective_vat() {
        let mut p = Product::new(
            "ZR-CR".to_string(),
            "Zirconia crown".to_string(),
            dec!(180),
            "ana".to_string(),
        );
        assert_eq!(p.effective_vat(dec!(25)), dec!(25));
        p.vat_rate = Some(dec!(0));
        assert_eq!(p.effective_vat(dec!(25)), dec!(0));
    }
}
