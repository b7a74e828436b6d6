//! LOT entity type - Material lot (supplier batch) held in stock

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};
use crate::impl_entity;

/// Material lot / batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLot {
    /// Unique identifier (LOT-xxx)
    pub id: EntityId,

    /// Descriptive title (defaults to "<material> <lot number>")
    pub title: String,

    /// Material this lot belongs to (MAT-xxx)
    pub material: EntityId,

    /// Manufacturer's lot / batch number as printed on the packaging
    pub lot_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,

    /// Date the lot arrived at the lab (FIFO key)
    pub arrival_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,

    pub quantity_received: Decimal,

    pub quantity_remaining: Decimal,

    /// Blocked from consumption (e.g. pending incoming inspection)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub quarantined: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "crate::core::entity::default_revision")]
    pub entity_revision: u32,
}

impl_entity!(MaterialLot, EntityPrefix::Lot, "lot");

impl MaterialLot {
    /// Receive a new lot with its full quantity in stock
    pub fn receive(
        material: EntityId,
        lot_number: String,
        arrival_date: NaiveDate,
        quantity: Decimal,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Lot),
            title: lot_number.clone(),
            material,
            lot_number,
            supplier: None,
            arrival_date,
            expiry_date: None,
            quantity_received: quantity,
            quantity_remaining: quantity,
            quarantined: false,
            notes: None,
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }

    /// Expired lots have an expiry date strictly before `today`
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|d| d < today)
    }

    pub fn is_depleted(&self) -> bool {
        self.quantity_remaining <= Decimal::ZERO
    }

    /// Quantity already drawn from the lot
    pub fn consumed(&self) -> Decimal {
        self.quantity_received - self.quantity_remaining
    }

    /// Stock state label for listings
    pub fn state(&self, today: NaiveDate) -> &'static str {
        if self.quarantined {
            "quarantined"
        } else if self.is_depleted() {
            "depleted"
        } else if self.is_expired(today) {
            "expired"
        } else {
            "available"
        }
    }
}
