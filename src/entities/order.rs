//! ORD entity type - Work order received from a dentist

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};
use crate::impl_entity;

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Open,
    Closed,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::Closed => write!(f, "closed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(OrderStatus::Open),
            "closed" => Ok(OrderStatus::Closed),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            _ => Err(format!(
                "Invalid order status: {}. Use open, closed, or cancelled",
                s
            )),
        }
    }
}

/// Work order (prescription) from a dentist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier (ORD-xxx)
    pub id: EntityId,

    pub title: String,

    /// Prescribing dentist (DENT-xxx)
    pub dentist: EntityId,

    /// Pseudonymised patient code; never a full name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_ref: Option<String>,

    pub received: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// Prescription as written by the dentist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub worksheets: Vec<EntityId>,

    #[serde(default)]
    pub status: OrderStatus,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "crate::core::entity::default_revision")]
    pub entity_revision: u32,
}

impl_entity!(Order, EntityPrefix::Ord, "order");

impl Order {
    pub fn new(title: String, dentist: EntityId, received: NaiveDate, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Ord),
            title,
            dentist,
            patient_ref: None,
            received,
            due_date: None,
            prescription: None,
            worksheets: Vec::new(),
            status: OrderStatus::Open,
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }

    pub fn link_worksheet(&mut self, worksheet: &EntityId) {
        if !self.worksheets.contains(worksheet) {
            self.worksheets.push(worksheet.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_creation() {
        let dentist = EntityId::new(EntityPrefix::Dent);
        let order = Order::new(
            "Crown 36".to_string(),
            dentist.clone(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            "ana".to_string(),
        );
        assert!(order.id.to_string().starts_with("ORD-"));
        assert_eq!(order.dentist, dentist);
        assert_eq!(order.status, OrderStatus::Open);
    }

    #[test]
    fn test_link_worksheet_once() {
        let mut order = Order::new(
            "Bridge".to_string(),
            EntityId::new(EntityPrefix::Dent),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            "ana".to_string(),
        );
        let ws = EntityId::new(EntityPrefix::Ws);
        order.link_worksheet(&ws);
        order.link_worksheet(&ws);
        assert_eq!(order.worksheets, vec![ws]);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Closed".parse::<OrderStatus>().unwrap(), OrderStatus::Closed);
        assert_eq!(
            "canceled".parse::<OrderStatus>().unwrap(),
            OrderStatus::Cancelled
        );
        assert!("done".parse::<OrderStatus>().is_err());
    }
}
