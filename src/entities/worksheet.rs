//! WS entity type - Production worksheet authored on an FDI tooth chart

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::workflow::TransitionRecord;
use crate::fdi::{self, ChartMark, FdiError, ToothNumber};
use crate::impl_entity;

/// Worksheet lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorksheetStatus {
    #[default]
    Draft,
    InProduction,
    QcPending,
    QcApproved,
    QcRejected,
    Delivered,
    Cancelled,
    Voided,
}

impl WorksheetStatus {
    pub fn all() -> &'static [WorksheetStatus] {
        &[
            WorksheetStatus::Draft,
            WorksheetStatus::InProduction,
            WorksheetStatus::QcPending,
            WorksheetStatus::QcApproved,
            WorksheetStatus::QcRejected,
            WorksheetStatus::Delivered,
            WorksheetStatus::Cancelled,
            WorksheetStatus::Voided,
        ]
    }

    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorksheetStatus::Cancelled | WorksheetStatus::Voided)
    }

    /// Work is still on the bench (not delivered, cancelled or voided)
    pub fn is_open(&self) -> bool {
        !matches!(
            self,
            WorksheetStatus::Delivered | WorksheetStatus::Cancelled | WorksheetStatus::Voided
        )
    }
}

impl std::fmt::Display for WorksheetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorksheetStatus::Draft => write!(f, "draft"),
            WorksheetStatus::InProduction => write!(f, "in_production"),
            WorksheetStatus::QcPending => write!(f, "qc_pending"),
            WorksheetStatus::QcApproved => write!(f, "qc_approved"),
            WorksheetStatus::QcRejected => write!(f, "qc_rejected"),
            WorksheetStatus::Delivered => write!(f, "delivered"),
            WorksheetStatus::Cancelled => write!(f, "cancelled"),
            WorksheetStatus::Voided => write!(f, "voided"),
        }
    }
}

impl std::str::FromStr for WorksheetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "draft" => Ok(WorksheetStatus::Draft),
            "in_production" | "production" => Ok(WorksheetStatus::InProduction),
            "qc_pending" => Ok(WorksheetStatus::QcPending),
            "qc_approved" | "approved" => Ok(WorksheetStatus::QcApproved),
            "qc_rejected" | "rejected" => Ok(WorksheetStatus::QcRejected),
            "delivered" => Ok(WorksheetStatus::Delivered),
            "cancelled" | "canceled" => Ok(WorksheetStatus::Cancelled),
            "voided" => Ok(WorksheetStatus::Voided),
            _ => Err(format!("Unknown worksheet status: {}", s)),
        }
    }
}

/// Kind of work performed on a tooth
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum WorkKind {
    #[default]
    Crown,
    Abutment,
    Pontic,
    Inlay,
    Onlay,
    Veneer,
    ImplantCrown,
    Denture,
    Splint,
    Other,
}

impl WorkKind {
    /// Fill colour on the tooth chart
    pub fn color(&self) -> &'static str {
        match self {
            WorkKind::Crown => "#f4a261",
            WorkKind::Abutment => "#e76f51",
            WorkKind::Pontic => "#e9c46a",
            WorkKind::Inlay | WorkKind::Onlay => "#2a9d8f",
            WorkKind::Veneer => "#8ecae6",
            WorkKind::ImplantCrown => "#9b5de5",
            WorkKind::Denture => "#cdb4db",
            WorkKind::Splint => "#a8dadc",
            WorkKind::Other => "#cccccc",
        }
    }

    /// Short label drawn on the chart
    pub fn label(&self) -> &'static str {
        match self {
            WorkKind::Crown => "CR",
            WorkKind::Abutment => "AB",
            WorkKind::Pontic => "PO",
            WorkKind::Inlay => "IN",
            WorkKind::Onlay => "ON",
            WorkKind::Veneer => "VE",
            WorkKind::ImplantCrown => "IC",
            WorkKind::Denture => "DE",
            WorkKind::Splint => "SP",
            WorkKind::Other => "OT",
        }
    }
}

impl std::fmt::Display for WorkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkKind::Crown => "crown",
            WorkKind::Abutment => "abutment",
            WorkKind::Pontic => "pontic",
            WorkKind::Inlay => "inlay",
            WorkKind::Onlay => "onlay",
            WorkKind::Veneer => "veneer",
            WorkKind::ImplantCrown => "implant_crown",
            WorkKind::Denture => "denture",
            WorkKind::Splint => "splint",
            WorkKind::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Work planned for one tooth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToothWork {
    pub tooth: ToothNumber,

    #[serde(default)]
    pub work: WorkKind,

    /// Catalog product (PROD-xxx) billed for this tooth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<EntityId>,

    /// Shade (e.g. VITA A2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shade: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Planned material usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    /// Material ID (MAT-xxx)
    pub material: EntityId,
    pub quantity: Decimal,
}

/// Quantity drawn from a specific material lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotConsumption {
    pub material: EntityId,
    pub lot: EntityId,
    pub lot_number: String,
    pub quantity: Decimal,
    pub consumed_at: DateTime<Utc>,
    /// Set when the quantity has been returned to the lot
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub returned: bool,
}

/// Production worksheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worksheet {
    /// Unique identifier (WS-xxx)
    pub id: EntityId,

    /// Short description, e.g. "Zirconia bridge 14-16"
    pub title: String,

    /// Originating order (ORD-xxx)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<EntityId>,

    /// Prescribing dentist (DENT-xxx)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dentist: Option<EntityId>,

    /// Pseudonymised patient reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_ref: Option<String>,

    /// Technician responsible (roster username)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teeth: Vec<ToothWork>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<MaterialRequirement>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumptions: Vec<LotConsumption>,

    #[serde(default)]
    pub status: WorksheetStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<TransitionRecord>,

    /// QC inspections (QC-xxx), oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qc_records: Vec<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<EntityId>,

    /// Annex XIII statement (DOC-xxx)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annex_xiii: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "crate::core::entity::default_revision")]
    pub entity_revision: u32,
}

impl_entity!(Worksheet, EntityPrefix::Ws, "worksheet");

impl Worksheet {
    pub fn new(title: String, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Ws),
            title,
            order: None,
            dentist: None,
            patient_ref: None,
            technician: None,
            due_date: None,
            teeth: Vec::new(),
            materials: Vec::new(),
            consumptions: Vec::new(),
            status: WorksheetStatus::Draft,
            history: Vec::new(),
            qc_records: Vec::new(),
            invoice: None,
            annex_xiii: None,
            delivered_at: None,
            notes: None,
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }

    /// Tooth work and material plan may only change while drafting
    pub fn is_editable(&self) -> bool {
        self.status == WorksheetStatus::Draft
    }

    /// Add or replace the work on a tooth, keeping chart order
    pub fn set_tooth(&mut self, work: ToothWork) {
        self.teeth.retain(|w| w.tooth != work.tooth);
        self.teeth.push(work);
        self.teeth.sort_by(|a, b| a.tooth.cmp(&b.tooth));
    }

    pub fn remove_tooth(&mut self, tooth: ToothNumber) -> bool {
        let before = self.teeth.len();
        self.teeth.retain(|w| w.tooth != tooth);
        self.teeth.len() < before
    }

    /// Plan a bridge between two teeth of one arch
    ///
    /// The two end teeth become abutments and every tooth in between a pontic.
    pub fn add_bridge(
        &mut self,
        from: ToothNumber,
        to: ToothNumber,
        product: Option<EntityId>,
        shade: Option<String>,
    ) -> Result<Vec<ToothNumber>, FdiError> {
        let teeth = fdi::span(from, to)?;
        if teeth.len() < 2 {
            return Err(FdiError::InvalidRange(format!("{}-{}", from, to)));
        }
        let last = teeth.len() - 1;
        for (i, tooth) in teeth.iter().enumerate() {
            let work = if i == 0 || i == last {
                WorkKind::Abutment
            } else {
                WorkKind::Pontic
            };
            self.set_tooth(ToothWork {
                tooth: *tooth,
                work,
                product: product.clone(),
                shade: shade.clone(),
                notes: None,
            });
        }
        Ok(teeth)
    }

    /// Add to the planned quantity of a material, merging duplicate entries
    pub fn add_material(&mut self, material: EntityId, quantity: Decimal) {
        if let Some(existing) = self.materials.iter_mut().find(|m| m.material == material) {
            existing.quantity += quantity;
        } else {
            self.materials.push(MaterialRequirement { material, quantity });
        }
    }

    pub fn tooth_numbers(&self) -> Vec<ToothNumber> {
        self.teeth.iter().map(|w| w.tooth).collect()
    }

    /// Compact tooth list, e.g. "14, 15, 16"
    pub fn teeth_display(&self) -> String {
        self.teeth
            .iter()
            .map(|w| w.tooth.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Consumptions still charged to the worksheet (not returned)
    pub fn active_consumptions(&self) -> impl Iterator<Item = &LotConsumption> {
        self.consumptions.iter().filter(|c| !c.returned)
    }

    /// Number of teeth per product, for billing
    pub fn product_counts(&self) -> BTreeMap<EntityId, u32> {
        let mut counts = BTreeMap::new();
        for work in &self.teeth {
            if let Some(product) = &work.product {
                *counts.entry(product.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Chart marks coloured by work kind
    pub fn chart_marks(&self) -> Vec<ChartMark> {
        self.teeth
            .iter()
            .map(|w| ChartMark {
                tooth: w.tooth,
                fill: w.work.color().to_string(),
                label: Some(w.work.label().to_string()),
            })
            .collect()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date.is_some_and(|d| d < today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn t(code: u8) -> ToothNumber {
        ToothNumber::try_from(code).unwrap()
    }

    #[test]
    fn test_worksheet_creation() {
        let ws = Worksheet::new("Crown 36".to_string(), "ana".to_string());
        assert!(ws.id.to_string().starts_with("WS-"));
        assert_eq!(ws.status, WorksheetStatus::Draft);
        assert!(ws.is_editable());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in WorksheetStatus::all() {
            let parsed: WorksheetStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, *status);
        }
        assert_eq!(
            "qc-pending".parse::<WorksheetStatus>().unwrap(),
            WorksheetStatus::QcPending
        );
    }

    #[test]
    fn test_set_tooth_replaces_and_sorts() {
        let mut ws = Worksheet::new("Test".to_string(), "ana".to_string());
        ws.set_tooth(ToothWork {
            tooth: t(21),
            work: WorkKind::Crown,
            product: None,
            shade: None,
            notes: None,
        });
        ws.set_tooth(ToothWork {
            tooth: t(11),
            work: WorkKind::Veneer,
            product: None,
            shade: None,
            notes: None,
        });
        ws.set_tooth(ToothWork {
            tooth: t(21),
            work: WorkKind::Veneer,
            product: None,
            shade: Some("A2".to_string()),
            notes: None,
        });
        assert_eq!(ws.tooth_numbers(), vec![t(11), t(21)]);
        assert_eq!(ws.teeth[1].shade.as_deref(), Some("A2"));
        assert!(ws.remove_tooth(t(11)));
        assert!(!ws.remove_tooth(t(11)));
    }

    #[test]
    fn test_add_bridge() {
        let mut ws = Worksheet::new("Bridge".to_string(), "ana".to_string());
        let product = EntityId::new(EntityPrefix::Prod);
        let teeth = ws
            .add_bridge(t(16), t(14), Some(product.clone()), None)
            .unwrap();
        assert_eq!(teeth, vec![t(16), t(15), t(14)]);
        assert_eq!(ws.teeth[0].work, WorkKind::Abutment);
        assert_eq!(ws.teeth[1].work, WorkKind::Pontic);
        assert_eq!(ws.teeth[2].work, WorkKind::Abutment);
        assert_eq!(ws.product_counts().get(&product), Some(&3));

        assert!(ws.add_bridge(t(16), t(46), None, None).is_err());
        assert!(ws.add_bridge(t(16), t(16), None, None).is_err());
    }

    #[test]
    fn test_add_material_merges() {
        let mut ws = Worksheet::new("Test".to_string(), "ana".to_string());
        let mat = EntityId::new(EntityPrefix::Mat);
        ws.add_material(mat.clone(), dec!(1.5));
        ws.add_material(mat.clone(), dec!(2));
        assert_eq!(ws.materials.len(), 1);
        assert_eq!(ws.materials[0].quantity, dec!(3.5));
    }

    #[test]
    fn test_overdue() {
        let mut ws = Worksheet::new("Test".to_string(), "ana".to_string());
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert!(!ws.is_overdue(today));
        ws.due_date = NaiveDate::from_ymd_opt(2026, 3, 9);
        assert!(ws.is_overdue(today));
        ws.status = WorksheetStatus::Delivered;
        assert!(!ws.is_overdue(today));
    }

    #[test]
    fn test_worksheet_deserialization() {
        let yaml = r#"
id: WS-01HC2JB7SMQX7RS1Y0GFKBHPTD
title: "Zirconia crown 36"
patient_ref: "PT-0042"
teeth:
  - tooth: 36
    work: crown
    shade: A3
materials:
  - material: MAT-01HC2JB7SMQX7RS1Y0GFKBHPTE
    quantity: 12.5
status: qc_pending
created: 2026-01-15T10:00:00Z
author: "ana"
"#;
        let ws: Worksheet = serde_yml::from_str(yaml).unwrap();
        assert_eq!(ws.teeth[0].tooth, t(36));
        assert_eq!(ws.teeth[0].work, WorkKind::Crown);
        assert_eq!(ws.materials[0].quantity, dec!(12.5));
        assert_eq!(ws.status, WorksheetStatus::QcPending);
        assert_eq!(ws.entity_revision, 1);
    }

    #[test]
    fn test_invalid_tooth_rejected_on_load() {
        let yaml = r#"
id: WS-01HC2JB7SMQX7RS1Y0GFKBHPTD
title: "Bad"
teeth:
  - tooth: 19
created: 2026-01-15T10:00:00Z
author: "ana"
"#;
        assert!(serde_yml::from_str::<Worksheet>(yaml).is_err());
    }
}
