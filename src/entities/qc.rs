//! QC entity type - Final inspection of a worksheet before delivery

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};
use crate::impl_entity;

/// Inspection outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcVerdict {
    Pass,
    Fail,
}

impl std::fmt::Display for QcVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QcVerdict::Pass => write!(f, "pass"),
            QcVerdict::Fail => write!(f, "fail"),
        }
    }
}

/// One checklist item and its result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcCheck {
    pub item: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Quality-control record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityControl {
    /// Unique identifier (QC-xxx)
    pub id: EntityId,

    pub title: String,

    /// Inspected worksheet (WS-xxx)
    pub worksheet: EntityId,

    /// Inspector username
    pub inspector: String,

    pub inspected_at: DateTime<Utc>,

    #[serde(default)]
    pub checks: Vec<QcCheck>,

    pub verdict: QcVerdict,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "crate::core::entity::default_revision")]
    pub entity_revision: u32,
}

impl_entity!(QualityControl, EntityPrefix::Qc, "qc");

impl QualityControl {
    pub fn new(
        worksheet: EntityId,
        inspector: String,
        checks: Vec<QcCheck>,
        verdict: QcVerdict,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Qc),
            title: format!("QC {} ({})", worksheet.short(), verdict),
            worksheet,
            author: inspector.clone(),
            inspector,
            inspected_at: now,
            checks,
            verdict,
            notes,
            created: now,
            entity_revision: 1,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_items(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.item.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(item: &str, passed: bool) -> QcCheck {
        QcCheck {
            item: item.to_string(),
            passed,
            note: None,
        }
    }

    #[test]
    fn test_qc_record() {
        let ws = EntityId::new(EntityPrefix::Ws);
        let qc = QualityControl::new(
            ws.clone(),
            "ivan".to_string(),
            vec![check("fit", true), check("shade", false)],
            QcVerdict::Fail,
            Some("shade too light".to_string()),
        );
        assert!(qc.id.to_string().starts_with("QC-"));
        assert_eq!(qc.worksheet, ws);
        assert!(!qc.all_passed());
        assert_eq!(qc.failed_items(), vec!["shade"]);
        assert!(qc.title.contains("fail"));
    }
}
