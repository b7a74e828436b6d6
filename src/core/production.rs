//! Worksheet transitions with their side effects
//!
//! The workflow engine decides whether a move is allowed; this module does
//! what entering the target status implies (stock consumption, QC records,
//! delivery stamps, restocking) and persists every record it touches.
//!
//! Changes are staged in memory first. The worksheet is written before the
//! lots it draws from, and a failed lot write puts the stored records back.

use chrono::{Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fs;
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::core::inventory::{self, InventoryError, LotDraw};
use crate::core::lab::{Lab, LabError};
use crate::core::profile::{LabProfile, ProfileError};
use crate::core::team::{RosterError, TeamRoster};
use crate::core::workflow::{Actor, TransitionRecord, WorkflowEngine, WorkflowError};
use crate::documents;
use crate::entities::document::{Document, DocumentKind};
use crate::entities::lot::MaterialLot;
use crate::entities::qc::{QcCheck, QcVerdict, QualityControl};
use crate::entities::worksheet::{LotConsumption, Worksheet, WorksheetStatus};

#[derive(Debug, Error)]
pub enum ProductionError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Lab(#[from] LabError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error("worksheet {0} has no tooth work; add teeth before starting production")]
    NoTeeth(String),

    #[error("QC outcomes are recorded with `dlab qc approve` / `dlab qc reject`")]
    UseInspect,

    #[error("worksheet is {0}, only qc_pending worksheets can be inspected")]
    NotInspectable(WorksheetStatus),

    #[error("cannot approve: checklist items not passed: {}", .0.join(", "))]
    ChecklistIncomplete(Vec<String>),

    #[error("unknown checklist item '{0}'")]
    UnknownChecklistItem(String),

    #[error("a rejection needs at least one failed check or a reason")]
    RejectWithoutReason,

    #[error("'{0}' is the worksheet technician; QC must be done by someone else")]
    NotIndependent(String),

    #[error("worksheet {0} has no Annex XIII statement; run `dlab doc annex` first")]
    MissingAnnex(String),

    #[error("document {document} is not an Annex XIII statement for worksheet {worksheet}")]
    AnnexMismatch { document: String, worksheet: String },

    #[error("Annex XIII file {file} of document {document} is missing; run `dlab doc annex` again")]
    AnnexFileMissing { document: String, file: String },

    #[error("Annex XIII file {file} of document {document} was modified after generation; run `dlab doc annex` again")]
    AnnexModified { document: String, file: String },

    #[error("voiding a delivered worksheet requires a reason (--comment)")]
    VoidWithoutReason,

    #[error("extra material can only be booked while in production (worksheet is {0})")]
    NotInProduction(WorksheetStatus),
}

/// Lots touched by a staged change, as stored and as updated
#[derive(Debug, Default)]
struct LotChanges {
    stored: Vec<MaterialLot>,
    updated: Vec<MaterialLot>,
}

impl LotChanges {
    fn collect<'i>(
        stored: Vec<MaterialLot>,
        updated: Vec<MaterialLot>,
        touched: impl Iterator<Item = &'i EntityId>,
    ) -> Self {
        let touched: HashSet<&EntityId> = touched.collect();
        let stored: Vec<MaterialLot> = stored
            .into_iter()
            .filter(|l| touched.contains(&l.id))
            .collect();
        let updated = updated
            .into_iter()
            .filter(|l| touched.contains(&l.id))
            .map(|mut lot| {
                lot.entity_revision += 1;
                lot
            })
            .collect();
        Self { stored, updated }
    }
}

/// Production service bound to one lab
pub struct Production<'a> {
    lab: &'a Lab,
    engine: WorkflowEngine,
    profile: LabProfile,
    today: NaiveDate,
}

impl<'a> Production<'a> {
    pub fn new(lab: &'a Lab, roster: Option<TeamRoster>, profile: LabProfile) -> Self {
        Self {
            lab,
            engine: WorkflowEngine::new(roster),
            profile,
            today: Local::now().date_naive(),
        }
    }

    /// Load roster and profile from the lab
    pub fn open(lab: &'a Lab) -> Result<Self, ProductionError> {
        let profile = LabProfile::load(lab)?;
        Ok(Self::new(lab, TeamRoster::load(lab)?, profile))
    }

    /// Override the date used for lot expiry checks
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    pub fn profile(&self) -> &LabProfile {
        &self.profile
    }

    /// Move a worksheet to `to`, applying the side effects of the target status
    ///
    /// QC outcomes go through [`Production::inspect`] instead.
    pub fn transition(
        &self,
        ws: &mut Worksheet,
        to: WorksheetStatus,
        actor: &Actor,
        comment: Option<String>,
    ) -> Result<TransitionRecord, ProductionError> {
        if matches!(to, WorksheetStatus::QcApproved | WorksheetStatus::QcRejected) {
            return Err(ProductionError::UseInspect);
        }
        self.apply(ws, to, actor, comment)
    }

    /// Apply a transition; on error `ws` is left as it was
    fn apply(
        &self,
        ws: &mut Worksheet,
        to: WorksheetStatus,
        actor: &Actor,
        comment: Option<String>,
    ) -> Result<TransitionRecord, ProductionError> {
        let before = ws.clone();
        let result = self.stage_and_commit(ws, to, actor, comment);
        if result.is_err() {
            *ws = before;
        }
        result
    }

    fn stage_and_commit(
        &self,
        ws: &mut Worksheet,
        to: WorksheetStatus,
        actor: &Actor,
        comment: Option<String>,
    ) -> Result<TransitionRecord, ProductionError> {
        let from = ws.status;
        let role = self.engine.can_transition(from, to, actor)?;

        let lots = match to {
            WorksheetStatus::InProduction if from == WorksheetStatus::Draft => {
                if ws.teeth.is_empty() {
                    return Err(ProductionError::NoTeeth(ws.id.to_string()));
                }
                let lots = self.consume_requirements(ws)?;
                if ws.technician.is_none() {
                    ws.technician = Some(actor.username.clone());
                }
                lots
            }
            WorksheetStatus::Delivered => {
                self.check_annex(ws)?;
                ws.delivered_at = Some(Utc::now());
                LotChanges::default()
            }
            WorksheetStatus::Cancelled => self.return_stock(ws)?,
            WorksheetStatus::Voided => {
                if !comment.as_deref().is_some_and(|c| !c.trim().is_empty()) {
                    return Err(ProductionError::VoidWithoutReason);
                }
                LotChanges::default()
            }
            _ => LotChanges::default(),
        };

        let record = TransitionRecord {
            from,
            to,
            by: actor.username.clone(),
            role,
            at: Utc::now(),
            comment,
        };
        ws.history.push(record.clone());
        ws.status = to;
        ws.entity_revision += 1;
        self.commit(ws, &lots)?;

        tracing::info!(worksheet = %ws.id, %from, %to, by = %actor.username, "worksheet transition");
        Ok(record)
    }

    /// The linked Annex XIII statement must belong to `ws` and its rendered
    /// file must still match the recorded checksum
    fn check_annex(&self, ws: &Worksheet) -> Result<(), ProductionError> {
        let Some(id) = ws.annex_xiii.as_ref().filter(|id| self.lab.exists(id)) else {
            return Err(ProductionError::MissingAnnex(ws.id.to_string()));
        };
        let doc: Document = self.lab.load(id)?;
        if doc.kind != DocumentKind::AnnexXiii || doc.worksheet != ws.id {
            return Err(ProductionError::AnnexMismatch {
                document: doc.id.to_string(),
                worksheet: ws.id.to_string(),
            });
        }

        let content = fs::read_to_string(self.lab.root().join(&doc.file)).map_err(|_| {
            ProductionError::AnnexFileMissing {
                document: doc.id.to_string(),
                file: doc.file.clone(),
            }
        })?;
        if documents::checksum(&content) != doc.sha256 {
            return Err(ProductionError::AnnexModified {
                document: doc.id.to_string(),
                file: doc.file,
            });
        }
        Ok(())
    }

    /// Build checklist results from the lab checklist, failing the named items
    pub fn checklist(&self, failed: &[String]) -> Result<Vec<QcCheck>, ProductionError> {
        for item in failed {
            if !self
                .profile
                .qc_checklist
                .iter()
                .any(|c| c.eq_ignore_ascii_case(item))
            {
                return Err(ProductionError::UnknownChecklistItem(item.clone()));
            }
        }
        Ok(self
            .profile
            .qc_checklist
            .iter()
            .map(|item| QcCheck {
                item: item.clone(),
                passed: !failed.iter().any(|f| f.eq_ignore_ascii_case(item)),
                note: None,
            })
            .collect())
    }

    /// Record a QC inspection and move the worksheet to approved or rejected
    pub fn inspect(
        &self,
        ws: &mut Worksheet,
        actor: &Actor,
        checks: Vec<QcCheck>,
        verdict: QcVerdict,
        notes: Option<String>,
    ) -> Result<QualityControl, ProductionError> {
        if ws.status != WorksheetStatus::QcPending {
            return Err(ProductionError::NotInspectable(ws.status));
        }

        let target = match verdict {
            QcVerdict::Pass => WorksheetStatus::QcApproved,
            QcVerdict::Fail => WorksheetStatus::QcRejected,
        };
        // role gate before checklist validation
        self.engine.can_transition(ws.status, target, actor)?;

        if self.profile.independent_qc && ws.technician.as_deref().is_some_and(|t| actor.is(t)) {
            return Err(ProductionError::NotIndependent(actor.username.clone()));
        }

        match verdict {
            QcVerdict::Pass => {
                let mut missing: Vec<String> = self
                    .profile
                    .qc_checklist
                    .iter()
                    .filter(|item| {
                        !checks
                            .iter()
                            .any(|c| c.passed && c.item.eq_ignore_ascii_case(item))
                    })
                    .cloned()
                    .collect();
                for failed in checks.iter().filter(|c| !c.passed) {
                    if !missing.iter().any(|m| m.eq_ignore_ascii_case(&failed.item)) {
                        missing.push(failed.item.clone());
                    }
                }
                if !missing.is_empty() {
                    return Err(ProductionError::ChecklistIncomplete(missing));
                }
            }
            QcVerdict::Fail => {
                let has_failure = checks.iter().any(|c| !c.passed);
                let has_reason = notes.as_deref().is_some_and(|n| !n.trim().is_empty());
                if !has_failure && !has_reason {
                    return Err(ProductionError::RejectWithoutReason);
                }
            }
        }

        let qc = QualityControl::new(
            ws.id.clone(),
            actor.username.clone(),
            checks,
            verdict,
            notes.clone(),
        );
        self.lab.save(&qc)?;
        ws.qc_records.push(qc.id.clone());

        let comment = match verdict {
            QcVerdict::Pass => Some(format!("QC {} passed", qc.id.short())),
            QcVerdict::Fail => Some(match qc.failed_items().as_slice() {
                [] => format!("QC {} failed", qc.id.short()),
                items => format!("QC {} failed: {}", qc.id.short(), items.join(", ")),
            }),
        };
        if let Err(e) = self.apply(ws, target, actor, comment) {
            ws.qc_records.pop();
            if let Err(cleanup) = self.lab.delete(&qc.id) {
                tracing::error!(qc = %qc.id, error = %cleanup, "could not remove orphaned QC record");
            }
            return Err(e);
        }
        Ok(qc)
    }

    /// Book additional FIFO consumption while the worksheet is in production
    pub fn consume_extra(
        &self,
        ws: &mut Worksheet,
        material: &EntityId,
        quantity: Decimal,
    ) -> Result<Vec<LotDraw>, ProductionError> {
        if ws.status != WorksheetStatus::InProduction {
            return Err(ProductionError::NotInProduction(ws.status));
        }
        let stored: Vec<MaterialLot> = self.lab.load_all()?;
        let plan = inventory::plan_fifo(&stored, material, quantity, self.today)?;
        let mut lots = stored.clone();
        inventory::apply_plan(&mut lots, &plan)?;
        let changes = LotChanges::collect(stored, lots, plan.iter().map(|d| &d.lot));

        let before = ws.clone();
        record_draws(ws, &plan);
        ws.entity_revision += 1;
        if let Err(e) = self.commit(ws, &changes) {
            *ws = before;
            return Err(e);
        }
        tracing::info!(worksheet = %ws.id, %material, %quantity, "booked extra material");
        Ok(plan)
    }

    fn consume_requirements(&self, ws: &mut Worksheet) -> Result<LotChanges, ProductionError> {
        if ws.materials.is_empty() {
            return Ok(LotChanges::default());
        }
        let stored: Vec<MaterialLot> = self.lab.load_all()?;
        let plan = inventory::plan_requirements(&stored, &ws.materials, self.today)?;
        let mut lots = stored.clone();
        inventory::apply_plan(&mut lots, &plan)?;
        record_draws(ws, &plan);
        Ok(LotChanges::collect(stored, lots, plan.iter().map(|d| &d.lot)))
    }

    fn return_stock(&self, ws: &mut Worksheet) -> Result<LotChanges, ProductionError> {
        if ws.active_consumptions().next().is_none() {
            return Ok(LotChanges::default());
        }
        let stored: Vec<MaterialLot> = self.lab.load_all()?;
        let mut lots = stored.clone();
        let touched = inventory::restock(&mut lots, &ws.consumptions)?;
        for c in &mut ws.consumptions {
            c.returned = true;
        }
        tracing::info!(worksheet = %ws.id, lots = touched.len(), "returning stock to lots");
        Ok(LotChanges::collect(stored, lots, touched.iter()))
    }

    /// Write the worksheet, then the lots it changed
    ///
    /// If a lot cannot be written, the lots already written and the worksheet
    /// are put back to their stored state.
    fn commit(&self, ws: &Worksheet, lots: &LotChanges) -> Result<(), ProductionError> {
        let previous: Option<Worksheet> = self.lab.load(&ws.id).ok();
        self.lab.save(ws)?;

        for (written, lot) in lots.updated.iter().enumerate() {
            if let Err(e) = self.lab.save(lot) {
                tracing::error!(lot = %lot.id, error = %e, "lot update failed, rolling back");
                for stored in lots.stored.iter().filter(|s| {
                    lots.updated[..=written].iter().any(|u| u.id == s.id)
                }) {
                    if let Err(e) = self.lab.save(stored) {
                        tracing::error!(lot = %stored.id, error = %e, "could not restore lot");
                    }
                }
                let restored = match &previous {
                    Some(previous) => self.lab.save(previous).map(|_| ()),
                    None => self.lab.delete(&ws.id),
                };
                if let Err(e) = restored {
                    tracing::error!(worksheet = %ws.id, error = %e, "could not restore worksheet");
                }
                return Err(e.into());
            }
        }
        Ok(())
    }
}

fn record_draws(ws: &mut Worksheet, plan: &[LotDraw]) {
    let now = Utc::now();
    ws.consumptions.extend(plan.iter().map(|d| LotConsumption {
        material: d.material.clone(),
        lot: d.lot.clone(),
        lot_number: d.lot_number.clone(),
        quantity: d.quantity,
        consumed_at: now,
        returned: false,
    }));
}
