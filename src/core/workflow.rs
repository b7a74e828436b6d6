//! Worksheet status state machine
//!
//! A static adjacency list of allowed transitions plus role gates per target
//! status. Side effects of entering a status (stock consumption, QC records,
//! delivery stamps) live in [`crate::core::production`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::team::{Role, TeamMember, TeamRoster};
use crate::entities::worksheet::WorksheetStatus;

/// Errors that can occur during workflow checks
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid status transition: {from} → {to}")]
    InvalidTransition {
        from: WorksheetStatus,
        to: WorksheetStatus,
    },

    #[error("Authorization required: moving a worksheet to {target} requires role {required_role}")]
    Unauthorized {
        target: WorksheetStatus,
        required_role: String,
    },

    #[error("Current user '{0}' not found in team roster. Set `user` in .dlab/config.yaml or DLAB_USER")]
    UserNotInRoster(String),
}

/// One status change in a worksheet's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: WorksheetStatus,
    pub to: WorksheetStatus,
    pub by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Who is asking for a transition
#[derive(Debug, Clone)]
pub struct Actor {
    pub username: String,
    pub member: Option<TeamMember>,
}

impl Actor {
    /// Resolve a username against the roster (if any)
    ///
    /// A roster match takes the member's spelling of the username.
    pub fn resolve(username: &str, roster: Option<&TeamRoster>) -> Self {
        let member = roster.and_then(|r| r.find_member(username)).cloned();
        Self {
            username: member
                .as_ref()
                .map_or_else(|| username.to_string(), |m| m.username.clone()),
            member,
        }
    }

    /// Same person, ignoring ASCII case
    pub fn is(&self, username: &str) -> bool {
        self.username.eq_ignore_ascii_case(username)
    }

    pub fn anonymous(username: &str) -> Self {
        Self {
            username: username.to_string(),
            member: None,
        }
    }
}

/// Workflow engine for worksheet transitions
pub struct WorkflowEngine {
    roster: Option<TeamRoster>,
}

impl WorkflowEngine {
    pub fn new(roster: Option<TeamRoster>) -> Self {
        Self { roster }
    }

    pub fn roster(&self) -> Option<&TeamRoster> {
        self.roster.as_ref()
    }

    /// Check if a status transition is valid
    pub fn is_valid_transition(&self, from: WorksheetStatus, to: WorksheetStatus) -> bool {
        self.allowed_transitions(from).contains(&to)
    }

    /// Get allowed transitions from the current status
    pub fn allowed_transitions(&self, current: WorksheetStatus) -> Vec<WorksheetStatus> {
        use WorksheetStatus::*;
        match current {
            Draft => vec![InProduction, Cancelled],
            InProduction => vec![QcPending, Cancelled],
            QcPending => vec![QcApproved, QcRejected, Cancelled],
            QcRejected => vec![InProduction, Cancelled],
            QcApproved => vec![Delivered],
            Delivered => vec![Voided],
            Cancelled | Voided => vec![],
        }
    }

    /// Built-in role gate for a target status
    pub fn default_roles(target: WorksheetStatus) -> Vec<Role> {
        use WorksheetStatus::*;
        match target {
            InProduction => vec![Role::Technician, Role::Manager],
            QcPending => vec![Role::Technician],
            QcApproved | QcRejected => vec![Role::Inspector],
            Delivered => vec![Role::Technician, Role::Inspector, Role::Manager],
            Cancelled | Voided => vec![Role::Manager],
            Draft => vec![],
        }
    }

    /// Roles allowed to move a worksheet into `target`, honouring roster overrides
    pub fn required_roles(&self, target: WorksheetStatus) -> Vec<Role> {
        self.roster
            .as_ref()
            .and_then(|r| r.transition_override(target))
            .cloned()
            .unwrap_or_else(|| Self::default_roles(target))
    }

    /// Whether the actor passes the role gate of `target`, ignoring the current status
    pub fn may_enter(&self, target: WorksheetStatus, actor: &Actor) -> bool {
        if self.roster.is_none() {
            return true;
        }
        actor.member.as_ref().is_some_and(|m| {
            let required = self.required_roles(target);
            m.is_admin() || required.is_empty() || m.has_any_role(&required)
        })
    }

    /// Check a transition for the given actor
    ///
    /// Returns the role the actor acts in (None when no roster is configured).
    pub fn can_transition(
        &self,
        from: WorksheetStatus,
        to: WorksheetStatus,
        actor: &Actor,
    ) -> Result<Option<Role>, WorkflowError> {
        if !self.is_valid_transition(from, to) {
            return Err(WorkflowError::InvalidTransition { from, to });
        }

        // No roster = no auth checks
        if self.roster.is_none() {
            return Ok(None);
        }

        let Some(member) = &actor.member else {
            return Err(WorkflowError::UserNotInRoster(actor.username.clone()));
        };

        let required = self.required_roles(to);
        if member.is_admin() || required.is_empty() {
            return Ok(member.acting_role(&required));
        }

        member
            .acting_role(&required)
            .map(Some)
            .ok_or_else(|| WorkflowError::Unauthorized {
                target: to,
                required_role: required
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(" or "),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorksheetStatus::*;

    fn member(username: &str, roles: Vec<Role>) -> TeamMember {
        TeamMember {
            name: username.to_string(),
            email: String::new(),
            username: username.to_string(),
            roles,
            active: true,
        }
    }

    fn roster() -> TeamRoster {
        let mut roster = TeamRoster::default();
        roster.add_member(member("tech", vec![Role::Technician]));
        roster.add_member(member("qc", vec![Role::Inspector]));
        roster.add_member(member("boss", vec![Role::Manager]));
        roster.add_member(member("root", vec![Role::Admin]));
        roster
    }

    #[test]
    fn test_valid_transitions() {
        let engine = WorkflowEngine::new(None);

        assert!(engine.is_valid_transition(Draft, InProduction));
        assert!(engine.is_valid_transition(InProduction, QcPending));
        assert!(engine.is_valid_transition(QcPending, QcApproved));
        assert!(engine.is_valid_transition(QcPending, QcRejected));
        assert!(engine.is_valid_transition(QcRejected, InProduction));
        assert!(engine.is_valid_transition(QcApproved, Delivered));
        assert!(engine.is_valid_transition(Delivered, Voided));

        assert!(!engine.is_valid_transition(Draft, QcPending));
        assert!(!engine.is_valid_transition(InProduction, QcApproved));
        assert!(!engine.is_valid_transition(QcApproved, Cancelled));
        assert!(!engine.is_valid_transition(Delivered, Cancelled));
        assert!(!engine.is_valid_transition(Draft, Voided));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let engine = WorkflowEngine::new(None);
        for status in WorksheetStatus::all() {
            assert_eq!(
                engine.allowed_transitions(*status).is_empty(),
                status.is_terminal(),
                "{}",
                status
            );
        }
    }

    #[test]
    fn test_every_state_reachable_from_draft() {
        let engine = WorkflowEngine::new(None);
        let mut seen = vec![Draft];
        let mut queue = vec![Draft];
        while let Some(s) = queue.pop() {
            for next in engine.allowed_transitions(s) {
                if !seen.contains(&next) {
                    seen.push(next);
                    queue.push(next);
                }
            }
        }
        assert_eq!(seen.len(), WorksheetStatus::all().len());
    }

    #[test]
    fn test_no_roster_skips_role_checks() {
        let engine = WorkflowEngine::new(None);
        let actor = Actor::anonymous("anyone");
        assert_eq!(engine.can_transition(QcPending, QcApproved, &actor).unwrap(), None);
        assert!(matches!(
            engine.can_transition(Draft, Delivered, &actor),
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_role_gates() {
        let roster = roster();
        let engine = WorkflowEngine::new(Some(roster.clone()));
        let tech = Actor::resolve("tech", Some(&roster));
        let qc = Actor::resolve("qc", Some(&roster));
        let boss = Actor::resolve("boss", Some(&roster));

        assert_eq!(
            engine.can_transition(Draft, InProduction, &tech).unwrap(),
            Some(Role::Technician)
        );
        assert!(matches!(
            engine.can_transition(QcPending, QcApproved, &tech),
            Err(WorkflowError::Unauthorized { .. })
        ));
        assert_eq!(
            engine.can_transition(QcPending, QcApproved, &qc).unwrap(),
            Some(Role::Inspector)
        );
        assert!(engine.can_transition(Draft, Cancelled, &tech).is_err());
        assert_eq!(
            engine.can_transition(Delivered, Voided, &boss).unwrap(),
            Some(Role::Manager)
        );
    }

    #[test]
    fn test_admin_passes_every_gate() {
        let roster = roster();
        let engine = WorkflowEngine::new(Some(roster.clone()));
        let root = Actor::resolve("root", Some(&roster));
        for from in WorksheetStatus::all() {
            for to in engine.allowed_transitions(*from) {
                assert_eq!(
                    engine.can_transition(*from, to, &root).unwrap(),
                    Some(Role::Admin)
                );
            }
        }
    }

    #[test]
    fn test_unknown_user_rejected_when_roster_exists() {
        let roster = roster();
        let engine = WorkflowEngine::new(Some(roster.clone()));
        let stranger = Actor::resolve("stranger", Some(&roster));
        assert!(matches!(
            engine.can_transition(Draft, InProduction, &stranger),
            Err(WorkflowError::UserNotInRoster(_))
        ));
    }

    #[test]
    fn test_roster_override() {
        let mut roster = roster();
        roster
            .transition_roles
            .insert(QcApproved, vec![Role::Manager]);
        let engine = WorkflowEngine::new(Some(roster.clone()));

        assert_eq!(engine.required_roles(QcApproved), vec![Role::Manager]);
        assert_eq!(engine.required_roles(QcRejected), vec![Role::Inspector]);

        let qc = Actor::resolve("qc", Some(&roster));
        let boss = Actor::resolve("boss", Some(&roster));
        assert!(engine.can_transition(QcPending, QcApproved, &qc).is_err());
        assert!(engine.can_transition(QcPending, QcApproved, &boss).is_ok());
    }

    #[test]
    fn test_resolve_uses_roster_spelling() {
        let roster = roster();
        let tech = Actor::resolve("TECH", Some(&roster));
        assert_eq!(tech.username, "tech");
        assert!(tech.is("Tech"));

        let stranger = Actor::resolve("Stranger", Some(&roster));
        assert_eq!(stranger.username, "Stranger");
        assert!(stranger.member.is_none());
    }

    #[test]
    fn test_may_enter() {
        let engine = WorkflowEngine::new(Some(roster()));
        let tech = Actor::resolve("tech", engine.roster());
        let stranger = Actor::resolve("nobody", engine.roster());
        assert!(engine.may_enter(QcPending, &tech));
        assert!(!engine.may_enter(QcApproved, &tech));
        assert!(!engine.may_enter(InProduction, &stranger));
        assert!(WorkflowEngine::new(None).may_enter(Voided, &stranger));
    }
}
