//! Team roster and role management for worksheet transitions

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::lab::Lab;
use crate::entities::worksheet::WorksheetStatus;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("cannot read team roster {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("invalid team roster {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// Staff roles used to gate worksheet transitions
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Dental technician building the restoration
    Technician,
    /// Quality-control inspector
    Inspector,
    /// Lab manager
    Manager,
    /// Passes every gate
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Technician => write!(f, "technician"),
            Role::Inspector => write!(f, "inspector"),
            Role::Manager => write!(f, "manager"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "technician" | "tech" => Ok(Role::Technician),
            "inspector" | "qc" => Ok(Role::Inspector),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// A team member with their roles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Username matched against the configured `user`
    pub username: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default = "crate::core::entity::default_true")]
    pub active: bool,
}

impl TeamMember {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.roles.contains(r))
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    /// The first of `roles` this member holds, used when recording who acted in which capacity
    pub fn acting_role(&self, roles: &[Role]) -> Option<Role> {
        roles
            .iter()
            .find(|r| self.roles.contains(r))
            .copied()
            .or_else(|| self.is_admin().then_some(Role::Admin))
    }
}

/// Team roster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRoster {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub members: Vec<TeamMember>,
    /// Overrides of the default role gates, keyed by target status (e.g. `qc_approved`)
    #[serde(default)]
    pub transition_roles: HashMap<WorksheetStatus, Vec<Role>>,
}

fn default_version() -> u32 {
    1
}

impl Default for TeamRoster {
    fn default() -> Self {
        Self {
            version: 1,
            members: Vec::new(),
            transition_roles: HashMap::new(),
        }
    }
}

impl TeamRoster {
    /// Load team roster from the lab's .dlab/team.yaml
    ///
    /// `Ok(None)` means no roster is configured. A roster that exists but
    /// cannot be read or parsed is an error, never an open gate.
    pub fn load(lab: &Lab) -> Result<Option<Self>, RosterError> {
        Self::load_from_path(&lab.dlab_dir().join("team.yaml"))
    }

    pub fn load_from_path(path: &Path) -> Result<Option<Self>, RosterError> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path).map_err(|e| RosterError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_yml::from_str(&contents)
            .map(Some)
            .map_err(|e| RosterError::Invalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    pub fn save(&self, lab: &Lab) -> std::io::Result<()> {
        self.save_to_path(&lab.dlab_dir().join("team.yaml"))
    }

    pub fn save_to_path(&self, path: &Path) -> std::io::Result<()> {
        let contents = serde_yml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, contents)
    }

    /// Find an active member by username (case-insensitive)
    pub fn find_member(&self, username: &str) -> Option<&TeamMember> {
        self.members
            .iter()
            .find(|m| m.active && m.username.eq_ignore_ascii_case(username))
    }

    /// Roles allowed to move a worksheet into `target`, if an override exists
    pub fn transition_override(&self, target: WorksheetStatus) -> Option<&Vec<Role>> {
        self.transition_roles.get(&target)
    }

    pub fn add_member(&mut self, member: TeamMember) {
        self.members.push(member);
    }

    /// Remove a member by username
    pub fn remove_member(&mut self, username: &str) -> bool {
        let len_before = self.members.len();
        self.members
            .retain(|m| !m.username.eq_ignore_ascii_case(username));
        self.members.len() < len_before
    }

    pub fn active_members(&self) -> impl Iterator<Item = &TeamMember> {
        self.members.iter().filter(|m| m.active)
    }

    pub fn members_with_role(&self, role: Role) -> impl Iterator<Item = &TeamMember> {
        self.members.iter().filter(move |m| m.active && m.has_role(role))
    }

    /// Generate default team.yaml template content
    pub fn default_template() -> &'static str {
        r#"# Dentlab Team Roster
# Defines lab staff and their roles for worksheet transitions

version: 1

members: []
  # - name: "Ana Horvat"
  #   email: "ana@lab.example"
  #   username: "ahorvat"       # Matches `user` in config or DLAB_USER
  #   roles: [technician]
  #   active: true

# Override which roles may move a worksheet into a status.
# Defaults: in_production [technician, manager], qc_pending [technician],
# qc_approved/qc_rejected [inspector], delivered [technician, inspector, manager],
# cancelled/voided [manager]. Admins pass every gate.
transition_roles: {}
  # qc_approved: [inspector, manager]
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn member(username: &str, roles: Vec<Role>) -> TeamMember {
        TeamMember {
            name: username.to_uppercase(),
            email: format!("{}@lab.example", username),
            username: username.to_string(),
            roles,
            active: true,
        }
    }

    fn create_test_roster() -> TeamRoster {
        let mut roster = TeamRoster::default();
        roster.add_member(member("tech", vec![Role::Technician]));
        roster.add_member(member("qc", vec![Role::Inspector]));
        roster.add_member(member("boss", vec![Role::Manager]));
        roster.add_member(member("root", vec![Role::Admin]));
        roster
            .transition_roles
            .insert(WorksheetStatus::Delivered, vec![Role::Manager]);
        roster
    }

    #[test]
    fn test_find_member_case_insensitive() {
        let roster = create_test_roster();
        assert!(roster.find_member("TECH").is_some());
        assert!(roster.find_member("nobody").is_none());
    }

    #[test]
    fn test_inactive_member_not_found() {
        let mut roster = create_test_roster();
        roster.members[0].active = false;
        assert!(roster.find_member("tech").is_none());
        assert_eq!(roster.active_members().count(), 3);
    }

    #[test]
    fn test_acting_role() {
        let roster = create_test_roster();
        let qc = roster.find_member("qc").unwrap();
        assert_eq!(
            qc.acting_role(&[Role::Technician, Role::Inspector]),
            Some(Role::Inspector)
        );
        assert_eq!(qc.acting_role(&[Role::Manager]), None);

        let root = roster.find_member("root").unwrap();
        assert_eq!(root.acting_role(&[Role::Manager]), Some(Role::Admin));
    }

    #[test]
    fn test_transition_override() {
        let roster = create_test_roster();
        assert_eq!(
            roster.transition_override(WorksheetStatus::Delivered),
            Some(&vec![Role::Manager])
        );
        assert!(roster
            .transition_override(WorksheetStatus::QcApproved)
            .is_none());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("QC".parse::<Role>().unwrap(), Role::Inspector);
        assert_eq!("tech".parse::<Role>().unwrap(), Role::Technician);
        assert!("dentist".parse::<Role>().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("team.yaml");

        let roster = create_test_roster();
        roster.save_to_path(&path).unwrap();

        let loaded = TeamRoster::load_from_path(&path).unwrap().unwrap();
        assert_eq!(loaded.members.len(), 4);
        assert_eq!(loaded.members_with_role(Role::Inspector).count(), 1);
        assert_eq!(
            loaded.transition_override(WorksheetStatus::Delivered),
            Some(&vec![Role::Manager])
        );
    }

    #[test]
    fn test_missing_roster_is_none() {
        let tmp = tempdir().unwrap();
        assert!(TeamRoster::load_from_path(&tmp.path().join("team.yaml"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_misspelled_role_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("team.yaml");
        std::fs::write(
            &path,
            "members:\n  - name: Ana\n    username: ana\n    roles: [technican]\n",
        )
        .unwrap();
        assert!(matches!(
            TeamRoster::load_from_path(&path),
            Err(RosterError::Invalid { .. })
        ));
    }

    #[test]
    fn test_unknown_transition_key_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("team.yaml");
        std::fs::write(&path, "transition_roles:\n  qc_aproved: [manager]\n").unwrap();
        assert!(matches!(
            TeamRoster::load_from_path(&path),
            Err(RosterError::Invalid { .. })
        ));

        std::fs::write(&path, "transition_roles:\n  qc_approved: [manager]\n").unwrap();
        let roster = TeamRoster::load_from_path(&path).unwrap().unwrap();
        assert_eq!(
            roster.transition_override(WorksheetStatus::QcApproved),
            Some(&vec![Role::Manager])
        );
    }

    #[test]
    fn test_default_template_parses() {
        let roster: TeamRoster = serde_yml::from_str(TeamRoster::default_template()).unwrap();
        assert!(roster.members.is_empty());
        assert!(roster.transition_roles.is_empty());
    }

    #[test]
    fn test_add_remove_member() {
        let mut roster = TeamRoster::default();
        roster.add_member(member("temp", vec![Role::Technician]));
        assert!(roster.remove_member("TEMP"));
        assert!(!roster.remove_member("temp"));
    }
}
