//! Lab discovery and the YAML entity store

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::loader::{self, ENTITY_SUFFIX};
use crate::core::shortid::{Reference, ShortIdIndex};
use crate::entities::invoice::Invoice;

/// Name of the marker/configuration directory at the lab root
pub const LAB_DIR: &str = ".dlab";

/// Represents a dental lab data directory
#[derive(Debug, Clone)]
pub struct Lab {
    /// Root directory of the lab (parent of .dlab/)
    root: PathBuf,
}

impl Lab {
    /// Find the lab root by walking up from the current directory
    pub fn discover() -> Result<Self, LabError> {
        let current = std::env::current_dir().map_err(|e| LabError::Io(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find the lab root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, LabError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| LabError::Io(e.to_string()))?;

        loop {
            if current.join(LAB_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(LabError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Open an explicit lab path, or discover one from the working directory
    pub fn open(path: Option<&Path>) -> Result<Self, LabError> {
        match path {
            Some(p) => Self::discover_from(p),
            None => Self::discover(),
        }
    }

    /// Create a new lab structure at the given path
    pub fn init(path: &Path) -> Result<Self, LabError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if root.join(LAB_DIR).exists() {
            return Err(LabError::AlreadyExists(root));
        }
        Self::create_structure(root)
    }

    /// Initialize even if .dlab/ exists; existing profile and roster are kept
    pub fn init_force(path: &Path) -> Result<Self, LabError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create_structure(root)
    }

    fn create_structure(root: PathBuf) -> Result<Self, LabError> {
        let dlab_dir = root.join(LAB_DIR);
        fs::create_dir_all(&dlab_dir).map_err(|e| LabError::Io(e.to_string()))?;

        fs::write(dlab_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| LabError::Io(e.to_string()))?;

        let profile = dlab_dir.join("lab.yaml");
        if !profile.exists() {
            fs::write(&profile, crate::core::profile::LabProfile::default_template())
                .map_err(|e| LabError::Io(e.to_string()))?;
        }

        for prefix in EntityPrefix::all() {
            fs::create_dir_all(root.join(prefix.directory()))
                .map_err(|e| LabError::Io(e.to_string()))?;
        }
        fs::create_dir_all(root.join(Self::RENDERED_DIR))
            .map_err(|e| LabError::Io(e.to_string()))?;

        tracing::info!(root = %root.display(), "initialized lab");
        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# dlab configuration

# Default author for new records (overridden by DLAB_AUTHOR)
# author: ""

# Roster username used for workflow role checks (overridden by DLAB_USER)
# user: ""

# Editor to use for `dlab <entity> edit` (default: $EDITOR)
# editor: ""

# Default output format (auto, yaml, json, csv, tsv, md, id)
# default_format: auto
"#
    }

    /// Directory for rendered documents, relative to the lab root
    pub const RENDERED_DIR: &'static str = "documents/rendered";

    /// Get the lab root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .dlab configuration directory
    pub fn dlab_dir(&self) -> PathBuf {
        self.root.join(LAB_DIR)
    }

    pub fn rendered_dir(&self) -> PathBuf {
        self.root.join(Self::RENDERED_DIR)
    }

    /// Directory holding entities of the given type
    pub fn entity_dir(&self, prefix: EntityPrefix) -> PathBuf {
        self.root.join(prefix.directory())
    }

    /// Path of an entity file
    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.entity_dir(id.prefix())
            .join(format!("{}{}", id, ENTITY_SUFFIX))
    }

    /// Path relative to the lab root, for display and document records
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    /// Write an entity to its YAML file
    pub fn save<T: Entity>(&self, entity: &T) -> Result<PathBuf, LabError> {
        let path = self.entity_path(entity.id());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LabError::Io(e.to_string()))?;
        }
        let yaml = serde_yml::to_string(entity).map_err(|e| LabError::Serialize(e.to_string()))?;
        fs::write(&path, yaml).map_err(|e| LabError::Io(e.to_string()))?;
        tracing::debug!(id = %entity.id(), kind = T::NAME, "saved entity");
        Ok(path)
    }

    /// Load an entity by its exact id
    pub fn load<T: Entity>(&self, id: &EntityId) -> Result<T, LabError> {
        if id.prefix() != T::PREFIX {
            return Err(LabError::WrongType {
                reference: id.to_string(),
                expected: T::PREFIX,
            });
        }
        let path = self.entity_path(id);
        if !path.exists() {
            return Err(LabError::EntityNotFound(id.to_string()));
        }
        loader::read_entity(&path)
    }

    /// Load every entity of a type, oldest first
    pub fn load_all<T: Entity>(&self) -> Result<Vec<T>, LabError> {
        loader::load_all(&self.entity_dir(T::PREFIX))
    }

    pub fn exists(&self, id: &EntityId) -> bool {
        self.entity_path(id).exists()
    }

    pub fn delete(&self, id: &EntityId) -> Result<(), LabError> {
        let path = self.entity_path(id);
        if !path.exists() {
            return Err(LabError::EntityNotFound(id.to_string()));
        }
        fs::remove_file(&path).map_err(|e| LabError::Io(e.to_string()))?;
        tracing::debug!(id = %id, "deleted entity");
        Ok(())
    }

    /// Resolve a user reference to a full id of the given type
    ///
    /// Accepts short ids (`@3`) from the last listing of that type, full ids,
    /// id prefixes and bare ULID prefixes. Invoices also resolve by number.
    pub fn resolve_id(&self, prefix: EntityPrefix, reference: &str) -> Result<EntityId, LabError> {
        let reference = match Reference::parse(reference.trim()) {
            Reference::Short(n) => {
                return ShortIdIndex::load(self)
                    .get(prefix, n)
                    .filter(|id| self.exists(id))
                    .cloned()
                    .ok_or_else(|| LabError::EntityNotFound(format!("@{}", n)));
            }
            Reference::Text(text) => text.to_string(),
        };

        if prefix == EntityPrefix::Inv {
            if let Some(id) = self.invoice_by_number(&reference)? {
                return Ok(id);
            }
        }

        if let Ok(id) = EntityId::parse(&reference) {
            if id.prefix() != prefix {
                return Err(LabError::WrongType {
                    reference,
                    expected: prefix,
                });
            }
            if self.exists(&id) {
                return Ok(id);
            }
            return Err(LabError::EntityNotFound(reference));
        }

        let matches = loader::find_entity_files(&self.entity_dir(prefix), &reference)?;
        match matches.as_slice() {
            [] => Err(LabError::EntityNotFound(reference)),
            [single] => {
                let name = single
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                EntityId::parse(name.trim_end_matches(ENTITY_SUFFIX))
                    .map_err(|e| LabError::Parse {
                        path: single.clone(),
                        message: e.to_string(),
                    })
            }
            many => Err(LabError::Ambiguous {
                reference,
                count: many.len(),
            }),
        }
    }

    fn invoice_by_number(&self, number: &str) -> Result<Option<EntityId>, LabError> {
        let invoices: Vec<Invoice> = self.load_all()?;
        Ok(invoices
            .into_iter()
            .find(|i| i.number.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(number)))
            .map(|i| i.id))
    }

    /// Resolve a reference and load the entity
    pub fn find<T: Entity>(&self, reference: &str) -> Result<T, LabError> {
        let id = self.resolve_id(T::PREFIX, reference)?;
        self.load(&id)
    }
}

/// Errors that can occur during lab store operations
#[derive(Debug, Error)]
pub enum LabError {
    #[error("not a dlab lab directory (searched from {searched_from:?}). Run 'dlab init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("lab already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("no record matches '{0}'")]
    EntityNotFound(String),

    #[error("'{reference}' matches {count} records, use a longer id")]
    Ambiguous { reference: String, count: usize },

    #[error("'{reference}' is not a {expected} id")]
    WrongType {
        reference: String,
        expected: EntityPrefix,
    },

    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to serialize record: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Dentist, Worksheet};
    use tempfile::tempdir;

    #[test]
    fn test_lab_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();

        assert!(lab.dlab_dir().join("config.yaml").exists());
        assert!(lab.dlab_dir().join("lab.yaml").exists());
        assert!(lab.root().join("worksheets").is_dir());
        assert!(lab.root().join("inventory/lots").is_dir());
        assert!(lab.rendered_dir().is_dir());
    }

    #[test]
    fn test_lab_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Lab::init(tmp.path()).unwrap();
        let err = Lab::init(tmp.path()).unwrap_err();
        assert!(matches!(err, LabError::AlreadyExists(_)));
        assert!(Lab::init_force(tmp.path()).is_ok());
    }

    #[test]
    fn test_lab_discover_from_subdir() {
        let tmp = tempdir().unwrap();
        Lab::init(tmp.path()).unwrap();
        let subdir = tmp.path().join("worksheets/nested");
        fs::create_dir_all(&subdir).unwrap();

        let lab = Lab::discover_from(&subdir).unwrap();
        assert_eq!(
            lab.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_lab_discover_fails_without_marker() {
        let tmp = tempdir().unwrap();
        let err = Lab::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, LabError::NotFound { .. }));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();

        let ws = Worksheet::new("Crown 36".to_string(), "ana".to_string());
        let path = lab.save(&ws).unwrap();
        assert!(path.to_string_lossy().ends_with(".dlab.yaml"));

        let loaded: Worksheet = lab.load(&ws.id).unwrap();
        assert_eq!(loaded.id, ws.id);
        assert_eq!(loaded.title, "Crown 36");

        let all: Vec<Worksheet> = lab.load_all().unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_load_wrong_type() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();
        let d = Dentist::new("Dr. X".to_string(), "ana".to_string());
        lab.save(&d).unwrap();
        assert!(matches!(
            lab.load::<Worksheet>(&d.id),
            Err(LabError::WrongType { .. })
        ));
    }

    #[test]
    fn test_resolve_partial_and_short_ids() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();
        let ws = Worksheet::new("A".to_string(), "ana".to_string());
        lab.save(&ws).unwrap();

        let full = ws.id.to_string();
        assert_eq!(lab.resolve_id(EntityPrefix::Ws, &full).unwrap(), ws.id);
        assert_eq!(lab.resolve_id(EntityPrefix::Ws, &full[..10]).unwrap(), ws.id);

        let dentist = Dentist::new("Dr. X".to_string(), "ana".to_string());
        lab.save(&dentist).unwrap();
        let mut index = ShortIdIndex::default();
        index.record_listing(EntityPrefix::Ws, [ws.id.clone()]);
        index.record_listing(EntityPrefix::Dent, [dentist.id.clone()]);
        index.save(&lab).unwrap();
        assert_eq!(lab.resolve_id(EntityPrefix::Ws, "@1").unwrap(), ws.id);
        assert_eq!(lab.resolve_id(EntityPrefix::Dent, "@1").unwrap(), dentist.id);
        assert!(lab.resolve_id(EntityPrefix::Ws, "@2").is_err());
        assert!(lab.resolve_id(EntityPrefix::Lot, "@1").is_err());

        let found: Worksheet = lab.find("@1").unwrap();
        assert_eq!(found.id, ws.id);

        lab.delete(&ws.id).unwrap();
        assert!(matches!(
            lab.resolve_id(EntityPrefix::Ws, "@1"),
            Err(LabError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_invoice_number() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();
        let dentist = Dentist::new("Dr. X".to_string(), "ana".to_string());
        let mut invoice = Invoice::new(dentist.id.clone(), "EUR".to_string(), "ana".to_string());
        invoice.number = Some("R2026-0007".to_string());
        lab.save(&invoice).unwrap();

        assert_eq!(lab.resolve_id(EntityPrefix::Inv, "R2026-0007").unwrap(), invoice.id);
        assert_eq!(lab.resolve_id(EntityPrefix::Inv, "r2026-0007").unwrap(), invoice.id);
        assert!(lab.resolve_id(EntityPrefix::Inv, "R2026-0008").is_err());
        // numbers only name invoices
        assert!(lab.resolve_id(EntityPrefix::Ws, "R2026-0007").is_err());
    }

    #[test]
    fn test_resolve_ambiguous() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();
        lab.save(&Worksheet::new("A".to_string(), "ana".to_string()))
            .unwrap();
        lab.save(&Worksheet::new("B".to_string(), "ana".to_string()))
            .unwrap();
        assert!(matches!(
            lab.resolve_id(EntityPrefix::Ws, "WS-"),
            Err(LabError::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn test_delete() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();
        let d = Dentist::new("Dr. X".to_string(), "ana".to_string());
        lab.save(&d).unwrap();
        lab.delete(&d.id).unwrap();
        assert!(!lab.exists(&d.id));
        assert!(lab.delete(&d.id).is_err());
    }
}
