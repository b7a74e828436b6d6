//! Short ids (`@1`, `@2`, ...) for the records of the last listing
//!
//! Every record kind keeps its own numbering: listing lots does not move the
//! `@N` aliases of the last worksheet listing. A record created since the
//! last listing is appended to its kind's list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::lab::{Lab, LabError};

/// Index file within `.dlab/`
const INDEX_FILE: &str = "shortids.json";

/// A user reference, split into short-id and free-text forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'r> {
    /// `@N` or a bare number
    Short(usize),
    /// Anything else: a full id, an id prefix, an invoice number
    Text(&'r str),
}

impl<'r> Reference<'r> {
    pub fn parse(reference: &'r str) -> Self {
        let digits = reference.strip_prefix('@').unwrap_or(reference);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = digits.parse() {
                return Reference::Short(n);
            }
        }
        Reference::Text(reference)
    }
}

/// Short ids of the last listing, per record kind
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ShortIdIndex {
    /// Listed ids per kind; `@1` is the first entry
    listings: BTreeMap<EntityPrefix, Vec<EntityId>>,
}

impl ShortIdIndex {
    fn path(lab: &Lab) -> PathBuf {
        lab.dlab_dir().join(INDEX_FILE)
    }

    /// Load the index; a missing or unreadable file gives an empty index
    pub fn load(lab: &Lab) -> Self {
        let path = Self::path(lab);
        let Ok(content) = fs::read_to_string(&path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable short id index");
            Self::default()
        })
    }

    pub fn save(&self, lab: &Lab) -> Result<(), LabError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| LabError::Serialize(e.to_string()))?;
        fs::write(Self::path(lab), content).map_err(|e| LabError::Io(e.to_string()))
    }

    /// Replace the numbering of one kind with a fresh listing
    pub fn record_listing(&mut self, prefix: EntityPrefix, ids: impl IntoIterator<Item = EntityId>) {
        let ids: Vec<EntityId> = ids.into_iter().filter(|id| id.prefix() == prefix).collect();
        self.listings.insert(prefix, ids);
    }

    /// Short number of `id`, appending it to its kind's list if needed
    pub fn add(&mut self, id: &EntityId) -> usize {
        let listing = self.listings.entry(id.prefix()).or_default();
        match listing.iter().position(|known| known == id) {
            Some(pos) => pos + 1,
            None => {
                listing.push(id.clone());
                listing.len()
            }
        }
    }

    /// Short number of `id`, if it was listed
    pub fn short_id(&self, id: &EntityId) -> Option<usize> {
        self.listings
            .get(&id.prefix())?
            .iter()
            .position(|known| known == id)
            .map(|pos| pos + 1)
    }

    /// The record behind `@n` in the last listing of `prefix`
    pub fn get(&self, prefix: EntityPrefix, n: usize) -> Option<&EntityId> {
        n.checked_sub(1)
            .and_then(|i| self.listings.get(&prefix)?.get(i))
    }

    /// `@N` label for display, empty when `id` was not listed
    pub fn label(&self, id: &EntityId) -> String {
        self.short_id(id)
            .map(|n| format!("@{}", n))
            .unwrap_or_default()
    }
}
