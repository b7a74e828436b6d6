//! Entity identity system using type-prefixed ULIDs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Entity type prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityPrefix {
    /// Dentist / prescriber
    Dent,
    /// Incoming order from a practice
    Ord,
    /// Production worksheet
    Ws,
    /// Catalog product
    Prod,
    /// Material master record
    Mat,
    /// Material lot (batch received from a supplier)
    Lot,
    /// Quality-control inspection
    Qc,
    /// Invoice
    Inv,
    /// Generated compliance document
    Doc,
}

impl EntityPrefix {
    /// Get the string representation of the prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Dent => "DENT",
            EntityPrefix::Ord => "ORD",
            EntityPrefix::Ws => "WS",
            EntityPrefix::Prod => "PROD",
            EntityPrefix::Mat => "MAT",
            EntityPrefix::Lot => "LOT",
            EntityPrefix::Qc => "QC",
            EntityPrefix::Inv => "INV",
            EntityPrefix::Doc => "DOC",
        }
    }

    /// Get all valid prefixes
    pub fn all() -> &'static [EntityPrefix] {
        &[
            EntityPrefix::Dent,
            EntityPrefix::Ord,
            EntityPrefix::Ws,
            EntityPrefix::Prod,
            EntityPrefix::Mat,
            EntityPrefix::Lot,
            EntityPrefix::Qc,
            EntityPrefix::Inv,
            EntityPrefix::Doc,
        ]
    }

    /// Directory (relative to the lab root) holding entities of this type
    pub fn directory(&self) -> &'static str {
        match self {
            EntityPrefix::Dent => "dentists",
            EntityPrefix::Ord => "orders",
            EntityPrefix::Ws => "worksheets",
            EntityPrefix::Prod => "catalog/products",
            EntityPrefix::Mat => "inventory/materials",
            EntityPrefix::Lot => "inventory/lots",
            EntityPrefix::Qc => "quality",
            EntityPrefix::Inv => "invoices",
            EntityPrefix::Doc => "documents",
        }
    }

    /// Try to determine entity prefix from a filename like "WS-xxx.dlab.yaml"
    pub fn from_filename(filename: &str) -> Option<Self> {
        let upper = filename.to_uppercase();
        Self::all()
            .iter()
            .find(|p| upper.starts_with(&format!("{}-", p.as_str())))
            .copied()
    }
}

impl fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DENT" => Ok(EntityPrefix::Dent),
            "ORD" => Ok(EntityPrefix::Ord),
            "WS" => Ok(EntityPrefix::Ws),
            "PROD" => Ok(EntityPrefix::Prod),
            "MAT" => Ok(EntityPrefix::Mat),
            "LOT" => Ok(EntityPrefix::Lot),
            "QC" => Ok(EntityPrefix::Qc),
            "INV" => Ok(EntityPrefix::Inv),
            "DOC" => Ok(EntityPrefix::Doc),
            _ => Err(IdParseError::InvalidPrefix(s.to_string())),
        }
    }
}

/// A unique entity identifier combining a type prefix and ULID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    prefix: EntityPrefix,
    ulid: Ulid,
}

impl EntityId {
    /// Create a new EntityId with the given prefix
    pub fn new(prefix: EntityPrefix) -> Self {
        Self {
            prefix,
            ulid: Ulid::new(),
        }
    }

    /// Create an EntityId from a prefix and existing ULID
    pub fn from_parts(prefix: EntityPrefix, ulid: Ulid) -> Self {
        Self { prefix, ulid }
    }

    pub fn prefix(&self) -> EntityPrefix {
        self.prefix
    }

    pub fn ulid(&self) -> Ulid {
        self.ulid
    }

    /// Parse an EntityId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }

    /// Prefix plus the first 8 ULID characters, for compact display
    pub fn short(&self) -> String {
        let ulid = self.ulid.to_string();
        format!("{}-{}", self.prefix, &ulid[..8])
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.ulid)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let prefix = prefix_str.parse()?;
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { prefix, ulid })
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing entity IDs
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid entity prefix: '{0}' (valid: DENT, ORD, WS, PROD, MAT, LOT, QC, INV, DOC)")]
    InvalidPrefix(String),

    #[error("missing '-' delimiter in entity ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id = EntityId::new(EntityPrefix::Ws);
        assert!(id.to_string().starts_with("WS-"));
        assert_eq!(id.to_string().len(), 29); // WS- (3) + ULID (26)
    }

    #[test]
    fn test_entity_id_roundtrip() {
        let original = EntityId::new(EntityPrefix::Lot);
        let parsed = EntityId::parse(&original.to_string()).unwrap();
        assert_eq!(parsed.prefix(), EntityPrefix::Lot);
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_entity_id_invalid_prefix() {
        let err = EntityId::parse("XXX-01HQ3K4N5M6P7R8S9T0UVWXYZ").unwrap_err();
        assert!(matches!(err, IdParseError::InvalidPrefix(_)));
    }

    #[test]
    fn test_entity_id_missing_delimiter() {
        let err = EntityId::parse("WS01HQ3K4N5M6P7R8S9T0UVWXYZ").unwrap_err();
        assert!(matches!(err, IdParseError::MissingDelimiter(_)));
    }

    #[test]
    fn test_entity_id_invalid_ulid() {
        let err = EntityId::parse("WS-notaulid").unwrap_err();
        assert!(matches!(err, IdParseError::InvalidUlid(_, _)));
    }

    #[test]
    fn test_short_form() {
        let id = EntityId::new(EntityPrefix::Inv);
        let short = id.short();
        assert!(short.starts_with("INV-"));
        assert_eq!(short.len(), 12);
    }

    #[test]
    fn test_prefix_from_filename() {
        assert_eq!(
            EntityPrefix::from_filename("ws-01HC2JB7SMQX7RS1Y0GFKBHPTD.dlab.yaml"),
            Some(EntityPrefix::Ws)
        );
        assert_eq!(
            EntityPrefix::from_filename("DOC-01HC2JB7SMQX7RS1Y0GFKBHPTD.md"),
            Some(EntityPrefix::Doc)
        );
        assert_eq!(EntityPrefix::from_filename("notes.txt"), None);
    }

    #[test]
    fn test_all_prefixes_parse() {
        for prefix in EntityPrefix::all() {
            let id = EntityId::new(*prefix);
            let parsed = EntityId::parse(&id.to_string()).unwrap();
            assert_eq!(parsed.prefix(), *prefix);
        }
    }
}
