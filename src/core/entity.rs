//! Entity trait - common interface for all lab record types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};

/// Common trait for all lab records stored as YAML files
pub trait Entity: Serialize + DeserializeOwned {
    /// The entity type prefix (e.g., WS, LOT)
    const PREFIX: EntityPrefix;

    /// Human-readable singular name used in messages
    const NAME: &'static str;

    /// Get the entity's unique ID
    fn id(&self) -> &EntityId;

    /// Get the entity's title
    fn title(&self) -> &str;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;

    /// Get the author
    fn author(&self) -> &str;
}

/// Implements [`Entity`] for a record with the usual `id`/`title`/`created`/`author` fields
#[macro_export]
macro_rules! impl_entity {
    ($ty:ty, $prefix:expr, $name:literal) => {
        impl $crate::core::entity::Entity for $ty {
            const PREFIX: $crate::core::identity::EntityPrefix = $prefix;
            const NAME: &'static str = $name;

            fn id(&self) -> &$crate::core::identity::EntityId {
                &self.id
            }

            fn title(&self) -> &str {
                &self.title
            }

            fn created(&self) -> chrono::DateTime<chrono::Utc> {
                self.created
            }

            fn author(&self) -> &str {
                &self.author
            }
        }
    };
}

pub(crate) fn default_revision() -> u32 {
    1
}

pub(crate) fn default_true() -> bool {
    true
}
