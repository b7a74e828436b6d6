//! Core module - lab store, workflow and production services

pub mod billing;
pub mod config;
pub mod entity;
pub mod export;
pub mod identity;
pub mod inventory;
pub mod lab;
pub mod loader;
pub mod production;
pub mod profile;
pub mod report;
pub mod sequence;
pub mod shortid;
pub mod team;
pub mod workflow;

pub use billing::{Billing, BillingError};
pub use config::Config;
pub use entity::Entity;
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use inventory::{InventoryError, LotDraw, StockLevel};
pub use lab::{Lab, LabError};
pub use production::{Production, ProductionError};
pub use profile::{BankAccount, LabProfile, ProfileError};
pub use sequence::Sequences;
pub use shortid::ShortIdIndex;
pub use team::{Role, TeamMember, TeamRoster};
pub use workflow::{Actor, TransitionRecord, WorkflowEngine, WorkflowError};
