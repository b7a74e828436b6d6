//! Entity type definitions
//!
//! dentlab manages the following entity types:
//!
//! **Intake:**
//! - [`Dentist`] - Prescribing dentists and their practices
//! - [`Order`] - Work orders received from dentists
//!
//! **Production:**
//! - [`Worksheet`] - Work on an FDI tooth chart moving through the production workflow
//! - [`QualityControl`] - Final inspection records
//! - [`Document`] - Generated Annex XIII statements
//!
//! **Catalog & Inventory:**
//! - [`Product`] - Billable restoration types
//! - [`Material`] - Materials used in production
//! - [`MaterialLot`] - Supplier batches consumed first-in first-out
//!
//! **Billing:**
//! - [`Invoice`] - Invoices for delivered worksheets

pub mod dentist;
pub mod document;
pub mod invoice;
pub mod lot;
pub mod material;
pub mod order;
pub mod product;
pub mod qc;
pub mod worksheet;

pub use dentist::Dentist;
pub use document::{Document, DocumentFormat, DocumentKind};
pub use invoice::{Invoice, InvoiceLine, InvoiceStatus};
pub use lot::MaterialLot;
pub use material::{Material, MaterialCategory};
pub use order::{Order, OrderStatus};
pub use product::Product;
pub use qc::{QcCheck, QcVerdict, QualityControl};
pub use worksheet::{
    LotConsumption, MaterialRequirement, ToothWork, WorkKind, Worksheet, WorksheetStatus,
};
