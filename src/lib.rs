//! dentlab: dental laboratory production toolkit
//!
//! Worksheets on an FDI tooth chart, FIFO material-lot consumption, QC
//! sign-off, invoicing and EU MDR Annex XIII statements, kept as plain-text
//! YAML records in a lab directory.

pub mod cli;
pub mod core;
pub mod documents;
pub mod entities;
pub mod fdi;
pub mod logging;
