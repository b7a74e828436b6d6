//! CLI command implementations

pub mod chart;
pub mod completions;
pub mod dentist;
pub mod doc;
pub mod export;
pub mod init;
pub mod invoice;
pub mod lot;
pub mod material;
pub mod order;
pub mod product;
pub mod qc;
pub mod report;
pub mod team;
pub mod ws;
