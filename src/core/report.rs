//! Summary reports over the lab records

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core::inventory::{self, InventoryError, StockLevel};
use crate::entities::invoice::{Invoice, InvoiceStatus};
use crate::entities::lot::MaterialLot;
use crate::entities::material::Material;
use crate::entities::worksheet::{Worksheet, WorksheetStatus};

/// Worksheet counts per status plus the overdue list
#[derive(Debug, Clone)]
pub struct ProductionReport<'a> {
    pub by_status: Vec<(WorksheetStatus, usize)>,
    pub overdue: Vec<&'a Worksheet>,
    pub awaiting_invoice: Vec<&'a Worksheet>,
}

pub fn production_report(worksheets: &[Worksheet], today: NaiveDate) -> ProductionReport<'_> {
    let by_status = WorksheetStatus::all()
        .iter()
        .map(|s| (*s, worksheets.iter().filter(|w| w.status == *s).count()))
        .collect();

    let mut overdue: Vec<&Worksheet> = worksheets.iter().filter(|w| w.is_overdue(today)).collect();
    overdue.sort_by_key(|w| w.due_date);

    let awaiting_invoice = worksheets
        .iter()
        .filter(|w| w.status == WorksheetStatus::Delivered && w.invoice.is_none())
        .collect();

    ProductionReport {
        by_status,
        overdue,
        awaiting_invoice,
    }
}

/// Stock levels with low-stock and expiry warnings
#[derive(Debug, Clone)]
pub struct StockReport<'a> {
    pub levels: Vec<StockLevel>,
    pub expiring: Vec<&'a MaterialLot>,
    pub expired: Vec<&'a MaterialLot>,
}

impl StockReport<'_> {
    pub fn low(&self) -> impl Iterator<Item = &StockLevel> {
        self.levels.iter().filter(|l| l.is_low())
    }
}

pub fn stock_report<'a>(
    materials: &[Material],
    lots: &'a [MaterialLot],
    today: NaiveDate,
    warning_days: i64,
) -> Result<StockReport<'a>, InventoryError> {
    let mut levels = inventory::stock_levels(materials, lots, today);
    levels.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let expired = lots
        .iter()
        .filter(|l| !l.is_depleted() && l.is_expired(today))
        .collect();

    Ok(StockReport {
        levels,
        expiring: inventory::expiring_lots(lots, today, warning_days)?,
        expired,
    })
}

/// Outstanding amount on issued invoices, per currency
pub fn receivables(invoices: &[Invoice]) -> Vec<(String, Decimal)> {
    let mut sums: Vec<(String, Decimal)> = Vec::new();
    for inv in invoices.iter().filter(|i| i.status == InvoiceStatus::Issued) {
        let total = inv.totals().total;
        match sums.iter_mut().find(|(c, _)| *c == inv.currency) {
            Some((_, sum)) => *sum += total,
            None => sums.push((inv.currency.clone(), total)),
        }
    }
    sums
}
