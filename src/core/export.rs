//! CSV export of invoices, worksheets and lot consumptions

use std::io::Write;

use crate::entities::invoice::Invoice;
use crate::entities::worksheet::Worksheet;

/// Write one row per invoice with its totals
pub fn write_invoices<W: Write>(out: W, invoices: &[Invoice]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record([
        "id",
        "number",
        "status",
        "dentist",
        "issue_date",
        "due_date",
        "paid_date",
        "currency",
        "net",
        "vat",
        "total",
        "worksheets",
    ])?;

    for inv in invoices {
        let totals = inv.totals();
        wtr.write_record([
            inv.id.to_string(),
            inv.number.clone().unwrap_or_default(),
            inv.status.to_string(),
            inv.dentist.to_string(),
            date_or_empty(inv.issue_date),
            date_or_empty(inv.due_date),
            date_or_empty(inv.paid_date),
            inv.currency.clone(),
            format!("{:.2}", totals.net),
            format!("{:.2}", totals.vat),
            format!("{:.2}", totals.total),
            inv.worksheets
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write one row per worksheet
pub fn write_worksheets<W: Write>(out: W, worksheets: &[Worksheet]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record([
        "id",
        "title",
        "status",
        "dentist",
        "patient_ref",
        "technician",
        "due_date",
        "teeth",
        "delivered_at",
        "invoice",
    ])?;

    for ws in worksheets {
        wtr.write_record([
            ws.id.to_string(),
            ws.title.clone(),
            ws.status.to_string(),
            ws.dentist.as_ref().map(|d| d.to_string()).unwrap_or_default(),
            ws.patient_ref.clone().unwrap_or_default(),
            ws.technician.clone().unwrap_or_default(),
            date_or_empty(ws.due_date),
            ws.teeth_display(),
            ws.delivered_at
                .map(|d| d.to_rfc3339())
                .unwrap_or_default(),
            ws.invoice.as_ref().map(|i| i.to_string()).unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the lot traceability log: one row per recorded consumption
pub fn write_consumptions<W: Write>(out: W, worksheets: &[Worksheet]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record([
        "worksheet",
        "patient_ref",
        "material",
        "lot",
        "lot_number",
        "quantity",
        "consumed_at",
        "returned",
    ])?;

    for ws in worksheets {
        for c in &ws.consumptions {
            wtr.write_record([
                ws.id.to_string(),
                ws.patient_ref.clone().unwrap_or_default(),
                c.material.to_string(),
                c.lot.to_string(),
                c.lot_number.clone(),
                c.quantity.normalize().to_string(),
                c.consumed_at.to_rfc3339(),
                c.returned.to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

fn date_or_empty(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}
