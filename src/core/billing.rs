//! Invoicing of delivered worksheets

use chrono::{Datelike, Days, Local, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::core::lab::{Lab, LabError};
use crate::core::profile::{LabProfile, ProfileError};
use crate::core::sequence::Sequences;
use crate::entities::dentist::Dentist;
use crate::entities::invoice::{Invoice, InvoiceLine, InvoiceStatus};
use crate::entities::product::Product;
use crate::entities::worksheet::{Worksheet, WorksheetStatus};

/// Sequence series used for invoice numbers
const INVOICE_SERIES: &str = "invoice";

#[derive(Debug, Error)]
pub enum BillingError {
    #[error(transparent)]
    Lab(#[from] LabError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("no worksheets given")]
    NoWorksheets,

    #[error("worksheet {worksheet} is {status}; only delivered worksheets can be invoiced")]
    NotDelivered {
        worksheet: String,
        status: WorksheetStatus,
    },

    #[error("worksheet {worksheet} belongs to another dentist")]
    WrongDentist { worksheet: String },

    #[error("worksheet {worksheet} is already on invoice {invoice}")]
    AlreadyInvoiced { worksheet: String, invoice: String },

    #[error("worksheet {0} has no teeth linked to catalog products")]
    NothingToBill(String),

    #[error("invoice is {0}; only drafts can be issued")]
    NotDraft(InvoiceStatus),

    #[error("invoice is {0}; only issued invoices can be marked paid")]
    NotIssued(InvoiceStatus),

    #[error("invoice is {0} and can no longer be cancelled")]
    CannotCancel(InvoiceStatus),

    #[error("invoice has no lines")]
    EmptyInvoice,

    #[error("due date {days} days after {issued} is out of range")]
    DueDateOutOfRange { issued: NaiveDate, days: u32 },
}

/// Billing service bound to one lab
pub struct Billing<'a> {
    lab: &'a Lab,
    profile: LabProfile,
    today: NaiveDate,
}

impl<'a> Billing<'a> {
    pub fn new(lab: &'a Lab, profile: LabProfile) -> Self {
        Self {
            lab,
            profile,
            today: Local::now().date_naive(),
        }
    }

    pub fn open(lab: &'a Lab) -> Result<Self, BillingError> {
        Ok(Self::new(lab, LabProfile::load(lab)?))
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Create a draft invoice for delivered worksheets of one dentist
    pub fn draft(
        &self,
        dentist: &EntityId,
        worksheets: &[EntityId],
        author: &str,
    ) -> Result<Invoice, BillingError> {
        if worksheets.is_empty() {
            return Err(BillingError::NoWorksheets);
        }
        let dentist: Dentist = self.lab.load(dentist)?;

        let held = self.held_worksheets()?;
        let mut products: HashMap<EntityId, Product> = HashMap::new();
        let mut invoice = Invoice::new(
            dentist.id.clone(),
            self.profile.currency.clone(),
            author.to_string(),
        );
        let mut loaded: Vec<Worksheet> = Vec::new();

        for id in worksheets {
            if invoice.worksheets.contains(id) {
                continue;
            }
            let ws: Worksheet = self.lab.load(id)?;
            if ws.status != WorksheetStatus::Delivered {
                return Err(BillingError::NotDelivered {
                    worksheet: ws.id.to_string(),
                    status: ws.status,
                });
            }
            if ws.dentist.as_ref() != Some(&dentist.id) {
                return Err(BillingError::WrongDentist {
                    worksheet: ws.id.to_string(),
                });
            }
            if let Some(invoice_id) = held.get(&ws.id) {
                return Err(BillingError::AlreadyInvoiced {
                    worksheet: ws.id.to_string(),
                    invoice: invoice_id.clone(),
                });
            }

            let counts = ws.product_counts();
            if counts.is_empty() {
                return Err(BillingError::NothingToBill(ws.id.to_string()));
            }
            for (product_id, count) in counts {
                if !products.contains_key(&product_id) {
                    let product: Product = self.lab.load(&product_id)?;
                    products.insert(product_id.clone(), product);
                }
                let Some(product) = products.get(&product_id) else {
                    continue;
                };
                let teeth: Vec<String> = ws
                    .teeth
                    .iter()
                    .filter(|t| t.product.as_ref() == Some(&product_id))
                    .map(|t| t.tooth.to_string())
                    .collect();
                invoice.lines.push(InvoiceLine {
                    description: format!(
                        "{} {} (teeth {}; {})",
                        product.code,
                        product.title,
                        teeth.join(", "),
                        ws.patient_ref.as_deref().unwrap_or(&ws.title)
                    ),
                    worksheet: Some(ws.id.clone()),
                    product: Some(product_id.clone()),
                    quantity: Decimal::from(count),
                    unit_price: product.unit_price,
                    vat_rate: product.effective_vat(self.profile.vat_rate),
                });
            }
            invoice.worksheets.push(ws.id.clone());
            loaded.push(ws);
        }

        invoice.title = format!("Draft invoice for {}", dentist.title);
        self.lab.save(&invoice)?;
        for mut ws in loaded {
            ws.invoice = Some(invoice.id.clone());
            ws.entity_revision += 1;
            self.lab.save(&ws)?;
        }

        tracing::info!(invoice = %invoice.id, lines = invoice.lines.len(), "drafted invoice");
        Ok(invoice)
    }

    /// Worksheets on live invoices, mapped to the invoice reference
    fn held_worksheets(&self) -> Result<HashMap<EntityId, String>, BillingError> {
        let invoices: Vec<Invoice> = self.lab.load_all()?;
        Ok(invoices
            .iter()
            .filter(|inv| inv.status.is_live())
            .flat_map(|inv| inv.worksheets.iter().map(|ws| (ws.clone(), inv.reference())))
            .collect())
    }

    /// Highest sequence number already used for `year`
    fn highest_number(&self, year: i32) -> Result<u32, BillingError> {
        let stem = format!("{}{}-", self.profile.invoice_prefix, year);
        let invoices: Vec<Invoice> = self.lab.load_all()?;
        Ok(invoices
            .iter()
            .filter_map(|inv| inv.number.as_deref())
            .filter_map(|n| n.strip_prefix(&stem))
            .filter_map(|seq| seq.parse::<u32>().ok())
            .max()
            .unwrap_or(0))
    }

    /// Assign the next invoice number and set issue/due dates
    pub fn issue(&self, invoice: &mut Invoice) -> Result<String, BillingError> {
        if invoice.status != InvoiceStatus::Draft {
            return Err(BillingError::NotDraft(invoice.status));
        }
        if invoice.lines.is_empty() {
            return Err(BillingError::EmptyInvoice);
        }

        let terms = self.profile.payment_terms_days;
        let due = self
            .today
            .checked_add_days(Days::new(u64::from(terms)))
            .ok_or(BillingError::DueDateOutOfRange {
                issued: self.today,
                days: terms,
            })?;

        let year = self.today.year();
        let mut sequences = Sequences::load(self.lab)?;
        let seq = sequences.advance(INVOICE_SERIES, year, self.highest_number(year)?);
        let number = format!("{}{}-{:04}", self.profile.invoice_prefix, year, seq);

        let draft = invoice.clone();
        invoice.number = Some(number.clone());
        invoice.title = format!("Invoice {}", number);
        invoice.issue_date = Some(self.today);
        invoice.due_date = Some(due);
        invoice.status = InvoiceStatus::Issued;
        invoice.entity_revision += 1;

        if let Err(e) = self.lab.save(invoice) {
            *invoice = draft;
            return Err(e.into());
        }
        // The stored numbers are the floor for the next issue, so a stale
        // counter cannot hand out this number again.
        if let Err(e) = sequences.save(self.lab) {
            tracing::warn!(%number, error = %e, "could not update invoice sequence");
        }
        tracing::info!(invoice = %invoice.id, %number, "issued invoice");
        Ok(number)
    }

    pub fn mark_paid(&self, invoice: &mut Invoice, paid: NaiveDate) -> Result<(), BillingError> {
        if invoice.status != InvoiceStatus::Issued {
            return Err(BillingError::NotIssued(invoice.status));
        }
        invoice.status = InvoiceStatus::Paid;
        invoice.paid_date = Some(paid);
        invoice.entity_revision += 1;
        self.lab.save(invoice)?;
        Ok(())
    }

    /// Cancel a draft or issued invoice and release its worksheets
    ///
    /// An issued invoice keeps its number so the sequence stays gap-free.
    pub fn cancel(&self, invoice: &mut Invoice) -> Result<(), BillingError> {
        if !matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Issued) {
            return Err(BillingError::CannotCancel(invoice.status));
        }
        invoice.status = InvoiceStatus::Cancelled;
        invoice.entity_revision += 1;
        self.lab.save(invoice)?;

        for id in &invoice.worksheets {
            let mut ws: Worksheet = self.lab.load(id)?;
            if ws.invoice.as_ref() == Some(&invoice.id) {
                ws.invoice = None;
                ws.entity_revision += 1;
                self.lab.save(&ws)?;
            }
        }
        tracing::info!(invoice = %invoice.id, "cancelled invoice");
        Ok(())
    }
}
