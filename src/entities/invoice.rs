//! INV entity type - Invoice to a dentist for delivered worksheets

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};
use crate::impl_entity;

/// Round a money amount to cents, halves away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Invoice lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Issued,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    /// Live invoices hold their worksheets
    pub fn is_live(&self) -> bool {
        !matches!(self, InvoiceStatus::Cancelled)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "draft"),
            InvoiceStatus::Issued => write!(f, "issued"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "issued" => Ok(InvoiceStatus::Issued),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" | "canceled" => Ok(InvoiceStatus::Cancelled),
            _ => Err(format!(
                "Invalid invoice status: {}. Use draft, issued, paid, or cancelled",
                s
            )),
        }
    }
}

/// Invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worksheet: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<EntityId>,

    pub quantity: Decimal,

    pub unit_price: Decimal,

    /// VAT rate in percent
    pub vat_rate: Decimal,
}

impl InvoiceLine {
    /// Net amount, rounded to cents
    pub fn net(&self) -> Decimal {
        round_money(self.quantity * self.unit_price)
    }
}

/// VAT subtotal for one rate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VatBreakdown {
    pub rate: Decimal,
    pub base: Decimal,
    pub vat: Decimal,
}

/// Invoice totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceTotals {
    pub net: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
    pub breakdown: Vec<VatBreakdown>,
}

/// Invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier (INV-xxx)
    pub id: EntityId,

    pub title: String,

    /// Sequential number, assigned when the invoice is issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    /// Billed dentist (DENT-xxx)
    pub dentist: EntityId,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub worksheets: Vec<EntityId>,

    #[serde(default)]
    pub lines: Vec<InvoiceLine>,

    pub currency: String,

    #[serde(default)]
    pub status: InvoiceStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "crate::core::entity::default_revision")]
    pub entity_revision: u32,
}

impl_entity!(Invoice, EntityPrefix::Inv, "invoice");

impl Invoice {
    pub fn new(dentist: EntityId, currency: String, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Inv),
            title: "Draft invoice".to_string(),
            number: None,
            dentist,
            worksheets: Vec::new(),
            lines: Vec::new(),
            currency,
            status: InvoiceStatus::Draft,
            issue_date: None,
            due_date: None,
            paid_date: None,
            notes: None,
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }

    /// Number if issued, otherwise the short id
    pub fn reference(&self) -> String {
        self.number.clone().unwrap_or_else(|| self.id.short())
    }

    /// Net, VAT per rate (rounded per rate) and grand total
    pub fn totals(&self) -> InvoiceTotals {
        let mut breakdown: Vec<VatBreakdown> = Vec::new();
        for line in &self.lines {
            let net = line.net();
            match breakdown.iter_mut().find(|b| b.rate == line.vat_rate) {
                Some(b) => b.base += net,
                None => breakdown.push(VatBreakdown {
                    rate: line.vat_rate,
                    base: net,
                    vat: Decimal::ZERO,
                }),
            }
        }
        breakdown.sort_by(|a, b| a.rate.cmp(&b.rate));
        for b in &mut breakdown {
            b.vat = round_money(b.base * b.rate / Decimal::ONE_HUNDRED);
        }

        let net: Decimal = breakdown.iter().map(|b| b.base).sum();
        let vat: Decimal = breakdown.iter().map(|b| b.vat).sum();
        InvoiceTotals {
            net,
            vat,
            total: net + vat,
            breakdown,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Issued && self.due_date.is_some_and(|d| d < today)
    }
}
