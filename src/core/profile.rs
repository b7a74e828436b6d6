//! Lab profile - manufacturer identity, billing defaults and QC checklist
//!
//! Stored in `.dlab/lab.yaml` and validated on load.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::core::lab::Lab;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("lab profile not found at {0}. Run 'dlab init' or create .dlab/lab.yaml")]
    Missing(String),

    #[error("invalid lab profile: {0}")]
    Parse(String),

    #[error("lab profile needs exactly one primary bank account, found {0}")]
    PrimaryAccount(usize),

    #[error("lab profile field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("VAT rate {0} is outside 0..=100")]
    VatRate(Decimal),

    #[error("lab profile field '{field}' is {value}, expected 0..={max} days")]
    DaysOutOfRange {
        field: &'static str,
        value: i64,
        max: i64,
    },

    #[error("IO error: {0}")]
    Io(String),
}

/// Bank account printed on invoices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub bank: String,
    pub iban: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bic: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_payment_terms() -> u32 {
    30
}

fn default_invoice_prefix() -> String {
    "R".to_string()
}

fn default_expiry_warning() -> i64 {
    30
}

/// Upper bound for `payment_terms_days`
pub const MAX_PAYMENT_TERMS_DAYS: u32 = 365;

/// Upper bound for `expiry_warning_days` and report look-ahead windows
pub const MAX_WARNING_DAYS: i64 = 3650;

fn default_checklist() -> Vec<String> {
    [
        "fit on model",
        "occlusion and contacts",
        "shade match",
        "margins",
        "surface finish",
        "cleaning and disinfection",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Lab-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabProfile {
    /// Legal manufacturer name
    pub name: String,

    #[serde(default)]
    pub address: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// EUDAMED single registration number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srn: Option<String>,

    /// Person responsible for regulatory compliance; signs Annex XIII statements
    pub responsible_person: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_id: Option<String>,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Default VAT rate in percent
    #[serde(default)]
    pub vat_rate: Decimal,

    #[serde(default = "default_payment_terms")]
    pub payment_terms_days: u32,

    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,

    #[serde(default)]
    pub bank_accounts: Vec<BankAccount>,

    #[serde(default = "default_checklist")]
    pub qc_checklist: Vec<String>,

    /// Inspector must differ from the worksheet technician
    #[serde(default = "crate::core::entity::default_true")]
    pub independent_qc: bool,

    #[serde(default = "default_expiry_warning")]
    pub expiry_warning_days: i64,
}

impl LabProfile {
    /// Load and validate the profile of a lab
    pub fn load(lab: &Lab) -> Result<Self, ProfileError> {
        Self::load_from_path(&lab.dlab_dir().join("lab.yaml"))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ProfileError> {
        if !path.exists() {
            return Err(ProfileError::Missing(path.display().to_string()));
        }
        let content = fs::read_to_string(path).map_err(|e| ProfileError::Io(e.to_string()))?;
        let profile: LabProfile =
            serde_yml::from_str(&content).map_err(|e| ProfileError::Parse(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn save(&self, lab: &Lab) -> Result<(), ProfileError> {
        self.validate()?;
        let yaml = serde_yml::to_string(self).map_err(|e| ProfileError::Parse(e.to_string()))?;
        fs::write(lab.dlab_dir().join("lab.yaml"), yaml).map_err(|e| ProfileError::Io(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::EmptyField("name"));
        }
        if self.responsible_person.trim().is_empty() {
            return Err(ProfileError::EmptyField("responsible_person"));
        }
        if self.invoice_prefix.trim().is_empty() {
            return Err(ProfileError::EmptyField("invoice_prefix"));
        }
        if self.vat_rate < Decimal::ZERO || self.vat_rate > Decimal::ONE_HUNDRED {
            return Err(ProfileError::VatRate(self.vat_rate));
        }
        if self.payment_terms_days > MAX_PAYMENT_TERMS_DAYS {
            return Err(ProfileError::DaysOutOfRange {
                field: "payment_terms_days",
                value: i64::from(self.payment_terms_days),
                max: i64::from(MAX_PAYMENT_TERMS_DAYS),
            });
        }
        if !(0..=MAX_WARNING_DAYS).contains(&self.expiry_warning_days) {
            return Err(ProfileError::DaysOutOfRange {
                field: "expiry_warning_days",
                value: self.expiry_warning_days,
                max: MAX_WARNING_DAYS,
            });
        }
        if !self.bank_accounts.is_empty() {
            let primaries = self.bank_accounts.iter().filter(|a| a.primary).count();
            if primaries != 1 {
                return Err(ProfileError::PrimaryAccount(primaries));
            }
        }
        Ok(())
    }

    pub fn primary_account(&self) -> Option<&BankAccount> {
        self.bank_accounts.iter().find(|a| a.primary)
    }

    /// Default profile template written by `dlab init`
    pub fn default_template() -> &'static str {
        r#"# Lab profile
# Manufacturer identity is printed on Annex XIII statements and invoices.

name: "My Dental Lab"
address:
  - "Street 1"
  - "10000 City"
country: "HR"
# srn: "HR-MF-000000000"
responsible_person: "Lab Manager"
# vat_id: ""

currency: EUR
vat_rate: 25
payment_terms_days: 30
invoice_prefix: "R"

# Exactly one account must be primary
bank_accounts: []
#  - bank: "Example Bank"
#    iban: "HR0000000000000000000"
#    primary: true

qc_checklist:
  - fit on model
  - occlusion and contacts
  - shade match
  - margins
  - surface finish
  - cleaning and disinfection

# Inspector must be someone other than the worksheet technician
independent_qc: true

expiry_warning_days: 30
"#
    }
}
