use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CompanyRecord;
use crate::Result;

/// Outcome of an external VAT-number check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatCheck {
    pub valid: bool,
    pub country_code: String,
    pub vat_number: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[async_trait]
pub trait VatValidator: Send + Sync {
    /// Check a VAT number; `country_code` is the 2-letter prefix (e.g. "BE").
    async fn validate(&self, country_code: &str, vat_number: &str) -> Result<VatCheck>;
}

#[async_trait]
pub trait ReportGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Produce a prose report from an extracted record and an optional VAT check.
    async fn generate(&self, record: &CompanyRecord, vat: Option<&VatCheck>) -> Result<String>;
}
