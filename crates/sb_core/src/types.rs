use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::number::CompanyNumber;

/// Page section a value or warning originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Identity,
    Financial,
    Publications,
    Directors,
}

impl Section {
    pub fn name(&self) -> &'static str {
        match self {
            Section::Identity => "identity",
            Section::Financial => "financial",
            Section::Publications => "publications",
            Section::Directors => "directors",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Non-fatal problem found while extracting a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub section: Section,
    pub message: String,
}

impl Warning {
    pub fn new(section: Section, message: impl Into<String>) -> Self {
        Self {
            section,
            message: message.into(),
        }
    }

    pub fn section_not_found(section: Section) -> Self {
        Self::new(section, format!("{} section not found", section))
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Where a best-effort value came from and how much the extractor trusts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub section: Section,
    pub confidence: Confidence,
}

impl Provenance {
    pub fn new(section: Section, confidence: Confidence) -> Self {
        Self { section, confidence }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    Active,
    Dissolved,
    #[default]
    Unknown,
}

impl fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompanyStatus::Active => "active",
            CompanyStatus::Dissolved => "dissolved",
            CompanyStatus::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    Assets,
    GrossMargin,
    OperatingProfit,
    Taxes,
    Equity,
    Debts,
    EmployeeCount,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::Assets => "assets",
            Metric::GrossMargin => "gross_margin",
            Metric::OperatingProfit => "operating_profit",
            Metric::Taxes => "taxes",
            Metric::Equity => "equity",
            Metric::Debts => "debts",
            Metric::EmployeeCount => "employee_count",
        }
    }

    pub fn is_monetary(&self) -> bool {
        !matches!(self, Metric::EmployeeCount)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decimal value with an optional currency tag (`None` for counts).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    pub currency: Option<String>,
}

impl Amount {
    pub fn eur(value: Decimal) -> Self {
        Self {
            value,
            currency: Some("EUR".to_string()),
        }
    }

    pub fn count(value: Decimal) -> Self {
        Self { value, currency: None }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.currency {
            Some(currency) => write!(f, "{} {}", self.value, currency),
            None => write!(f, "{}", self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialEntry {
    pub fiscal_year: i32,
    pub metric: Metric,
    pub value: Amount,
    pub source_section: Provenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationType {
    Appointment,
    Dissolution,
    AnnualAccount,
    Other,
}

impl fmt::Display for PublicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PublicationType::Appointment => "appointment",
            PublicationType::Dissolution => "dissolution",
            PublicationType::AnnualAccount => "annual_account",
            PublicationType::Other => "other",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: PublicationType,
    pub document_url: Option<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Director,
    Manager,
    Auditor,
    Other,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Director => "director",
            Role::Manager => "manager",
            Role::Auditor => "auditor",
            Role::Other => "other",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Person {
    pub full_name: String,
    pub role: Role,
    pub appointment_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Registered economic activity (NACE-BEL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub description: String,
    pub nace_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    AnnualReport,
    ArticlesOfAssociation,
    OfficialPublication,
    Report,
    BalanceSheet,
    Document,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::AnnualReport => "annual_report",
            DocumentKind::ArticlesOfAssociation => "articles_of_association",
            DocumentKind::OfficialPublication => "official_publication",
            DocumentKind::Report => "report",
            DocumentKind::BalanceSheet => "balance_sheet",
            DocumentKind::Document => "document",
        })
    }
}

/// Linked document (usually a PDF) found on the registry page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub url: String,
    pub kind: DocumentKind,
}

/// Everything extracted for one company in one call.
///
/// Absent values use the empty form of their type (empty string, empty list,
/// `CompanyStatus::Unknown`); a partially populated record is a normal result and the
/// reasons are listed in `issues`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    company_number: CompanyNumber,
    pub name: String,
    pub legal_form: String,
    pub registered_address: String,
    pub status: CompanyStatus,
    pub retrieved_at: DateTime<Utc>,
    pub source_url: String,
    pub activities: Vec<Activity>,
    pub financial_history: Vec<FinancialEntry>,
    pub publications: Vec<Publication>,
    pub directors: BTreeSet<Person>,
    pub documents: Vec<Document>,
    pub issues: Vec<Warning>,
    /// Provenance of the scalar fields, keyed by field name.
    pub provenance: BTreeMap<String, Provenance>,
}

impl CompanyRecord {
    pub fn new(company_number: CompanyNumber, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            company_number,
            name: String::new(),
            legal_form: String::new(),
            registered_address: String::new(),
            status: CompanyStatus::Unknown,
            retrieved_at,
            source_url: String::new(),
            activities: Vec::new(),
            financial_history: Vec::new(),
            publications: Vec::new(),
            directors: BTreeSet::new(),
            documents: Vec::new(),
            issues: Vec::new(),
            provenance: BTreeMap::new(),
        }
    }

    pub fn company_number(&self) -> &CompanyNumber {
        &self.company_number
    }

    /// Sections that produced at least one warning.
    pub fn incomplete_sections(&self) -> BTreeSet<Section> {
        self.issues.iter().map(|w| w.section).collect()
    }
}
