//! Merges section parser output into one [`CompanyRecord`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sb_core::{
    CompanyNumber, CompanyRecord, Error, FinancialEntry, Person, Publication,
    Result, Section, Warning,
};

use crate::parsers::{Claim, Identity, Publications, SectionResult};

pub struct Normalizer {
    requested: CompanyNumber,
    retrieved_at: DateTime<Utc>,
    source_url: String,
    issues: Vec<Warning>,
}

impl Normalizer {
    pub fn new(requested: CompanyNumber, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            requested,
            retrieved_at,
            source_url: String::new(),
            issues: Vec::new(),
        }
    }

    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = source_url.into();
        self
    }

    /// Warnings raised before parsing (e.g. detail pages that could not be fetched).
    pub fn with_issues(mut self, issues: Vec<Warning>) -> Self {
        self.issues = issues;
        self
    }

    /// Builds the record.
    ///
    /// Scalars with several candidates keep the most recent one, then the most confident,
    /// then the first seen. Lists are sorted newest first and exact duplicates dropped.
    /// Fails only when the page reports a different company than the one requested.
    pub fn normalize(
        self,
        identity: SectionResult<Identity>,
        financial: SectionResult<Vec<FinancialEntry>>,
        publications: SectionResult<Publications>,
        directors: SectionResult<Vec<Person>>,
    ) -> Result<CompanyRecord> {
        let mut issues = self.issues;

        if let Some(reported) = &identity.data.reported_number {
            match CompanyNumber::parse(reported) {
                Ok(number) if number != self.requested => {
                    return Err(Error::Validation(format!(
                        "page describes company {} instead of {}",
                        number, self.requested
                    )));
                }
                Ok(_) => {}
                Err(_) => issues.push(Warning::new(
                    Section::Identity,
                    format!("unreadable company number '{}' on page", reported),
                )),
            }
        }

        let mut record = CompanyRecord::new(self.requested, self.retrieved_at);
        record.source_url = self.source_url;

        let Identity {
            names,
            legal_forms,
            addresses,
            mut statuses,
            activities,
            documents,
            ..
        } = identity.data;

        if let Some(claim) = resolve(names) {
            record.provenance.insert("name".to_string(), claim.provenance);
            record.name = claim.value;
        }
        if let Some(claim) = resolve(legal_forms) {
            record.provenance.insert("legal_form".to_string(), claim.provenance);
            record.legal_form = claim.value;
        }
        if let Some(claim) = resolve(addresses) {
            record
                .provenance
                .insert("registered_address".to_string(), claim.provenance);
            record.registered_address = claim.value;
        }
        statuses.extend(publications.data.status);
        if let Some(claim) = resolve(statuses) {
            record.provenance.insert("status".to_string(), claim.provenance);
            record.status = claim.value;
        }

        record.activities = activities;
        record.documents = documents;
        record.financial_history = financial_history(financial.data);
        record.publications = publication_list(publications.data.publications);
        record.directors = directors.data.into_iter().collect();

        issues.extend(identity.warnings);
        issues.extend(financial.warnings);
        issues.extend(publications.warnings);
        issues.extend(directors.warnings);
        record.issues = issues;

        Ok(record)
    }
}

/// Most recent claim wins; undated claims rank below dated ones. Ties go to the higher
/// confidence, then to the earliest claim.
pub(crate) fn resolve<T>(claims: Vec<Claim<T>>) -> Option<Claim<T>> {
    let mut best: Option<Claim<T>> = None;
    for claim in claims {
        let better = match &best {
            None => true,
            Some(current) => {
                (claim.as_of, claim.provenance.confidence)
                    > (current.as_of, current.provenance.confidence)
            }
        };
        if better {
            best = Some(claim);
        }
    }
    best
}

fn financial_history(mut entries: Vec<FinancialEntry>) -> Vec<FinancialEntry> {
    entries.sort_by(|a, b| {
        b.fiscal_year
            .cmp(&a.fiscal_year)
            .then(a.metric.cmp(&b.metric))
            .then(b.source_section.confidence.cmp(&a.source_section.confidence))
    });
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert((e.fiscal_year, e.metric, e.value.clone())));
    entries
}

fn publication_list(mut publications: Vec<Publication>) -> Vec<Publication> {
    publications.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then(a.kind.cmp(&b.kind))
            .then(a.document_url.cmp(&b.document_url))
    });
    publications.dedup_by(|b, a| {
        a.date == b.date && a.kind == b.kind && a.document_url == b.document_url
    });
    publications
}
