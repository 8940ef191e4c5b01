use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html};
use sb_core::{CompanyStatus, Confidence, Provenance, Publication, PublicationType, Section};
use url::Url;

use super::{
    default_base, is_header_row, normalize_whitespace, page_base, parse_date, section_elements,
    strip_first_date, Claim, SectionResult, LINK,
};

lazy_static! {
    static ref HEADING: Regex =
        Regex::new(r"(?i)publicaties|publications|belgisch staatsblad|moniteur belge").unwrap();
    static ref LINK_LABEL: Regex =
        Regex::new(r"(?i)^(pdf|download|bekijk|view|voir|document)$").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Publications {
    pub publications: Vec<Publication>,
    /// Status implied by the most recent dissolution notice, if any.
    pub status: Option<Claim<CompanyStatus>>,
}

pub fn parse_publications(raw: &str) -> SectionResult<Publications> {
    parse_publications_with_base(raw, &default_base())
}

pub fn parse_publications_with_base(raw: &str, base: &Url) -> SectionResult<Publications> {
    let document = Html::parse_document(raw);
    let base = page_base(&document, base);
    let Some(elements) = section_elements(&document, &HEADING) else {
        return SectionResult::missing(Section::Publications);
    };

    let mut result = SectionResult::<Publications>::new(Section::Publications);
    for entry in elements {
        if !matches!(entry.value().name(), "tr" | "li") || is_header_row(entry) {
            continue;
        }
        if let Some(publication) = publication(entry, &base) {
            result.data.publications.push(publication);
        }
    }

    if result.data.publications.is_empty() {
        result.warn("publications section contains no dated entries");
        return result;
    }

    result.data.status = result
        .data
        .publications
        .iter()
        .filter(|p| p.kind == PublicationType::Dissolution)
        .map(|p| p.date)
        .max()
        .map(|date| {
            Claim::new(
                CompanyStatus::Dissolved,
                Some(date),
                Provenance::new(Section::Publications, Confidence::Medium),
            )
        });

    result
}

fn publication(entry: ElementRef<'_>, base: &Url) -> Option<Publication> {
    let summary = summary_text(entry);
    let date = parse_date(&summary)?;
    let summary = strip_first_date(&summary)
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | ':' | '|'))
        .to_string();

    let document_url = entry
        .select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.starts_with('#'))
        .find_map(|href| base.join(href).ok())
        .map(|url| url.to_string());

    Some(Publication {
        date,
        kind: classify(&summary),
        document_url,
        summary,
    })
}

/// Entry text without generic link labels like "PDF".
fn summary_text(entry: ElementRef<'_>) -> String {
    let parts: Vec<&str> = entry
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let is_link_label = node
                .parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|parent| {
                    parent.value().name() == "a" && LINK_LABEL.is_match(text.trim())
                });
            (!is_link_label).then_some(&**text)
        })
        .collect();
    normalize_whitespace(&parts.join(" "))
}

pub(crate) fn classify(summary: &str) -> PublicationType {
    let summary = summary.to_lowercase();
    let has = |keywords: &[&str]| keywords.iter().any(|k| summary.contains(k));

    if has(&[
        "ontbinding",
        "vereffening",
        "faillissement",
        "sluiting",
        "dissolution",
        "liquidation",
        "faillite",
    ]) {
        PublicationType::Dissolution
    } else if has(&["jaarrekening", "comptes annuels", "annual account"]) {
        PublicationType::AnnualAccount
    } else if has(&["benoeming", "ontslag", "nomination", "démission", "appointment"]) {
        PublicationType::Appointment
    } else {
        PublicationType::Other
    }
}
