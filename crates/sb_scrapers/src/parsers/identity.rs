use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use sb_core::{Activity, CompanyStatus, Confidence, Document, DocumentKind, Provenance, Section};
use std::collections::HashSet;
use url::Url;

use super::{
    default_base, element_text, is_header_row, label_key, normalize_whitespace, page_base,
    parse_date, section_elements, Claim, SectionResult, LINK, ROW,
};

lazy_static! {
    static ref H1: Selector = Selector::parse("h1").unwrap();
    static ref TITLE: Selector = Selector::parse("title").unwrap();
    static ref BLOCK: Selector = Selector::parse("table, dl").unwrap();
    static ref ACTIVITIES_HEADING: Regex =
        Regex::new(r"(?i)activiteit|activités|activities|nace").unwrap();
    static ref NACE: Regex = Regex::new(r"\((\d{2}\.?\d{2,3})\)").unwrap();
    static ref POSTAL_ADDRESS: Regex =
        Regex::new(r"\b[1-9]\d{3}\s+\p{Lu}[\p{L}'\- ]+$").unwrap();
    static ref DISSOLVED: Regex = Regex::new(
        r"(?i)inactie|stopgezet|stopzetting|ontbonden|ontbinding|vereffening|faillissement|gesloten|dissolved|dissolution|liquidation|dissoute|radiée|closed"
    )
    .unwrap();
    static ref ACTIVE: Regex =
        Regex::new(r"(?i)actief|active|actif|normale toestand|situation normale|bestaand").unwrap();
    static ref GENERIC_LINK_LABEL: Regex =
        Regex::new(r"(?i)^(pdf|download|downloaden|bekijk|view|voir|document|télécharger)?$").unwrap();
    static ref TEXT_PDF_URL: Regex = Regex::new(r#"https?://[^\s"'<>]+\.pdf"#).unwrap();
}

/// Identity data as found on the page, before conflicts are resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    /// Company number printed on the page, verbatim.
    pub reported_number: Option<String>,
    pub names: Vec<Claim<String>>,
    pub legal_forms: Vec<Claim<String>>,
    pub addresses: Vec<Claim<String>>,
    pub statuses: Vec<Claim<CompanyStatus>>,
    pub activities: Vec<Activity>,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    LegalForm,
    Number,
    Status,
    Address,
    Updated,
}

fn field_for(key: &str) -> Option<Field> {
    let field = match key {
        "vennootschapsnaam" | "naam van de onderneming" | "benaming" | "maatschappelijke naam"
        | "dénomination" | "denomination" | "company name" => Field::Name,
        "vennootschapsvorm" | "rechtsvorm" | "forme juridique" | "forme légale" | "legal form" => {
            Field::LegalForm
        }
        "ondernemingsnummer" | "numéro d'entreprise" | "company number" | "enterprise number" => {
            Field::Number
        }
        "status" | "statut" | "juridische situatie" | "rechtstoestand" | "situation juridique"
        | "legal situation" => Field::Status,
        "adres" | "zetel" | "maatschappelijke zetel" | "adresse" | "siège" | "address"
        | "registered address" => Field::Address,
        "laatste publicatie" | "laatst bijgewerkt" | "bijgewerkt op" | "dernière publication"
        | "last update" | "last publication" => Field::Updated,
        _ => return None,
    };
    Some(field)
}

/// Maps a registry status text (Dutch, French or English) onto [`CompanyStatus`].
pub(crate) fn parse_status(text: &str) -> Option<CompanyStatus> {
    if DISSOLVED.is_match(text) {
        Some(CompanyStatus::Dissolved)
    } else if ACTIVE.is_match(text) {
        Some(CompanyStatus::Active)
    } else {
        None
    }
}

pub fn parse_identity(raw: &str) -> SectionResult<Identity> {
    parse_identity_with_base(raw, &default_base())
}

pub fn parse_identity_with_base(raw: &str, base: &Url) -> SectionResult<Identity> {
    let document = Html::parse_document(raw);
    let base = page_base(&document, base);
    let mut result = SectionResult::<Identity>::new(Section::Identity);

    let pairs = key_value_pairs(&document);
    let as_of = pairs
        .iter()
        .filter(|(field, _)| *field == Field::Updated)
        .find_map(|(_, value)| parse_date(value));
    let table = Provenance::new(Section::Identity, Confidence::High);
    let mut unrecognised_status = false;

    for (field, value) in &pairs {
        if value.is_empty() {
            continue;
        }
        let data = &mut result.data;
        match field {
            Field::Name => data.names.push(Claim::new(value.clone(), as_of, table)),
            Field::LegalForm => data.legal_forms.push(Claim::new(value.clone(), as_of, table)),
            Field::Address => data.addresses.push(Claim::new(value.clone(), as_of, table)),
            Field::Number => {
                data.reported_number.get_or_insert_with(|| value.clone());
            }
            Field::Status => match parse_status(value) {
                Some(status) => data.statuses.push(Claim::new(status, as_of, table)),
                None => {
                    unrecognised_status = true;
                    result.warnings.push(sb_core::Warning::new(
                        Section::Identity,
                        format!("unrecognised status '{}'", value),
                    ));
                }
            },
            Field::Updated => {}
        }
    }

    if let Some(heading) = document.select(&H1).next().map(element_text) {
        if !heading.is_empty() {
            let provenance = Provenance::new(Section::Identity, Confidence::Medium);
            result.data.names.push(Claim::new(heading, None, provenance));
        }
    }
    if result.data.names.is_empty() {
        if let Some(title) = document.select(&TITLE).next().map(element_text) {
            let name = title
                .split(" - ")
                .next()
                .and_then(|head| head.split(" | ").next())
                .unwrap_or_default()
                .trim()
                .to_string();
            if !name.is_empty() {
                let provenance = Provenance::new(Section::Identity, Confidence::Low);
                result.data.names.push(Claim::new(name, None, provenance));
            }
        }
    }

    let found = !pairs.is_empty() || document.select(&H1).next().is_some();

    if result.data.addresses.is_empty() && found {
        if let Some(address) = address_from_text(&document) {
            let provenance = Provenance::new(Section::Identity, Confidence::Low);
            result.data.addresses.push(Claim::new(address, None, provenance));
        }
    }

    result.data.activities = activities(&document);
    result.data.documents = documents(&document, &base);

    if !found {
        result.warnings.push(sb_core::Warning::section_not_found(Section::Identity));
        return result;
    }
    if result.data.names.is_empty() {
        result.warn("identity section missing company name");
    }
    if result.data.legal_forms.is_empty() {
        result.warn("identity section missing legal form");
    }
    if result.data.addresses.is_empty() {
        result.warn("identity section missing registered address");
    }
    if result.data.statuses.is_empty() && !unrecognised_status {
        result.warn("identity section missing status");
    }

    result
}

/// True when the page carries a label/value block with registry identity fields.
pub(crate) fn has_identity_block(document: &Html) -> bool {
    !key_value_pairs(document).is_empty()
}

/// Known label/value pairs of the identity block.
///
/// Every table and definition list is read on its own; the one with the most recognised
/// labels is the identity block, ties going to the first on the page. Other blocks, such as
/// a list of related entities, never contribute.
fn key_value_pairs(document: &Html) -> Vec<(Field, String)> {
    let blocks: Vec<Vec<(Field, String)>> = document
        .select(&BLOCK)
        .map(|block| match block.value().name() {
            "dl" => list_pairs(block),
            _ => table_pairs(block),
        })
        .filter(|pairs| !pairs.is_empty())
        .collect();

    blocks
        .into_iter()
        .rev()
        .max_by_key(Vec::len)
        .unwrap_or_default()
}

fn table_pairs(table: ElementRef<'_>) -> Vec<(Field, String)> {
    let mut pairs = Vec::new();

    for row in table.select(&ROW) {
        let owner = row
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "table");
        if owner.map(|el| el.id()) != Some(table.id()) || is_header_row(row) {
            continue;
        }
        let cells: Vec<String> = row.select(&super::CELL).map(element_text).collect();
        if cells.len() < 2 {
            continue;
        }
        if let Some(field) = field_for(&label_key(&cells[0])) {
            pairs.push((field, cells[1].clone()));
        }
    }

    pairs
}

fn list_pairs(list: ElementRef<'_>) -> Vec<(Field, String)> {
    let mut pairs = Vec::new();
    let mut label: Option<String> = None;

    for child in list.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "dt" => label = Some(label_key(&element_text(child))),
            "dd" => {
                if let Some(field) = label.take().as_deref().and_then(field_for) {
                    pairs.push((field, element_text(child)));
                }
            }
            _ => {}
        }
    }

    pairs
}

fn address_from_text(document: &Html) -> Option<String> {
    document
        .root_element()
        .text()
        .map(normalize_whitespace)
        .find(|text| text.len() < 120 && POSTAL_ADDRESS.is_match(text))
}

fn activities(document: &Html) -> Vec<Activity> {
    let Some(elements) = section_elements(document, &ACTIVITIES_HEADING) else {
        return Vec::new();
    };

    elements
        .into_iter()
        .filter(|el| el.value().name() == "li")
        .map(element_text)
        .filter(|text| !text.is_empty() && !text.starts_with('('))
        .map(|text| {
            let nace_code = NACE
                .captures(&text)
                .map(|caps| caps[1].replace('.', ""));
            let description = normalize_whitespace(&NACE.replace(&text, ""));
            Activity {
                description,
                nace_code,
            }
        })
        .collect()
}

fn documents(document: &Html, base: &Url) -> Vec<Document> {
    let mut seen = HashSet::new();
    let mut documents = Vec::new();

    for link in document.select(&LINK) {
        let Some(url) = link.value().attr("href").and_then(|href| base.join(href).ok()) else {
            continue;
        };
        let path = url.path().to_lowercase();
        if !(path.ends_with(".pdf") || path.contains("/pdf/")) {
            continue;
        }
        let text = element_text(link);
        let title = if GENERIC_LINK_LABEL.is_match(&text) {
            file_name(&url)
        } else {
            text.clone()
        };
        if seen.insert(url.to_string()) {
            documents.push(Document {
                kind: classify_document(&text, url.as_str()),
                title,
                url: url.to_string(),
            });
        }
    }

    let page_text = document.root_element().text().collect::<Vec<_>>().join(" ");
    for found in TEXT_PDF_URL.find_iter(&page_text) {
        let Ok(url) = Url::parse(found.as_str()) else {
            continue;
        };
        if seen.insert(url.to_string()) {
            documents.push(Document {
                title: format!("PDF Document - {}", file_name(&url)),
                kind: classify_document("", url.as_str()),
                url: url.to_string(),
            });
        }
    }

    documents
}

fn file_name(url: &Url) -> String {
    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("document");
    if name.to_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{}.pdf", name)
    }
}

pub(crate) fn classify_document(text: &str, url: &str) -> DocumentKind {
    let haystack = format!("{} {}", text, url).to_lowercase();
    let has = |keywords: &[&str]| keywords.iter().any(|k| haystack.contains(k));

    if has(&["jaarrekening", "annual", "financial"]) {
        DocumentKind::AnnualReport
    } else if has(&["statuten", "articles", "constitution"]) {
        DocumentKind::ArticlesOfAssociation
    } else if has(&["publicatie", "publication", "gazette"]) {
        DocumentKind::OfficialPublication
    } else if has(&["verslag", "report"]) {
        DocumentKind::Report
    } else if has(&["balans", "balance"]) {
        DocumentKind::BalanceSheet
    } else {
        DocumentKind::Document
    }
}
