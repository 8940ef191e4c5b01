//! Section parsers for registry pages.
//!
//! Each parser takes raw page content and returns a [`SectionResult`]: whatever it could
//! extract plus the warnings explaining what it could not. None of them fail on missing
//! markup and none of them look at another parser's output.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use sb_core::{Provenance, Section, Warning};
use std::str::FromStr;
use url::Url;

pub mod directors;
pub mod financial;
pub mod identity;
pub mod publications;

pub use directors::parse_directors;
pub use financial::parse_financial;
pub use identity::{parse_identity, Identity};
pub use publications::{parse_publications, Publications};

/// Default base for resolving relative links when the page carries no `<base href>`.
pub const DEFAULT_BASE_URL: &str = "https://staatsbladmonitor.be";

lazy_static! {
    static ref DATE_DMY: Regex =
        Regex::new(r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{4})\b").unwrap();
    static ref DATE_ISO: Regex = Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap();
    static ref YEAR: Regex = Regex::new(r"\b((?:19|20)\d{2})\b").unwrap();
    static ref BASE: Selector = Selector::parse("base[href]").unwrap();
    pub(crate) static ref ROW: Selector = Selector::parse("tr").unwrap();
    pub(crate) static ref CELL: Selector = Selector::parse("td, th").unwrap();
    pub(crate) static ref LINK: Selector = Selector::parse("a[href]").unwrap();
    static ref DEFAULT_BASE: Url = Url::parse(DEFAULT_BASE_URL).unwrap();
}

/// Output of one section parser.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionResult<T> {
    pub section: Section,
    pub data: T,
    pub warnings: Vec<Warning>,
}

impl<T: Default> SectionResult<T> {
    pub fn new(section: Section) -> Self {
        Self {
            section,
            data: T::default(),
            warnings: Vec::new(),
        }
    }

    /// Empty result for a section whose markers were not found on the page.
    pub fn missing(section: Section) -> Self {
        let mut result = Self::new(section);
        result.warnings.push(Warning::section_not_found(section));
        result
    }
}

impl<T> SectionResult<T> {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(Warning::new(self.section, message));
    }
}

/// Candidate value for a scalar field, dated when the page says how current it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim<T> {
    pub value: T,
    pub as_of: Option<NaiveDate>,
    pub provenance: Provenance,
}

impl<T> Claim<T> {
    pub fn new(value: T, as_of: Option<NaiveDate>, provenance: Provenance) -> Self {
        Self {
            value,
            as_of,
            provenance,
        }
    }
}

/// Text content of an element with whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rank of a section marker: 1 to 6 for `h1`..`h6`, 7 for a table caption or fieldset legend.
fn heading_level(element: ElementRef<'_>) -> Option<u8> {
    match element.value().name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        "caption" | "legend" => Some(7),
        _ => None,
    }
}

/// Elements that follow the first heading matching `heading`, up to the next `h1`..`h6`
/// of the same or a higher rank.
///
/// Sub-headings and captions inside the section are kept as elements. Returns `None` when no
/// heading matches, which callers report as a missing section.
pub(crate) fn section_elements<'a>(document: &'a Html, heading: &Regex) -> Option<Vec<ElementRef<'a>>> {
    let mut level: Option<u8> = None;
    let mut elements = Vec::new();

    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let rank = heading_level(element);
        match level {
            None => {
                if rank.is_some() && heading.is_match(&element_text(element)) {
                    level = rank;
                }
            }
            Some(current) => {
                if matches!(rank, Some(r) if r <= 6 && r <= current) {
                    break;
                }
                elements.push(element);
            }
        }
    }

    level.map(|_| elements)
}

/// Cell texts of a table row.
pub(crate) fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.select(&CELL).map(element_text).collect()
}

/// True when every cell of the row is a `<th>`.
pub(crate) fn is_header_row(row: ElementRef<'_>) -> bool {
    let mut cells = row.select(&CELL).peekable();
    cells.peek().is_some() && cells.all(|cell| cell.value().name() == "th")
}

/// Key of a label cell: lowercase, trimmed, without trailing colon.
pub(crate) fn label_key(text: &str) -> String {
    text.trim().trim_end_matches(':').trim().to_lowercase()
}

/// First date in `text`, accepting `dd-mm-yyyy`, `dd/mm/yyyy`, `dd.mm.yyyy` and ISO.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    find_dates(text).into_iter().next()
}

/// All dates in `text`, in order of appearance.
pub fn find_dates(text: &str) -> Vec<NaiveDate> {
    let mut found: Vec<(usize, NaiveDate)> = Vec::new();

    for caps in DATE_DMY.captures_iter(text) {
        let (Ok(day), Ok(month), Ok(year)) =
            (caps[1].parse::<u32>(), caps[2].parse::<u32>(), caps[3].parse::<i32>())
        else {
            continue;
        };
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            found.push((caps.get(0).map_or(0, |m| m.start()), date));
        }
    }
    for caps in DATE_ISO.captures_iter(text) {
        let (Ok(year), Ok(month), Ok(day)) =
            (caps[1].parse::<i32>(), caps[2].parse::<u32>(), caps[3].parse::<u32>())
        else {
            continue;
        };
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            found.push((caps.get(0).map_or(0, |m| m.start()), date));
        }
    }

    found.sort_by_key(|(position, _)| *position);
    found.into_iter().map(|(_, date)| date).collect()
}

/// Removes the first date occurrence from `text`.
pub(crate) fn strip_first_date(text: &str) -> String {
    let dmy = DATE_DMY.find(text);
    let iso = DATE_ISO.find(text);
    let first = match (dmy, iso) {
        (Some(a), Some(b)) => Some(if a.start() <= b.start() { a } else { b }),
        (a, b) => a.or(b),
    };
    match first {
        Some(m) => format!("{}{}", &text[..m.start()], &text[m.end()..]),
        None => text.to_string(),
    }
}

/// Last four-digit year in `text` (a fiscal year end like `31-12-2022` yields 2022).
pub fn parse_year(text: &str) -> Option<i32> {
    YEAR.captures_iter(text)
        .last()
        .and_then(|caps| caps[1].parse().ok())
}

/// Parses an amount written the Belgian way (`1.000.000,50`), the English way
/// (`1,000,000.50`) or plainly (`1000000`). Currency markers are ignored.
///
/// Returns `None` for empty cells and placeholders such as `-`.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .replace("EUR", "")
        .replace("USD", "")
        .replace("GBP", "")
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '€' | '$' | '£' | '\u{a0}'))
        .collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let normalized = match (digits.rfind('.'), digits.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => digits.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => digits.replace(',', ""),
        (None, Some(comma)) => {
            if digits.matches(',').count() == 1 && digits.len() - comma - 1 != 3 {
                digits.replace(',', ".")
            } else {
                digits.replace(',', "")
            }
        }
        (Some(dot), None) => {
            if digits.matches('.').count() > 1 || digits.len() - dot - 1 == 3 {
                digits.replace('.', "")
            } else {
                digits.to_string()
            }
        }
        (None, None) => digits.to_string(),
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

/// Base URL declared by the page, falling back to `fallback`.
pub(crate) fn page_base(document: &Html, fallback: &Url) -> Url {
    document
        .select(&BASE)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| fallback.join(href).ok())
        .unwrap_or_else(|| fallback.clone())
}

pub(crate) fn default_base() -> Url {
    DEFAULT_BASE.clone()
}
