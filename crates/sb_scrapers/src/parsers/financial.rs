use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use sb_core::{Amount, Confidence, FinancialEntry, Metric, Provenance, Section};
use std::collections::BTreeSet;

use super::{parse_amount, parse_year, row_cells, SectionResult, ROW};

lazy_static! {
    static ref TABLE: Selector = Selector::parse("table").unwrap();
    static ref YEAR_HEADER: Regex =
        Regex::new(r"(?i)boekjaar|^jaar|year|exercice|année|afsluit|datum|date|periode").unwrap();
}

const METRIC_KEYWORDS: [(Metric, &[&str]); 8] = [
    (Metric::GrossMargin, &["brutomarge", "gross margin", "marge brute"]),
    (
        Metric::OperatingProfit,
        &["bedrijfswinst", "bedrijfsresultaat", "operating profit", "résultat d'exploitation"],
    ),
    (
        Metric::Revenue,
        &["omzet", "bedrijfsopbrengsten", "turnover", "revenue", "chiffre d'affaires"],
    ),
    (Metric::Assets, &["activa", "balanstotaal", "assets", "actif"]),
    (Metric::Taxes, &["belastingen", "taxes", "impôts"]),
    (Metric::Equity, &["eigen vermogen", "equity", "capitaux propres"]),
    (Metric::Debts, &["schulden", "debts", "dettes"]),
    (
        Metric::EmployeeCount,
        &["werknemers", "personeelsleden", "employees", "fte", "effectif"],
    ),
];

pub(crate) fn metric_for(label: &str) -> Option<Metric> {
    let label = label.to_lowercase();
    METRIC_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| label.contains(k)))
        .map(|(metric, _)| *metric)
}

/// Extracts per-year figures from the key figures table(s).
///
/// Two layouts are understood: one row per fiscal year with a column per metric, and the
/// transposed form with one row per metric and a column per year. Cells holding `-` or
/// nothing are treated as "not reported".
pub fn parse_financial(raw: &str) -> SectionResult<Vec<FinancialEntry>> {
    let document = Html::parse_document(raw);
    let mut result = SectionResult::<Vec<FinancialEntry>>::new(Section::Financial);
    let mut recognised = false;

    for table in document.select(&TABLE) {
        let rows: Vec<Vec<String>> = table.select(&ROW).map(row_cells).collect();
        let Some(header) = rows.first() else {
            continue;
        };
        if let Some(year_column) = header.iter().position(|label| YEAR_HEADER.is_match(label)) {
            if header.iter().any(|label| metric_for(label).is_some()) {
                recognised = true;
                by_year_rows(&rows, year_column, &mut result);
                continue;
            }
        }
        if is_year_header(header) && rows[1..].iter().any(|row| is_metric_row(row)) {
            recognised = true;
            by_metric_rows(&rows, &mut result);
        }
    }

    if !recognised {
        return SectionResult::missing(Section::Financial);
    }
    if result.data.is_empty() {
        result.warn("financial table contains no values");
        return result;
    }

    let years: BTreeSet<i32> = result.data.iter().map(|e| e.fiscal_year).collect();
    if let (Some(first), Some(last)) = (years.first(), years.last()) {
        for year in *first..*last {
            if !years.contains(&year) {
                result.warn(format!("financial table missing {} row", year));
            }
        }
    }

    result
}

fn is_year_header(header: &[String]) -> bool {
    let years: Vec<&String> = header.iter().skip(1).filter(|c| !c.is_empty()).collect();
    !years.is_empty() && years.iter().all(|c| c.len() <= 12 && parse_year(c).is_some())
}

fn is_metric_row(row: &[String]) -> bool {
    row.first().and_then(|label| metric_for(label)).is_some()
}

fn by_year_rows(
    rows: &[Vec<String>],
    year_column: usize,
    result: &mut SectionResult<Vec<FinancialEntry>>,
) {
    let header = &rows[0];
    let provenance = Provenance::new(Section::Financial, Confidence::High);
    let mut columns = Vec::new();

    for (index, label) in header.iter().enumerate() {
        if index == year_column || label.is_empty() {
            continue;
        }
        match metric_for(label) {
            Some(metric) => columns.push((index, metric)),
            None => result.warn(format!("financial table column '{}' not recognised", label)),
        }
    }

    for row in &rows[1..] {
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let Some(year) = row.get(year_column).and_then(|cell| parse_year(cell)) else {
            result.warn("financial table row without fiscal year skipped");
            continue;
        };
        for (index, metric) in &columns {
            let cell = row.get(*index).map(String::as_str).unwrap_or_default();
            push_value(result, year, *metric, &header[*index], cell, provenance);
        }
    }
}

fn by_metric_rows(rows: &[Vec<String>], result: &mut SectionResult<Vec<FinancialEntry>>) {
    let header = &rows[0];
    let provenance = Provenance::new(Section::Financial, Confidence::Medium);
    let years: Vec<(usize, i32)> = header
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(index, label)| parse_year(label).map(|year| (index, year)))
        .collect();

    for row in &rows[1..] {
        let Some(label) = row.first() else {
            continue;
        };
        let Some(metric) = metric_for(label) else {
            if !label.is_empty() {
                result.warn(format!("financial table row '{}' not recognised", label));
            }
            continue;
        };
        for (index, year) in &years {
            let cell = row.get(*index).map(String::as_str).unwrap_or_default();
            push_value(result, *year, metric, label, cell, provenance);
        }
    }
}

fn push_value(
    result: &mut SectionResult<Vec<FinancialEntry>>,
    year: i32,
    metric: Metric,
    label: &str,
    cell: &str,
    provenance: Provenance,
) {
    let cell = cell.trim();
    if cell.is_empty() || matches!(cell, "-" | "–" | "—" | "n/a" | "/") {
        return;
    }
    let Some(value) = parse_amount(cell) else {
        result.warn(format!(
            "financial table has unreadable {} value '{}' for {}",
            metric, cell, year
        ));
        return;
    };

    let value = if metric.is_monetary() {
        Amount {
            value,
            currency: Some(currency(label, cell).to_string()),
        }
    } else {
        Amount::count(value)
    };

    result.data.push(FinancialEntry {
        fiscal_year: year,
        metric,
        value,
        source_section: provenance,
    });
}

fn currency(label: &str, cell: &str) -> &'static str {
    let text = format!("{} {}", label, cell);
    if text.contains("USD") || text.contains('$') {
        "USD"
    } else if text.contains("GBP") || text.contains('£') {
        "GBP"
    } else {
        "EUR"
    }
}
