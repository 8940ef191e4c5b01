//! Renders a [`CompanyRecord`] as JSON, Markdown or plain text.

use std::fmt::Write;
use std::str::FromStr;

use chrono::NaiveDate;
use sb_core::{CompanyRecord, Error, Result};

const NO_DATA: &str = "No data available";
const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Markdown,
    Text,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Json, Format::Markdown, Format::Text];

    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Markdown => "md",
            Format::Text => "txt",
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "markdown" | "md" => Ok(Format::Markdown),
            "text" | "txt" => Ok(Format::Text),
            other => Err(Error::Validation(format!("unknown output format '{}'", other))),
        }
    }
}

pub fn serialize(record: &CompanyRecord, format: Format) -> Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(record)?),
        Format::Markdown => Ok(markdown(record)),
        Format::Text => Ok(text(record)),
    }
}

/// Scalar fields as (label, value) pairs, shared by the Markdown and text renderings.
fn scalars(record: &CompanyRecord) -> Vec<(&'static str, String)> {
    vec![
        ("Company number", record.company_number().formatted()),
        ("Name", or_unknown(&record.name)),
        ("Legal form", or_unknown(&record.legal_form)),
        ("Registered address", or_unknown(&record.registered_address)),
        ("Status", record.status.to_string()),
        ("Retrieved at", record.retrieved_at.to_rfc3339()),
        ("Source", or_unknown(&record.source_url)),
    ]
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

fn date_or_empty(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn markdown(record: &CompanyRecord) -> String {
    let mut out = String::new();
    let title = if record.name.is_empty() {
        record.company_number().formatted()
    } else {
        record.name.clone()
    };
    let _ = writeln!(out, "# {}\n", title);
    for (label, value) in scalars(record) {
        let _ = writeln!(out, "- **{}**: {}", label, value);
    }

    markdown_table(
        &mut out,
        "Activities",
        &["description", "nace_code"],
        record
            .activities
            .iter()
            .map(|a| vec![a.description.clone(), a.nace_code.clone().unwrap_or_default()])
            .collect(),
    );
    markdown_table(
        &mut out,
        "Financial History",
        &["fiscal_year", "metric", "value"],
        record
            .financial_history
            .iter()
            .map(|e| vec![e.fiscal_year.to_string(), e.metric.to_string(), e.value.to_string()])
            .collect(),
    );
    markdown_table(
        &mut out,
        "Publications",
        &["date", "type", "summary", "document_url"],
        record
            .publications
            .iter()
            .map(|p| {
                vec![
                    p.date.to_string(),
                    p.kind.to_string(),
                    p.summary.clone(),
                    p.document_url.clone().unwrap_or_default(),
                ]
            })
            .collect(),
    );
    markdown_table(
        &mut out,
        "Directors",
        &["full_name", "role", "appointment_date", "end_date"],
        record
            .directors
            .iter()
            .map(|p| {
                vec![
                    p.full_name.clone(),
                    p.role.to_string(),
                    date_or_empty(p.appointment_date),
                    date_or_empty(p.end_date),
                ]
            })
            .collect(),
    );
    markdown_table(
        &mut out,
        "Documents",
        &["title", "kind", "url"],
        record
            .documents
            .iter()
            .map(|d| vec![d.title.clone(), d.kind.to_string(), d.url.clone()])
            .collect(),
    );
    markdown_table(
        &mut out,
        "Issues",
        &["section", "message"],
        record
            .issues
            .iter()
            .map(|w| vec![w.section.to_string(), w.message.clone()])
            .collect(),
    );

    out
}

fn markdown_table(out: &mut String, title: &str, headers: &[&str], rows: Vec<Vec<String>>) {
    let _ = writeln!(out, "\n## {}\n", title);
    if rows.is_empty() {
        let _ = writeln!(out, "{}", NO_DATA);
        return;
    }
    let _ = writeln!(out, "| {} |", headers.join(" | "));
    let _ = writeln!(out, "|{}", " --- |".repeat(headers.len()));
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
        let _ = writeln!(out, "| {} |", cells.join(" | "));
    }
}

fn text(record: &CompanyRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "COMPANY REGISTRY EXTRACT");
    let _ = writeln!(out, "========================");
    for (label, value) in scalars(record) {
        let _ = writeln!(out, "{}: {}", label, value);
    }

    text_list(
        &mut out,
        "Activities",
        record.activities.iter().map(|a| match &a.nace_code {
            Some(code) => format!("{} (NACE {})", a.description, code),
            None => a.description.clone(),
        }),
    );
    text_list(
        &mut out,
        "Financial history",
        record
            .financial_history
            .iter()
            .map(|e| format!("{} {}: {}", e.fiscal_year, e.metric, e.value)),
    );
    text_list(
        &mut out,
        "Publications",
        record.publications.iter().map(|p| {
            let mut line = format!("{} [{}] {}", p.date, p.kind, p.summary);
            if let Some(url) = &p.document_url {
                let _ = write!(line, " <{}>", url);
            }
            line
        }),
    );
    text_list(
        &mut out,
        "Directors",
        record.directors.iter().map(|p| {
            let mut line = format!("{} ({})", p.full_name, p.role);
            if let Some(date) = p.appointment_date {
                let _ = write!(line, " since {}", date);
            }
            if let Some(date) = p.end_date {
                let _ = write!(line, " until {}", date);
            }
            line
        }),
    );
    text_list(
        &mut out,
        "Documents",
        record
            .documents
            .iter()
            .map(|d| format!("{} [{}] <{}>", d.title, d.kind, d.url)),
    );
    text_list(
        &mut out,
        "Issues",
        record
            .issues
            .iter()
            .map(|w| format!("[{}] {}", w.section, w.message)),
    );

    out
}

fn text_list(out: &mut String, title: &str, lines: impl Iterator<Item = String>) {
    let _ = writeln!(out, "\n{}:", title);
    let mut empty = true;
    for line in lines {
        empty = false;
        let _ = writeln!(out, "  - {}", line);
    }
    if empty {
        let _ = writeln!(out, "  - {}", NO_DATA);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sb_core::{
        Amount, CompanyNumber, CompanyStatus, Confidence, Decimal, FinancialEntry, Metric,
        Provenance, Section, Warning,
    };

    fn record() -> CompanyRecord {
        let number = CompanyNumber::parse("0403.200.393").unwrap();
        let retrieved_at = Utc.with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap();
        let mut record = CompanyRecord::new(number, retrieved_at);
        record.name = "ANHEUSER-BUSCH INBEV".to_string();
        record.status = CompanyStatus::Active;
        record.financial_history.push(FinancialEntry {
            fiscal_year: 2022,
            metric: Metric::Revenue,
            value: Amount::eur(Decimal::new(1_000_000, 0)),
            source_section: Provenance::new(Section::Financial, Confidence::High),
        });
        record
            .issues
            .push(Warning::new(Section::Publications, "publications section not found"));
        record
    }

    #[test]
    fn test_json_keeps_decimals_as_strings() {
        let json = serialize(&record(), Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["company_number"], "0403200393");
        assert_eq!(value["financial_history"][0]["value"]["value"], "1000000");
        assert_eq!(value["retrieved_at"], "2024-03-20T10:00:00Z");
        assert_eq!(value["issues"][0]["message"], "publications section not found");
    }

    #[test]
    fn test_markdown_tables_and_placeholders() {
        let md = serialize(&record(), Format::Markdown).unwrap();
        assert!(md.starts_with("# ANHEUSER-BUSCH INBEV\n"));
        assert!(md.contains("- **Legal form**: Unknown"));
        assert!(md.contains("| fiscal_year | metric | value |"));
        assert!(md.contains("| 2022 | revenue | 1000000 EUR |"));
        assert!(md.contains("## Publications\n\nNo data available"));
        assert!(md.contains("| publications | publications section not found |"));
        assert!(!md.contains("confidence"));
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let mut record = record();
        record.activities.push(sb_core::Activity {
            description: "Bier | dranken".to_string(),
            nace_code: None,
        });
        let md = serialize(&record, Format::Markdown).unwrap();
        assert!(md.contains("| Bier \\| dranken |  |"));
    }

    #[test]
    fn test_text_lines() {
        let text = serialize(&record(), Format::Text).unwrap();
        assert!(text.contains("Company number: 0403.200.393\n"));
        assert!(text.contains("Status: active\n"));
        assert!(text.contains("Financial history:\n  - 2022 revenue: 1000000 EUR\n"));
        assert!(text.contains("Directors:\n  - No data available\n"));
        assert!(text.contains("Issues:\n  - [publications] publications section not found\n"));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("MD".parse::<Format>().unwrap(), Format::Markdown);
        assert_eq!("json".parse::<Format>().unwrap().extension(), "json");
        assert!("pdf".parse::<Format>().is_err());
    }
}
