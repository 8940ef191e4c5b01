use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html};
use sb_core::{Person, Role, Section};

use super::{element_text, find_dates, is_header_row, row_cells, section_elements, SectionResult};

lazy_static! {
    static ref HEADING: Regex = Regex::new(
        r"(?i)bestuurders|bestuur\b|directors|administrateurs|mandatarissen|mandataires"
    )
    .unwrap();
    static ref REGISTRATION_GATE: Regex = Regex::new(
        r"(?i)enkel toegankelijk voor geregistreerde gebruikers|only accessible (for|to) registered users|réservé aux utilisateurs enregistrés"
    )
    .unwrap();
    static ref START_COLUMN: Regex =
        Regex::new(r"(?i)begin|start|benoemd|sinds|depuis|vanaf|début|appointed").unwrap();
    static ref END_COLUMN: Regex = Regex::new(r"(?i)\beinde\b|\bend\b|\btot\b|\bfin\b|until").unwrap();
    static ref ROLE_COLUMN: Regex =
        Regex::new(r"(?i)functie|hoedanigheid|\brol|fonction|mandaat|mandat|role").unwrap();
    static ref NAME_COLUMN: Regex = Regex::new(r"(?i)naam|name|\bnom\b").unwrap();
}

#[derive(Debug, Clone, Copy, Default)]
struct Columns {
    name: usize,
    role: Option<usize>,
    start: Option<usize>,
    end: Option<usize>,
}

impl Columns {
    fn from_header(labels: &[String]) -> Self {
        let mut columns = Columns::default();
        for (index, label) in labels.iter().enumerate() {
            if START_COLUMN.is_match(label) {
                columns.start.get_or_insert(index);
            } else if END_COLUMN.is_match(label) {
                columns.end.get_or_insert(index);
            } else if ROLE_COLUMN.is_match(label) {
                columns.role.get_or_insert(index);
            } else if NAME_COLUMN.is_match(label) {
                columns.name = index;
            }
        }
        columns
    }
}

/// People holding a mandate, read from the directors table or list.
pub fn parse_directors(raw: &str) -> SectionResult<Vec<Person>> {
    let document = Html::parse_document(raw);
    let Some(elements) = section_elements(&document, &HEADING) else {
        return SectionResult::missing(Section::Directors);
    };

    let mut result = SectionResult::<Vec<Person>>::new(Section::Directors);
    if elements
        .iter()
        .any(|el| REGISTRATION_GATE.is_match(&element_text(*el)))
    {
        result.warn("directors section requires registration");
        return result;
    }

    let mut columns: Option<Columns> = None;
    for element in elements {
        let person = match element.value().name() {
            "tr" if is_header_row(element) => {
                columns = Some(Columns::from_header(&row_cells(element)));
                continue;
            }
            "tr" => from_row(&row_cells(element), columns),
            "li" => from_list_item(element),
            _ => continue,
        };
        match person {
            Some(person) => result.data.push(person),
            None => result.warn("directors entry without name skipped"),
        }
    }

    if result.data.is_empty() && result.warnings.is_empty() {
        result.warn("directors section lists no people");
    }

    result
}

fn from_row(cells: &[String], columns: Option<Columns>) -> Option<Person> {
    let cell = |index: Option<usize>| index.and_then(|i| cells.get(i)).map(String::as_str);

    let (name, role, start, end) = match columns {
        Some(columns) => (
            cell(Some(columns.name)),
            cell(columns.role),
            cell(columns.start).and_then(|c| find_dates(c).into_iter().next()),
            cell(columns.end).and_then(|c| find_dates(c).into_iter().next()),
        ),
        None => {
            let dates: Vec<_> = cells.iter().skip(1).flat_map(|c| find_dates(c)).collect();
            (
                cells.first().map(String::as_str),
                cells.get(1).map(String::as_str),
                dates.first().copied(),
                dates.get(1).copied(),
            )
        }
    };

    let name = name.map(str::trim).filter(|n| !n.is_empty())?;
    Some(Person {
        full_name: name.to_string(),
        role: classify_role(role.unwrap_or_default()),
        appointment_date: start,
        end_date: end,
    })
}

/// `Peeters, Jan - Bestuurder (sinds 12-05-2015)` and similar one-line forms.
fn from_list_item(item: ElementRef<'_>) -> Option<Person> {
    let text = element_text(item);
    let split = [" - ", " – ", " (", ":"]
        .iter()
        .filter_map(|separator| text.find(separator))
        .min();
    let (name, rest) = match split {
        Some(index) => text.split_at(index),
        None => (text.as_str(), ""),
    };

    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let dates = find_dates(rest);
    Some(Person {
        full_name: name.to_string(),
        role: classify_role(rest),
        appointment_date: dates.first().copied(),
        end_date: dates.get(1).copied(),
    })
}

pub(crate) fn classify_role(text: &str) -> Role {
    let text = text.to_lowercase();
    let has = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if has(&["commissaris", "revisor", "auditor", "commissaire"]) {
        Role::Auditor
    } else if has(&[
        "zaakvoerder",
        "gérant",
        "manager",
        "managing",
        "dagelijks bestuur",
        "gedelegeerd",
        "délégué",
    ]) {
        Role::Manager
    } else if has(&["bestuurder", "administrateur", "director", "voorzitter", "président"]) {
        Role::Director
    } else {
        Role::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FULL: &str = include_str!("../../tests/fixtures/full.html");
    const SINGLE: &str = include_str!("../../tests/fixtures/single_revenue.html");
    const HEADERLESS: &str = include_str!("../../tests/fixtures/no_financial.html");
    const GATED: &str = include_str!("../../tests/fixtures/directors_page.html");

    #[test]
    fn test_table_with_header() {
        let result = parse_directors(FULL);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(
            result.data,
            vec![
                Person {
                    full_name: "Peeters, Jan".to_string(),
                    role: Role::Director,
                    appointment_date: NaiveDate::from_ymd_opt(2015, 5, 12),
                    end_date: None,
                },
                Person {
                    full_name: "Janssens, Marie".to_string(),
                    role: Role::Manager,
                    appointment_date: NaiveDate::from_ymd_opt(2018, 7, 1),
                    end_date: None,
                },
                Person {
                    full_name: "KPMG Bedrijfsrevisoren".to_string(),
                    role: Role::Auditor,
                    appointment_date: NaiveDate::from_ymd_opt(2022, 4, 26),
                    end_date: None,
                },
            ]
        );
    }

    #[test]
    fn test_list_item() {
        let result = parse_directors(SINGLE);
        assert!(result.warnings.is_empty());
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].full_name, "Peeters, Jan");
        assert_eq!(result.data[0].role, Role::Director);
        assert_eq!(result.data[0].appointment_date, NaiveDate::from_ymd_opt(2015, 5, 12));
    }

    #[test]
    fn test_table_without_header() {
        let result = parse_directors(HEADERLESS);
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].full_name, "Dewulf, Dominique");
        assert_eq!(result.data[0].role, Role::Manager);
        assert_eq!(result.data[0].appointment_date, NaiveDate::from_ymd_opt(2019, 12, 1));
    }

    #[test]
    fn test_registration_gate() {
        let result = parse_directors(GATED);
        assert!(result.data.is_empty());
        let messages: Vec<String> = result.warnings.iter().map(ToString::to_string).collect();
        assert_eq!(messages, vec!["directors section requires registration"]);
    }

    #[test]
    fn test_ended_mandate_and_unnamed_row() {
        let html = r#"
            <h2>Mandatarissen</h2>
            <table>
                <tr><th>Naam</th><th>Hoedanigheid</th><th>Begin mandaat</th><th>Einde mandaat</th></tr>
                <tr><td>Maes, Els</td><td>Zaakvoerder</td><td>01-01-2010</td><td>31-12-2019</td></tr>
                <tr><td></td><td>Bestuurder</td><td></td><td></td></tr>
            </table>
        "#;
        let result = parse_directors(html);
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].role, Role::Manager);
        assert_eq!(result.data[0].end_date, NaiveDate::from_ymd_opt(2019, 12, 31));
        assert_eq!(result.warnings[0].message, "directors entry without name skipped");
    }

    #[test]
    fn test_table_with_caption() {
        let html = r#"
            <h2>Bestuurders</h2>
            <table>
                <caption>Huidige mandaten</caption>
                <tr><th>Naam</th><th>Functie</th><th>Sinds</th></tr>
                <tr><td>Peeters, Jan</td><td>Bestuurder</td><td>12-05-2015</td></tr>
                <tr><td>Janssens, Marie</td><td>Zaakvoerder</td><td>01-07-2018</td></tr>
            </table>
            <h2>Publicaties</h2>
        "#;
        let result = parse_directors(html);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        let names: Vec<&str> = result.data.iter().map(|p| p.full_name.as_str()).collect();
        assert_eq!(names, vec!["Peeters, Jan", "Janssens, Marie"]);
        assert_eq!(result.data[1].role, Role::Manager);
    }

    #[test]
    fn test_missing_and_empty_sections() {
        let missing = parse_directors("<h2>Publicaties</h2>");
        assert_eq!(missing.warnings[0].message, "directors section not found");

        let empty = parse_directors("<h2>Bestuurders</h2><p>Geen gegevens</p>");
        assert_eq!(empty.warnings[0].message, "directors section lists no people");
    }

    #[test]
    fn test_classify_role() {
        assert_eq!(classify_role("Commissaris"), Role::Auditor);
        assert_eq!(classify_role("Gedelegeerd bestuurder"), Role::Manager);
        assert_eq!(classify_role("Voorzitter van de raad van bestuur"), Role::Director);
        assert_eq!(classify_role("Vaste vertegenwoordiger"), Role::Other);
    }
}
