//! Curriculum row classification.
//!
//! The curriculum table carries no semantic tags: category headers,
//! prerequisite annotations, and semester separators differ from discipline
//! rows only by their inline `style`. Classification is a pure function over
//! the facts read from one `<tr>`, so it can be tested from static markup.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::config::RowMarkers;
use crate::types::Category;

/// Minimum number of cells a discipline row carries.
pub const DISCIPLINE_CELLS: usize = 8;

/// What a curriculum row is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Category header. `None` for a header whose category is not tracked
    /// (e.g. "Estágio"); it closes the current category.
    Header(Option<Category>),
    Prerequisite,
    SemesterSeparator,
    /// A row shaped like a discipline: enough cells and a linked code.
    Candidate,
    Unknown,
}

/// The facts of one `<tr>` that classification depends on.
#[derive(Debug, Clone, Default)]
pub struct RowFacts {
    pub style: String,
    pub text: String,
    pub cells: Vec<String>,
    pub first_cell_linked: bool,
}

impl RowFacts {
    /// Read the facts of a `<tr>` element. `td` and `a` are the compiled
    /// cell and link selectors.
    pub fn from_row(row: ElementRef<'_>, td: &Selector, a: &Selector) -> Self {
        let style = row.value().attr("style").unwrap_or_default().to_string();
        let text = normalized_text(row);
        let mut first_cell_linked = false;
        let cells = row
            .select(td)
            .enumerate()
            .map(|(i, cell)| {
                if i == 0 {
                    first_cell_linked = cell.select(a).next().is_some();
                }
                normalized_text(cell)
            })
            .collect();

        Self {
            style,
            text,
            cells,
            first_cell_linked,
        }
    }
}

/// Classify one row. Markers are checked in order: header, prerequisite,
/// separator; anything else is a candidate only if it has at least
/// [`DISCIPLINE_CELLS`] cells and a link in the first one.
pub fn classify(facts: &RowFacts, markers: &RowMarkers) -> RowKind {
    if facts.style.contains(&markers.header) {
        return RowKind::Header(header_category(&facts.text));
    }
    if facts.style.contains(&markers.prerequisite) {
        return RowKind::Prerequisite;
    }
    if facts.style.contains(&markers.separator) {
        return RowKind::SemesterSeparator;
    }
    if facts.cells.len() >= DISCIPLINE_CELLS && facts.first_cell_linked {
        RowKind::Candidate
    } else {
        RowKind::Unknown
    }
}

/// Map header text to a category by keyword.
pub fn header_category(text: &str) -> Option<Category> {
    if text.contains("Obrigatórias") {
        Some(Category::Mandatory)
    } else if text.contains("Optativas Livres") {
        Some(Category::FreeElective)
    } else if text.contains("Optativas Eletivas") {
        Some(Category::RestrictedElective)
    } else {
        None
    }
}

/// First run of ASCII digits in `text`, or 0 when there is none. A run too
/// long for `u32` also reads as 0.
pub fn parse_number(text: &str) -> u32 {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"[0-9]+").expect("digit regex is valid"));
    digits
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Text content with whitespace runs collapsed to single spaces.
pub fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn facts_of(markup: &str) -> RowFacts {
        let html = Html::parse_document(&format!("<table>{markup}</table>"));
        let tr = Selector::parse("tr").unwrap();
        let td = Selector::parse("td").unwrap();
        let a = Selector::parse("a").unwrap();
        let row = html.select(&tr).next().expect("fixture has a row");
        RowFacts::from_row(row, &td, &a)
    }

    fn kind_of(markup: &str) -> RowKind {
        classify(&facts_of(markup), &RowMarkers::default())
    }

    fn discipline_row(cells: usize, linked: bool) -> String {
        let mut row = String::from("<tr>");
        for i in 0..cells {
            if i == 0 && linked {
                row.push_str("<td><a href=\"#\">ABC123</a></td>");
            } else {
                row.push_str(&format!("<td>{i}</td>"));
            }
        }
        row.push_str("</tr>");
        row
    }

    #[test]
    fn test_headers_by_keyword() {
        let style = "background-color: rgb(16, 148, 171);";
        assert_eq!(
            kind_of(&format!(r#"<tr style="{style}"><td>Disciplinas Obrigatórias</td></tr>"#)),
            RowKind::Header(Some(Category::Mandatory))
        );
        assert_eq!(
            kind_of(&format!(r#"<tr style="{style}"><td>Disciplinas Optativas Livres</td></tr>"#)),
            RowKind::Header(Some(Category::FreeElective))
        );
        assert_eq!(
            kind_of(&format!(r#"<tr style="{style}"><td>Disciplinas Optativas Eletivas</td></tr>"#)),
            RowKind::Header(Some(Category::RestrictedElective))
        );
        assert_eq!(
            kind_of(&format!(r#"<tr style="{style}"><td>Estágio</td></tr>"#)),
            RowKind::Header(None)
        );
    }

    #[test]
    fn test_annotation_rows() {
        assert_eq!(
            kind_of(r#"<tr style="color: rgb(235, 143, 0);"><td>MAT0111 - Requisito fraco</td></tr>"#),
            RowKind::Prerequisite
        );
        assert_eq!(
            kind_of(r#"<tr style="background-color: rgb(204, 204, 204);"><td>1º Semestre Ideal</td></tr>"#),
            RowKind::SemesterSeparator
        );
    }

    #[test]
    fn test_candidate_needs_eight_cells_and_a_link() {
        assert_eq!(kind_of(&discipline_row(8, true)), RowKind::Candidate);
        assert_eq!(kind_of(&discipline_row(9, true)), RowKind::Candidate);
        assert_eq!(kind_of(&discipline_row(7, true)), RowKind::Unknown);
        assert_eq!(kind_of(&discipline_row(8, false)), RowKind::Unknown);
    }

    #[test]
    fn test_header_marker_wins_over_cell_shape() {
        let row = discipline_row(8, true).replacen(
            "<tr>",
            r#"<tr style="background-color: rgb(16, 148, 171);">"#,
            1,
        );
        assert_eq!(kind_of(&row), RowKind::Header(None));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("4 (T)"), 4);
        assert_eq!(parse_number("  60 h"), 60);
        assert_eq!(parse_number("sem valor"), 0);
        assert_eq!(parse_number(""), 0);
        assert_eq!(parse_number("8 semestres, 10"), 8);
        assert_eq!(parse_number("99999999999999999999"), 0);
    }

    #[test]
    fn test_cell_text_is_normalized() {
        let facts = facts_of("<tr><td>  <a href=\"#\">MAC0110</a>\n </td><td>Introdução   à\n Computação</td></tr>");
        assert_eq!(facts.cells, vec!["MAC0110", "Introdução à Computação"]);
        assert!(facts.first_cell_linked);
    }
}
