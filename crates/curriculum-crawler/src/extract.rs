//! Curriculum page extraction.
//!
//! Parses the rendered HTML of one program's curriculum step into an
//! [`ExtractedProgram`], resolving every discipline through the crawl-wide
//! [`DisciplineRegistry`].

use scraper::{Html, Selector};

use crate::classify::{classify, parse_number, normalized_text, RowFacts, RowKind};
use crate::config::{PageSelectors, RowMarkers};
use crate::registry::DisciplineRegistry;
use crate::types::{Category, CrawlError, CrawlResult, DisciplineRef, Durations, Program, Workload};

/// One program as read from its curriculum page.
#[derive(Debug, Clone, Default)]
pub struct ExtractedProgram {
    pub name: String,
    pub durations: Durations,
    pub mandatory: Vec<DisciplineRef>,
    pub free_elective: Vec<DisciplineRef>,
    pub restricted_elective: Vec<DisciplineRef>,
}

impl ExtractedProgram {
    fn list_mut(&mut self, category: Category) -> &mut Vec<DisciplineRef> {
        match category {
            Category::Mandatory => &mut self.mandatory,
            Category::FreeElective => &mut self.free_elective,
            Category::RestrictedElective => &mut self.restricted_elective,
        }
    }

    /// Turn the record into a program owned by `institution`.
    pub fn into_program(self, institution: &str) -> Program {
        Program {
            name: self.name,
            institution: institution.to_string(),
            durations: self.durations,
            mandatory: self.mandatory,
            free_elective: self.free_elective,
            restricted_elective: self.restricted_elective,
        }
    }
}

/// Compiled selectors for the curriculum page.
pub struct PageExtractor {
    program_name: Selector,
    ideal_duration: Selector,
    min_duration: Selector,
    max_duration: Selector,
    rows: Selector,
    cell: Selector,
    link: Selector,
    markers: RowMarkers,
}

impl PageExtractor {
    pub fn new(selectors: &PageSelectors, markers: &RowMarkers) -> CrawlResult<Self> {
        Ok(Self {
            program_name: compile(&selectors.program_name)?,
            ideal_duration: compile(&selectors.ideal_duration)?,
            min_duration: compile(&selectors.min_duration)?,
            max_duration: compile(&selectors.max_duration)?,
            rows: compile(&format!("{} tr", selectors.grade_table))?,
            cell: compile("td")?,
            link: compile("a")?,
            markers: markers.clone(),
        })
    }

    /// Parse one curriculum page.
    ///
    /// Returns `None` when the page has no program name, or only a blank one:
    /// the program is skipped, which is an expected outcome rather than an
    /// error.
    /// Disciplines are created in `registry` on first sight; a code seen again
    /// keeps its name but takes the numeric fields of the latest row.
    pub fn extract(&self, html: &str, registry: &mut DisciplineRegistry) -> Option<ExtractedProgram> {
        let document = Html::parse_document(html);

        let name = document
            .select(&self.program_name)
            .next()
            .map(normalized_text)
            .filter(|name| !name.is_empty())?;

        let duration = |selector: &Selector| {
            document
                .select(selector)
                .next()
                .map(|el| parse_number(&normalized_text(el)))
                .unwrap_or(0)
        };

        let mut program = ExtractedProgram {
            name,
            durations: Durations {
                ideal: duration(&self.ideal_duration),
                min: duration(&self.min_duration),
                max: duration(&self.max_duration),
            },
            ..ExtractedProgram::default()
        };

        let mut cursor: Option<Category> = None;
        for row in document.select(&self.rows) {
            let facts = RowFacts::from_row(row, &self.cell, &self.link);
            match classify(&facts, &self.markers) {
                RowKind::Header(category) => {
                    cursor = category;
                }
                RowKind::Candidate => {
                    let Some(category) = cursor else { continue };
                    let discipline = resolve(registry, &facts);
                    program.list_mut(category).push(discipline);
                }
                RowKind::Prerequisite | RowKind::SemesterSeparator | RowKind::Unknown => {}
            }
        }

        tracing::debug!(
            program = %program.name,
            mandatory = program.mandatory.len(),
            free_elective = program.free_elective.len(),
            restricted_elective = program.restricted_elective.len(),
            "extracted curriculum"
        );

        Some(program)
    }
}

fn resolve(registry: &mut DisciplineRegistry, facts: &RowFacts) -> DisciplineRef {
    let discipline = registry.get_or_create(&facts.cells[0], &facts.cells[1]);
    let number = |i: usize| parse_number(&facts.cells[i]);
    discipline.borrow_mut().set_workload(Workload {
        lecture_credits: number(2),
        work_credits: number(3),
        total_hours: number(4),
        internship_hours: number(5),
        practice_hours: number(6),
        advanced_activity_units: number(7),
    });
    discipline
}

fn compile(css: &str) -> CrawlResult<Selector> {
    Selector::parse(css).map_err(|e| CrawlError::InvalidSelector(format!("{css}: {e}")))
}
