//! Core data types for crawled institutions, programs, and disciplines.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::registry::DisciplineRegistry;

/// Shared handle to a discipline. Every program list that contains a code
/// holds a clone of the same handle.
pub type DisciplineRef = Rc<RefCell<Discipline>>;

/// Shared handle to a program, referenced from its institution.
pub type ProgramRef = Rc<Program>;

/// Numeric load attributes of a discipline, as printed in cells 2–7 of a
/// curriculum row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Workload {
    pub lecture_credits: u32,
    pub work_credits: u32,
    pub total_hours: u32,
    pub internship_hours: u32,
    pub practice_hours: u32,
    pub advanced_activity_units: u32,
}

/// A single subject, deduplicated by code across the whole crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discipline {
    code: String,
    name: String,
    workload: Workload,
    programs: BTreeSet<String>,
}

impl Discipline {
    /// Create a discipline with zeroed workload and no memberships.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            workload: Workload::default(),
            programs: BTreeSet::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// The first-seen name. Never changes after creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workload(&self) -> Workload {
        self.workload
    }

    /// Overwrite the numeric fields with the latest parse.
    pub fn set_workload(&mut self, workload: Workload) {
        self.workload = workload;
    }

    /// Names of the programs that list this discipline, sorted.
    pub fn programs(&self) -> &BTreeSet<String> {
        &self.programs
    }

    /// Returns `true` if the name was not already present.
    pub(crate) fn add_program(&mut self, program: &str) -> bool {
        !self.programs.contains(program) && self.programs.insert(program.to_string())
    }
}

/// The three curriculum buckets a discipline may belong to within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Mandatory,
    FreeElective,
    RestrictedElective,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Mandatory,
        Category::FreeElective,
        Category::RestrictedElective,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Mandatory => "Obrigatórias",
            Category::FreeElective => "Optativas Livres",
            Category::RestrictedElective => "Optativas Eletivas",
        }
    }
}

/// Duration bounds of a program, in terms. Zero means the page did not
/// provide a parseable value, not a measured zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Durations {
    pub ideal: u32,
    pub min: u32,
    pub max: u32,
}

impl Durations {
    /// The ideal duration, or `None` when it was not parsed.
    pub fn known_ideal(&self) -> Option<u32> {
        (self.ideal > 0).then_some(self.ideal)
    }

    /// Number of the three bounds that were not parsed.
    pub fn unknown_count(&self) -> usize {
        [self.ideal, self.min, self.max]
            .iter()
            .filter(|v| **v == 0)
            .count()
    }
}

/// A degree program with duration bounds and three discipline lists.
#[derive(Debug, Clone)]
pub struct Program {
    pub name: String,
    pub institution: String,
    pub durations: Durations,
    pub mandatory: Vec<DisciplineRef>,
    pub free_elective: Vec<DisciplineRef>,
    pub restricted_elective: Vec<DisciplineRef>,
}

impl Program {
    pub fn new(name: impl Into<String>, institution: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            institution: institution.into(),
            durations: Durations::default(),
            mandatory: Vec::new(),
            free_elective: Vec::new(),
            restricted_elective: Vec::new(),
        }
    }

    pub fn disciplines(&self, category: Category) -> &[DisciplineRef] {
        match category {
            Category::Mandatory => &self.mandatory,
            Category::FreeElective => &self.free_elective,
            Category::RestrictedElective => &self.restricted_elective,
        }
    }

    pub fn disciplines_mut(&mut self, category: Category) -> &mut Vec<DisciplineRef> {
        match category {
            Category::Mandatory => &mut self.mandatory,
            Category::FreeElective => &mut self.free_elective,
            Category::RestrictedElective => &mut self.restricted_elective,
        }
    }

    /// Total entries across the three lists, counting repeats.
    pub fn discipline_count(&self) -> usize {
        self.mandatory.len() + self.free_elective.len() + self.restricted_elective.len()
    }

    /// Codes of one list, in page order.
    pub fn codes(&self, category: Category) -> Vec<String> {
        self.disciplines(category)
            .iter()
            .map(|d| d.borrow().code().to_string())
            .collect()
    }
}

/// An academic unit offering programs.
#[derive(Debug, Clone)]
pub struct Institution {
    pub name: String,
    pub programs: Vec<ProgramRef>,
}

impl Institution {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            programs: Vec::new(),
        }
    }
}

/// Everything one crawl (or one loaded snapshot) produced.
#[derive(Debug, Default)]
pub struct CurriculumDataset {
    pub institutions: Vec<Institution>,
    pub programs: Vec<ProgramRef>,
    pub disciplines: DisciplineRegistry,
}

impl CurriculumDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.institutions.is_empty() && self.programs.is_empty() && self.disciplines.is_empty()
    }

    /// Attach a program to the institution at `institution_index` and record
    /// its name on every discipline it lists.
    pub fn add_program(&mut self, institution_index: usize, program: Program) -> ProgramRef {
        for category in Category::ALL {
            for discipline in program.disciplines(category) {
                self.disciplines.record_membership(discipline, &program.name);
            }
        }
        let program = Rc::new(program);
        if let Some(institution) = self.institutions.get_mut(institution_index) {
            institution.programs.push(Rc::clone(&program));
        }
        self.programs.push(Rc::clone(&program));
        program
    }
}

/// One `<option>` of a wizard selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
        }
    }

    /// Placeholder entries ("Selecione...") carry an empty value.
    pub fn is_placeholder(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// Errors that can occur while crawling, extracting, or persisting.
#[derive(thiserror::Error, Debug)]
pub enum CrawlError {
    #[error("Timed out after {timeout:?} waiting for {selector}")]
    NavigationTimeout { selector: String, timeout: Duration },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Cannot {operation} while wizard is in state {from}")]
    InvalidTransition {
        from: &'static str,
        operation: &'static str,
    },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Session could not be initialized: {0}")]
    SessionInit(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Stored data is corrupt: {0}")]
    PersistenceCorrupt(String),

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CrawlError {
    /// Failures that only cost the current unit.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CrawlError::NavigationTimeout { .. }
                | CrawlError::ElementNotFound(_)
                | CrawlError::InvalidTransition { .. }
                | CrawlError::Browser(_)
        )
    }
}

/// Convenience result type.
pub type CrawlResult<T> = Result<T, CrawlError>;
