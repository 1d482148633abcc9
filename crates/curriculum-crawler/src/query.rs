//! Read-only lookups and statistics over a dataset, used by the console.

use crate::types::{Category, CurriculumDataset, DisciplineRef, Institution, ProgramRef};

/// Errors from console-style lookups.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("Institution '{0}' not found")]
    InstitutionNotFound(String),

    #[error("'{0}' is not a valid program number")]
    InvalidProgramNumber(String),

    #[error("Invalid program number: the institution has only {available} programs")]
    ProgramIndexOutOfRange { requested: usize, available: usize },

    #[error("Discipline '{0}' not found")]
    DisciplineNotFound(String),
}

/// Summary statistics. Durations of zero (not parsed) are left out of the
/// averages and counted separately.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub institutions: usize,
    pub programs: usize,
    pub disciplines: usize,
    /// Institution name and its program count.
    pub most_programs: Option<(String, usize)>,
    /// Program name and its mandatory discipline count.
    pub most_mandatory: Option<(String, usize)>,
    /// Up to five disciplines with the most programs: (code, name, programs).
    pub most_shared: Vec<(String, String, usize)>,
    pub average_ideal_duration: Option<f64>,
    pub programs_without_ideal_duration: usize,
    /// Duration bounds (ideal, minimum, maximum) that were not parsed,
    /// across all programs.
    pub unknown_durations: usize,
}

/// Read-only view over a dataset.
pub struct Query<'a> {
    dataset: &'a CurriculumDataset,
}

impl<'a> Query<'a> {
    pub fn new(dataset: &'a CurriculumDataset) -> Self {
        Self { dataset }
    }

    /// Institutions sorted by name.
    pub fn institutions_sorted(&self) -> Vec<&'a Institution> {
        let mut institutions: Vec<_> = self.dataset.institutions.iter().collect();
        institutions.sort_by(|a, b| a.name.cmp(&b.name));
        institutions
    }

    /// Match a full name or an acronym written as `( ACR )` in the name,
    /// ignoring case.
    pub fn find_institution(&self, query: &str) -> Option<&'a Institution> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        let acronym = format!("( {query} )");
        self.institutions_sorted().into_iter().find(|i| {
            let name = i.name.to_lowercase();
            name == query || name.contains(&acronym)
        })
    }

    /// Programs of an institution sorted by name.
    pub fn programs_of(&self, institution: &'a Institution) -> Vec<&'a ProgramRef> {
        let mut programs: Vec<_> = institution.programs.iter().collect();
        programs.sort_by(|a, b| a.name.cmp(&b.name));
        programs
    }

    /// The `number`-th (1-based) program of an institution in name order.
    pub fn program_by_number(
        &self,
        institution_query: &str,
        number: &str,
    ) -> Result<&'a ProgramRef, QueryError> {
        let institution = self
            .find_institution(institution_query)
            .ok_or_else(|| QueryError::InstitutionNotFound(institution_query.to_string()))?;
        let requested: usize = number
            .trim()
            .parse()
            .map_err(|_| QueryError::InvalidProgramNumber(number.to_string()))?;

        let programs = self.programs_of(institution);
        if requested == 0 || requested > programs.len() {
            return Err(QueryError::ProgramIndexOutOfRange {
                requested,
                available: programs.len(),
            });
        }
        Ok(programs[requested - 1])
    }

    /// Look a discipline up by code, then by exact name, ignoring case.
    pub fn find_discipline(&self, query: &str) -> Result<DisciplineRef, QueryError> {
        let query = query.trim();
        if let Some(d) = self.dataset.disciplines.get(&query.to_uppercase()) {
            return Ok(d);
        }
        let lowered = query.to_lowercase();
        self.dataset
            .disciplines
            .iter()
            .find(|d| d.borrow().name().to_lowercase() == lowered)
            .cloned()
            .ok_or_else(|| QueryError::DisciplineNotFound(query.to_string()))
    }

    /// Disciplines used by more than one program, most shared first.
    pub fn common_disciplines(&self) -> Vec<DisciplineRef> {
        let mut common: Vec<_> = self
            .dataset
            .disciplines
            .iter()
            .filter(|d| d.borrow().programs().len() > 1)
            .cloned()
            .collect();
        common.sort_by(|a, b| b.borrow().programs().len().cmp(&a.borrow().programs().len()));
        common
    }

    /// Programs whose name contains `term`, ignoring case, sorted by name.
    pub fn search_programs(&self, term: &str) -> Vec<&'a ProgramRef> {
        let term = term.trim().to_lowercase();
        let mut found: Vec<_> = self
            .dataset
            .programs
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&term))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Disciplines of one category, sorted by name.
    pub fn curriculum(&self, program: &ProgramRef, category: Category) -> Vec<DisciplineRef> {
        let mut list = program.disciplines(category).to_vec();
        list.sort_by(|a, b| a.borrow().name().cmp(b.borrow().name()));
        list
    }

    pub fn stats(&self) -> DatasetStats {
        let most_programs = self
            .institutions_sorted()
            .into_iter()
            .max_by(|a, b| a.programs.len().cmp(&b.programs.len()).then(b.name.cmp(&a.name)))
            .map(|i| (i.name.clone(), i.programs.len()));

        let most_mandatory = self
            .dataset
            .programs
            .iter()
            .max_by(|a, b| a.mandatory.len().cmp(&b.mandatory.len()).then(b.name.cmp(&a.name)))
            .map(|p| (p.name.clone(), p.mandatory.len()));

        let most_shared = self
            .common_disciplines()
            .into_iter()
            .take(5)
            .map(|d| {
                let d = d.borrow();
                (d.code().to_string(), d.name().to_string(), d.programs().len())
            })
            .collect();

        let known: Vec<u32> = self
            .dataset
            .programs
            .iter()
            .filter_map(|p| p.durations.known_ideal())
            .collect();
        let average_ideal_duration = (!known.is_empty())
            .then(|| known.iter().map(|v| f64::from(*v)).sum::<f64>() / known.len() as f64);

        DatasetStats {
            institutions: self.dataset.institutions.len(),
            programs: self.dataset.programs.len(),
            disciplines: self.dataset.disciplines.len(),
            most_programs,
            most_mandatory,
            most_shared,
            average_ideal_duration,
            programs_without_ideal_duration: self.dataset.programs.len() - known.len(),
            unknown_durations: self
                .dataset
                .programs
                .iter()
                .map(|p| p.durations.unknown_count())
                .sum(),
        }
    }
}
