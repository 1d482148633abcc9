//! JSON snapshot reader/writer for crawled datasets.
//!
//! The document has three top-level keys: `institutions`, `programs`, and
//! `disciplines`. Programs reference disciplines by code and institutions
//! reference programs by name; loading rebuilds the shared handles and drops
//! any reference that does not resolve.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::registry::DisciplineRegistry;
use crate::types::{
    Category, CrawlError, CrawlResult, CurriculumDataset, Discipline, Durations, Institution,
    Program, ProgramRef, Workload,
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredInstitution {
    name: String,
    #[serde(default)]
    program_names: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProgram {
    name: String,
    institution_name: String,
    #[serde(default)]
    ideal_duration: u32,
    #[serde(default)]
    min_duration: u32,
    #[serde(default)]
    max_duration: u32,
    #[serde(default)]
    mandatory_codes: Vec<String>,
    #[serde(default)]
    free_elective_codes: Vec<String>,
    #[serde(default)]
    restricted_elective_codes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDiscipline {
    code: String,
    name: String,
    #[serde(flatten)]
    workload: Workload,
    #[serde(default)]
    program_names: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredDataset {
    #[serde(default)]
    institutions: Vec<StoredInstitution>,
    #[serde(default)]
    programs: Vec<StoredProgram>,
    #[serde(default)]
    disciplines: BTreeMap<String, StoredDiscipline>,
}

/// Write a dataset to a file, creating parent directories.
pub fn save(dataset: &CurriculumDataset, path: &Path) -> CrawlResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_to(dataset, &mut writer)?;
    writer.flush()?;
    tracing::info!("Saved dataset to {}", path.display());
    Ok(())
}

/// Write a dataset as pretty-printed JSON.
pub fn write_to<W: Write>(dataset: &CurriculumDataset, writer: &mut W) -> CrawlResult<()> {
    serde_json::to_writer_pretty(writer, &to_stored(dataset))?;
    Ok(())
}

/// Read a dataset from a file.
pub fn load(path: &Path) -> CrawlResult<CurriculumDataset> {
    let file = std::fs::File::open(path)?;
    read_from(&mut BufReader::new(file))
}

/// Read a dataset from JSON. Invalid JSON is `PersistenceCorrupt`.
pub fn read_from<R: Read>(reader: &mut R) -> CrawlResult<CurriculumDataset> {
    let stored: StoredDataset = serde_json::from_reader(reader)
        .map_err(|e| CrawlError::PersistenceCorrupt(e.to_string()))?;
    Ok(from_stored(stored))
}

/// Load a dataset, degrading to an empty one if the file is missing or
/// unreadable.
pub fn load_or_empty(path: &Path) -> CurriculumDataset {
    if !path.exists() {
        tracing::info!("No stored dataset at {}", path.display());
        return CurriculumDataset::new();
    }
    match load(path) {
        Ok(dataset) => {
            tracing::info!(
                "Loaded {} institutions, {} programs, {} disciplines from {}",
                dataset.institutions.len(),
                dataset.programs.len(),
                dataset.disciplines.len(),
                path.display()
            );
            dataset
        }
        Err(e) => {
            tracing::warn!("Ignoring unreadable dataset {}: {e}", path.display());
            CurriculumDataset::new()
        }
    }
}

fn to_stored(dataset: &CurriculumDataset) -> StoredDataset {
    let institutions = dataset
        .institutions
        .iter()
        .map(|i| StoredInstitution {
            name: i.name.clone(),
            program_names: i.programs.iter().map(|p| p.name.clone()).collect(),
        })
        .collect();

    let programs = dataset
        .programs
        .iter()
        .map(|p| StoredProgram {
            name: p.name.clone(),
            institution_name: p.institution.clone(),
            ideal_duration: p.durations.ideal,
            min_duration: p.durations.min,
            max_duration: p.durations.max,
            mandatory_codes: p.codes(Category::Mandatory),
            free_elective_codes: p.codes(Category::FreeElective),
            restricted_elective_codes: p.codes(Category::RestrictedElective),
        })
        .collect();

    let disciplines = dataset
        .disciplines
        .iter()
        .map(|d| {
            let d = d.borrow();
            (
                d.code().to_string(),
                StoredDiscipline {
                    code: d.code().to_string(),
                    name: d.name().to_string(),
                    workload: d.workload(),
                    program_names: d.programs().iter().cloned().collect(),
                },
            )
        })
        .collect();

    StoredDataset {
        institutions,
        programs,
        disciplines,
    }
}

fn from_stored(stored: StoredDataset) -> CurriculumDataset {
    let mut registry = DisciplineRegistry::new();
    let mut memberships: Vec<(String, Vec<String>)> = Vec::new();
    for (key, d) in stored.disciplines {
        if key != d.code {
            tracing::debug!("Discipline stored under {key} has code {}; using code", d.code);
        }
        let mut discipline = Discipline::new(&d.code, &d.name);
        discipline.set_workload(d.workload);
        registry.insert(discipline);
        memberships.push((d.code, d.program_names));
    }

    let mut programs: Vec<ProgramRef> = Vec::with_capacity(stored.programs.len());
    for p in stored.programs {
        let mut program = Program::new(p.name, p.institution_name);
        program.durations = Durations {
            ideal: p.ideal_duration,
            min: p.min_duration,
            max: p.max_duration,
        };
        for (category, codes) in [
            (Category::Mandatory, p.mandatory_codes),
            (Category::FreeElective, p.free_elective_codes),
            (Category::RestrictedElective, p.restricted_elective_codes),
        ] {
            for code in codes {
                match registry.get(&code) {
                    Some(discipline) => program.disciplines_mut(category).push(discipline),
                    None => tracing::debug!("Dropping unknown discipline {code} from {}", program.name),
                }
            }
        }
        programs.push(Rc::new(program));
    }

    let known_programs: BTreeSet<&str> = programs.iter().map(|p| p.name.as_str()).collect();
    for (code, names) in memberships {
        let Some(discipline) = registry.get(&code) else { continue };
        for name in names {
            if known_programs.contains(name.as_str()) {
                registry.record_membership(&discipline, &name);
            } else {
                tracing::debug!("Dropping membership of {code} in unknown program {name}");
            }
        }
    }

    // Programs are matched to institutions by (institution, name), in order,
    // so repeated names within one institution resolve one-to-one.
    let mut by_owner: HashMap<(String, String), VecDeque<ProgramRef>> = HashMap::new();
    for program in &programs {
        by_owner
            .entry((program.institution.clone(), program.name.clone()))
            .or_default()
            .push_back(Rc::clone(program));
    }

    let mut institutions = Vec::with_capacity(stored.institutions.len());
    for i in stored.institutions {
        let mut institution = Institution::new(i.name);
        for name in i.program_names {
            let key = (institution.name.clone(), name);
            match by_owner.get_mut(&key).and_then(VecDeque::pop_front) {
                Some(program) => institution.programs.push(program),
                None => tracing::debug!("Dropping unknown program {} from {}", key.1, institution.name),
            }
        }
        institutions.push(institution);
    }

    CurriculumDataset {
        institutions,
        programs,
        disciplines: registry,
    }
}
