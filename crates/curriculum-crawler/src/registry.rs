//! Crawl-wide discipline registry keyed by discipline code.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::types::{Discipline, DisciplineRef};

/// Deduplicates disciplines by code and hands out shared handles.
///
/// The registry has a single owner: the crawl's thread of control. Handles
/// are `Rc<RefCell<_>>`, so the registry is `!Send` and cannot be shared with
/// another task by accident. A parallel crawler would need to partition the
/// registry per worker or switch the handles to `Arc<Mutex<_>>`.
///
/// Entries are never removed; the registry only grows for the lifetime of a
/// crawl or a loaded snapshot.
#[derive(Debug, Default)]
pub struct DisciplineRegistry {
    by_code: BTreeMap<String, DisciplineRef>,
}

impl DisciplineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the discipline stored under `code`, creating it with `name` if
    /// absent. An existing entry keeps its first-seen name.
    pub fn get_or_create(&mut self, code: &str, name: &str) -> DisciplineRef {
        if let Some(existing) = self.by_code.get(code) {
            return Rc::clone(existing);
        }
        let discipline = Rc::new(RefCell::new(Discipline::new(code, name)));
        self.by_code
            .insert(code.to_string(), Rc::clone(&discipline));
        discipline
    }

    /// Store a fully built discipline (used when loading a snapshot). An
    /// existing entry for the same code wins.
    pub fn insert(&mut self, discipline: Discipline) -> DisciplineRef {
        let code = discipline.code().to_string();
        Rc::clone(
            self.by_code
                .entry(code)
                .or_insert_with(|| Rc::new(RefCell::new(discipline))),
        )
    }

    /// Add `program` to the discipline's membership set. Idempotent.
    pub fn record_membership(&self, discipline: &DisciplineRef, program: &str) {
        if discipline.borrow_mut().add_program(program) {
            tracing::trace!(
                code = discipline.borrow().code(),
                program,
                "recorded membership"
            );
        }
    }

    pub fn get(&self, code: &str) -> Option<DisciplineRef> {
        self.by_code.get(code).map(Rc::clone)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Iterate disciplines in code order.
    pub fn iter(&self) -> impl Iterator<Item = &DisciplineRef> {
        self.by_code.values()
    }
}
