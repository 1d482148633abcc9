//! Curriculum Crawler: walks the Júpiter Web curriculum wizard and builds a deduplicated dataset of institutions, programs, and disciplines.

pub mod classify;
pub mod config;
pub mod crawler;
pub mod driver;
pub mod extract;
pub mod query;
pub mod registry;
pub mod session;
pub mod storage;
pub mod types;
pub mod wizard;

pub use config::{CrawlConfig, PageSelectors, RowMarkers};
pub use crawler::{CrawlReport, Crawler, UnitOutcome};
pub use driver::chromium::ChromiumDriver;
pub use driver::{ClickOutcome, ElementState, PageDriver};
pub use extract::{ExtractedProgram, PageExtractor};
pub use query::{DatasetStats, Query, QueryError};
pub use registry::DisciplineRegistry;
pub use session::SessionController;
pub use wizard::{Wizard, WizardState};
pub use types::*;
