//! Curriculum Crawler CLI: crawl the curriculum wizard, cache the dataset, and browse it interactively.

pub mod config;
pub mod repl;
pub mod summary;

pub use config::resolve_data_path;
pub use repl::Console;
