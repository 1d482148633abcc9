//! End-of-run summaries.

use std::fmt::Write;

use curriculum_crawler::{CrawlError, CrawlReport, CurriculumDataset, UnitOutcome};

/// Counts of a dataset, one per line.
pub fn dataset_summary(dataset: &CurriculumDataset) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Institutions:         {}", dataset.institutions.len());
    let _ = writeln!(out, "  Programs:             {}", dataset.programs.len());
    let _ = writeln!(out, "  Unique disciplines:   {}", dataset.disciplines.len());
    out
}

/// Summary printed after a crawl: dataset counts, abandoned units, and the
/// reason the crawl stopped early, if it did.
pub fn crawl_summary(report: &CrawlReport) -> String {
    let mut out = String::from("\n  Crawl summary\n");
    out.push_str(&dataset_summary(&report.dataset));
    let _ = writeln!(out, "  Abandoned units:      {}", report.abandoned_units());

    for outcome in &report.outcomes {
        if let UnitOutcome::Abandoned {
            institution,
            programs,
            skipped,
            error,
        } = outcome
        {
            let _ = writeln!(
                out,
                "    - {institution}: {programs} kept, {skipped} skipped ({error})"
            );
        }
    }

    match &report.fatal {
        Some(CrawlError::Cancelled) => {
            out.push_str("  Crawl was interrupted; partial data kept.\n");
        }
        Some(e) => {
            let _ = writeln!(out, "  Crawl stopped early: {e}");
        }
        None => {}
    }
    out
}
