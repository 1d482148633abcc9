//! Recovery supervisor: the sequential crawl over institutions and programs.
//!
//! Each institution ("unit") is processed in isolation and reported as a
//! [`UnitOutcome`]. A failing unit loses only its remaining programs: the
//! session is reset to the start page and the crawl moves on. Data merged
//! before the failure is kept.
//!
//! Errors that [`CrawlError::is_recoverable`] rejects stop the whole crawl
//! instead, as does a failed reset.

use std::future::Future;

use crate::config::CrawlConfig;
use crate::driver::PageDriver;
use crate::extract::PageExtractor;
use crate::session::SessionController;
use crate::types::{CrawlError, CrawlResult, CurriculumDataset, Institution, SelectOption};
use crate::wizard::Wizard;

/// How one institution went.
#[derive(Debug)]
pub enum UnitOutcome {
    Completed {
        institution: String,
        programs: usize,
        /// Programs whose page had no course name.
        no_data: usize,
    },
    Abandoned {
        institution: String,
        /// Programs merged before the failure.
        programs: usize,
        /// Programs never attempted or interrupted by the failure.
        skipped: usize,
        error: CrawlError,
    },
}

impl UnitOutcome {
    pub fn institution(&self) -> &str {
        match self {
            UnitOutcome::Completed { institution, .. } | UnitOutcome::Abandoned { institution, .. } => {
                institution
            }
        }
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self, UnitOutcome::Abandoned { .. })
    }
}

/// Everything a crawl accumulated, whether or not it finished.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub dataset: CurriculumDataset,
    pub outcomes: Vec<UnitOutcome>,
    /// Set when the crawl stopped early: the session could not be
    /// (re)initialized, a unit failed with a non-recoverable error, the
    /// driver could not be released, or it was cancelled.
    pub fatal: Option<CrawlError>,
}

impl CrawlReport {
    pub fn abandoned_units(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_abandoned()).count()
    }
}

/// Runs one crawl against one browser driver.
pub struct Crawler {
    config: CrawlConfig,
    extractor: PageExtractor,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> CrawlResult<Self> {
        let extractor = PageExtractor::new(&config.selectors, &config.markers)?;
        Ok(Self { config, extractor })
    }

    /// Crawl every institution (or the configured prefix) until done or until
    /// `shutdown` resolves. The driver is closed before returning on every
    /// path.
    pub async fn run<F>(&self, driver: Box<dyn PageDriver>, shutdown: F) -> CrawlReport
    where
        F: Future<Output = ()>,
    {
        let session = SessionController::new(driver, self.config.wait_timeout, self.config.poll_interval);
        let mut wizard = Wizard::new(session, &self.config);
        let mut report = CrawlReport::default();

        let result = tokio::select! {
            biased;
            _ = shutdown => Err(CrawlError::Cancelled),
            result = self.crawl(&mut wizard, &mut report) => result,
        };

        if let Err(e) = result {
            tracing::error!("Crawl stopped: {e}");
            report.fatal = Some(e);
        }

        if let Err(e) = wizard.close().await {
            tracing::warn!("Failed to release browser: {e}");
            report.fatal.get_or_insert(e);
        }

        tracing::info!(
            institutions = report.dataset.institutions.len(),
            programs = report.dataset.programs.len(),
            disciplines = report.dataset.disciplines.len(),
            abandoned = report.abandoned_units(),
            "Crawl finished"
        );
        report
    }

    async fn crawl(&self, wizard: &mut Wizard, report: &mut CrawlReport) -> CrawlResult<()> {
        wizard.reset().await?;

        let mut units = wizard.list_institutions().await?;
        if let Some(max) = self.config.max_institutions {
            units.truncate(max);
        }
        tracing::info!("Processing {} institutions", units.len());

        for unit in &units {
            let outcome = self.process_unit(wizard, unit, &mut report.dataset).await?;
            let abandoned = outcome.is_abandoned();
            if let UnitOutcome::Abandoned { error, skipped, .. } = &outcome {
                tracing::warn!(
                    "Abandoning institution {} ({skipped} programs skipped): {error}",
                    unit.text
                );
            }
            report.outcomes.push(outcome);

            if abandoned {
                // A reset that fails is fatal.
                wizard.reset().await?;
            }
        }
        Ok(())
    }

    async fn process_unit(
        &self,
        wizard: &mut Wizard,
        unit: &SelectOption,
        dataset: &mut CurriculumDataset,
    ) -> CrawlResult<UnitOutcome> {
        tracing::info!("Processing institution: {}", unit.text);
        dataset.institutions.push(Institution::new(unit.text.clone()));
        let institution_index = dataset.institutions.len() - 1;

        let abandoned = |merged: usize, skipped: usize, error: CrawlError| {
            if !error.is_recoverable() {
                tracing::error!("Institution {} hit a non-recoverable error", unit.text);
                return Err(error);
            }
            Ok(UnitOutcome::Abandoned {
                institution: unit.text.clone(),
                programs: merged,
                skipped,
                error,
            })
        };

        let programs = match wizard.list_programs(&unit.value).await {
            Ok(programs) => programs,
            Err(error) => return abandoned(0, 0, error),
        };
        tracing::info!("Found {} programs", programs.len());

        let mut merged = 0;
        let mut no_data = 0;

        for (i, program) in programs.iter().enumerate() {
            tracing::info!(
                "  Collecting program {}/{}: {}",
                i + 1,
                programs.len(),
                program.text
            );

            let html = match wizard.open_curriculum(&program.value).await {
                Ok(html) => html,
                Err(error) => return abandoned(merged, programs.len() - i, error),
            };

            match self.extractor.extract(&html, &mut dataset.disciplines) {
                Some(extracted) => {
                    dataset.add_program(institution_index, extracted.into_program(&unit.text));
                    merged += 1;
                }
                None => {
                    no_data += 1;
                    tracing::debug!("No curriculum data for {}", program.text);
                }
            }

            if let Err(error) = wizard.return_to_search(&unit.value).await {
                return abandoned(merged, programs.len() - i - 1, error);
            }
        }

        Ok(UnitOutcome::Completed {
            institution: unit.text.clone(),
            programs: merged,
            no_data,
        })
    }
}
