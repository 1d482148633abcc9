//! The curriculum search wizard as an explicit state machine.
//!
//! The remote form keeps one position (search step, program chosen,
//! curriculum shown). Every operation here checks the position it starts
//! from, performs its timed waits, and records the position it leaves the
//! page in.

use std::fmt;

use crate::config::{CrawlConfig, PageSelectors};
use crate::session::SessionController;
use crate::types::{CrawlError, CrawlResult, SelectOption};

/// Where the wizard currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    /// No page loaded yet, or the last transition failed midway.
    Detached,
    /// First step: institution and program selectors.
    SearchForm,
    /// A program is chosen but not yet submitted.
    ProgramSelected,
    /// The curriculum step is rendered.
    CurriculumShown,
}

impl WizardState {
    pub fn name(&self) -> &'static str {
        match self {
            WizardState::Detached => "detached",
            WizardState::SearchForm => "search-form",
            WizardState::ProgramSelected => "program-selected",
            WizardState::CurriculumShown => "curriculum-shown",
        }
    }
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Enumerates institutions and programs and navigates to curricula.
pub struct Wizard {
    session: SessionController,
    state: WizardState,
    base_url: String,
    selectors: PageSelectors,
}

impl Wizard {
    pub fn new(session: SessionController, config: &CrawlConfig) -> Self {
        Self {
            session,
            state: WizardState::Detached,
            base_url: config.base_url.clone(),
            selectors: config.selectors.clone(),
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    fn guard(&self, operation: &'static str, allowed: &[WizardState]) -> CrawlResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(CrawlError::InvalidTransition {
                from: self.state.name(),
                operation,
            })
        }
    }

    /// Load the start page and wait for the institution selector to fill.
    /// Allowed from any state.
    pub async fn reset(&mut self) -> CrawlResult<()> {
        self.state = WizardState::Detached;
        let timeout = self.session.timeout();
        self.session.goto(&self.base_url).await?;
        self.session
            .wait_until_present(&self.selectors.institution_ready(), timeout)
            .await?;
        self.state = WizardState::SearchForm;
        Ok(())
    }

    /// Institutions offered by the start page, in selector order.
    pub async fn list_institutions(&mut self) -> CrawlResult<Vec<SelectOption>> {
        self.guard("list institutions", &[WizardState::SearchForm])?;
        self.session
            .options(&self.selectors.institution_select)
            .await
    }

    /// Select an institution and return its programs, in selector order.
    ///
    /// After another institution the program selector keeps that
    /// institution's options until the site repopulates it, so the first
    /// option seen beforehand must change before the list is read.
    pub async fn list_programs(&mut self, institution_code: &str) -> CrawlResult<Vec<SelectOption>> {
        self.guard("list programs", &[WizardState::SearchForm])?;
        let timeout = self.session.timeout();
        let stale = self
            .session
            .options(&self.selectors.program_select)
            .await?
            .into_iter()
            .next();

        self.select_institution(institution_code).await?;
        if let Some(stale) = stale {
            self.session
                .wait_until_options_change(&self.selectors.program_select, &stale.value, timeout)
                .await?;
            self.session
                .wait_until_present(&self.selectors.program_ready(), timeout)
                .await?;
        }
        self.session.options(&self.selectors.program_select).await
    }

    async fn select_institution(&mut self, institution_code: &str) -> CrawlResult<()> {
        let timeout = self.session.timeout();
        self.session
            .select_value(&self.selectors.institution_select, institution_code)
            .await?;
        self.session
            .wait_until_present(&self.selectors.program_ready(), timeout)
            .await
    }

    /// Select a program, submit, and wait for its curriculum. Returns the
    /// rendered page.
    ///
    /// The curriculum tab can become clickable before the grade table is
    /// rendered, so both are awaited.
    pub async fn open_curriculum(&mut self, program_code: &str) -> CrawlResult<String> {
        self.guard("open curriculum", &[WizardState::SearchForm])?;
        let timeout = self.session.timeout();

        self.session
            .select_value(&self.selectors.program_select, program_code)
            .await?;
        self.state = WizardState::ProgramSelected;

        self.session.click_with_fallback(&self.selectors.submit).await?;
        self.session
            .wait_until_clickable(&self.selectors.curriculum_tab, timeout)
            .await?;
        self.session
            .wait_until_present(&self.selectors.grade_table, timeout)
            .await?;
        self.state = WizardState::CurriculumShown;

        self.session.html().await
    }

    /// Go back to the first step with `institution_code` selected again and
    /// its programs loaded.
    pub async fn return_to_search(&mut self, institution_code: &str) -> CrawlResult<()> {
        self.guard(
            "return to search",
            &[WizardState::ProgramSelected, WizardState::CurriculumShown],
        )?;
        let timeout = self.session.timeout();

        self.session
            .wait_until_clickable(&self.selectors.search_tab, timeout)
            .await?;
        self.session
            .click_with_fallback(&self.selectors.search_tab)
            .await?;
        self.session
            .wait_until_present(&self.selectors.institution_select, timeout)
            .await?;
        self.select_institution(institution_code).await?;
        self.state = WizardState::SearchForm;
        Ok(())
    }

    /// Release the browser.
    pub async fn close(self) -> CrawlResult<()> {
        self.session.close().await
    }
}
