//! Crawl configuration: target URL, timeouts, page selectors, and row markers.

use std::path::PathBuf;
use std::time::Duration;

/// Start page of the curriculum search wizard.
pub const DEFAULT_BASE_URL: &str = "https://uspdigital.usp.br/jupiterweb/jupCarreira.jsp?codmnu=8275";

/// Bound on every wait for a page element.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(20);

/// Interval between element probes while waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Largest accepted `CURRICULUM_WAIT_SECS`.
pub const MAX_WAIT_SECS: u64 = 3600;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// CSS selectors of the wizard controls and of the curriculum page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelectors {
    pub institution_select: String,
    pub program_select: String,
    pub submit: String,
    pub search_tab: String,
    pub curriculum_tab: String,
    pub grade_table: String,
    pub program_name: String,
    pub ideal_duration: String,
    pub min_duration: String,
    pub max_duration: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            institution_select: "#comboUnidade".into(),
            program_select: "#comboCurso".into(),
            submit: "#enviar".into(),
            search_tab: "#step1-tab".into(),
            curriculum_tab: "#step4-tab".into(),
            grade_table: "#gradeCurricular".into(),
            program_name: "#step4 .curso".into(),
            ideal_duration: "#step4 .duridlhab".into(),
            min_duration: "#step4 .durminhab".into(),
            max_duration: "#step4 .durmaxhab".into(),
        }
    }
}

impl PageSelectors {
    /// First non-placeholder option of the institution selector.
    pub fn institution_ready(&self) -> String {
        format!("{} option:nth-child(2)", self.institution_select)
    }

    /// First non-placeholder option of the program selector. Present once the
    /// selector has been repopulated for the chosen institution.
    pub fn program_ready(&self) -> String {
        format!("{} option:nth-child(2)", self.program_select)
    }
}

/// Inline style fragments that tell curriculum rows apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMarkers {
    pub header: String,
    pub prerequisite: String,
    pub separator: String,
}

impl Default for RowMarkers {
    fn default() -> Self {
        Self {
            header: "background-color: rgb(16, 148, 171);".into(),
            prerequisite: "color: rgb(235, 143, 0);".into(),
            separator: "background-color: rgb(204, 204, 204);".into(),
        }
    }
}

/// Everything a crawl needs to know about its target and its browser.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: String,
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    /// Process at most this many institutions, in selector order.
    pub max_institutions: Option<usize>,
    pub headless: bool,
    pub chromium_path: Option<PathBuf>,
    pub user_agent: String,
    pub selectors: PageSelectors,
    pub markers: RowMarkers,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_institutions: None,
            headless: true,
            chromium_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            selectors: PageSelectors::default(),
            markers: RowMarkers::default(),
        }
    }
}

impl CrawlConfig {
    /// Defaults overridden by `CURRICULUM_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("CURRICULUM_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }

        if let Ok(secs) = std::env::var("CURRICULUM_WAIT_SECS") {
            match parse_wait_secs(&secs) {
                Some(timeout) => config.wait_timeout = timeout,
                None => tracing::warn!(
                    "Ignoring invalid CURRICULUM_WAIT_SECS={secs} (expected 1..={MAX_WAIT_SECS})"
                ),
            }
        }

        if let Ok(path) = std::env::var("CURRICULUM_CHROMIUM_PATH") {
            config.chromium_path = Some(PathBuf::from(path));
        }

        if let Ok(flag) = std::env::var("CURRICULUM_HEADFUL") {
            config.headless = !matches!(flag.trim(), "1" | "true" | "yes");
        }

        config
    }

    pub fn with_max_institutions(mut self, max: Option<usize>) -> Self {
        self.max_institutions = max;
        self
    }
}

/// Wait bound in whole seconds, between 1 and [`MAX_WAIT_SECS`].
fn parse_wait_secs(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs @ 1..=MAX_WAIT_SECS) => Some(Duration::from_secs(secs)),
        _ => None,
    }
}
