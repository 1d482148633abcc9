//! An in-memory stand-in for the curriculum wizard.
//!
//! Understands the default page selectors and answers probes, clicks, and
//! selections the way the live site does, with knobs for the failures the
//! crawler has to survive.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use curriculum_crawler::config::CrawlConfig;
use curriculum_crawler::driver::{ClickOutcome, ElementState, PageDriver};
use curriculum_crawler::types::{CrawlError, CrawlResult, SelectOption};

pub const HEADER_STYLE: &str = "background-color: rgb(16, 148, 171);";

// ─────────────────────── site model ───────────────────────

pub struct FakeProgram {
    pub value: String,
    pub text: String,
    pub html: String,
    /// The curriculum step never finishes rendering.
    pub stalls: bool,
    /// The search tab is gone while this curriculum is shown.
    pub strands: bool,
}

impl FakeProgram {
    pub fn new(value: &str, name: &str, rows: &str) -> Self {
        Self {
            value: value.to_string(),
            text: name.to_string(),
            html: curriculum_page(name, rows),
            stalls: false,
            strands: false,
        }
    }

    /// Renders normally but offers no way back to the search step.
    pub fn stranding(value: &str, name: &str, rows: &str) -> Self {
        Self {
            strands: true,
            ..Self::new(value, name, rows)
        }
    }

    pub fn stalled(value: &str, name: &str) -> Self {
        Self {
            value: value.to_string(),
            text: name.to_string(),
            html: String::new(),
            stalls: true,
            strands: false,
        }
    }

    /// A rendered curriculum step without the course name.
    pub fn nameless(value: &str, text: &str) -> Self {
        Self {
            value: value.to_string(),
            text: text.to_string(),
            html: r#"<html><body><div id="step4"><div id="gradeCurricular"><table></table></div></div></body></html>"#.to_string(),
            stalls: false,
            strands: false,
        }
    }
}

pub struct FakeUnit {
    pub value: String,
    pub text: String,
    pub programs: Vec<FakeProgram>,
}

impl FakeUnit {
    pub fn new(value: &str, text: &str, programs: Vec<FakeProgram>) -> Self {
        Self {
            value: value.to_string(),
            text: text.to_string(),
            programs,
        }
    }
}

/// Call counters shared with the test after the driver is boxed away.
#[derive(Clone, Default)]
pub struct Counters {
    pub gotos: Arc<AtomicUsize>,
    pub force_clicks: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl Counters {
    pub fn gotos(&self) -> usize {
        self.gotos.load(Ordering::SeqCst)
    }

    pub fn force_clicks(&self) -> usize {
        self.force_clicks.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Blank,
    Search,
    Curriculum(usize),
}

pub struct FakeDriver {
    units: Vec<FakeUnit>,
    view: View,
    unit: Option<usize>,
    program: Option<usize>,
    /// Unit whose programs fill the program selector.
    listed: Option<usize>,
    /// Program selector reads left before `listed` catches up with `unit`.
    refresh_in: usize,
    html_calls: usize,
    /// Page loads allowed before `goto` starts failing.
    pub max_gotos: Option<usize>,
    /// An overlay swallows pointer clicks on the submit button.
    pub intercept_submit: bool,
    /// Pointer clicks on the search tab to swallow before one gets through.
    pub intercept_search_tab: usize,
    /// Program selector reads that still show the previous unit's programs
    /// after switching units.
    pub program_list_lag: usize,
    html_failure: Option<(usize, fn() -> CrawlError)>,
    pub counters: Counters,
}

impl FakeDriver {
    pub fn new(units: Vec<FakeUnit>) -> Self {
        Self {
            units,
            view: View::Blank,
            unit: None,
            program: None,
            listed: None,
            refresh_in: 0,
            html_calls: 0,
            max_gotos: None,
            intercept_submit: false,
            intercept_search_tab: 0,
            program_list_lag: 0,
            html_failure: None,
            counters: Counters::default(),
        }
    }

    /// Fail the `n`-th (zero-based) page read with `error`.
    pub fn fail_page_read(&mut self, n: usize, error: fn() -> CrawlError) {
        self.html_failure = Some((n, error));
    }

    fn selected_unit(&self) -> Option<&FakeUnit> {
        self.unit.and_then(|i| self.units.get(i))
    }

    /// The unit listed in the program selector, after one more read.
    fn read_listed(&mut self) -> Option<&FakeUnit> {
        if self.refresh_in > 0 {
            self.refresh_in -= 1;
            if self.refresh_in == 0 {
                self.listed = self.unit;
            }
        }
        self.listed.and_then(|i| self.units.get(i))
    }

    fn choose_unit(&mut self, i: usize) {
        self.unit = Some(i);
        self.program = None;
        if self.program_list_lag > 0 && self.listed.is_some_and(|listed| listed != i) {
            self.refresh_in = self.program_list_lag;
        } else {
            self.listed = Some(i);
            self.refresh_in = 0;
        }
    }

    fn shown_program(&self) -> Option<&FakeProgram> {
        match self.view {
            View::Curriculum(p) => self.selected_unit().and_then(|u| u.programs.get(p)),
            _ => None,
        }
    }

    fn submit(&mut self) -> bool {
        match (self.view, self.program) {
            (View::Search, Some(p)) => {
                self.view = View::Curriculum(p);
                true
            }
            _ => false,
        }
    }

    fn back_to_search(&mut self) -> bool {
        if self.view == View::Blank {
            return false;
        }
        self.view = View::Search;
        self.program = None;
        true
    }
}

fn present(yes: bool) -> ElementState {
    if yes {
        ElementState::Present
    } else {
        ElementState::Absent
    }
}

fn clickable(yes: bool) -> ElementState {
    if yes {
        ElementState::Clickable
    } else {
        ElementState::Absent
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&mut self, _url: &str) -> CrawlResult<()> {
        let n = self.counters.gotos.fetch_add(1, Ordering::SeqCst);
        if self.max_gotos.is_some_and(|max| n >= max) {
            return Err(CrawlError::Browser("net::ERR_CONNECTION_RESET".into()));
        }
        self.view = View::Search;
        self.unit = None;
        self.program = None;
        self.listed = None;
        self.refresh_in = 0;
        Ok(())
    }

    async fn probe(&mut self, selector: &str) -> CrawlResult<ElementState> {
        let searching = self.view == View::Search;
        let state = match selector {
            "#comboUnidade" => present(searching),
            "#comboUnidade option:nth-child(2)" => present(searching && !self.units.is_empty()),
            "#comboCurso option:nth-child(2)" => {
                let filled = self.read_listed().is_some_and(|u| !u.programs.is_empty());
                present(searching && filled)
            }
            "#step1-tab" => clickable(
                self.view != View::Blank && !self.shown_program().is_some_and(|p| p.strands),
            ),
            "#step4-tab" => match self.shown_program() {
                Some(p) if p.stalls => ElementState::Present,
                Some(_) => ElementState::Clickable,
                None => ElementState::Absent,
            },
            "#gradeCurricular" => present(self.shown_program().is_some_and(|p| !p.stalls)),
            _ => ElementState::Absent,
        };
        Ok(state)
    }

    async fn click(&mut self, selector: &str) -> CrawlResult<ClickOutcome> {
        let done = match selector {
            "#enviar" if self.intercept_submit => return Ok(ClickOutcome::Intercepted),
            "#enviar" => self.submit(),
            "#step1-tab" if self.intercept_search_tab > 0 => {
                self.intercept_search_tab -= 1;
                return Ok(ClickOutcome::Intercepted);
            }
            "#step1-tab" => self.back_to_search(),
            _ => false,
        };
        Ok(if done {
            ClickOutcome::Clicked
        } else {
            ClickOutcome::Missing
        })
    }

    async fn force_click(&mut self, selector: &str) -> CrawlResult<bool> {
        self.counters.force_clicks.fetch_add(1, Ordering::SeqCst);
        Ok(match selector {
            "#enviar" => self.submit(),
            "#step1-tab" => self.back_to_search(),
            _ => false,
        })
    }

    async fn select_value(&mut self, selector: &str, value: &str) -> CrawlResult<bool> {
        if self.view != View::Search {
            return Ok(false);
        }
        match selector {
            "#comboUnidade" => match self.units.iter().position(|u| u.value == value) {
                Some(i) => {
                    self.choose_unit(i);
                    Ok(true)
                }
                None => Ok(false),
            },
            "#comboCurso" => {
                let found = self
                    .selected_unit()
                    .and_then(|u| u.programs.iter().position(|p| p.value == value));
                self.program = found;
                Ok(found.is_some())
            }
            _ => Ok(false),
        }
    }

    async fn options(&mut self, selector: &str) -> CrawlResult<Vec<SelectOption>> {
        let mut options = vec![SelectOption::new("", "Selecione")];
        match selector {
            "#comboUnidade" => options.extend(
                self.units
                    .iter()
                    .map(|u| SelectOption::new(u.value.clone(), u.text.clone())),
            ),
            "#comboCurso" => {
                if let Some(unit) = self.read_listed() {
                    options.extend(
                        unit.programs
                            .iter()
                            .map(|p| SelectOption::new(p.value.clone(), p.text.clone())),
                    );
                }
            }
            _ => options.clear(),
        }
        Ok(options)
    }

    async fn html(&mut self) -> CrawlResult<String> {
        let call = self.html_calls;
        self.html_calls += 1;
        if let Some((n, error)) = self.html_failure {
            if n == call {
                return Err(error());
            }
        }
        Ok(self
            .shown_program()
            .map(|p| p.html.clone())
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> CrawlResult<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ─────────────────────── page helpers ───────────────────────

pub fn curriculum_page(name: &str, rows: &str) -> String {
    format!(
        r#"<html><body><div id="step4">
            <span class="curso">{name}</span>
            <span class="duridlhab">8</span>
            <span class="durminhab">8</span>
            <span class="durmaxhab">12</span>
            <div id="gradeCurricular"><table>{rows}</table></div>
        </div></body></html>"#
    )
}

pub fn header(text: &str) -> String {
    format!(r#"<tr style="{HEADER_STYLE}"><td colspan="8">{text}</td></tr>"#)
}

pub fn discipline(code: &str, name: &str, credits: u32) -> String {
    format!(
        r#"<tr><td><a href="javascript:void(0)">{code}</a></td><td>{name}</td><td>{credits}</td><td>0</td><td>{}</td><td></td><td></td><td></td></tr>"#,
        credits * 15
    )
}

pub fn mandatory(rows: &[(&str, &str)]) -> String {
    let mut html = header("Disciplinas Obrigatórias");
    for (code, name) in rows {
        html.push_str(&discipline(code, name, 4));
    }
    html
}

/// Short waits so stalled pages fail fast.
pub fn test_config() -> CrawlConfig {
    CrawlConfig {
        wait_timeout: Duration::from_millis(50),
        poll_interval: Duration::from_millis(5),
        ..CrawlConfig::default()
    }
}
