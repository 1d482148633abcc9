//! Browser driver abstraction.
//!
//! Defines the `PageDriver` trait over the browser-automation handle
//! (currently Chromium via chromiumoxide). The session controller and the
//! wizard only talk to this trait, so they can be driven by a scripted fake
//! in tests.

pub mod chromium;

use async_trait::async_trait;

use crate::types::{CrawlResult, SelectOption};

/// Observable state of an element at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Absent,
    /// In the DOM but hidden, disabled, or zero-sized.
    Present,
    Clickable,
}

impl ElementState {
    pub fn is_present(&self) -> bool {
        !matches!(self, ElementState::Absent)
    }

    pub fn is_clickable(&self) -> bool {
        matches!(self, ElementState::Clickable)
    }
}

/// Result of a direct (pointer) click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Clicked,
    /// Another element sits on top of the target and would receive the click.
    Intercepted,
    Missing,
}

/// A single browser tab the crawler drives.
#[async_trait]
pub trait PageDriver: Send {
    /// Load a URL in the tab.
    async fn goto(&mut self, url: &str) -> CrawlResult<()>;
    /// Inspect the first element matching a CSS selector.
    async fn probe(&mut self, selector: &str) -> CrawlResult<ElementState>;
    /// Click the element the way a user would.
    async fn click(&mut self, selector: &str) -> CrawlResult<ClickOutcome>;
    /// Dispatch a click programmatically, bypassing overlapping elements.
    /// Returns `false` if the element does not exist.
    async fn force_click(&mut self, selector: &str) -> CrawlResult<bool>;
    /// Choose an option of a `<select>` by value and fire its change event.
    /// Returns `false` if the select or the option does not exist.
    async fn select_value(&mut self, selector: &str, value: &str) -> CrawlResult<bool>;
    /// All options of a `<select>`, in document order.
    async fn options(&mut self, selector: &str) -> CrawlResult<Vec<SelectOption>>;
    /// Full HTML of the current document.
    async fn html(&mut self) -> CrawlResult<String>;
    /// Release the tab and the browser behind it.
    async fn close(self: Box<Self>) -> CrawlResult<()>;
}
