//! Session controller: the one browser tab of a crawl, bounded waits, and
//! clicks with a programmatic fallback.

use std::time::{Duration, Instant};

use crate::driver::{ClickOutcome, ElementState, PageDriver};
use crate::types::{CrawlError, CrawlResult, SelectOption};

/// Owns the browser driver for the duration of a crawl.
///
/// The driver is released by [`SessionController::close`]; the crawler calls
/// it on every exit path.
pub struct SessionController {
    driver: Box<dyn PageDriver>,
    timeout: Duration,
    poll_interval: Duration,
}

impl SessionController {
    pub fn new(driver: Box<dyn PageDriver>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            driver,
            timeout,
            poll_interval,
        }
    }

    /// Default bound for waits.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn goto(&mut self, url: &str) -> CrawlResult<()> {
        tracing::debug!("goto {url}");
        self.driver.goto(url).await
    }

    /// Wait until `selector` matches an element in the DOM.
    pub async fn wait_until_present(&mut self, selector: &str, timeout: Duration) -> CrawlResult<()> {
        self.wait_for(selector, timeout, ElementState::is_present)
            .await
    }

    /// Wait until `selector` matches a visible, enabled element.
    pub async fn wait_until_clickable(&mut self, selector: &str, timeout: Duration) -> CrawlResult<()> {
        self.wait_for(selector, timeout, ElementState::is_clickable)
            .await
    }

    /// Wait until the first real option of `selector` is something other
    /// than `previous`. An emptied list counts as changed.
    pub async fn wait_until_options_change(
        &mut self,
        selector: &str,
        previous: &str,
        timeout: Duration,
    ) -> CrawlResult<()> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let first = self.options(selector).await?.into_iter().next();
            if first.map_or(true, |o| o.value != previous) {
                return Ok(());
            }
            self.pause(selector, deadline, timeout).await?;
        }
    }

    async fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
        ready: fn(&ElementState) -> bool,
    ) -> CrawlResult<()> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if ready(&self.driver.probe(selector).await?) {
                return Ok(());
            }
            self.pause(selector, deadline, timeout).await?;
        }
    }

    /// Sleep one poll interval, or fail once `deadline` has passed. A timeout
    /// past the end of the clock (`None`) never expires.
    async fn pause(&self, selector: &str, deadline: Option<Instant>, timeout: Duration) -> CrawlResult<()> {
        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(CrawlError::NavigationTimeout {
                        selector: selector.to_string(),
                        timeout,
                    });
                }
                self.poll_interval.min(deadline - now)
            }
            None => self.poll_interval,
        };
        tokio::time::sleep(pause).await;
        Ok(())
    }

    /// Click `selector`. If another element intercepts the click, retry once
    /// with a programmatic click; give up with `ElementNotFound` if that fails
    /// too or if the element is missing.
    pub async fn click_with_fallback(&mut self, selector: &str) -> CrawlResult<()> {
        match self.driver.click(selector).await? {
            ClickOutcome::Clicked => Ok(()),
            ClickOutcome::Missing => Err(CrawlError::ElementNotFound(selector.to_string())),
            ClickOutcome::Intercepted => {
                tracing::warn!("Click on {selector} intercepted, retrying programmatically");
                if self.driver.force_click(selector).await? {
                    Ok(())
                } else {
                    Err(CrawlError::ElementNotFound(selector.to_string()))
                }
            }
        }
    }

    /// Choose `value` in the `<select>` matched by `selector`.
    pub async fn select_value(&mut self, selector: &str, value: &str) -> CrawlResult<()> {
        if self.driver.select_value(selector, value).await? {
            Ok(())
        } else {
            Err(CrawlError::ElementNotFound(format!(
                "{selector} option[value=\"{value}\"]"
            )))
        }
    }

    /// Non-placeholder options of a `<select>`.
    pub async fn options(&mut self, selector: &str) -> CrawlResult<Vec<SelectOption>> {
        let options = self.driver.options(selector).await?;
        Ok(options
            .into_iter()
            .filter(|o| !o.is_placeholder())
            .collect())
    }

    pub async fn html(&mut self) -> CrawlResult<String> {
        self.driver.html().await
    }

    /// Release the browser.
    pub async fn close(self) -> CrawlResult<()> {
        self.driver.close().await
    }
}
