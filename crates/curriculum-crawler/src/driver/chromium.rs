//! Chromium-based page driver using chromiumoxide.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use super::{ClickOutcome, ElementState, PageDriver};
use crate::config::CrawlConfig;
use crate::types::{CrawlError, CrawlResult, SelectOption};

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    // 1. Configured path (CLI or CURRICULUM_CHROMIUM_PATH)
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!("Configured Chromium path does not exist: {}", path.display());
    }

    // 2. ~/.curriculum/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".curriculum/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".curriculum/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".curriculum/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".curriculum/chromium/chrome-linux64/chrome"),
                home.join(".curriculum/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// A Chromium instance with the single tab the crawl runs in.
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    nav_timeout: Duration,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank tab.
    pub async fn launch(config: &CrawlConfig) -> CrawlResult<Self> {
        let chrome_path = find_chromium(config.chromium_path.as_deref()).ok_or_else(|| {
            CrawlError::SessionInit(
                "Chromium not found. Set CURRICULUM_CHROMIUM_PATH or install google-chrome."
                    .to_string(),
            )
        })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(1920, 1080)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", config.user_agent));
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| CrawlError::SessionInit(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CrawlError::SessionInit(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {e}");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(CrawlError::SessionInit(format!("failed to open tab: {e}")));
            }
        };

        tracing::info!(headless = config.headless, "Chromium session started");

        Ok(Self {
            browser,
            page,
            handler,
            nav_timeout: config.wait_timeout,
        })
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> CrawlResult<T> {
        let result = self.page.evaluate(script).await.map_err(browser_error)?;
        result
            .into_value()
            .map_err(|e| CrawlError::Browser(format!("failed to convert JS result: {e}")))
    }
}

fn browser_error(e: impl std::fmt::Display) -> CrawlError {
    CrawlError::Browser(e.to_string())
}

/// Run a page load, including the wait for it to settle, under `limit`.
async fn bounded_navigation<T, E: std::fmt::Display>(
    url: &str,
    limit: Duration,
    navigation: impl Future<Output = Result<T, E>>,
) -> CrawlResult<T> {
    match tokio::time::timeout(limit, navigation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CrawlError::Browser(format!("navigation to {url} failed: {e}"))),
        Err(_) => Err(CrawlError::NavigationTimeout {
            selector: url.to_string(),
            timeout: limit,
        }),
    }
}

/// A selector or value as a JavaScript string literal.
fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&mut self, url: &str) -> CrawlResult<()> {
        let page = &self.page;
        let navigation = async move {
            match page.goto(url).await {
                Ok(page) => page.wait_for_navigation().await.map(|_| ()),
                Err(e) => Err(e),
            }
        };
        bounded_navigation(url, self.nav_timeout, navigation).await
    }

    async fn probe(&mut self, selector: &str) -> CrawlResult<ElementState> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return "absent";
                const r = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                const visible = r.width > 0 && r.height > 0
                    && style.visibility !== "hidden" && style.display !== "none";
                return visible && !el.disabled ? "clickable" : "present";
            }})()"#,
            sel = js_str(selector)
        );
        let state: String = self.eval(script).await?;
        Ok(match state.as_str() {
            "clickable" => ElementState::Clickable,
            "present" => ElementState::Present,
            _ => ElementState::Absent,
        })
    }

    async fn click(&mut self, selector: &str) -> CrawlResult<ClickOutcome> {
        // chromiumoxide clicks at the element's center point, so check what
        // actually sits there first.
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return "missing";
                el.scrollIntoView({{ block: "center", inline: "center" }});
                const r = el.getBoundingClientRect();
                const hit = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2);
                return hit && (hit === el || el.contains(hit)) ? "ok" : "intercepted";
            }})()"#,
            sel = js_str(selector)
        );
        let target: String = self.eval(script).await?;
        match target.as_str() {
            "missing" => return Ok(ClickOutcome::Missing),
            "intercepted" => return Ok(ClickOutcome::Intercepted),
            _ => {}
        }

        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(_) => return Ok(ClickOutcome::Missing),
        };
        element.click().await.map_err(browser_error)?;
        Ok(ClickOutcome::Clicked)
    }

    async fn force_click(&mut self, selector: &str) -> CrawlResult<bool> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            sel = js_str(selector)
        );
        self.eval(script).await
    }

    async fn select_value(&mut self, selector: &str, value: &str) -> CrawlResult<bool> {
        let script = format!(
            r#"(() => {{
                const select = document.querySelector({sel});
                if (!select) return false;
                const wanted = {val};
                if (!Array.from(select.options).some(o => o.value === wanted)) return false;
                select.value = wanted;
                select.dispatchEvent(new Event("change", {{ bubbles: true }}));
                return true;
            }})()"#,
            sel = js_str(selector),
            val = js_str(value)
        );
        self.eval(script).await
    }

    async fn options(&mut self, selector: &str) -> CrawlResult<Vec<SelectOption>> {
        let script = format!(
            r#"(() => {{
                const select = document.querySelector({sel});
                if (!select) return [];
                return Array.from(select.options).map(o => ({{
                    value: o.value,
                    text: (o.textContent || "").trim()
                }}));
            }})()"#,
            sel = js_str(selector)
        );
        self.eval(script).await
    }

    async fn html(&mut self) -> CrawlResult<String> {
        self.eval("document.documentElement.outerHTML".to_string())
            .await
    }

    async fn close(self: Box<Self>) -> CrawlResult<()> {
        let ChromiumDriver {
            mut browser,
            page,
            handler,
            ..
        } = *self;

        let _ = page.close().await;
        if let Err(e) = browser.close().await {
            tracing::warn!("Chromium did not close cleanly: {e}");
        }
        let _ = browser.wait().await;
        handler.abort();
        tracing::info!("Chromium session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_str_escapes() {
        assert_eq!(js_str("#comboCurso"), "\"#comboCurso\"");
        assert_eq!(js_str("a\"b"), "\"a\\\"b\"");
    }

    #[tokio::test]
    async fn test_stalled_navigation_times_out() {
        let stalled = std::future::pending::<Result<(), String>>();
        let err = bounded_navigation("https://example.test/", Duration::from_millis(10), stalled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CrawlError::NavigationTimeout { ref selector, timeout }
                if selector == "https://example.test/" && timeout == Duration::from_millis(10)
        ));
    }

    #[tokio::test]
    async fn test_failed_navigation_is_browser_error() {
        let failed = async { Err::<(), _>("net::ERR_CONNECTION_RESET") };
        let err = bounded_navigation("https://example.test/", Duration::from_secs(1), failed)
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Browser(ref msg) if msg.contains("ERR_CONNECTION_RESET")));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_select_and_click() {
        let config = CrawlConfig::default();
        let mut driver = ChromiumDriver::launch(&config)
            .await
            .expect("failed to launch Chromium");

        driver
            .goto("data:text/html,<select id='s'><option value=''>-</option><option value='7'>Sete</option></select><button id='b' onclick=\"document.body.dataset.hit='1'\">ok</button>")
            .await
            .expect("navigation failed");

        let options = driver.options("#s").await.expect("options failed");
        assert_eq!(options.len(), 2);
        assert_eq!(options[1], SelectOption::new("7", "Sete"));

        assert!(driver.select_value("#s", "7").await.unwrap());
        assert!(!driver.select_value("#s", "8").await.unwrap());
        assert_eq!(driver.probe("#b").await.unwrap(), ElementState::Clickable);
        assert_eq!(driver.probe("#nope").await.unwrap(), ElementState::Absent);
        assert_eq!(driver.click("#b").await.unwrap(), ClickOutcome::Clicked);

        let html = driver.html().await.unwrap();
        assert!(html.contains("data-hit=\"1\""));

        Box::new(driver).close().await.expect("close failed");
    }
}
