use anyhow::{Context, Result};
use headless_chrome::{Browser, LaunchOptions};
use std::time::Duration;
use tracing::{debug, info};

/// Renders a URL in a real browser and returns the DOM once a marker
/// element is present. The Link Discoverer is the only consumer; listing
/// search pages are JavaScript-rendered, so a plain GET is not enough.
pub trait PageRenderer: Send + Sync {
    /// Load `url`, wait (bounded by `timeout`) until at least one element
    /// matching `ready_selector` exists, then return the rendered HTML.
    fn render(&self, url: &str, ready_selector: &str, timeout: Duration) -> Result<String>;
}

/// Headless-Chrome implementation. The browser process is torn down when
/// the renderer is dropped, on success and failure paths alike.
pub struct ChromeRenderer {
    browser: Browser,
}

impl ChromeRenderer {
    pub fn new() -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self { browser })
    }
}

impl PageRenderer for ChromeRenderer {
    fn render(&self, url: &str, ready_selector: &str, timeout: Duration) -> Result<String> {
        debug!("Rendering {}", url);

        let tab = self.browser.new_tab()?;
        tab.navigate_to(url)?;
        tab.wait_until_navigated()?;

        tab.wait_for_element_with_custom_timeout(ready_selector, timeout)
            .with_context(|| {
                format!("No element matching {ready_selector:?} appeared on {url}")
            })?;

        let html_result = tab.evaluate("document.documentElement.outerHTML", false)?;
        let html = html_result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_default();

        if html.is_empty() {
            anyhow::bail!("Rendered page {url} produced no HTML");
        }

        debug!("Rendered {} bytes from {}", html.len(), url);
        Ok(html)
    }
}
