use anyhow::{Context, Result};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::info;

use crate::clients::PageRenderer;

/// Marker for listing links on a funda search-results page. Its presence
/// also tells us the JavaScript-rendered results have loaded.
const LISTING_LINK_SELECTOR: &str = r#"a[data-test-id="object-image-link"]"#;

const BASE_URL: &str = "https://www.funda.nl";

/// Stage 1: paginated search-result scraping for one city.
pub struct LinkDiscoverer<R> {
    renderer: R,
    wait_timeout: Duration,
}

impl<R: PageRenderer> LinkDiscoverer<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            wait_timeout: Duration::from_secs(20),
        }
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    fn search_url(city: &str, page: u32) -> String {
        format!("{BASE_URL}/koop/{city}/p{page}/")
    }

    /// Collect listing URLs across pages 1..=page_count, concatenated in
    /// page order with each page's links in DOM order. A page that never
    /// shows results within the wait budget fails the whole call.
    pub fn discover(&self, city: &str, page_count: u32) -> Result<Vec<String>> {
        let selector = Selector::parse(LISTING_LINK_SELECTOR).unwrap();
        let mut urls = Vec::new();

        for page in 1..=page_count {
            let search_url = Self::search_url(city, page);
            info!("Discovering listings on page {}/{}", page, page_count);

            let html = self
                .renderer
                .render(&search_url, LISTING_LINK_SELECTOR, self.wait_timeout)
                .with_context(|| format!("Search page {page} for {city} failed to render"))?;

            let document = Html::parse_document(&html);
            let mut page_urls = 0;
            for element in document.select(&selector) {
                if let Some(href) = element.value().attr("href") {
                    let url = if href.starts_with('/') {
                        format!("{BASE_URL}{href}")
                    } else {
                        href.to_string()
                    };
                    urls.push(url);
                    page_urls += 1;
                }
            }
            info!("Page {} yielded {} listing links", page, page_urls);
        }

        info!("Discovered {} listing URLs for {}", urls.len(), city);
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeRenderer {
        pages: HashMap<String, String>,
    }

    impl PageRenderer for FakeRenderer {
        fn render(&self, url: &str, _selector: &str, _timeout: Duration) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("element never appeared on {url}"))
        }
    }

    fn page_with_links(hrefs: &[&str]) -> String {
        let anchors: String = hrefs
            .iter()
            .map(|h| format!(r#"<a data-test-id="object-image-link" href="{h}"></a>"#))
            .collect();
        format!("<html><body><div>{anchors}</div></body></html>")
    }

    #[test]
    fn pages_concatenate_in_order_and_preserve_dom_order() {
        let mut pages = HashMap::new();
        pages.insert(
            LinkDiscoverer::<FakeRenderer>::search_url("amsterdam", 1),
            page_with_links(&["/koop/amsterdam/huis-1/", "/koop/amsterdam/huis-2/"]),
        );
        pages.insert(
            LinkDiscoverer::<FakeRenderer>::search_url("amsterdam", 2),
            page_with_links(&["https://www.funda.nl/koop/amsterdam/huis-3/"]),
        );

        let discoverer = LinkDiscoverer::new(FakeRenderer { pages });
        let urls = discoverer.discover("amsterdam", 2).unwrap();

        assert_eq!(
            urls,
            vec![
                "https://www.funda.nl/koop/amsterdam/huis-1/",
                "https://www.funda.nl/koop/amsterdam/huis-2/",
                "https://www.funda.nl/koop/amsterdam/huis-3/",
            ]
        );
    }

    #[test]
    fn duplicate_urls_across_pages_are_kept() {
        let mut pages = HashMap::new();
        pages.insert(
            LinkDiscoverer::<FakeRenderer>::search_url("amsterdam", 1),
            page_with_links(&["/koop/amsterdam/huis-1/"]),
        );
        pages.insert(
            LinkDiscoverer::<FakeRenderer>::search_url("amsterdam", 2),
            page_with_links(&["/koop/amsterdam/huis-1/"]),
        );

        let discoverer = LinkDiscoverer::new(FakeRenderer { pages });
        let urls = discoverer.discover("amsterdam", 2).unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn anchors_without_the_marker_are_ignored() {
        let mut pages = HashMap::new();
        pages.insert(
            LinkDiscoverer::<FakeRenderer>::search_url("amsterdam", 1),
            r#"<html><body>
                <a href="/nav/about"></a>
                <a data-test-id="object-image-link" href="/koop/amsterdam/huis-1/"></a>
            </body></html>"#
                .to_string(),
        );

        let discoverer = LinkDiscoverer::new(FakeRenderer { pages });
        let urls = discoverer.discover("amsterdam", 1).unwrap();
        assert_eq!(urls, vec!["https://www.funda.nl/koop/amsterdam/huis-1/"]);
    }

    #[test]
    fn a_page_that_times_out_fails_the_whole_call() {
        let mut pages = HashMap::new();
        pages.insert(
            LinkDiscoverer::<FakeRenderer>::search_url("amsterdam", 1),
            page_with_links(&["/koop/amsterdam/huis-1/"]),
        );
        // page 2 missing: renderer errors

        let discoverer = LinkDiscoverer::new(FakeRenderer { pages });
        let err = discoverer.discover("amsterdam", 2).unwrap_err();
        assert!(err.to_string().contains("page 2"));
    }
}
