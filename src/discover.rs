use std::collections::BTreeSet;

use anyhow::Result;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::info;
use url::Url;

use crate::config::Config;
use crate::errors::PipelineError;

/// Harvests article URLs from the legacy site's paginated archive index.
pub struct UrlDiscoverer {
    client: reqwest::Client,
    base: Url,
    article_re: Regex,
}

impl UrlDiscoverer {
    pub fn new(config: &Config, client: reqwest::Client) -> Result<Self> {
        let base = Url::parse(&config.legacy_base)?;
        let host = base.host_str().unwrap_or_default();
        // Articles live one path segment below the domain: /{segment}/news/...
        let article_re = Regex::new(&format!(
            r"^https?://{}(?::\d+)?/[^/]+/news/.+",
            regex::escape(host)
        ))?;
        Ok(Self { client, base, article_re })
    }

    /// Walk archive pages 1..=max_page and return the de-duplicated set of
    /// article URLs, in sorted order. A failed page fetch aborts the whole
    /// pass; discovery runs once against a known-good source.
    pub async fn discover(&self, max_page: u32) -> Result<Vec<String>, PipelineError> {
        let anchor_sel = Selector::parse("a[href]").expect("static selector");
        let mut urls: BTreeSet<String> = BTreeSet::new();

        for page in 1..=max_page {
            let page_url = format!("{}/news?page={}", self.base.as_str().trim_end_matches('/'), page);
            let html = fetch_text(&self.client, &page_url).await?;
            let doc = Html::parse_document(&html);

            let before = urls.len();
            for anchor in doc.select(&anchor_sel) {
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                // Relative hrefs resolve against the site base; absolute
                // off-domain hrefs fail the pattern below and drop out.
                let Ok(resolved) = self.base.join(href) else {
                    continue;
                };
                let resolved = resolved.to_string();
                if self.article_re.is_match(&resolved) {
                    urls.insert(resolved);
                }
            }
            info!("Archive page {}: {} new article URLs", page, urls.len() - before);
        }

        Ok(urls.into_iter().collect())
    }
}

/// GET a page and return its body, mapping transport errors and non-2xx
/// statuses onto `PipelineError::Fetch`.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String, PipelineError> {
    let resp = client.get(url).send().await.map_err(|e| PipelineError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !resp.status().is_success() {
        return Err(PipelineError::Fetch {
            url: url.to_string(),
            reason: format!("status {}", resp.status()),
        });
    }
    resp.text().await.map_err(|e| PipelineError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base: &str) -> Config {
        use crate::config::StorageConfig;
        Config {
            legacy_base: base.to_string(),
            api_base: String::new(),
            api_token: String::new(),
            media_base: String::new(),
            archive_path: String::new(),
            storage: StorageConfig {
                region: "eu-west-1".into(),
                bucket: "test".into(),
                access_key: String::new(),
                secret_key: String::new(),
                endpoint: None,
            },
        }
    }

    #[tokio::test]
    async fn matching_anchors_resolve_and_filter() {
        let server = MockServer::start().await;
        let host = Url::parse(&server.uri()).unwrap();
        let host = host.host_str().unwrap().to_string();
        let body = format!(
            r##"<html><body>
            <a href="/en/news/first-article">First</a>
            <a href="/en/news/second-article">Second</a>
            <a href="http://{host}:{port}/en/news/third-article">Third</a>
            <a href="https://elsewhere.example/en/news/off-domain">Nope</a>
            <a href="/en/about">Nope</a>
            </body></html>"##,
            host = host,
            port = Url::parse(&server.uri()).unwrap().port().unwrap(),
        );
        Mock::given(method("GET"))
            .and(path("/news"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let discoverer = UrlDiscoverer::new(&config, reqwest::Client::new()).unwrap();
        let urls = discoverer.discover(1).await.unwrap();

        assert_eq!(urls.len(), 3);
        assert!(urls.iter().all(|u| u.contains("/en/news/")));
        assert!(urls.iter().any(|u| u.ends_with("/en/news/first-article")));
        assert!(!urls.iter().any(|u| u.contains("elsewhere")));
    }

    #[tokio::test]
    async fn duplicates_across_pages_collapse() {
        let server = MockServer::start().await;
        let body = r#"<a href="/en/news/same">x</a><a href="/en/news/same">y</a>"#;
        for page in ["1", "2"] {
            Mock::given(method("GET"))
                .and(path("/news"))
                .and(query_param("page", page))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }

        let config = test_config(&server.uri());
        let discoverer = UrlDiscoverer::new(&config, reqwest::Client::new()).unwrap();
        let urls = discoverer.discover(2).await.unwrap();
        assert_eq!(urls.len(), 1);
    }

    #[tokio::test]
    async fn failed_page_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let discoverer = UrlDiscoverer::new(&config, reqwest::Client::new()).unwrap();
        assert!(discoverer.discover(3).await.is_err());
    }
}
