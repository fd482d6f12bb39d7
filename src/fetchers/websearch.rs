use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header;

use crate::fetchers::{GenreSource, LookupResult};
use crate::mapping::GenreMap;
use crate::year;

const USER_AGENT: &str = "genrehaku/0.1.0";
const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Pause after every fallback request, hit or miss. Keeps a long batch from
/// hammering the search endpoint.
const FALLBACK_DELAY: Duration = Duration::from_secs(1);

/// Last-resort source: run a plain web search for the track and mine the
/// result page for mapping keywords and a plausible year. Mining returns the
/// matched keywords themselves, so whatever table produced them will map
/// them again on the way out.
pub struct WebSearchFallback {
    client: reqwest::Client,
    map: Arc<GenreMap>,
}

impl WebSearchFallback {
    pub fn new(map: Arc<GenreMap>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client, map })
    }

    async fn fetch_page(&self, title: &str, artist: &str) -> Result<String> {
        let query = search_terms(title, artist);
        let response = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[("q", query.as_str())])
            .send()
            .await
            .context("Failed to send web search request")?;

        if !response.status().is_success() {
            tracing::debug!("web search returned {}", response.status());
            return Ok(String::new());
        }

        Ok(response.text().await?)
    }
}

fn search_terms(title: &str, artist: &str) -> String {
    format!("{title} {artist} music year genre")
}

fn mine_page(map: &GenreMap, text: &str) -> LookupResult {
    LookupResult {
        genres: map.scan_text(text),
        year: year::scan_text(text),
    }
}

#[async_trait]
impl GenreSource for WebSearchFallback {
    async fn lookup(&self, title: &str, artist: &str) -> LookupResult {
        let result = match self.fetch_page(title, artist).await {
            Ok(body) => mine_page(&self.map, &body),
            Err(e) => {
                tracing::warn!("Web search failed for {artist} - {title}: {e}");
                LookupResult::default()
            }
        };

        // Rate-limit pause, taken even when the request failed.
        tokio::time::sleep(FALLBACK_DELAY).await;

        result
    }
}
