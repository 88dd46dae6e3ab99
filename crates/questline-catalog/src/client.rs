// Catalog HTTP client.
//
// One cheap clonable client per process; every call owns its own request
// and maps failures to `SourceUnavailable`, so a bad fetch is contained to
// the interaction that made it.

use std::sync::Arc;

use questline_core::{EventDetail, QuestlineError, Result, RoughEvent};
use reqwest::Client;

use crate::parse::CatalogPatterns;

#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    patterns: Arc<CatalogPatterns>,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            patterns: Arc::new(CatalogPatterns::new()),
        }
    }

    /// Public page for one event, linked from the detail message
    pub fn event_url(&self, event_id: &str) -> String {
        format!("{}/announcements/{event_id}.html", self.base_url)
    }

    /// Fetch the announcement list: id, title and coarse date per event
    pub async fn list_announcements(&self) -> Result<Vec<RoughEvent>> {
        let url = format!("{}/news/announcements/", self.base_url);
        let html = self.fetch_text(&url).await?;
        let events = self.patterns.parse_announcements(&html);
        tracing::debug!(count = events.len(), "fetched catalog announcements");
        Ok(events)
    }

    /// Fetch full detail for one event: page fields plus the start/end
    /// window from its iCalendar feed
    pub async fn event_detail(&self, event_id: &str) -> Result<EventDetail> {
        let page_url = self.event_url(event_id);
        let ics_url = format!("{}/events/ics/{event_id}.ics", self.base_url);

        let html = self.fetch_text(&page_url).await?;
        let ics = self.fetch_text(&ics_url).await?;

        self.patterns.parse_detail(event_id, &html, &ics)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| QuestlineError::source(format!("GET {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(QuestlineError::source(format!(
                "GET {url}: status {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| QuestlineError::source(format!("GET {url}: {e}")))
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
