use std::collections::HashSet;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::PipelineError;
use crate::model::DestinationPayload;

/// Listing page size; one call covers the whole destination for the
/// duplicate-title set.
const LIST_PAGE_SIZE: &str = "1000";

#[derive(Debug)]
pub enum LoadOutcome {
    Created { title: String, id: String },
    /// Duplicate title in the destination; no create call was made.
    Skipped { title: String },
    Failed { title: String, status: u16, message: String },
}

pub struct LoadReport {
    pub outcomes: Vec<LoadOutcome>,
}

impl LoadReport {
    pub fn created(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, LoadOutcome::Created { .. })).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, LoadOutcome::Skipped { .. })).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, LoadOutcome::Failed { .. })).count()
    }

    pub fn print(&self) {
        println!(
            "Loaded {} articles: {} created, {} skipped as duplicates, {} failed.",
            self.outcomes.len(),
            self.created(),
            self.skipped(),
            self.failed()
        );
        for outcome in &self.outcomes {
            if let LoadOutcome::Failed { title, status, message } = outcome {
                println!("  FAILED ({status}) {title}: {message}");
            }
        }
    }
}

#[derive(Deserialize)]
struct Listing {
    items: Vec<ListingItem>,
}

#[derive(Deserialize)]
struct ListingItem {
    title: String,
}

/// Submits transformed payloads to the destination content API, skipping
/// titles that already exist there. Exact, case-sensitive title match is
/// the dedup key; re-running against an unchanged destination creates
/// nothing.
pub struct MigrationLoader {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl MigrationLoader {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        }
    }

    pub async fn load(&self, payloads: &[DestinationPayload]) -> Result<LoadReport, PipelineError> {
        let existing = self.existing_titles().await?;
        info!("Destination already holds {} article titles", existing.len());

        let mut outcomes = Vec::with_capacity(payloads.len());
        for payload in payloads {
            if existing.contains(&payload.title) {
                info!("Skipping duplicate '{}'", payload.title);
                outcomes.push(LoadOutcome::Skipped { title: payload.title.clone() });
                continue;
            }
            outcomes.push(self.submit(payload).await);
        }

        Ok(LoadReport { outcomes })
    }

    /// One paged listing call; its failure is fatal for the load pass since
    /// submitting without the dedup set could create duplicates.
    async fn existing_titles(&self) -> Result<HashSet<String>, PipelineError> {
        let url = format!("{}/api/content/news", self.api_base);
        let resp = self
            .client
            .get(&url)
            .query(&[("page", "1"), ("pageSize", LIST_PAGE_SIZE)])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| PipelineError::Destination { status: 0, message: e.to_string() })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Destination {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let listing: Listing = resp
            .json()
            .await
            .map_err(|e| PipelineError::Destination { status: status.as_u16(), message: e.to_string() })?;
        Ok(listing.items.into_iter().map(|i| i.title).collect())
    }

    /// A non-success response marks this payload failed; the batch
    /// continues. No retries.
    async fn submit(&self, payload: &DestinationPayload) -> LoadOutcome {
        let url = format!("{}/api/content/news", self.api_base);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                warn!("Create request failed for '{}': {}", payload.title, e);
                return LoadOutcome::Failed {
                    title: payload.title.clone(),
                    status: 0,
                    message: e.to_string(),
                };
            }
        };

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status.is_success() {
            let id = created_id(&body);
            info!("Created '{}' as {}", payload.title, id);
            LoadOutcome::Created { title: payload.title.clone(), id }
        } else {
            warn!("Create rejected for '{}' ({}): {}", payload.title, status, body);
            LoadOutcome::Failed {
                title: payload.title.clone(),
                status: status.as_u16(),
                message: body,
            }
        }
    }
}

/// The create endpoint returns an identifier; accept a bare value or an
/// object with an `id` field.
fn created_id(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => map
            .get("id")
            .map(|v| v.to_string().trim_matches('"').to_string())
            .unwrap_or_else(|| body.trim().to_string()),
        Ok(v) => v.to_string().trim_matches('"').to_string(),
        Err(_) => body.trim().to_string(),
    }
}

// ── Tests ──
