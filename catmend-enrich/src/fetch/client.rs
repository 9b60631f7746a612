//! Metadata source client with retry and backoff
//!
//! The external source is consumed as an opaque `lookup(identifier)`
//! capability behind the [`MetadataSource`] trait; retries, backoff and
//! rate limiting are this side's responsibility, not the service's.

use crate::error::{FetchError, FetchErrorKind};
use crate::fetch::rate_limiter::RateGate;
use crate::types::{FetchOutcome, MetadataRecord};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const GOOGLE_BOOKS_BASE_URL: &str = "https://www.googleapis.com/books/v1";

/// Keyed metadata lookup. `Ok(None)` means the source explicitly has no
/// result for the identifier.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn lookup(&self, identifier: &str) -> Result<Option<MetadataRecord>, FetchError>;
}

/// Backoff schedule for transient failures.
///
/// "Too many requests" responses signal a harder quota violation than a
/// network blip, so they back off from a longer base with steeper growth.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub network_backoff: Duration,
    pub network_backoff_factor: u32,
    pub rate_limit_backoff: Duration,
    pub rate_limit_backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            network_backoff: Duration::from_millis(500),
            network_backoff_factor: 2,
            rate_limit_backoff: Duration::from_millis(2000),
            rate_limit_backoff_factor: 3,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after `error`, with `attempt` attempts already
    /// made (0-based).
    fn delay_for(&self, error: &FetchError, attempt: u32) -> Duration {
        let (base, factor) = match error {
            FetchError::RateLimited => (self.rate_limit_backoff, self.rate_limit_backoff_factor),
            _ => (self.network_backoff, self.network_backoff_factor),
        };
        base * factor.saturating_pow(attempt)
    }
}

/// How a single identifier was resolved, with attempt accounting for the
/// retry-bucket statistics (attempt 0 = first-try success).
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResolution {
    Resolved { outcome: FetchOutcome, attempt: u32 },
    Exhausted { kind: FetchErrorKind, attempts: u32 },
}

impl FetchResolution {
    /// Collapse into the cacheable outcome.
    pub fn outcome(&self) -> FetchOutcome {
        match self {
            FetchResolution::Resolved { outcome, .. } => outcome.clone(),
            FetchResolution::Exhausted { .. } => FetchOutcome::PermanentError,
        }
    }

    /// Attempt bucket for statistics (0-based attempt that settled it).
    pub fn attempt_bucket(&self) -> u32 {
        match self {
            FetchResolution::Resolved { attempt, .. } => *attempt,
            FetchResolution::Exhausted { attempts, .. } => attempts.saturating_sub(1),
        }
    }
}

/// Rate-limited, retrying client over a [`MetadataSource`].
pub struct FetchClient<S: MetadataSource> {
    source: S,
    gate: RateGate,
    policy: RetryPolicy,
}

impl<S: MetadataSource> FetchClient<S> {
    pub fn new(source: S, gate: RateGate, policy: RetryPolicy) -> Self {
        Self {
            source,
            gate,
            policy,
        }
    }

    /// Resolve one identifier: rate-gated attempts with backoff, up to the
    /// policy's maximum. Failure is per-identifier and never propagates.
    ///
    /// A cancellation observed during a backoff wait cuts the retry loop
    /// short with a `TransientError` outcome; an already-started attempt is
    /// allowed to finish.
    pub async fn resolve(&self, identifier: &str, cancel: &CancellationToken) -> FetchResolution {
        let mut last_kind = FetchErrorKind::Network;

        for attempt in 0..self.policy.max_attempts {
            self.gate.acquire().await;

            match self.source.lookup(identifier).await {
                Ok(Some(meta)) => {
                    debug!(identifier, attempt, "Metadata found");
                    return FetchResolution::Resolved {
                        outcome: FetchOutcome::Found(meta),
                        attempt,
                    };
                }
                Ok(None) => {
                    debug!(identifier, attempt, "Identifier not known to source");
                    return FetchResolution::Resolved {
                        outcome: FetchOutcome::NotFound,
                        attempt,
                    };
                }
                Err(e) => {
                    let kind = e.kind();
                    if e.is_transient() && attempt + 1 < self.policy.max_attempts {
                        let delay = self.policy.delay_for(&e, attempt);
                        warn!(
                            identifier,
                            attempt,
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "Transient fetch error, backing off"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.cancelled() => {
                                return FetchResolution::Resolved {
                                    outcome: FetchOutcome::TransientError(kind),
                                    attempt,
                                };
                            }
                        }
                        last_kind = kind;
                    } else {
                        warn!(identifier, attempt, error = %e, "Fetch failed");
                        return FetchResolution::Exhausted {
                            kind,
                            attempts: attempt + 1,
                        };
                    }
                }
            }
        }

        FetchResolution::Exhausted {
            kind: last_kind,
            attempts: self.policy.max_attempts,
        }
    }
}

/// Google Books volumes client (`lookup(isbn)` over HTTP).
pub struct GoogleBooksClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GoogleBooksClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: GOOGLE_BOOKS_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (local test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl MetadataSource for GoogleBooksClient {
    async fn lookup(&self, identifier: &str) -> Result<Option<MetadataRecord>, FetchError> {
        let url = format!("{}/volumes?q=isbn:{}", self.base_url, identifier);
        debug!(identifier, url = %url, "Querying metadata source");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(e.to_string())
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(status.as_u16(), body));
        }

        let volumes: VolumesResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        let Some(info) = volumes
            .items
            .and_then(|items| items.into_iter().next())
            .map(|item| item.volume_info)
        else {
            return Ok(None);
        };

        Ok(Some(info.into_metadata()))
    }
}

// ============================================================================
// Google Books API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[allow(dead_code)]
    #[serde(rename = "totalItems", default)]
    total_items: u64,
    items: Option<Vec<Volume>>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    authors: Option<Vec<String>>,
    publisher: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
}

impl VolumeInfo {
    fn into_metadata(self) -> MetadataRecord {
        // The source's display convention is "Title - Subtitle" as one
        // string; Pass 3 compares against the same combined form.
        let title = match (self.title, self.subtitle) {
            (Some(t), Some(s)) if !s.trim().is_empty() => Some(format!("{} - {}", t.trim(), s.trim())),
            (Some(t), _) => Some(t.trim().to_string()),
            (None, _) => None,
        };

        let year = self.published_date.as_deref().and_then(extract_year);

        MetadataRecord {
            title,
            authors: self.authors.unwrap_or_default(),
            publisher: self.publisher.map(|p| p.trim().to_string()),
            year,
        }
    }
}

/// Leading four-digit year of a date string like `1999-05-01` or `1999`.
fn extract_year(date: &str) -> Option<String> {
    let year: String = date.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if year.len() == 4 {
        Some(year)
    } else {
        None
    }
}
