// src/fetch/client.rs

use anyhow::{Context, Result};
use rand::Rng;
use reqwest::StatusCode;
use serde_json::Value;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{sync::Semaphore, time::sleep};
use tracing::{debug, trace};

use super::{request_headers, with_retry, with_retry_blocking, JsonSource, RetryPolicy};
use crate::config::Config;
use crate::error::{FetchError, FetchResult};

/// Polite delay after every successful response.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub min: Duration,
    pub jitter: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            min: cfg.wait_time_min,
            jitter: cfg.wait_time_max,
        }
    }

    /// `min + uniform(0, jitter)`.
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.min;
        }
        let extra = rand::thread_rng().gen_range(0.0..=self.jitter.as_secs_f64());
        self.min + Duration::from_secs_f64(extra)
    }
}

fn join_url(base: &str, path: &str) -> String {
    if url::Url::parse(path).is_ok() {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

fn classify(status: StatusCode, url: &str, attempt: u32) -> FetchResult<()> {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited {
            url: url.to_string(),
            attempts: attempt + 1,
        }),
        StatusCode::NOT_FOUND => Err(FetchError::NotFound {
            url: url.to_string(),
        }),
        s if s.as_u16() >= 400 => Err(FetchError::Api {
            status: s.as_u16(),
            url: url.to_string(),
        }),
        _ => Ok(()),
    }
}

fn parse_body(url: &str, body: &str) -> FetchResult<Value> {
    serde_json::from_str(body).map_err(|e| FetchError::Parsing {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Async API client. Clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    policy: RetryPolicy,
    pacing: Pacing,
    /// Shared by clones; bounds sends, not pacing or backoff.
    gate: Option<Arc<Semaphore>>,
}

impl ApiClient {
    /// Total timeout from `REQUEST_TIMEOUT`, connect capped at 10s.
    pub fn new(cfg: &Config) -> Result<Self> {
        let connect = cfg.request_timeout.min(Duration::from_secs(10));
        Self::with_timeouts(cfg, cfg.request_timeout, connect)
    }

    /// Longer budget used by the match-detail fetcher.
    pub fn for_details(cfg: &Config) -> Result<Self> {
        Self::with_timeouts(cfg, Duration::from_secs(60), Duration::from_secs(10))
    }

    pub fn with_timeouts(cfg: &Config, total: Duration, connect: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .default_headers(request_headers())
            .cookie_store(true)
            .gzip(true)
            .timeout(total)
            .connect_timeout(connect);
        if let Some(proxy) = &cfg.proxy_url {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy.as_str())
                    .with_context(|| format!("invalid proxy url {proxy}"))?,
            );
        }
        let http = builder.build().context("building HTTP client")?;

        Ok(Self {
            http,
            base_url: Arc::from(cfg.api_base_url.as_str()),
            policy: RetryPolicy::from_config(cfg),
            pacing: Pacing::from_config(cfg),
            gate: None,
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// At most `limit` requests on the wire at once across this client and
    /// its clones.
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(limit.max(1))));
        self
    }

    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn get_once(&self, url: &str, attempt: u32) -> FetchResult<Value> {
        trace!(%url, attempt = attempt + 1, "GET");
        let resp = self
            .http
            .get(url)
            // rotate per request, the builder defaults only seed the first
            .headers(request_headers())
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        classify(resp.status(), url, attempt)?;

        let body = resp.text().await.map_err(|e| FetchError::network(url, e))?;
        parse_body(url, &body)
    }

    async fn get_gated(&self, url: &str, attempt: u32) -> FetchResult<Value> {
        let _permit = match &self.gate {
            Some(gate) => Some(gate.acquire().await.map_err(|e| FetchError::network(url, e))?),
            None => None,
        };
        self.get_once(url, attempt).await
    }

    /// GET `path` as JSON with retries, then sleep the pacing delay.
    pub async fn fetch_json(&self, path: &str) -> FetchResult<Value> {
        let url = self.url_for(path);
        let value = with_retry(&self.policy, &url, |attempt| self.get_gated(&url, attempt)).await?;

        let pause = self.pacing.next_delay();
        debug!(%url, pause_ms = pause.as_millis() as u64, "ok");
        if !pause.is_zero() {
            sleep(pause).await;
        }
        Ok(value)
    }
}

impl JsonSource for ApiClient {
    fn get_json(&self, path: &str) -> impl Future<Output = FetchResult<Value>> + Send {
        self.fetch_json(path)
    }
}

/// Thread-blocking client for callers outside the async runtime. Build and
/// drop it off the runtime threads (e.g. inside `spawn_blocking`).
pub struct BlockingApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    policy: RetryPolicy,
    pacing: Pacing,
}

impl BlockingApiClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .default_headers(request_headers())
            .cookie_store(true)
            .gzip(true)
            .timeout(cfg.request_timeout);
        if let Some(proxy) = &cfg.proxy_url {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy.as_str())
                    .with_context(|| format!("invalid proxy url {proxy}"))?,
            );
        }
        Ok(Self {
            http: builder.build().context("building blocking HTTP client")?,
            base_url: cfg.api_base_url.clone(),
            policy: RetryPolicy::from_config(cfg),
            pacing: Pacing::from_config(cfg),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    fn get_once(&self, url: &str, attempt: u32) -> FetchResult<Value> {
        trace!(%url, attempt = attempt + 1, "GET (blocking)");
        let resp = self
            .http
            .get(url)
            .headers(request_headers())
            .send()
            .map_err(|e| FetchError::network(url, e))?;
        classify(resp.status(), url, attempt)?;
        let body = resp.text().map_err(|e| FetchError::network(url, e))?;
        parse_body(url, &body)
    }

    pub fn fetch_json(&self, path: &str) -> FetchResult<Value> {
        let url = join_url(&self.base_url, path);
        let value = with_retry_blocking(&self.policy, &url, |attempt| self.get_once(&url, attempt))?;
        let pause = self.pacing.next_delay();
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
        Ok(value)
    }
}
