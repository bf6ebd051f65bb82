// src/fetch/mod.rs

pub mod client;
pub mod retry;

pub use client::{ApiClient, BlockingApiClient};
pub use retry::{with_retry, with_retry_blocking, RetryPolicy};

use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use std::{future::Future, sync::Arc};

use crate::error::FetchResult;

pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

pub const REFERER: &str = "https://www.sofascore.com/";

/// Browser-like headers with a user agent drawn from [`USER_AGENTS`].
pub fn request_headers() -> HeaderMap {
    let ua = USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0]);

    let mut h = HeaderMap::new();
    h.insert(header::USER_AGENT, HeaderValue::from_static(ua));
    h.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    h.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    h.insert(header::REFERER, HeaderValue::from_static(REFERER));
    h.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
    h.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
    h.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));
    h.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    h
}

/// Anything that can answer a GET with a JSON document. Paths are relative to
/// the API root (`/event/123`); implementations own retries and pacing.
pub trait JsonSource: Send + Sync {
    fn get_json(&self, path: &str) -> impl Future<Output = FetchResult<Value>> + Send;
}

impl<S: JsonSource> JsonSource for &S {
    fn get_json(&self, path: &str) -> impl Future<Output = FetchResult<Value>> + Send {
        (**self).get_json(path)
    }
}

impl<S: JsonSource> JsonSource for Arc<S> {
    fn get_json(&self, path: &str) -> impl Future<Output = FetchResult<Value>> + Send {
        (**self).get_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_carry_referer_and_pool_agent() {
        let h = request_headers();
        assert_eq!(h.get(header::REFERER).and_then(|v| v.to_str().ok()), Some(REFERER));
        let ua = h
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(USER_AGENTS.contains(&ua));
        assert_eq!(h.get("sec-fetch-mode").and_then(|v| v.to_str().ok()), Some("cors"));
    }
}
