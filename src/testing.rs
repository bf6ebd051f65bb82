// src/testing.rs
//
// In-process JsonSource double for unit tests.

use serde_json::Value;
use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use crate::error::{FetchError, FetchResult};
use crate::fetch::JsonSource;

enum Reply {
    Json(Value),
    Status(u16),
}

/// Canned responses keyed by path. Unknown paths answer 404.
#[derive(Default)]
pub struct MockSource {
    routes: HashMap<String, Reply>,
    failures_left: Mutex<HashMap<String, u32>>,
    hits: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, path: &str, body: Value) -> Self {
        self.routes.insert(path.to_string(), Reply::Json(body));
        self
    }

    pub fn status(mut self, path: &str, code: u16) -> Self {
        self.routes.insert(path.to_string(), Reply::Status(code));
        self
    }

    /// First `n` calls to `path` fail with a network error.
    pub fn fail_times(self, path: &str, n: u32) -> Self {
        if let Ok(mut f) = self.failures_left.lock() {
            f.insert(path.to_string(), n);
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .map(|h| h.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().map(|h| h.values().sum()).unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn answer(&self, path: &str) -> FetchResult<Value> {
        if let Ok(mut h) = self.hits.lock() {
            *h.entry(path.to_string()).or_default() += 1;
        }
        if let Ok(mut f) = self.failures_left.lock() {
            if let Some(n) = f.get_mut(path).filter(|n| **n > 0) {
                *n -= 1;
                return Err(FetchError::network(path, "connection reset"));
            }
        }
        match self.routes.get(path) {
            Some(Reply::Json(v)) => Ok(v.clone()),
            Some(Reply::Status(429)) => Err(FetchError::RateLimited {
                url: path.to_string(),
                attempts: 1,
            }),
            Some(Reply::Status(404)) | None => Err(FetchError::NotFound {
                url: path.to_string(),
            }),
            Some(Reply::Status(code)) => Err(FetchError::Api {
                status: *code,
                url: path.to_string(),
            }),
        }
    }
}

impl JsonSource for MockSource {
    fn get_json(&self, path: &str) -> impl Future<Output = FetchResult<Value>> + Send {
        async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let out = self.answer(path);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            out
        }
    }
}

/// Route `tracing` output through the test harness so it shows on failure.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
