use crate::api::{self, Error};
use crate::model::{Payload, Source};
use crate::throttle::Throttle;

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Fetched,
    Throttled,
    Failed,
}

impl UpdateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOutcome::Fetched => "fetched",
            UpdateOutcome::Throttled => "throttled",
            UpdateOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Default)]
struct FetchState {
    /// Last request sent, successful or not. Drives the throttle.
    last_attempt: Option<Instant>,
    /// Last successful request. Drives `max_age`.
    last_fetch: Option<Instant>,
    payload: Option<Arc<Payload>>,
}

/// Owns one inverter endpoint and the most recent payload read from it.
#[derive(Debug)]
pub struct Fetcher {
    source: Source,
    url: String,
    client: reqwest::Client,
    throttle: Throttle,
    max_age: Option<Duration>,
    state: RwLock<FetchState>,
    /// Held for the duration of a request so concurrent callers never issue a second one.
    in_flight: Mutex<()>,
}

impl Fetcher {
    pub fn new(
        source: Source,
        url: String,
        min_interval: Duration,
        timeout: Duration,
    ) -> Result<Self, Error> {
        Ok(Fetcher {
            source,
            url,
            client: api::client(timeout)?,
            throttle: Throttle::new(min_interval),
            max_age: None,
            state: RwLock::new(FetchState::default()),
            in_flight: Mutex::new(()),
        })
    }

    /// Treat payloads older than `max_age` as absent.
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn last_attempt(&self) -> Option<Instant> {
        self.state.read().ok().and_then(|state| state.last_attempt)
    }

    /// Record the request time and, on success, the new payload. Returns false if the state
    /// could not be locked.
    fn record(&self, payload: Option<Payload>) -> bool {
        match self.state.write() {
            Ok(mut state) => {
                let now = Instant::now();
                state.last_attempt = Some(now);
                if let Some(payload) = payload {
                    state.payload = Some(Arc::new(payload));
                    state.last_fetch = Some(now);
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Latest successfully fetched payload, if any and not older than `max_age`.
    pub fn latest_data(&self) -> Option<Arc<Payload>> {
        let state = self.state.read().ok()?;
        match (self.max_age, state.last_fetch) {
            (Some(max_age), Some(last)) if last.elapsed() > max_age => {
                log::debug!("{} data is older than {:?}, ignoring", self.source, max_age);
                None
            }
            _ => state.payload.clone(),
        }
    }

    /// Refresh the cached payload unless the throttle interval has not elapsed since the last
    /// request. Failed requests count too, so an unreachable inverter is retried at most once per
    /// interval.
    ///
    /// Failures are logged and leave the previous payload in place; they never propagate to the
    /// caller.
    pub async fn update(&self) -> UpdateOutcome {
        if !self.throttle.is_due(self.last_attempt()) {
            log::debug!(
                "{}: interval not yet elapsed since last request; keeping cached data",
                self.source
            );
            return UpdateOutcome::Throttled;
        }

        let _guard = self.in_flight.lock().await;

        /* Another caller may have completed a fetch while we were waiting */
        if !self.throttle.is_due(self.last_attempt()) {
            return UpdateOutcome::Throttled;
        }

        match api::fetch(&self.client, &self.url, self.source).await {
            Ok(payload) => {
                if self.record(Some(payload)) {
                    UpdateOutcome::Fetched
                } else {
                    log::error!("Unable to lock {} state, dropping fetched data", self.source);
                    UpdateOutcome::Failed
                }
            }
            Err(e) => {
                log::error!("Unable to read {} data from {}: {:?}", self.source, self.url, e);
                if !self.record(None) {
                    log::error!("Unable to lock {} state", self.source);
                }
                UpdateOutcome::Failed
            }
        }
    }
}
