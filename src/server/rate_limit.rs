//! Per-client request quotas for the analysis endpoint.
//!
//! Two windows are enforced independently, an hourly and a daily one, each
//! as a keyed GCRA limiter from `governor`. A request must pass both. The
//! hourly window refills one request every `3600 / n` seconds with a burst
//! of `n`; the daily window likewise over 24 hours. Counters are in memory
//! and reset on restart. Clients whose quota has refilled are dropped by a
//! periodic [`spawn_pruner`] task.

use crate::config::ServerConfig;
use crate::error::SyllabusError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::Serialize;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Hourly and daily limiters keyed by client address.
pub struct ClientRateLimiter {
    hourly: Option<DefaultKeyedRateLimiter<String>>,
    daily: Option<DefaultKeyedRateLimiter<String>>,
    trust_forwarded_for: bool,
    clock: DefaultClock,
}

impl ClientRateLimiter {
    /// A limit of 0 disables that window.
    pub fn new(hourly_limit: u32, daily_limit: u32, trust_forwarded_for: bool) -> Self {
        let hourly = NonZeroU32::new(hourly_limit).map(Quota::per_hour);
        let daily = NonZeroU32::new(daily_limit)
            .and_then(|n| Quota::with_period(DAY / n.get()).map(|q| q.allow_burst(n)));
        Self::with_quotas(hourly, daily, trust_forwarded_for)
    }

    fn with_quotas(hourly: Option<Quota>, daily: Option<Quota>, trust_forwarded_for: bool) -> Self {
        Self {
            hourly: hourly.map(RateLimiter::keyed),
            daily: daily.map(RateLimiter::keyed),
            trust_forwarded_for,
            clock: DefaultClock::default(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.hourly_limit,
            config.daily_limit,
            config.trust_forwarded_for,
        )
    }

    /// Consume one request for `key`.
    ///
    /// # Errors
    /// [`SyllabusError::RateLimitExceeded`] with the wait until the
    /// failing window admits another request.
    pub fn check(&self, key: &str) -> Result<(), SyllabusError> {
        let key = key.to_string();
        for limiter in [&self.hourly, &self.daily].into_iter().flatten() {
            if let Err(not_until) = limiter.check_key(&key) {
                let wait = not_until.wait_time_from(self.clock.now());
                return Err(SyllabusError::RateLimitExceeded {
                    retry_after_secs: Some(wait.as_secs().max(1)),
                });
            }
        }
        Ok(())
    }

    /// Forget clients whose quota has fully refilled.
    ///
    /// Such a client is indistinguishable from one never seen, so dropping
    /// it changes no decision.
    pub fn prune(&self) {
        for limiter in [&self.hourly, &self.daily].into_iter().flatten() {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    /// Number of client keys held by the larger window.
    pub fn tracked_clients(&self) -> usize {
        [&self.hourly, &self.daily]
            .into_iter()
            .flatten()
            .map(|limiter| limiter.len())
            .max()
            .unwrap_or(0)
    }

    /// Client key: first `X-Forwarded-For` hop when trusted, else the peer IP.
    fn client_key(&self, req: &Request) -> String {
        if self.trust_forwarded_for {
            let forwarded = req
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(hop) = forwarded {
                return hop.to_string();
            }
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Call [`ClientRateLimiter::prune`] every `every` until the runtime shuts down.
pub fn spawn_pruner(limiter: Arc<ClientRateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let before = limiter.tracked_clients();
            limiter.prune();
            debug!(
                "Rate limiter pruned: {} → {} clients",
                before,
                limiter.tracked_clients()
            );
        }
    })
}

#[derive(Serialize)]
struct RateLimitBody {
    error: String,
    message: &'static str,
    retry_after: Option<u64>,
}

fn too_many_requests(err: SyllabusError) -> Response {
    let retry_after = match err {
        SyllabusError::RateLimitExceeded { retry_after_secs } => retry_after_secs,
        _ => None,
    };
    let body = Json(RateLimitBody {
        error: err.to_string(),
        message: "You have reached your usage limit. Please try again later.",
        retry_after,
    });

    let mut response = (err.status_code(), body).into_response();
    if let Some(secs) = retry_after {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }
    response
}

/// Middleware rejecting requests over quota with 429.
pub async fn enforce(
    State(limiter): State<Arc<ClientRateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let key = limiter.client_key(&req);
    match limiter.check(&key) {
        Ok(()) => {
            debug!("Rate limit ok for {}", key);
            next.run(req).await
        }
        Err(err) => {
            warn!("Rate limit exceeded for {}", key);
            too_many_requests(err)
        }
    }
}
