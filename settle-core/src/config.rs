use crate::{Error, FinalizeError, Result};
use std::{env, time::Duration};
use url::Url;

pub const POLL_INTERVAL_PARAM: &str = "poll_interval_ms";
pub const MAX_POLL_ITERATIONS_PARAM: &str = "max_poll_iterations";
pub const POLL_INTERVAL_ENV: &str = "SETTLE_POLL_INTERVAL_MS";
pub const MAX_POLL_ITERATIONS_ENV: &str = "SETTLE_MAX_POLL_ITERATIONS";

/// Tunables of the busy connection wait.
///
/// The longest a finalizer can wait before finalizing is `poll_interval * max_poll_iterations`,
/// a value of `0` iterations finalizes right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizerConfig {
    pub poll_interval: Duration,
    pub max_poll_iterations: u32,
}

impl FinalizerConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
    pub const DEFAULT_MAX_POLL_ITERATIONS: u32 = 40;

    pub const fn new(poll_interval: Duration, max_poll_iterations: u32) -> Self {
        Self {
            poll_interval,
            max_poll_iterations,
        }
    }

    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub const fn with_max_poll_iterations(mut self, max_poll_iterations: u32) -> Self {
        self.max_poll_iterations = max_poll_iterations;
        self
    }

    pub fn max_wait(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_poll_iterations)
    }

    /// Read `SETTLE_POLL_INTERVAL_MS` and `SETTLE_MAX_POLL_ITERATIONS`, missing values are defaulted.
    pub fn from_env() -> Result<Self> {
        Self::resolve(
            env::var(POLL_INTERVAL_ENV).ok(),
            env::var(MAX_POLL_ITERATIONS_ENV).ok(),
        )
    }

    /// Take the tunables out of the query of a connection url.
    ///
    /// The `poll_interval_ms` and `max_poll_iterations` parameters are removed from the url so
    /// that it can be handed to the driver untouched. Missing parameters fall back to the
    /// environment variables, then to the defaults.
    pub fn take_from_url(url: &mut Url) -> Result<Self> {
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let mut take_param = |key: &str, env_var: &str| {
            let value = pairs
                .iter()
                .position(|(k, _)| k == key)
                .map(|pos| pairs.remove(pos).1);
            value.or_else(|| env::var(env_var).ok())
        };
        let poll_interval = take_param(POLL_INTERVAL_PARAM, POLL_INTERVAL_ENV);
        let max_poll_iterations = take_param(MAX_POLL_ITERATIONS_PARAM, MAX_POLL_ITERATIONS_ENV);
        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Self::resolve(poll_interval, max_poll_iterations)
    }

    fn resolve(poll_interval: Option<String>, max_poll_iterations: Option<String>) -> Result<Self> {
        let mut result = Self::default();
        if let Some(value) = poll_interval {
            result.poll_interval = Duration::from_millis(parse_param(POLL_INTERVAL_PARAM, value)?);
        }
        if let Some(value) = max_poll_iterations {
            result.max_poll_iterations = parse_param(MAX_POLL_ITERATIONS_PARAM, value)?;
        }
        Ok(result)
    }
}

impl Default for FinalizerConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_POLL_INTERVAL,
            Self::DEFAULT_MAX_POLL_ITERATIONS,
        )
    }
}

fn parse_param<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        let error: Error = FinalizeError::InvalidConfig { key, value }.into();
        log::error!("{:#}", error);
        error
    })
}
