//! Bound the number of concurrently admitted units of work, growing the bound
//! when callers keep timing out while waiting for a permit.

mod error;
pub mod internal_event;
pub mod layer;
pub mod limiter;
pub mod reporter;
pub mod service;

use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

pub use error::BuildError;
pub use layer::ElasticConcurrencyLimitLayer;
pub use limiter::{
    Admission, AdmissionGuard, ElasticLimiter, ElasticLimiterState, OwnedAdmissionGuard,
};
pub use reporter::spawn_capacity_reporter;
pub use service::ElasticConcurrencyLimit;

/// Construction parameters of an [`ElasticLimiter`].
///
/// | Parameter | Default | Description |
/// |-----------|---------|-------------|
/// | `initial_fill` | 5 | Tokens placed in the pool at construction, and the starting capacity |
/// | `limit_ceiling` | 1000 | Hard maximum number of tokens the pool can hold |
/// | `acquire_timeout_ms` | 1000 | How long `acquire` waits for a token before admitting without one |
///
/// `initial_fill` must not exceed `limit_ceiling`, and `limit_ceiling` must be at
/// least 1. Both are checked by [`ElasticLimiter::try_new`].
///
/// # Example
///
/// ```rust
/// use elastic_limiter::elastic_concurrency::{ElasticConcurrencySettings, ElasticLimiter};
///
/// let settings = ElasticConcurrencySettings::builder()
///     .initial_fill(2)
///     .limit_ceiling(10)
///     .build();
/// let limiter = ElasticLimiter::new(settings);
/// assert_eq!(limiter.current_capacity(), 2);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Builder, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ElasticConcurrencySettings {
    /// Tokens pre-loaded into the pool. The capacity counter starts here too.
    #[builder(default = default_initial_fill())]
    #[serde(default = "default_initial_fill")]
    pub(super) initial_fill: usize,

    /// Upper bound on the number of tokens queued in the pool.
    ///
    /// Releasing into a pool that already holds this many tokens drops the token
    /// and walks the reported capacity back down by one.
    #[builder(default = default_limit_ceiling())]
    #[serde(default = "default_limit_ceiling")]
    pub(super) limit_ceiling: usize,

    /// Milliseconds an `acquire` waits before admitting the caller without a
    /// token and growing the capacity.
    #[builder(default = default_acquire_timeout_ms())]
    #[serde(default = "default_acquire_timeout_ms")]
    pub(super) acquire_timeout_ms: u64,
}

const fn default_initial_fill() -> usize {
    5
}

const fn default_limit_ceiling() -> usize {
    1000
}

const fn default_acquire_timeout_ms() -> u64 {
    1000
}

impl Default for ElasticConcurrencySettings {
    fn default() -> Self {
        Self {
            initial_fill: default_initial_fill(),
            limit_ceiling: default_limit_ceiling(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

impl ElasticConcurrencySettings {
    pub fn get_initial_fill(&self) -> usize {
        self.initial_fill
    }

    pub fn get_limit_ceiling(&self) -> usize {
        self.limit_ceiling
    }

    pub fn get_acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builder() {
        let built = ElasticConcurrencySettings::builder().build();
        assert_eq!(built, ElasticConcurrencySettings::default());
        assert_eq!(built.get_initial_fill(), 5);
        assert_eq!(built.get_limit_ceiling(), 1000);
        assert_eq!(built.get_acquire_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn deserialize_fills_missing_fields() {
        let settings: ElasticConcurrencySettings =
            serde_json::from_str(r#"{ "limit_ceiling": 50 }"#).unwrap();
        assert_eq!(settings.get_initial_fill(), 5);
        assert_eq!(settings.get_limit_ceiling(), 50);
        assert_eq!(settings.get_acquire_timeout(), Duration::from_millis(1000));
    }

    #[test]
    fn deserialize_rejects_unknown_fields() {
        let result = serde_json::from_str::<ElasticConcurrencySettings>(r#"{ "max_conns": 5 }"#);
        assert!(result.is_err());
    }
}
