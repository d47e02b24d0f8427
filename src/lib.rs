//! Elastic admission limiter
//!
//! An [`ElasticLimiter`](elastic_concurrency::ElasticLimiter) bounds how many units
//! of work run at once using a pool of permit tokens. It starts with a small
//! budget and grows it whenever a caller waits longer than the acquire timeout.
//!
//! # Algorithm Overview
//!
//! 1. **Acquire**: take a token from the pool. If none arrives within the
//!    timeout (one second by default), admit the caller anyway and grow the
//!    advertised capacity by 1.
//! 2. **Release**: put a token back. A caller that was admitted without a token
//!    thereby adds a new token, growing the pool to match the capacity.
//! 3. **Shrink**: if the pool already holds `limit_ceiling` tokens, the released
//!    token is dropped and the capacity is decreased by 1.
//!
//! # Features
//! - Async `acquire`, non-blocking `release`, atomic `current_capacity` readout
//! - RAII admission guards and a `run` helper that always release
//! - A `tower` layer guarding every call of an inner service
//! - A background reporter publishing the capacity as a metric
//!
//! # Basic Usage
//! ```
//! use elastic_limiter::elastic_concurrency::{ElasticConcurrencySettings, ElasticLimiter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let limiter = ElasticLimiter::new(ElasticConcurrencySettings::default());
//!
//! let body = limiter.run(async { "hello, world" }).await;
//! assert_eq!(body, "hello, world");
//! assert_eq!(limiter.current_capacity(), 5);
//! # }
//! ```
//!
//! # Metrics
//! Emits the `elastic_concurrency_*` metrics through the `metrics` facade and
//! logs capacity changes on the `elastic_concurrency::stats` tracing target.
pub mod elastic_concurrency;
#[cfg(test)]
pub mod test_utils;

#[macro_use]
extern crate tracing;

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
