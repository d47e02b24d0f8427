use snafu::Snafu;
use tokio::sync::Semaphore;

/// Misconfiguration detected while constructing an [`ElasticLimiter`](super::ElasticLimiter).
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum BuildError {
    /// More tokens were requested up front than the pool can ever hold.
    #[snafu(display(
        "initial fill ({initial_fill}) must not exceed the limit ceiling ({limit_ceiling})"
    ))]
    InitialExceedsCeiling {
        initial_fill: usize,
        limit_ceiling: usize,
    },

    /// The pool could never hold a token, or could not be allocated at all.
    #[snafu(display(
        "limit ceiling ({limit_ceiling}) must be between 1 and {}",
        Semaphore::MAX_PERMITS
    ))]
    CeilingOutOfRange { limit_ceiling: usize },
}
