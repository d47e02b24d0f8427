use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

use super::{ElasticLimiter, internal_event::ElasticCapacityObserved};

/// Spawns a task that publishes the limiter's capacity every `period`.
///
/// Each tick records the `elastic_concurrency_capacity` and
/// `elastic_concurrency_available_permits` gauges and logs the reading on the
/// `elastic_concurrency::stats` target. The task runs until the returned handle
/// is aborted.
///
/// # Panics
///
/// Panics if `period` is zero.
pub fn spawn_capacity_reporter(limiter: Arc<ElasticLimiter>, period: Duration) -> JoinHandle<()> {
    let observed = ElasticCapacityObserved::register();
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::spawn(async move {
        loop {
            ticks.tick().await;
            observed.emit(limiter.state());
        }
    })
}

#[cfg(test)]
mod tests {
    use tokio::time;

    use super::*;
    use crate::{elastic_concurrency::ElasticConcurrencySettings, test_utils::trace_init};

    #[tokio::test(start_paused = true)]
    async fn reports_until_aborted() {
        trace_init();
        let limiter = Arc::new(ElasticLimiter::new(ElasticConcurrencySettings::default()));

        let reporter = spawn_capacity_reporter(Arc::clone(&limiter), Duration::from_millis(200));
        time::sleep(Duration::from_secs(1)).await;
        assert!(!reporter.is_finished());

        reporter.abort();
        let error = reporter.await.unwrap_err();
        assert!(error.is_cancelled());

        // Only the test still holds the limiter once the task is gone.
        assert_eq!(Arc::strong_count(&limiter), 1);
    }
}
