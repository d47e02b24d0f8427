use std::time::Duration;

use crate::elastic_concurrency::ElasticLimiterState;
use crate::registered_event;
use metrics::{Counter, Gauge, Histogram, counter, gauge, histogram};

#[derive(Clone, Copy, Debug)]
pub struct ElasticPhantomAdmissionData {
    pub capacity: i64,
    pub waited: Duration,
}

registered_event! {
    ElasticPhantomAdmission => {
        phantom_admissions: Counter = counter!("elastic_concurrency_phantom_admissions_total"),
        capacity: Gauge = gauge!("elastic_concurrency_capacity"),
    }

    fn emit(&self, data: ElasticPhantomAdmissionData) {
        self.phantom_admissions.increment(1);
        self.capacity.set(data.capacity as f64);

        tracing::debug!(
            target: "elastic_concurrency::stats",
            capacity = data.capacity,
            waited_ms = data.waited.as_millis(),
            "Admitted without a token; capacity grown"
        );
    }
}

registered_event! {
    ElasticTokenDropped => {
        shrinks: Counter = counter!("elastic_concurrency_shrinks_total"),
        capacity: Gauge = gauge!("elastic_concurrency_capacity"),
    }

    fn emit(&self, capacity: i64) {
        self.shrinks.increment(1);
        self.capacity.set(capacity as f64);

        // A full pool on release means the limiter grew further than demand needed.
        tracing::warn!(
            target: "elastic_concurrency::stats",
            capacity,
            "Pool at ceiling; token dropped and capacity shrunk"
        );
    }
}

registered_event! {
    ElasticAcquireWait => {
        acquire_wait: Histogram = histogram!("elastic_concurrency_acquire_wait_seconds"),
    }

    fn emit(&self, waited: Duration) {
        self.acquire_wait.record(waited);
        tracing::trace!(target: "elastic_concurrency::stats", waited_ms = waited.as_millis(), "Token acquired");
    }
}

registered_event! {
    ElasticCapacityObserved => {
        capacity: Gauge = gauge!("elastic_concurrency_capacity"),
        available: Gauge = gauge!("elastic_concurrency_available_permits"),
    }

    fn emit(&self, state: ElasticLimiterState) {
        self.capacity.set(state.capacity() as f64);
        self.available.set(state.available() as f64);

        tracing::info!(
            target: "elastic_concurrency::stats",
            capacity = state.capacity(),
            available_permits = state.available(),
            limit_ceiling = state.limit_ceiling(),
            "Capacity observed"
        );
    }
}
