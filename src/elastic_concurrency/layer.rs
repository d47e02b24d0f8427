use std::sync::Arc;

use tower::Layer;

use super::{ElasticLimiter, service::ElasticConcurrencyLimit};

/// Enforces an elastic admission limit on the underlying service.
///
/// Every service produced by the layer shares the same limiter, so the limit
/// applies across all clones.
#[derive(Clone, Debug)]
pub struct ElasticConcurrencyLimitLayer {
    limiter: Arc<ElasticLimiter>,
}

impl ElasticConcurrencyLimitLayer {
    /// Creates a new layer guarding calls with `limiter`.
    pub fn new(limiter: Arc<ElasticLimiter>) -> Self {
        ElasticConcurrencyLimitLayer { limiter }
    }

    pub fn limiter(&self) -> &Arc<ElasticLimiter> {
        &self.limiter
    }
}

impl<S> Layer<S> for ElasticConcurrencyLimitLayer {
    type Service = ElasticConcurrencyLimit<S>;

    fn layer(&self, service: S) -> Self::Service {
        ElasticConcurrencyLimit::new(service, Arc::clone(&self.limiter))
    }
}
