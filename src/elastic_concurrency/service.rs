use std::{
    sync::Arc,
    task::{Context, Poll},
};

use futures::future::BoxFuture;
use tower::Service;

use super::ElasticLimiter;

/// Enforces an elastic admission limit on the inner service.
///
/// Each call waits for an admission from the shared [`ElasticLimiter`] and holds
/// it until the inner response future resolves, successfully or not.
#[derive(Clone, Debug)]
pub struct ElasticConcurrencyLimit<S> {
    inner: S,
    limiter: Arc<ElasticLimiter>,
}

impl<S> ElasticConcurrencyLimit<S> {
    pub fn new(inner: S, limiter: Arc<ElasticLimiter>) -> Self {
        ElasticConcurrencyLimit { inner, limiter }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, Request> Service<Request> for ElasticConcurrencyLimit<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Into<crate::Error>,
    S::Future: Send + 'static,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = crate::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // The service that was driven to readiness goes into the future; a fresh
        // clone takes its place for the next poll_ready.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let limiter = Arc::clone(&self.limiter);

        Box::pin(async move {
            let admission = limiter.acquire_owned().await;
            let result = inner.call(request).await.map_err(Into::into);
            drop(admission);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time;
    use tokio_test::{assert_pending, assert_ready_err, assert_ready_ok, task};
    use tower_test::{assert_request_eq, mock};

    use super::*;
    use crate::elastic_concurrency::{ElasticConcurrencyLimitLayer, ElasticConcurrencySettings};

    fn limiter(initial_fill: usize) -> Arc<ElasticLimiter> {
        Arc::new(ElasticLimiter::new(
            ElasticConcurrencySettings::builder()
                .initial_fill(initial_fill)
                .limit_ceiling(10)
                .build(),
        ))
    }

    #[tokio::test]
    async fn holds_admission_for_the_call() {
        let limiter = limiter(1);
        let (mut svc, mut handle) =
            mock::spawn_layer::<&'static str, &'static str, _>(ElasticConcurrencyLimitLayer::new(
                Arc::clone(&limiter),
            ));

        assert_ready_ok!(svc.poll_ready());
        let mut fut = task::spawn(svc.call("hello"));
        assert_pending!(fut.poll());
        assert_eq!(limiter.available_permits(), 0);

        assert_request_eq!(handle, "hello").send_response("world");
        assert_eq!(assert_ready_ok!(fut.poll()), "world");
        assert_eq!(limiter.available_permits(), 1);
        assert_eq!(limiter.current_capacity(), 1);
    }

    #[tokio::test]
    async fn releases_on_inner_error() {
        let limiter = limiter(1);
        let (mut svc, mut handle) =
            mock::spawn_layer::<&'static str, &'static str, _>(ElasticConcurrencyLimitLayer::new(
                Arc::clone(&limiter),
            ));

        assert_ready_ok!(svc.poll_ready());
        let mut fut = task::spawn(svc.call("hello"));
        assert_pending!(fut.poll());

        assert_request_eq!(handle, "hello").send_error("connection refused");
        assert_ready_err!(fut.poll());
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn grows_when_calls_wait_too_long() {
        time::pause();
        let limiter = limiter(0);
        let (mut svc, mut handle) =
            mock::spawn_layer::<&'static str, &'static str, _>(ElasticConcurrencyLimitLayer::new(
                Arc::clone(&limiter),
            ));

        assert_ready_ok!(svc.poll_ready());
        let mut fut = task::spawn(svc.call("hello"));
        assert_pending!(fut.poll());

        time::advance(Duration::from_millis(1001)).await;
        assert_pending!(fut.poll());
        assert_eq!(limiter.current_capacity(), 1);

        assert_request_eq!(handle, "hello").send_response("world");
        assert_eq!(assert_ready_ok!(fut.poll()), "world");
        assert_eq!(limiter.available_permits(), 1);
    }
}
