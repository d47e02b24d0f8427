use std::{
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use snafu::ensure;
use tokio::{
    sync::{
        Mutex, Semaphore,
        mpsc::{self, error::TrySendError},
    },
    time::{Instant, timeout},
};

use super::{
    ElasticConcurrencySettings,
    error::{BuildError, CeilingOutOfRangeSnafu, InitialExceedsCeilingSnafu},
    internal_event::{
        ElasticAcquireWait, ElasticPhantomAdmission, ElasticPhantomAdmissionData,
        ElasticTokenDropped,
    },
};

/// An admission limiter whose permit budget grows under sustained contention.
///
/// Permits are opaque tokens held in a bounded pool of `limit_ceiling` slots. An
/// [`acquire`](Self::acquire) takes a token when one turns up within the acquire
/// timeout. Otherwise the caller is admitted anyway, without a token, and the
/// reported capacity grows by one. The matching [`release`](Self::release)
/// then puts a brand new token in the pool, so repeated timeouts inflate the
/// pool until callers stop waiting.
///
/// The only shrink path is a release into a pool that already holds
/// `limit_ceiling` tokens: the token is dropped and the capacity walks back
/// down by one. `release` cannot tell whether its caller held a token, so this
/// path may fire for either kind of admission.
///
/// The capacity counter is advisory. Enforcement comes only from waiting on the
/// pool.
pub struct ElasticLimiter {
    tokens_tx: mpsc::Sender<()>,
    tokens_rx: Mutex<mpsc::Receiver<()>>,
    capacity: AtomicI64,
    acquire_timeout: Duration,

    phantom_admission: ElasticPhantomAdmission,
    token_dropped: ElasticTokenDropped,
    acquire_wait: ElasticAcquireWait,
}

/// How a call to [`ElasticLimiter::acquire`] was admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// A token was taken from the pool.
    Token,
    /// The wait timed out and the caller was admitted without a token.
    Phantom,
}

impl Admission {
    pub const fn is_phantom(&self) -> bool {
        matches!(self, Admission::Phantom)
    }
}

/// A snapshot of the state of an [`ElasticLimiter`].
///
/// Not guaranteed to be consistent under concurrency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElasticLimiterState {
    capacity: i64,
    available: usize,
    limit_ceiling: usize,
}

impl ElasticLimiterState {
    /// The advertised capacity.
    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    /// Tokens sitting in the pool.
    pub fn available(&self) -> usize {
        self.available
    }

    pub fn limit_ceiling(&self) -> usize {
        self.limit_ceiling
    }
}

impl ElasticLimiter {
    /// Creates a limiter from `settings`.
    ///
    /// # Panics
    ///
    /// Panics if `initial_fill` exceeds `limit_ceiling`, or if `limit_ceiling` is
    /// zero. Use [`try_new`](Self::try_new) to handle those as errors.
    pub fn new(settings: ElasticConcurrencySettings) -> Self {
        match Self::try_new(settings) {
            Ok(limiter) => limiter,
            Err(error) => panic!("invalid elastic limiter settings: {error}"),
        }
    }

    pub fn try_new(settings: ElasticConcurrencySettings) -> Result<Self, BuildError> {
        let initial_fill = settings.get_initial_fill();
        let limit_ceiling = settings.get_limit_ceiling();

        ensure!(
            (1..=Semaphore::MAX_PERMITS).contains(&limit_ceiling),
            CeilingOutOfRangeSnafu { limit_ceiling }
        );
        ensure!(
            initial_fill <= limit_ceiling,
            InitialExceedsCeilingSnafu {
                initial_fill,
                limit_ceiling
            }
        );

        let (tokens_tx, tokens_rx) = mpsc::channel(limit_ceiling);
        for _ in 0..initial_fill {
            // Cannot be full: initial_fill <= limit_ceiling.
            let _ = tokens_tx.try_send(());
        }

        debug!(
            message = "Elastic limiter created.",
            initial_fill,
            limit_ceiling,
            acquire_timeout_ms = settings.get_acquire_timeout().as_millis(),
        );

        Ok(Self {
            tokens_tx,
            tokens_rx: Mutex::new(tokens_rx),
            capacity: AtomicI64::new(initial_fill as i64),
            acquire_timeout: settings.get_acquire_timeout(),
            phantom_admission: ElasticPhantomAdmission::register(),
            token_dropped: ElasticTokenDropped::register(),
            acquire_wait: ElasticAcquireWait::register(),
        })
    }

    /// Waits up to the acquire timeout for a token.
    ///
    /// Always admits the caller: with a token if one became available in time,
    /// otherwise without one, after growing the capacity by one. Either way the
    /// caller must call [`release`](Self::release) exactly once afterwards.
    ///
    /// Dropping the returned future before it completes leaves both the pool and
    /// the capacity untouched.
    pub async fn acquire(&self) -> Admission {
        let start = Instant::now();
        let token = timeout(self.acquire_timeout, async {
            let mut tokens = self.tokens_rx.lock().await;
            tokens.recv().await
        })
        .await;

        match token {
            Ok(Some(())) => {
                self.acquire_wait.emit(start.elapsed());
                Admission::Token
            }
            // `tokens_tx` lives as long as `self`, so the pool never closes; only
            // the timeout lands here in practice.
            Ok(None) | Err(_) => {
                let capacity = self.capacity.fetch_add(1, Ordering::Relaxed) + 1;
                self.phantom_admission.emit(ElasticPhantomAdmissionData {
                    capacity,
                    waited: start.elapsed(),
                });
                Admission::Phantom
            }
        }
    }

    /// Returns a token to the pool without blocking.
    ///
    /// If the pool already holds `limit_ceiling` tokens the token is dropped
    /// and the capacity shrinks by one instead.
    pub fn release(&self) {
        match self.tokens_tx.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => {
                let capacity = self.capacity.fetch_sub(1, Ordering::Relaxed) - 1;
                self.token_dropped.emit(capacity);
            }
            // The receiver is owned by `self`.
            Err(TrySendError::Closed(())) => {}
        }
    }

    /// The advertised capacity: how many concurrent callers the limiter
    /// currently intends to admit.
    pub fn current_capacity(&self) -> i64 {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Tokens currently sitting in the pool.
    pub fn available_permits(&self) -> usize {
        self.tokens_tx.max_capacity() - self.tokens_tx.capacity()
    }

    pub fn limit_ceiling(&self) -> usize {
        self.tokens_tx.max_capacity()
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    pub fn state(&self) -> ElasticLimiterState {
        ElasticLimiterState {
            capacity: self.current_capacity(),
            available: self.available_permits(),
            limit_ceiling: self.limit_ceiling(),
        }
    }

    /// Like [`acquire`](Self::acquire), but releases automatically when the
    /// returned guard is dropped.
    pub async fn acquire_guard(&self) -> AdmissionGuard<'_> {
        let admission = self.acquire().await;
        AdmissionGuard {
            limiter: self,
            admission,
        }
    }

    /// Like [`acquire_guard`](Self::acquire_guard), but the guard keeps the
    /// limiter alive and can be moved into a spawned task.
    pub async fn acquire_owned(self: &Arc<Self>) -> OwnedAdmissionGuard {
        let admission = self.acquire().await;
        OwnedAdmissionGuard {
            limiter: Arc::clone(self),
            admission,
        }
    }

    /// Runs `work` inside an admission.
    ///
    /// The admission is released once `work` completes, panics, or is dropped
    /// unfinished.
    pub async fn run<F>(&self, work: F) -> F::Output
    where
        F: Future,
    {
        let _admission = self.acquire_guard().await;
        work.await
    }
}

impl fmt::Debug for ElasticLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticLimiter")
            .field("capacity", &self.current_capacity())
            .field("available", &self.available_permits())
            .field("limit_ceiling", &self.limit_ceiling())
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}

/// An admission that is released when dropped.
#[derive(Debug)]
#[must_use = "the admission is released as soon as the guard is dropped"]
pub struct AdmissionGuard<'a> {
    limiter: &'a ElasticLimiter,
    admission: Admission,
}

impl AdmissionGuard<'_> {
    pub fn admission(&self) -> Admission {
        self.admission
    }
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}

/// An owned admission that is released when dropped.
#[derive(Debug)]
#[must_use = "the admission is released as soon as the guard is dropped"]
pub struct OwnedAdmissionGuard {
    limiter: Arc<ElasticLimiter>,
    admission: Admission,
}

impl OwnedAdmissionGuard {
    pub fn admission(&self) -> Admission {
        self.admission
    }

    pub fn limiter(&self) -> &Arc<ElasticLimiter> {
        &self.limiter
    }
}

impl Drop for OwnedAdmissionGuard {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
