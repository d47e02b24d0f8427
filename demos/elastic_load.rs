// demos/elastic_load.rs
//
// Drives an `ElasticLimiter` with many looping workers whose simulated
// requests are slower than the initial permit budget can absorb, and prints
// the capacity as it grows.
//
//   RUST_LOG=info cargo run --example elastic_load

use std::{env, sync::Arc, time::Duration};

use elastic_limiter::elastic_concurrency::{
    ElasticConcurrencySettings, ElasticLimiter, spawn_capacity_reporter,
};
use tokio::time::sleep;
use tracing::{info, trace, warn};

const WORKERS_ENV_VAR: &str = "ELASTIC_LOAD_WORKERS";
const DEFAULT_WORKERS: usize = 1000;
const WORKER_SPAWN_INTERVAL: Duration = Duration::from_millis(1);
const SIMULATED_LATENCY_MS: u64 = 100;
const WORKER_PAUSE: Duration = Duration::from_secs(1);
const REPORT_INTERVAL: Duration = Duration::from_millis(200);
const RUN_FOR: Duration = Duration::from_secs(20);

/// Stands in for an outbound request: ~100ms of latency and an occasional failure.
async fn simulated_request(worker: usize) -> Result<usize, String> {
    let jitter = rand::random_range(0..SIMULATED_LATENCY_MS / 5);
    sleep(Duration::from_millis(SIMULATED_LATENCY_MS + jitter)).await;

    if rand::random_range(0..100) == 0 {
        Err(format!("worker {worker}: simulated upstream failure"))
    } else {
        Ok("hello, world\n".len())
    }
}

async fn worker(id: usize, limiter: Arc<ElasticLimiter>) {
    loop {
        match limiter.run(simulated_request(id)).await {
            Ok(bytes) => trace!(worker = id, bytes, "Request succeeded."),
            Err(error) => warn!(message = "Request failed.", worker = id, %error),
        }
        sleep(WORKER_PAUSE).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();

    let workers = match env::var(WORKERS_ENV_VAR) {
        Ok(value) => value
            .parse()
            .map_err(|e| format!("Invalid {WORKERS_ENV_VAR} value {value:?}: {e}"))?,
        Err(_) => DEFAULT_WORKERS,
    };

    let settings = ElasticConcurrencySettings::builder()
        .initial_fill(5)
        .limit_ceiling(1000)
        .build();
    let limiter = Arc::new(ElasticLimiter::try_new(settings)?);

    info!(workers, "Starting workers.");
    let reporter = spawn_capacity_reporter(Arc::clone(&limiter), REPORT_INTERVAL);

    let mut handles = Vec::with_capacity(workers);
    for id in 0..workers {
        handles.push(tokio::spawn(worker(id, Arc::clone(&limiter))));
        sleep(WORKER_SPAWN_INTERVAL).await;
    }

    sleep(RUN_FOR).await;

    reporter.abort();
    for handle in &handles {
        handle.abort();
    }

    let state = limiter.state();
    info!(
        capacity = state.capacity(),
        available_permits = state.available(),
        limit_ceiling = state.limit_ceiling(),
        "Load finished."
    );
    Ok(())
}
