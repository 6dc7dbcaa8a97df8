#![allow(dead_code)]

pub mod collector;

pub use collector::TestCollector;

use ferrous_dnstap_application::dnstap::DnstapEnv;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Route writer-thread logs into the test output. Honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Drop environments off the async runtime; the last one joins the writer
/// thread, which may still be talking to the collector.
pub async fn close_all(envs: Vec<DnstapEnv>) {
    tokio::task::spawn_blocking(move || drop(envs))
        .await
        .unwrap();
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
