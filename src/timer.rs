use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Clock and sleep source for poll loops and batch pacing.
#[async_trait]
pub trait Timer: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Production timer: wall clock plus `tokio::time::sleep`, which yields to
/// the scheduler instead of blocking the thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
