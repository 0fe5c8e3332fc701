use anyhow::{Result, anyhow};
use std::{future::Future, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation and deadline shared by every network call of a run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the run was cancelled or ran past its deadline.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(anyhow!("run cancelled"));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(anyhow!("run deadline exceeded"));
        }
        Ok(())
    }

    /// Drive `call` unless the run is cancelled or the deadline fires first.
    pub async fn run<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(anyhow!("run cancelled")),
            _ = deadline => Err(anyhow!("run deadline exceeded")),
            result = call => result,
        }
    }
}
