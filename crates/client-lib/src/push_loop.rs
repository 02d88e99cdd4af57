// ============================
// crates/client-lib/src/push_loop.rs
// ============================
//! The periodic location push: every interval, sample the device position
//! and submit it to the current journey. Cancellation is synchronous; once
//! [`PushLoopHandle::cancel`] returns no further tick can fire, and dropping
//! the handle tears the timer down with it.

use crate::gateway::GatewayHandle;
use crate::position::PositionSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How often a position sample is pushed
pub const PUSH_INTERVAL: Duration = Duration::from_secs(10);

pub struct PushLoopHandle {
    task: JoinHandle<()>,
}

impl PushLoopHandle {
    /// Start pushing position samples for `code` every `period`.
    pub fn spawn(
        gateway: Arc<dyn GatewayHandle>,
        positions: Arc<dyn PositionSource>,
        code: String,
        period: Duration,
    ) -> Self {
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                match positions.current().await {
                    Ok(point) => {
                        if let Err(err) = gateway.send_location(&code, point.lat, point.lng).await
                        {
                            tracing::warn!(error = %err, code, "failed to push location");
                        }
                    }
                    Err(err) => {
                        // skip this tick; the next sample may succeed
                        tracing::warn!(error = %err, "could not read device position");
                    }
                }
            }
        });
        Self { task }
    }

    /// Stop the loop immediately, with no grace period.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for PushLoopHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
