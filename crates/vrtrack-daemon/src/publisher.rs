//! Periodic publishing of device transforms

use anyhow::Result;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use vrtrack_manager::DevicesManager;

use crate::sink::{FrameTransform, TransformSink};

/// Pushes the pose of every managed device to a sink at a fixed period
pub struct TransformPublisher {
    manager: Arc<DevicesManager>,
    sink: Box<dyn TransformSink>,
    base_frame: String,
    frame_prefix: String,
    period: Duration,
}

impl TransformPublisher {
    pub fn new(
        manager: Arc<DevicesManager>,
        sink: Box<dyn TransformSink>,
        base_frame: String,
        frame_prefix: String,
        period: Duration,
    ) -> Self {
        Self {
            manager,
            sink,
            base_frame,
            frame_prefix,
            period,
        }
    }

    /// Refresh poses once and publish every available transform. Returns
    /// the number of transforms published.
    pub fn publish_once(&mut self) -> Result<usize> {
        if let Err(e) = self.manager.compute_poses() {
            debug!(error = %e, "Skipping publish cycle");
            return Ok(0);
        }

        let timestamp = Utc::now();
        let mut published = 0;

        for serial in self.manager.managed_devices() {
            let Some(pose) = self.manager.pose(&serial) else {
                continue;
            };

            self.sink.send(&FrameTransform {
                frame: format!("{}{}", self.frame_prefix, serial),
                parent: self.base_frame.clone(),
                matrix: pose.to_homogeneous(),
                timestamp,
            })?;
            published += 1;
        }

        Ok(published)
    }

    /// Publish until `shutdown` resolves or the runtime goes away. A
    /// shutdown future resolving to an error stops publishing and returns it.
    pub async fn run(&mut self, shutdown: impl Future<Output = Result<()>>) -> Result<()> {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            period_ms = self.period.as_millis() as u64,
            base_frame = %self.base_frame,
            "Transform publisher started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                signal = &mut shutdown => {
                    if let Err(e) = signal {
                        error!(error = %e, "Shutdown signal failed");
                        return Err(e);
                    }
                    info!("Shutdown requested");
                    break;
                }
            }

            if !self.manager.initialized() {
                warn!("Tracking runtime is no longer available");
                break;
            }

            self.publish_once()?;
        }

        info!("Transform publisher stopped");
        Ok(())
    }
}
