use crate::config::BridgeConfig;
use crate::error::ChannelError;
use crate::session::{ChannelState, SessionRegistry};
use crate::sink::RobotCommandSink;
use teleop_core::{CommandMessage, PointCloud, PointCloudSample, RoomId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Bounds the number of points forwarded per cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointCloudSampler {
    /// Zero disables sampling.
    pub max_points: usize,
}

impl PointCloudSampler {
    pub fn new(max_points: usize) -> Self {
        Self { max_points }
    }

    /// Keeps every k-th point, `k = ceil(n / max_points)`. Sampled clouds
    /// come out flat (`height == 1`). Clouds within the limit pass through
    /// unchanged.
    pub fn sample(&self, cloud: &PointCloud) -> PointCloudSample {
        let count = cloud.point_count();
        if self.max_points == 0 || count <= self.max_points {
            return PointCloudSample {
                header: cloud.header.clone(),
                width: cloud.width,
                height: cloud.height,
                fields: cloud.fields.clone(),
                point_step: cloud.point_step,
                row_step: cloud.row_step,
                is_dense: cloud.is_dense,
                data: cloud.data.clone(),
            };
        }

        let stride = count.div_ceil(self.max_points);
        let step = cloud.point_step as usize;
        let width = cloud.width as usize;
        let row_step = cloud.row_step as usize;

        let mut data = Vec::with_capacity(self.max_points * step);
        let mut kept = 0u32;
        for index in (0..count).step_by(stride) {
            let start = (index / width) * row_step + (index % width) * step;
            let Some(point) = cloud.data.get(start..start + step) else {
                break;
            };
            data.extend_from_slice(point);
            kept += 1;
        }

        PointCloudSample {
            header: cloud.header.clone(),
            width: kept,
            height: 1,
            fields: cloud.fields.clone(),
            point_step: cloud.point_step,
            row_step: kept * cloud.point_step,
            is_dense: cloud.is_dense,
            data,
        }
    }
}

/// Forwards robot point clouds to the operator over the identity's current
/// command channel. Sensor data is best effort: samples are dropped while no
/// channel is open.
pub struct PointCloudBridge {
    registry: SessionRegistry,
    identity: RoomId,
    sampler: PointCloudSampler,
    dropped: u64,
}

impl PointCloudBridge {
    pub fn new(registry: SessionRegistry, identity: RoomId, sampler: PointCloudSampler) -> Self {
        Self {
            registry,
            identity,
            sampler,
            dropped: 0,
        }
    }

    /// Spawns a bridge for the clouds `sink` publishes, sampled down to
    /// `config.point_cloud_max_points`. `None` if the sink publishes none.
    pub fn spawn_for(
        registry: SessionRegistry,
        identity: RoomId,
        config: &BridgeConfig,
        sink: &dyn RobotCommandSink,
    ) -> Option<JoinHandle<()>> {
        let clouds = sink.take_point_clouds()?;
        info!(
            "Forwarding point clouds for {} (at most {} points each)",
            identity, config.point_cloud_max_points
        );
        let bridge = Self::new(
            registry,
            identity,
            PointCloudSampler::new(config.point_cloud_max_points),
        );
        Some(tokio::spawn(bridge.run(clouds)))
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub async fn forward(&mut self, cloud: &PointCloud) -> Result<(), ChannelError> {
        let result = self.try_forward(cloud).await;
        if let Err(e) = &result {
            self.dropped += 1;
            debug!(
                "Dropped point cloud for {} ({} so far): {}",
                self.identity, self.dropped, e
            );
        }
        result
    }

    async fn try_forward(&self, cloud: &PointCloud) -> Result<(), ChannelError> {
        let session = self
            .registry
            .get(&self.identity)
            .ok_or(ChannelError::NotConnected)?;
        if session.status().channel != ChannelState::Open {
            return Err(ChannelError::NotOpen);
        }

        let sample = self.sampler.sample(cloud);
        session
            .channel()
            .send(&CommandMessage::PointCloud(sample))
            .await
    }

    /// Forwards clouds until `clouds` closes. When clouds arrive faster than
    /// they are sent only the most recent one is forwarded.
    pub async fn run(mut self, mut clouds: mpsc::Receiver<PointCloud>) {
        while let Some(mut cloud) = clouds.recv().await {
            while let Ok(newer) = clouds.try_recv() {
                cloud = newer;
            }
            let _ = self.forward(&cloud).await;
        }

        info!(
            "Point cloud source for {} closed, {} samples dropped",
            self.identity, self.dropped
        );
    }
}
