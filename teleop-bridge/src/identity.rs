use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use teleop_core::RoomId;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::IdentityError;
use crate::retry::{RetryPolicy, retry_until};

/// Where the robot learns its room identity from. The value may be
/// provisioned by another process some time after startup.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn read(&self) -> io::Result<String>;

    fn describe(&self) -> String;
}

pub struct FileIdentitySource {
    path: PathBuf,
}

impl FileIdentitySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl IdentitySource for FileIdentitySource {
    async fn read(&self) -> io::Result<String> {
        tokio::fs::read_to_string(&self.path).await
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Reads the identity until it is available and non-empty.
///
/// Returns the trimmed first line. Only cancellation ends the wait early.
pub async fn load_identity(
    source: &dyn IdentitySource,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<RoomId, IdentityError> {
    let what = format!("identity from {}", source.describe());

    let identity = retry_until(policy, cancel, &what, move |_| async move {
        let raw = source.read().await?;
        let line = raw.lines().next().unwrap_or_default().trim().to_owned();
        if line.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "identity is empty",
            ));
        }
        Ok::<_, io::Error>(line)
    })
    .await?;

    info!("Loaded robot identity '{}' from {}", identity, source.describe());
    Ok(RoomId::from(identity))
}
