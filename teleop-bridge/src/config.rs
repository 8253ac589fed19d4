use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::transport::TransportConfig;
use crate::translator::JoystickMapping;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use teleop_core::utils::DEFAULT_STUN_ADDR;
use teleop_core::{IceServerConfig, Role};

pub const SIGNALING_URL_ENV: &str = "TELEOP_SIGNALING_URL";
pub const IDENTITY_FILE_ENV: &str = "TELEOP_IDENTITY_FILE";
pub const TURN_URL_ENV: &str = "TURN_URL";
pub const TURN_USERNAME_ENV: &str = "TURN_USERNAME";
pub const TURN_CREDENTIAL_ENV: &str = "TURN_CREDENTIAL";

/// Everything a bridge process needs to join a room and negotiate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub signaling_url: String,
    pub role: Role,
    pub identity_file: PathBuf,
    /// Delay between identity file reads.
    pub identity_retry_ms: u64,
    /// Delay schedule between signaling reconnects.
    pub reconnect: RetryPolicy,
    pub ice_servers: Vec<IceServerConfig>,
    pub joystick: JoystickMapping,
    /// Upper bound of points per forwarded cloud, zero for no bound.
    pub point_cloud_max_points: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://127.0.0.1:8443/ws".to_owned(),
            role: Role::Robot,
            identity_file: PathBuf::from("robot_id.txt"),
            identity_retry_ms: 1000,
            reconnect: RetryPolicy::exponential(Duration::from_secs(1), Duration::from_secs(30)),
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned()],
                username: None,
                credential: None,
            }],
            joystick: JoystickMapping::default(),
            point_cloud_max_points: 4096,
        }
    }
}

impl BridgeConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Reads `path` if given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = lookup(SIGNALING_URL_ENV) {
            self.signaling_url = url;
        }
        if let Some(path) = lookup(IDENTITY_FILE_ENV) {
            self.identity_file = PathBuf::from(path);
        }
        if let Some(url) = lookup(TURN_URL_ENV) {
            self.ice_servers.push(IceServerConfig {
                urls: vec![url],
                username: lookup(TURN_USERNAME_ENV),
                credential: lookup(TURN_CREDENTIAL_ENV),
            });
        }
    }

    pub fn identity_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_millis(self.identity_retry_ms))
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            ice_servers: self.ice_servers.clone(),
        }
    }
}
