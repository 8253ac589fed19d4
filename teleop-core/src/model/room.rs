use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque robot identity. Every peer that joins the same room negotiates
/// with the same robot.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role announced in `join-room`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Workstation,
    Browser,
    Robot,
}

impl Role {
    pub fn is_operator(self) -> bool {
        matches!(self, Role::Workstation | Role::Browser)
    }

    /// The robot side creates the offer and the command channel.
    pub fn initiates(self) -> bool {
        self == Role::Robot
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Workstation => "workstation",
            Role::Browser => "browser",
            Role::Robot => "robot",
        };
        f.write_str(name)
    }
}
