use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::model::joystick::JoystickFrame;
use crate::model::point_cloud::PointCloudSample;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
    #[serde(default)]
    pub z: i64,
}

/// A click on one of the robot's video streams, in the stream's native
/// resolution. `video_id` only tells the robot which camera frame the
/// coordinates belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickCommand {
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinCommand {
    #[serde(rename = "id")]
    pub bin_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConveyorAction {
    Jam,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConveyorCommand {
    pub command: ConveyorAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderAction {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderCommand {
    pub command: RecorderAction,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed command payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown command type `{0}`")]
    UnknownType(String),
}

/// Payload of one command-channel frame.
///
/// Joystick frames carry no `type` field; every other message is tagged.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandMessage {
    Joystick(JoystickFrame),
    Click(ClickCommand),
    Bin(BinCommand),
    Conveyor(ConveyorCommand),
    Recorder(RecorderCommand),
    /// Robot to operator only.
    PointCloud(PointCloudSample),
}

const TAGGED_TYPES: [&str; 5] = [
    "click-coordinates",
    "move_to_bin",
    "conveyor_control",
    "video_manager",
    "point-cloud",
];

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Tagged {
    #[serde(rename = "click-coordinates")]
    Click(ClickCommand),
    #[serde(rename = "move_to_bin")]
    Bin(BinCommand),
    #[serde(rename = "conveyor_control")]
    Conveyor(ConveyorCommand),
    #[serde(rename = "video_manager")]
    Recorder(RecorderCommand),
    #[serde(rename = "point-cloud")]
    PointCloud { data: PointCloudSample },
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum TaggedRef<'a> {
    #[serde(rename = "click-coordinates")]
    Click(&'a ClickCommand),
    #[serde(rename = "move_to_bin")]
    Bin(&'a BinCommand),
    #[serde(rename = "conveyor_control")]
    Conveyor(&'a ConveyorCommand),
    #[serde(rename = "video_manager")]
    Recorder(&'a RecorderCommand),
    #[serde(rename = "point-cloud")]
    PointCloud { data: &'a PointCloudSample },
}

impl From<Tagged> for CommandMessage {
    fn from(tagged: Tagged) -> Self {
        match tagged {
            Tagged::Click(cmd) => CommandMessage::Click(cmd),
            Tagged::Bin(cmd) => CommandMessage::Bin(cmd),
            Tagged::Conveyor(cmd) => CommandMessage::Conveyor(cmd),
            Tagged::Recorder(cmd) => CommandMessage::Recorder(cmd),
            Tagged::PointCloud { data } => CommandMessage::PointCloud(data),
        }
    }
}

impl Serialize for CommandMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CommandMessage::Joystick(frame) => frame.serialize(serializer),
            CommandMessage::Click(cmd) => TaggedRef::Click(cmd).serialize(serializer),
            CommandMessage::Bin(cmd) => TaggedRef::Bin(cmd).serialize(serializer),
            CommandMessage::Conveyor(cmd) => TaggedRef::Conveyor(cmd).serialize(serializer),
            CommandMessage::Recorder(cmd) => TaggedRef::Recorder(cmd).serialize(serializer),
            CommandMessage::PointCloud(data) => TaggedRef::PointCloud { data }.serialize(serializer),
        }
    }
}

impl CommandMessage {
    /// Parses one frame. Frames without a `type` field are joystick frames.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(raw)?;

        match value.get("type") {
            None => Ok(CommandMessage::Joystick(serde_json::from_value(value)?)),
            Some(Value::String(kind)) if TAGGED_TYPES.contains(&kind.as_str()) => {
                Ok(serde_json::from_value::<Tagged>(value)?.into())
            }
            Some(Value::String(kind)) => Err(DecodeError::UnknownType(kind.clone())),
            Some(other) => Err(DecodeError::UnknownType(other.to_string())),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CommandMessage::Joystick(_) => "joystick",
            CommandMessage::Click(_) => "click-coordinates",
            CommandMessage::Bin(_) => "move_to_bin",
            CommandMessage::Conveyor(_) => "conveyor_control",
            CommandMessage::Recorder(_) => "video_manager",
            CommandMessage::PointCloud(_) => "point-cloud",
        }
    }
}
