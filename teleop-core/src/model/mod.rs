mod command;
mod joystick;
mod point_cloud;
mod room;
mod session;
mod signaling;

pub use command::{
    BinCommand, ClickCommand, CommandMessage, ConveyorAction, ConveyorCommand, Coordinates,
    DecodeError, RecorderAction, RecorderCommand,
};
pub use joystick::{JoystickCommand, JoystickFrame, Stamp};
pub use point_cloud::{Header, PointCloud, PointCloudSample, PointField};
pub use room::{Role, RoomId};
pub use session::SessionId;
pub use signaling::{ControlEnvelope, IceCandidate, IceServerConfig, SdpKind};
