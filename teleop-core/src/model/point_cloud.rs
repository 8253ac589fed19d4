use serde::{Deserialize, Serialize};

use crate::model::joystick::Stamp;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Stamp,
    pub frame_id: String,
}

/// Layout of one field inside a packed point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointField {
    pub name: String,
    pub offset: u32,
    pub datatype: u8,
    pub count: u32,
}

/// A packed point cloud as the robot's sensors produce it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    pub point_step: u32,
    pub row_step: u32,
    pub data: Vec<u8>,
    pub is_dense: bool,
}

impl PointCloud {
    pub fn point_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Bounded subset of a [`PointCloud`] forwarded to operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloudSample {
    pub header: Header,
    pub width: u32,
    pub height: u32,
    pub fields: Vec<PointField>,
    pub point_step: u32,
    pub row_step: u32,
    pub is_dense: bool,
    pub data: Vec<u8>,
}
