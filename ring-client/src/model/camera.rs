//! Camera model: static data blob and motion events

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::CameraId;

/// Static camera data blob
///
/// Whatever the remote last reported for the camera (battery, kind,
/// firmware and so on), kept open-ended like [`super::DeviceData`]. The
/// motion listener joins this in at forward time, not at detection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraData {
    pub id: CameraId,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CameraData {
    /// Create a minimal blob for the given identity
    pub fn new(id: impl Into<CameraId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }
}

/// A motion ping from a camera's motion stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionEvent {
    /// Whether motion is currently detected (false marks the end of an event)
    pub detected: bool,
}

impl MotionEvent {
    pub fn detected() -> Self {
        Self { detected: true }
    }

    pub fn cleared() -> Self {
        Self { detected: false }
    }
}
