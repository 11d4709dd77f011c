//! Outbound event envelope and the topic grammar
//!
//! Topics are derived deterministically from location id, entity type and
//! entity id; payloads are open JSON objects carrying the remote data blob.

use serde_json::Value;

use ring_client::{CameraId, LocationId, Zid};

/// The message shape handed to the host runtime
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub topic: String,
    pub payload: Value,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }
}

/// Topic for a generic device update
pub fn device_topic(location: &LocationId, zid: &Zid) -> String {
    format!("ring/{}/device/{}", location, zid)
}

/// Topic for a camera motion event
pub fn camera_motion_topic(location: &LocationId, camera: &CameraId) -> String {
    format!("ring/{}/camera/{}/motion", location, camera)
}

/// Topic for a security-panel mode change
pub fn panel_mode_topic(location: &LocationId, zid: &Zid) -> String {
    format!("ring/{}/security-panel/{}/security-mode", location, zid)
}

/// Topic for an alarm activation report from a security panel
pub fn alarm_status_topic(location: &LocationId, zid: &Zid) -> String {
    format!("ring/{}/alarm/{}/status", location, zid)
}

/// Topic for captured camera media
pub fn capture_topic() -> String {
    "image".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_grammar() {
        let location = LocationId::new("loc-1");
        assert_eq!(
            device_topic(&location, &Zid::new("z9")),
            "ring/loc-1/device/z9"
        );
        assert_eq!(
            camera_motion_topic(&location, &CameraId::new("cam-2")),
            "ring/loc-1/camera/cam-2/motion"
        );
        assert_eq!(
            panel_mode_topic(&location, &Zid::new("panel")),
            "ring/loc-1/security-panel/panel/security-mode"
        );
        assert_eq!(
            alarm_status_topic(&location, &Zid::new("panel")),
            "ring/loc-1/alarm/panel/status"
        );
    }
}
