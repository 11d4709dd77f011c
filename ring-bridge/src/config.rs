//! Node configuration surfaces consumed from the host runtime
//!
//! Historical host configs encoded the bypass flag as both a boolean and the
//! literal string `"true"`. Normalization happens once, at load time: any
//! encoding that is not explicitly truthy deserializes to `false`.

use serde::{Deserialize, Deserializer};

/// Configuration for the alarm mode controller
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlarmControllerConfig {
    /// The location this controller drives
    #[serde(rename = "locationId")]
    pub location_id: String,

    /// Whether commands bypass currently-faulted devices
    #[serde(default, deserialize_with = "lenient_bool")]
    pub bypass: bool,
}

impl AlarmControllerConfig {
    pub fn new(location_id: impl Into<String>, bypass: bool) -> Self {
        Self {
            location_id: location_id.into(),
            bypass,
        }
    }
}

/// What a camera-capture trigger should produce
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum CaptureKind {
    Video,
    Photo,
    /// Anything unrecognized: forwards nothing, reports "unknown type"
    Other(String),
}

impl From<String> for CaptureKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "video" => CaptureKind::Video,
            "photo" => CaptureKind::Photo,
            _ => CaptureKind::Other(s),
        }
    }
}

/// Configuration for the camera capture collaborator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CameraCaptureConfig {
    #[serde(rename = "imagetype")]
    pub kind: CaptureKind,

    /// Clip length for video captures
    #[serde(rename = "videoDurationSeconds", default = "default_video_duration")]
    pub video_duration_seconds: u64,
}

impl CameraCaptureConfig {
    pub fn video(duration_seconds: u64) -> Self {
        Self {
            kind: CaptureKind::Video,
            video_duration_seconds: duration_seconds,
        }
    }

    pub fn photo() -> Self {
        Self {
            kind: CaptureKind::Photo,
            video_duration_seconds: default_video_duration(),
        }
    }
}

fn default_video_duration() -> u64 {
    10
}

/// Accepts `true`/`false`, `"true"`/`"false"`, and treats every other
/// encoding as false (fail closed)
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => b,
        Raw::Text(s) => s == "true",
        Raw::Other(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bypass_accepts_bool_and_string() {
        let from_bool: AlarmControllerConfig =
            serde_json::from_str(r#"{"locationId":"loc-1","bypass":true}"#).unwrap();
        assert!(from_bool.bypass);

        let from_string: AlarmControllerConfig =
            serde_json::from_str(r#"{"locationId":"loc-1","bypass":"true"}"#).unwrap();
        assert!(from_string.bypass);
    }

    #[test]
    fn test_bypass_fails_closed() {
        for raw in [
            r#"{"locationId":"loc-1"}"#,
            r#"{"locationId":"loc-1","bypass":"yes"}"#,
            r#"{"locationId":"loc-1","bypass":"True"}"#,
            r#"{"locationId":"loc-1","bypass":1}"#,
            r#"{"locationId":"loc-1","bypass":null}"#,
        ] {
            let config: AlarmControllerConfig = serde_json::from_str(raw).unwrap();
            assert!(!config.bypass, "expected fail-closed for {}", raw);
        }
    }

    #[test]
    fn test_capture_kind_decoding() {
        let video: CameraCaptureConfig =
            serde_json::from_str(r#"{"imagetype":"video","videoDurationSeconds":30}"#).unwrap();
        assert_eq!(video.kind, CaptureKind::Video);
        assert_eq!(video.video_duration_seconds, 30);

        let photo: CameraCaptureConfig = serde_json::from_str(r#"{"imagetype":"photo"}"#).unwrap();
        assert_eq!(photo.kind, CaptureKind::Photo);
        assert_eq!(photo.video_duration_seconds, 10);

        let odd: CameraCaptureConfig = serde_json::from_str(r#"{"imagetype":"gif"}"#).unwrap();
        assert_eq!(odd.kind, CaptureKind::Other("gif".to_string()));
    }
}
