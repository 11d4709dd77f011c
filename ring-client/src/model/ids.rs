//! Identifier newtypes for remote entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a Ring location
///
/// Locations group devices and carry their own alarm mode. The id is
/// assigned by the remote platform and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(String);

impl LocationId {
    /// Creates a new LocationId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LocationId {
    fn from(s: &str) -> Self {
        LocationId::new(s)
    }
}

impl From<String> for LocationId {
    fn from(s: String) -> Self {
        LocationId::new(s)
    }
}

/// Stable identifier for a device within a location (the remote "zid")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zid(String);

impl Zid {
    /// Creates a new Zid
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Zid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Zid {
    fn from(s: &str) -> Self {
        Zid::new(s)
    }
}

impl From<String> for Zid {
    fn from(s: String) -> Self {
        Zid::new(s)
    }
}

/// Unique identifier for a camera
///
/// Cameras live outside the per-location device tree on the remote side,
/// so they carry their own id space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CameraId(String);

impl CameraId {
    /// Creates a new CameraId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CameraId {
    fn from(s: &str) -> Self {
        CameraId::new(s)
    }
}

impl From<String> for CameraId {
    fn from(s: String) -> Self {
        CameraId::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_id_display() {
        let id = LocationId::new("loc-1234");
        assert_eq!(format!("{}", id), "loc-1234");
        assert_eq!(id.as_str(), "loc-1234");
    }

    #[test]
    fn test_zid_equality() {
        let a = Zid::new("abcd-ef");
        let b: Zid = "abcd-ef".into();
        assert_eq!(a, b);
    }

    #[test]
    fn test_camera_id_from_string() {
        let id = CameraId::from("987654".to_string());
        assert_eq!(id.as_str(), "987654");
    }
}
