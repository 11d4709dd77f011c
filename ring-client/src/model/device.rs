//! Device model: type tags, the mutable data blob, and update events

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::{AlarmInfo, RawAlarmMode, Zid};

/// Remote device type tag
///
/// The remote platform grows new device types over time, so anything we do
/// not recognize round-trips through `Unknown` instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    SecurityPanel,
    MotionSensor,
    ContactSensor,
    Camera,
    Unknown(String),
}

impl DeviceType {
    /// Wire name of the type
    pub fn as_str(&self) -> &str {
        match self {
            DeviceType::SecurityPanel => "security-panel",
            DeviceType::MotionSensor => "sensor.motion",
            DeviceType::ContactSensor => "sensor.contact",
            DeviceType::Camera => "camera",
            DeviceType::Unknown(s) => s,
        }
    }
}

impl From<String> for DeviceType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "security-panel" => DeviceType::SecurityPanel,
            "sensor.motion" => DeviceType::MotionSensor,
            "sensor.contact" => DeviceType::ContactSensor,
            "camera" => DeviceType::Camera,
            _ => DeviceType::Unknown(s),
        }
    }
}

impl From<DeviceType> for String {
    fn from(t: DeviceType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The mutable per-device data blob
///
/// A read-only projection of remote state: the whole blob is replaced on
/// every update, individual fields are never mutated locally. Fields the
/// bridge does not model are preserved in `extra` so envelope payloads can
/// carry the full remote view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceData {
    pub zid: Zid,
    pub name: String,
    #[serde(rename = "deviceType")]
    pub device_type: DeviceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faulted: Option<bool>,
    #[serde(rename = "tamperStatus", skip_serializing_if = "Option::is_none")]
    pub tamper_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RawAlarmMode>,
    #[serde(rename = "alarmInfo", skip_serializing_if = "Option::is_none")]
    pub alarm_info: Option<AlarmInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceData {
    /// Create a minimal blob for the given identity
    pub fn new(zid: impl Into<Zid>, name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            zid: zid.into(),
            name: name.into(),
            device_type,
            faulted: None,
            tamper_status: None,
            mode: None,
            alarm_info: None,
            extra: Map::new(),
        }
    }
}

/// A remote device: identity plus its current data blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub zid: Zid,
    #[serde(rename = "deviceType")]
    pub device_type: DeviceType,
    pub data: DeviceData,
}

impl Device {
    /// Build a device projection from its data blob
    pub fn from_data(data: DeviceData) -> Self {
        Self {
            zid: data.zid.clone(),
            device_type: data.device_type.clone(),
            data,
        }
    }
}

/// A change event for one device on a location's update stream
///
/// Carries only the fields the remote chose to include in the delta; a
/// field that is `None` here did not arrive with this update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceUpdate {
    pub zid: Zid,
    #[serde(rename = "deviceType")]
    pub device_type: DeviceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faulted: Option<bool>,
    #[serde(rename = "tamperStatus", skip_serializing_if = "Option::is_none")]
    pub tamper_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RawAlarmMode>,
    #[serde(rename = "alarmInfo", skip_serializing_if = "Option::is_none")]
    pub alarm_info: Option<AlarmInfo>,
}

impl DeviceUpdate {
    /// Create an update carrying no optional fields
    pub fn new(zid: impl Into<Zid>, device_type: DeviceType) -> Self {
        Self {
            zid: zid.into(),
            device_type,
            faulted: None,
            tamper_status: None,
            mode: None,
            alarm_info: None,
        }
    }

    /// Whether this update carries a fault or tamper indicator
    pub fn has_fault_indicator(&self) -> bool {
        self.faulted.is_some() || self.tamper_status.is_some()
    }

    /// Whether this update carries a mode change
    pub fn carries_mode(&self) -> bool {
        self.mode.is_some()
    }
}
