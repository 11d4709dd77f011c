//! Alarm mode types and the raw-to-presentation mapping

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Zid;

/// Raw three-valued alarm mode as the remote platform reports it
///
/// `None` means fully disarmed, `Some` means perimeter/home armed,
/// `All` means fully armed. Both the primary alarm read and the legacy
/// location-mode fallback read resolve to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawAlarmMode {
    None,
    Some,
    All,
}

impl RawAlarmMode {
    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            RawAlarmMode::None => "none",
            RawAlarmMode::Some => "some",
            RawAlarmMode::All => "all",
        }
    }
}

impl fmt::Display for RawAlarmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Presentation alarm mode
///
/// The three values surfaced to the automation flow. The mapping from
/// [`RawAlarmMode`] is total: none maps to disarm, some to home, all to arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmMode {
    Disarm,
    Home,
    Arm,
}

impl AlarmMode {
    /// Presentation name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmMode::Disarm => "disarm",
            AlarmMode::Home => "home",
            AlarmMode::Arm => "arm",
        }
    }

    /// The legacy location-mode value used by the fallback command path
    pub fn as_location_mode(&self) -> LocationMode {
        match self {
            AlarmMode::Disarm => LocationMode::Disarmed,
            AlarmMode::Home => LocationMode::Home,
            AlarmMode::Arm => LocationMode::Away,
        }
    }
}

impl From<RawAlarmMode> for AlarmMode {
    fn from(raw: RawAlarmMode) -> Self {
        match raw {
            RawAlarmMode::None => AlarmMode::Disarm,
            RawAlarmMode::Some => AlarmMode::Home,
            RawAlarmMode::All => AlarmMode::Arm,
        }
    }
}

impl fmt::Display for AlarmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Legacy location-mode values accepted by the fallback mode-set call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    Home,
    Away,
    Disarmed,
}

impl LocationMode {
    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationMode::Home => "home",
            LocationMode::Away => "away",
            LocationMode::Disarmed => "disarmed",
        }
    }
}

impl fmt::Display for LocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alarm activation payload attached to a security-panel update
///
/// Present only while an alarm is sounding or pending. `faulted_devices`
/// lists the zids that triggered or would block arming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmInfo {
    /// Remote alarm state name (e.g. "burglar-alarm", "entry-delay")
    pub state: String,
    /// Devices involved in the activation
    #[serde(rename = "faultedDevices", default)]
    pub faulted_devices: Vec<Zid>,
}
