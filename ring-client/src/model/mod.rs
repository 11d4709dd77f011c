//! Model types for the Ring client boundary

mod alarm;
mod camera;
mod device;
mod ids;
mod session;

pub use alarm::{AlarmInfo, AlarmMode, LocationMode, RawAlarmMode};
pub use camera::{CameraData, MotionEvent};
pub use device::{Device, DeviceData, DeviceType, DeviceUpdate};
pub use ids::{CameraId, LocationId, Zid};
pub use session::{Profile, TokenUpdate};
