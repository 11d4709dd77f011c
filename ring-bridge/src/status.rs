//! Node status surface
//!
//! Every node pushes a small `{ fill, text }` presentation to the host
//! whenever its state changes; the host never polls. Two pure derivations
//! exist: the lifecycle presentation (connected / no credentials / error /
//! pending) and the per-location alarm-mode coloring.

use serde::Serialize;
use tokio::sync::watch;

use ring_client::AlarmMode;

/// Status dot color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFill {
    Green,
    Yellow,
    Red,
    Grey,
}

/// The status surface pushed to the host runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub fill: StatusFill,
    pub text: String,
}

impl Status {
    pub fn new(fill: StatusFill, text: impl Into<String>) -> Self {
        Self {
            fill,
            text: text.into(),
        }
    }

    /// Mode status for a reconciled location: disarm renders grey,
    /// home yellow, arm red, with the location name in the text
    pub fn for_mode(location_name: &str, mode: AlarmMode) -> Self {
        let fill = match mode {
            AlarmMode::Disarm => StatusFill::Grey,
            AlarmMode::Home => StatusFill::Yellow,
            AlarmMode::Arm => StatusFill::Red,
        };
        Self::new(fill, format!("{}: {}", location_name, mode))
    }
}

/// Lifecycle presentation state, derived from session/controller state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Connected,
    NoCredentials,
    Pending,
    Error(String),
}

impl From<Presentation> for Status {
    fn from(p: Presentation) -> Self {
        match p {
            Presentation::Connected => Status::new(StatusFill::Green, "connected"),
            Presentation::NoCredentials => Status::new(StatusFill::Red, "no credentials"),
            Presentation::Pending => Status::new(StatusFill::Yellow, "waiting for token"),
            Presentation::Error(message) => {
                Status::new(StatusFill::Red, format!("Error: {}", message))
            }
        }
    }
}

/// Push half of a node's status surface
///
/// Deduplicates: publishing the current value again wakes nobody.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    tx: watch::Sender<Status>,
}

impl StatusReporter {
    /// Create a reporter starting at the given status
    pub fn new(initial: Status) -> (Self, watch::Receiver<Status>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx }, rx)
    }

    pub fn publish(&self, status: Status) {
        self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    pub fn publish_presentation(&self, presentation: Presentation) {
        self.publish(Status::from(presentation));
    }

    pub fn current(&self) -> Status {
        self.tx.borrow().clone()
    }
}
