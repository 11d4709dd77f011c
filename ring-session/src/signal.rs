//! Session lifecycle signal
//!
//! The "attach only after session-ready" pattern: a single-fire latch per
//! credential generation rather than a subscription. Consumers await it
//! exactly once; once the session is ready, later waiters resolve
//! immediately, so a consumer constructed after a rotation still attaches
//! without the signal refiring for everyone else.

use tokio::sync::watch;

/// Observable session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Credential resolved, session opening; not yet safe to attach
    Pending,
    /// Session live and probed; consumers may attach
    Ready { generation: u64 },
    /// No usable credential; terminal until reconfigured
    NoCredential,
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready { .. })
    }
}

/// Publisher half of the lifecycle signal, owned by the session manager
#[derive(Debug, Clone)]
pub struct SessionSignal {
    tx: watch::Sender<SessionState>,
}

impl SessionSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::Pending);
        Self { tx }
    }

    /// A new watcher over the lifecycle state
    pub fn watch(&self) -> SessionWatch {
        SessionWatch {
            rx: self.tx.subscribe(),
        }
    }

    pub fn current(&self) -> SessionState {
        *self.tx.borrow()
    }

    /// Latch `Ready` for the given generation; a no-op if that generation
    /// is already ready (rotation must not refire the signal)
    pub(crate) fn publish_ready(&self, generation: u64) {
        self.tx.send_if_modified(|state| {
            if *state == (SessionState::Ready { generation }) {
                false
            } else {
                *state = SessionState::Ready { generation };
                true
            }
        });
    }

    pub(crate) fn publish(&self, state: SessionState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

impl Default for SessionSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer half: await attachment, read current state
#[derive(Debug, Clone)]
pub struct SessionWatch {
    rx: watch::Receiver<SessionState>,
}

impl SessionWatch {
    pub fn current(&self) -> SessionState {
        *self.rx.borrow()
    }

    /// Wait until the session resolves out of `Pending`
    ///
    /// Resolves immediately when the session is already ready, so consumers
    /// constructed after the latch fired attach without a new signal. If the
    /// manager goes away before resolving, this reports `NoCredential`.
    pub async fn wait_attached(&mut self) -> SessionState {
        match self
            .rx
            .wait_for(|state| !matches!(state, SessionState::Pending))
            .await
        {
            Ok(state) => *state,
            Err(_) => {
                tracing::debug!("session manager dropped before the session resolved");
                SessionState::NoCredential
            }
        }
    }
}
