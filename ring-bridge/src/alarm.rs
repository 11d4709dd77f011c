//! Alarm mode controller
//!
//! One controller per configured location, driving arm/disarm commands
//! against an eventually-consistent remote. The state machine runs as a
//! single actor task: every transition is a reaction to a panel update or
//! an inbound command intent, so reads and commands never race each other.
//!
//! Retry policy: one primary call, then one legacy fallback, then give up.
//! The caller always gets exactly one completion per intent, whatever
//! happened remotely. Bypass sets are computed immediately before the
//! command — faulted devices change independently, so a cached set would
//! lie.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use ring_client::{AlarmMode, DeviceType, LocationHandle, LocationId, Zid};

use crate::config::AlarmControllerConfig;
use crate::directory::SourceDirectory;
use crate::error::Result;
use crate::registry::{
    ChangeEvent, ConsumerId, StreamSource, SubscriptionHandle, SubscriptionRegistry,
};
use crate::status::{Presentation, Status, StatusFill, StatusReporter};

/// Controller state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No target; not yet attached or location unresolved
    Idle,
    /// Mode read in flight
    Reading,
    /// Remote mode known
    Reconciled(AlarmMode),
    /// Command in flight toward the target mode
    Commanding(AlarmMode),
    /// Both read or both command paths failed; recovers on the next
    /// panel update
    Error,
}

/// Exactly-once completion signal for a command intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The primary command applied
    Primary,
    /// The primary was rejected; the legacy fallback applied
    Fallback,
    /// Both attempts failed, or the controller is not operational
    Failed,
    /// Unrecognized intent; no remote call was made
    Invalid,
}

type CommandRequest = (String, oneshot::Sender<CommandOutcome>);

/// Handle to a running controller
pub struct AlarmController {
    commands: mpsc::UnboundedSender<CommandRequest>,
    status_rx: watch::Receiver<Status>,
    state_rx: watch::Receiver<ControllerState>,
    subscription: Option<SubscriptionHandle>,
    registry: SubscriptionRegistry,
    task: Option<JoinHandle<()>>,
}

impl AlarmController {
    /// Resolve the configured location and start the controller
    ///
    /// An unknown location id is not an error here: the node reports
    /// "location not found", logs the valid choices, and stays inert until
    /// reconfigured — commands complete immediately as `Failed`.
    pub fn spawn(
        registry: &SubscriptionRegistry,
        directory: &SourceDirectory,
        config: AlarmControllerConfig,
    ) -> Result<Self> {
        let (status, status_rx) = StatusReporter::new(Status::from(Presentation::Pending));
        let (state_tx, state_rx) = watch::channel(ControllerState::Idle);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let location_id = LocationId::new(config.location_id.clone());
        let Some(location) = directory.location(&location_id) else {
            status.publish(Status::new(StatusFill::Red, "location not found"));
            tracing::error!(
                configured = %location_id,
                "select one location to filter: {}",
                directory.location_choices()
            );
            // commands_rx drops here; every apply() resolves Failed without
            // a remote call
            return Ok(Self {
                commands: commands_tx,
                status_rx,
                state_rx,
                subscription: None,
                registry: registry.clone(),
                task: None,
            });
        };

        let (handle, updates_rx) = registry.subscribe(
            ConsumerId::new("alarm-controller"),
            StreamSource::DeviceUpdates(location_id),
        )?;

        let actor = ControllerActor {
            location,
            bypass: config.bypass,
            state: state_tx,
            status,
            updates: updates_rx,
            commands: commands_rx,
        };
        let task = tokio::spawn(actor.run());

        Ok(Self {
            commands: commands_tx,
            status_rx,
            state_rx,
            subscription: Some(handle),
            registry: registry.clone(),
            task: Some(task),
        })
    }

    /// Watch this node's status surface
    pub fn status(&self) -> watch::Receiver<Status> {
        self.status_rx.clone()
    }

    /// Watch the state machine
    pub fn state_watch(&self) -> watch::Receiver<ControllerState> {
        self.state_rx.clone()
    }

    pub fn state(&self) -> ControllerState {
        *self.state_rx.borrow()
    }

    /// Apply a command intent: one of `home`, `arm`, `disarm`
    /// (case-sensitive)
    ///
    /// Resolves exactly once per call, whether the primary applied, the
    /// fallback applied, both failed, or the intent was invalid.
    pub async fn apply(&self, intent: &str) -> CommandOutcome {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .commands
            .send((intent.to_string(), done_tx))
            .is_err()
        {
            tracing::warn!(intent, "command ignored; controller is not operational");
            return CommandOutcome::Failed;
        }
        // a dropped completion means the controller was torn down with the
        // command in flight; the response is discarded, not crashed on
        done_rx.await.unwrap_or(CommandOutcome::Failed)
    }

    /// Release the subscription and stop the actor
    ///
    /// Any in-flight command is abandoned; teardown never blocks on its
    /// completion.
    pub fn shutdown(mut self) {
        if let Some(handle) = self.subscription.take() {
            self.registry.unsubscribe(&handle);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::debug!("alarm controller shut down");
    }
}

struct ControllerActor {
    location: Arc<dyn LocationHandle>,
    bypass: bool,
    state: watch::Sender<ControllerState>,
    status: StatusReporter,
    updates: mpsc::UnboundedReceiver<ChangeEvent>,
    commands: mpsc::UnboundedReceiver<CommandRequest>,
}

impl ControllerActor {
    async fn run(mut self) {
        self.reconcile().await;
        loop {
            tokio::select! {
                event = self.updates.recv() => match event {
                    Some(ChangeEvent::Device { update, .. })
                        if update.device_type == DeviceType::SecurityPanel =>
                    {
                        self.reconcile().await;
                    }
                    Some(_) => {}
                    None => break,
                },
                request = self.commands.recv() => match request {
                    Some((intent, done)) => {
                        let outcome = self.handle_intent(&intent).await;
                        if done.send(outcome).is_err() {
                            tracing::debug!("completion discarded; caller went away");
                        }
                    }
                    None => break,
                },
            }
        }
    }

    fn set_state(&self, state: ControllerState) {
        let _ = self.state.send(state);
    }

    /// Read-and-map: primary read, legacy fallback read, then publish the
    /// reconciled mode status
    async fn reconcile(&mut self) {
        self.set_state(ControllerState::Reading);

        let raw = match self.location.alarm_mode().await {
            Ok(raw) => raw,
            Err(primary) => {
                tracing::warn!(error = %primary, "primary mode read failed; trying legacy read");
                match self.location.location_mode().await {
                    Ok(raw) => raw,
                    Err(fallback) => {
                        tracing::error!(error = %fallback, "legacy mode read failed");
                        self.set_state(ControllerState::Error);
                        self.status
                            .publish_presentation(Presentation::Error(fallback.to_string()));
                        return;
                    }
                }
            }
        };

        let mode = AlarmMode::from(raw);
        self.set_state(ControllerState::Reconciled(mode));
        self.status
            .publish(Status::for_mode(&self.location.name(), mode));
    }

    async fn handle_intent(&mut self, intent: &str) -> CommandOutcome {
        let target = match intent {
            "home" => AlarmMode::Home,
            "arm" => AlarmMode::Arm,
            "disarm" => AlarmMode::Disarm,
            other => {
                tracing::error!(intent = other, "invalid mode");
                return CommandOutcome::Invalid;
            }
        };

        self.set_state(ControllerState::Commanding(target));

        // computed fresh per command, never cached
        let bypass = if self.bypass {
            match self.faulted_zids().await {
                Ok(zids) => zids,
                Err(e) => {
                    tracing::error!(error = %e, "bypass computation failed; command aborted");
                    self.set_state(ControllerState::Error);
                    self.status
                        .publish_presentation(Presentation::Error(e.to_string()));
                    return CommandOutcome::Failed;
                }
            }
        } else {
            Vec::new()
        };

        let primary = match target {
            AlarmMode::Home => self.location.arm_home(&bypass).await,
            AlarmMode::Arm => self.location.arm_away(&bypass).await,
            AlarmMode::Disarm => self.location.disarm().await,
        };

        match primary {
            Ok(()) => {
                self.settle(target);
                CommandOutcome::Primary
            }
            Err(primary_err) => {
                tracing::warn!(
                    error = %primary_err,
                    target = %target,
                    "primary command rejected; trying legacy mode set"
                );
                match self
                    .location
                    .set_location_mode(target.as_location_mode())
                    .await
                {
                    Ok(()) => {
                        self.settle(target);
                        CommandOutcome::Fallback
                    }
                    Err(fallback_err) => {
                        tracing::error!(
                            error = %fallback_err,
                            target = %target,
                            "fallback command failed"
                        );
                        self.set_state(ControllerState::Error);
                        self.status
                            .publish_presentation(Presentation::Error(fallback_err.to_string()));
                        CommandOutcome::Failed
                    }
                }
            }
        }
    }

    fn settle(&self, mode: AlarmMode) {
        self.set_state(ControllerState::Reconciled(mode));
        self.status
            .publish(Status::for_mode(&self.location.name(), mode));
    }

    /// Zids whose fault flag is set right now
    async fn faulted_zids(&self) -> ring_client::Result<Vec<Zid>> {
        let devices = self.location.devices().await?;
        Ok(devices
            .into_iter()
            .filter(|d| d.data.faulted == Some(true))
            .map(|d| d.zid)
            .collect())
    }
}
