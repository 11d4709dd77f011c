//! Subscription registry: the change-stream multiplexer
//!
//! Tracks every (consumer, source) subscription behind an arena of explicit
//! handles. The first subscriber for a source attaches the upstream stream
//! (one pump task per source); the last unsubscribe detaches it. Remote
//! streams are long-lived, so the leak-prevention invariant is the whole
//! point: every subscribe must be matched by exactly one unsubscribe
//! reachable from the consumer's teardown path, and both attach and
//! unsubscribe are idempotent.
//!
//! Delivery preserves the remote emission order per source. There is no
//! cross-source ordering and no coalescing here; drop rules are listener
//! policy, not registry policy.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use ring_client::{CameraId, DeviceUpdate, LocationId, MotionEvent};

use crate::directory::SourceDirectory;
use crate::error::{RegistryError, RegistryResult};

/// Identity of a subscribing component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsumerId(String);

impl ConsumerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConsumerId {
    fn from(s: &str) -> Self {
        ConsumerId::new(s)
    }
}

/// Arena handle for one live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A subscribable remote change stream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamSource {
    /// A location's device change stream
    DeviceUpdates(LocationId),
    /// A camera's motion stream
    CameraMotion(CameraId),
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSource::DeviceUpdates(id) => write!(f, "devices:{}", id),
            StreamSource::CameraMotion(id) => write!(f, "motion:{}", id),
        }
    }
}

/// Proof of one subscribe call; pass back to [`SubscriptionRegistry::unsubscribe`]
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    pub consumer: ConsumerId,
    pub source: StreamSource,
}

/// A change delivered to a subscriber
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Device {
        location: LocationId,
        update: DeviceUpdate,
    },
    Motion {
        location: LocationId,
        camera: CameraId,
        motion: MotionEvent,
    },
}

struct SubscriberEntry {
    consumer: ConsumerId,
    source: StreamSource,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

struct Pump {
    task: JoinHandle<()>,
    subscribers: usize,
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<SubscriptionId, SubscriberEntry>,
    by_pair: HashMap<(ConsumerId, StreamSource), SubscriptionId>,
    pumps: HashMap<StreamSource, Pump>,
    shut_down: bool,
}

struct Inner {
    directory: Arc<SourceDirectory>,
    next_id: AtomicU64,
    tables: Mutex<Tables>,
}

impl Inner {
    fn deliver(&self, source: &StreamSource, event: ChangeEvent) {
        let tables = self.tables.lock();
        for entry in tables.by_id.values().filter(|e| &e.source == source) {
            if entry.tx.send(event.clone()).is_err() {
                tracing::debug!(
                    consumer = %entry.consumer,
                    %source,
                    "subscriber receiver dropped; event discarded"
                );
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let mut tables = self.tables.lock();
        for (_, pump) in tables.pumps.drain() {
            pump.task.abort();
        }
    }
}

/// The change-stream multiplexer; cheap to clone and share
#[derive(Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<Inner>,
}

impl SubscriptionRegistry {
    pub fn new(directory: Arc<SourceDirectory>) -> Self {
        Self {
            inner: Arc::new(Inner {
                directory,
                next_id: AtomicU64::new(1),
                tables: Mutex::new(Tables::default()),
            }),
        }
    }

    /// Attach a consumer to a source
    ///
    /// Idempotent per (consumer, source): attaching while already attached
    /// supersedes the previous delivery channel under the same handle, so
    /// the net subscription count for the pair never exceeds one. The first
    /// subscriber for a source attaches the upstream stream.
    pub fn subscribe(
        &self,
        consumer: ConsumerId,
        source: StreamSource,
    ) -> RegistryResult<(SubscriptionHandle, mpsc::UnboundedReceiver<ChangeEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tables = self.inner.tables.lock();
        if tables.shut_down {
            return Err(RegistryError::ShutDown);
        }

        let pair = (consumer.clone(), source.clone());
        if let Some(&existing) = tables.by_pair.get(&pair) {
            tracing::debug!(
                id = %existing,
                consumer = %consumer,
                %source,
                "re-attach supersedes the previous subscription"
            );
            if let Some(entry) = tables.by_id.get_mut(&existing) {
                entry.tx = tx;
            }
            return Ok((
                SubscriptionHandle {
                    id: existing,
                    consumer,
                    source,
                },
                rx,
            ));
        }

        let pump = match tables.pumps.entry(source.clone()) {
            MapEntry::Occupied(occupied) => occupied.into_mut(),
            MapEntry::Vacant(vacant) => {
                let task = spawn_pump(&self.inner, &source)?;
                tracing::debug!(%source, "first subscriber; upstream stream attached");
                vacant.insert(Pump {
                    task,
                    subscribers: 0,
                })
            }
        };
        pump.subscribers += 1;

        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        tables.by_id.insert(
            id,
            SubscriberEntry {
                consumer: consumer.clone(),
                source: source.clone(),
                tx,
            },
        );
        tables.by_pair.insert(pair, id);

        Ok((
            SubscriptionHandle {
                id,
                consumer,
                source,
            },
            rx,
        ))
    }

    /// Release a subscription
    ///
    /// Idempotent: releasing an already-released handle is a logged no-op.
    /// The last release for a source detaches the upstream stream.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let mut tables = self.inner.tables.lock();

        let Some(entry) = tables.by_id.remove(&handle.id) else {
            tracing::warn!(id = %handle.id, "unsubscribe on a released handle; no-op");
            return;
        };
        tables.by_pair.remove(&(entry.consumer, entry.source));

        let detach = match tables.pumps.get_mut(&handle.source) {
            Some(pump) => {
                pump.subscribers = pump.subscribers.saturating_sub(1);
                pump.subscribers == 0
            }
            None => false,
        };
        if detach {
            if let Some(pump) = tables.pumps.remove(&handle.source) {
                pump.task.abort();
                tracing::debug!(
                    source = %handle.source,
                    "last subscriber released; upstream stream detached"
                );
            }
        }
    }

    /// Live subscription count for a (consumer, source) pair — 0 or 1
    pub fn subscriber_count(&self, consumer: &ConsumerId, source: &StreamSource) -> usize {
        let tables = self.inner.tables.lock();
        usize::from(
            tables
                .by_pair
                .contains_key(&(consumer.clone(), source.clone())),
        )
    }

    /// Total live subscriptions
    pub fn count(&self) -> usize {
        self.inner.tables.lock().by_id.len()
    }

    /// Whether any subscriber holds the given source
    pub fn is_attached(&self, source: &StreamSource) -> bool {
        self.inner.tables.lock().pumps.contains_key(source)
    }

    /// Detach everything; further subscribes are rejected
    pub fn shutdown(&self) {
        let mut tables = self.inner.tables.lock();
        tables.shut_down = true;
        for (source, pump) in tables.pumps.drain() {
            pump.task.abort();
            tracing::debug!(%source, "stream detached at registry shutdown");
        }
        tables.by_id.clear();
        tables.by_pair.clear();
    }
}

fn spawn_pump(inner: &Arc<Inner>, source: &StreamSource) -> RegistryResult<JoinHandle<()>> {
    match source {
        StreamSource::DeviceUpdates(location_id) => {
            let location = inner
                .directory
                .location(location_id)
                .ok_or_else(|| RegistryError::UnknownLocation(location_id.clone()))?;
            // Receiver is created here, synchronously, so the upstream
            // attach is observable as soon as subscribe returns.
            let rx = location.device_updates();
            Ok(tokio::spawn(pump_device_stream(
                Arc::downgrade(inner),
                location_id.clone(),
                rx,
            )))
        }
        StreamSource::CameraMotion(camera_id) => {
            let camera = inner
                .directory
                .camera(camera_id)
                .ok_or_else(|| RegistryError::UnknownCamera(camera_id.clone()))?;
            let location_id = camera.location_id().clone();
            let rx = camera.motion_events();
            Ok(tokio::spawn(pump_motion_stream(
                Arc::downgrade(inner),
                location_id,
                camera_id.clone(),
                rx,
            )))
        }
    }
}

async fn pump_device_stream(
    inner: Weak<Inner>,
    location: LocationId,
    mut rx: broadcast::Receiver<DeviceUpdate>,
) {
    let source = StreamSource::DeviceUpdates(location.clone());
    loop {
        match rx.recv().await {
            Ok(update) => {
                let Some(inner) = inner.upgrade() else { break };
                inner.deliver(
                    &source,
                    ChangeEvent::Device {
                        location: location.clone(),
                        update,
                    },
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, %location, "device update stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn pump_motion_stream(
    inner: Weak<Inner>,
    location: LocationId,
    camera: CameraId,
    mut rx: broadcast::Receiver<MotionEvent>,
) {
    let source = StreamSource::CameraMotion(camera.clone());
    loop {
        match rx.recv().await {
            Ok(motion) => {
                let Some(inner) = inner.upgrade() else { break };
                inner.deliver(
                    &source,
                    ChangeEvent::Motion {
                        location: location.clone(),
                        camera: camera.clone(),
                        motion,
                    },
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, %camera, "motion stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring_client::mock::{MockLocation, MockRingClient};
    use ring_client::DeviceType;

    async fn fixture() -> (Arc<MockLocation>, SubscriptionRegistry) {
        let client = MockRingClient::new();
        let location = MockLocation::new("loc-1", "Home");
        client.add_location(Arc::clone(&location));
        let directory = Arc::new(SourceDirectory::snapshot(client.as_ref()).await.unwrap());
        (location, SubscriptionRegistry::new(directory))
    }

    fn device_source() -> StreamSource {
        StreamSource::DeviceUpdates(LocationId::new("loc-1"))
    }

    async fn wait_for_detach(location: &MockLocation) {
        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(1);
        while location.update_receiver_count() != 0 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "upstream receiver leaked"
            );
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_subscribe_attaches_upstream_once() {
        let (location, registry) = fixture().await;
        assert_eq!(location.update_receiver_count(), 0);

        let (a, _rx_a) = registry
            .subscribe(ConsumerId::new("panel-mode"), device_source())
            .unwrap();
        assert_eq!(location.update_receiver_count(), 1);

        let (b, _rx_b) = registry
            .subscribe(ConsumerId::new("device-fault"), device_source())
            .unwrap();
        // second consumer shares the one upstream attach
        assert_eq!(location.update_receiver_count(), 1);
        assert_eq!(registry.count(), 2);

        registry.unsubscribe(&a);
        assert!(registry.is_attached(&device_source()));

        registry.unsubscribe(&b);
        wait_for_detach(&location).await;
        assert!(!registry.is_attached(&device_source()));
    }

    #[tokio::test]
    async fn test_pair_count_never_exceeds_one_and_never_goes_negative() {
        let (_location, registry) = fixture().await;
        let consumer = ConsumerId::new("panel-mode");

        assert_eq!(registry.subscriber_count(&consumer, &device_source()), 0);

        let (first, _rx1) = registry
            .subscribe(consumer.clone(), device_source())
            .unwrap();
        assert_eq!(registry.subscriber_count(&consumer, &device_source()), 1);

        // idempotent attach: same pair, same handle id, still one
        let (second, _rx2) = registry
            .subscribe(consumer.clone(), device_source())
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(registry.subscriber_count(&consumer, &device_source()), 1);
        assert_eq!(registry.count(), 1);

        registry.unsubscribe(&second);
        assert_eq!(registry.subscriber_count(&consumer, &device_source()), 0);

        // idempotent release: repeated unsubscribes are no-ops
        registry.unsubscribe(&second);
        registry.unsubscribe(&first);
        assert_eq!(registry.subscriber_count(&consumer, &device_source()), 0);
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_supersede_closes_previous_receiver() {
        let (location, registry) = fixture().await;
        let consumer = ConsumerId::new("panel-mode");

        let (_first, mut old_rx) = registry
            .subscribe(consumer.clone(), device_source())
            .unwrap();
        let (_second, mut new_rx) = registry
            .subscribe(consumer.clone(), device_source())
            .unwrap();

        // the superseded channel is closed, the new one is live
        assert!(old_rx.recv().await.is_none());
        location.push_device_update(DeviceUpdate::new("z1", DeviceType::SecurityPanel));
        assert!(matches!(
            new_rx.recv().await,
            Some(ChangeEvent::Device { .. })
        ));
    }

    #[tokio::test]
    async fn test_per_source_delivery_preserves_emission_order() {
        let (location, registry) = fixture().await;
        let (_handle, mut rx) = registry
            .subscribe(ConsumerId::new("device-fault"), device_source())
            .unwrap();

        for zid in ["z1", "z2", "z3"] {
            location.push_device_update(DeviceUpdate::new(zid, DeviceType::ContactSensor));
        }

        for expected in ["z1", "z2", "z3"] {
            match rx.recv().await {
                Some(ChangeEvent::Device { update, .. }) => {
                    assert_eq!(update.zid.as_str(), expected);
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_fan_out_reaches_every_subscriber() {
        let (location, registry) = fixture().await;
        let (_a, mut rx_a) = registry
            .subscribe(ConsumerId::new("panel-mode"), device_source())
            .unwrap();
        let (_b, mut rx_b) = registry
            .subscribe(ConsumerId::new("alarm-controller"), device_source())
            .unwrap();

        location.push_device_update(DeviceUpdate::new("z1", DeviceType::SecurityPanel));

        assert!(matches!(rx_a.recv().await, Some(ChangeEvent::Device { .. })));
        assert!(matches!(rx_b.recv().await, Some(ChangeEvent::Device { .. })));
    }

    #[tokio::test]
    async fn test_unknown_source_is_rejected() {
        let (_location, registry) = fixture().await;
        let result = registry.subscribe(
            ConsumerId::new("panel-mode"),
            StreamSource::DeviceUpdates(LocationId::new("loc-missing")),
        );
        assert!(matches!(result, Err(RegistryError::UnknownLocation(_))));
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_detaches_and_rejects_new_subscriptions() {
        let (location, registry) = fixture().await;
        let (_handle, _rx) = registry
            .subscribe(ConsumerId::new("panel-mode"), device_source())
            .unwrap();

        registry.shutdown();
        wait_for_detach(&location).await;
        assert_eq!(registry.count(), 0);

        let result = registry.subscribe(ConsumerId::new("panel-mode"), device_source());
        assert!(matches!(result, Err(RegistryError::ShutDown)));
    }
}
