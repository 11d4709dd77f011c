//! Session manager: credential resolution, liveness probe, token rotation
//!
//! Owns the one live session per credential. The lifecycle is strictly
//! ordered: resolve the credential, open the client, subscribe the rotation
//! stream, then probe — the rotation subscription comes before the probe so
//! a refresh triggered by the probe itself is never missed. Rotated tokens
//! are persisted before the ready signal is published; nothing may observe
//! a rotation whose token could still be lost.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use ring_client::{ClientError, RingClient};

use crate::error::{Result, SessionError};
use crate::signal::{SessionSignal, SessionState, SessionWatch};
use crate::store::CredentialStore;

/// How the manager turns a refresh token into a live client
///
/// The real implementation wraps the cloud transport; tests hand back a
/// scripted mock.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(&self, refresh_token: &str) -> ring_client::Result<Arc<dyn RingClient>>;
}

/// Result of [`SessionManager::initialize`]
#[derive(Clone)]
pub enum SessionOutcome {
    /// Session opened; await the session watch before attaching consumers
    Connected(Arc<dyn RingClient>),
    /// No usable credential; terminal until reconfigured
    NoCredential,
}

struct ActiveSession {
    client: Arc<dyn RingClient>,
    rotation_task: JoinHandle<()>,
}

/// Owner of the credential and the authenticated client
///
/// At most one live session per credential. Only this type mutates the
/// credential store.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    signal: SessionSignal,
    session: Option<ActiveSession>,
    generation: u64,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            signal: SessionSignal::new(),
            session: None,
            generation: 0,
        }
    }

    /// A watcher consumers use to attach after session-ready
    pub fn watch(&self) -> SessionWatch {
        self.signal.watch()
    }

    pub fn state(&self) -> SessionState {
        self.signal.current()
    }

    /// Resolve the credential and open the session
    ///
    /// A previously stored refresh token wins; otherwise the bootstrap token
    /// is seeded into the store; with neither, the manager lands in
    /// `NoCredential` and downstream components must not attempt access.
    /// A probe rejected as an auth failure clears the stored credential and
    /// also lands in `NoCredential`; a transient probe failure leaves the
    /// session up and lets the next rotation event publish readiness.
    pub async fn initialize(
        &mut self,
        factory: &dyn ClientFactory,
        bootstrap: Option<&str>,
    ) -> Result<SessionOutcome> {
        // at most one live session per credential
        self.shutdown().await;
        self.generation += 1;
        let generation = self.generation;
        self.signal.publish(SessionState::Pending);

        let token = match self.store.load() {
            Some(token) => token,
            None => match bootstrap.filter(|t| !t.is_empty()) {
                Some(bootstrap) => {
                    self.store.save(bootstrap);
                    bootstrap.to_string()
                }
                None => {
                    tracing::error!("no stored credential and no bootstrap token");
                    self.signal.publish(SessionState::NoCredential);
                    return Ok(SessionOutcome::NoCredential);
                }
            },
        };

        let client = match factory.connect(&token).await {
            Ok(client) => client,
            Err(ClientError::AuthRejected) => {
                tracing::error!("remote rejected the stored credential; clearing it");
                self.store.clear();
                self.signal.publish(SessionState::NoCredential);
                return Ok(SessionOutcome::NoCredential);
            }
            Err(e) => return Err(SessionError::Connect(e)),
        };

        // Rotation stream before the probe: the probe forces a refresh on a
        // stale token and that rotation must be observed.
        let rotation_task = self.spawn_rotation_listener(&client, generation);

        match client.profile().await {
            Ok(profile) => {
                tracing::debug!(account = %profile.account_id, "liveness probe succeeded");
                self.signal.publish_ready(generation);
            }
            Err(ClientError::AuthRejected) => {
                tracing::error!("liveness probe rejected; clearing stored credential");
                self.store.clear();
                self.signal.publish(SessionState::NoCredential);
                rotation_task.abort();
                client.disconnect().await;
                return Ok(SessionOutcome::NoCredential);
            }
            Err(e) => {
                tracing::warn!(error = %e, "liveness probe failed; waiting on rotation");
            }
        }

        self.session = Some(ActiveSession {
            client: Arc::clone(&client),
            rotation_task,
        });
        Ok(SessionOutcome::Connected(client))
    }

    fn spawn_rotation_listener(
        &self,
        client: &Arc<dyn RingClient>,
        generation: u64,
    ) -> JoinHandle<()> {
        let mut rotation_rx = client.token_updates();
        let store = Arc::clone(&self.store);
        let signal = self.signal.clone();

        tokio::spawn(async move {
            loop {
                match rotation_rx.recv().await {
                    Ok(update) => {
                        // Persist first: the old token is already superseded
                        // remotely, so the new one must hit storage before
                        // any other observable effect.
                        store.save(&update.new_refresh_token);
                        tracing::info!(generation, "refresh token rotated and persisted");
                        signal.publish_ready(generation);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "rotation stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Tear the session down: rotation stream first, then the client,
    /// in that order, regardless of session health
    pub async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            session.rotation_task.abort();
            session.client.disconnect().await;
            tracing::debug!("session shut down");
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.rotation_task.abort();
            tracing::debug!("session manager dropped with a live session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use parking_lot::Mutex;
    use ring_client::mock::MockRingClient;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Factory handing out one shared mock client, counting connects
    struct FixtureFactory {
        client: Arc<MockRingClient>,
        connects: AtomicUsize,
        tokens_seen: Mutex<Vec<String>>,
        reject_connect: Mutex<Option<ClientError>>,
    }

    impl FixtureFactory {
        fn new(client: Arc<MockRingClient>) -> Self {
            Self {
                client,
                connects: AtomicUsize::new(0),
                tokens_seen: Mutex::new(Vec::new()),
                reject_connect: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ClientFactory for FixtureFactory {
        async fn connect(&self, refresh_token: &str) -> ring_client::Result<Arc<dyn RingClient>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.tokens_seen.lock().push(refresh_token.to_string());
            if let Some(e) = self.reject_connect.lock().take() {
                return Err(e);
            }
            Ok(Arc::clone(&self.client) as Arc<dyn RingClient>)
        }
    }

    #[tokio::test]
    async fn test_no_token_no_bootstrap_is_terminal() {
        let store = Arc::new(MemoryStore::new());
        let factory = FixtureFactory::new(MockRingClient::new());
        let mut manager = SessionManager::new(store);

        let outcome = manager.initialize(&factory, None).await.unwrap();
        assert!(matches!(outcome, SessionOutcome::NoCredential));
        assert_eq!(manager.state(), SessionState::NoCredential);
        // never even tried to open a session
        assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_token_is_seeded_into_store() {
        let store = Arc::new(MemoryStore::new());
        let factory = FixtureFactory::new(MockRingClient::new());
        let mut manager = SessionManager::new(Arc::clone(&store) as Arc<dyn CredentialStore>);

        let outcome = manager.initialize(&factory, Some("boot-1")).await.unwrap();
        assert!(matches!(outcome, SessionOutcome::Connected(_)));
        assert_eq!(store.load(), Some("boot-1".to_string()));
        assert_eq!(factory.tokens_seen.lock().as_slice(), ["boot-1"]);
    }

    #[tokio::test]
    async fn test_stored_token_wins_over_bootstrap() {
        let store = Arc::new(MemoryStore::with_token("stored-1"));
        let factory = FixtureFactory::new(MockRingClient::new());
        let mut manager = SessionManager::new(Arc::clone(&store) as Arc<dyn CredentialStore>);

        manager.initialize(&factory, Some("boot-1")).await.unwrap();
        assert_eq!(factory.tokens_seen.lock().as_slice(), ["stored-1"]);
    }

    #[tokio::test]
    async fn test_successful_probe_publishes_ready() {
        let store = Arc::new(MemoryStore::with_token("tok"));
        let factory = FixtureFactory::new(MockRingClient::new());
        let mut manager = SessionManager::new(store);

        manager.initialize(&factory, None).await.unwrap();
        assert_eq!(manager.state(), SessionState::Ready { generation: 1 });

        let mut watch = manager.watch();
        assert!(watch.wait_attached().await.is_ready());
    }

    #[tokio::test]
    async fn test_rejected_probe_clears_credential() {
        let store = Arc::new(MemoryStore::with_token("stale"));
        let client = MockRingClient::new();
        client.fail_next_profile(ClientError::AuthRejected);
        let factory = FixtureFactory::new(Arc::clone(&client));
        let mut manager = SessionManager::new(Arc::clone(&store) as Arc<dyn CredentialStore>);

        let outcome = manager.initialize(&factory, None).await.unwrap();
        assert!(matches!(outcome, SessionOutcome::NoCredential));
        assert_eq!(store.load(), None);
        assert_eq!(manager.state(), SessionState::NoCredential);
        assert!(client.is_disconnected());
    }

    #[tokio::test]
    async fn test_rotation_persists_before_ready_is_observable() {
        let store = Arc::new(MemoryStore::with_token("tok-1"));
        let client = MockRingClient::new();
        // probe fails transiently, so readiness can only come from rotation
        client.fail_next_profile(ClientError::Transient("offline".into()));
        let factory = FixtureFactory::new(Arc::clone(&client));
        let mut manager = SessionManager::new(Arc::clone(&store) as Arc<dyn CredentialStore>);

        manager.initialize(&factory, None).await.unwrap();
        assert_eq!(manager.state(), SessionState::Pending);

        let mut watch = manager.watch();
        assert_eq!(client.push_token_update("tok-2"), 1);
        assert!(watch.wait_attached().await.is_ready());

        // readiness was observed, so the rotated token is already persisted
        assert_eq!(store.load(), Some("tok-2".to_string()));
    }

    #[tokio::test]
    async fn test_later_rotation_keeps_ready_and_persists() {
        let store = Arc::new(MemoryStore::with_token("tok-1"));
        let client = MockRingClient::new();
        let factory = FixtureFactory::new(Arc::clone(&client));
        let mut manager = SessionManager::new(Arc::clone(&store) as Arc<dyn CredentialStore>);

        manager.initialize(&factory, None).await.unwrap();
        let mut watch = manager.watch();
        assert!(watch.wait_attached().await.is_ready());

        client.push_token_update("tok-2");
        // the latch must not refire for already-attached consumers
        tokio::task::yield_now().await;
        assert_eq!(manager.state(), SessionState::Ready { generation: 1 });

        // but the token is persisted regardless
        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(1);
        while store.load().as_deref() != Some("tok-2") {
            assert!(tokio::time::Instant::now() < deadline, "rotation not persisted");
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_shutdown_detaches_rotation_then_disconnects() {
        let store = Arc::new(MemoryStore::with_token("tok"));
        let client = MockRingClient::new();
        let factory = FixtureFactory::new(Arc::clone(&client));
        let mut manager = SessionManager::new(store);

        manager.initialize(&factory, None).await.unwrap();
        manager.shutdown().await;

        assert!(client.is_disconnected());
        // rotation listener is gone: the push reaches no receiver
        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(1);
        while client.push_token_update("tok-x") != 0 {
            assert!(tokio::time::Instant::now() < deadline, "rotation listener leaked");
            tokio::task::yield_now().await;
        }
    }
}
