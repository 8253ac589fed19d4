use crate::channel::ChannelHandler;
use crate::session::session::SessionConfig;
use crate::session::session_handle::SessionHandle;
use crate::signaling::SignalingOutput;
use crate::transport::TransportFactory;
use dashmap::DashMap;
use std::sync::Arc;
use teleop_core::RoomId;
use tokio::sync::Mutex;
use tracing::info;

/// Keeps at most one live session per robot identity.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<RoomId, SessionHandle>>,
    start_lock: Arc<Mutex<()>>,
    factory: Arc<dyn TransportFactory>,
}

impl SessionRegistry {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            start_lock: Arc::new(Mutex::new(())),
            factory,
        }
    }

    /// Starts a session for `config.identity`, stopping the one it replaces
    /// first.
    pub async fn start_session(
        &self,
        config: SessionConfig,
        signaling: Arc<dyn SignalingOutput>,
        handler: Arc<dyn ChannelHandler>,
    ) -> SessionHandle {
        let _guard = self.start_lock.lock().await;
        let identity = config.identity.clone();

        if let Some((_, previous)) = self.sessions.remove(&identity) {
            info!(
                "Superseding session {} for {}",
                previous.id(),
                identity
            );
            previous.stop().await;
        }

        let (handle, actor) = SessionHandle::build(
            config,
            self.factory.clone(),
            signaling,
            handler,
            Some(self.sessions.clone()),
        );
        self.sessions.insert(identity.clone(), handle.clone());
        handle.start(actor);

        info!("Started session {} for {}", handle.id(), identity);
        handle
    }

    pub fn get(&self, identity: &RoomId) -> Option<SessionHandle> {
        self.sessions.get(identity).map(|entry| entry.value().clone())
    }

    pub async fn stop_session(&self, identity: &RoomId) {
        let _guard = self.start_lock.lock().await;

        let Some((_, handle)) = self.sessions.remove(identity) else {
            return;
        };
        handle.stop().await;
    }

    pub async fn stop_all(&self) {
        let _guard = self.start_lock.lock().await;

        let identities: Vec<RoomId> = self
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for identity in identities {
            if let Some((_, handle)) = self.sessions.remove(&identity) {
                handle.stop().await;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
