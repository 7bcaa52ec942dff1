use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

use hearth_sync::EventSink;
use hearth_types::events::ChatEvent;

/// Owns one private delivery queue per connected user.
///
/// This is the live pub/sub transport: hearth-sync publishes to a user id and
/// the event lands only on that user's socket. There is no shared broadcast
/// topic for anyone to filter — a user who is not a resolved destination
/// never sees the event at any layer.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// user_id -> (conn_id, sender). The newest connection owns the slot.
    sessions: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<ChatEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a connection for `user_id`, displacing any previous one.
    /// Returns the connection id and the private event queue.
    pub fn register(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<ChatEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .sessions
            .write()
            .expect("session lock poisoned")
            .insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister, but only if `conn_id` still owns the slot — a newer
    /// connection for the same user must not be torn down by the old one's
    /// cleanup.
    pub fn unregister(&self, user_id: Uuid, conn_id: Uuid) {
        let mut sessions = self.inner.sessions.write().expect("session lock poisoned");
        if let Some((owner, _)) = sessions.get(&user_id) {
            if *owner == conn_id {
                sessions.remove(&user_id);
            }
        }
    }

    pub fn is_connected(&self, user_id: Uuid) -> bool {
        self.inner
            .sessions
            .read()
            .expect("session lock poisoned")
            .contains_key(&user_id)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for Dispatcher {
    fn deliver(&self, destination: Uuid, event: ChatEvent) -> anyhow::Result<()> {
        let sessions = self
            .inner
            .sessions
            .read()
            .map_err(|_| anyhow!("session lock poisoned"))?;
        match sessions.get(&destination) {
            // Offline is not a failure: the user's next reload catches up.
            None => {
                trace!("dropping event for offline user {destination}");
                Ok(())
            }
            Some((_, tx)) => tx
                .send(event)
                .map_err(|_| anyhow!("connection queue closed for {destination}")),
        }
    }
}
