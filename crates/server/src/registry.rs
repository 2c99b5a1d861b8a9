//! Connected WebSocket sessions, keyed by their short client id.

use sheed_pipeline::JobLog;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};
use uuid::Uuid;

/// Length of the ids handed to clients
pub const CLIENT_ID_LEN: usize = 4;

type Clients = HashMap<String, UnboundedSender<String>>;

/// Shared map from client id to that session's outgoing message queue
#[derive(Debug, Clone, Default)]
pub struct Registry {
    clients: Arc<RwLock<Clients>>,
}

fn make_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(CLIENT_ID_LEN);
    id
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Clients> {
        self.clients.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Clients> {
        self.clients.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a session under a fresh id. Messages sent to that id arrive on
    /// the returned receiver.
    pub fn register(&self) -> (String, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let mut clients = self.write();
        let id = loop {
            let id = make_id();
            if !clients.contains_key(&id) {
                break id;
            }
        };
        clients.insert(id.clone(), tx);
        debug!(client_id = %id, connected = clients.len(), "client registered");
        (id, rx)
    }

    /// Drop a session. Its receiver sees the end of the stream.
    pub fn unregister(&self, id: &str) {
        let mut clients = self.write();
        if clients.remove(id).is_some() {
            debug!(client_id = %id, connected = clients.len(), "client unregistered");
        }
    }

    /// Queue `message` for `client_id`, or for every session when the id is
    /// empty. Messages for unknown ids are dropped.
    pub fn send(&self, client_id: &str, message: &str) {
        let clients = self.read();
        if client_id.is_empty() {
            for tx in clients.values() {
                let _ = tx.send(message.to_string());
            }
        } else if let Some(tx) = clients.get(client_id) {
            if tx.send(message.to_string()).is_err() {
                debug!(client_id, "session closed before message was delivered");
            }
        } else {
            warn!(client_id, "no connected client with this id, dropping message");
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Forwards a job's progress lines to its client as `log:<line>`
#[derive(Debug, Clone)]
pub struct SessionLog {
    registry: Registry,
    client_id: String,
}

impl SessionLog {
    pub fn new(registry: Registry, client_id: impl Into<String>) -> Self {
        Self { registry, client_id: client_id.into() }
    }
}

impl JobLog for SessionLog {
    fn log(&self, line: &str) {
        self.registry.send(&self.client_id, &format!("log:{line}"));
    }
}
