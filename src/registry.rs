//! Registry of live screen connections.
//!
//! One entry per screen name, holding the outbound channel for that
//! screen's session plus its heartbeat task. Constructed once in `main`
//! and shared through `AppState`; every mutation goes through the inner
//! `RwLock`, and broadcast iterates a snapshot so sends never hold it.

use crate::websocket::ServerMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Identifies one registration. A reconnect under the same screen name gets
/// a fresh id, so a superseded session's cleanup can tell it no longer owns
/// the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionId(u64);

struct Entry {
    id: ConnectionId,
    sender: UnboundedSender<ServerMessage>,
    heartbeat: JoinHandle<()>,
}

impl Drop for Entry {
    fn drop(&mut self) {
        self.heartbeat.abort();
    }
}

#[derive(Clone)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<String, Entry>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Registers a screen's outbound channel, replacing any prior entry for
    /// the same name. The replaced sender is dropped, which ends the old
    /// session's forward task and closes the superseded socket. A heartbeat
    /// task is started for the new entry.
    pub async fn register(
        &self,
        screen_name: &str,
        sender: UnboundedSender<ServerMessage>,
    ) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let heartbeat = tokio::spawn(run_heartbeat(self.clone(), screen_name.to_string(), id));

        let previous = {
            let mut connections = self.connections.write().await;
            connections.insert(
                screen_name.to_string(),
                Entry {
                    id,
                    sender,
                    heartbeat,
                },
            )
        };

        if previous.is_some() {
            tracing::info!("Screen {} reconnected, replacing previous connection", screen_name);
        }

        let total = self.connections.read().await.len();
        tracing::info!("Screen {} connected. Total connections: {}", screen_name, total);

        id
    }

    /// Removes the entry for `screen_name` if it still belongs to `id` and
    /// cancels its heartbeat. Returns whether the entry was removed; false
    /// means it was already gone or a newer connection took over.
    pub async fn unregister(&self, screen_name: &str, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(screen_name) {
            Some(entry) if entry.id == id => {
                connections.remove(screen_name);
                tracing::info!(
                    "Screen {} disconnected. Total connections: {}",
                    screen_name,
                    connections.len()
                );
                true
            }
            _ => false,
        }
    }

    /// Best-effort send to one screen. A failed channel write means the
    /// session's forward task is gone; the entry is removed and the error
    /// swallowed - callers observe the screen as no longer registered.
    pub async fn send(&self, screen_name: &str, message: ServerMessage) {
        let target = {
            let connections = self.connections.read().await;
            connections
                .get(screen_name)
                .map(|e| (e.id, e.sender.clone()))
        };

        if let Some((id, sender)) = target {
            if sender.send(message).is_err() {
                tracing::warn!("Send to screen {} failed, dropping connection", screen_name);
                self.unregister(screen_name, id).await;
            }
        }
    }

    /// Sends to every registered screen. Returns the number of entries that
    /// were registered when the broadcast started, not the number of
    /// successful deliveries; failed entries are pruned per `send`.
    pub async fn broadcast(&self, message: ServerMessage) -> usize {
        let snapshot: Vec<(String, ConnectionId, UnboundedSender<ServerMessage>)> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .map(|(name, e)| (name.clone(), e.id, e.sender.clone()))
                .collect()
        };

        let count = snapshot.len();

        for (name, id, sender) in snapshot {
            if sender.send(message.clone()).is_err() {
                tracing::warn!("Broadcast to screen {} failed, dropping connection", name);
                self.unregister(&name, id).await;
            }
        }

        count
    }

    pub async fn is_registered(&self, screen_name: &str) -> bool {
        self.connections.read().await.contains_key(screen_name)
    }

    pub async fn connected_screens(&self) -> Vec<String> {
        self.connections.read().await.keys().cloned().collect()
    }

    async fn is_current(&self, screen_name: &str, id: ConnectionId) -> bool {
        self.connections
            .read()
            .await
            .get(screen_name)
            .map(|e| e.id == id)
            .unwrap_or(false)
    }
}

/// Per-connection liveness task: pings every 30 seconds while its entry is
/// still the current one. A failed ping unregisters the entry through
/// `send`, so the loop condition ends the task naturally.
async fn run_heartbeat(registry: ConnectionRegistry, screen_name: String, id: ConnectionId) {
    loop {
        tokio::time::sleep(HEARTBEAT_INTERVAL).await;
        if !registry.is_current(&screen_name, id).await {
            break;
        }
        registry.send(&screen_name, ServerMessage::Ping).await;
    }
}
