//! Connected client registry
//!
//! Tracks the open clients the worker can broadcast events to, and which of
//! them this worker version currently controls.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::channel::Event;

/// Identifier for a connected client
pub type ClientId = Uuid;

struct ConnectedClient {
    sender: mpsc::UnboundedSender<Event>,
    controlled: bool,
}

/// Registry of connected clients
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, ConnectedClient>>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client; returns its id and the event receiver
    ///
    /// Newly connected clients are uncontrolled until the worker activates
    /// and claims them.
    pub async fn connect(&self) -> (ClientId, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        self.clients.write().await.insert(
            id,
            ConnectedClient {
                sender,
                controlled: false,
            },
        );

        (id, receiver)
    }

    /// Remove a client
    pub async fn disconnect(&self, id: ClientId) {
        self.clients.write().await.remove(&id);
    }

    /// Send an event to every connected client
    ///
    /// Clients whose receiver is gone are dropped from the registry.
    pub async fn broadcast(&self, event: Event) {
        let mut clients = self.clients.write().await;
        clients.retain(|_, client| client.sender.send(event.clone()).is_ok());
    }

    /// Take control of all connected clients; returns how many were claimed
    pub async fn claim(&self) -> usize {
        let mut clients = self.clients.write().await;
        for client in clients.values_mut() {
            client.controlled = true;
        }
        clients.len()
    }

    /// Number of connected clients
    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Number of clients controlled by this worker version
    pub async fn controlled_count(&self) -> usize {
        self.clients
            .read()
            .await
            .values()
            .filter(|c| c.controlled)
            .count()
    }
}
