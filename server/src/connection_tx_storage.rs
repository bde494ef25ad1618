use std::collections::HashMap;
use system::{ConnectionId, PollEvent};
use tokio::sync::mpsc::UnboundedSender;

pub type ConnectionTx = UnboundedSender<PollEvent>;

pub struct ConnectionTxStorage {
    connection_txs: HashMap<ConnectionId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.connection_txs.insert(connection_id, tx);
    }

    /// Returns false when the connection is unknown or already gone.
    pub fn send(&self, to: &ConnectionId, event: PollEvent) -> bool {
        match self.connection_txs.get(to) {
            Some(tx) => tx.send(event).is_ok(),
            None => {
                log::warn!("Dropping {} for unknown connection {}", event.name(), to);
                false
            }
        }
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(connection_id)
    }
}
