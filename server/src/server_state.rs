use std::collections::HashMap;
use system::{ConnectionId, PollCode};

/// Broadcast groups: which live connections listen to which poll.
pub struct ServerState {
    pub connection_locations: HashMap<ConnectionId, PollCode>,
    pub groups: HashMap<PollCode, Vec<ConnectionId>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            connection_locations: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// A connection listens to one poll at a time; subscribing again moves it.
    pub fn subscribe(&mut self, connection_id: &ConnectionId, poll_code: &PollCode) {
        if self.connection_locations.get(connection_id) == Some(poll_code) {
            return;
        }
        self.unsubscribe(connection_id);
        self.groups
            .entry(poll_code.clone())
            .or_default()
            .push(*connection_id);
        self.connection_locations
            .insert(*connection_id, poll_code.clone());
        log::info!("Connection {} subscribed to poll {}", connection_id, poll_code);
    }

    pub fn unsubscribe(&mut self, connection_id: &ConnectionId) -> Option<PollCode> {
        let poll_code = self.connection_locations.remove(connection_id)?;
        if let Some(connections) = self.groups.get_mut(&poll_code) {
            connections.retain(|c| c != connection_id);
            if connections.is_empty() {
                self.groups.remove(&poll_code);
            }
        }
        Some(poll_code)
    }

    pub fn connection_ids_in_group(&self, poll_code: &PollCode) -> &[ConnectionId] {
        self.groups
            .get(poll_code)
            .map(|connections| connections.as_slice())
            .unwrap_or(&[])
    }
}
