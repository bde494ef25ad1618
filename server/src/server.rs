use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use system::{ConnectionId, PollCode, PollEvent};

use crate::connection_tx_storage::{ConnectionTx, ConnectionTxStorage};
use crate::server_state::ServerState;

#[derive(Debug)]
pub enum ServerCommand {
    Connect {
        connection_id: ConnectionId,
        tx: ConnectionTx,
    },
    Subscribe {
        connection_id: ConnectionId,
        poll_code: PollCode,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    Broadcast {
        poll_code: PollCode,
        event: PollEvent,
    },
    SendTo {
        connection_id: ConnectionId,
        event: PollEvent,
    },
}

pub type ServerTx = UnboundedSender<ServerCommand>;

/// Fan-out task: owns every connection's sender and the broadcast groups.
///
/// Commands are applied in arrival order, so events enqueued while a poll is
/// locked reach each connection in commit order.
struct Server {
    server_state: ServerState,
    connections: ConnectionTxStorage,
}

impl Server {
    fn new() -> Self {
        Self {
            server_state: ServerState::new(),
            connections: ConnectionTxStorage::new(),
        }
    }

    fn handle_server_command(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::Connect { connection_id, tx } => {
                log::info!("Connection {} registered", connection_id);
                self.connections.insert(connection_id, tx);
            }
            ServerCommand::Subscribe {
                connection_id,
                poll_code,
            } => self.server_state.subscribe(&connection_id, &poll_code),
            ServerCommand::Disconnect { connection_id } => self.disconnect(&connection_id),
            ServerCommand::Broadcast { poll_code, event } => {
                self.broadcast(&poll_code, event);
            }
            ServerCommand::SendTo {
                connection_id,
                event,
            } => {
                log::debug!("Egress {} to {}", event.name(), connection_id);
                if !self.connections.send(&connection_id, event) {
                    self.disconnect(&connection_id);
                }
            }
        }
    }

    fn broadcast(&mut self, poll_code: &PollCode, event: PollEvent) {
        log::debug!("Broadcast {} to poll {}", event.name(), poll_code);
        let gone = self
            .server_state
            .connection_ids_in_group(poll_code)
            .iter()
            .filter(|connection_id| !self.connections.send(connection_id, event.clone()))
            .cloned()
            .collect::<Vec<_>>();
        for connection_id in gone {
            self.disconnect(&connection_id);
        }
    }

    fn disconnect(&mut self, connection_id: &ConnectionId) {
        self.server_state.unsubscribe(connection_id);
        if self.connections.remove(connection_id).is_some() {
            log::info!("Connection {} unregistered", connection_id);
        }
    }
}

pub fn spawn_server() -> ServerTx {
    let (srv_tx, mut srv_rx) = unbounded_channel::<ServerCommand>();

    tokio::spawn(async move {
        let mut server = Server::new();

        while let Some(command) = srv_rx.recv().await {
            server.handle_server_command(command);
        }
        log::info!("Fan-out server stopped");
    });

    srv_tx
}

/// Sending half used by the gateway.
#[derive(Clone)]
pub struct ServerHandle {
    srv_tx: ServerTx,
}

impl ServerHandle {
    pub fn new(srv_tx: ServerTx) -> Self {
        Self { srv_tx }
    }

    pub fn spawn() -> Self {
        Self::new(spawn_server())
    }

    pub fn connect(&self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.send(ServerCommand::Connect { connection_id, tx });
    }

    pub fn subscribe(&self, connection_id: ConnectionId, poll_code: PollCode) {
        self.send(ServerCommand::Subscribe {
            connection_id,
            poll_code,
        });
    }

    pub fn disconnect(&self, connection_id: ConnectionId) {
        self.send(ServerCommand::Disconnect { connection_id });
    }

    pub fn broadcast(&self, poll_code: PollCode, event: PollEvent) {
        self.send(ServerCommand::Broadcast { poll_code, event });
    }

    pub fn send_to(&self, connection_id: ConnectionId, event: PollEvent) {
        self.send(ServerCommand::SendTo {
            connection_id,
            event,
        });
    }

    fn send(&self, command: ServerCommand) {
        if let Err(err) = self.srv_tx.send(command) {
            log::error!("Fan-out server is gone, dropping {:?}", err.0);
        }
    }
}
