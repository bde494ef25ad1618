pub extern crate actix_web;

pub mod config;
pub mod connection;
mod connection_tx_storage;
pub mod gateway;
pub mod handlers;
pub mod server;
mod server_state;

pub use connection_tx_storage::ConnectionTx;
