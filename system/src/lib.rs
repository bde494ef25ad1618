pub extern crate chrono;
pub extern crate serde;
pub extern crate serde_json;
pub extern crate uuid;

mod chat;
mod coordinator;
mod error;
mod file_store;
mod message;
mod poll;
mod query;
mod results;
mod store;
mod types;

pub use chat::*;
pub use coordinator::*;
pub use error::*;
pub use file_store::*;
pub use message::*;
pub use poll::*;
pub use query::*;
pub use results::*;
pub use store::*;
pub use types::*;
