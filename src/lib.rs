mod bytes;
mod client;
mod command;
mod db;
mod glob;
mod hll;
mod pubsub;
mod reply;
mod request;
mod server;
mod sketch;
mod slice;
mod spawn;
mod store;
mod time;

// Public interface
pub use client::Addr;
pub use server::Server;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use client::{Client, ClientId, ReplyMessage};
use command::{BlockResult, Command, CommandResult};
use reply::{Reply, ReplyError};
use spawn::{TaskHandle, spawn, spawn_with_handle};
use store::{Store, StoreMessage};
use time::epoch;
