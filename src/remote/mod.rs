//! Media-player remote control protocol client

pub mod client;
pub mod codec;
pub mod command;
pub mod dispatcher;
pub mod models;
pub mod transport;

#[cfg(test)]
pub mod testing;

pub use client::{RemoteClient, RetryPolicy};
pub use command::{Action, Command};
pub use dispatcher::CommandDispatcher;
pub use models::*;
pub use transport::{TcpTransport, Transport};
