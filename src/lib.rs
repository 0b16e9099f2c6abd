//! Room-session coordination and WebRTC signaling relay.

pub mod error;
pub mod http;
pub mod messages;
pub mod room;
pub mod server;

pub use error::RelayError;
pub use server::Server;
