//! Network Layer
//!
//! WebSocket transport, wire protocol and request dispatch.
//! Game rules live in `game/`; persistence behind `store/`.

pub mod dispatch;
pub mod protocol;
pub mod server;

pub use dispatch::{ActionError, Dispatcher};
pub use protocol::{Operation, Reply, Request, ValidationError};
pub use server::{GameServer, ServerConfig, GameServerError};
