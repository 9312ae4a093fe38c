//! # Banana Clicker Game Server
//!
//! Real-time backend for a single-player incremental game. Clients keep a
//! WebSocket open and send short text frames to read and change their
//! economy: gold balance, upgrade levels, language, and milestone progress.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   BANANA CLICKER SERVER                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/             - Game rules                              │
//! │  ├── state.rs      - Persistent player record                │
//! │  ├── economy.rs    - Upgrade prices, click rewards           │
//! │  ├── achievements.rs - Milestone tracker (in memory)         │
//! │  └── locks.rs      - Per-player serialization                │
//! │                                                              │
//! │  store/            - Persistence                             │
//! │  ├── memory.rs     - In-process store                        │
//! │  └── mysql.rs      - MySQL store (feature `mysql`)           │
//! │                                                              │
//! │  network/          - Networking                              │
//! │  ├── server.rs     - WebSocket server                        │
//! │  ├── protocol.rs   - Frame parsing, replies                  │
//! │  └── dispatch.rs   - Request handlers                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! Each request reads, computes and writes while holding its player's lock,
//! so concurrent requests for one player never lose updates. Achievement
//! progress is not persisted and restarts from zero with the process.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod game;
pub mod network;
pub mod store;

// Re-export commonly used types
pub use game::{AchievementTracker, UserId, UserRecord};
pub use network::{Dispatcher, GameServer, Reply, Request, ServerConfig};
pub use store::{MemoryStore, StoreError, UserStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
