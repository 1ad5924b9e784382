//! # relay-hub
//!
//! WebSocket relay hub between camera producers and controller consumers.
//!
//! Producers (e.g. an ESP32-CAM) stream frames; consumers (e.g. an Android
//! controller app) send commands and receive frames. Each connection
//! identifies itself with a single handshake message and from then on every
//! payload it sends is fanned out, verbatim, to all connections of the other
//! role.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, any path)
//!     │
//!     ├── Upgrade handler (ws/)
//!     ├── Relay session per connection (ws/session)
//!     │       └── Outbound writer task (ws/writer)
//!     │
//!     └── Registry: Role → live PeerHandles (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod shutdown;
pub mod ws;
