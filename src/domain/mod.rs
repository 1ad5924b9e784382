//! Domain layer: connection identity, roles, payloads, and the registry.
//!
//! Nothing here touches sockets directly. Sessions in `ws/` own the
//! sockets and talk to each other only through [`Registry`] snapshots and
//! [`PeerHandle`] queues.

pub mod broadcast;
pub mod connection_id;
pub mod payload;
pub mod peer;
pub mod registry;
pub mod role;

pub use broadcast::{BroadcastReport, broadcast};
pub use connection_id::ConnectionId;
pub use payload::Payload;
pub use peer::{Outbound, PeerHandle};
pub use registry::{Registry, RegistryCounts};
pub use role::{Role, Sentinels};
