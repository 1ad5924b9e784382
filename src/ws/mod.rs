//! WebSocket layer: upgrade handling, relay sessions, outbound writers.
//!
//! Every path except `/health` upgrades to a relay session. The first
//! message on a session picks its role; after that the session forwards
//! every payload to the opposite role.

pub mod handler;
pub mod messages;
pub mod session;
pub mod writer;
