//! `client_net`
//!
//! Client-side network core:
//! - Transport seam with a name registry (datagram + loopback built in)
//! - Packet dispatch with per-packet failure isolation
//! - Authoritative mirror of remote and local player records
//! - Position/animation interpolation for remote players
//! - Session glue and outbound send operations

pub mod dispatch;
pub mod events;
pub mod interp;
pub mod players;
pub mod session;
pub mod transport;

pub use session::GameClient;
