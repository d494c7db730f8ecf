//! Transport seam.
//!
//! The session talks to the network through the [`Transport`] trait: connect,
//! disconnect, pulse, ping, send. Implementations own all socket-level
//! concerns (framing, ordering, retransmission); this layer only chooses a
//! reliability and priority class per outbound message and consumes whatever
//! arrives during `pulse`.
//!
//! Transports are resolved by name through a [`TransportRegistry`] populated
//! at startup. A client without a transport has no useful degraded mode, so
//! failing to resolve one is fatal to the caller.

pub mod loopback;
pub mod udp;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::bail;

/// Delivery guarantee requested for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reliability {
    Unreliable,
    Reliable,
    ReliableOrdered,
}

/// Relative scheduling weight used when multiplexing outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Immediate = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

/// Receiver of raw inbound packets, invoked synchronously from `pulse`.
pub trait PacketSink {
    /// Handles one inbound buffer (tag byte included). Returning `false`
    /// tells the transport to stop delivering for the rest of this pulse.
    fn handle_packet(&mut self, data: &[u8]) -> bool;
}

/// Capability wrapper over a concrete network backend.
pub trait Transport {
    /// Opens a connection. Returns `false` on failure, in which case no
    /// state has changed and a later attempt is allowed.
    fn connect(&mut self, host: &str, port: u16) -> bool;

    /// Drops the connection immediately. No-op when not connected.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Runs one non-blocking IO step: flushes queued outbound messages in
    /// priority order and delivers every available inbound packet to `sink`.
    /// Must be called once per tick and never blocks.
    fn pulse(&mut self, sink: &mut dyn PacketSink);

    /// Last measured round-trip time.
    fn ping(&self) -> Duration;

    /// Queues an outbound message. Returns `false` when not connected.
    fn send(&mut self, payload: &[u8], reliability: Reliability, priority: Priority) -> bool;
}

/// Factory function producing a fresh transport.
pub type TransportFactory = fn() -> Box<dyn Transport>;

/// Name-to-factory registry, populated once at startup.
#[derive(Default)]
pub struct TransportRegistry {
    factories: HashMap<String, TransportFactory>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, factory: TransportFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Resolves a transport by name. The caller treats failure as fatal.
    pub fn create(&self, name: &str) -> anyhow::Result<Box<dyn Transport>> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory()),
            None => bail!("no transport registered under '{name}'"),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|s| s.as_str())
    }
}

/// Registry with the built-in transports.
pub fn default_registry() -> TransportRegistry {
    let mut registry = TransportRegistry::new();
    registry.register("loopback", || Box::new(loopback::LoopbackTransport::new()));
    registry.register("udp", || Box::new(udp::UdpTransport::new()));
    registry
}
