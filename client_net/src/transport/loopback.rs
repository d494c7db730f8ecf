//! In-memory transport for tests and offline runs.
//!
//! A [`LoopbackTransport`] is paired with a [`LoopbackEndpoint`] that plays
//! the server role: tests push encoded packets into the endpoint and inspect
//! what the client sent. Delivery is deterministic, ordered, and lossless, so
//! every reliability class is trivially satisfied.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use client_shared::packets::{encode_tag_only, PacketTag};

use super::{PacketSink, Priority, Reliability, Transport};

/// One outbound message captured by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    pub payload: Vec<u8>,
    pub reliability: Reliability,
    pub priority: Priority,
}

#[derive(Default)]
struct Shared {
    to_client: VecDeque<Vec<u8>>,
    from_client: Vec<SentPacket>,
}

/// Server-side handle of a loopback pair.
#[derive(Clone, Default)]
pub struct LoopbackEndpoint {
    shared: Rc<RefCell<Shared>>,
}

impl LoopbackEndpoint {
    /// Queues a raw packet for delivery on the client's next pulse.
    pub fn push(&self, packet: impl Into<Vec<u8>>) {
        self.shared.borrow_mut().to_client.push_back(packet.into());
    }

    /// Queues a synthesized connection-lost notification.
    pub fn drop_connection(&self) {
        self.push(encode_tag_only(PacketTag::ConnectionLost).to_vec());
    }

    /// Takes every message the client has flushed so far.
    pub fn drain_sent(&self) -> Vec<SentPacket> {
        std::mem::take(&mut self.shared.borrow_mut().from_client)
    }
}

/// Client-side half of the pair.
pub struct LoopbackTransport {
    shared: Rc<RefCell<Shared>>,
    pending: [VecDeque<SentPacket>; 4],
    connected: bool,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            shared: Rc::default(),
            pending: Default::default(),
            connected: false,
        }
    }

    /// Builds a connected-on-demand transport plus its server-side handle.
    pub fn pair() -> (Self, LoopbackEndpoint) {
        let transport = Self::new();
        let endpoint = LoopbackEndpoint {
            shared: Rc::clone(&transport.shared),
        };
        (transport, endpoint)
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LoopbackTransport {
    fn connect(&mut self, _host: &str, _port: u16) -> bool {
        self.connected = true;
        true
    }

    fn disconnect(&mut self) {
        self.connected = false;
        for queue in &mut self.pending {
            queue.clear();
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn pulse(&mut self, sink: &mut dyn PacketSink) {
        if !self.connected {
            return;
        }

        {
            let mut shared = self.shared.borrow_mut();
            for queue in &mut self.pending {
                shared.from_client.extend(queue.drain(..));
            }
        }

        loop {
            let packet = self.shared.borrow_mut().to_client.pop_front();
            match packet {
                Some(data) => {
                    if !sink.handle_packet(&data) {
                        break;
                    }
                }
                None => break,
            }
        }
    }

    fn ping(&self) -> Duration {
        Duration::ZERO
    }

    fn send(&mut self, payload: &[u8], reliability: Reliability, priority: Priority) -> bool {
        if !self.connected {
            return false;
        }
        self.pending[priority as usize].push_back(SentPacket {
            payload: payload.to_vec(),
            reliability,
            priority,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collector(Vec<Vec<u8>>);

    impl PacketSink for Collector {
        fn handle_packet(&mut self, data: &[u8]) -> bool {
            self.0.push(data.to_vec());
            true
        }
    }

    #[test]
    fn delivers_pushed_packets_in_order() {
        let (mut transport, endpoint) = LoopbackTransport::pair();
        assert!(transport.connect("localhost", 0));

        endpoint.push(vec![1, 2, 3]);
        endpoint.push(vec![4]);

        let mut sink = Collector(Vec::new());
        transport.pulse(&mut sink);
        assert_eq!(sink.0, vec![vec![1, 2, 3], vec![4]]);
    }

    #[test]
    fn flushes_outbound_in_priority_order() {
        let (mut transport, endpoint) = LoopbackTransport::pair();
        transport.connect("localhost", 0);

        transport.send(&[2], Reliability::Reliable, Priority::Medium);
        transport.send(&[0], Reliability::Reliable, Priority::Immediate);
        transport.send(&[1], Reliability::ReliableOrdered, Priority::High);

        let mut sink = Collector(Vec::new());
        transport.pulse(&mut sink);

        let sent: Vec<u8> = endpoint
            .drain_sent()
            .into_iter()
            .map(|p| p.payload[0])
            .collect();
        assert_eq!(sent, vec![0, 1, 2]);
    }

    #[test]
    fn send_fails_when_disconnected() {
        let mut transport = LoopbackTransport::new();
        assert!(!transport.send(&[1], Reliability::Unreliable, Priority::Low));
    }
}
