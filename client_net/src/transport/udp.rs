//! Datagram transport over a non-blocking UDP socket.
//!
//! This is the thin adapter used against a real server. Outbound messages are
//! queued per priority class and flushed in priority order on each pulse;
//! inbound datagrams are drained without blocking. Reliability classes are
//! carried as intent only: a datagram socket delivers best-effort, and the
//! peer's session layer provides acknowledgement and ordering where required.
//!
//! The socket registers with the tokio reactor, so `connect` must run inside
//! a tokio runtime context. `pulse` itself never awaits.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use client_shared::packets::{encode_tag_only, PacketTag};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use super::{PacketSink, Priority, Reliability, Transport};

const RECV_BUFFER_LEN: usize = 64 * 1024;

pub struct UdpTransport {
    socket: Option<UdpSocket>,
    queues: [VecDeque<Vec<u8>>; 4],
}

impl UdpTransport {
    pub fn new() -> Self {
        Self {
            socket: None,
            queues: Default::default(),
        }
    }

    fn drop_socket(&mut self) {
        self.socket = None;
        for queue in &mut self.queues {
            queue.clear();
        }
    }

    /// Tears the connection down and synthesizes the one-shot loss
    /// notification for the sink.
    fn lose_connection(&mut self, sink: &mut dyn PacketSink, err: &io::Error) {
        warn!(error = %err, "UDP connection lost");
        self.drop_socket();
        sink.handle_packet(&encode_tag_only(PacketTag::ConnectionLost));
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UdpTransport {
    fn connect(&mut self, host: &str, port: u16) -> bool {
        let std_socket = match std::net::UdpSocket::bind(("0.0.0.0", 0)) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "UDP bind failed");
                return false;
            }
        };
        if let Err(e) = std_socket.connect((host, port)) {
            warn!(error = %e, host, port, "UDP connect failed");
            return false;
        }
        if let Err(e) = std_socket.set_nonblocking(true) {
            warn!(error = %e, "failed to switch socket to non-blocking");
            return false;
        }
        match UdpSocket::from_std(std_socket) {
            Ok(socket) => {
                debug!(host, port, "UDP transport connected");
                self.socket = Some(socket);
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to register socket with the runtime");
                false
            }
        }
    }

    fn disconnect(&mut self) {
        self.drop_socket();
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn pulse(&mut self, sink: &mut dyn PacketSink) {
        let Some(socket) = self.socket.as_ref() else {
            return;
        };
        let mut lost: Option<io::Error> = None;

        // Flush queued outbound messages, highest priority first.
        'flush: for queue in &mut self.queues {
            while let Some(front) = queue.front() {
                match socket.try_send(front) {
                    Ok(_) => {
                        queue.pop_front();
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break 'flush,
                    Err(e) => {
                        lost = Some(e);
                        break 'flush;
                    }
                }
            }
        }

        // Drain everything currently readable.
        if lost.is_none() {
            let mut buf = [0u8; RECV_BUFFER_LEN];
            loop {
                match socket.try_recv(&mut buf) {
                    Ok(len) => {
                        if !sink.handle_packet(&buf[..len]) {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        lost = Some(e);
                        break;
                    }
                }
            }
        }

        if let Some(e) = lost {
            self.lose_connection(sink, &e);
        }
    }

    fn ping(&self) -> Duration {
        // The datagram adapter does not measure RTT; a session-level backend
        // reports a real value here.
        Duration::ZERO
    }

    fn send(&mut self, payload: &[u8], _reliability: Reliability, priority: Priority) -> bool {
        if self.socket.is_none() {
            return false;
        }
        self.queues[priority as usize].push_back(payload.to_vec());
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

    #[tokio::test]
    async fn datagrams_flow_both_ways() -> anyhow::Result<()> {
        let peer = UdpSocket::bind("127.0.0.1:0").await?;
        let peer_addr = peer.local_addr()?;

        let mut transport = UdpTransport::new();
        assert!(transport.connect("127.0.0.1", peer_addr.port()));
        assert!(transport.is_connected());

        // Client -> peer.
        assert!(transport.send(&[7, 7, 7], Reliability::Reliable, Priority::High));
        let mut sink = Collector(Vec::new());
        transport.pulse(&mut sink);

        let mut buf = [0u8; 64];
        let (len, from) = peer.recv_from(&mut buf).await?;
        assert_eq!(&buf[..len], &[7, 7, 7]);

        // Peer -> client. A couple of pulses cover delivery latency.
        peer.send_to(&[9, 9], from).await?;
        for _ in 0..50 {
            transport.pulse(&mut sink);
            if !sink.0.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(sink.0, vec![vec![9, 9]]);

        Ok(())
    }

    #[tokio::test]
    async fn connect_failure_leaves_state_unchanged() {
        let mut transport = UdpTransport::new();
        assert!(!transport.connect("definitely-not-a-host.invalid", 1));
        assert!(!transport.is_connected());
    }
}
