//! UDP transport: one request out, one response back, under a deadline
//!
//! RADIUS runs over UDP, so a response normally arrives as a single
//! datagram. The receive loop still reassembles across reads: once four
//! bytes are buffered the RADIUS Length field fixes how much is expected,
//! and reading continues until that much has arrived or the wall-clock
//! deadline (spanning all partial reads) lapses.

use crate::error::ClientError;
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::time::{Duration, Instant};
use tracing::debug;

/// Largest UDP payload a response may claim in its Length field
const MAX_DATAGRAM: usize = 65507;
/// RADIUS header size; anything smaller cannot be a packet
const MIN_PACKET: usize = 20;

pub struct UdpTransport {
    socket: UdpSocket,
    timeout: Duration,
}

impl UdpTransport {
    /// Bind an ephemeral local port and connect it to `server:port`
    pub fn connect(server: &str, port: u16, timeout: Duration) -> Result<Self, ClientError> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .map_err(|e| ClientError::Socket(format!("bind failed: {}", e)))?;
        socket
            .connect((server, port))
            .map_err(|e| ClientError::Socket(format!("connect to {}:{} failed: {}", server, port, e)))?;
        Ok(UdpTransport { socket, timeout })
    }

    /// Send one request and collect one complete response
    pub fn exchange(&self, request: &[u8]) -> Result<Vec<u8>, ClientError> {
        self.socket
            .send(request)
            .map_err(|e| ClientError::Send(e.to_string()))?;
        debug!(bytes = request.len(), "sent request");

        let deadline = Instant::now() + self.timeout;
        let mut buffer: Vec<u8> = Vec::new();
        let mut expected: Option<usize> = None;
        let mut scratch = vec![0u8; MAX_DATAGRAM];

        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .filter(|d| !d.is_zero())
                .ok_or(ClientError::Timeout)?;
            self.socket
                .set_read_timeout(Some(remaining))
                .map_err(|e| ClientError::Receive(e.to_string()))?;

            match self.socket.recv(&mut scratch) {
                Ok(read) => {
                    buffer.extend_from_slice(&scratch[..read]);

                    if expected.is_none() && buffer.len() >= 4 {
                        let length = u16::from_be_bytes([buffer[2], buffer[3]]) as usize;
                        if !(MIN_PACKET..=MAX_DATAGRAM).contains(&length) {
                            return Err(ClientError::InvalidResponse(format!(
                                "malformed length field: {}",
                                length
                            )));
                        }
                        expected = Some(length);
                    }

                    if let Some(total) = expected {
                        if buffer.len() >= total {
                            debug!(bytes = buffer.len(), "received response");
                            return Ok(buffer);
                        }
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(ClientError::Timeout);
                }
                Err(e) => return Err(ClientError::Receive(e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn udp_pair() -> (UdpSocket, String) {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        (server, addr.ip().to_string())
    }

    #[test]
    fn test_exchange_round_trip() {
        let (server, host) = udp_pair();
        let port = server.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            let (n, peer) = server.recv_from(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"ping");
            // minimal valid RADIUS header: Access-Accept, id 1, length 20
            let mut reply = vec![2u8, 1, 0, 20];
            reply.extend_from_slice(&[0u8; 16]);
            server.send_to(&reply, peer).unwrap();
        });

        let transport = UdpTransport::connect(&host, port, Duration::from_secs(2)).unwrap();
        let reply = transport.exchange(b"ping").unwrap();
        assert_eq!(reply.len(), 20);
        assert_eq!(reply[0], 2);
        handle.join().unwrap();
    }

    #[test]
    fn test_exchange_times_out() {
        let (server, host) = udp_pair();
        let port = server.local_addr().unwrap().port();

        let transport = UdpTransport::connect(&host, port, Duration::from_millis(100)).unwrap();
        let result = transport.exchange(b"ping");
        assert_eq!(result.unwrap_err(), ClientError::Timeout);
        drop(server);
    }

    #[test]
    fn test_malformed_length_rejected() {
        let (server, host) = udp_pair();
        let port = server.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 64];
            let (_, peer) = server.recv_from(&mut buf).unwrap();
            // length field of 5: below the RADIUS header size
            server.send_to(&[2u8, 1, 0, 5], peer).unwrap();
        });

        let transport = UdpTransport::connect(&host, port, Duration::from_secs(2)).unwrap();
        let err = transport.exchange(b"ping").unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
        handle.join().unwrap();
    }
}
