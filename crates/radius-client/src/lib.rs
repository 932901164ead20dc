//! RADIUS Authentication Client
//!
//! This crate provides the client engine on top of the `radius-proto`
//! protocol implementation: a synchronous UDP client that authenticates a
//! user with PAP, CHAP-MD5, MS-CHAP v1 or a multi-round EAP-MSCHAPv2
//! exchange (including the RFC 2759 change-password flow), against one
//! RADIUS server or an ordered failover list.
//!
//! # Features
//!
//! - One blocking request/response exchange per round, bounded by a
//!   configurable deadline
//! - Response-Authenticator verification on every reply
//! - Message-Authenticator signing on EAP and MS-CHAP requests
//! - Sticky last-error with stable numeric codes for NAS integrations
//!
//! # Example
//!
//! ```no_run
//! use radius_client::Client;
//! use std::time::Duration;
//!
//! let mut client = Client::new("radius.example.com", "xyzzy");
//! client.set_timeout(Duration::from_secs(3));
//! client.add_server("radius-backup.example.com");
//!
//! if client.authenticate_eap_ms_chap_v2("alice", "password") {
//!     println!("accepted");
//! } else {
//!     eprintln!(
//!         "denied: {} (code {})",
//!         client.last_error_message(),
//!         client.last_error_code()
//!     );
//! }
//! ```

pub mod client;
pub mod error;
mod session;
pub mod transaction;
pub mod transport;

pub use client::{Client, DEFAULT_ACCT_PORT, DEFAULT_AUTH_PORT, DEFAULT_TIMEOUT};
pub use error::ClientError;
pub use transaction::{IdCounter, ReceivedPacket, Transaction};
pub use transport::UdpTransport;
