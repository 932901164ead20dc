//! RADIUS Client Protocol Implementation
//!
//! This crate provides the wire-level half of a RADIUS client stack
//! (RFC 2865, 2869, 3579) together with the password cryptography used by
//! PAP, CHAP-MD5, MS-CHAP v1 and MS-CHAP v2 (RFC 2759), including the
//! change-password blobs.
//!
//! # Features
//!
//! - Packet and attribute encoding/decoding, including Vendor-Specific
//!   sub-attributes
//! - Request-Authenticator generation and Response-Authenticator verification
//! - User-Password obfuscation (RFC 2865 Section 5.2)
//! - CHAP-MD5, MS-CHAP v1 and MS-CHAP v2 response computation
//! - Message-Authenticator HMAC-MD5 (RFC 2869 Section 5.14)
//! - EAP framing with EAP-Message fragmentation (RFC 3579) and the
//!   EAP-MSCHAPv2 sub-packet codec
//!
//! # Example
//!
//! ```rust
//! use radius_proto::{Packet, Code, Attribute, AttributeType};
//! use radius_proto::auth::{generate_request_authenticator, encrypt_user_password};
//!
//! // Build an Access-Request the way a NAS would
//! let req_auth = generate_request_authenticator();
//! let mut packet = Packet::new(Code::AccessRequest, 1, req_auth);
//!
//! packet.add_attribute(Attribute::text(AttributeType::UserName as u8, "alice").unwrap());
//!
//! let hidden = encrypt_user_password("password", b"secret", &req_auth);
//! packet.add_attribute(Attribute::new(AttributeType::UserPassword as u8, hidden).unwrap());
//!
//! let bytes = packet.encode().unwrap();
//! assert_eq!(bytes.len(), packet.length());
//! ```

pub mod attributes;
pub mod auth;
pub mod chap;
pub mod eap;
pub mod message_auth;
pub mod mschap;
pub mod packet;

pub use attributes::{
    Attribute, AttributeFormat, AttributeType, VendorAttribute, MS_CHAP_CHALLENGE,
    MS_CHAP_RESPONSE, VENDOR_MICROSOFT,
};
pub use auth::{
    decrypt_user_password, encrypt_user_password, generate_request_authenticator,
    verify_response_authenticator,
};
pub use chap::chap_password;
pub use eap::{EapCode, EapError, EapPacket, EapType};
pub use message_auth::{calculate_message_authenticator, verify_message_authenticator};
pub use mschap::MsChapError;
pub use packet::{Code, Packet, PacketError};
