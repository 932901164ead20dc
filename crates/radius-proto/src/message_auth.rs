//! Message-Authenticator support (RFC 2869 Section 5.14)
//!
//! The Message-Authenticator attribute (type 80) is HMAC-MD5 over the entire
//! RADIUS packet, keyed with the shared secret, with the 16 attribute value
//! bytes set to zero during the computation. A client puts it on every
//! EAP-bearing Access-Request and may verify it on replies that carry one.

use hmac::{Hmac, Mac};
use md5_digest::Md5;

type HmacMd5 = Hmac<Md5>;

/// HMAC-MD5 over `packet_bytes` keyed with the shared secret
///
/// `packet_bytes` must already have the Message-Authenticator value zeroed;
/// the builder writes the returned 16 bytes back over that region.
pub fn calculate_message_authenticator(packet_bytes: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut mac = HmacMd5::new_from_slice(secret).expect("HMAC-MD5 accepts any key length");
    mac.update(packet_bytes);
    let digest = mac.finalize().into_bytes();

    let mut output = [0u8; 16];
    output.copy_from_slice(&digest);
    output
}

/// Verify the Message-Authenticator of a complete packet
///
/// `value_offset` is the byte offset of the 16 value bytes (past the
/// attribute's type and length octets).
pub fn verify_message_authenticator(
    packet_bytes: &[u8],
    secret: &[u8],
    value_offset: usize,
) -> bool {
    if value_offset + 16 > packet_bytes.len() {
        return false;
    }

    let received = &packet_bytes[value_offset..value_offset + 16];

    let mut zeroed = packet_bytes.to_vec();
    zeroed[value_offset..value_offset + 16].fill(0);

    calculate_message_authenticator(&zeroed, secret) == received
}
