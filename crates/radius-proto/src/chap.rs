//! CHAP-MD5 support (RFC 2865 Section 5.3)
//!
//! The client side of CHAP never sends the password itself: it sends
//! `MD5(chap_id || password || challenge)` where the challenge is the
//! Request-Authenticator (or, on the fallback path, a challenge the server
//! handed out over EAP).

/// Compute the 16-byte CHAP response hash
///
/// Response = MD5(CHAP identifier + password + challenge)
pub fn compute_chap_response(chap_id: u8, password: &str, challenge: &[u8]) -> [u8; 16] {
    let mut data = Vec::with_capacity(1 + password.len() + challenge.len());
    data.push(chap_id);
    data.extend_from_slice(password.as_bytes());
    data.extend_from_slice(challenge);
    md5::compute(&data).0
}

/// Build the 17-byte CHAP-Password attribute value: the CHAP identifier in
/// the first octet followed by the 16-byte response hash
pub fn chap_password(chap_id: u8, password: &str, challenge: &[u8]) -> Vec<u8> {
    let mut value = Vec::with_capacity(17);
    value.push(chap_id);
    value.extend_from_slice(&compute_chap_response(chap_id, password, challenge));
    value
}
