//! Request/Response Authenticator handling and User-Password obfuscation
//! (RFC 2865 Sections 3 and 5.2), from the client's point of view:
//! the client generates the random Request-Authenticator, hides the PAP
//! password under it, and checks the server's Response-Authenticator
//! before trusting a reply.

use crate::packet::PacketError;
use rand::Rng;

/// Generate a random Request-Authenticator (16 bytes) per RFC 2865 Section 3
///
/// Full-range bytes from the thread-local CSPRNG.
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; 16];
    rng.fill(&mut authenticator);
    authenticator
}

/// Calculate the Response-Authenticator a server should have put on `reply`
///
/// Response Authenticator = MD5(Code + ID + Length + Request Authenticator
/// + Attributes + Secret), where everything except the Request Authenticator
/// and the secret is taken verbatim from the reply datagram.
pub fn calculate_response_authenticator(
    reply: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Option<[u8; 16]> {
    if reply.len() < 20 {
        return None;
    }

    let mut data = Vec::with_capacity(reply.len() + secret.len());
    data.extend_from_slice(&reply[0..4]);
    data.extend_from_slice(request_authenticator);
    data.extend_from_slice(&reply[20..]);
    data.extend_from_slice(secret);

    Some(md5::compute(&data).0)
}

/// Verify the Response-Authenticator of a raw reply datagram against the
/// Request-Authenticator of the request it answers
///
/// Any bit flip anywhere in the reply fails this check.
pub fn verify_response_authenticator(
    reply: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    match calculate_response_authenticator(reply, request_authenticator, secret) {
        Some(expected) => reply[4..20] == expected,
        None => false,
    }
}

/// Hide a User-Password attribute value per RFC 2865 Section 5.2
///
/// The password is zero-padded to a multiple of 16 bytes, then each 16-byte
/// block is XORed with `MD5(secret || c_prev)` where `c_prev` is the
/// Request-Authenticator for the first block and the previous ciphertext
/// block afterwards.
pub fn encrypt_user_password(password: &str, secret: &[u8], authenticator: &[u8; 16]) -> Vec<u8> {
    let mut padded = password.as_bytes().to_vec();
    let rem = padded.len() % 16;
    if rem != 0 || padded.is_empty() {
        padded.resize(padded.len() + 16 - rem, 0);
    }

    let mut out = Vec::with_capacity(padded.len());
    let mut chain: [u8; 16] = *authenticator;

    for chunk in padded.chunks(16) {
        let mut keyed = Vec::with_capacity(secret.len() + 16);
        keyed.extend_from_slice(secret);
        keyed.extend_from_slice(&chain);
        let keystream = md5::compute(&keyed).0;

        for (i, byte) in chunk.iter().enumerate() {
            chain[i] = byte ^ keystream[i];
        }
        out.extend_from_slice(&chain);
    }

    out
}

/// Recover a User-Password hidden with [`encrypt_user_password`], stripping
/// the trailing zero padding
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<String, PacketError> {
    if encrypted.is_empty() || encrypted.len() % 16 != 0 {
        return Err(PacketError::InvalidLength(encrypted.len()));
    }

    let mut plain = Vec::with_capacity(encrypted.len());
    let mut chain: &[u8] = authenticator;

    for chunk in encrypted.chunks(16) {
        let mut keyed = Vec::with_capacity(secret.len() + 16);
        keyed.extend_from_slice(secret);
        keyed.extend_from_slice(chain);
        let keystream = md5::compute(&keyed).0;

        for (i, byte) in chunk.iter().enumerate() {
            plain.push(byte ^ keystream[i]);
        }
        chain = chunk;
    }

    while plain.last() == Some(&0) {
        plain.pop();
    }

    String::from_utf8(plain)
        .map_err(|e| PacketError::AttributeError(format!("Invalid UTF-8 in password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_authenticator_is_random() {
        let a = generate_request_authenticator();
        let b = generate_request_authenticator();
        assert_ne!(a, b);
    }

    #[test]
    fn test_password_round_trip() {
        let secret = b"xyzzy";
        let authenticator = generate_request_authenticator();

        for password in ["pw", "", "exactly-16-bytes", "a much longer password spanning blocks"] {
            let hidden = encrypt_user_password(password, secret, &authenticator);
            assert_eq!(hidden.len() % 16, 0);
            assert!(!hidden.is_empty());
            let recovered = decrypt_user_password(&hidden, secret, &authenticator).unwrap();
            assert_eq!(recovered, password);
        }
    }

    #[test]
    fn test_password_padding_width() {
        let authenticator = [7u8; 16];
        assert_eq!(encrypt_user_password("", b"s", &authenticator).len(), 16);
        assert_eq!(encrypt_user_password("123456789012345", b"s", &authenticator).len(), 16);
        assert_eq!(encrypt_user_password("1234567890123456", b"s", &authenticator).len(), 16);
        assert_eq!(encrypt_user_password("12345678901234567", b"s", &authenticator).len(), 32);
    }

    #[test]
    fn test_response_authenticator_round_trip() {
        let secret = b"sharedsecret";
        let request_auth = [0x5A; 16];

        // hand-rolled Access-Accept reply with a Reply-Message attribute
        let attrs = [18u8, 7, b'h', b'e', b'l', b'l', b'o'];
        let length = (20 + attrs.len()) as u16;
        let mut reply = vec![2u8, 42];
        reply.extend_from_slice(&length.to_be_bytes());
        reply.extend_from_slice(&[0u8; 16]);
        reply.extend_from_slice(&attrs);

        let auth = calculate_response_authenticator(&reply, &request_auth, secret).unwrap();
        reply[4..20].copy_from_slice(&auth);

        assert!(verify_response_authenticator(&reply, &request_auth, secret));

        // any bit flip breaks it
        reply[21] ^= 0x01;
        assert!(!verify_response_authenticator(&reply, &request_auth, secret));
    }

    #[test]
    fn test_response_authenticator_wrong_secret() {
        let request_auth = [1u8; 16];
        let mut reply = vec![2u8, 1, 0, 20];
        reply.extend_from_slice(&[0u8; 16]);
        let auth = calculate_response_authenticator(&reply, &request_auth, b"one").unwrap();
        reply[4..20].copy_from_slice(&auth);

        assert!(verify_response_authenticator(&reply, &request_auth, b"one"));
        assert!(!verify_response_authenticator(&reply, &request_auth, b"two"));
    }
}
