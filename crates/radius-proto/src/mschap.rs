//! MS-CHAP v1 and MS-CHAP v2 cryptography (RFC 2433 / RFC 2759)
//!
//! Everything here is client-side: computing the NT response the peer puts
//! on the wire, plus the two encrypted blobs of the RFC 2759
//! change-password exchange.

use des::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use des::Des;
use md4::{Digest as _, Md4};
use rand::Rng;
use rc4::{consts::U16, Key, Rc4, StreamCipher};
use sha1::Sha1;
use thiserror::Error;

/// MS-CHAP v2 challenge size (both peer and authenticator challenge)
pub const V2_CHALLENGE_LEN: usize = 16;
/// MS-CHAP v1 challenge size
pub const V1_CHALLENGE_LEN: usize = 8;
/// NT response size
pub const NT_RESPONSE_LEN: usize = 24;
/// Encrypted password block size (RFC 2759 Section 8.10)
pub const PW_BLOCK_LEN: usize = 516;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MsChapError {
    #[error("New password too long for change-password block: {0} bytes")]
    PasswordTooLong(usize),
}

/// MD4 over the UTF-16LE encoding of the password (RFC 2759 Section 8.3)
pub fn nt_password_hash(password: &str) -> [u8; 16] {
    let mut utf16le = Vec::with_capacity(password.len() * 2);
    for unit in password.encode_utf16() {
        utf16le.extend_from_slice(&unit.to_le_bytes());
    }
    let mut hasher = Md4::new();
    hasher.update(&utf16le);
    hasher.finalize().into()
}

/// SHA1(peer challenge || authenticator challenge || username), truncated to
/// 8 bytes (RFC 2759 Section 8.2)
pub fn challenge_hash(
    peer_challenge: &[u8; 16],
    auth_challenge: &[u8; 16],
    username: &str,
) -> [u8; 8] {
    let mut hasher = Sha1::new();
    hasher.update(peer_challenge);
    hasher.update(auth_challenge);
    hasher.update(username.as_bytes());
    let digest = hasher.finalize();
    digest[..8].try_into().unwrap()
}

/// Generate a random 16-byte peer challenge
pub fn generate_peer_challenge() -> [u8; 16] {
    let mut challenge = [0u8; 16];
    rand::rng().fill(&mut challenge);
    challenge
}

/// Generate a random 8-byte MS-CHAP v1 challenge
pub fn generate_v1_challenge() -> [u8; 8] {
    let mut challenge = [0u8; 8];
    rand::rng().fill(&mut challenge);
    challenge
}

/// Spread 56 key bits over 8 bytes and set DES odd parity in the low bit of
/// each byte (RFC 2759 Section 8.6 DesEncrypt key handling)
fn expand_des_key(key: &[u8]) -> [u8; 8] {
    debug_assert_eq!(key.len(), 7);
    let mut out = [0u8; 8];
    out[0] = key[0];
    for i in 1..7 {
        out[i] = (key[i - 1] << (8 - i)) | (key[i] >> i);
    }
    out[7] = key[6] << 1;

    for byte in &mut out {
        let data_bits = *byte & 0xFE;
        *byte = if data_bits.count_ones() % 2 == 0 {
            data_bits | 1
        } else {
            data_bits
        };
    }
    out
}

fn des_encrypt(key: &[u8], data: &[u8; 8]) -> [u8; 8] {
    let des = Des::new(GenericArray::from_slice(&expand_des_key(key)));
    let mut block = *GenericArray::from_slice(data);
    des.encrypt_block(&mut block);
    block.into()
}

/// 24-byte challenge response: the NT hash zero-padded to 21 bytes and used
/// as three 7-byte DES keys over the 8-byte challenge (RFC 2759 Section 8.5)
pub fn challenge_response(challenge: &[u8; 8], nt_hash: &[u8; 16]) -> [u8; 24] {
    let mut z_hash = [0u8; 21];
    z_hash[..16].copy_from_slice(nt_hash);

    let mut response = [0u8; 24];
    response[0..8].copy_from_slice(&des_encrypt(&z_hash[0..7], challenge));
    response[8..16].copy_from_slice(&des_encrypt(&z_hash[7..14], challenge));
    response[16..24].copy_from_slice(&des_encrypt(&z_hash[14..21], challenge));
    response
}

/// MS-CHAP v2 NT response for the given challenges, username and password
/// (RFC 2759 Section 8.1)
pub fn generate_nt_response_v2(
    auth_challenge: &[u8; 16],
    peer_challenge: &[u8; 16],
    username: &str,
    password: &str,
) -> [u8; 24] {
    let challenge = challenge_hash(peer_challenge, auth_challenge, username);
    challenge_response(&challenge, &nt_password_hash(password))
}

/// MS-CHAP v1 NT response: the 8-byte challenge is used directly
/// (RFC 2433 Section A.5)
pub fn generate_nt_response_v1(challenge: &[u8; 8], password: &str) -> [u8; 24] {
    challenge_response(challenge, &nt_password_hash(password))
}

/// MS-CHAP-Response vendor attribute value (50 bytes): flags `00 01`
/// selecting the NT response, an all-zero LAN Manager field, then the
/// NT response
pub fn v1_response_attribute(nt_response: &[u8; 24]) -> [u8; 50] {
    let mut value = [0u8; 50];
    value[1] = 0x01;
    value[26..50].copy_from_slice(nt_response);
    value
}

/// RFC 2759 Section 8.10: the new password RC4-encrypted under the old
/// password's NT hash
///
/// The 516-byte clear block is the UTF-16LE password right-aligned in 512
/// bytes of random fill, followed by the byte length as a 4-byte
/// little-endian integer.
pub fn new_password_encrypted_with_old_nt_hash(
    new_password: &str,
    old_password: &str,
) -> Result<[u8; PW_BLOCK_LEN], MsChapError> {
    let mut utf16le = Vec::with_capacity(new_password.len() * 2);
    for unit in new_password.encode_utf16() {
        utf16le.extend_from_slice(&unit.to_le_bytes());
    }
    if utf16le.len() > 512 {
        return Err(MsChapError::PasswordTooLong(utf16le.len()));
    }

    let mut block = [0u8; PW_BLOCK_LEN];
    rand::rng().fill(&mut block[..512]);
    block[512 - utf16le.len()..512].copy_from_slice(&utf16le);
    block[512..].copy_from_slice(&(utf16le.len() as u32).to_le_bytes());

    let old_hash = nt_password_hash(old_password);
    let mut cipher = Rc4::<U16>::new(Key::<U16>::from_slice(&old_hash));
    cipher.apply_keystream(&mut block);
    Ok(block)
}

/// Encrypt a 16-byte NT hash with another 16-byte block used as two 7-byte
/// DES keys (RFC 2759 Section 8.12 layout)
fn nt_hash_encrypted_with_block(hash: &[u8; 16], block: &[u8; 16]) -> [u8; 16] {
    let mut out = [0u8; 16];
    let first: [u8; 8] = hash[0..8].try_into().unwrap();
    let second: [u8; 8] = hash[8..16].try_into().unwrap();
    out[0..8].copy_from_slice(&des_encrypt(&block[0..7], &first));
    out[8..16].copy_from_slice(&des_encrypt(&block[7..14], &second));
    out
}

/// The 16-byte encrypted-hash blob of the change-password packet: the new
/// password's NT hash DES-encrypted under the old password's NT hash
pub fn encrypted_password_hash(new_password: &str, old_password: &str) -> [u8; 16] {
    let new_hash = nt_password_hash(new_password);
    let old_hash = nt_password_hash(old_password);
    nt_hash_encrypted_with_block(&new_hash, &old_hash)
}
