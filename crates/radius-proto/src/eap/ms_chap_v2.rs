//! EAP-MSCHAPv2 sub-packet codec (draft-kamath-pppext-eap-mschapv2, RFC 2759)
//!
//! Inside an EAP Request/Response of type 26, the type-data is an MS-CHAP-V2
//! sub-packet:
//!
//! ```text
//! | OpCode | MS-CHAPv2-ID | MS-Length (2, BE) | payload ... |
//! ```
//!
//! The client consumes Challenge, Success and Failure sub-packets from the
//! server and produces Response and Change-Password sub-packets.

use super::EapError;

/// MS-CHAP-V2 sub-packet opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Challenge (1), server to peer
    Challenge = 1,
    /// Response (2), peer to server
    Response = 2,
    /// Success (3), server to peer
    Success = 3,
    /// Failure (4), server to peer
    Failure = 4,
    /// Change-Password (7), peer to server (RFC 2759 Section 7)
    ChangePassword = 7,
}

impl OpCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(OpCode::Challenge),
            2 => Some(OpCode::Response),
            3 => Some(OpCode::Success),
            4 => Some(OpCode::Failure),
            7 => Some(OpCode::ChangePassword),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A decoded MS-CHAP-V2 sub-packet header plus raw payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubPacket {
    pub op_code: OpCode,
    pub ms_chap_id: u8,
    pub payload: Vec<u8>,
}

impl SubPacket {
    /// Parse a sub-packet out of EAP type-data
    pub fn parse(data: &[u8]) -> Result<Self, EapError> {
        if data.len() < 4 {
            return Err(EapError::MalformedMsChap(format!(
                "sub-packet too short: {} bytes",
                data.len()
            )));
        }
        let op_code = OpCode::from_u8(data[0]).ok_or_else(|| {
            EapError::MalformedMsChap(format!("unknown opcode: {}", data[0]))
        })?;
        let ms_chap_id = data[1];
        let ms_length = u16::from_be_bytes([data[2], data[3]]) as usize;
        if ms_length < 4 || ms_length > data.len() {
            return Err(EapError::MalformedMsChap(format!(
                "bad MS-Length {} for {} data bytes",
                ms_length,
                data.len()
            )));
        }

        Ok(SubPacket {
            op_code,
            ms_chap_id,
            payload: data[4..ms_length].to_vec(),
        })
    }

    /// Interpret a Challenge payload: `value-size | challenge | name`
    pub fn challenge(&self) -> Result<[u8; 16], EapError> {
        if self.op_code != OpCode::Challenge {
            return Err(EapError::MalformedMsChap(format!(
                "expected Challenge, got {:?}",
                self.op_code
            )));
        }
        let value_size = *self.payload.first().ok_or_else(|| {
            EapError::MalformedMsChap("empty Challenge payload".to_string())
        })? as usize;
        if value_size != 16 || self.payload.len() < 17 {
            return Err(EapError::MalformedMsChap(format!(
                "bad Challenge value-size: {}",
                value_size
            )));
        }
        Ok(self.payload[1..17].try_into().unwrap())
    }

    /// Interpret a Failure payload as the ASCII failure string
    pub fn failure(&self) -> Result<FailureInfo, EapError> {
        if self.op_code != OpCode::Failure {
            return Err(EapError::MalformedMsChap(format!(
                "expected Failure, got {:?}",
                self.op_code
            )));
        }
        Ok(FailureInfo::parse(&self.payload))
    }
}

/// Build a Response sub-packet (opcode 2)
///
/// Payload: `value-size (49) | peer-challenge (16) | reserved (8) |
/// nt-response (24) | flags (1) | name`.
pub fn build_response(
    ms_chap_id: u8,
    peer_challenge: &[u8; 16],
    nt_response: &[u8; 24],
    username: &str,
) -> Vec<u8> {
    let ms_length = 4 + 1 + 49 + username.len();
    let mut out = Vec::with_capacity(ms_length);
    out.push(OpCode::Response.as_u8());
    out.push(ms_chap_id);
    out.extend_from_slice(&(ms_length as u16).to_be_bytes());
    out.push(49);
    out.extend_from_slice(peer_challenge);
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(nt_response);
    out.push(0);
    out.extend_from_slice(username.as_bytes());
    out
}

/// Build a Change-Password sub-packet (opcode 7, RFC 2759 Section 7)
///
/// Payload: `encrypted-password (516) | encrypted-hash (16) |
/// peer-challenge (16) | reserved (8) | nt-response (24) | flags (2)`.
pub fn build_change_password(
    ms_chap_id: u8,
    encrypted_password: &[u8; 516],
    encrypted_hash: &[u8; 16],
    peer_challenge: &[u8; 16],
    nt_response: &[u8; 24],
) -> Vec<u8> {
    let ms_length = 4 + 516 + 16 + 16 + 8 + 24 + 2;
    let mut out = Vec::with_capacity(ms_length);
    out.push(OpCode::ChangePassword.as_u8());
    out.push(ms_chap_id);
    out.extend_from_slice(&(ms_length as u16).to_be_bytes());
    out.extend_from_slice(encrypted_password);
    out.extend_from_slice(encrypted_hash);
    out.extend_from_slice(peer_challenge);
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(nt_response);
    out.extend_from_slice(&[0u8; 2]);
    out
}

/// Parsed `E=eeeeeeeeee R=r C=cccccccccccccccccccccccccccccccc V=vvvvvvvvvv
/// M=<msg>` failure text (RFC 2759 Section 6)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    /// Numeric E= error code
    pub error_code: u32,
    /// R= retry flag
    pub retry_allowed: bool,
    /// C= challenge for a retry or password change
    pub challenge: Option<[u8; 16]>,
    /// M= free-text message from the server
    pub server_message: String,
}

impl FailureInfo {
    /// Parse a failure payload; unknown fields are skipped, a missing E=
    /// yields error code 0
    pub fn parse(payload: &[u8]) -> Self {
        let text = String::from_utf8_lossy(payload);
        let mut info = FailureInfo {
            error_code: 0,
            retry_allowed: false,
            challenge: None,
            server_message: String::new(),
        };

        let mut rest = text.as_ref();
        while !rest.is_empty() {
            rest = rest.trim_start();
            if let Some(message) = rest.strip_prefix("M=") {
                // M= runs to the end of the string and may contain spaces
                info.server_message = message.trim_end_matches('\0').to_string();
                break;
            }
            let token = rest.split_whitespace().next().unwrap_or("");
            if token.is_empty() {
                break;
            }
            if let Some(code) = token.strip_prefix("E=") {
                info.error_code = code.parse().unwrap_or(0);
            } else if let Some(retry) = token.strip_prefix("R=") {
                info.retry_allowed = retry == "1";
            } else if let Some(hex_challenge) = token.strip_prefix("C=") {
                if let Ok(bytes) = hex::decode(hex_challenge) {
                    if bytes.len() == 16 {
                        let mut challenge = [0u8; 16];
                        challenge.copy_from_slice(&bytes);
                        info.challenge = Some(challenge);
                    }
                }
            }
            rest = &rest[token.len().min(rest.len())..];
        }

        info
    }

    /// Human-readable text for the well-known E= codes; falls back to the
    /// server's own M= message
    pub fn text(&self) -> String {
        match self.error_code {
            646 => "Logon hours are restricted.".to_string(),
            647 => "Account disabled.".to_string(),
            648 => "Password expired.".to_string(),
            649 => "No dial-in permission.".to_string(),
            691 => "Authentication failure, username or password incorrect.".to_string(),
            709 => "Error changing password.".to_string(),
            _ if !self.server_message.is_empty() => self.server_message.clone(),
            code => format!("MS-CHAP-V2 failure (E={})", code),
        }
    }
}

/// Password-expired failure; a change-password exchange may follow
pub const ERROR_PASSWD_EXPIRED: u32 = 648;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_challenge_sub_packet() {
        let mut data = vec![1u8, 0x2A];
        let name = b"radius-server";
        let ms_length = (4 + 1 + 16 + name.len()) as u16;
        data.extend_from_slice(&ms_length.to_be_bytes());
        data.push(16);
        data.extend_from_slice(&[0x11; 16]);
        data.extend_from_slice(name);

        let sub = SubPacket::parse(&data).unwrap();
        assert_eq!(sub.op_code, OpCode::Challenge);
        assert_eq!(sub.ms_chap_id, 0x2A);
        assert_eq!(sub.challenge().unwrap(), [0x11; 16]);
    }

    #[test]
    fn test_parse_rejects_bad_ms_length() {
        // MS-Length larger than the data on hand
        assert!(SubPacket::parse(&[1, 1, 0, 99, 16]).is_err());
        assert!(SubPacket::parse(&[1, 1, 0, 2]).is_err());
        assert!(SubPacket::parse(&[9, 1, 0, 4]).is_err());
    }

    #[test]
    fn test_build_response_layout() {
        let sub = build_response(5, &[0xAA; 16], &[0xBB; 24], "alice");
        assert_eq!(sub[0], 2);
        assert_eq!(sub[1], 5);
        assert_eq!(u16::from_be_bytes([sub[2], sub[3]]) as usize, sub.len());
        assert_eq!(sub[4], 49);
        assert_eq!(&sub[5..21], &[0xAA; 16]);
        assert_eq!(&sub[21..29], &[0u8; 8]);
        assert_eq!(&sub[29..53], &[0xBB; 24]);
        assert_eq!(sub[53], 0);
        assert_eq!(&sub[54..], b"alice");
    }

    #[test]
    fn test_build_change_password_layout() {
        let sub = build_change_password(9, &[0x01; 516], &[0x02; 16], &[0x03; 16], &[0x04; 24]);
        assert_eq!(sub.len(), 586);
        assert_eq!(sub[0], 7);
        assert_eq!(sub[1], 9);
        assert_eq!(u16::from_be_bytes([sub[2], sub[3]]), 586);
        assert_eq!(&sub[4..520], &[0x01; 516][..]);
        assert_eq!(&sub[520..536], &[0x02; 16]);
        assert_eq!(&sub[536..552], &[0x03; 16]);
        assert_eq!(&sub[552..560], &[0u8; 8]);
        assert_eq!(&sub[560..584], &[0x04; 24]);
        assert_eq!(&sub[584..586], &[0u8; 2]);
    }

    #[test]
    fn test_parse_failure_string() {
        let payload =
            b"E=691 R=0 C=00112233445566778899AABBCCDDEEFF V=3 M=Authentication failure";
        let info = FailureInfo::parse(payload);
        assert_eq!(info.error_code, 691);
        assert!(!info.retry_allowed);
        assert_eq!(
            info.challenge.unwrap(),
            [
                0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC,
                0xDD, 0xEE, 0xFF
            ]
        );
        assert_eq!(info.server_message, "Authentication failure");
        assert_eq!(
            info.text(),
            "Authentication failure, username or password incorrect."
        );
    }

    #[test]
    fn test_failure_text_mapping() {
        for (code, needle) in [
            (646u32, "hours"),
            (647, "disabled"),
            (648, "expired"),
            (649, "dial-in"),
            (709, "changing password"),
        ] {
            let info = FailureInfo {
                error_code: code,
                retry_allowed: false,
                challenge: None,
                server_message: String::new(),
            };
            assert!(info.text().contains(needle), "E={} -> {}", code, info.text());
        }
    }

    #[test]
    fn test_failure_unknown_code_uses_server_message() {
        let info = FailureInfo::parse(b"E=723 R=1 M=Something else");
        assert_eq!(info.error_code, 723);
        assert!(info.retry_allowed);
        assert_eq!(info.text(), "Something else");
    }
}
