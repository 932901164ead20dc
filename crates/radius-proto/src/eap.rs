//! EAP framing (RFC 3748) and EAP-over-RADIUS transport (RFC 3579)
//!
//! # EAP Packet Format
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Code      |  Identifier   |            Length             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Type      |  Type-Data ...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The client speaks the peer role: it answers the server's EAP Requests
//! with Responses, and wraps each EAP packet into one or more EAP-Message
//! RADIUS attributes (type 79), splitting at the 253-byte attribute value
//! limit.

pub mod ms_chap_v2;

use crate::attributes::{Attribute, AttributeType};
use crate::packet::Packet;
use thiserror::Error;

/// EAP packet code (first byte of the EAP header)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EapCode {
    /// Request (1)
    Request = 1,
    /// Response (2)
    Response = 2,
    /// Success (3)
    Success = 3,
    /// Failure (4)
    Failure = 4,
}

impl EapCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(EapCode::Request),
            2 => Some(EapCode::Response),
            3 => Some(EapCode::Success),
            4 => Some(EapCode::Failure),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// EAP method types the client understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EapType {
    /// Identity (1) - RFC 3748
    Identity = 1,
    /// Notification (2) - RFC 3748
    Notification = 2,
    /// Legacy Nak (3) - RFC 3748, response only
    Nak = 3,
    /// MD5-Challenge (4) - RFC 3748
    Md5Challenge = 4,
    /// One-Time Password (5) - RFC 2284
    OneTimePassword = 5,
    /// Generic Token Card (6) - RFC 2284
    GenericTokenCard = 6,
    /// PEAP (25) - draft-josefsson-pppext-eap-tls-eap
    Peap = 25,
    /// EAP-MSCHAPv2 (26) - draft-kamath-pppext-eap-mschapv2
    MsChapV2 = 26,
}

impl EapType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(EapType::Identity),
            2 => Some(EapType::Notification),
            3 => Some(EapType::Nak),
            4 => Some(EapType::Md5Challenge),
            5 => Some(EapType::OneTimePassword),
            6 => Some(EapType::GenericTokenCard),
            25 => Some(EapType::Peap),
            26 => Some(EapType::MsChapV2),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// EAP-related errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EapError {
    #[error("Packet too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort { expected: usize, actual: usize },

    #[error("Invalid EAP code: {0}")]
    InvalidCode(u8),

    #[error("Invalid packet length: {0}")]
    InvalidLength(usize),

    #[error("Unexpected EAP type: {0}")]
    UnexpectedType(u8),

    #[error("Malformed MS-CHAP-V2 payload: {0}")]
    MalformedMsChap(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// EAP packet structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapPacket {
    /// EAP code (Request, Response, Success, Failure)
    pub code: EapCode,
    /// Identifier for matching requests and responses
    pub identifier: u8,
    /// EAP type (present for Request/Response only)
    pub eap_type: Option<EapType>,
    /// Type-specific data
    pub data: Vec<u8>,
}

impl EapPacket {
    pub fn new(code: EapCode, identifier: u8, eap_type: Option<EapType>, data: Vec<u8>) -> Self {
        EapPacket {
            code,
            identifier,
            eap_type,
            data,
        }
    }

    /// EAP Response/Identity carrying the username bytes
    pub fn identity_response(identifier: u8, identity: &str) -> Self {
        EapPacket::new(
            EapCode::Response,
            identifier,
            Some(EapType::Identity),
            identity.as_bytes().to_vec(),
        )
    }

    /// Legacy Nak (type 3): a Response whose single data byte names the
    /// auth type the peer is willing to do instead
    pub fn nak(identifier: u8, desired: EapType) -> Self {
        EapPacket::new(
            EapCode::Response,
            identifier,
            Some(EapType::Nak),
            vec![desired.as_u8()],
        )
    }

    /// EAP Success: header only, length 4
    pub fn success(identifier: u8) -> Self {
        EapPacket::new(EapCode::Success, identifier, None, Vec::new())
    }

    /// EAP Failure: header only, length 4
    pub fn failure(identifier: u8) -> Self {
        EapPacket::new(EapCode::Failure, identifier, None, Vec::new())
    }

    /// Wrap an MS-CHAP-V2 sub-packet into an EAP Response
    pub fn ms_chap_v2_response(identifier: u8, sub_packet: Vec<u8>) -> Self {
        EapPacket::new(
            EapCode::Response,
            identifier,
            Some(EapType::MsChapV2),
            sub_packet,
        )
    }

    /// Parse an EAP packet from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EapError> {
        if bytes.len() < 4 {
            return Err(EapError::PacketTooShort {
                expected: 4,
                actual: bytes.len(),
            });
        }

        let code = EapCode::from_u8(bytes[0]).ok_or(EapError::InvalidCode(bytes[0]))?;
        let identifier = bytes[1];
        let length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;

        if length < 4 {
            return Err(EapError::InvalidLength(length));
        }
        if bytes.len() < length {
            return Err(EapError::PacketTooShort {
                expected: length,
                actual: bytes.len(),
            });
        }

        let (eap_type, data) = match code {
            EapCode::Request | EapCode::Response => {
                if length < 5 {
                    return Err(EapError::InvalidLength(length));
                }
                (EapType::from_u8(bytes[4]), bytes[5..length].to_vec())
            }
            // Success and Failure carry no type field
            EapCode::Success | EapCode::Failure => (None, Vec::new()),
        };

        Ok(EapPacket {
            code,
            identifier,
            eap_type,
            data,
        })
    }

    /// Encode EAP packet to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let length = self.length();
        let mut bytes = Vec::with_capacity(length);
        bytes.push(self.code.as_u8());
        bytes.push(self.identifier);
        bytes.extend_from_slice(&(length as u16).to_be_bytes());
        if let Some(eap_type) = self.eap_type {
            bytes.push(eap_type.as_u8());
            bytes.extend_from_slice(&self.data);
        }
        bytes
    }

    /// Total length of the encoded packet
    pub fn length(&self) -> usize {
        match self.code {
            EapCode::Request | EapCode::Response => 5 + self.data.len(),
            EapCode::Success | EapCode::Failure => 4,
        }
    }

    /// Fragment this packet into EAP-Message attributes (RFC 3579)
    ///
    /// Payloads above the 253-byte attribute value limit are split into
    /// consecutive EAP-Message attributes whose in-order concatenation
    /// reproduces the serialized packet.
    pub fn to_attributes(&self) -> Result<Vec<Attribute>, EapError> {
        let bytes = self.to_bytes();
        bytes
            .chunks(Attribute::MAX_VALUE_LENGTH)
            .map(|chunk| {
                Attribute::new(AttributeType::EapMessage as u8, chunk.to_vec())
                    .map_err(|e| EapError::EncodingError(e.to_string()))
            })
            .collect()
    }

    /// Reassemble the EAP packet fragmented across a RADIUS packet's
    /// EAP-Message attributes
    ///
    /// Returns None when the packet carries no EAP-Message attribute.
    pub fn from_packet(radius: &Packet) -> Result<Option<Self>, EapError> {
        match radius.eap_message() {
            Some(bytes) => Self::from_bytes(&bytes).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Code;

    #[test]
    fn test_identity_response_encode_decode() {
        let packet = EapPacket::identity_response(7, "alice@example.com");
        let bytes = packet.to_bytes();

        assert_eq!(bytes[0], 2);
        assert_eq!(bytes[1], 7);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]) as usize, bytes.len());
        assert_eq!(bytes[4], 1);

        let decoded = EapPacket::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_nak_carries_desired_type() {
        let packet = EapPacket::nak(3, EapType::MsChapV2);
        let bytes = packet.to_bytes();
        assert_eq!(bytes.len(), 6);
        assert_eq!(bytes[4], 3);
        assert_eq!(bytes[5], 26);
    }

    #[test]
    fn test_success_failure_header_only() {
        for (packet, code) in [(EapPacket::success(9), 3u8), (EapPacket::failure(9), 4u8)] {
            let bytes = packet.to_bytes();
            assert_eq!(bytes.len(), 4);
            assert_eq!(bytes[0], code);
            assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 4);

            let decoded = EapPacket::from_bytes(&bytes).unwrap();
            assert_eq!(decoded.eap_type, None);
            assert!(decoded.data.is_empty());
        }
    }

    #[test]
    fn test_reject_short_and_bad_packets() {
        assert!(EapPacket::from_bytes(&[1, 2]).is_err());
        assert!(EapPacket::from_bytes(&[99, 1, 0, 4]).is_err());
        // length field claims more than provided
        assert!(EapPacket::from_bytes(&[1, 1, 0, 10]).is_err());
    }

    #[test]
    fn test_split_and_reassemble_large_payload() {
        let data = vec![0x42u8; 586];
        let packet = EapPacket::new(EapCode::Response, 1, Some(EapType::MsChapV2), data);
        let attrs = packet.to_attributes().unwrap();

        // 5 header bytes + 586 data bytes = 591, split at 253
        assert_eq!(attrs.len(), 591usize.div_ceil(253));
        assert!(attrs.iter().all(|a| a.attr_type == 79));
        assert!(attrs.iter().all(|a| a.value.len() <= 253));

        let mut radius = Packet::new(Code::AccessRequest, 5, [0u8; 16]);
        for attr in attrs {
            radius.add_attribute(attr);
        }
        let reassembled = EapPacket::from_packet(&radius).unwrap().unwrap();
        assert_eq!(reassembled, packet);
    }

    #[test]
    fn test_no_eap_message_is_none() {
        let radius = Packet::new(Code::AccessAccept, 1, [0u8; 16]);
        assert_eq!(EapPacket::from_packet(&radius).unwrap(), None);
    }
}
