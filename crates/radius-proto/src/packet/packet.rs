use super::Code;
use crate::attributes::{Attribute, AttributeType};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("Invalid packet length: {0}")]
    InvalidLength(usize),
    #[error("Invalid packet code: {0}")]
    InvalidCode(u8),
    #[error("Attribute error: {0}")]
    AttributeError(String),
    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

/// RADIUS packet structure as defined in RFC 2865 Section 3
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Code      |  Identifier   |            Length             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// |                         Authenticator                         |
/// |                                                               |
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Attributes ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-
/// ```
///
/// For an outgoing Access-Request `authenticator` is the random
/// Request-Authenticator; for a decoded reply it is the server's
/// Response-Authenticator, verified separately against the request it
/// answers (see [`crate::auth::verify_response_authenticator`]).
#[derive(Debug, Clone)]
pub struct Packet {
    /// Packet type (1 byte)
    pub code: Code,
    /// Packet identifier for matching requests/responses (1 byte)
    pub identifier: u8,
    /// Request or Response Authenticator (16 bytes)
    pub authenticator: [u8; 16],
    /// Ordered attribute list
    pub attributes: Vec<Attribute>,
}

impl Packet {
    /// Minimum RADIUS packet size (1 code + 1 id + 2 length + 16 authenticator)
    pub const MIN_PACKET_SIZE: usize = 20;
    /// Maximum RADIUS packet size per RFC 2865
    pub const MAX_PACKET_SIZE: usize = 4096;

    pub fn new(code: Code, identifier: u8, authenticator: [u8; 16]) -> Self {
        Packet {
            code,
            identifier,
            authenticator,
            attributes: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Encode packet to bytes
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let total = self.length();
        if total > Self::MAX_PACKET_SIZE {
            return Err(PacketError::PacketTooLarge(total));
        }

        let mut buffer = Vec::with_capacity(total);
        buffer.push(self.code.as_u8());
        buffer.push(self.identifier);
        buffer.extend_from_slice(&(total as u16).to_be_bytes());
        buffer.extend_from_slice(&self.authenticator);
        for attr in &self.attributes {
            attr.encode_into(&mut buffer)?;
        }

        Ok(buffer)
    }

    /// Decode packet from bytes
    ///
    /// Trailing bytes beyond the Length field are ignored per RFC 2865;
    /// a Length larger than the datagram fails the decode.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::MIN_PACKET_SIZE {
            return Err(PacketError::InvalidLength(data.len()));
        }

        let code = Code::from_u8(data[0]).ok_or(PacketError::InvalidCode(data[0]))?;
        let identifier = data[1];
        let length = u16::from_be_bytes([data[2], data[3]]) as usize;

        if !(Self::MIN_PACKET_SIZE..=Self::MAX_PACKET_SIZE).contains(&length) {
            return Err(PacketError::InvalidLength(length));
        }
        if data.len() < length {
            return Err(PacketError::InvalidLength(data.len()));
        }

        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&data[4..20]);

        let mut attributes = Vec::new();
        let mut rest = &data[20..length];
        while !rest.is_empty() {
            let attr = Attribute::decode(rest)?;
            let consumed = attr.encoded_length();
            attributes.push(attr);
            rest = &rest[consumed..];
        }

        Ok(Packet {
            code,
            identifier,
            authenticator,
            attributes,
        })
    }

    /// Get the length of the encoded packet
    pub fn length(&self) -> usize {
        Self::MIN_PACKET_SIZE
            + self
                .attributes
                .iter()
                .map(Attribute::encoded_length)
                .sum::<usize>()
    }

    /// Find first attribute by type
    pub fn find_attribute(&self, attr_type: u8) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.attr_type == attr_type)
    }

    /// Find all attributes by type, in packet order
    pub fn find_all_attributes(&self, attr_type: u8) -> Vec<&Attribute> {
        self.attributes
            .iter()
            .filter(|a| a.attr_type == attr_type)
            .collect()
    }

    /// Concatenated value bytes of every EAP-Message attribute, in order
    ///
    /// Returns None when the packet carries no EAP-Message at all.
    pub fn eap_message(&self) -> Option<Vec<u8>> {
        let mut bytes = Vec::new();
        for attr in &self.attributes {
            if attr.attr_type == AttributeType::EapMessage as u8 {
                bytes.extend_from_slice(&attr.value);
            }
        }
        if bytes.is_empty() { None } else { Some(bytes) }
    }

    /// Value of the State attribute, if present
    pub fn state(&self) -> Option<&[u8]> {
        self.find_attribute(AttributeType::State as u8)
            .map(|a| a.value.as_slice())
    }
}
