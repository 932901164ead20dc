use crate::packet::PacketError;
use std::net::Ipv4Addr;

/// RADIUS attribute structure as defined in RFC 2865 Section 5
///
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |    Length     |  Value ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute type (1 byte)
    pub attr_type: u8,
    /// Attribute value (0-253 bytes)
    pub value: Vec<u8>,
}

impl Attribute {
    /// Minimum attribute length (type + length fields)
    pub const MIN_LENGTH: usize = 2;
    /// Maximum attribute length including type and length fields
    pub const MAX_LENGTH: usize = 255;
    /// Maximum value length
    pub const MAX_VALUE_LENGTH: usize = 253;

    pub fn new(attr_type: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        if value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Attribute value too long: {} bytes (max {})",
                value.len(),
                Self::MAX_VALUE_LENGTH
            )));
        }
        Ok(Attribute { attr_type, value })
    }

    /// Create a text attribute (format `Text`)
    pub fn text(attr_type: u8, value: impl Into<String>) -> Result<Self, PacketError> {
        Self::new(attr_type, value.into().into_bytes())
    }

    /// Create a 32-bit big-endian integer attribute (format `Integer`)
    pub fn integer(attr_type: u8, value: u32) -> Result<Self, PacketError> {
        Self::new(attr_type, value.to_be_bytes().to_vec())
    }

    /// Create an IPv4 address attribute (format `Address`)
    pub fn ipv4(attr_type: u8, addr: Ipv4Addr) -> Result<Self, PacketError> {
        Self::new(attr_type, addr.octets().to_vec())
    }

    /// Create a timestamp attribute (format `Time`): 4 octets of big-endian
    /// Unix epoch seconds
    pub fn time(attr_type: u8, epoch_secs: u32) -> Result<Self, PacketError> {
        Self::new(attr_type, epoch_secs.to_be_bytes().to_vec())
    }

    /// Append the encoded form of this attribute to `buffer`
    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), PacketError> {
        let length = self.encoded_length();
        if length > Self::MAX_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Encoded attribute too long: {} bytes",
                length
            )));
        }
        buffer.push(self.attr_type);
        buffer.push(length as u8);
        buffer.extend_from_slice(&self.value);
        Ok(())
    }

    /// Encode attribute to bytes
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut buffer = Vec::with_capacity(self.encoded_length());
        self.encode_into(&mut buffer)?;
        Ok(buffer)
    }

    /// Decode one attribute from the front of `data`
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::MIN_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Attribute data too short: {} bytes",
                data.len()
            )));
        }

        let attr_type = data[0];
        let length = data[1] as usize;

        if length < Self::MIN_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Invalid attribute length: {}",
                length
            )));
        }
        if data.len() < length {
            return Err(PacketError::AttributeError(format!(
                "Insufficient data for attribute: expected {}, got {}",
                length,
                data.len()
            )));
        }

        Ok(Attribute {
            attr_type,
            value: data[2..length].to_vec(),
        })
    }

    /// Get the encoded length of this attribute
    pub fn encoded_length(&self) -> usize {
        Self::MIN_LENGTH + self.value.len()
    }

    /// Try to interpret value as text
    pub fn as_text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.value.clone())
    }

    /// Try to interpret value as a 32-bit big-endian integer
    pub fn as_integer(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.value.as_slice().try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    /// Try to interpret value as an IPv4 address
    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        let octets: [u8; 4] = self.value.as_slice().try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }

    /// Try to interpret value as Unix epoch seconds
    pub fn as_time(&self) -> Option<u32> {
        self.as_integer()
    }
}
