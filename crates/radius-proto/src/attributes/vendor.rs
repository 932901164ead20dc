//! Vendor-Specific attribute handling (RFC 2865 Section 5.26)
//!
//! A Vendor-Specific attribute (type 26) carries one or more vendor
//! sub-attributes after a 4-byte vendor id:
//!
//! ```text
//! | 26 | length | vendor-id (4, BE) | vendor-type | vendor-length | data ... |
//! ```
//!
//! `vendor-length` covers the sub-attribute header and data, so the decode
//! loop advances by the full `vendor-length` for each sub-attribute.

use super::{Attribute, AttributeType};
use crate::packet::PacketError;

/// Microsoft vendor id (MS-CHAP attributes, RFC 2548)
pub const VENDOR_MICROSOFT: u32 = 311;
/// MS-CHAP-Response / MS-CHAP2-Response vendor type
pub const MS_CHAP_RESPONSE: u8 = 1;
/// MS-CHAP-Challenge vendor type
pub const MS_CHAP_CHALLENGE: u8 = 11;

/// One vendor sub-attribute inside a Vendor-Specific attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorAttribute {
    pub vendor_id: u32,
    pub vendor_type: u8,
    pub data: Vec<u8>,
}

impl VendorAttribute {
    pub fn new(vendor_id: u32, vendor_type: u8, data: Vec<u8>) -> Self {
        VendorAttribute {
            vendor_id,
            vendor_type,
            data,
        }
    }

    /// Wrap this sub-attribute into a Vendor-Specific RADIUS attribute
    pub fn to_attribute(&self) -> Result<Attribute, PacketError> {
        let vendor_length = self.data.len() + 2;
        if vendor_length > u8::MAX as usize {
            return Err(PacketError::AttributeError(format!(
                "Vendor sub-attribute too long: {} bytes",
                self.data.len()
            )));
        }

        let mut value = Vec::with_capacity(4 + vendor_length);
        value.extend_from_slice(&self.vendor_id.to_be_bytes());
        value.push(self.vendor_type);
        value.push(vendor_length as u8);
        value.extend_from_slice(&self.data);
        Attribute::new(AttributeType::VendorSpecific as u8, value)
    }

    /// Parse every vendor sub-attribute out of a Vendor-Specific attribute
    pub fn parse_all(attribute: &Attribute) -> Result<Vec<VendorAttribute>, PacketError> {
        if attribute.attr_type != AttributeType::VendorSpecific as u8 {
            return Err(PacketError::AttributeError(format!(
                "Not a Vendor-Specific attribute: type {}",
                attribute.attr_type
            )));
        }
        if attribute.value.len() < 4 {
            return Err(PacketError::AttributeError(
                "Vendor-Specific attribute shorter than vendor id".to_string(),
            ));
        }

        let vendor_id = u32::from_be_bytes([
            attribute.value[0],
            attribute.value[1],
            attribute.value[2],
            attribute.value[3],
        ]);

        let mut parsed = Vec::new();
        let mut rest = &attribute.value[4..];
        while !rest.is_empty() {
            if rest.len() < 2 {
                return Err(PacketError::AttributeError(
                    "Truncated vendor sub-attribute header".to_string(),
                ));
            }
            let vendor_type = rest[0];
            // vendor-length includes the two header bytes
            let vendor_length = rest[1] as usize;
            if vendor_length < 2 || vendor_length > rest.len() {
                return Err(PacketError::AttributeError(format!(
                    "Invalid vendor sub-attribute length: {}",
                    vendor_length
                )));
            }
            parsed.push(VendorAttribute {
                vendor_id,
                vendor_type,
                data: rest[2..vendor_length].to_vec(),
            });
            rest = &rest[vendor_length..];
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_attribute_layout() {
        let vsa = VendorAttribute::new(VENDOR_MICROSOFT, MS_CHAP_CHALLENGE, vec![0xAB; 8]);
        let attr = vsa.to_attribute().unwrap();
        assert_eq!(attr.attr_type, 26);
        assert_eq!(&attr.value[0..4], &311u32.to_be_bytes());
        assert_eq!(attr.value[4], MS_CHAP_CHALLENGE);
        assert_eq!(attr.value[5], 10); // 8 data bytes + 2 header bytes
        assert_eq!(&attr.value[6..], &[0xAB; 8]);
    }

    #[test]
    fn test_parse_round_trip() {
        let vsa = VendorAttribute::new(VENDOR_MICROSOFT, MS_CHAP_RESPONSE, vec![1, 2, 3, 4]);
        let attr = vsa.to_attribute().unwrap();
        let parsed = VendorAttribute::parse_all(&attr).unwrap();
        assert_eq!(parsed, vec![vsa]);
    }

    #[test]
    fn test_parse_concatenated_sub_attributes() {
        // two sub-attributes inside one Vendor-Specific value
        let mut value = Vec::new();
        value.extend_from_slice(&VENDOR_MICROSOFT.to_be_bytes());
        value.extend_from_slice(&[11, 4, 0xAA, 0xBB]); // challenge, 2 data bytes
        value.extend_from_slice(&[1, 5, 0x01, 0x02, 0x03]); // response, 3 data bytes
        let attr = Attribute::new(26, value).unwrap();

        let parsed = VendorAttribute::parse_all(&attr).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].vendor_type, 11);
        assert_eq!(parsed[0].data, vec![0xAA, 0xBB]);
        assert_eq!(parsed[1].vendor_type, 1);
        assert_eq!(parsed[1].data, vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_parse_rejects_bad_vendor_length() {
        let mut value = Vec::new();
        value.extend_from_slice(&VENDOR_MICROSOFT.to_be_bytes());
        value.extend_from_slice(&[11, 1]); // vendor-length below header size
        let attr = Attribute::new(26, value).unwrap();
        assert!(VendorAttribute::parse_all(&attr).is_err());
    }
}
