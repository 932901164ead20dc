//! Per-call transaction state and the Access-Request builder
//!
//! A [`Transaction`] is created for one authenticate call and discarded when
//! it returns. It owns the ordered attribute list, the identifier and
//! Request-Authenticator of the request in flight, and the decoded response.
//! The attribute list the call started with is kept as a snapshot so a
//! server-list failover can put the transaction back exactly where it began.

use crate::error::ClientError;
use radius_proto::auth::{generate_request_authenticator, verify_response_authenticator};
use radius_proto::{
    calculate_message_authenticator, verify_message_authenticator, Attribute, AttributeType, Code,
    Packet,
};

/// Wrapping packet-identifier counter shared by a client's transactions
///
/// Identifiers increment mod 256 across successive requests.
#[derive(Debug)]
pub struct IdCounter {
    next: u8,
}

impl IdCounter {
    pub fn new(start: u8) -> Self {
        IdCounter { next: start }
    }

    pub fn next(&mut self) -> u8 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// A decoded, authenticator-verified response
#[derive(Debug, Clone)]
pub struct ReceivedPacket {
    pub code: Code,
    pub identifier: u8,
    pub authenticator: [u8; 16],
    pub attributes: Vec<Attribute>,
    /// The raw datagram, kept for Message-Authenticator checks
    pub raw: Vec<u8>,
}

#[derive(Debug)]
pub struct Transaction {
    identifier: u8,
    request_authenticator: [u8; 16],
    attributes: Vec<Attribute>,
    snapshot: Vec<Attribute>,
    received: Option<ReceivedPacket>,
}

impl Transaction {
    /// Start a transaction from the client's default attributes
    pub fn new(defaults: &[Attribute]) -> Self {
        Transaction {
            identifier: 0,
            request_authenticator: [0u8; 16],
            attributes: defaults.to_vec(),
            snapshot: defaults.to_vec(),
            received: None,
        }
    }

    /// Begin a new request round: assign the packet identifier and draw a
    /// fresh Request-Authenticator
    ///
    /// Returns the authenticator so password hiding can be keyed on it.
    pub fn begin_request(&mut self, identifier: u8) -> [u8; 16] {
        self.identifier = identifier;
        self.request_authenticator = generate_request_authenticator();
        self.request_authenticator
    }

    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    pub fn request_authenticator(&self) -> &[u8; 16] {
        &self.request_authenticator
    }

    /// Set an attribute with dictionary semantics: Vendor-Specific and
    /// EAP-Message append, every other type replaces an existing instance
    pub fn set_attribute(&mut self, attribute: Attribute) {
        upsert_attribute(&mut self.attributes, attribute);
    }

    /// Drop every instance of an attribute type
    pub fn remove_attributes(&mut self, attr_type: u8) {
        self.attributes.retain(|a| a.attr_type != attr_type);
    }

    /// Replace the EAP-Message fragments with a new set
    pub fn set_eap_message(&mut self, fragments: Vec<Attribute>) {
        self.remove_attributes(AttributeType::EapMessage as u8);
        self.attributes.extend(fragments);
    }

    /// Rewind the attribute list to the pre-call snapshot and forget any
    /// response, for the next server in a failover list
    pub fn reset(&mut self) {
        self.attributes = self.snapshot.clone();
        self.received = None;
    }

    /// Serialize an Access-Request from the current attribute list
    ///
    /// With `sign`, a zeroed Message-Authenticator is (re)placed on the
    /// packet first, then the HMAC-MD5 over the serialized datagram is
    /// written back over the zeros.
    pub fn encode_request(
        &mut self,
        code: Code,
        secret: &[u8],
        sign: bool,
    ) -> Result<Vec<u8>, ClientError> {
        if sign {
            self.remove_attributes(AttributeType::MessageAuthenticator as u8);
            self.attributes.push(
                Attribute::new(AttributeType::MessageAuthenticator as u8, vec![0u8; 16])
                    .expect("16-byte value is within bounds"),
            );
        }

        let mut packet = Packet::new(code, self.identifier, self.request_authenticator);
        packet.attributes = self.attributes.clone();
        let mut bytes = packet.encode()?;

        if sign {
            backfill_message_authenticator(&mut bytes, secret);
        }
        Ok(bytes)
    }

    /// Decode and verify a response datagram
    ///
    /// The identifier must echo the request's and the Response-Authenticator
    /// must check out against the pending Request-Authenticator before the
    /// packet is accepted.
    pub fn record_response(&mut self, raw: Vec<u8>, secret: &[u8]) -> Result<(), ClientError> {
        if raw.len() < Packet::MIN_PACKET_SIZE {
            return Err(ClientError::InvalidResponse(format!(
                "short datagram: {} bytes",
                raw.len()
            )));
        }
        if raw[1] != self.identifier {
            return Err(ClientError::InvalidResponse(format!(
                "identifier mismatch: sent {}, got {}",
                self.identifier, raw[1]
            )));
        }
        if !verify_response_authenticator(&raw, &self.request_authenticator, secret) {
            return Err(ClientError::AuthenticatorMismatch);
        }
        // replies are not required to carry Message-Authenticator, but one
        // that does must verify; per RFC 3579 the reply HMAC is keyed over
        // the Request-Authenticator, not the Response-Authenticator
        if let Some(offset) = message_authenticator_offset(&raw) {
            let mut check = raw.clone();
            check[4..20].copy_from_slice(&self.request_authenticator);
            if !verify_message_authenticator(&check, secret, offset) {
                return Err(ClientError::AuthenticatorMismatch);
            }
        }

        let packet = Packet::decode(&raw)?;
        self.received = Some(ReceivedPacket {
            code: packet.code,
            identifier: packet.identifier,
            authenticator: packet.authenticator,
            attributes: packet.attributes,
            raw,
        });
        Ok(())
    }

    pub fn received(&self) -> Option<&ReceivedPacket> {
        self.received.as_ref()
    }

    pub fn take_received(&mut self) -> Option<ReceivedPacket> {
        self.received.take()
    }
}

/// Replace-or-append an attribute in an ordered list: multi-valued types
/// (Vendor-Specific, EAP-Message) always append, the rest replace the
/// existing instance in place
pub(crate) fn upsert_attribute(attributes: &mut Vec<Attribute>, attribute: Attribute) {
    if !AttributeType::is_multi_valued(attribute.attr_type) {
        if let Some(existing) = attributes
            .iter_mut()
            .find(|a| a.attr_type == attribute.attr_type)
        {
            *existing = attribute;
            return;
        }
    }
    attributes.push(attribute);
}

/// Byte offset of the Message-Authenticator value in a serialized packet
fn message_authenticator_offset(bytes: &[u8]) -> Option<usize> {
    let mut pos = Packet::MIN_PACKET_SIZE;
    while pos + 2 <= bytes.len() {
        let attr_type = bytes[pos];
        let attr_len = bytes[pos + 1] as usize;
        if attr_len < 2 || pos + attr_len > bytes.len() {
            return None;
        }
        if attr_type == AttributeType::MessageAuthenticator as u8 && attr_len == 18 {
            return Some(pos + 2);
        }
        pos += attr_len;
    }
    None
}

/// Overwrite the zeroed Message-Authenticator value with HMAC-MD5 over the
/// whole datagram
fn backfill_message_authenticator(bytes: &mut [u8], secret: &[u8]) {
    if let Some(offset) = message_authenticator_offset(bytes) {
        let mac = calculate_message_authenticator(bytes, secret);
        bytes[offset..offset + 16].copy_from_slice(&mac);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radius_proto::auth::calculate_response_authenticator;
    use radius_proto::verify_message_authenticator;

    #[test]
    fn test_id_counter_wraps_mod_256() {
        let mut ids = IdCounter::new(250);
        let seq: Vec<u8> = (0..10).map(|_| ids.next()).collect();
        assert_eq!(seq, vec![250, 251, 252, 253, 254, 255, 0, 1, 2, 3]);
    }

    #[test]
    fn test_set_attribute_replaces_single_valued() {
        let mut txn = Transaction::new(&[]);
        txn.set_attribute(Attribute::text(1, "first").unwrap());
        txn.set_attribute(Attribute::text(1, "second").unwrap());

        let bytes = {
            txn.begin_request(1);
            txn.encode_request(Code::AccessRequest, b"s", false).unwrap()
        };
        let packet = Packet::decode(&bytes).unwrap();
        let names = packet.find_all_attributes(1);
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].as_text().unwrap(), "second");
    }

    #[test]
    fn test_set_attribute_appends_multi_valued() {
        let mut txn = Transaction::new(&[]);
        txn.set_attribute(Attribute::new(79, vec![1]).unwrap());
        txn.set_attribute(Attribute::new(79, vec![2]).unwrap());
        txn.begin_request(1);
        let bytes = txn.encode_request(Code::AccessRequest, b"s", false).unwrap();
        let packet = Packet::decode(&bytes).unwrap();
        assert_eq!(packet.find_all_attributes(79).len(), 2);
    }

    #[test]
    fn test_message_authenticator_fixpoint() {
        let mut txn = Transaction::new(&[]);
        txn.set_attribute(Attribute::text(1, "alice").unwrap());
        txn.begin_request(9);
        let bytes = txn.encode_request(Code::AccessRequest, b"xyzzy", true).unwrap();

        // find the attribute's value offset and verify the HMAC fixpoint
        let mut pos = 20;
        let mut offset = None;
        while pos + 2 <= bytes.len() {
            if bytes[pos] == 80 {
                offset = Some(pos + 2);
                break;
            }
            pos += bytes[pos + 1] as usize;
        }
        assert!(verify_message_authenticator(&bytes, b"xyzzy", offset.unwrap()));
    }

    #[test]
    fn test_record_response_checks_identifier_and_authenticator() {
        let secret = b"xyzzy";
        let mut txn = Transaction::new(&[]);
        let req_auth = txn.begin_request(7);

        let mut reply = vec![2u8, 7, 0, 20];
        reply.extend_from_slice(&[0u8; 16]);
        let auth = calculate_response_authenticator(&reply, &req_auth, secret).unwrap();
        reply[4..20].copy_from_slice(&auth);

        // wrong identifier
        let mut wrong_id = reply.clone();
        wrong_id[1] = 8;
        assert!(matches!(
            txn.record_response(wrong_id, secret),
            Err(ClientError::InvalidResponse(_))
        ));

        // flipped authenticator bit
        let mut tampered = reply.clone();
        tampered[4] ^= 1;
        assert_eq!(
            txn.record_response(tampered, secret),
            Err(ClientError::AuthenticatorMismatch)
        );

        // pristine reply is accepted
        txn.record_response(reply, secret).unwrap();
        assert_eq!(txn.received().unwrap().code, Code::AccessAccept);
    }

    #[test]
    fn test_reply_message_authenticator_verified_when_present() {
        let secret = b"xyzzy";
        let mut txn = Transaction::new(&[]);
        let req_auth = txn.begin_request(3);

        // reply carrying a zeroed Message-Authenticator shell
        let mut reply = vec![11u8, 3, 0, 38];
        reply.extend_from_slice(&[0u8; 16]);
        reply.extend_from_slice(&[80, 18]);
        reply.extend_from_slice(&[0u8; 16]);

        // RFC 3579: HMAC over the reply with the Request-Authenticator in
        // the authenticator field
        let mut hmac_input = reply.clone();
        hmac_input[4..20].copy_from_slice(&req_auth);
        let mac = radius_proto::calculate_message_authenticator(&hmac_input, secret);
        reply[22..38].copy_from_slice(&mac);

        let auth = calculate_response_authenticator(&reply, &req_auth, secret).unwrap();
        reply[4..20].copy_from_slice(&auth);

        let mut tampered = reply.clone();
        tampered[22] ^= 0xFF;
        // recompute the outer authenticator so only the HMAC is wrong
        tampered[4..20].fill(0);
        let tampered_auth =
            calculate_response_authenticator(&tampered, &req_auth, secret).unwrap();
        tampered[4..20].copy_from_slice(&tampered_auth);
        assert_eq!(
            txn.record_response(tampered, secret),
            Err(ClientError::AuthenticatorMismatch)
        );

        txn.record_response(reply, secret).unwrap();
        assert_eq!(txn.received().unwrap().code, Code::AccessChallenge);
    }

    #[test]
    fn test_reset_restores_snapshot() {
        let defaults = vec![Attribute::integer(5, 20).unwrap()];
        let mut txn = Transaction::new(&defaults);
        txn.set_attribute(Attribute::text(1, "alice").unwrap());
        txn.set_attribute(Attribute::new(24, vec![9, 9]).unwrap());
        txn.reset();

        txn.begin_request(1);
        let bytes = txn.encode_request(Code::AccessRequest, b"s", false).unwrap();
        let packet = Packet::decode(&bytes).unwrap();
        assert_eq!(packet.attributes.len(), 1);
        assert_eq!(packet.attributes[0].attr_type, 5);
    }
}
