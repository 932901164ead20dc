//! The RADIUS authentication client
//!
//! A [`Client`] holds the long-lived configuration (servers, shared secret,
//! ports, timeout, default attributes) and the packet-id counter; every
//! authenticate call builds its own [`Transaction`] so concurrent state never
//! leaks between calls. Operations return `bool` and leave the observable
//! outcome in the last-error accessors, the way a NAS integration consumes
//! them.

use crate::error::ClientError;
use crate::session::EapMsChapV2Flow;
use crate::transaction::{upsert_attribute, IdCounter, ReceivedPacket, Transaction};
use crate::transport::UdpTransport;
use radius_proto::auth::encrypt_user_password;
use radius_proto::chap::chap_password;
use radius_proto::mschap;
use radius_proto::{
    Attribute, AttributeType, Code, VendorAttribute, MS_CHAP_CHALLENGE, MS_CHAP_RESPONSE,
    VENDOR_MICROSOFT,
};
use rand::Rng;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, warn};

/// Default authentication port (RFC 2865)
pub const DEFAULT_AUTH_PORT: u16 = 1812;
/// Default accounting port (RFC 2866); carried for completeness
pub const DEFAULT_ACCT_PORT: u16 = 1813;
/// Default per-exchange deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Service-Type value Login (RFC 2865 Section 5.6)
const SERVICE_TYPE_LOGIN: u32 = 1;

/// RADIUS client for PAP, CHAP-MD5, MS-CHAP v1 and EAP-MSCHAPv2
/// authentication against one server or an ordered failover list.
///
/// # Example
///
/// ```no_run
/// use radius_client::Client;
///
/// let mut client = Client::new("10.0.0.1", "xyzzy");
/// client.set_username_suffix("@example.com");
/// if client.authenticate_pap("alice", "password", None) {
///     println!("accepted");
/// } else {
///     println!("denied: {} ({})", client.last_error_message(), client.last_error_code());
/// }
/// ```
#[derive(Debug)]
pub struct Client {
    servers: Vec<String>,
    secret: String,
    auth_port: u16,
    acct_port: u16,
    timeout: Duration,
    suffix: String,
    include_message_authenticator: bool,
    defaults: Vec<Attribute>,
    ids: IdCounter,
    last_error: Option<ClientError>,
    received: Option<ReceivedPacket>,
}

impl Client {
    /// Create a client for one server with the given shared secret
    pub fn new(server: impl Into<String>, secret: impl Into<String>) -> Self {
        Client {
            servers: vec![server.into()],
            secret: secret.into(),
            auth_port: DEFAULT_AUTH_PORT,
            acct_port: DEFAULT_ACCT_PORT,
            timeout: DEFAULT_TIMEOUT,
            suffix: String::new(),
            include_message_authenticator: false,
            defaults: Vec::new(),
            ids: IdCounter::new(rand::rng().random()),
            last_error: None,
            received: None,
        }
    }

    // === Configuration ===

    /// Append a failover server sharing the same secret
    ///
    /// An entry may carry its own port as `host:port`; otherwise the
    /// client's auth port applies.
    pub fn add_server(&mut self, server: impl Into<String>) {
        self.servers.push(server.into());
    }

    /// Replace the server list
    pub fn set_servers(&mut self, servers: Vec<String>) {
        self.servers = servers;
    }

    /// Suffix appended to usernames that do not already carry a realm
    pub fn set_username_suffix(&mut self, suffix: impl Into<String>) {
        self.suffix = suffix.into();
    }

    /// Wall-clock deadline for each request/response exchange
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_auth_port(&mut self, port: u16) {
        self.auth_port = port;
    }

    pub fn set_acct_port(&mut self, port: u16) {
        self.acct_port = port;
    }

    pub fn acct_port(&self) -> u16 {
        self.acct_port
    }

    /// Add NAS-IP-Address to every request built by this client
    pub fn set_nas_ip_address(&mut self, addr: Ipv4Addr) {
        let attr = Attribute::ipv4(AttributeType::NasIpAddress as u8, addr)
            .expect("4-byte value is within bounds");
        upsert_attribute(&mut self.defaults, attr);
    }

    /// Add NAS-Port to every request built by this client
    pub fn set_nas_port(&mut self, port: u32) {
        let attr = Attribute::integer(AttributeType::NasPort as u8, port)
            .expect("4-byte value is within bounds");
        upsert_attribute(&mut self.defaults, attr);
    }

    /// Add an arbitrary default attribute; multi-valued types append,
    /// the rest replace a previous value of the same type
    pub fn set_attribute(&mut self, attribute: Attribute) {
        upsert_attribute(&mut self.defaults, attribute);
    }

    /// Add a default Vendor-Specific sub-attribute
    pub fn set_vendor_attribute(
        &mut self,
        vendor_id: u32,
        vendor_type: u8,
        data: Vec<u8>,
    ) -> Result<(), ClientError> {
        let attr = VendorAttribute::new(vendor_id, vendor_type, data)
            .to_attribute()
            .map_err(|e| ClientError::BadArgument(e.to_string()))?;
        self.defaults.push(attr);
        Ok(())
    }

    /// Sign PAP/CHAP requests with Message-Authenticator too (EAP-bearing
    /// and MS-CHAP requests are always signed)
    pub fn set_include_message_authenticator(&mut self, include: bool) {
        self.include_message_authenticator = include;
    }

    // === Outcome accessors ===

    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    /// Numeric code of the last failure, 0 after a success
    pub fn last_error_code(&self) -> u8 {
        self.last_error.as_ref().map(ClientError::code).unwrap_or(0)
    }

    /// Human-readable message of the last failure, empty after a success
    pub fn last_error_message(&self) -> String {
        self.last_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// RADIUS code of the last received packet
    pub fn received_packet_code(&self) -> Option<u8> {
        self.received.as_ref().map(|r| r.code.as_u8())
    }

    /// Attributes of the last received packet
    pub fn received_attributes(&self) -> &[Attribute] {
        self.received
            .as_ref()
            .map(|r| r.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// First received attribute of the given type
    pub fn received_attribute(&self, attr_type: u8) -> Option<&Attribute> {
        self.received_attributes()
            .iter()
            .find(|a| a.attr_type == attr_type)
    }

    /// The server's Reply-Message text, if the last response carried one
    pub fn reply_message(&self) -> Option<String> {
        self.received_attribute(AttributeType::ReplyMessage as u8)
            .and_then(|a| a.as_text().ok())
    }

    // === Authentication operations ===

    /// PAP: User-Name plus the obfuscated User-Password, one round trip
    pub fn authenticate_pap(
        &mut self,
        username: &str,
        password: &str,
        state: Option<&[u8]>,
    ) -> bool {
        let username = match self.validated_username(username) {
            Ok(u) => u,
            Err(e) => return self.fail(e),
        };
        let state = state.map(<[u8]>::to_vec);

        self.run_on_servers(|client, transport, txn| {
            let authenticator = txn.begin_request(client.ids.next());
            txn.set_attribute(Attribute::text(AttributeType::UserName as u8, username.clone())?);
            txn.set_attribute(Attribute::new(
                AttributeType::UserPassword as u8,
                encrypt_user_password(password, client.secret.as_bytes(), &authenticator),
            )?);
            txn.set_attribute(Attribute::integer(
                AttributeType::ServiceType as u8,
                SERVICE_TYPE_LOGIN,
            )?);
            if let Some(ref state) = state {
                txn.set_attribute(Attribute::new(AttributeType::State as u8, state.clone())?);
            }

            let bytes = txn.encode_request(
                Code::AccessRequest,
                client.secret.as_bytes(),
                client.include_message_authenticator,
            )?;
            let reply = transport.exchange(&bytes)?;
            txn.record_response(reply, client.secret.as_bytes())?;
            expect_accept(txn)
        })
    }

    /// CHAP-MD5: the CHAP response is computed against the request's own
    /// Request-Authenticator, with the packet identifier as CHAP identifier
    pub fn authenticate_chap(&mut self, username: &str, password: &str) -> bool {
        let username = match self.validated_username(username) {
            Ok(u) => u,
            Err(e) => return self.fail(e),
        };

        self.run_on_servers(|client, transport, txn| {
            let authenticator = txn.begin_request(client.ids.next());
            let chap_id = txn.identifier();
            txn.set_attribute(Attribute::text(AttributeType::UserName as u8, username.clone())?);
            txn.set_attribute(Attribute::new(
                AttributeType::ChapPassword as u8,
                chap_password(chap_id, password, &authenticator),
            )?);

            let bytes = txn.encode_request(
                Code::AccessRequest,
                client.secret.as_bytes(),
                client.include_message_authenticator,
            )?;
            let reply = transport.exchange(&bytes)?;
            txn.record_response(reply, client.secret.as_bytes())?;
            expect_accept(txn)
        })
    }

    /// MS-CHAP v1: NT response over a locally generated 8-byte challenge,
    /// carried in Microsoft vendor attributes, always signed with
    /// Message-Authenticator
    pub fn authenticate_ms_chap_v1(&mut self, username: &str, password: &str) -> bool {
        let username = match self.validated_username(username) {
            Ok(u) => u,
            Err(e) => return self.fail(e),
        };

        self.run_on_servers(|client, transport, txn| {
            txn.begin_request(client.ids.next());
            txn.set_attribute(Attribute::text(AttributeType::UserName as u8, username.clone())?);

            let challenge = mschap::generate_v1_challenge();
            let nt_response = mschap::generate_nt_response_v1(&challenge, password);
            txn.set_attribute(
                VendorAttribute::new(VENDOR_MICROSOFT, MS_CHAP_CHALLENGE, challenge.to_vec())
                    .to_attribute()?,
            );
            txn.set_attribute(
                VendorAttribute::new(
                    VENDOR_MICROSOFT,
                    MS_CHAP_RESPONSE,
                    mschap::v1_response_attribute(&nt_response).to_vec(),
                )
                .to_attribute()?,
            );

            let bytes = txn.encode_request(Code::AccessRequest, client.secret.as_bytes(), true)?;
            let reply = transport.exchange(&bytes)?;
            txn.record_response(reply, client.secret.as_bytes())?;
            expect_accept(txn)
        })
    }

    /// EAP-MSCHAPv2: the full multi-round exchange, NAKing a PEAP proposal
    /// back to MS-CHAP-V2 when needed
    pub fn authenticate_eap_ms_chap_v2(&mut self, username: &str, password: &str) -> bool {
        self.eap_ms_chap_v2(username, password, None)
    }

    /// EAP-MSCHAPv2 with the RFC 2759 change-password sub-flow armed: when
    /// the server reports an expired password (E=648), the new password is
    /// submitted over the challenge from the failure packet
    pub fn change_password_eap_ms_chap_v2(
        &mut self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> bool {
        if new_password.is_empty() {
            return self.fail(ClientError::BadArgument(
                "new password must not be empty".to_string(),
            ));
        }
        self.eap_ms_chap_v2(username, old_password, Some(new_password))
    }

    fn eap_ms_chap_v2(
        &mut self,
        username: &str,
        password: &str,
        new_password: Option<&str>,
    ) -> bool {
        let username = match self.validated_username(username) {
            Ok(u) => u,
            Err(e) => return self.fail(e),
        };

        self.run_on_servers(|client, transport, txn| {
            txn.set_attribute(Attribute::text(AttributeType::UserName as u8, username.clone())?);
            EapMsChapV2Flow {
                transport,
                transaction: txn,
                ids: &mut client.ids,
                secret: client.secret.as_bytes(),
                username: username.as_str(),
                password,
                new_password,
            }
            .run()
        })
    }

    // === Internals ===

    /// Apply the suffix policy: usernames already carrying `@` are used
    /// verbatim, everything else gets the configured suffix appended
    fn qualified_username(&self, username: &str) -> String {
        if username.contains('@') || self.suffix.is_empty() {
            username.to_string()
        } else {
            format!("{}{}", username, self.suffix)
        }
    }

    fn validated_username(&self, username: &str) -> Result<String, ClientError> {
        if username.is_empty() {
            return Err(ClientError::BadArgument(
                "username must not be empty".to_string(),
            ));
        }
        Ok(self.qualified_username(username))
    }

    fn fail(&mut self, err: ClientError) -> bool {
        self.received = None;
        self.last_error = Some(err);
        false
    }

    /// Run one authentication flow against the server list in order
    ///
    /// Access-Accept and Access-Reject are both final; every other failure
    /// rewinds the transaction to its pre-call attribute snapshot and moves
    /// on to the next server.
    fn run_on_servers(
        &mut self,
        mut flow: impl FnMut(&mut Self, &UdpTransport, &mut Transaction) -> Result<(), ClientError>,
    ) -> bool {
        self.last_error = None;
        self.received = None;

        let servers = self.servers.clone();
        if servers.is_empty() {
            return self.fail(ClientError::BadArgument(
                "no servers configured".to_string(),
            ));
        }

        let mut transaction = Transaction::new(&self.defaults);
        let mut outcome = Err(ClientError::Socket("no server attempted".to_string()));

        for (index, server) in servers.iter().enumerate() {
            transaction.reset();

            let (host, port) = split_server_entry(server, self.auth_port);
            let transport = match UdpTransport::connect(host, port, self.timeout) {
                Ok(transport) => transport,
                Err(err) => {
                    warn!(server = %server, error = %err, "server unreachable");
                    outcome = Err(err);
                    continue;
                }
            };

            let result = flow(self, &transport, &mut transaction);
            self.received = transaction.take_received();

            match result {
                Ok(()) => {
                    outcome = Ok(());
                    break;
                }
                Err(err) if !err.is_retryable() => {
                    outcome = Err(err);
                    break;
                }
                Err(err) => {
                    if index + 1 < servers.len() {
                        debug!(server = %server, error = %err, "failing over to next server");
                    }
                    outcome = Err(err);
                }
            }
        }

        match outcome {
            Ok(()) => true,
            Err(err) => {
                self.last_error = Some(err);
                false
            }
        }
    }
}

/// Split a `host:port` server entry; entries without a parseable port use
/// the client-wide default
fn split_server_entry(server: &str, default_port: u16) -> (&str, u16) {
    match server.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host, port),
            Err(_) => (server, default_port),
        },
        None => (server, default_port),
    }
}

fn expect_accept(txn: &Transaction) -> Result<(), ClientError> {
    match txn.received().map(|r| r.code) {
        Some(Code::AccessAccept) => Ok(()),
        Some(Code::AccessReject) => Err(ClientError::Rejected("Access rejected".to_string())),
        Some(other) => Err(ClientError::Protocol(format!(
            "unexpected response: {:?}",
            other
        ))),
        None => Err(ClientError::Protocol("no response recorded".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_policy() {
        let mut client = Client::new("127.0.0.1", "secret");
        client.set_username_suffix(".x");
        assert_eq!(client.qualified_username("a"), "a.x");
        assert_eq!(client.qualified_username("a@b"), "a@b");

        client.set_username_suffix("");
        assert_eq!(client.qualified_username("a"), "a");
    }

    #[test]
    fn test_no_error_after_construction() {
        let client = Client::new("127.0.0.1", "secret");
        assert_eq!(client.last_error_code(), 0);
        assert_eq!(client.last_error_message(), "");
        assert_eq!(client.received_packet_code(), None);
        assert!(client.received_attributes().is_empty());
    }

    #[test]
    fn test_empty_username_is_bad_argument() {
        let mut client = Client::new("127.0.0.1", "secret");
        assert!(!client.authenticate_pap("", "pw", None));
        assert_eq!(client.last_error_code(), 127);
    }

    #[test]
    fn test_empty_new_password_is_bad_argument() {
        let mut client = Client::new("127.0.0.1", "secret");
        assert!(!client.change_password_eap_ms_chap_v2("alice", "old", ""));
        assert_eq!(client.last_error_code(), 127);
    }

    #[test]
    fn test_default_attributes_replace_semantics() {
        let mut client = Client::new("127.0.0.1", "secret");
        client.set_nas_port(1);
        client.set_nas_port(2);
        client.set_nas_ip_address(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(client.defaults.len(), 2);
        assert_eq!(client.defaults[0].as_integer(), Some(2));
    }

    #[test]
    fn test_vendor_attribute_appends() {
        let mut client = Client::new("127.0.0.1", "secret");
        client.set_vendor_attribute(311, 11, vec![1, 2]).unwrap();
        client.set_vendor_attribute(311, 11, vec![3, 4]).unwrap();
        assert_eq!(client.defaults.len(), 2);
        assert!(client.set_vendor_attribute(311, 1, vec![0; 300]).is_err());
    }

    #[test]
    fn test_server_entry_parsing() {
        assert_eq!(split_server_entry("10.0.0.1", 1812), ("10.0.0.1", 1812));
        assert_eq!(split_server_entry("10.0.0.1:2812", 1812), ("10.0.0.1", 2812));
        assert_eq!(
            split_server_entry("radius.example.com:abc", 1812),
            ("radius.example.com:abc", 1812)
        );
    }

    #[test]
    fn test_ports_and_timeout_defaults() {
        let client = Client::new("127.0.0.1", "secret");
        assert_eq!(client.auth_port, DEFAULT_AUTH_PORT);
        assert_eq!(client.acct_port(), DEFAULT_ACCT_PORT);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
    }
}
