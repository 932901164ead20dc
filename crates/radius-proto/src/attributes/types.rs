/// Wire format of an attribute value, following the RFC 2865 Section 5
/// data-type taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    /// UTF-8 text, 1-253 octets
    Text,
    /// Opaque octets, 1-253 octets
    Binary,
    /// IPv4 address, 4 octets network byte order
    Address,
    /// 32-bit unsigned integer, big-endian
    Integer,
    /// 32-bit Unix epoch seconds, big-endian (RFC 2869)
    Time,
}

/// RADIUS attribute types from RFC 2865, plus EAP-Message (RFC 3579),
/// Message-Authenticator (RFC 2869) and Event-Timestamp (RFC 2869).
///
/// This is deliberately the base dictionary a NAS-side client needs;
/// vendor sub-attributes live in [`super::VendorAttribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    /// User-Name (1)
    UserName = 1,
    /// User-Password (2)
    UserPassword = 2,
    /// CHAP-Password (3)
    ChapPassword = 3,
    /// NAS-IP-Address (4)
    NasIpAddress = 4,
    /// NAS-Port (5)
    NasPort = 5,
    /// Service-Type (6)
    ServiceType = 6,
    /// Framed-Protocol (7)
    FramedProtocol = 7,
    /// Framed-IP-Address (8)
    FramedIpAddress = 8,
    /// Framed-IP-Netmask (9)
    FramedIpNetmask = 9,
    /// Framed-Routing (10)
    FramedRouting = 10,
    /// Filter-Id (11)
    FilterId = 11,
    /// Framed-MTU (12)
    FramedMtu = 12,
    /// Framed-Compression (13)
    FramedCompression = 13,
    /// Login-IP-Host (14)
    LoginIpHost = 14,
    /// Login-Service (15)
    LoginService = 15,
    /// Login-TCP-Port (16)
    LoginTcpPort = 16,
    /// Reply-Message (18)
    ReplyMessage = 18,
    /// Callback-Number (19)
    CallbackNumber = 19,
    /// Callback-Id (20)
    CallbackId = 20,
    /// Framed-Route (22)
    FramedRoute = 22,
    /// Framed-IPX-Network (23)
    FramedIpxNetwork = 23,
    /// State (24)
    State = 24,
    /// Class (25)
    Class = 25,
    /// Vendor-Specific (26)
    VendorSpecific = 26,
    /// Session-Timeout (27)
    SessionTimeout = 27,
    /// Idle-Timeout (28)
    IdleTimeout = 28,
    /// Termination-Action (29)
    TerminationAction = 29,
    /// Called-Station-Id (30)
    CalledStationId = 30,
    /// Calling-Station-Id (31)
    CallingStationId = 31,
    /// NAS-Identifier (32)
    NasIdentifier = 32,
    /// Proxy-State (33)
    ProxyState = 33,
    /// Login-LAT-Service (34)
    LoginLatService = 34,
    /// Login-LAT-Node (35)
    LoginLatNode = 35,
    /// Login-LAT-Group (36)
    LoginLatGroup = 36,
    /// Framed-AppleTalk-Link (37)
    FramedAppleTalkLink = 37,
    /// Framed-AppleTalk-Network (38)
    FramedAppleTalkNetwork = 38,
    /// Framed-AppleTalk-Zone (39)
    FramedAppleTalkZone = 39,
    /// Event-Timestamp (55) - RFC 2869
    EventTimestamp = 55,
    /// CHAP-Challenge (60)
    ChapChallenge = 60,
    /// NAS-Port-Type (61)
    NasPortType = 61,
    /// Port-Limit (62)
    PortLimit = 62,
    /// Login-LAT-Port (63)
    LoginLatPort = 63,
    /// EAP-Message (79) - RFC 3579
    EapMessage = 79,
    /// Message-Authenticator (80) - RFC 2869
    MessageAuthenticator = 80,
}

impl AttributeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::lookup(value).map(|(t, _, _)| t)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Dictionary name of this attribute
    pub fn name(self) -> &'static str {
        Self::lookup(self as u8)
            .map(|(_, name, _)| name)
            .unwrap_or("Unknown")
    }

    /// Wire format of this attribute's value
    pub fn format(self) -> AttributeFormat {
        Self::lookup(self as u8)
            .map(|(_, _, format)| format)
            .unwrap_or(AttributeFormat::Binary)
    }

    /// Vendor-Specific (26) and EAP-Message (79) may appear multiple times
    /// per packet; all other types are single-valued.
    pub fn is_multi_valued(value: u8) -> bool {
        matches!(value, 26 | 79)
    }

    /// Static dictionary lookup: number -> (type, name, format)
    pub fn lookup(value: u8) -> Option<(Self, &'static str, AttributeFormat)> {
        use AttributeFormat::*;
        use AttributeType::*;
        Some(match value {
            1 => (UserName, "User-Name", Text),
            2 => (UserPassword, "User-Password", Binary),
            3 => (ChapPassword, "CHAP-Password", Binary),
            4 => (NasIpAddress, "NAS-IP-Address", Address),
            5 => (NasPort, "NAS-Port", Integer),
            6 => (ServiceType, "Service-Type", Integer),
            7 => (FramedProtocol, "Framed-Protocol", Integer),
            8 => (FramedIpAddress, "Framed-IP-Address", Address),
            9 => (FramedIpNetmask, "Framed-IP-Netmask", Address),
            10 => (FramedRouting, "Framed-Routing", Integer),
            11 => (FilterId, "Filter-Id", Text),
            12 => (FramedMtu, "Framed-MTU", Integer),
            13 => (FramedCompression, "Framed-Compression", Integer),
            14 => (LoginIpHost, "Login-IP-Host", Address),
            15 => (LoginService, "Login-Service", Integer),
            16 => (LoginTcpPort, "Login-TCP-Port", Integer),
            18 => (ReplyMessage, "Reply-Message", Text),
            19 => (CallbackNumber, "Callback-Number", Text),
            20 => (CallbackId, "Callback-Id", Text),
            22 => (FramedRoute, "Framed-Route", Text),
            23 => (FramedIpxNetwork, "Framed-IPX-Network", Integer),
            24 => (State, "State", Binary),
            25 => (Class, "Class", Binary),
            26 => (VendorSpecific, "Vendor-Specific", Binary),
            27 => (SessionTimeout, "Session-Timeout", Integer),
            28 => (IdleTimeout, "Idle-Timeout", Integer),
            29 => (TerminationAction, "Termination-Action", Integer),
            30 => (CalledStationId, "Called-Station-Id", Text),
            31 => (CallingStationId, "Calling-Station-Id", Text),
            32 => (NasIdentifier, "NAS-Identifier", Text),
            33 => (ProxyState, "Proxy-State", Binary),
            34 => (LoginLatService, "Login-LAT-Service", Text),
            35 => (LoginLatNode, "Login-LAT-Node", Text),
            36 => (LoginLatGroup, "Login-LAT-Group", Binary),
            37 => (FramedAppleTalkLink, "Framed-AppleTalk-Link", Integer),
            38 => (FramedAppleTalkNetwork, "Framed-AppleTalk-Network", Integer),
            39 => (FramedAppleTalkZone, "Framed-AppleTalk-Zone", Text),
            55 => (EventTimestamp, "Event-Timestamp", Time),
            60 => (ChapChallenge, "CHAP-Challenge", Binary),
            61 => (NasPortType, "NAS-Port-Type", Integer),
            62 => (PortLimit, "Port-Limit", Integer),
            63 => (LoginLatPort, "Login-LAT-Port", Text),
            79 => (EapMessage, "EAP-Message", Binary),
            80 => (MessageAuthenticator, "Message-Authenticator", Binary),
            _ => return None,
        })
    }
}
