//! The EAP-MSCHAPv2 session engine
//!
//! Drives the multi-round Access-Request / Access-Challenge conversation:
//! identity, an optional legacy-NAK when the server proposes PEAP, the
//! MS-CHAP-V2 challenge/response round, the RFC 2759 change-password
//! sub-flow on an expired password, and the closing EAP Success round.
//!
//! Round-to-round state (the echoed State attribute, the authenticator
//! challenge, the MS-CHAPv2 identifier) lives in the flow and its
//! [`Transaction`], never on the client itself.

use crate::error::ClientError;
use crate::transaction::{IdCounter, Transaction};
use crate::transport::UdpTransport;
use radius_proto::chap::chap_password;
use radius_proto::eap::ms_chap_v2::{self, OpCode, SubPacket, ERROR_PASSWD_EXPIRED};
use radius_proto::eap::{EapCode, EapPacket, EapType};
use radius_proto::mschap;
use radius_proto::{Attribute, AttributeType, Code};
use tracing::debug;

/// EAP identifier of the unsolicited identity response; later rounds echo
/// the server's identifiers
const INITIAL_EAP_ID: u8 = 1;

enum FlowState {
    AwaitChallenge {
        nak_sent: bool,
    },
    AwaitVerdict {
        auth_challenge: [u8; 16],
        ms_chap_id: u8,
    },
    AwaitFinal {
        ms_chap_id: u8,
    },
}

pub(crate) struct EapMsChapV2Flow<'a> {
    pub transport: &'a UdpTransport,
    pub transaction: &'a mut Transaction,
    pub ids: &'a mut IdCounter,
    pub secret: &'a [u8],
    /// Username with the suffix policy already applied
    pub username: &'a str,
    pub password: &'a str,
    /// Set only by the change-password entry point
    pub new_password: Option<&'a str>,
}

impl<'a> EapMsChapV2Flow<'a> {
    /// Run the state machine to a terminal verdict
    ///
    /// Ok(()) is Access-Accept; every other outcome is an error carrying
    /// the observable code and message.
    pub fn run(mut self) -> Result<(), ClientError> {
        let identity = EapPacket::identity_response(INITIAL_EAP_ID, self.username);
        self.send_eap_round(&identity)?;

        let mut state = FlowState::AwaitChallenge { nak_sent: false };
        loop {
            state = match state {
                FlowState::AwaitChallenge { nak_sent } => {
                    let eap = self.expect_challenge_eap()?;
                    match eap.eap_type {
                        Some(EapType::Md5Challenge) => {
                            return self.finish_with_chap(eap.identifier);
                        }
                        Some(EapType::Peap) if !nak_sent => {
                            debug!("server proposed PEAP, sending legacy NAK for MS-CHAP-V2");
                            let nak = EapPacket::nak(eap.identifier, EapType::MsChapV2);
                            self.send_eap_round(&nak)?;
                            FlowState::AwaitChallenge { nak_sent: true }
                        }
                        Some(EapType::MsChapV2) => {
                            let sub = SubPacket::parse(&eap.data)?;
                            if sub.op_code != OpCode::Challenge {
                                return Err(ClientError::Protocol(format!(
                                    "expected MS-CHAP-V2 Challenge, got {:?}",
                                    sub.op_code
                                )));
                            }
                            FlowState::AwaitVerdict {
                                auth_challenge: sub.challenge()?,
                                ms_chap_id: sub.ms_chap_id,
                            }
                        }
                        other => {
                            return Err(ClientError::Protocol(format!(
                                "server offered unsupported EAP method: {:?}",
                                other
                            )));
                        }
                    }
                }

                FlowState::AwaitVerdict {
                    auth_challenge,
                    ms_chap_id,
                } => {
                    let peer_challenge = mschap::generate_peer_challenge();
                    let nt_response = mschap::generate_nt_response_v2(
                        &auth_challenge,
                        &peer_challenge,
                        self.username,
                        self.password,
                    );
                    let sub = ms_chap_v2::build_response(
                        ms_chap_id,
                        &peer_challenge,
                        &nt_response,
                        self.username,
                    );
                    self.send_eap_round(&EapPacket::ms_chap_v2_response(ms_chap_id, sub))?;

                    let verdict = self.expect_ms_chap_sub()?;
                    match verdict.op_code {
                        OpCode::Success => FlowState::AwaitFinal {
                            ms_chap_id: verdict.ms_chap_id,
                        },
                        OpCode::Failure => {
                            let failure = verdict.failure()?;
                            debug!(error_code = failure.error_code, "MS-CHAP-V2 failure");
                            match (self.new_password, failure.challenge) {
                                (Some(new_password), Some(challenge))
                                    if failure.error_code == ERROR_PASSWD_EXPIRED =>
                                {
                                    self.change_password(
                                        verdict.ms_chap_id,
                                        &challenge,
                                        new_password,
                                    )?
                                }
                                _ => return Err(ClientError::Rejected(failure.text())),
                            }
                        }
                        other => {
                            return Err(ClientError::Protocol(format!(
                                "expected MS-CHAP-V2 verdict, got {:?}",
                                other
                            )));
                        }
                    }
                }

                FlowState::AwaitFinal { ms_chap_id } => {
                    self.send_eap_round(&EapPacket::success(ms_chap_id.wrapping_add(1)))?;
                    let received = self
                        .transaction
                        .received()
                        .ok_or_else(|| ClientError::Protocol("no final response".to_string()))?;
                    return match received.code {
                        Code::AccessAccept => Ok(()),
                        Code::AccessReject => {
                            Err(ClientError::Rejected("Access rejected".to_string()))
                        }
                        other => Err(ClientError::Protocol(format!(
                            "unexpected final response: {:?}",
                            other
                        ))),
                    };
                }
            };
        }
    }

    /// RFC 2759 change-password sub-flow, entered from an E=648 failure
    ///
    /// The proof of the old password is computed against the challenge the
    /// server put in the failure's C= field.
    fn change_password(
        &mut self,
        ms_chap_id: u8,
        challenge: &[u8; 16],
        new_password: &str,
    ) -> Result<FlowState, ClientError> {
        debug!("password expired, starting change-password exchange");
        let peer_challenge = mschap::generate_peer_challenge();
        let nt_response = mschap::generate_nt_response_v2(
            challenge,
            &peer_challenge,
            self.username,
            self.password,
        );
        let encrypted_password =
            mschap::new_password_encrypted_with_old_nt_hash(new_password, self.password)
                .map_err(|e| ClientError::BadArgument(e.to_string()))?;
        let encrypted_hash = mschap::encrypted_password_hash(new_password, self.password);

        let sub = ms_chap_v2::build_change_password(
            ms_chap_id,
            &encrypted_password,
            &encrypted_hash,
            &peer_challenge,
            &nt_response,
        );
        // the wrapped EAP packet is ~590 bytes and fragments across
        // multiple EAP-Message attributes inside send_eap_round
        self.send_eap_round(&EapPacket::ms_chap_v2_response(ms_chap_id, sub))?;

        let verdict = self.expect_ms_chap_sub()?;
        match verdict.op_code {
            OpCode::Success => Ok(FlowState::AwaitFinal {
                ms_chap_id: verdict.ms_chap_id,
            }),
            OpCode::Failure => Err(ClientError::Rejected(verdict.failure()?.text())),
            other => Err(ClientError::Protocol(format!(
                "expected change-password verdict, got {:?}",
                other
            ))),
        }
    }

    /// One Access-Request/response round carrying an EAP payload
    ///
    /// Every EAP-bearing request is signed with Message-Authenticator, and
    /// the State attribute of the reply (if any) is staged for echoing in
    /// the following round.
    fn send_eap_round(&mut self, eap: &EapPacket) -> Result<(), ClientError> {
        self.transaction.begin_request(self.ids.next());
        self.transaction.set_eap_message(eap.to_attributes()?);
        let bytes = self
            .transaction
            .encode_request(Code::AccessRequest, self.secret, true)?;
        let reply = self.transport.exchange(&bytes)?;
        self.transaction.record_response(reply, self.secret)?;

        let state = self.transaction.received().and_then(|received| {
            received
                .attributes
                .iter()
                .find(|a| a.attr_type == AttributeType::State as u8)
                .cloned()
        });
        if let Some(state) = state {
            self.transaction.set_attribute(state);
        }
        Ok(())
    }

    /// The recorded response must be an Access-Challenge carrying a State
    /// attribute and an EAP Request
    fn expect_challenge_eap(&self) -> Result<EapPacket, ClientError> {
        let received = self
            .transaction
            .received()
            .ok_or_else(|| ClientError::Protocol("no response recorded".to_string()))?;

        match received.code {
            Code::AccessChallenge => {}
            Code::AccessReject => {
                return Err(ClientError::Rejected("Access rejected".to_string()));
            }
            other => {
                return Err(ClientError::Protocol(format!(
                    "expected Access-Challenge, got {:?}",
                    other
                )));
            }
        }

        if !received
            .attributes
            .iter()
            .any(|a| a.attr_type == AttributeType::State as u8)
        {
            return Err(ClientError::Protocol(
                "Access-Challenge without State attribute".to_string(),
            ));
        }

        let mut eap_bytes = Vec::new();
        for attr in &received.attributes {
            if attr.attr_type == AttributeType::EapMessage as u8 {
                eap_bytes.extend_from_slice(&attr.value);
            }
        }
        if eap_bytes.is_empty() {
            return Err(ClientError::Protocol(
                "Access-Challenge without EAP-Message attribute".to_string(),
            ));
        }

        let eap = EapPacket::from_bytes(&eap_bytes)?;
        if eap.code != EapCode::Request {
            return Err(ClientError::Protocol(format!(
                "expected EAP Request, got {:?}",
                eap.code
            )));
        }
        Ok(eap)
    }

    /// Like [`Self::expect_challenge_eap`] but unwraps the MS-CHAP-V2
    /// sub-packet
    fn expect_ms_chap_sub(&self) -> Result<SubPacket, ClientError> {
        let eap = self.expect_challenge_eap()?;
        if eap.eap_type != Some(EapType::MsChapV2) {
            return Err(ClientError::Protocol(format!(
                "expected EAP MS-CHAP-V2, got {:?}",
                eap.eap_type
            )));
        }
        SubPacket::parse(&eap.data).map_err(Into::into)
    }

    /// MD5-Challenge downgrade: one final Access-Request with CHAP-Password
    /// and no further EAP
    fn finish_with_chap(&mut self, chap_id: u8) -> Result<(), ClientError> {
        debug!("server selected MD5-Challenge, finishing with CHAP");
        let authenticator = self.transaction.begin_request(self.ids.next());
        self.transaction
            .remove_attributes(AttributeType::EapMessage as u8);
        self.transaction.set_attribute(Attribute::new(
            AttributeType::ChapPassword as u8,
            chap_password(chap_id, self.password, &authenticator),
        )?);

        let bytes = self
            .transaction
            .encode_request(Code::AccessRequest, self.secret, true)?;
        let reply = self.transport.exchange(&bytes)?;
        self.transaction.record_response(reply, self.secret)?;

        let received = self
            .transaction
            .received()
            .ok_or_else(|| ClientError::Protocol("no response recorded".to_string()))?;
        match received.code {
            Code::AccessAccept => Ok(()),
            Code::AccessReject => Err(ClientError::Rejected("Access rejected".to_string())),
            other => Err(ClientError::Protocol(format!(
                "unexpected CHAP response: {:?}",
                other
            ))),
        }
    }
}
