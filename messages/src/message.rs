//! The message envelope: header, body, optional signature and the local flag.
//!
//! Wire layout (big-endian):
//!
//! ```text
//! type u8 | network u32 | timestamp u64 | origin [32] | body ...   <- signing payload
//! has_signature u8 | [public key [32] | signature [64]]
//! ```
//!
//! The `local` flag never goes on the wire.

use dirchain_crypto::{identity_from_public_key, sha256d, sign_payload, verify_signature};
use dirchain_ledger::codec::{Decoder, Encoder};
use dirchain_ledger::CodecError;
use dirchain_types::{Hash32, IdentityChainId, KeyPair, NetworkId, Signature, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{MessageBody, MessageError, MessageType};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Network magic, see [`NetworkId::magic`].
    pub network: u32,
    pub timestamp: Timestamp,
    pub origin: IdentityChainId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub header: MessageHeader,
    pub body: MessageBody,
    pub signature: Option<Signature>,
    /// Set on control messages this node produced for itself.
    #[serde(skip)]
    pub local: bool,
}

impl Message {
    pub fn new(
        network: NetworkId,
        timestamp: Timestamp,
        origin: IdentityChainId,
        body: MessageBody,
    ) -> Self {
        Self {
            header: MessageHeader {
                network: network.magic(),
                timestamp,
                origin,
            },
            body,
            signature: None,
            local: false,
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.body.message_type()
    }

    pub fn db_height(&self) -> Option<u32> {
        self.body.db_height()
    }

    pub fn timestamp(&self) -> Timestamp {
        self.header.timestamp
    }

    pub fn origin(&self) -> IdentityChainId {
        self.header.origin
    }

    pub fn with_local(mut self, local: bool) -> Self {
        self.local = local;
        self
    }

    /// Bytes covered by the signature: header and body, without the
    /// signature section.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(64);
        enc.put_u8(self.message_type() as u8)
            .put_u32(self.header.network)
            .put_u64(self.header.timestamp.as_millis())
            .put_hash(&self.header.origin);
        match &self.body {
            MessageBody::EndOfMinute { minute, db_height } => {
                enc.put_u8(*minute).put_u32(*db_height);
            }
            MessageBody::Ack {
                db_height,
                serial,
                message_hash,
            } => {
                enc.put_u32(*db_height).put_u32(*serial).put_hash(message_hash);
            }
            MessageBody::DirectoryBlockSignature {
                db_height,
                directory_block_key_mr,
            } => {
                enc.put_u32(*db_height).put_hash(directory_block_key_mr);
            }
            MessageBody::CommitEntry {
                entry_hash,
                credits,
            } => {
                enc.put_hash(entry_hash).put_u8(*credits);
            }
            MessageBody::RevealEntry { chain_id, content } => {
                enc.put_hash(chain_id).put_var_bytes(content);
            }
            MessageBody::FactoidTransaction { raw } => {
                enc.put_var_bytes(raw);
            }
            MessageBody::AddServer { db_height, server } => {
                enc.put_u32(*db_height).put_hash(server);
            }
        }
        enc.into_bytes()
    }

    /// Identity of the message: double SHA-256 of the signing payload, so a
    /// re-signed message keeps its hash.
    pub fn hash(&self) -> Hash32 {
        sha256d(&self.signing_payload())
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut out = self.signing_payload();
        let mut enc = Encoder::with_capacity(97);
        match &self.signature {
            Some(sig) => {
                enc.put_u8(1).put_signature(sig);
            }
            None => {
                enc.put_u8(0);
            }
        }
        out.extend_from_slice(&enc.into_bytes());
        out
    }

    /// Sign in place with `keypair`, replacing any previous signature.
    pub fn sign(&mut self, keypair: &KeyPair) {
        self.signature = Some(sign_payload(&self.signing_payload(), keypair));
    }

    pub fn signed(mut self, keypair: &KeyPair) -> Self {
        self.sign(keypair);
        self
    }

    /// Check the attached signature.
    ///
    /// Kinds that require a signature fail with `MissingSignature` when none is
    /// attached. A present signature must come from a key whose identity is
    /// the header's origin and must verify over the signing payload.
    /// Federated-server membership is checked by the caller.
    pub fn verify(&self) -> Result<(), MessageError> {
        let Some(sig) = &self.signature else {
            if self.message_type().requires_signature() {
                return Err(MessageError::MissingSignature(self.message_type()));
            }
            return Ok(());
        };
        let signer = identity_from_public_key(&sig.public_key);
        if signer != self.header.origin {
            return Err(MessageError::VerificationFailure(format!(
                "signing key identity {signer} does not match origin {}",
                self.header.origin
            )));
        }
        if !verify_signature(&self.signing_payload(), sig) {
            return Err(MessageError::VerificationFailure(format!(
                "bad {} signature from {}",
                self.message_type().as_str(),
                self.header.origin
            )));
        }
        Ok(())
    }

    /// Full authentication: signature check plus origin membership in `feds`.
    /// Unsigned kinds pass without a membership check.
    pub fn authenticate(&self, feds: &[IdentityChainId]) -> Result<(), MessageError> {
        self.verify()?;
        if self.message_type().requires_signature() && !feds.contains(&self.header.origin) {
            return Err(MessageError::Unauthorized(self.header.origin));
        }
        Ok(())
    }
}

/// Decode a marshalled message, dispatching on its type byte.
pub fn unmarshal_message(data: &[u8]) -> Result<Message, MessageError> {
    let mut dec = Decoder::new(data);
    let tag = dec.u8("message type")?;
    let kind = MessageType::from_byte(tag)
        .ok_or_else(|| CodecError::malformed(format!("unknown message type {tag:#04x}")))?;
    let header = MessageHeader {
        network: dec.u32("network")?,
        timestamp: Timestamp::from_millis(dec.u64("timestamp")?),
        origin: dec.hash("origin")?,
    };
    let body = match kind {
        MessageType::EndOfMinute => MessageBody::EndOfMinute {
            minute: dec.u8("minute")?,
            db_height: dec.u32("db_height")?,
        },
        MessageType::Ack => MessageBody::Ack {
            db_height: dec.u32("db_height")?,
            serial: dec.u32("serial")?,
            message_hash: dec.hash("message_hash")?,
        },
        MessageType::DirectoryBlockSignature => MessageBody::DirectoryBlockSignature {
            db_height: dec.u32("db_height")?,
            directory_block_key_mr: dec.hash("directory_block_key_mr")?,
        },
        MessageType::CommitEntry => MessageBody::CommitEntry {
            entry_hash: dec.hash("entry_hash")?,
            credits: dec.u8("credits")?,
        },
        MessageType::RevealEntry => MessageBody::RevealEntry {
            chain_id: dec.hash("chain_id")?,
            content: dec.var_bytes("content")?,
        },
        MessageType::FactoidTransaction => MessageBody::FactoidTransaction {
            raw: dec.var_bytes("raw")?,
        },
        MessageType::AddServer => MessageBody::AddServer {
            db_height: dec.u32("db_height")?,
            server: dec.hash("server")?,
        },
    };
    let signature = match dec.u8("has_signature")? {
        0 => None,
        1 => Some(dec.signature("signature")?),
        other => {
            return Err(CodecError::malformed(format!("bad signature flag {other}")).into());
        }
    };
    dec.finish("message")?;
    Ok(Message {
        header,
        body,
        signature,
        local: false,
    })
}

impl Message {
    pub fn unmarshal(data: &[u8]) -> Result<Self, MessageError> {
        unmarshal_message(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirchain_crypto::keypair_from_seed;

    fn eom(kp: &KeyPair) -> Message {
        Message::new(
            NetworkId::Local,
            Timestamp::from_millis(1_000),
            identity_from_public_key(&kp.public),
            MessageBody::EndOfMinute {
                minute: 3,
                db_height: 7,
            },
        )
    }

    #[test]
    fn signed_eom_verifies() {
        let kp = keypair_from_seed(&[1; 32]);
        let msg = eom(&kp).signed(&kp);
        assert!(msg.verify().is_ok());
        assert!(msg.authenticate(&[msg.origin()]).is_ok());
    }

    #[test]
    fn unsigned_eom_is_missing_signature() {
        let kp = keypair_from_seed(&[1; 32]);
        assert_eq!(
            eom(&kp).verify(),
            Err(MessageError::MissingSignature(MessageType::EndOfMinute))
        );
    }

    #[test]
    fn corrupted_signature_byte_fails() {
        let kp = keypair_from_seed(&[1; 32]);
        let mut bytes = eom(&kp).signed(&kp).marshal();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let msg = unmarshal_message(&bytes).unwrap();
        assert!(matches!(
            msg.verify(),
            Err(MessageError::VerificationFailure(_))
        ));
    }

    #[test]
    fn foreign_key_fails_origin_binding() {
        let kp = keypair_from_seed(&[1; 32]);
        let other = keypair_from_seed(&[2; 32]);
        let msg = eom(&kp).signed(&other);
        assert!(matches!(
            msg.verify(),
            Err(MessageError::VerificationFailure(_))
        ));
    }

    #[test]
    fn non_federated_origin_is_unauthorized() {
        let kp = keypair_from_seed(&[1; 32]);
        let msg = eom(&kp).signed(&kp);
        assert_eq!(
            msg.authenticate(&[Hash32::new([9; 32])]),
            Err(MessageError::Unauthorized(msg.origin()))
        );
    }

    #[test]
    fn unsigned_commit_is_accepted() {
        let msg = Message::new(
            NetworkId::Local,
            Timestamp::from_millis(5),
            Hash32::ZERO,
            MessageBody::CommitEntry {
                entry_hash: Hash32::new([3; 32]),
                credits: 1,
            },
        );
        assert!(msg.authenticate(&[]).is_ok());
    }

    #[test]
    fn local_flag_not_marshalled() {
        let kp = keypair_from_seed(&[1; 32]);
        let msg = eom(&kp).signed(&kp).with_local(true);
        let back = unmarshal_message(&msg.marshal()).unwrap();
        assert!(!back.local);
        assert_eq!(back.with_local(true), msg);
    }

    #[test]
    fn hash_ignores_signature() {
        let kp = keypair_from_seed(&[1; 32]);
        let unsigned = eom(&kp);
        assert_eq!(unsigned.hash(), unsigned.clone().signed(&kp).hash());
    }

    #[test]
    fn unknown_type_rejected() {
        let kp = keypair_from_seed(&[1; 32]);
        let mut bytes = eom(&kp).marshal();
        bytes[0] = 0x40;
        assert!(matches!(
            unmarshal_message(&bytes),
            Err(MessageError::Codec(CodecError::MalformedEncoding(_)))
        ));
    }
}
