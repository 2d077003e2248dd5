//! Consensus messages exchanged between federated servers.
//!
//! A [`Message`] is a header (network, timestamp, origin identity), one of the
//! [`MessageBody`] kinds, and an optional single signature. Kinds that seal
//! state (end-of-minute, acknowledgement, directory-block signature, server
//! addition) must be signed by their origin.

pub mod body;
pub mod error;
pub mod message;

pub use body::{MessageBody, MessageType};
pub use error::MessageError;
pub use message::{unmarshal_message, Message, MessageHeader};
