use proptest::prelude::*;

use dirchain_crypto::{identity_from_public_key, keypair_from_seed};
use dirchain_messages::{unmarshal_message, Message, MessageBody};
use dirchain_types::{Hash32, NetworkId, Timestamp};

fn body() -> impl Strategy<Value = MessageBody> {
    let hash = prop::array::uniform32(any::<u8>()).prop_map(Hash32::new);
    prop_oneof![
        (1u8..=10, any::<u32>()).prop_map(|(minute, db_height)| MessageBody::EndOfMinute { minute, db_height }),
        (any::<u32>(), any::<u32>(), hash.clone()).prop_map(|(db_height, serial, message_hash)| {
            MessageBody::Ack { db_height, serial, message_hash }
        }),
        (any::<u32>(), hash.clone()).prop_map(|(db_height, directory_block_key_mr)| {
            MessageBody::DirectoryBlockSignature { db_height, directory_block_key_mr }
        }),
        (hash.clone(), any::<u8>()).prop_map(|(entry_hash, credits)| MessageBody::CommitEntry { entry_hash, credits }),
        (hash.clone(), prop::collection::vec(any::<u8>(), 0..64))
            .prop_map(|(chain_id, content)| MessageBody::RevealEntry { chain_id, content }),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(|raw| MessageBody::FactoidTransaction { raw }),
        (any::<u32>(), hash).prop_map(|(db_height, server)| MessageBody::AddServer { db_height, server }),
    ]
}

proptest! {
    /// Signed messages of every kind survive the wire and still verify.
    #[test]
    fn signed_message_round_trip(seed in prop::array::uniform32(any::<u8>()), ts in any::<u64>(), body in body()) {
        let kp = keypair_from_seed(&seed);
        let msg = Message::new(
            NetworkId::Test,
            Timestamp::from_millis(ts),
            identity_from_public_key(&kp.public),
            body,
        )
        .signed(&kp);
        let bytes = msg.marshal();
        let back = unmarshal_message(&bytes).unwrap();
        prop_assert_eq!(&back, &msg);
        prop_assert_eq!(back.marshal(), bytes);
        prop_assert!(back.verify().is_ok());
    }

    /// Mutating any byte of the signing payload breaks verification or decoding.
    #[test]
    fn payload_mutation_detected(seed in prop::array::uniform32(any::<u8>()), body in body(), idx in any::<prop::sample::Index>()) {
        let kp = keypair_from_seed(&seed);
        let msg = Message::new(
            NetworkId::Test,
            Timestamp::from_millis(42),
            identity_from_public_key(&kp.public),
            body,
        )
        .signed(&kp);
        let mut bytes = msg.marshal();
        let payload_len = msg.signing_payload().len();
        let i = idx.index(payload_len);
        bytes[i] ^= 0x01;
        match unmarshal_message(&bytes) {
            Ok(m) => prop_assert!(m.verify().is_err()),
            Err(_) => {}
        }
    }
}
