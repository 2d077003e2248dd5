use proptest::prelude::*;

use dirchain_ledger::{
    AdminBlock, AdminEntry, ChainBlock, DBEntry, DirectoryBlock, EcEntry, EntryBlock,
    EntryCreditBlock, FactoidBlock, FactoidTransaction,
};
use dirchain_types::{Hash32, PublicKey, Signature};

fn hash() -> impl Strategy<Value = Hash32> {
    prop::array::uniform32(1u8..).prop_map(Hash32::new)
}

fn dblock() -> impl Strategy<Value = DirectoryBlock> {
    (
        hash(),
        hash(),
        any::<u32>(),
        any::<u32>(),
        prop::collection::vec((hash(), hash()), 0..8),
    )
        .prop_map(|(prev, prev_ledger, ts, height, refs)| {
            let entries = refs.into_iter().map(|(c, k)| DBEntry::new(c, k)).collect();
            DirectoryBlock::new(0, 0xFA92_E5A4, prev, prev_ledger, ts, height, entries)
        })
}

fn admin_entry() -> impl Strategy<Value = AdminEntry> {
    prop_oneof![
        (1u8..=10).prop_map(AdminEntry::MinuteMarker),
        (hash(), prop::array::uniform32(any::<u8>()), prop::collection::vec(any::<u8>(), 64))
            .prop_map(|(identity, key, sig)| {
                let mut bytes = [0u8; 64];
                bytes.copy_from_slice(&sig);
                AdminEntry::DirectoryBlockSignature {
                    identity,
                    signature: Signature::new(PublicKey(key), bytes),
                }
            }),
        (hash(), any::<u32>()).prop_map(|(identity, db_height)| {
            AdminEntry::AddFederatedServer {
                identity,
                db_height,
            }
        }),
    ]
}

fn check_law<B: ChainBlock + PartialEq>(block: &B) -> Result<(), TestCaseError> {
    let bytes = block.marshal();
    let back = B::unmarshal(&bytes).map_err(|e| TestCaseError::fail(e.to_string()))?;
    prop_assert_eq!(&back, block);
    prop_assert_eq!(back.marshal(), bytes);
    prop_assert_eq!(back.key_mr(), block.key_mr());
    Ok(())
}

proptest! {
    /// unmarshal(marshal(b)) == b and re-marshals to the same bytes.
    #[test]
    fn dblock_codec_law(block in dblock()) {
        check_law(&block)?;
        prop_assert!(block.is_body_consistent());
    }

    #[test]
    fn admin_codec_law(prev in hash(), height in any::<u32>(), entries in prop::collection::vec(admin_entry(), 0..6)) {
        let mut block = AdminBlock::new(prev, height);
        for e in entries {
            block.add_entry(e);
        }
        check_law(&block)?;
    }

    #[test]
    fn ec_codec_law(prev in hash(), height in any::<u32>(), commits in prop::collection::vec((any::<u64>(), hash(), any::<u8>()), 0..6)) {
        let mut block = EntryCreditBlock::new(prev, height);
        for (timestamp, entry_hash, credits) in commits {
            block.add_entry(EcEntry::Commit { timestamp, entry_hash, credits });
            block.add_entry(EcEntry::MinuteMarker(1));
        }
        check_law(&block)?;
    }

    #[test]
    fn factoid_codec_law(prev in hash(), txs in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..40), 0..5)) {
        let mut block = FactoidBlock::new(prev, 3);
        for raw in txs {
            block.add_transaction(FactoidTransaction::new(raw));
        }
        check_law(&block)?;
    }

    #[test]
    fn eblock_codec_law(chain in hash(), seq in any::<u32>(), entries in prop::collection::vec(hash(), 0..10)) {
        let mut block = EntryBlock::new(chain, Hash32::ZERO, 9, seq);
        for (i, h) in entries.into_iter().enumerate() {
            block.add_entry(h);
            if i % 3 == 2 {
                block.add_minute_marker((i / 3 + 1) as u8);
            }
        }
        check_law(&block)?;
    }

    /// Flipping any byte of a directory block changes its KeyMR.
    #[test]
    fn dblock_key_mr_sensitive(block in dblock(), idx in any::<prop::sample::Index>()) {
        let mut bytes = block.marshal();
        let i = idx.index(bytes.len());
        bytes[i] ^= 0x01;
        prop_assert_ne!(dirchain_crypto::sha256d(&bytes), block.key_mr());
    }

    /// Truncated encodings never decode.
    #[test]
    fn dblock_truncation_rejected(block in dblock(), cut in 1usize..64) {
        let bytes = block.marshal();
        let keep = bytes.len().saturating_sub(cut);
        prop_assert!(DirectoryBlock::unmarshal(&bytes[..keep]).is_err());
    }
}
