use std::sync::Arc;

use dirchain_ledger::{
    AdminBlock, ChainBlock, DBEntry, DirectoryBlock, Entry, EntryBlock, EntryCreditBlock,
    FactoidBlock,
};
use dirchain_nullables::NullStore;
use dirchain_overlay::{buckets, Overlay, OverlayBatch, OverlayError};
use dirchain_store::{ContentStore, StoreError};
use dirchain_types::{ChainKind, Hash32, ADMIN_CHAIN_ID, EC_CHAIN_ID, FACTOID_CHAIN_ID};

const USER_CHAIN: Hash32 = Hash32::new([0x55; 32]);

/// Persist `count` heights, each with a full set of sub-blocks and one
/// entry block on `USER_CHAIN`. Returns the directory blocks in height order.
fn build_chain<S: ContentStore>(overlay: &Overlay<S>, count: u32) -> Vec<DirectoryBlock> {
    let mut dblocks: Vec<DirectoryBlock> = Vec::new();
    let mut prev_ledger = Hash32::ZERO;
    let (mut prev_a, mut prev_ec, mut prev_f, mut prev_e) =
        (Hash32::ZERO, Hash32::ZERO, Hash32::ZERO, Hash32::ZERO);

    for height in 0..count {
        let admin = AdminBlock::new(prev_a, height);
        let ec = EntryCreditBlock::new(prev_ec, height);
        let factoid = FactoidBlock::new(prev_f, height);
        let entry = Entry::new(USER_CHAIN, format!("entry at {height}").into_bytes());
        let mut eblock = EntryBlock::new(USER_CHAIN, prev_e, height, height);
        eblock.add_entry(entry.hash());
        eblock.add_minute_marker(1);

        let entries = vec![
            DBEntry::new(ADMIN_CHAIN_ID, admin.key_mr()),
            DBEntry::new(EC_CHAIN_ID, ec.key_mr()),
            DBEntry::new(FACTOID_CHAIN_ID, factoid.key_mr()),
            DBEntry::new(USER_CHAIN, eblock.key_mr()),
        ];
        let prev_key_mr = dblocks.last().map(|b| b.key_mr()).unwrap_or(Hash32::ZERO);
        let dblock = DirectoryBlock::new(0, 1, prev_key_mr, prev_ledger, height * 10, height, entries);
        let ledger = dblock.ledger_key_mr(&[
            admin.marshal(),
            ec.marshal(),
            factoid.marshal(),
            eblock.marshal(),
        ]);

        let mut batch = OverlayBatch::new();
        prev_a = batch.add_block(&admin);
        prev_ec = batch.add_block(&ec);
        prev_f = batch.add_block(&factoid);
        prev_e = batch.add_block(&eblock);
        batch.add_entry(&entry);
        let key_mr = batch.add_block(&dblock);
        batch.index_ledger_key_mr(&ledger, &key_mr);
        overlay.commit(batch).unwrap();

        prev_ledger = ledger;
        dblocks.push(dblock);
    }
    dblocks
}

#[test]
fn every_height_links_to_its_parent() {
    let overlay = Overlay::new(NullStore::new());
    let chain = build_chain(&overlay, 5);

    let genesis = overlay.fetch_dblock_by_height(0).unwrap();
    assert!(genesis.header.prev_key_mr.is_zero());
    for h in 1..5u32 {
        let block = overlay.fetch_dblock_by_height(h).unwrap();
        let parent = overlay.fetch_dblock_by_height(h - 1).unwrap();
        assert_eq!(block.header.prev_key_mr, parent.key_mr());
        assert_eq!(block, chain[h as usize]);
    }
}

#[test]
fn traversal_visits_height_plus_one_blocks() {
    let overlay = Overlay::new(NullStore::new());
    build_chain(&overlay, 7);
    assert_eq!(overlay.verify_directory_chain().unwrap(), 7);

    let head = overlay.fetch_dblock_head().unwrap();
    let mut heights = vec![head.header.db_height];
    let mut prev = head.header.prev_key_mr;
    while !prev.is_zero() {
        let block: DirectoryBlock = overlay.fetch_by_hash(&prev).unwrap();
        heights.push(block.header.db_height);
        prev = block.header.prev_key_mr;
    }
    assert_eq!(heights, vec![6, 5, 4, 3, 2, 1, 0]);
}

#[test]
fn old_heads_stay_retrievable() {
    let overlay = Overlay::new(NullStore::new());
    let chain = build_chain(&overlay, 3);
    for block in &chain {
        let fetched: DirectoryBlock = overlay.fetch_by_hash(&block.key_mr()).unwrap();
        assert_eq!(&fetched, block);
    }
    assert_eq!(overlay.fetch_dblock_head().unwrap(), chain[2]);
}

#[test]
fn mismatched_content_is_an_integrity_violation() {
    let store = Arc::new(NullStore::new());
    let overlay = Overlay::new(store.clone());
    let chain = build_chain(&overlay, 2);

    // Store height 1's bytes under height 0's key.
    let victim = chain[0].key_mr();
    store.tamper(
        buckets::blocks(ChainKind::Directory),
        victim.as_bytes(),
        &chain[1].marshal(),
    );

    match overlay.fetch_by_hash::<DirectoryBlock>(&victim) {
        Err(OverlayError::IntegrityViolation { kind, key, actual }) => {
            assert_eq!(kind, ChainKind::Directory);
            assert_eq!(key, victim);
            assert_eq!(actual, chain[1].key_mr());
        }
        other => panic!("expected integrity violation, got {other:?}"),
    }
    assert!(overlay.verify_directory_chain().is_err());
}

#[test]
fn garbage_bytes_are_a_codec_error() {
    let store = Arc::new(NullStore::new());
    let overlay = Overlay::new(store.clone());
    let chain = build_chain(&overlay, 1);
    store.tamper(
        buckets::blocks(ChainKind::Directory),
        chain[0].key_mr().as_bytes(),
        &[1, 2, 3],
    );
    assert!(matches!(
        overlay.fetch_dblock_head(),
        Err(OverlayError::Codec(_))
    ));
}

#[test]
fn broken_link_is_detected() {
    let overlay = Overlay::new(NullStore::new());
    build_chain(&overlay, 2);
    // A head at height 5 whose parent is at height 1 skips heights.
    let parent = overlay.fetch_dblock_head().unwrap();
    let orphan = DirectoryBlock::new(0, 1, parent.key_mr(), Hash32::ZERO, 0, 5, Vec::new());
    overlay.save_head(&orphan).unwrap();
    assert!(matches!(
        overlay.verify_directory_chain(),
        Err(OverlayError::BrokenChain(_))
    ));
}

#[test]
fn entry_block_lookups() {
    let overlay = Overlay::new(NullStore::new());
    build_chain(&overlay, 4);

    let head = overlay.fetch_eblock_head(&USER_CHAIN).unwrap();
    assert_eq!(head.sequence, 3);

    let second = overlay.fetch_eblock_by_sequence(&USER_CHAIN, 1).unwrap();
    assert_eq!(second.db_height, 1);
    assert_eq!(
        overlay.fetch_eblock_by_body_hash(&second.body_hash()).unwrap(),
        second
    );

    let all = overlay.fetch_all_eblocks_by_chain(&USER_CHAIN).unwrap();
    let seqs: Vec<u32> = all.iter().map(|b| b.sequence).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3]);
    assert!(overlay
        .fetch_all_eblocks_by_chain(&Hash32::new([1; 32]))
        .unwrap()
        .is_empty());

    let entry_hash = head.entry_hashes().next().unwrap();
    let entry = overlay.fetch_entry(&entry_hash).unwrap();
    assert_eq!(entry.content, b"entry at 3");
}

#[test]
fn ledger_key_mr_is_indexed_and_recomputable() {
    let overlay = Overlay::new(NullStore::new());
    let chain = build_chain(&overlay, 3);

    let ledger_1 = overlay.ledger_key_mr(&chain[1]).unwrap();
    assert_eq!(chain[2].header.prev_ledger_key_mr, ledger_1);
    assert_eq!(
        overlay.fetch_dblock_by_ledger_key_mr(&ledger_1).unwrap(),
        chain[1]
    );
}

#[test]
fn system_heads_track_latest_height() {
    let overlay = Overlay::new(NullStore::new());
    build_chain(&overlay, 3);
    assert_eq!(overlay.fetch_head::<AdminBlock>().unwrap().db_height, 2);
    assert_eq!(overlay.fetch_head::<FactoidBlock>().unwrap().db_height, 2);
    let ec: EntryCreditBlock = overlay.fetch_by_height(1).unwrap();
    assert_eq!(ec.db_height, 1);
}

#[test]
fn close_closes_the_store() {
    let store = Arc::new(NullStore::new());
    let overlay = Overlay::new(store.clone());
    overlay.close().unwrap();
    assert!(store.is_closed());
    assert_eq!(
        overlay.fetch_dblock_head().unwrap_err(),
        OverlayError::Store(StoreError::Closed)
    );
}

#[test]
fn lmdb_backed_chain_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let map_size = 32 * 1024 * 1024;
    let head = {
        let store = dirchain_store_lmdb::LmdbStore::open(dir.path(), map_size).unwrap();
        let overlay = Overlay::new(store);
        let chain = build_chain(&overlay, 4);
        overlay.close().unwrap();
        chain[3].clone()
    };

    let store = dirchain_store_lmdb::LmdbStore::open(dir.path(), map_size).unwrap();
    let overlay = Overlay::new(store);
    assert_eq!(overlay.fetch_dblock_head().unwrap(), head);
    assert_eq!(overlay.verify_directory_chain().unwrap(), 4);
}
