//! Node lifecycle: startup recovery, journal replay, start and stop.

use std::sync::Arc;

use dirchain_ledger::DirectoryBlock;
use dirchain_messages::{Message, MessageBody};
use dirchain_node::{Journal, Node, NodeConfig, NodeError, StepOutcome};
use dirchain_nullables::{NullClock, NullStore};
use dirchain_overlay::{buckets, Overlay, OverlayError};
use dirchain_store::ContentStore;
use dirchain_store_lmdb::LmdbStore;
use dirchain_types::{ChainKind, Clock, Hash32, NetworkId, SystemClock};

fn signer_config(data_dir: &std::path::Path, last_minute: u8) -> NodeConfig {
    NodeConfig {
        data_dir: data_dir.to_path_buf(),
        identity_seed: Some("01".repeat(32)),
        last_minute,
        minute_duration_ms: 5,
        idle_delay_ms: 1,
        ..NodeConfig::default()
    }
}

fn drive<S: ContentStore + 'static>(node: &mut Node<S>) {
    let validator = node.validator_mut().unwrap();
    for _ in 0..1_000 {
        if validator.step() != StepOutcome::Progress {
            return;
        }
    }
}

#[test]
fn restart_resumes_after_stored_head() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(NullStore::new());
    let clock = Arc::new(NullClock::new(1_000));
    let config = signer_config(dir.path(), 1);

    let mut node = Node::with_parts(
        config.clone(),
        Arc::clone(&store),
        Journal::memory(),
        Arc::clone(&clock) as Arc<dyn Clock>,
    )
    .unwrap();
    for _ in 0..3 {
        node.handles().tick(1);
        drive(&mut node);
    }
    let tip = node.validator_mut().unwrap().state().tip();
    assert_eq!(tip.height, Some(2));

    let mut restarted = Node::with_parts(
        config,
        Arc::clone(&store),
        Journal::memory(),
        clock as Arc<dyn Clock>,
    )
    .unwrap();
    let state = restarted.validator_mut().unwrap().state();
    assert_eq!(state.current_height(), 3);
    assert_eq!(state.tip(), tip);
}

#[test]
fn replay_rebuilds_the_open_height() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(NullClock::new(50_000));
    let mut config = signer_config(dir.path(), 3);

    let journal = Journal::open(config.journal_path()).unwrap();
    let mut node = Node::with_parts(
        config.clone(),
        Arc::new(NullStore::new()),
        journal,
        Arc::clone(&clock) as Arc<dyn Clock>,
    )
    .unwrap();
    node.handles().tick(1);
    node.handles()
        .try_deliver(Message::new(
            NetworkId::Local,
            clock.now(),
            Hash32::new([3; 32]),
            MessageBody::FactoidTransaction { raw: vec![1, 2, 3] },
        ))
        .unwrap();
    drive(&mut node);
    assert_eq!(
        node.validator_mut()
            .unwrap()
            .state()
            .process_lists()
            .get_existing(0)
            .unwrap()
            .len(),
        2
    );
    drop(node);

    config.replay_journal = true;
    let journal = Journal::open(config.journal_path()).unwrap();
    let mut replayed = Node::with_parts(
        config,
        Arc::new(NullStore::new()),
        journal,
        clock as Arc<dyn Clock>,
    )
    .unwrap();
    let state = replayed.validator_mut().unwrap().state();
    assert!(!state.is_replaying());
    assert_eq!(state.watermark().as_millis(), 50_000);
    let list = state.process_lists().get_existing(0).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list.minute(), 1);
}

#[test]
fn tampered_lmdb_chain_fails_the_open() {
    let dir = tempfile::tempdir().unwrap();
    let config = NodeConfig {
        journal: false,
        map_size: 64 * 1024 * 1024,
        ..signer_config(dir.path(), 1)
    };

    let genesis = {
        let mut node = Node::open_lmdb(config.clone()).unwrap();
        for _ in 0..3 {
            node.handles().tick(1);
            drive(&mut node);
        }
        let state = node.validator_mut().unwrap().state();
        assert_eq!(state.tip().height, Some(2));
        state
            .overlay()
            .fetch_hash_by_height::<DirectoryBlock>(0)
            .unwrap()
    };

    // A healthy store reopens.
    drop(Node::open_lmdb(config.clone()).unwrap());

    {
        let store = LmdbStore::open(&config.store_path(), config.map_size).unwrap();
        let overlay = Overlay::new(store);
        let mut raw = overlay
            .store()
            .get(buckets::blocks(ChainKind::Directory), genesis.as_bytes())
            .unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        overlay
            .store()
            .put(buckets::blocks(ChainKind::Directory), genesis.as_bytes(), &raw)
            .unwrap();
        overlay.close().unwrap();
    }

    let result = Node::open_lmdb(config);
    assert!(matches!(
        result,
        Err(NodeError::Overlay(OverlayError::IntegrityViolation { .. }))
    ));
}

#[test]
fn invalid_config_is_rejected() {
    let config = NodeConfig {
        drain_limit: 0,
        ..NodeConfig::default()
    };
    let result = Node::with_parts(
        config,
        NullStore::new(),
        Journal::memory(),
        Arc::new(SystemClock),
    );
    assert!(matches!(result, Err(NodeError::Config(_))));
}

#[tokio::test]
async fn started_node_seals_and_stops_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(NullStore::new());
    let mut node = Node::with_parts(
        signer_config(dir.path(), 2),
        Arc::clone(&store),
        Journal::memory(),
        Arc::new(SystemClock),
    )
    .unwrap();

    node.start().unwrap();
    assert!(node.is_running());
    assert!(matches!(node.start(), Err(NodeError::AlreadyStarted)));

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    let state = node.stop().await.unwrap().expect("loop should finish");
    assert!(store.is_closed());
    assert!(state.tip().height.is_some());
    assert!(node.metrics.blocks_sealed.get() >= 1);
}

#[tokio::test]
async fn stopping_an_unstarted_node_closes_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(NullStore::new());
    let mut node = Node::with_parts(
        signer_config(dir.path(), 2),
        Arc::clone(&store),
        Journal::memory(),
        Arc::new(SystemClock),
    )
    .unwrap();
    assert!(node.stop().await.unwrap().is_some());
    assert!(store.is_closed());
}
