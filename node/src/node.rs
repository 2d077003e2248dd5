//! The dirchain node: wires configuration, storage, the validator loop and
//! the minute ticker together.

use std::sync::Arc;
use std::time::Duration;

use dirchain_overlay::Overlay;
use dirchain_store::ContentStore;
use dirchain_store_lmdb::LmdbStore;
use dirchain_types::{Clock, SystemClock};
use tokio::task::JoinHandle;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::journal::{read_journal, Journal, JournalRecord};
use crate::metrics::NodeMetrics;
use crate::queues::{self, QueueHandles};
use crate::shutdown::ShutdownController;
use crate::state::State;
use crate::timer::spawn_minute_ticker;
use crate::validator::ValidatorLoop;

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A dirchain node.
///
/// Built stopped; [`Node::start`] spawns the validator loop and, for a node
/// holding an identity key, the minute ticker. A follower (no key) never
/// produces end-of-minute messages and so never seals a height on its own.
pub struct Node<S: ContentStore + 'static> {
    pub config: NodeConfig,
    pub metrics: Arc<NodeMetrics>,
    pub shutdown: Arc<ShutdownController>,
    handles: QueueHandles,
    validator: Option<ValidatorLoop<S>>,
    validator_handle: Option<JoinHandle<State<S>>>,
    task_handles: Vec<JoinHandle<()>>,
}

impl Node<LmdbStore> {
    /// Open the LMDB store under `config.data_dir` and build a node on it.
    pub fn open_lmdb(config: NodeConfig) -> Result<Self, NodeError> {
        let path = config.store_path();
        let store = LmdbStore::open(&path, config.map_size)?;
        let report = dirchain_store_lmdb::check_integrity(&store)?;
        if !report.is_healthy() {
            return Err(NodeError::Store(dirchain_store::StoreError::Corruption(
                report.errors.join("; "),
            )));
        }
        tracing::info!(path = %path.display(), "opened LMDB store");

        let journal = if config.journal {
            Journal::open(config.journal_path())?
        } else {
            Journal::disabled()
        };
        Self::with_parts(config, store, journal, Arc::new(SystemClock))
    }
}

impl<S: ContentStore + 'static> Node<S> {
    /// Build a node over `store`, journaling into `journal`.
    ///
    /// The stored directory chain is walked back to genesis first; any
    /// integrity violation or broken link fails the open.
    ///
    /// With `replay_journal` set, the records of `config.journal_path()` are
    /// re-injected before the node goes live.
    pub fn with_parts(
        config: NodeConfig,
        store: S,
        journal: Journal,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let replay = if config.replay_journal && config.journal_path().exists() {
            read_journal(config.journal_path())?
        } else {
            Vec::new()
        };

        let overlay = Overlay::new(store);
        let verified = overlay.verify_directory_chain()?;
        tracing::info!(blocks = verified, "directory chain verified");

        let metrics = Arc::new(NodeMetrics::new());
        let mut state = State::new(
            config.params(),
            config.network,
            config.identity()?,
            config.federated_server_ids()?,
            overlay,
            journal,
            Arc::clone(&metrics),
            clock,
        )?;
        if !replay.is_empty() {
            replay_records(&mut state, &replay)?;
        }

        let shutdown = Arc::new(ShutdownController::new());
        let (handles, loop_queues) = queues::channels(config.inbound_capacity);
        let validator = ValidatorLoop::new(
            state,
            loop_queues,
            shutdown.signal(),
            config.drain_limit,
            Duration::from_millis(config.idle_delay_ms),
        );

        Ok(Self {
            config,
            metrics,
            shutdown,
            handles,
            validator: Some(validator),
            validator_handle: None,
            task_handles: Vec::new(),
        })
    }

    /// Producer handles for network delivery and tick injection.
    pub fn handles(&self) -> QueueHandles {
        self.handles.clone()
    }

    /// The validator loop, until the node is started.
    pub fn validator_mut(&mut self) -> Option<&mut ValidatorLoop<S>> {
        self.validator.as_mut()
    }

    pub fn is_running(&self) -> bool {
        self.validator_handle.is_some()
    }

    pub fn start(&mut self) -> Result<(), NodeError> {
        let validator = self.validator.take().ok_or(NodeError::AlreadyStarted)?;
        let signs = validator.state().identity().is_some();
        self.validator_handle = Some(tokio::spawn(validator.run()));

        if signs {
            let ticker = spawn_minute_ticker(
                self.handles.tick_sender(),
                self.config.last_minute,
                Duration::from_millis(self.config.minute_duration_ms),
                self.shutdown.subscribe(),
            );
            self.task_handles.push(ticker);
        } else {
            tracing::info!("no identity key, running as follower without a minute ticker");
        }
        tracing::info!(network = self.config.network.as_str(), "dirchain node started");
        Ok(())
    }

    /// Signal shutdown and wait for the loop to close the store. Returns the
    /// final state, or `None` if the loop did not finish in time.
    pub async fn stop(&mut self) -> Result<Option<State<S>>, NodeError> {
        tracing::info!("dirchain node stopping");
        self.shutdown.shutdown();

        let mut final_state = None;
        if let Some(handle) = self.validator_handle.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(state)) => final_state = Some(state),
                Ok(Err(e)) => return Err(NodeError::Task(e.to_string())),
                Err(_) => tracing::warn!(
                    "shutdown timeout ({:?}) waiting for validator loop",
                    SHUTDOWN_TIMEOUT
                ),
            }
        } else if let Some(mut validator) = self.validator.take() {
            // Never started: close through a single step.
            validator.step();
            final_state = Some(validator.into_state());
        }

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!("dirchain node stopped");
        Ok(final_state)
    }
}

/// Re-inject journaled messages for heights not yet persisted, draining state
/// after each so seals interleave as they did live.
fn replay_records<S: ContentStore>(
    state: &mut State<S>,
    records: &[JournalRecord],
) -> Result<(), NodeError> {
    state.begin_replay();
    let mut replayed = 0usize;
    for record in records {
        let Some((height, message)) = record.decode_message()? else {
            continue;
        };
        if height < state.current_height() {
            continue;
        }
        state.deliver(message);
        replayed += 1;
        loop {
            match state.process_next() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    state.diagnostic("replay", &e);
                    break;
                }
            }
        }
    }
    state.end_replay();
    tracing::info!(records = records.len(), replayed, "journal replayed");
    Ok(())
}
