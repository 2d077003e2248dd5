//! Process-wide state of a node: process lists, overlay, chain tip, internal
//! queues, journal and replay watermark.
//!
//! Every mutation of consensus state and every overlay write goes through
//! [`State`], which is owned by exactly one validator loop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use dirchain_consensus::{ChainTips, ConsensusError, ProcessLists, SubBlocks};
use dirchain_crypto::identity_from_public_key;
use dirchain_ledger::{ChainBlock, DirectoryBlock};
use dirchain_messages::{Message, MessageBody, MessageError};
use dirchain_overlay::{Overlay, OverlayBatch};
use dirchain_store::ContentStore;
use dirchain_types::{
    is_system_chain, ChainId, ChainKind, Clock, Hash32, IdentityChainId, KeyPair, NetworkId,
    ProtocolParams, Timestamp,
};

use crate::journal::Journal;
use crate::metrics::NodeMetrics;
use crate::NodeError;

/// Chain tips read straight from the overlay.
pub struct OverlayTips<'a, S: ContentStore> {
    overlay: &'a Overlay<S>,
}

impl<'a, S: ContentStore> OverlayTips<'a, S> {
    pub fn new(overlay: &'a Overlay<S>) -> Self {
        Self { overlay }
    }
}

impl<S: ContentStore> ChainTips for OverlayTips<'_, S> {
    fn prev_key_mr(&self, kind: ChainKind) -> Result<Hash32, ConsensusError> {
        let chain_id = kind.system_chain_id().ok_or_else(|| {
            ConsensusError::ChainTips(format!("{} has no single chain", kind.as_str()))
        })?;
        match self.overlay.fetch_head_key_mr(&chain_id) {
            Ok(key_mr) => Ok(key_mr),
            Err(e) if e.is_not_found() => Ok(Hash32::ZERO),
            Err(e) => Err(ConsensusError::ChainTips(e.to_string())),
        }
    }

    fn eblock_tip(&self, chain_id: &ChainId) -> Result<Option<(Hash32, u32)>, ConsensusError> {
        match self.overlay.fetch_eblock_head(chain_id) {
            Ok(eb) => Ok(Some((eb.key_mr(), eb.sequence))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(ConsensusError::ChainTips(e.to_string())),
        }
    }
}

/// The persisted end of the directory chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainTip {
    pub key_mr: Hash32,
    pub ledger_key_mr: Hash32,
    /// `None` until genesis is persisted.
    pub height: Option<u32>,
}

/// A sealed height whose blocks have not been persisted yet.
#[derive(Clone, Debug)]
struct SealedHeight {
    blocks: SubBlocks,
    dblock: DirectoryBlock,
    ledger_key_mr: Hash32,
}

pub struct State<S: ContentStore> {
    params: ProtocolParams,
    network: NetworkId,
    identity: Option<KeyPair>,
    identity_id: Option<IdentityChainId>,
    lists: ProcessLists,
    overlay: Overlay<S>,
    tip: ChainTip,

    replaying: bool,
    watermark: Timestamp,

    timer_queue: VecDeque<Message>,
    ack_queue: VecDeque<Message>,
    msg_queue: VecDeque<Message>,

    /// Height the timer asked to close.
    pending_seal: Option<u32>,
    /// The local closing end-of-minute of the current height has been appended.
    closing_eom_appended: bool,
    unpersisted: Option<SealedHeight>,

    journal: Journal,
    metrics: Arc<NodeMetrics>,
    clock: Arc<dyn Clock>,
}

impl<S: ContentStore> State<S> {
    /// Build the state on top of `overlay`, resuming after the stored
    /// directory head if there is one.
    ///
    /// A node with an identity key always counts itself among the federated
    /// servers.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        params: ProtocolParams,
        network: NetworkId,
        identity: Option<KeyPair>,
        mut fed_servers: Vec<IdentityChainId>,
        overlay: Overlay<S>,
        journal: Journal,
        metrics: Arc<NodeMetrics>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        let identity_id = identity.as_ref().map(|kp| identity_from_public_key(&kp.public));
        if let Some(id) = identity_id {
            if !fed_servers.contains(&id) {
                fed_servers.push(id);
            }
        }

        let tip = match overlay.fetch_dblock_head() {
            Ok(head) => ChainTip {
                key_mr: head.key_mr(),
                ledger_key_mr: overlay.ledger_key_mr(&head)?,
                height: Some(head.header.db_height),
            },
            Err(e) if e.is_not_found() => ChainTip::default(),
            Err(e) => return Err(e.into()),
        };
        let start = tip.height.map_or(0, |h| h + 1);
        tracing::info!(
            height = start,
            head = %tip.key_mr,
            fed_servers = fed_servers.len(),
            "state initialised"
        );

        metrics.current_height.set(i64::from(start));
        metrics.fed_servers.set(fed_servers.len() as i64);

        Ok(Self {
            params,
            network,
            identity,
            identity_id,
            lists: ProcessLists::new(start, fed_servers),
            overlay,
            tip,
            replaying: false,
            watermark: Timestamp::EPOCH,
            timer_queue: VecDeque::new(),
            ack_queue: VecDeque::new(),
            msg_queue: VecDeque::new(),
            pending_seal: None,
            closing_eom_appended: false,
            unpersisted: None,
            journal,
            metrics,
            clock,
        })
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn identity(&self) -> Option<IdentityChainId> {
        self.identity_id
    }

    pub fn current_height(&self) -> u32 {
        self.lists.current_height()
    }

    pub fn process_lists(&self) -> &ProcessLists {
        &self.lists
    }

    pub fn overlay(&self) -> &Overlay<S> {
        &self.overlay
    }

    pub fn tip(&self) -> ChainTip {
        self.tip
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    pub fn watermark(&self) -> Timestamp {
        self.watermark
    }

    pub fn pending(&self) -> usize {
        self.ack_queue.len() + self.msg_queue.len()
    }

    // ── Replay ──────────────────────────────────────────────────────────

    pub fn begin_replay(&mut self) {
        self.replaying = true;
    }

    pub fn end_replay(&mut self) {
        self.replaying = false;
        tracing::info!(watermark = %self.watermark, "replay finished");
    }

    // ── Queues ──────────────────────────────────────────────────────────

    /// Hand a self-produced control message to the timer-message queue.
    pub fn push_timer_message(&mut self, message: Message) {
        self.timer_queue.push_back(message);
    }

    pub fn pop_timer_message(&mut self) -> Option<Message> {
        self.timer_queue.pop_front()
    }

    /// Journal `message` and route it: acknowledgements to the ack queue,
    /// everything else to the message queue.
    ///
    /// While replaying, messages advance the watermark and are not
    /// re-journaled. Live non-local messages older than the watermark are
    /// journaled and then dropped.
    pub fn deliver(&mut self, message: Message) {
        if self.replaying {
            self.watermark = self.watermark.max(message.timestamp());
            if message.local && self.is_closing_eom(&message) {
                if let Some(h) = message.db_height() {
                    self.request_seal(h);
                }
            }
        } else {
            let arrival = self.clock.now();
            let height = self.current_height();
            match self.journal.record_message(&message, arrival, height) {
                Ok(_) if self.journal.is_enabled() => self.metrics.messages_journaled.inc(),
                Ok(_) => {}
                Err(e) => self.diagnostic("journal", &e),
            }
            if !message.local && message.timestamp() < self.watermark {
                tracing::debug!(
                    kind = message.message_type().as_str(),
                    timestamp = %message.timestamp(),
                    watermark = %self.watermark,
                    "dropping historical message"
                );
                self.metrics.messages_dropped.inc();
                return;
            }
        }

        tracing::trace!(kind = message.message_type().as_str(), "message delivered");
        match message.body {
            MessageBody::Ack { .. } => self.ack_queue.push_back(message),
            _ => self.msg_queue.push_back(message),
        }
        self.metrics.pending_messages.set(self.pending() as i64);
    }

    /// Record a component error as a journaled diagnostic.
    pub fn diagnostic(&mut self, component: &str, error: &NodeError) {
        tracing::error!(component, error = %error, "component error");
        self.metrics.diagnostics.inc();
        let now = self.clock.now();
        if let Err(e) = self
            .journal
            .record_diagnostic(component, &error.to_string(), now)
        {
            tracing::error!(error = %e, "failed to journal diagnostic");
        }
    }

    // ── Sealing ─────────────────────────────────────────────────────────

    /// Ask for `height` to be sealed once its local closing end-of-minute has
    /// been appended.
    pub fn request_seal(&mut self, height: u32) {
        if height == self.current_height() {
            self.pending_seal = Some(height);
        } else {
            tracing::debug!(height, current = self.current_height(), "ignoring stale seal request");
        }
    }

    fn is_closing_eom(&self, message: &Message) -> bool {
        matches!(message.body, MessageBody::EndOfMinute { minute, .. } if minute == self.params.last_minute)
    }

    fn seal_ready(&self) -> bool {
        self.closing_eom_appended && self.pending_seal == Some(self.current_height())
    }

    // ── State advance ───────────────────────────────────────────────────

    /// Perform one state-advance operation. Returns whether anything was
    /// done.
    ///
    /// In order of priority: retry persisting an already-sealed height, seal
    /// the current height, process one acknowledgement, process one message.
    pub fn process_next(&mut self) -> Result<bool, NodeError> {
        if let Some(sealed) = self.unpersisted.take() {
            self.persist(sealed)?;
            return Ok(true);
        }
        if self.seal_ready() {
            self.seal_current()?;
            return Ok(true);
        }
        if let Some(ack) = self.ack_queue.pop_front() {
            self.process_ack(ack)?;
            self.metrics.pending_messages.set(self.pending() as i64);
            return Ok(true);
        }
        if let Some(message) = self.msg_queue.pop_front() {
            self.process_message(message)?;
            self.metrics.pending_messages.set(self.pending() as i64);
            return Ok(true);
        }
        Ok(false)
    }

    /// Check network, target chain, height and authority of `message`.
    /// Returns `false` when the message was dropped.
    fn admit(&mut self, message: &Message) -> Result<bool, NodeError> {
        if message.header.network != self.network.magic() {
            tracing::debug!(
                kind = message.message_type().as_str(),
                magic = message.header.network,
                network = self.network.as_str(),
                "dropping message for another network"
            );
            self.metrics.messages_dropped.inc();
            return Ok(false);
        }
        if let MessageBody::RevealEntry { chain_id, .. } = &message.body {
            if is_system_chain(chain_id) {
                tracing::warn!(
                    origin = %message.origin(),
                    %chain_id,
                    "entry revealed on a system chain"
                );
                self.metrics.messages_dropped.inc();
                let error = NodeError::from(MessageError::SystemChainReveal(*chain_id));
                self.diagnostic("admit", &error);
                return Ok(false);
            }
        }
        let height = self.current_height();
        if let Some(h) = message.db_height() {
            if h != height {
                tracing::debug!(
                    kind = message.message_type().as_str(),
                    message_height = h,
                    height,
                    "dropping message for another height"
                );
                self.metrics.messages_dropped.inc();
                return Ok(false);
            }
        }
        let list = self.lists.get(height)?;
        if let Err(e) = message.authenticate(list.fed_servers()) {
            tracing::warn!(
                kind = message.message_type().as_str(),
                origin = %message.origin(),
                error = %e,
                "message failed verification"
            );
            self.metrics.verification_failures.inc();
            self.diagnostic("verify", &NodeError::from(e));
            return Ok(false);
        }
        Ok(true)
    }

    fn process_ack(&mut self, ack: Message) -> Result<(), NodeError> {
        if !self.admit(&ack)? {
            return Ok(());
        }
        if let MessageBody::Ack {
            serial,
            message_hash,
            ..
        } = ack.body
        {
            let height = self.current_height();
            self.lists.get(height)?.record_ack(serial, message_hash)?;
            tracing::trace!(height, serial, %message_hash, "ack recorded");
        }
        Ok(())
    }

    fn process_message(&mut self, message: Message) -> Result<(), NodeError> {
        if !self.admit(&message)? {
            return Ok(());
        }
        let height = self.current_height();
        let closing = message.local && self.is_closing_eom(&message);
        let list = self.lists.get(height)?;
        if let MessageBody::AddServer { server, .. } = message.body {
            if list.add_fed_server(server) {
                tracing::info!(height, %server, "federated server added");
                self.metrics.fed_servers.set(list.fed_servers().len() as i64);
            }
        }
        list.append(message)?;
        self.metrics.messages_processed.inc();
        if closing {
            self.closing_eom_appended = true;
        }
        Ok(())
    }

    /// Seal the current height and persist it.
    fn seal_current(&mut self) -> Result<(), NodeError> {
        let height = self.current_height();
        let started = Instant::now();
        let tips = OverlayTips::new(&self.overlay);
        let blocks = match self.lists.get(height)?.seal(&tips) {
            Ok(b) => b,
            Err(e) => {
                self.metrics.seal_failures.inc();
                return Err(e.into());
            }
        };
        self.pending_seal = None;
        self.closing_eom_appended = false;

        let dblock = blocks.directory_block(
            self.params.block_version,
            self.network.magic(),
            self.tip.key_mr,
            self.tip.ledger_key_mr,
            self.clock.now().as_minutes(),
        );
        let ledger_key_mr = dblock.ledger_key_mr(&blocks.bodies());
        self.persist(SealedHeight {
            blocks,
            dblock,
            ledger_key_mr,
        })?;
        self.metrics
            .seal_time_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        Ok(())
    }

    /// Write a sealed height in one batch. On failure the height stays cached
    /// for the next pass and the chain does not advance.
    fn persist(&mut self, sealed: SealedHeight) -> Result<(), NodeError> {
        let height = sealed.blocks.db_height;
        let mut batch = OverlayBatch::new();
        batch.add_block(&sealed.blocks.admin);
        batch.add_block(&sealed.blocks.entry_credit);
        batch.add_block(&sealed.blocks.factoid);
        for eb in &sealed.blocks.entry_blocks {
            batch.add_block(eb);
        }
        for entry in &sealed.blocks.entries {
            batch.add_entry(entry);
        }
        let key_mr = batch.add_block(&sealed.dblock);
        batch.index_ledger_key_mr(&sealed.ledger_key_mr, &key_mr);

        if let Err(e) = self.overlay.commit(batch) {
            tracing::error!(height, error = %e, "failed to persist sealed height");
            self.metrics.seal_failures.inc();
            self.unpersisted = Some(sealed);
            return Err(e.into());
        }

        self.tip = ChainTip {
            key_mr,
            ledger_key_mr: sealed.ledger_key_mr,
            height: Some(height),
        };
        let next = height + 1;
        let fed_servers = self.lists.get(next)?.fed_servers().len();
        self.lists.prune_below(height);
        self.metrics.blocks_sealed.inc();
        self.metrics.current_height.set(i64::from(next));
        self.metrics.fed_servers.set(fed_servers as i64);
        tracing::info!(
            height,
            key_mr = %key_mr,
            entries = sealed.dblock.entries.len(),
            "directory block persisted"
        );

        if !self.replaying {
            self.emit_directory_block_signature(next, key_mr);
        }
        Ok(())
    }

    /// Queue a local signed directory-block signature for the block just
    /// persisted. Followers have no key and sign nothing.
    fn emit_directory_block_signature(&mut self, height: u32, key_mr: Hash32) {
        let (Some(keypair), Some(origin)) = (&self.identity, self.identity_id) else {
            return;
        };
        let message = Message::new(
            self.network,
            self.clock.now(),
            origin,
            MessageBody::DirectoryBlockSignature {
                db_height: height,
                directory_block_key_mr: key_mr,
            },
        )
        .signed(keypair)
        .with_local(true);
        self.push_timer_message(message);
    }

    /// Sign `body` as this node. Fails with `NoSigningKey` on a follower.
    pub fn sign_local(&self, body: MessageBody) -> Result<Message, NodeError> {
        let (Some(keypair), Some(origin)) = (&self.identity, self.identity_id) else {
            return Err(NodeError::NoSigningKey);
        };
        Ok(Message::new(self.network, self.clock.now(), origin, body)
            .signed(keypair)
            .with_local(true))
    }

    /// Flush the journal and close the overlay.
    pub fn close(&mut self) -> Result<(), NodeError> {
        self.journal.flush()?;
        self.overlay.close()?;
        Ok(())
    }
}
