//! Process lists keyed by height, created strictly in sequence.

use std::collections::BTreeMap;

use dirchain_types::IdentityChainId;

use crate::{ConsensusError, ProcessList};

#[derive(Clone, Debug)]
pub struct ProcessLists {
    lists: BTreeMap<u32, ProcessList>,
    /// Lowest height that may still be created or fetched.
    base: u32,
}

impl ProcessLists {
    /// Start with an unsealed list at `start_height` holding `fed_servers`.
    pub fn new(start_height: u32, fed_servers: Vec<IdentityChainId>) -> Self {
        let mut lists = BTreeMap::new();
        lists.insert(start_height, ProcessList::new(start_height, fed_servers));
        Self {
            lists,
            base: start_height,
        }
    }

    /// Height of the newest list.
    pub fn current_height(&self) -> u32 {
        self.lists.keys().next_back().copied().unwrap_or(self.base)
    }

    /// The one height [`ProcessLists::get`] may create.
    pub fn next_height(&self) -> u32 {
        match self.lists.keys().next_back() {
            Some(h) => h + 1,
            None => self.base,
        }
    }

    /// The list for `height`, created on demand when `height` is the next
    /// expected one. A new list inherits the federated servers of the newest
    /// existing list. Any other missing height fails with `OutOfOrderHeight`.
    pub fn get(&mut self, height: u32) -> Result<&mut ProcessList, ConsensusError> {
        if !self.lists.contains_key(&height) {
            let next = self.next_height();
            if height != next {
                return Err(ConsensusError::OutOfOrderHeight {
                    requested: height,
                    next,
                });
            }
            let servers = self
                .lists
                .values()
                .next_back()
                .map(|pl| pl.fed_servers().to_vec())
                .unwrap_or_default();
            self.lists.insert(height, ProcessList::new(height, servers));
            tracing::debug!(height, "process list created");
        }
        self.lists
            .get_mut(&height)
            .ok_or(ConsensusError::OutOfOrderHeight {
                requested: height,
                next: height,
            })
    }

    pub fn get_existing(&self, height: u32) -> Option<&ProcessList> {
        self.lists.get(&height)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Drop sealed lists below `height`. Unsealed lists and the newest list
    /// are kept.
    pub fn prune_below(&mut self, height: u32) {
        let newest = self.current_height();
        self.lists
            .retain(|h, pl| *h >= height || *h == newest || !pl.is_sealed());
    }
}
