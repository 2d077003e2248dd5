//! Typed, verified fetches on top of a [`RawSource`].

use dirchain_ledger::{ChainBlock, Entry};
use dirchain_types::Hash32;

use crate::{PorterError, RawSource, RetryPolicy};

pub struct Fetcher<R: RawSource> {
    source: R,
    policy: RetryPolicy,
}

impl<R: RawSource> Fetcher<R> {
    pub fn new(source: R, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn head_key_mr(&self) -> Result<Hash32, PorterError> {
        let source = &self.source;
        self.policy
            .run("directory head", move || source.head_key_mr())
            .await
    }

    pub async fn raw(&self, hash: &Hash32) -> Result<Vec<u8>, PorterError> {
        let source = &self.source;
        self.policy
            .run("raw data", move || source.raw_data(hash))
            .await
    }

    /// Fetch and decode the block stored under `key_mr`, refusing data whose
    /// recomputed KeyMR differs.
    pub async fn fetch_block<B: ChainBlock>(&self, key_mr: &Hash32) -> Result<B, PorterError> {
        let raw = self.raw(key_mr).await?;
        let block = B::unmarshal(&raw)?;
        let actual = block.key_mr();
        if actual != *key_mr {
            return Err(PorterError::Malformed(format!(
                "{} block {key_mr} hashes to {actual}",
                B::KIND.as_str()
            )));
        }
        Ok(block)
    }

    pub async fn fetch_entry(&self, hash: &Hash32) -> Result<Entry, PorterError> {
        let raw = self.raw(hash).await?;
        let entry = Entry::unmarshal(&raw)?;
        let actual = entry.hash();
        if actual != *hash {
            return Err(PorterError::Malformed(format!(
                "entry {hash} hashes to {actual}"
            )));
        }
        Ok(entry)
    }
}
