//! The in-memory ledger store.
//!
//! Holds the single canonical chain and serializes every mutation behind one
//! write lock. Readers get an `Arc` snapshot and never see a chain mid-commit.

use std::sync::Arc;

use parking_lot::RwLock;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::chain::{self, build_block, choose_chain, format_timestamp, ForkChoice};
use crate::error::{ChainError, ValidationError};
use crate::model::Block;

/// An immutable view of the canonical chain at one point in time.
pub type Snapshot = Arc<Vec<Block>>;

/// What happened to a block handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendStatus {
    /// The chain containing the block is now canonical.
    Committed,
    /// The block validated but fork resolution kept the existing chain, so
    /// the block was discarded.
    Superseded,
    /// The block does not extend its parent; nothing changed.
    Rejected(ValidationError),
}

#[derive(Debug, Clone)]
pub struct AppendOutcome {
    pub block: Block,
    pub status: AppendStatus,
}

impl AppendOutcome {
    /// True unless the block was rejected. A superseded block still counts,
    /// matching what the gateway reports to the submitter.
    pub fn is_success(&self) -> bool {
        !matches!(self.status, AppendStatus::Rejected(_))
    }
}

/// Process-wide owner of the canonical chain.
pub struct LedgerStore {
    chain: RwLock<Snapshot>,
}

impl LedgerStore {
    /// Start a chain holding only a genesis block stamped now.
    pub fn new() -> Result<Self, ChainError> {
        let genesis = Block::genesis(format_timestamp(OffsetDateTime::now_utc())?);
        info!(hash = %genesis.hash, timestamp = %genesis.timestamp, "genesis block created");
        Ok(Self::with_genesis(genesis))
    }

    /// Start a chain from a caller-supplied genesis block.
    pub fn with_genesis(genesis: Block) -> Self {
        Self {
            chain: RwLock::new(Arc::new(vec![genesis])),
        }
    }

    /// Consistent snapshot of the canonical chain.
    pub fn read(&self) -> Snapshot {
        self.chain.read().clone()
    }

    /// Tip of the canonical chain; `None` only for a store with no blocks,
    /// which the constructors never produce.
    pub fn last_block(&self) -> Option<Block> {
        self.chain.read().last().cloned()
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.chain.read().len()
    }

    /// Build a block for `value` on the current tip and commit it.
    ///
    /// Read-parent, build, validate, resolve and commit all happen under one
    /// write lock, so two appends can never extend the same parent.
    pub fn try_append(&self, value: i64) -> Result<AppendOutcome, ChainError> {
        let mut guard = self.chain.write();
        let current = guard.clone();
        let Some(parent) = current.last() else {
            return Err(ChainError::EmptyChain);
        };

        let block = build_block(parent, value)?;
        if let Err(e) = chain::validate_block(&block, parent) {
            warn!(index = block.index, error = %e, "rejected block");
            return Ok(AppendOutcome {
                block,
                status: AppendStatus::Rejected(e),
            });
        }

        let mut candidate = Vec::with_capacity(current.len() + 1);
        candidate.extend_from_slice(&current);
        candidate.push(block.clone());

        let status = commit_resolved(&mut guard, candidate);
        Ok(AppendOutcome { block, status })
    }

    /// Offer a whole chain whose tip was built on a possibly stale snapshot.
    ///
    /// Everything below the tip must be a prefix of the canonical chain, so
    /// only the tip is new; it is then checked against its parent in that
    /// prefix and fork resolution decides between the two chains.
    pub fn propose(&self, candidate: Vec<Block>) -> Result<AppendOutcome, ChainError> {
        let Some((tip, history)) = candidate.split_last() else {
            return Err(ChainError::EmptyChain);
        };
        let tip = tip.clone();

        let mut guard = self.chain.write();
        let checked = match history.last() {
            Some(parent) => check_history(history, &guard)
                .and_then(|()| chain::validate_block(&tip, parent)),
            // A lone block can only ever be the canonical genesis itself.
            None => chain::validate_genesis(&tip).and_then(|()| match guard.first() {
                Some(genesis) if *genesis == tip => Ok(()),
                _ => Err(ValidationError::DivergentHistory { position: 0 }),
            }),
        };
        if let Err(e) = checked {
            warn!(index = tip.index, error = %e, "rejected proposed chain");
            return Ok(AppendOutcome {
                block: tip,
                status: AppendStatus::Rejected(e),
            });
        }

        let status = commit_resolved(&mut guard, candidate);
        Ok(AppendOutcome { block: tip, status })
    }
}

/// `history` must match the canonical chain block for block.
fn check_history(history: &[Block], current: &[Block]) -> Result<(), ValidationError> {
    if history.len() > current.len() {
        return Err(ValidationError::DivergentHistory {
            position: current.len(),
        });
    }
    match history.iter().zip(current).position(|(proposed, canonical)| proposed != canonical) {
        Some(position) => Err(ValidationError::DivergentHistory { position }),
        None => Ok(()),
    }
}

/// Run fork choice against the chain behind `guard` and swap in the winner.
fn commit_resolved(guard: &mut Snapshot, candidate: Vec<Block>) -> AppendStatus {
    match choose_chain(candidate.len(), guard.len()) {
        ForkChoice::Candidate => {
            let len = candidate.len();
            let tip = candidate.last().map(|b| b.hash.clone()).unwrap_or_default();
            *guard = Arc::new(candidate);
            info!(length = len, tip = %tip, "committed chain");
            debug!(chain = ?guard, "canonical chain");
            AppendStatus::Committed
        }
        ForkChoice::Current => {
            info!(
                candidate_length = candidate.len(),
                current_length = guard.len(),
                "fork resolution kept current chain"
            );
            AppendStatus::Superseded
        }
    }
}
