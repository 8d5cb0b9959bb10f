//! Cached view of the contract for one active address.

use crate::error::SyncError;
use crate::lifecycle::{TransactionRecord, TransactionStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use study_planner_domain::{Address, TaskSet};
use study_planner_protocols::{ConfirmationEvent, TxHash};
use tracing::{debug, warn};

/// Contract data exposed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractData {
    /// Last fetched `getMyTaskCount`, or the cached list length before any
    /// fetch completed.
    pub my_task_count: u64,
    /// Tasks in ledger order.
    pub tasks: TaskSet,
}

/// Progress flags exposed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractState {
    /// A dispatch is in flight or the current transaction is pending or confirming.
    pub is_loading: bool,
    /// The current transaction was submitted and awaits pickup.
    pub is_pending: bool,
    /// The current transaction is being watched for inclusion.
    pub is_confirming: bool,
    /// The current transaction was confirmed.
    pub is_confirmed: bool,
    /// Hash of the most recently submitted transaction.
    pub hash: Option<TxHash>,
    /// Retained error.
    pub error: Option<SyncError>,
}

/// Read-only copy of the manager's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    /// Active address, if any.
    pub owner: Option<Address>,
    /// Cached data.
    pub data: ContractData,
    /// Progress flags.
    pub state: ContractState,
}

/// Mutable cache owned by the sync manager for one session.
#[derive(Debug, Default)]
pub(crate) struct SyncState {
    /// Last successfully fetched remote count.
    pub(crate) task_count: Option<u64>,
    /// Last successfully fetched task list.
    pub(crate) tasks: TaskSet,
    /// Most recently submitted transaction.
    pub(crate) current_transaction: Option<TransactionRecord>,
    /// Older transactions still being watched.
    pub(crate) superseded: HashMap<TxHash, TransactionRecord>,
    /// First error since the last mutating action started.
    pub(crate) last_error: Option<SyncError>,
    /// Mutating actions between dispatch and submission result.
    pub(crate) dispatching: Arc<AtomicUsize>,
    /// Ticket of the most recently started fetch.
    pub(crate) fetch_started: u64,
    /// Ticket of the newest fetch whose result was applied.
    pub(crate) fetch_applied: u64,
}

impl SyncState {
    /// Hands out a ticket ordering this fetch after every earlier one.
    pub(crate) fn begin_fetch(&mut self) -> u64 {
        self.fetch_started += 1;
        self.fetch_started
    }

    /// Applies the outcome of fetch `ticket` unless a newer fetch already
    /// landed. Returns false for a stale result.
    pub(crate) fn finish_fetch(
        &mut self,
        ticket: u64,
        outcome: Result<(u64, TaskSet), SyncError>,
    ) -> bool {
        if ticket <= self.fetch_applied {
            debug!(
                ticket,
                applied = self.fetch_applied,
                "Discarding result of superseded fetch"
            );
            return false;
        }
        self.fetch_applied = ticket;
        match outcome {
            Ok((task_count, tasks)) => self.replace_tasks(task_count, tasks),
            Err(error) => self.record_error(error),
        }
        true
    }

    /// Replaces the cache wholesale with freshly fetched data.
    pub(crate) fn replace_tasks(&mut self, task_count: u64, tasks: TaskSet) {
        self.task_count = Some(task_count);
        self.tasks = tasks;
    }

    /// Keeps the first error; later ones are only logged.
    pub(crate) fn record_error(&mut self, error: SyncError) {
        if let Some(existing) = &self.last_error {
            debug!(retained = %existing, dropped = %error, "Error already recorded");
            return;
        }
        self.last_error = Some(error);
    }

    /// Clears the retained error at the start of a mutating action.
    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Makes `record` the current transaction.
    ///
    /// A previous transaction that has not settled keeps being tracked in
    /// `superseded` until its watcher reports a final result.
    pub(crate) fn track(&mut self, record: TransactionRecord) {
        if let Some(previous) = self.current_transaction.take() {
            if !previous.is_terminal() {
                warn!(
                    previous = %previous.hash,
                    current = %record.hash,
                    "New transaction submitted while another is in flight"
                );
                self.superseded.insert(previous.hash.clone(), previous);
            }
        }
        self.current_transaction = Some(record);
    }

    /// Applies a confirmation event to the transaction with `hash`.
    ///
    /// Returns the status the transaction ended up in.
    pub(crate) fn apply_event(
        &mut self,
        hash: &TxHash,
        event: &ConfirmationEvent,
    ) -> Option<TransactionStatus> {
        let record = self.record_mut(hash)?;
        record.apply(event);
        let status = record.status;
        let failure = record.error.clone();

        if status == TransactionStatus::Failed {
            self.record_error(SyncError::Confirmation {
                hash: hash.clone(),
                reason: failure.unwrap_or_default(),
            });
        }
        if status.is_terminal() {
            self.superseded.remove(hash);
        }
        Some(status)
    }

    /// Marks a transaction failed because its confirmation stream ended early.
    pub(crate) fn abandon(&mut self, hash: &TxHash, error: SyncError) {
        if let Some(record) = self.record_mut(hash) {
            if record.is_terminal() {
                return;
            }
            record.abandon(&error.to_string());
        }
        self.superseded.remove(hash);
        self.record_error(error);
    }

    /// Returns every transaction not yet settled.
    pub(crate) fn in_flight(&self) -> Vec<TransactionRecord> {
        self.superseded
            .values()
            .chain(self.current_transaction.iter())
            .filter(|r| !r.is_terminal())
            .cloned()
            .collect()
    }

    /// Builds the presentation-layer view.
    pub(crate) fn snapshot(&self, owner: &Address) -> SyncSnapshot {
        let status = self
            .current_transaction
            .as_ref()
            .map_or(TransactionStatus::Idle, |r| r.status);
        let is_pending = status == TransactionStatus::Submitted;
        let is_confirming = status == TransactionStatus::Confirming;
        let dispatching = self.dispatching.load(Ordering::SeqCst) > 0;

        SyncSnapshot {
            owner: Some(owner.clone()),
            data: ContractData {
                my_task_count: self.task_count.unwrap_or(self.tasks.len() as u64),
                tasks: self.tasks.clone(),
            },
            state: ContractState {
                is_loading: dispatching || is_pending || is_confirming,
                is_pending,
                is_confirming,
                is_confirmed: status == TransactionStatus::Confirmed,
                hash: self.current_transaction.as_ref().map(|r| r.hash.clone()),
                error: self.last_error.clone(),
            },
        }
    }

    fn record_mut(&mut self, hash: &TxHash) -> Option<&mut TransactionRecord> {
        match &mut self.current_transaction {
            Some(current) if &current.hash == hash => Some(current),
            _ => self.superseded.get_mut(hash),
        }
    }
}
