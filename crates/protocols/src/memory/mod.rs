//! In-process implementation of the Study Planner ledger.
//!
//! Transactions are queued on submit and applied to the contract storage only
//! when mined, either automatically after a delay or manually through
//! [`InMemoryLedger::mine`]. Watchers receive the current status on subscribe
//! followed by every later transition. Only the most recent settled
//! transactions are kept; older ones become unknown.

mod contract;

pub use contract::DeletionMode;

use crate::LedgerClient;
use crate::error::LedgerError;
use crate::transaction::{
    ConfirmationEvent, ConfirmationSubscription, ContractCall, TransactionHandle, TxHash,
};
use async_trait::async_trait;
use contract::StudyPlannerContract;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use study_planner_domain::{Address, RawTask};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

/// When submitted transactions get mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationMode {
    /// Mine each transaction after a fixed delay.
    Automatic {
        /// Delay between submission and inclusion.
        delay: Duration,
    },
    /// Wait for [`InMemoryLedger::mine`] or [`InMemoryLedger::fail_transaction`].
    Manual,
}

/// Configuration for the in-memory ledger.
#[derive(Debug, Clone)]
pub struct InMemoryLedgerConfig {
    /// Mining behaviour.
    pub confirmation: ConfirmationMode,
    /// Deletion semantics of `deleteTask`.
    pub deletion: DeletionMode,
    /// Buffer size of each confirmation channel.
    pub watch_buffer: usize,
    /// Number of mined or failed transactions kept for late watchers.
    pub settled_retention: usize,
}

impl Default for InMemoryLedgerConfig {
    fn default() -> Self {
        Self {
            confirmation: ConfirmationMode::Automatic {
                delay: Duration::from_millis(500),
            },
            deletion: DeletionMode::Tombstone,
            watch_buffer: 16,
            settled_retention: 256,
        }
    }
}

/// Number of read calls served so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// `getMyTaskCount` calls.
    pub task_count_reads: usize,
    /// `getMyTasks` calls.
    pub task_list_reads: usize,
}

struct QueuedTransaction {
    owner: Address,
    call: ContractCall,
    status: ConfirmationEvent,
    watchers: Vec<mpsc::Sender<ConfirmationEvent>>,
}

/// An event waiting to be sent to the watchers registered when it happened.
struct Delivery {
    event: ConfirmationEvent,
    watchers: Vec<mpsc::Sender<ConfirmationEvent>>,
}

impl Delivery {
    /// Sends the event, waiting for buffer space. Must run without the
    /// ledger lock held.
    async fn send(self) {
        for tx in self.watchers {
            if tx.send(self.event.clone()).await.is_err() {
                debug!(event = ?self.event, "Watcher went away before delivery");
            }
        }
    }
}

impl QueuedTransaction {
    /// Records `event` and returns its delivery. Terminal events detach
    /// every watcher.
    fn transition(&mut self, event: ConfirmationEvent) -> Delivery {
        self.status = event.clone();
        self.watchers.retain(|tx| !tx.is_closed());
        let watchers = if event.is_terminal() {
            std::mem::take(&mut self.watchers)
        } else {
            self.watchers.clone()
        };
        Delivery { event, watchers }
    }
}

#[derive(Default)]
struct Faults {
    failing_reads: u32,
    reject_submit: Option<String>,
    raw_tasks: Option<Vec<RawTask>>,
}

struct LedgerState {
    contract: StudyPlannerContract,
    transactions: HashMap<TxHash, QueuedTransaction>,
    /// Settled hashes, oldest first.
    settled: VecDeque<TxHash>,
    faults: Faults,
}

impl LedgerState {
    fn record_settled(&mut self, hash: &TxHash, retention: usize) {
        self.settled.push_back(hash.clone());
        while self.settled.len() > retention {
            if let Some(evicted) = self.settled.pop_front() {
                self.transactions.remove(&evicted);
                debug!(hash = %evicted, "Evicted settled transaction");
            }
        }
    }
}

/// Study Planner ledger living in process memory.
#[derive(Clone)]
pub struct InMemoryLedger {
    config: InMemoryLedgerConfig,
    state: Arc<Mutex<LedgerState>>,
    task_count_reads: Arc<AtomicUsize>,
    task_list_reads: Arc<AtomicUsize>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new(config: InMemoryLedgerConfig) -> Self {
        let state = LedgerState {
            contract: StudyPlannerContract::new(config.deletion),
            transactions: HashMap::new(),
            settled: VecDeque::new(),
            faults: Faults::default(),
        };
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
            task_count_reads: Arc::new(AtomicUsize::new(0)),
            task_list_reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates an empty ledger that only mines on request.
    #[must_use]
    pub fn manual() -> Self {
        Self::new(InMemoryLedgerConfig {
            confirmation: ConfirmationMode::Manual,
            ..Default::default()
        })
    }

    /// Mines a queued transaction, applying its call to the contract.
    ///
    /// A revert is reported to watchers as a failed confirmation.
    ///
    /// # Errors
    /// Returns [`LedgerError::UnknownTransaction`] if the hash was never
    /// submitted or has been evicted.
    pub async fn mine(&self, hash: &TxHash) -> Result<(), LedgerError> {
        let deliveries = {
            let mut state = self.state.lock().await;
            let LedgerState {
                contract,
                transactions,
                ..
            } = &mut *state;

            let tx = transactions
                .get_mut(hash)
                .ok_or_else(|| LedgerError::UnknownTransaction(hash.to_string()))?;
            if tx.status.is_terminal() {
                debug!(hash = %hash, "Transaction already settled");
                return Ok(());
            }

            let confirming = tx.transition(ConfirmationEvent::Confirming);
            let settled = match contract.apply(&tx.owner, &tx.call) {
                Ok(()) => {
                    info!(
                        hash = %hash,
                        function = tx.call.function_name(),
                        "Transaction mined"
                    );
                    tx.transition(ConfirmationEvent::Confirmed)
                }
                Err(reason) => {
                    warn!(hash = %hash, reason = %reason, "Transaction reverted");
                    tx.transition(ConfirmationEvent::Failed { reason })
                }
            };
            state.record_settled(hash, self.config.settled_retention);
            [confirming, settled]
        };

        for delivery in deliveries {
            delivery.send().await;
        }
        Ok(())
    }

    /// Drops a queued transaction without applying it.
    ///
    /// # Errors
    /// Returns [`LedgerError::UnknownTransaction`] if the hash was never
    /// submitted or has been evicted.
    pub async fn fail_transaction(&self, hash: &TxHash, reason: &str) -> Result<(), LedgerError> {
        let delivery = {
            let mut state = self.state.lock().await;
            let tx = state
                .transactions
                .get_mut(hash)
                .ok_or_else(|| LedgerError::UnknownTransaction(hash.to_string()))?;
            if tx.status.is_terminal() {
                return Ok(());
            }
            let delivery = tx.transition(ConfirmationEvent::Failed {
                reason: reason.to_string(),
            });
            state.record_settled(hash, self.config.settled_retention);
            delivery
        };

        delivery.send().await;
        Ok(())
    }

    /// Makes the next `count` read calls fail with a connection error.
    pub async fn fail_next_reads(&self, count: u32) {
        self.state.lock().await.faults.failing_reads = count;
    }

    /// Makes the next submission be rejected before a hash is produced.
    pub async fn reject_next_submit(&self, reason: &str) {
        self.state.lock().await.faults.reject_submit = Some(reason.to_string());
    }

    /// Serves `raw` from `getMyTasks` instead of the stored tasks.
    pub async fn serve_raw_tasks(&self, raw: Option<Vec<RawTask>>) {
        self.state.lock().await.faults.raw_tasks = raw;
    }

    /// Returns how many reads were served.
    #[must_use]
    pub fn read_stats(&self) -> ReadStats {
        ReadStats {
            task_count_reads: self.task_count_reads.load(Ordering::SeqCst),
            task_list_reads: self.task_list_reads.load(Ordering::SeqCst),
        }
    }

    /// Returns hashes of transactions not yet mined or failed.
    pub async fn pending_transactions(&self) -> Vec<TxHash> {
        self.state
            .lock()
            .await
            .transactions
            .iter()
            .filter(|(_, tx)| !tx.status.is_terminal())
            .map(|(hash, _)| hash.clone())
            .collect()
    }

    fn take_read_fault(state: &mut LedgerState) -> Result<(), LedgerError> {
        if state.faults.failing_reads > 0 {
            state.faults.failing_reads -= 1;
            return Err(LedgerError::Connection("node unreachable".to_string()));
        }
        Ok(())
    }

    fn new_hash() -> TxHash {
        TxHash::new(format!(
            "0x{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        ))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(InMemoryLedgerConfig::default())
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn read_task_count(&self, owner: &Address) -> Result<u64, LedgerError> {
        self.task_count_reads.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        Self::take_read_fault(&mut state)?;
        Ok(state.contract.task_count(owner))
    }

    async fn read_tasks(&self, owner: &Address) -> Result<Vec<RawTask>, LedgerError> {
        self.task_list_reads.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        Self::take_read_fault(&mut state)?;
        if let Some(raw) = &state.faults.raw_tasks {
            return Ok(raw.clone());
        }
        Ok(state.contract.raw_tasks(owner))
    }

    async fn submit(
        &self,
        owner: &Address,
        call: ContractCall,
    ) -> Result<TransactionHandle, LedgerError> {
        let hash = {
            let mut state = self.state.lock().await;
            if let Some(reason) = state.faults.reject_submit.take() {
                return Err(LedgerError::Rejected(reason));
            }

            let hash = Self::new_hash();
            debug!(
                hash = %hash,
                owner = %owner,
                function = call.function_name(),
                "Transaction queued"
            );
            state.transactions.insert(
                hash.clone(),
                QueuedTransaction {
                    owner: owner.clone(),
                    call,
                    status: ConfirmationEvent::Pending,
                    watchers: Vec::new(),
                },
            );
            hash
        };

        if let ConfirmationMode::Automatic { delay } = self.config.confirmation {
            let ledger = self.clone();
            let mined = hash.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = ledger.mine(&mined).await {
                    warn!(error = %e, "Automatic mining failed");
                }
            });
        }

        Ok(TransactionHandle { hash })
    }

    async fn watch_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<ConfirmationSubscription, LedgerError> {
        let mut state = self.state.lock().await;
        let tx = state
            .transactions
            .get_mut(&handle.hash)
            .ok_or_else(|| LedgerError::UnknownTransaction(handle.hash.to_string()))?;

        let (sender, rx) = mpsc::channel(self.config.watch_buffer.max(1));
        if sender.try_send(tx.status.clone()).is_ok() && !tx.status.is_terminal() {
            tx.watchers.push(sender);
        }
        Ok(ConfirmationSubscription::new(rx))
    }
}
