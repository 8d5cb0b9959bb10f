//! Sync manager for the Study Planner contract.

use super::state::{SyncSnapshot, SyncState};
use crate::error::SyncError;
use crate::lifecycle::{TransactionRecord, TransactionStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use study_planner_domain::{Address, normalize_tasks};
use study_planner_protocols::{ContractCall, LedgerClient, TransactionHandle, TxHash};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

/// Configuration for the sync manager.
#[derive(Debug, Clone)]
pub struct SyncManagerConfig {
    /// Fetch count and tasks in the background as soon as an address is activated.
    pub fetch_on_activate: bool,
}

impl Default for SyncManagerConfig {
    fn default() -> Self {
        Self {
            fetch_on_activate: true,
        }
    }
}

/// State bound to one activated address.
struct Session {
    id: u64,
    owner: Address,
    state: SyncState,
}

/// Decrements the dispatch counter when a mutating action settles, including
/// when its future is dropped mid-flight.
struct DispatchGuard {
    dispatching: Arc<AtomicUsize>,
    changes: Arc<watch::Sender<u64>>,
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        self.dispatching.fetch_sub(1, Ordering::SeqCst);
        self.changes.send_modify(|revision| *revision += 1);
    }
}

/// Keeps a local view of one owner's tasks in step with the ledger.
///
/// Reads are cached and never fail towards the caller; mutating actions
/// return once the ledger accepted or rejected them, and confirmation is
/// tracked in the background. A confirmed transaction triggers exactly one
/// refetch of count and tasks.
///
/// Cloning is cheap and yields a handle to the same manager.
#[derive(Clone)]
pub struct SyncManager {
    /// Ledger client.
    ledger: Arc<dyn LedgerClient>,
    /// Configuration.
    config: SyncManagerConfig,
    /// Active session, if any.
    session: Arc<RwLock<Option<Session>>>,
    /// Confirmation watchers by transaction hash.
    watchers: Arc<Mutex<HashMap<TxHash, AbortHandle>>>,
    /// Revision counter bumped on every state change.
    changes: Arc<watch::Sender<u64>>,
    /// Last issued session id.
    last_session: Arc<AtomicU64>,
}

impl SyncManager {
    /// Creates an inactive manager.
    pub fn new(ledger: Arc<dyn LedgerClient>, config: SyncManagerConfig) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            ledger,
            config,
            session: Arc::new(RwLock::new(None)),
            watchers: Arc::new(Mutex::new(HashMap::new())),
            changes: Arc::new(changes),
            last_session: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts a fresh session for `owner`, discarding any previous one.
    pub async fn activate(&self, owner: Address) {
        self.abort_watchers().await;

        let id = self.last_session.fetch_add(1, Ordering::SeqCst) + 1;
        *self.session.write().await = Some(Session {
            id,
            owner: owner.clone(),
            state: SyncState::default(),
        });
        self.bump();
        info!(owner = %owner, session = id, "Sync session activated");

        if self.config.fetch_on_activate {
            let manager = self.clone();
            tokio::spawn(async move {
                manager.fetch_session(id, &owner).await;
            });
        }
    }

    /// Discards the session and detaches every confirmation watcher.
    pub async fn deactivate(&self) {
        self.abort_watchers().await;
        if let Some(session) = self.session.write().await.take() {
            info!(owner = %session.owner, session = session.id, "Sync session deactivated");
        }
        self.bump();
    }

    /// Returns the active address.
    pub async fn owner(&self) -> Option<Address> {
        self.session.read().await.as_ref().map(|s| s.owner.clone())
    }

    /// Returns a copy of the current data and progress flags.
    pub async fn snapshot(&self) -> SyncSnapshot {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.state.snapshot(&s.owner))
            .unwrap_or_default()
    }

    /// Returns every transaction submitted in this session that has not settled.
    pub async fn in_flight(&self) -> Vec<TransactionRecord> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.state.in_flight())
            .unwrap_or_default()
    }

    /// Subscribes to state changes; the value is a revision counter.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Reads count and tasks concurrently and replaces the cache.
    ///
    /// Failures are recorded as the retained error and the previous cache is
    /// kept. Does nothing while no address is active.
    pub async fn fetch_all(&self) {
        let Some((id, owner)) = self.active().await else {
            debug!("No active address, skipping fetch");
            return;
        };
        self.fetch_session(id, &owner).await;
    }

    /// Submits `addTask(title, due_date)`; an empty title is ignored.
    ///
    /// # Errors
    /// Returns [`SyncError::Submission`] if the ledger rejected the request,
    /// or [`SyncError::NotActive`] without an active address.
    pub async fn add_task(&self, title: &str, due_date: u64) -> Result<(), SyncError> {
        if title.is_empty() {
            debug!("Ignoring task with empty title");
            return Ok(());
        }
        self.dispatch(ContractCall::AddTask {
            title: title.to_string(),
            due_date,
        })
        .await
    }

    /// Submits `markCompleted(id)`.
    ///
    /// # Errors
    /// Returns [`SyncError::Submission`] if the ledger rejected the request,
    /// or [`SyncError::NotActive`] without an active address.
    pub async fn mark_completed(&self, id: u64) -> Result<(), SyncError> {
        self.dispatch(ContractCall::MarkCompleted { id }).await
    }

    /// Submits `deleteTask(id)`.
    ///
    /// # Errors
    /// Returns [`SyncError::Submission`] if the ledger rejected the request,
    /// or [`SyncError::NotActive`] without an active address.
    pub async fn delete_task(&self, id: u64) -> Result<(), SyncError> {
        self.dispatch(ContractCall::DeleteTask { id }).await
    }

    async fn active(&self) -> Option<(u64, Address)> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| (s.id, s.owner.clone()))
    }

    fn bump(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }

    /// Applies `f` if session `id` is still active. Returns false otherwise.
    async fn update<F>(&self, id: u64, f: F) -> bool
    where
        F: FnOnce(&mut SyncState),
    {
        let applied = match self.session.write().await.as_mut() {
            Some(session) if session.id == id => {
                f(&mut session.state);
                true
            }
            _ => false,
        };
        if applied {
            self.bump();
        } else {
            debug!(session = id, "Dropping update for discarded session");
        }
        applied
    }

    async fn fetch_session(&self, id: u64, owner: &Address) {
        let ticket = match self.session.write().await.as_mut() {
            Some(session) if session.id == id => session.state.begin_fetch(),
            _ => return,
        };

        let (count, raw) = tokio::join!(
            self.ledger.read_task_count(owner),
            self.ledger.read_tasks(owner)
        );

        let fetched = match (count, raw) {
            (Ok(count), Ok(raw)) => normalize_tasks(&raw)
                .map(|tasks| (count, tasks))
                .map_err(SyncError::Normalization),
            (Err(e), _) | (_, Err(e)) => Err(SyncError::Read(e)),
        };

        match &fetched {
            Ok((count, tasks)) => {
                debug!(owner = %owner, ticket, count, tasks = tasks.len(), "Fetched tasks");
            }
            Err(e) => {
                warn!(owner = %owner, ticket, error = %e, "Fetch failed, keeping cached tasks");
            }
        }
        self.update(id, |state| {
            state.finish_fetch(ticket, fetched);
        })
        .await;
    }

    async fn dispatch(&self, call: ContractCall) -> Result<(), SyncError> {
        let (id, owner, dispatching) = {
            let mut guard = self.session.write().await;
            let Some(session) = guard.as_mut() else {
                return Err(SyncError::NotActive);
            };
            session.state.clear_error();
            session.state.dispatching.fetch_add(1, Ordering::SeqCst);
            (
                session.id,
                session.owner.clone(),
                Arc::clone(&session.state.dispatching),
            )
        };
        self.bump();
        let _dispatch = DispatchGuard {
            dispatching,
            changes: Arc::clone(&self.changes),
        };

        let function = call.function_name();
        info!(owner = %owner, function, "Submitting transaction");

        let handle = match self.ledger.submit(&owner, call.clone()).await {
            Ok(handle) => handle,
            Err(e) => {
                let e = SyncError::Submission(e);
                error!(owner = %owner, function, error = %e, "Transaction submission failed");
                let reported = e.clone();
                self.update(id, |state| state.record_error(reported)).await;
                return Err(e);
            }
        };

        info!(hash = %handle.hash, function, "Transaction submitted");
        let record = TransactionRecord::submitted(handle.hash.clone(), call);
        if self.update(id, |state| state.track(record)).await {
            self.spawn_watcher(id, owner, handle).await;
        }
        Ok(())
    }

    async fn spawn_watcher(&self, id: u64, owner: Address, handle: TransactionHandle) {
        // Held across spawn so the watcher's own removal cannot run first.
        let mut watchers = self.watchers.lock().await;
        let hash = handle.hash.clone();
        let manager = self.clone();
        let task = tokio::spawn(async move {
            let hash = handle.hash.clone();
            manager.watch(id, &owner, &handle).await;
            manager.watchers.lock().await.remove(&hash);
        });
        watchers.insert(hash, task.abort_handle());
    }

    async fn watch(&self, id: u64, owner: &Address, handle: &TransactionHandle) {
        let hash = &handle.hash;
        let mut subscription = match self.ledger.watch_confirmation(handle).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(hash = %hash, error = %e, "Could not watch transaction");
                let failure = SyncError::Confirmation {
                    hash: hash.clone(),
                    reason: e.to_string(),
                };
                self.update(id, |state| state.abandon(hash, failure)).await;
                return;
            }
        };

        while let Some(event) = subscription.next().await {
            let mut status = None;
            if !self
                .update(id, |state| status = state.apply_event(hash, &event))
                .await
            {
                return;
            }

            match status {
                Some(TransactionStatus::Confirming) => {
                    debug!(hash = %hash, "Transaction confirming");
                }
                Some(TransactionStatus::Confirmed) => {
                    info!(hash = %hash, "Transaction confirmed, refreshing tasks");
                    self.fetch_session(id, owner).await;
                    return;
                }
                Some(TransactionStatus::Failed) => {
                    error!(hash = %hash, event = ?event, "Transaction failed");
                    return;
                }
                Some(_) => {}
                None => {
                    debug!(hash = %hash, "Transaction no longer tracked");
                    return;
                }
            }
        }

        warn!(hash = %hash, "Confirmation stream closed before settling");
        let failure = SyncError::WatchClosed { hash: hash.clone() };
        self.update(id, |state| state.abandon(hash, failure)).await;
    }

    async fn abort_watchers(&self) {
        let mut watchers = self.watchers.lock().await;
        for (hash, task) in watchers.drain() {
            debug!(hash = %hash, "Detaching confirmation watcher");
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use study_planner_domain::RawTask;
    use study_planner_protocols::{ConfirmationEvent, ConfirmationSubscription, LedgerError};
    use tokio::sync::{Notify, mpsc};
    use study_planner_protocols::prelude::{
        ConfirmationMode, DeletionMode, InMemoryLedger, InMemoryLedgerConfig, ReadStats,
    };

    fn owner() -> Address {
        "0x4444444444444444444444444444444444444444".parse().unwrap()
    }

    fn quiet() -> SyncManagerConfig {
        SyncManagerConfig {
            fetch_on_activate: false,
        }
    }

    async fn setup(ledger: &InMemoryLedger) -> SyncManager {
        let manager = SyncManager::new(Arc::new(ledger.clone()), quiet());
        manager.activate(owner()).await;
        manager
    }

    /// Adds and mines tasks directly on the ledger.
    async fn seed(ledger: &InMemoryLedger, titles: &[&str]) {
        for title in titles {
            let handle = ledger
                .submit(
                    &owner(),
                    ContractCall::AddTask {
                        title: (*title).to_string(),
                        due_date: 0,
                    },
                )
                .await
                .unwrap();
            ledger.mine(&handle.hash).await.unwrap();
        }
    }

    async fn wait_for<F>(manager: &SyncManager, predicate: F) -> SyncSnapshot
    where
        F: Fn(&SyncSnapshot) -> bool,
    {
        let mut changes = manager.changes();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let snapshot = manager.snapshot().await;
                if predicate(&snapshot) {
                    return snapshot;
                }
                changes.changed().await.unwrap();
            }
        })
        .await
        .unwrap()
    }

    async fn current_hash(manager: &SyncManager) -> TxHash {
        manager.snapshot().await.state.hash.unwrap()
    }

    /// Ledger wrapper with a slow first task read or a truncated
    /// confirmation stream.
    struct ScriptedLedger {
        inner: InMemoryLedger,
        delay_next_task_read: AtomicBool,
        task_read_taken: Notify,
        close_watch_after_pending: bool,
    }

    impl ScriptedLedger {
        fn new(inner: &InMemoryLedger) -> Self {
            Self {
                inner: inner.clone(),
                delay_next_task_read: AtomicBool::new(false),
                task_read_taken: Notify::new(),
                close_watch_after_pending: false,
            }
        }
    }

    #[async_trait]
    impl LedgerClient for ScriptedLedger {
        async fn read_task_count(&self, owner: &Address) -> Result<u64, LedgerError> {
            self.inner.read_task_count(owner).await
        }

        async fn read_tasks(&self, owner: &Address) -> Result<Vec<RawTask>, LedgerError> {
            let raw = self.inner.read_tasks(owner).await;
            if self.delay_next_task_read.swap(false, Ordering::SeqCst) {
                self.task_read_taken.notify_one();
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            raw
        }

        async fn submit(
            &self,
            owner: &Address,
            call: ContractCall,
        ) -> Result<TransactionHandle, LedgerError> {
            self.inner.submit(owner, call).await
        }

        async fn watch_confirmation(
            &self,
            handle: &TransactionHandle,
        ) -> Result<ConfirmationSubscription, LedgerError> {
            if !self.close_watch_after_pending {
                return self.inner.watch_confirmation(handle).await;
            }
            let (tx, rx) = mpsc::channel(1);
            let _ = tx.try_send(ConfirmationEvent::Pending);
            Ok(ConfirmationSubscription::new(rx))
        }
    }

    #[tokio::test]
    async fn test_fetch_empty_address() {
        let ledger = InMemoryLedger::manual();
        let manager = setup(&ledger).await;

        manager.fetch_all().await;

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.data.my_task_count, 0);
        assert!(snapshot.data.tasks.is_empty());
        assert!(snapshot.state.error.is_none());
    }

    #[tokio::test]
    async fn test_refetch_is_idempotent() {
        let ledger = InMemoryLedger::manual();
        seed(&ledger, &["a", "b", "c"]).await;
        let manager = setup(&ledger).await;

        manager.fetch_all().await;
        let first = manager.snapshot().await.data;
        manager.fetch_all().await;
        let second = manager.snapshot().await.data;

        assert_eq!(first, second);
        assert_eq!(first.my_task_count, 3);
    }

    #[tokio::test]
    async fn test_empty_title_is_noop() {
        let ledger = InMemoryLedger::manual();
        let manager = setup(&ledger).await;
        let before = manager.snapshot().await;

        manager.add_task("", 1_735_689_600).await.unwrap();

        assert_eq!(manager.snapshot().await, before);
        assert!(ledger.pending_transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_cached_data() {
        let ledger = InMemoryLedger::manual();
        seed(&ledger, &["a", "b"]).await;
        let manager = setup(&ledger).await;
        manager.fetch_all().await;
        let cached = manager.snapshot().await.data;

        ledger.fail_next_reads(2).await;
        manager.fetch_all().await;

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.data, cached);
        assert!(matches!(
            snapshot.state.error,
            Some(SyncError::Read(LedgerError::Connection(_)))
        ));
    }

    #[tokio::test]
    async fn test_malformed_record_fails_whole_fetch() {
        let ledger = InMemoryLedger::manual();
        seed(&ledger, &["a"]).await;
        let manager = setup(&ledger).await;
        manager.fetch_all().await;

        let raw: Vec<RawTask> = serde_json::from_value(serde_json::json!([
            [0, "fine", 0, false, true],
            ["not-a-number", "broken"]
        ]))
        .unwrap();
        ledger.serve_raw_tasks(Some(raw)).await;
        manager.fetch_all().await;

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.data.tasks.len(), 1);
        assert_eq!(snapshot.data.tasks[0].title, "a");
        assert!(matches!(
            snapshot.state.error,
            Some(SyncError::Normalization(_))
        ));
    }

    #[tokio::test]
    async fn test_add_task_refetches_after_confirmation() {
        let ledger = InMemoryLedger::manual();
        let manager = setup(&ledger).await;

        manager.add_task("Study", 1_735_689_600).await.unwrap();

        // Nothing inserted optimistically.
        let snapshot = manager.snapshot().await;
        assert!(snapshot.data.tasks.is_empty());
        assert!(snapshot.state.is_pending);
        assert!(snapshot.state.is_loading);
        assert_eq!(ledger.read_stats(), ReadStats::default());

        ledger.mine(&current_hash(&manager).await).await.unwrap();
        let snapshot = wait_for(&manager, |s| !s.data.tasks.is_empty()).await;

        let task = &snapshot.data.tasks[0];
        assert_eq!(task.title, "Study");
        assert_eq!(task.due_date, 1_735_689_600);
        assert!(!task.completed);
        assert_eq!(snapshot.data.my_task_count, 1);
        assert!(snapshot.state.is_confirmed);
        assert!(!snapshot.state.is_loading);
    }

    #[tokio::test]
    async fn test_confirmation_triggers_exactly_one_refetch() {
        let ledger = InMemoryLedger::manual();
        let manager = setup(&ledger).await;

        manager.add_task("Study", 0).await.unwrap();
        ledger.mine(&current_hash(&manager).await).await.unwrap();
        wait_for(&manager, |s| s.data.tasks.len() == 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            ledger.read_stats(),
            ReadStats {
                task_count_reads: 1,
                task_list_reads: 1,
            }
        );
        assert!(manager.in_flight().await.is_empty());
    }

    #[tokio::test]
    async fn test_mark_completed_changes_only_target() {
        let ledger = InMemoryLedger::manual();
        seed(&ledger, &["t0", "t1", "t2", "t3", "t4", "t5", "t6"]).await;
        let manager = setup(&ledger).await;
        manager.fetch_all().await;
        let before = manager.snapshot().await.data.tasks;
        assert!(!before[5].completed);

        manager.mark_completed(5).await.unwrap();
        ledger.mine(&current_hash(&manager).await).await.unwrap();
        let after = wait_for(&manager, |s| s.data.tasks.iter().any(|t| t.id == 5 && t.completed))
            .await
            .data
            .tasks;
        assert_eq!(after.len(), before.len());

        for (old, new) in before.iter().zip(&after) {
            if new.id == 5 {
                assert!(new.completed);
                assert_eq!(new.title, old.title);
            } else {
                assert_eq!(new, old);
            }
        }
    }

    #[tokio::test]
    async fn test_delete_task_tombstones() {
        let ledger = InMemoryLedger::manual();
        seed(&ledger, &["t0", "t1", "t2"]).await;
        let manager = setup(&ledger).await;

        manager.delete_task(2).await.unwrap();
        ledger.mine(&current_hash(&manager).await).await.unwrap();
        let snapshot = wait_for(&manager, |s| s.data.tasks.iter().any(|t| !t.exists)).await;

        let deleted = snapshot.data.tasks.iter().find(|t| t.id == 2).unwrap();
        assert!(!deleted.exists);
        assert_eq!(snapshot.data.my_task_count, 2);
    }

    #[tokio::test]
    async fn test_delete_task_removes() {
        let ledger = InMemoryLedger::new(InMemoryLedgerConfig {
            confirmation: ConfirmationMode::Manual,
            deletion: DeletionMode::Remove,
            ..Default::default()
        });
        seed(&ledger, &["t0", "t1", "t2"]).await;
        let manager = setup(&ledger).await;

        manager.delete_task(2).await.unwrap();
        ledger.mine(&current_hash(&manager).await).await.unwrap();
        let snapshot = wait_for(&manager, |s| s.state.is_confirmed && s.data.tasks.len() == 2).await;

        assert!(snapshot.data.tasks.iter().all(|t| t.id != 2));
        assert_eq!(snapshot.data.tasks.len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_submission_is_rethrown() {
        let ledger = InMemoryLedger::manual();
        let manager = setup(&ledger).await;
        ledger.reject_next_submit("User rejected the request").await;

        let err = manager.add_task("Study", 0).await.unwrap_err();
        let expected =
            SyncError::Submission(LedgerError::Rejected("User rejected the request".to_string()));
        assert_eq!(err, expected);

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.state.error, Some(expected));
        assert!(!snapshot.state.is_loading);
        assert!(snapshot.state.hash.is_none());
    }

    #[tokio::test]
    async fn test_new_action_clears_previous_error() {
        let ledger = InMemoryLedger::manual();
        let manager = setup(&ledger).await;
        ledger.reject_next_submit("denied").await;
        assert!(manager.add_task("a", 0).await.is_err());

        manager.add_task("b", 0).await.unwrap();
        assert!(manager.snapshot().await.state.error.is_none());
    }

    #[tokio::test]
    async fn test_reverted_transaction_records_error_without_refetch() {
        let ledger = InMemoryLedger::manual();
        let manager = setup(&ledger).await;

        // Unknown ids are not validated locally.
        manager.mark_completed(42).await.unwrap();
        let hash = current_hash(&manager).await;
        ledger.mine(&hash).await.unwrap();

        let snapshot = wait_for(&manager, |s| s.state.error.is_some()).await;
        assert_eq!(
            snapshot.state.error,
            Some(SyncError::Confirmation {
                hash,
                reason: "Task does not exist".to_string(),
            })
        );
        assert!(!snapshot.state.is_loading);
        assert!(!snapshot.state.is_confirmed);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ledger.read_stats(), ReadStats::default());
    }

    #[tokio::test]
    async fn test_overlapping_actions_track_latest_and_refetch_both() {
        let ledger = InMemoryLedger::manual();
        let manager = setup(&ledger).await;

        manager.add_task("first", 0).await.unwrap();
        let first = current_hash(&manager).await;
        manager.add_task("second", 0).await.unwrap();
        let second = current_hash(&manager).await;
        assert_ne!(first, second);
        assert_eq!(manager.in_flight().await.len(), 2);

        ledger.mine(&first).await.unwrap();
        let snapshot = wait_for(&manager, |s| s.data.tasks.len() == 1).await;
        assert_eq!(snapshot.state.hash, Some(second.clone()));
        assert!(snapshot.state.is_pending);

        ledger.mine(&second).await.unwrap();
        let snapshot = wait_for(&manager, |s| s.data.tasks.len() == 2).await;
        assert!(snapshot.state.is_confirmed);
        assert!(manager.in_flight().await.is_empty());
    }

    #[tokio::test]
    async fn test_deactivate_detaches_watchers() {
        let ledger = InMemoryLedger::manual();
        let manager = setup(&ledger).await;
        manager.add_task("Study", 0).await.unwrap();
        let hash = current_hash(&manager).await;

        manager.deactivate().await;
        ledger.mine(&hash).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(manager.snapshot().await, SyncSnapshot::default());
        assert!(manager.owner().await.is_none());
        assert_eq!(ledger.read_stats(), ReadStats::default());
    }

    #[tokio::test]
    async fn test_actions_require_active_address() {
        let ledger = InMemoryLedger::manual();
        let manager = SyncManager::new(Arc::new(ledger.clone()), quiet());

        assert_eq!(manager.add_task("Study", 0).await, Err(SyncError::NotActive));
        assert_eq!(manager.delete_task(1).await, Err(SyncError::NotActive));
        manager.fetch_all().await;
        assert_eq!(ledger.read_stats(), ReadStats::default());
    }

    #[tokio::test]
    async fn test_activate_fetches_in_background() {
        let ledger = InMemoryLedger::manual();
        seed(&ledger, &["a", "b"]).await;
        let manager = SyncManager::new(Arc::new(ledger.clone()), SyncManagerConfig::default());

        manager.activate(owner()).await;
        let snapshot = wait_for(&manager, |s| s.data.tasks.len() == 2).await;
        assert_eq!(snapshot.owner, Some(owner()));
        assert_eq!(snapshot.data.my_task_count, 2);
    }

    #[tokio::test]
    async fn test_automatic_confirmation_end_to_end() {
        let ledger = InMemoryLedger::new(InMemoryLedgerConfig {
            confirmation: ConfirmationMode::Automatic {
                delay: Duration::from_millis(10),
            },
            ..Default::default()
        });
        let manager = setup(&ledger).await;

        manager.add_task("Study", 1_735_689_600).await.unwrap();
        let snapshot = wait_for(&manager, |s| s.state.is_confirmed && !s.data.tasks.is_empty()).await;

        assert_eq!(snapshot.data.tasks[0].title, "Study");
        assert!(!snapshot.state.is_loading);
    }

    #[tokio::test]
    async fn test_slow_stale_fetch_does_not_overwrite_refetch() {
        let ledger = InMemoryLedger::manual();
        let scripted = Arc::new(ScriptedLedger::new(&ledger));
        scripted.delay_next_task_read.store(true, Ordering::SeqCst);
        let manager = SyncManager::new(scripted.clone(), quiet());
        manager.activate(owner()).await;

        let background = tokio::spawn({
            let manager = manager.clone();
            async move { manager.fetch_all().await }
        });
        scripted.task_read_taken.notified().await;

        manager.add_task("Study", 1_735_689_600).await.unwrap();
        ledger.mine(&current_hash(&manager).await).await.unwrap();
        wait_for(&manager, |s| s.data.tasks.len() == 1).await;

        background.await.unwrap();
        let data = manager.snapshot().await.data;
        assert_eq!(data.my_task_count, 1);
        assert_eq!(data.tasks.len(), 1);
        assert_eq!(data.tasks[0].title, "Study");
    }

    #[tokio::test]
    async fn test_closed_confirmation_stream_fails_without_refetch() {
        let ledger = InMemoryLedger::manual();
        let mut scripted = ScriptedLedger::new(&ledger);
        scripted.close_watch_after_pending = true;
        let manager = SyncManager::new(Arc::new(scripted), quiet());
        manager.activate(owner()).await;

        manager.add_task("Study", 0).await.unwrap();
        let hash = current_hash(&manager).await;
        let snapshot = wait_for(&manager, |s| s.state.error.is_some()).await;

        assert_eq!(snapshot.state.error, Some(SyncError::WatchClosed { hash }));
        assert!(!snapshot.state.is_loading);
        assert!(!snapshot.state.is_confirmed);
        assert!(manager.in_flight().await.is_empty());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ledger.read_stats(), ReadStats::default());
    }
}
