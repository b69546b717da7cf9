//! Transaction Executor
//!
//! Submits intents and drives each one through its lifecycle:
//!
//! ```text
//! Submitting -> Pending(hash) -> Confirmed(hash)
//!            \              \-> Failed(RevertedOrTimeout)
//!             \-> Failed(UserRejected | Transport)
//! ```
//!
//! Every submission gets its own tracked entry and state channel; nothing is
//! shared between concurrent submissions. Entries that reached a terminal
//! state are dropped from the listing after the retention window.

use std::sync::Arc;
use std::time::Duration;

use evm_client::ChainClient;
use serde::Serialize;
use swiftswap_core::{Address, ClientError, TxHash};
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use uuid::Uuid;

use crate::cache::StateCaches;
use crate::state::{FailureReason, IntentKind, TransactionIntent, TxState};

/// Handle to one submitted intent
#[derive(Debug, Clone)]
pub struct TxHandle {
    id: Uuid,
    kind: IntentKind,
    state: watch::Receiver<TxState>,
}

impl TxHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    pub fn state(&self) -> TxState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TxState> {
        self.state.clone()
    }

    /// Wait for a terminal state
    pub async fn wait(&self) -> TxState {
        let mut rx = self.state.clone();
        if rx.wait_for(TxState::is_terminal).await.is_err() {
            tracing::debug!("{} {} driver ended before a terminal state", self.kind, self.id);
        }
        let state = rx.borrow().clone();
        state
    }
}

struct TrackedTx {
    handle: TxHandle,
    intent: TransactionIntent,
    from: Address,
    submitted_at: Instant,
}

/// Listing entry for a tracked transaction
#[derive(Debug, Clone, Serialize)]
pub struct TrackedTxInfo {
    pub id: Uuid,
    pub kind: IntentKind,
    pub from: Address,
    pub intent: TransactionIntent,
    pub state: TxState,
    pub elapsed_secs: u64,
}

/// Finished transactions stay listed this long by default
pub const DEFAULT_TX_RETENTION: Duration = Duration::from_secs(10 * 60);

type TrackedList = Arc<Mutex<Vec<TrackedTx>>>;

/// Submits intents and tracks their lifecycles
pub struct TransactionExecutor {
    client: Arc<dyn ChainClient>,
    caches: StateCaches,
    tracked: TrackedList,
    retention: Duration,
}

impl TransactionExecutor {
    pub fn new(client: Arc<dyn ChainClient>, caches: StateCaches) -> Self {
        Self {
            client,
            caches,
            tracked: Arc::new(Mutex::new(Vec::new())),
            retention: DEFAULT_TX_RETENTION,
        }
    }

    /// Keep finished transactions listed for `retention` after they settle
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn caches(&self) -> &StateCaches {
        &self.caches
    }

    /// Submit `intent` from `from` and return immediately with its handle
    pub async fn submit(&self, intent: TransactionIntent, from: Address) -> TxHandle {
        let (state_tx, state_rx) = watch::channel(TxState::Submitting);
        let handle = TxHandle {
            id: Uuid::new_v4(),
            kind: intent.kind(),
            state: state_rx,
        };

        tracing::debug!("Tracking {} {} from {}", handle.kind, handle.id, from);
        self.tracked.lock().await.push(TrackedTx {
            handle: handle.clone(),
            intent: intent.clone(),
            from,
            submitted_at: Instant::now(),
        });

        let (client, caches, tracked) = (
            self.client.clone(),
            self.caches.clone(),
            self.tracked.clone(),
        );
        let (id, retention) = (handle.id, self.retention);
        tokio::spawn(async move {
            drive(client, caches, id, intent, from, state_tx).await;
            tokio::time::sleep(retention).await;
            evict(&tracked, id).await;
        });

        handle
    }

    pub async fn get(&self, id: Uuid) -> Option<TxHandle> {
        self.tracked
            .lock()
            .await
            .iter()
            .find(|t| t.handle.id == id)
            .map(|t| t.handle.clone())
    }

    pub async fn tracked(&self) -> Vec<TrackedTxInfo> {
        self.tracked
            .lock()
            .await
            .iter()
            .map(|t| TrackedTxInfo {
                id: t.handle.id,
                kind: t.handle.kind,
                from: t.from,
                intent: t.intent.clone(),
                state: t.handle.state(),
                elapsed_secs: t.submitted_at.elapsed().as_secs(),
            })
            .collect()
    }

    /// Forget transactions that reached a terminal state
    pub async fn prune_terminal(&self) -> usize {
        let mut tracked = self.tracked.lock().await;
        let before = tracked.len();
        tracked.retain(|t| !t.handle.state().is_terminal());
        before - tracked.len()
    }
}

async fn evict(tracked: &TrackedList, id: Uuid) {
    let mut tracked = tracked.lock().await;
    let before = tracked.len();
    tracked.retain(|t| t.handle.id != id);
    if tracked.len() < before {
        tracing::debug!("Dropped settled transaction {} from tracking", id);
    }
}

fn advance(state: &watch::Sender<TxState>, next: TxState) {
    state.send_if_modified(|current| {
        if !current.can_transition_to(&next) {
            tracing::warn!("Ignoring transition {:?} -> {:?}", current, next);
            return false;
        }
        *current = next;
        true
    });
}

async fn drive(
    client: Arc<dyn ChainClient>,
    caches: StateCaches,
    id: Uuid,
    intent: TransactionIntent,
    from: Address,
    state: watch::Sender<TxState>,
) {
    let kind = intent.kind();
    let hash = match client.submit(&intent.write_call(), from).await {
        Ok(hash) => hash,
        Err(e) => {
            let reason = submit_failure(e);
            match &reason {
                FailureReason::UserRejected => tracing::info!("{} {} rejected by user", kind, id),
                other => tracing::warn!("{} {} failed to submit: {}", kind, id, other),
            }
            advance(&state, TxState::Failed(reason));
            return;
        }
    };

    tracing::info!("{} {} pending as {}", kind, id, hash);
    advance(&state, TxState::Pending(hash));

    match client.wait_for_inclusion(hash).await {
        Ok(inclusion) if inclusion.success => {
            // Refresh reads before observers see the confirmation
            for call in intent.stale_reads(from) {
                caches.invalidate(&call).await;
            }
            tracing::info!(
                "{} {} confirmed in block {:?}",
                kind,
                id,
                inclusion.block_number
            );
            advance(&state, TxState::Confirmed(hash));
        }
        Ok(inclusion) => {
            let reason = revert_reason(hash, inclusion.block_number);
            tracing::warn!("{} {} {}", kind, id, reason);
            advance(
                &state,
                TxState::Failed(FailureReason::RevertedOrTimeout(reason)),
            );
        }
        Err(e) => {
            let reason = match e {
                ClientError::Reverted { reason } => reason,
                other => other.to_string(),
            };
            tracing::warn!("{} {} did not confirm: {}", kind, id, reason);
            advance(
                &state,
                TxState::Failed(FailureReason::RevertedOrTimeout(reason)),
            );
        }
    }
}

fn submit_failure(err: ClientError) -> FailureReason {
    match err {
        ClientError::UserRejected => FailureReason::UserRejected,
        // Estimation reverts surface at submission time with the node's reason
        ClientError::Reverted { reason } => FailureReason::RevertedOrTimeout(reason),
        other => FailureReason::Transport(other.to_string()),
    }
}

fn revert_reason(hash: TxHash, block: Option<u64>) -> String {
    match block {
        Some(block) => format!("transaction {} reverted in block {}", hash, block),
        None => format!("transaction {} reverted", hash),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pool, FakeChainClient, OWNER};
    use evm_client::ReadCall;
    use std::time::Duration;
    use swiftswap_core::U256;

    fn executor(client: Arc<FakeChainClient>) -> TransactionExecutor {
        TransactionExecutor::new(
            client,
            StateCaches::new(Duration::from_secs(10), Duration::from_secs(10)),
        )
    }

    fn approve_intent() -> TransactionIntent {
        let p = pool();
        TransactionIntent::Approve {
            token: p.token0.address,
            spender: p.address,
            amount: U256::from(1000),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_confirms() {
        let client = FakeChainClient::shared();
        client.gate_inclusions(true);
        let executor = executor(client.clone());

        let handle = executor.submit(approve_intent(), OWNER).await;
        client.wait_for_inclusion_calls(1).await;
        assert!(matches!(handle.state(), TxState::Pending(_)));

        client.gate_inclusions(false);
        let state = handle.wait().await;
        assert_eq!(state, TxState::Confirmed(TxHash::with_last_byte(1)));
        assert_eq!(client.submitted()[0].1, OWNER);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_rejection_never_pending() {
        let client = FakeChainClient::shared();
        client.gate_submits(true);
        client.script_submit(Err(ClientError::UserRejected));
        let executor = executor(client.clone());

        let handle = executor.submit(approve_intent(), OWNER).await;
        client.wait_for_submits(1).await;
        assert_eq!(handle.state(), TxState::Submitting);

        client.gate_submits(false);
        assert_eq!(
            handle.wait().await,
            TxState::Failed(FailureReason::UserRejected)
        );
        assert_eq!(client.inclusion_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_on_submit() {
        let client = FakeChainClient::shared();
        client.script_submit(Err(ClientError::Transport {
            message: "connection refused".into(),
        }));
        let executor = executor(client.clone());

        let handle = executor.submit(approve_intent(), OWNER).await;
        assert!(matches!(
            handle.wait().await,
            TxState::Failed(FailureReason::Transport(ref m)) if m.contains("connection refused")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mined_revert_fails() {
        let client = FakeChainClient::shared();
        client.script_inclusion(Ok(false));
        let executor = executor(client.clone());

        let handle = executor.submit(approve_intent(), OWNER).await;
        assert!(matches!(
            handle.wait().await,
            TxState::Failed(FailureReason::RevertedOrTimeout(ref r)) if r.contains("reverted")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_invalidates_allowance() {
        let client = FakeChainClient::shared();
        let p = pool();
        let call = ReadCall::Allowance {
            token: p.token0.address,
            owner: OWNER,
            spender: p.address,
        };
        client.set_read(call.clone(), U256::ZERO);
        let executor = executor(client.clone());
        let gatekeeper = executor.caches().allowances.clone();

        let before = gatekeeper
            .get_allowance(client.as_ref(), p.token0.address, OWNER, p.address)
            .await
            .unwrap();
        assert_eq!(before, U256::ZERO);

        // Chain state moves on, but the cached value is still fresh
        client.set_read(call.clone(), U256::from(1000));
        let cached = gatekeeper
            .get_allowance(client.as_ref(), p.token0.address, OWNER, p.address)
            .await
            .unwrap();
        assert_eq!(cached, U256::ZERO);

        let handle = executor.submit(approve_intent(), OWNER).await;
        assert!(matches!(handle.wait().await, TxState::Confirmed(_)));

        let after = gatekeeper
            .get_allowance(client.as_ref(), p.token0.address, OWNER, p.address)
            .await
            .unwrap();
        assert_eq!(after, U256::from(1000));
        assert_eq!(client.read_count(&call), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_mint_refreshes_balance() {
        let client = FakeChainClient::shared();
        let token = pool().token0.address;
        let call = ReadCall::BalanceOf {
            token,
            owner: OWNER,
        };
        let executor = executor(client.clone());
        let balances = executor.caches().balances.clone();

        let before = balances.balance_of(client.as_ref(), token, OWNER).await.unwrap();
        assert_eq!(before, U256::ZERO);

        client.set_read(call.clone(), U256::from(1000));
        let intent = TransactionIntent::Mint {
            token,
            to: OWNER,
            amount: U256::from(1000),
        };
        let handle = executor.submit(intent, OWNER).await;
        assert!(matches!(handle.wait().await, TxState::Confirmed(_)));

        let after = balances.balance_of(client.as_ref(), token, OWNER).await.unwrap();
        assert_eq!(after, U256::from(1000));
        assert_eq!(client.read_count(&call), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_transactions_evicted_after_retention() {
        let client = FakeChainClient::shared();
        let executor = executor(client.clone()).with_retention(Duration::from_secs(60));

        let mut handles = Vec::new();
        for _ in 0..200 {
            handles.push(executor.submit(approve_intent(), OWNER).await);
        }
        for handle in &handles {
            assert!(matches!(handle.wait().await, TxState::Confirmed(_)));
        }
        assert_eq!(executor.tracked().await.len(), 200);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(executor.tracked().await.is_empty());
        assert!(executor.get(handles[0].id()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_transaction_outlives_retention() {
        let client = FakeChainClient::shared();
        client.gate_inclusions(true);
        let executor = executor(client.clone()).with_retention(Duration::from_secs(60));

        let handle = executor.submit(approve_intent(), OWNER).await;
        client.wait_for_inclusion_calls(1).await;
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(executor.get(handle.id()).await.is_some());

        client.gate_inclusions(false);
        assert!(matches!(handle.wait().await, TxState::Confirmed(_)));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(executor.get(handle.id()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submissions_tracked_separately() {
        let client = FakeChainClient::shared();
        client.gate_inclusions(true);
        client.script_submit(Ok(TxHash::with_last_byte(0xa1)));
        client.script_submit(Err(ClientError::UserRejected));
        let executor = executor(client.clone());

        let first = executor.submit(approve_intent(), OWNER).await;
        client.wait_for_inclusion_calls(1).await;
        let second = executor.submit(approve_intent(), OWNER).await;
        assert_ne!(first.id(), second.id());

        assert_eq!(
            second.wait().await,
            TxState::Failed(FailureReason::UserRejected)
        );
        assert_eq!(first.state(), TxState::Pending(TxHash::with_last_byte(0xa1)));

        let listed = executor.tracked().await;
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|t| t.kind == IntentKind::Approve));

        assert_eq!(executor.prune_terminal().await, 1);
        assert!(executor.get(second.id()).await.is_none());
        assert!(executor.get(first.id()).await.is_some());
    }
}
