//! Swap session
//!
//! One swap form's worth of pipeline state: the selected pair, its resolved
//! pool, the input amount, the live quote and the connected account. UI
//! events call into the session; `readiness()` says which action is
//! currently allowed and the guarded actions re-check it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use evm_client::ChainClient;
use swiftswap_core::{Address, DexError, PollingConfig, TokenDescriptor, U256};
use tokio::sync::watch;

use crate::allowance::approve_intent;
use crate::cache::StateCaches;
use crate::calculator::{min_amount_out, parse_amount, SlippageTolerance};
use crate::executor::{TransactionExecutor, TxHandle};
use crate::quote::QuoteFetcher;
use crate::resolver::PoolRegistry;
use crate::state::{
    ApprovalStatus, PoolHandle, QuoteParams, QuoteState, Resolution, TransactionIntent, TxState,
};

/// Shared services a session runs against
#[derive(Clone)]
pub struct PipelineContext {
    pub client: Arc<dyn ChainClient>,
    pub registry: Arc<PoolRegistry>,
    pub caches: StateCaches,
    pub executor: Arc<TransactionExecutor>,
    pub quote_interval: Duration,
}

impl PipelineContext {
    pub fn new(
        client: Arc<dyn ChainClient>,
        registry: Arc<PoolRegistry>,
        polling: &PollingConfig,
    ) -> Self {
        let caches = StateCaches::new(
            Duration::from_millis(polling.allowance_freshness_ms),
            Duration::from_millis(polling.balance_interval_ms),
        );
        let executor = Arc::new(
            TransactionExecutor::new(client.clone(), caches.clone())
                .with_retention(Duration::from_secs(polling.tx_retention_secs)),
        );
        Self {
            client,
            registry,
            caches,
            executor,
            quote_interval: Duration::from_millis(polling.quote_interval_ms),
        }
    }
}

/// Which action the swap form currently allows
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapReadiness {
    /// Pair not selected or no pool deployed for it
    NoRoute,
    ConnectWallet,
    EnterAmount,
    /// Quote pending, failed, or not for the current amount
    AwaitingQuote,
    NeedsApproval,
    Ready,
}

struct SessionShared {
    amount_in: watch::Sender<U256>,
    quotes: QuoteFetcher,
}

struct Selection {
    token_in: TokenDescriptor,
    token_out: TokenDescriptor,
    resolution: Resolution,
}

/// State behind one swap form
pub struct SwapSession {
    ctx: PipelineContext,
    owner: Option<Address>,
    selection: Option<Selection>,
    shared: Arc<SessionShared>,
}

impl SwapSession {
    /// Create a session; starts its quote fetcher on the current runtime
    pub fn new(ctx: PipelineContext) -> Self {
        let quotes = QuoteFetcher::spawn(ctx.client.clone(), ctx.quote_interval);
        Self {
            ctx,
            owner: None,
            selection: None,
            shared: Arc::new(SessionShared {
                amount_in: watch::channel(U256::ZERO).0,
                quotes,
            }),
        }
    }

    pub fn connect(&mut self, owner: Address) {
        tracing::debug!("Session connected as {}", owner);
        self.owner = Some(owner);
    }

    pub fn disconnect(&mut self) {
        self.owner = None;
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner
    }

    /// Select a pair and resolve its pool. Same-token pairs are rejected
    /// without touching the chain or the current selection.
    pub fn select_pair(
        &mut self,
        token_in: TokenDescriptor,
        token_out: TokenDescriptor,
    ) -> Result<&Resolution, DexError> {
        let resolution = self.ctx.registry.resolve(&token_in, &token_out)?;
        if !resolution.is_found() {
            tracing::debug!("No pool for {}/{}", token_in.symbol, token_out.symbol);
        }

        let selection = self.selection.insert(Selection {
            token_in,
            token_out,
            resolution,
        });
        let params = quote_params(Some(&*selection), *self.shared.amount_in.borrow());
        self.shared.quotes.set_params(params);
        Ok(&selection.resolution)
    }

    /// Select by symbol or address
    pub fn select_symbols(&mut self, token_in: &str, token_out: &str) -> Result<&Resolution, DexError> {
        let a = self.ctx.registry.require_token(token_in)?.clone();
        let b = self.ctx.registry.require_token(token_out)?.clone();
        self.select_pair(a, b)
    }

    /// Exchange input and output tokens
    pub fn flip(&mut self) -> Result<(), DexError> {
        if let Some(selection) = self.selection.take() {
            self.select_pair(selection.token_out, selection.token_in)?;
        }
        Ok(())
    }

    pub fn set_amount(&mut self, amount_in: U256) {
        self.shared.amount_in.send_replace(amount_in);
        self.shared
            .quotes
            .set_params(quote_params(self.selection.as_ref(), amount_in));
    }

    /// Set the amount from a decimal string in the input token's units
    pub fn set_amount_str(&mut self, value: &str) -> Result<U256, DexError> {
        let decimals = self
            .selection
            .as_ref()
            .map(|s| s.token_in.decimals)
            .ok_or_else(|| DexError::InvalidAmount {
                message: "select a pair before entering an amount".to_string(),
            })?;
        let amount = parse_amount(value, decimals)?;
        self.set_amount(amount);
        Ok(amount)
    }

    pub fn amount_in(&self) -> U256 {
        *self.shared.amount_in.borrow()
    }

    pub fn token_in(&self) -> Option<&TokenDescriptor> {
        self.selection.as_ref().map(|s| &s.token_in)
    }

    pub fn token_out(&self) -> Option<&TokenDescriptor> {
        self.selection.as_ref().map(|s| &s.token_out)
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        self.selection.as_ref().map(|s| &s.resolution)
    }

    pub fn pool(&self) -> Option<&PoolHandle> {
        self.resolution().and_then(Resolution::pool)
    }

    pub fn quote(&self) -> QuoteState {
        self.shared.quotes.current()
    }

    pub fn subscribe_quote(&self) -> watch::Receiver<QuoteState> {
        self.shared.quotes.subscribe()
    }

    /// Wait until the quote for the current inputs is ready or has failed
    pub async fn settled_quote(&self) -> QuoteState {
        let Some(params) = self.shared.quotes.params() else {
            return QuoteState::Idle;
        };

        let mut rx = self.subscribe_quote();
        let settled = rx
            .wait_for(|state| match state {
                QuoteState::Ready(quote) => quote.matches(&params),
                QuoteState::Failed { .. } => true,
                _ => false,
            })
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.quote())
    }

    /// Input-token allowance toward the pool; `None` without pool or owner
    pub async fn allowance(&self) -> Result<Option<U256>, DexError> {
        let (Some(pool), Some(owner), Some(token_in)) = (self.pool(), self.owner, self.token_in())
        else {
            return Ok(None);
        };
        let allowance = self
            .ctx
            .caches
            .allowances
            .get_allowance(self.ctx.client.as_ref(), token_in.address, owner, pool.address)
            .await?;
        Ok(Some(allowance))
    }

    pub async fn approval_status(&self) -> Result<ApprovalStatus, DexError> {
        let (Some(owner), Some(token_in)) = (self.owner, self.token_in()) else {
            return Ok(ApprovalStatus::Disabled);
        };
        let status = self
            .ctx
            .caches
            .allowances
            .status(
                self.ctx.client.as_ref(),
                token_in.address,
                owner,
                self.pool(),
                self.amount_in(),
            )
            .await?;
        Ok(status)
    }

    /// The single gate a UI uses to enable its buttons
    pub async fn readiness(&self) -> Result<SwapReadiness, DexError> {
        let Some(pool) = self.pool() else {
            return Ok(SwapReadiness::NoRoute);
        };
        if self.owner.is_none() {
            return Ok(SwapReadiness::ConnectWallet);
        }
        let amount_in = self.amount_in();
        if amount_in.is_zero() {
            return Ok(SwapReadiness::EnterAmount);
        }
        if self.matching_quote(pool, amount_in).is_none() {
            return Ok(SwapReadiness::AwaitingQuote);
        }
        Ok(match self.approval_status().await? {
            ApprovalStatus::Required => SwapReadiness::NeedsApproval,
            ApprovalStatus::NotRequired => SwapReadiness::Ready,
            ApprovalStatus::Disabled => SwapReadiness::AwaitingQuote,
        })
    }

    /// Approve exactly the current input amount for the pool
    pub async fn approve(&self) -> Result<TxHandle, DexError> {
        let (pool, token_in) = self.route()?;
        let owner = self.owner.ok_or(DexError::WalletNotConnected)?;

        let intent = approve_intent(token_in, Some(pool), self.amount_in())?;
        Ok(self.ctx.executor.submit(intent, owner).await)
    }

    /// Swap the current amount at the current quote, protected by `slippage`
    pub async fn swap(&self, slippage: SlippageTolerance) -> Result<TxHandle, DexError> {
        let (pool, token_in) = self.route()?;
        let owner = self.owner.ok_or(DexError::WalletNotConnected)?;
        let amount_in = self.amount_in();
        if amount_in.is_zero() {
            return Err(DexError::InvalidAmount {
                message: "amount must be positive".to_string(),
            });
        }

        let quoted = self
            .matching_quote(pool, amount_in)
            .ok_or_else(|| DexError::QuoteUnavailable {
                reason: match self.quote() {
                    QuoteState::Failed { reason } => reason,
                    _ => "no quote for the current amount".to_string(),
                },
            })?;

        let allowance = self
            .ctx
            .caches
            .allowances
            .get_allowance(self.ctx.client.as_ref(), token_in.address, owner, pool.address)
            .await?;
        if crate::allowance::needs_approval(allowance, amount_in) {
            return Err(DexError::ApprovalRequired {
                required: amount_in,
                available: allowance,
            });
        }

        let token_out = pool
            .other(token_in.address)
            .map(|t| t.address)
            .ok_or_else(|| self.no_route())?;
        let intent = TransactionIntent::Swap {
            pool: pool.address,
            token_in: token_in.address,
            token_out,
            amount_in,
            min_amount_out: min_amount_out(quoted, slippage),
        };

        tracing::info!(
            "Swapping {} {} on {} (min out {})",
            amount_in,
            token_in.symbol,
            pool.label(),
            min_amount_out(quoted, slippage)
        );
        let handle = self.ctx.executor.submit(intent, owner).await;
        clear_amount_on_confirm(Arc::downgrade(&self.shared), handle.clone(), amount_in);
        Ok(handle)
    }

    fn route(&self) -> Result<(&PoolHandle, &TokenDescriptor), DexError> {
        match (self.pool(), self.token_in()) {
            (Some(pool), Some(token_in)) => Ok((pool, token_in)),
            _ => Err(self.no_route()),
        }
    }

    fn no_route(&self) -> DexError {
        DexError::NoRoute {
            token_in: self.token_in().map(|t| t.symbol.clone()).unwrap_or_default(),
            token_out: self.token_out().map(|t| t.symbol.clone()).unwrap_or_default(),
        }
    }

    /// Quoted output, only if the quote is for exactly the current inputs
    fn matching_quote(&self, pool: &PoolHandle, amount_in: U256) -> Option<U256> {
        let token_in = self.token_in()?;
        let params = QuoteParams::new(pool, token_in.address, amount_in);
        self.quote()
            .quote()
            .filter(|q| q.matches(&params))
            .map(|q| q.amount_out)
    }
}

fn quote_params(selection: Option<&Selection>, amount_in: U256) -> Option<QuoteParams> {
    let selection = selection?;
    let pool = selection.resolution.pool()?;
    Some(QuoteParams::new(pool, selection.token_in.address, amount_in))
}

/// Once the swap confirms, clear the input if it still holds the swapped
/// amount. An amount entered while the swap was pending is left alone.
fn clear_amount_on_confirm(shared: Weak<SessionShared>, handle: TxHandle, swapped: U256) {
    tokio::spawn(async move {
        if !matches!(handle.wait().await, TxState::Confirmed(_)) {
            return;
        }
        // Session may be gone by the time the swap lands
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let cleared = shared.amount_in.send_if_modified(|amount| {
            if *amount != swapped {
                return false;
            }
            *amount = U256::ZERO;
            true
        });
        if cleared {
            shared.quotes.set_params(None);
        } else {
            tracing::debug!("Input changed while swap {} was pending, keeping it", handle.id());
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bolt, flash, registry, swift, FakeChainClient, OWNER};
    use evm_client::ReadCall;
    use swiftswap_core::ClientError;

    fn ether(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18))
    }

    fn session(client: Arc<FakeChainClient>) -> SwapSession {
        let ctx = PipelineContext::new(client, Arc::new(registry()), &PollingConfig::default());
        SwapSession::new(ctx)
    }

    fn allowance_call() -> ReadCall {
        ReadCall::Allowance {
            token: swift().address,
            owner: OWNER,
            spender: crate::testing::pool().address,
        }
    }

    async fn wait_for_quote(session: &SwapSession) {
        let state = session.settled_quote().await;
        assert!(matches!(state, QuoteState::Ready(_) | QuoteState::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_token_rejected_without_calls() {
        let client = FakeChainClient::shared();
        let mut session = session(client.clone());

        let err = session.select_pair(swift(), swift()).unwrap_err();
        assert_eq!(err.error_code(), "invalid_pair");
        assert!(session.resolution().is_none());
        assert_eq!(client.total_reads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pool_guards_every_action() {
        let client = FakeChainClient::shared();
        let mut session = session(client.clone());
        session.connect(OWNER);

        let resolution = session.select_pair(swift(), flash()).unwrap();
        assert!(!resolution.is_found());
        session.set_amount(ether(10));
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(session.quote(), QuoteState::Idle);
        assert_eq!(session.approval_status().await.unwrap(), ApprovalStatus::Disabled);
        assert_eq!(session.readiness().await.unwrap(), SwapReadiness::NoRoute);
        assert!(matches!(session.approve().await, Err(DexError::NoRoute { .. })));
        assert!(matches!(
            session.swap(SlippageTolerance::default()).await,
            Err(DexError::NoRoute { .. })
        ));

        assert_eq!(client.total_reads(), 0);
        assert!(client.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_required() {
        let client = FakeChainClient::shared();
        let mut session = session(client.clone());
        session.select_pair(swift(), bolt()).unwrap();
        session.set_amount(ether(1));

        assert_eq!(session.readiness().await.unwrap(), SwapReadiness::ConnectWallet);
        assert_eq!(session.approve().await.unwrap_err(), DexError::WalletNotConnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_amount_has_no_quote() {
        let client = FakeChainClient::shared();
        let mut session = session(client.clone());
        session.connect(OWNER);
        session.select_pair(swift(), bolt()).unwrap();

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(session.quote(), QuoteState::Idle);
        assert_eq!(session.readiness().await.unwrap(), SwapReadiness::EnterAmount);
        assert_eq!(client.total_reads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_approve_then_swap_flow() {
        let client = FakeChainClient::shared();
        let mut session = session(client.clone());
        session.connect(OWNER);
        session.select_pair(swift(), bolt()).unwrap();
        session.set_amount(ether(1000));
        wait_for_quote(&session).await;

        // Fresh account: nothing approved yet
        assert_eq!(session.readiness().await.unwrap(), SwapReadiness::NeedsApproval);
        assert!(matches!(
            session.swap(SlippageTolerance::default()).await,
            Err(DexError::ApprovalRequired { .. })
        ));

        let approval = session.approve().await.unwrap();
        client.set_read(allowance_call(), ether(1000));
        assert!(matches!(approval.wait().await, TxState::Confirmed(_)));
        assert_eq!(
            client.submitted()[0].0,
            evm_client::WriteCall::Approve {
                token: swift().address,
                spender: crate::testing::pool().address,
                amount: ether(1000),
            }
        );

        // The confirmation invalidated the cached zero allowance
        assert_eq!(session.readiness().await.unwrap(), SwapReadiness::Ready);

        let swap = session.swap(SlippageTolerance::default()).await.unwrap();
        assert!(matches!(swap.wait().await, TxState::Confirmed(_)));
        match &client.submitted()[1].0 {
            evm_client::WriteCall::Swap {
                amount_in,
                min_amount_out,
                ..
            } => {
                assert_eq!(*amount_in, ether(1000));
                // Fake quotes 2x; 0.5% slippage
                assert_eq!(*min_amount_out, ether(1990));
            }
            other => panic!("unexpected call {:?}", other),
        }

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(session.amount_in(), U256::ZERO);
        assert_eq!(session.quote(), QuoteState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_amount_entered_during_pending_swap_survives_confirmation() {
        let client = FakeChainClient::shared();
        let mut session = session(client.clone());
        session.connect(OWNER);
        client.set_read(allowance_call(), ether(1000));
        session.select_pair(swift(), bolt()).unwrap();
        session.set_amount(ether(5));
        wait_for_quote(&session).await;

        client.gate_inclusions(true);
        let swap = session.swap(SlippageTolerance::default()).await.unwrap();
        client.wait_for_inclusion_calls(1).await;

        // User types the next amount while the first swap is in the mempool
        session.set_amount(ether(7));
        wait_for_quote(&session).await;

        client.gate_inclusions(false);
        assert!(matches!(swap.wait().await, TxState::Confirmed(_)));
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(session.amount_in(), ether(7));
        let quote = session.quote();
        assert_eq!(quote.quote().map(|q| q.amount_in), Some(ether(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_quote_blocks_swap() {
        let client = FakeChainClient::shared();
        let mut session = session(client.clone());
        session.connect(OWNER);
        client.set_read(allowance_call(), ether(1000));
        session.select_pair(swift(), bolt()).unwrap();
        session.set_amount(ether(5));
        wait_for_quote(&session).await;

        // Amount changes; the new quote is still in flight
        let pending = QuoteParams::new(&crate::testing::pool(), swift().address, ether(6));
        client.gate_call(pending.read_call(), true);
        session.set_amount(ether(6));
        client.wait_for_reads(&pending.read_call(), 1).await;

        assert_eq!(session.readiness().await.unwrap(), SwapReadiness::AwaitingQuote);
        assert!(matches!(
            session.swap(SlippageTolerance::default()).await,
            Err(DexError::QuoteUnavailable { .. })
        ));
        assert!(client.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_quote_reason_surfaces() {
        let client = FakeChainClient::shared();
        let mut session = session(client.clone());
        session.connect(OWNER);
        let params = QuoteParams::new(&crate::testing::pool(), swift().address, ether(5));
        client.fail_read(
            params.read_call(),
            ClientError::Reverted {
                reason: "insufficient liquidity".into(),
            },
        );
        session.select_pair(swift(), bolt()).unwrap();
        session.set_amount(ether(5));
        wait_for_quote(&session).await;

        match session.swap(SlippageTolerance::default()).await {
            Err(DexError::QuoteUnavailable { reason }) => {
                assert!(reason.contains("insufficient liquidity"))
            }
            other => panic!("unexpected result {:?}", other.map(|h| h.id())),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_flip_resolves_same_pool() {
        let client = FakeChainClient::shared();
        let mut session = session(client.clone());
        session.select_symbols("SWIFT", "BOLT").unwrap();
        let before = session.pool().cloned();
        session.flip().unwrap();
        assert_eq!(session.token_in().unwrap().symbol, "BOLT");
        assert_eq!(session.pool().cloned(), before);

        assert!(matches!(
            session.select_symbols("SWIFT", "DOGE"),
            Err(DexError::UnknownToken { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_amount_str_uses_token_decimals() {
        let client = FakeChainClient::shared();
        let mut session = session(client.clone());
        assert!(session.set_amount_str("1").is_err());

        session.select_pair(swift(), bolt()).unwrap();
        assert_eq!(session.set_amount_str("2.5").unwrap(), ether(5) / U256::from(2));
        assert!(session.set_amount_str("x").is_err());
    }
}
