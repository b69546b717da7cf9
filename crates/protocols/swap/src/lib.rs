//! SwiftSwap Pipeline
//!
//! Resolves a token pair to its pool, keeps a live quote for the entered
//! amount, decides whether an approval is needed, and drives approvals,
//! swaps and liquidity changes through submission to confirmation.
//!
//! All chain access goes through [`evm_client::ChainClient`], so every stage
//! runs unchanged against a scripted client in tests.

pub mod allowance;
pub mod cache;
pub mod calculator;
pub mod executor;
pub mod faucet;
pub mod history;
pub mod liquidity;
pub mod quote;
pub mod resolver;
pub mod session;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports
pub use allowance::{
    approval_status, approve_intent, needs_approval, AllowanceGatekeeper, BalanceTracker,
};
pub use cache::{ReadCache, StateCaches};
pub use calculator::{format_amount, min_amount_out, parse_amount, SlippageTolerance};
pub use executor::{TrackedTxInfo, TransactionExecutor, TxHandle, DEFAULT_TX_RETENTION};
pub use faucet::faucet_intent;
pub use history::{recent_swaps, RecentSwap, SwapSide, RECENT_SWAPS_LIMIT};
pub use liquidity::{
    add_liquidity_intent, fetch_positions, liquidity_approvals, remove_liquidity_intent,
    LiquidityRequest, Position,
};
pub use quote::{fetch_quote, QuoteFetcher, QuoteOutcome};
pub use resolver::{resolve, PoolRegistry};
pub use session::{PipelineContext, SwapReadiness, SwapSession};
pub use state::{
    Allowance, ApprovalStatus, FailureReason, IntentKind, PairKey, PoolHandle, Quote, QuoteParams,
    QuoteState, Resolution, TransactionIntent, TxState,
};
