//! swiftswap-api: HTTP API layer for SwiftSwap
//!
//! Exposes the swap pipeline to the frontend: pair resolution, quotes,
//! allowances, guarded approve/swap/liquidity submissions and transaction
//! tracking.

pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use server::*;
pub use state::{AppState, StateError, WalletState};
