//! Error types for SwiftSwap

use thiserror::Error;

use crate::U256;

/// Core errors that can occur in SwiftSwap
#[derive(Debug, Error)]
pub enum Error {
    #[error("Chain client error: {0}")]
    Client(#[from] ClientError),

    #[error("DEX error: {0}")]
    Dex(#[from] DexError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Chain client errors (reads, writes, receipts)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("RPC transport failed: {message}")]
    Transport { message: String },

    #[error("User rejected the request")]
    UserRejected,

    #[error("Transaction reverted: {reason}")]
    Reverted { reason: String },

    #[error("Failed to encode call: {message}")]
    Encode { message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("RPC request timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Swap pipeline errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DexError {
    #[error("Invalid pair: {token} selected on both sides")]
    InvalidPair { token: String },

    #[error("No pool for {token_in}/{token_out}")]
    NoRoute { token_in: String, token_out: String },

    #[error("Unknown token: {token}")]
    UnknownToken { token: String },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Quote unavailable: {reason}")]
    QuoteUnavailable { reason: String },

    #[error("Approval required: need {required}, allowance {available}")]
    ApprovalRequired { required: U256, available: U256 },

    #[error("No wallet connected")]
    WalletNotConnected,

    #[error("Transport error: {message}")]
    Transport { message: String },
}

/// Result type alias for SwiftSwap operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<ClientError> for DexError {
    fn from(err: ClientError) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

impl DexError {
    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPair { .. } => "invalid_pair",
            Self::NoRoute { .. } => "no_route",
            Self::UnknownToken { .. } => "unknown_token",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::QuoteUnavailable { .. } => "quote_unavailable",
            Self::ApprovalRequired { .. } => "approval_required",
            Self::WalletNotConnected => "wallet_not_connected",
            Self::Transport { .. } => "transport_error",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPair { .. } | Self::InvalidAmount { .. } => 400,
            Self::UnknownToken { .. } | Self::NoRoute { .. } => 404,
            Self::WalletNotConnected => 401,
            Self::QuoteUnavailable { .. } | Self::ApprovalRequired { .. } => 422,
            Self::Transport { .. } => 502,
        }
    }
}
