//! Contract call encoding
//!
//! Typed read and write calls against the ERC-20 tokens and pools, encoded
//! with `sol!` bindings. Only the function signatures matter here; the
//! contracts themselves live on chain.

use alloy::primitives::aliases::I24;
use alloy::primitives::Bytes;
use alloy::sol;
use alloy::sol_types::SolCall;
use swiftswap_core::{Address, ClientError, U256};

use crate::Result;

sol! {
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Test tokens expose an open faucet
    interface IMintable {
        function mint(address to, uint256 amount) external;
    }

    interface IPool {
        function getQuote(address tokenIn, uint256 amountIn) external view returns (uint256 amountOut);
        function swap(address tokenIn, uint256 amountIn, uint256 amountOutMin) external returns (uint256 amountOut);
        function addLiquidity(
            uint256 amount0,
            uint256 amount1,
            uint256 amount0Min,
            uint256 amount1Min,
            int24 tickLower,
            int24 tickUpper
        ) external returns (uint256 liquidity);
        function removeLiquidity(uint256 liquidity) external returns (uint256 amount0, uint256 amount1);

        event Swap(
            address indexed sender,
            address indexed recipient,
            int256 amount0,
            int256 amount1,
            uint160 sqrtPriceX96,
            uint128 liquidity,
            int24 tick
        );
    }
}

/// A read-only contract call returning a single `uint256`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReadCall {
    BalanceOf {
        token: Address,
        owner: Address,
    },
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
    },
    GetQuote {
        pool: Address,
        token_in: Address,
        amount_in: U256,
    },
}

impl ReadCall {
    /// Contract the call is sent to
    pub fn target(&self) -> Address {
        match self {
            Self::BalanceOf { token, .. } | Self::Allowance { token, .. } => *token,
            Self::GetQuote { pool, .. } => *pool,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BalanceOf { .. } => "balanceOf",
            Self::Allowance { .. } => "allowance",
            Self::GetQuote { .. } => "getQuote",
        }
    }

    pub fn calldata(&self) -> Bytes {
        match self {
            Self::BalanceOf { owner, .. } => IERC20::balanceOfCall { account: *owner }
                .abi_encode()
                .into(),
            Self::Allowance { owner, spender, .. } => IERC20::allowanceCall {
                owner: *owner,
                spender: *spender,
            }
            .abi_encode()
            .into(),
            Self::GetQuote {
                token_in,
                amount_in,
                ..
            } => IPool::getQuoteCall {
                tokenIn: *token_in,
                amountIn: *amount_in,
            }
            .abi_encode()
            .into(),
        }
    }

    /// Decode the raw `eth_call` return data
    pub fn decode(&self, data: &[u8]) -> Result<U256> {
        let decoded = match self {
            Self::BalanceOf { .. } => IERC20::balanceOfCall::abi_decode_returns(data),
            Self::Allowance { .. } => IERC20::allowanceCall::abi_decode_returns(data),
            Self::GetQuote { .. } => IPool::getQuoteCall::abi_decode_returns(data),
        };
        decoded.map_err(|e| ClientError::Decode {
            message: format!("{}: {}", self.name(), e),
        })
    }
}

/// A state-changing contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    Swap {
        pool: Address,
        token_in: Address,
        amount_in: U256,
        min_amount_out: U256,
    },
    AddLiquidity {
        pool: Address,
        amount0: U256,
        amount1: U256,
        amount0_min: U256,
        amount1_min: U256,
        tick_lower: i32,
        tick_upper: i32,
    },
    RemoveLiquidity {
        pool: Address,
        liquidity: U256,
    },
    Mint {
        token: Address,
        to: Address,
        amount: U256,
    },
}

impl WriteCall {
    pub fn target(&self) -> Address {
        match self {
            Self::Approve { token, .. } | Self::Mint { token, .. } => *token,
            Self::Swap { pool, .. }
            | Self::AddLiquidity { pool, .. }
            | Self::RemoveLiquidity { pool, .. } => *pool,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::Swap { .. } => "swap",
            Self::AddLiquidity { .. } => "addLiquidity",
            Self::RemoveLiquidity { .. } => "removeLiquidity",
            Self::Mint { .. } => "mint",
        }
    }

    pub fn calldata(&self) -> Result<Bytes> {
        let encoded = match self {
            Self::Approve {
                spender, amount, ..
            } => IERC20::approveCall {
                spender: *spender,
                amount: *amount,
            }
            .abi_encode(),
            Self::Swap {
                token_in,
                amount_in,
                min_amount_out,
                ..
            } => IPool::swapCall {
                tokenIn: *token_in,
                amountIn: *amount_in,
                amountOutMin: *min_amount_out,
            }
            .abi_encode(),
            Self::AddLiquidity {
                amount0,
                amount1,
                amount0_min,
                amount1_min,
                tick_lower,
                tick_upper,
                ..
            } => IPool::addLiquidityCall {
                amount0: *amount0,
                amount1: *amount1,
                amount0Min: *amount0_min,
                amount1Min: *amount1_min,
                tickLower: to_tick(*tick_lower)?,
                tickUpper: to_tick(*tick_upper)?,
            }
            .abi_encode(),
            Self::RemoveLiquidity { liquidity, .. } => IPool::removeLiquidityCall {
                liquidity: *liquidity,
            }
            .abi_encode(),
            Self::Mint { to, amount, .. } => IMintable::mintCall {
                to: *to,
                amount: *amount,
            }
            .abi_encode(),
        };
        Ok(encoded.into())
    }
}

fn to_tick(tick: i32) -> Result<I24> {
    I24::try_from(tick).map_err(|_| ClientError::Encode {
        message: format!("tick {} does not fit in int24", tick),
    })
}
