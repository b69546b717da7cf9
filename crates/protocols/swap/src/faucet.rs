//! Test-token faucet

use swiftswap_core::{Address, DexError, TokenDescriptor, U256};

use crate::state::TransactionIntent;

/// Whole tokens minted when no amount is given
pub const FAUCET_DEFAULT_UNITS: u64 = 1000;

/// Mint `amount` of `token` to `to`, defaulting to 1000 whole tokens
pub fn faucet_intent(
    token: &TokenDescriptor,
    to: Address,
    amount: Option<U256>,
) -> Result<TransactionIntent, DexError> {
    let amount = match amount {
        Some(amount) => amount,
        None => default_amount(token)?,
    };
    if amount.is_zero() {
        return Err(DexError::InvalidAmount {
            message: "mint amount must be positive".to_string(),
        });
    }

    Ok(TransactionIntent::Mint {
        token: token.address,
        to,
        amount,
    })
}

fn default_amount(token: &TokenDescriptor) -> Result<U256, DexError> {
    U256::from(10u64)
        .checked_pow(U256::from(token.decimals))
        .and_then(|unit| unit.checked_mul(U256::from(FAUCET_DEFAULT_UNITS)))
        .ok_or_else(|| DexError::InvalidAmount {
            message: format!("{} decimals overflow the mint amount", token.decimals),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{swift, OWNER};

    #[test]
    fn test_default_mint_is_thousand_tokens() {
        let intent = faucet_intent(&swift(), OWNER, None).unwrap();
        let expected = U256::from(1000u64) * U256::from(10u64).pow(U256::from(18));
        assert_eq!(
            intent,
            TransactionIntent::Mint {
                token: swift().address,
                to: OWNER,
                amount: expected,
            }
        );
    }

    #[test]
    fn test_explicit_amount_and_decimals() {
        let usdc = TokenDescriptor::new(Address::repeat_byte(0x09), "USDC", 6);
        match faucet_intent(&usdc, OWNER, None).unwrap() {
            TransactionIntent::Mint { amount, .. } => {
                assert_eq!(amount, U256::from(1_000_000_000u64))
            }
            other => panic!("unexpected intent {:?}", other),
        }

        let intent = faucet_intent(&usdc, OWNER, Some(U256::from(5))).unwrap();
        assert!(matches!(intent, TransactionIntent::Mint { amount, .. } if amount == U256::from(5)));
    }

    #[test]
    fn test_zero_mint_rejected() {
        assert!(matches!(
            faucet_intent(&swift(), OWNER, Some(U256::ZERO)),
            Err(DexError::InvalidAmount { .. })
        ));
    }
}
