//! Liquidez: mint de bootstrap, depósito proporcional e resgate de shares.
//! Políticas:
//! - bootstrap: shares 1:1 com o B depositado
//! - required_a, shares_mint e amounts_out: **floor**

use super::error::Result;
use super::error_catalog::AmmErrorCode;
use super::guardrails::{ensure_nonzero, mul_div_floor};
use super::types::Amount;

/// Shares do primeiro depósito: 1:1 com `desired_b`, que precisa atingir o mínimo.
pub fn bootstrap_shares(desired_b: Amount, minimum_liquidity: Amount) -> Result<Amount> {
    ensure_nonzero("desired_b", desired_b)?;
    if desired_b < minimum_liquidity {
        crate::amm_bail!(AmmErrorCode::LiquidityTooLow,
            amount => desired_b, minimum => minimum_liquidity);
    }
    Ok(desired_b)
}

/// A necessário para manter a razão atual: `floor(desired_b * r_a / r_b)`.
pub fn required_a(desired_b: Amount, reserve_a: Amount, reserve_b: Amount) -> Result<Amount> {
    ensure_nonzero("desired_b", desired_b)?;
    ensure_nonzero("reserve_b", reserve_b)?;
    mul_div_floor(desired_b, reserve_a, reserve_b)
}

/// Shares mintados num pool existente: `floor(desired_b * S / r_b)`.
pub fn deposit_shares(
    desired_b: Amount,
    share_supply: Amount,
    reserve_b: Amount,
) -> Result<Amount> {
    ensure_nonzero("desired_b", desired_b)?;
    ensure_nonzero("reserve_b", reserve_b)?;
    mul_div_floor(desired_b, share_supply, reserve_b)
}

/// Resgate proporcional. Retorna `(a_out, b_out)` com **floor**.
pub fn withdraw_amounts(
    shares: Amount,
    reserve_a: Amount,
    reserve_b: Amount,
    share_supply: Amount,
) -> Result<(Amount, Amount)> {
    ensure_nonzero("shares", shares)?;
    if shares > share_supply {
        crate::amm_bail!(AmmErrorCode::InsufficientShares,
            balance => share_supply, requested => shares);
    }
    let a_out = mul_div_floor(shares, reserve_a, share_supply)?;
    let b_out = mul_div_floor(shares, reserve_b, share_supply)?;
    Ok((a_out, b_out))
}
