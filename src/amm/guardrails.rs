//! Validações e helpers numéricos seguros para o pool.
//! Objetivo: entradas seguras e divisões/multiplicações sem estouro.

use super::error::{AmmError, Result};
use super::error_catalog::AmmErrorCode;
use super::types::{Amount, Delta, Timestamp, U256};

#[inline]
pub fn ensure_nonzero(name: &'static str, amount: Amount) -> Result<()> {
    if amount == 0 {
        Err(crate::amm_err!(AmmErrorCode::ZeroAmount, param => name))
    } else {
        Ok(())
    }
}

/// Falha se `now` já passou do prazo. `now == deadline` ainda é aceito.
#[inline]
pub fn ensure_deadline(now: Timestamp, deadline: Timestamp) -> Result<()> {
    if now > deadline {
        Err(crate::amm_err!(AmmErrorCode::DeadlineExpired, now => now, deadline => deadline))
    } else {
        Ok(())
    }
}

/// `computed <= limit`, senão slippage.
#[inline]
pub fn ensure_at_most(bound: &'static str, computed: Amount, limit: Amount) -> Result<()> {
    if computed > limit {
        Err(crate::amm_err!(AmmErrorCode::SlippageExceeded,
            bound => bound, computed => computed, limit => limit))
    } else {
        Ok(())
    }
}

/// `computed >= limit`, senão slippage.
#[inline]
pub fn ensure_at_least(bound: &'static str, computed: Amount, limit: Amount) -> Result<()> {
    if computed < limit {
        Err(crate::amm_err!(AmmErrorCode::SlippageExceeded,
            bound => bound, computed => computed, limit => limit))
    } else {
        Ok(())
    }
}

#[inline]
pub fn checked_add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or_else(|| AmmError::new(AmmErrorCode::Overflow))
}

#[inline]
pub fn checked_sub(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_sub(b).ok_or_else(|| AmmError::new(AmmErrorCode::Overflow))
}

#[inline]
pub fn mul_u128_to_u256(a: Amount, b: Amount) -> U256 {
    U256::from(a) * U256::from(b)
}

#[inline]
pub fn u256_to_u128_checked(v: U256) -> Result<Amount> {
    if v > U256::from(u128::MAX) {
        Err(AmmError::new(AmmErrorCode::Overflow))
    } else {
        Ok(v.as_u128())
    }
}

/// `floor(a * b / d)` com intermediário de 256 bits.
pub fn mul_div_floor(a: Amount, b: Amount, d: Amount) -> Result<Amount> {
    if d == 0 {
        return Err(crate::amm_err!(AmmErrorCode::ZeroAmount, param => "divisor"));
    }
    u256_to_u128_checked(mul_u128_to_u256(a, b) / U256::from(d))
}

/// Converte um montante para delta positivo.
#[inline]
pub fn to_delta(amount: Amount) -> Result<Delta> {
    Delta::try_from(amount).map_err(|_| crate::amm_err!(AmmErrorCode::Overflow, amount => amount))
}
