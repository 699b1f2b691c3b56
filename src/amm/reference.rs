//! Referência de alta precisão baseada em **BigUint/BigRational** para o CPMM
//! (x·y=k) com taxa `N/D` sobre o input.
//!
//! 1. Resultados **contínuos** (sem quantização) das duas fórmulas de swap.
//! 2. A **política** do core (floor + guarda de k) refeita em BigUint, sem
//!    passar pelo U256. O harness usa estas funções como cálculo fora de banda.
//! 3. Desvio do invariante `Δk/k` de um swap do core.

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};

use super::error::{AmmError, Result};
use super::error_catalog::AmmErrorCode;
use super::pricing;
use super::types::{Amount, FeeSchedule};

// -------------------------
// Helpers de conversão
// -------------------------
#[inline]
fn bu(v: Amount) -> BigUint {
    BigUint::from(v)
}

#[inline]
fn q(v: Amount) -> BigRational {
    BigRational::from_integer(BigInt::from(v))
}

#[inline]
fn q_from_bu(n: &BigUint, d: &BigUint) -> BigRational {
    BigRational::new(BigInt::from(n.clone()), BigInt::from(d.clone()))
}

#[inline]
fn to_amount(v: &BigUint) -> Result<Amount> {
    v.to_u128().ok_or_else(|| AmmError::new(AmmErrorCode::Overflow))
}

fn floor_rat_to_u128(r: &BigRational) -> Result<Amount> {
    r.floor()
        .to_integer()
        .to_u128()
        .ok_or_else(|| AmmError::new(AmmErrorCode::Overflow))
}

fn ceil_rat_to_u128(r: &BigRational) -> Result<Amount> {
    r.ceil()
        .to_integer()
        .to_u128()
        .ok_or_else(|| AmmError::new(AmmErrorCode::Overflow))
}

fn fee_q(fee: FeeSchedule) -> BigRational {
    BigRational::new(BigInt::from(fee.numerator()), BigInt::from(fee.denominator()))
}

fn zero_guard(amount: Amount, r_in: Amount, r_out: Amount) -> Result<()> {
    if amount == 0 || r_in == 0 || r_out == 0 {
        crate::amm_bail!(AmmErrorCode::ZeroAmount,
            amount => amount, reserve_in => r_in, reserve => r_out);
    }
    Ok(())
}

// -------------------------
// Contínuo (sem quantização)
// -------------------------
/// Saída exata: `input·f·r_out / (r_in + input·f)`.
pub fn continuous_output(
    input: Amount,
    r_in: Amount,
    r_out: Amount,
    fee: FeeSchedule,
) -> Result<BigRational> {
    zero_guard(input, r_in, r_out)?;
    let net = q(input) * fee_q(fee);
    Ok(net.clone() * q(r_out) / (q(r_in) + net))
}

/// Input exato para retirar `output`: `r_in·output / ((r_out - output)·f)`.
pub fn continuous_input(
    output: Amount,
    r_in: Amount,
    r_out: Amount,
    fee: FeeSchedule,
) -> Result<BigRational> {
    zero_guard(output, r_in, r_out)?;
    if output >= r_out {
        crate::amm_bail!(AmmErrorCode::InsufficientReserve, output => output, reserve => r_out);
    }
    Ok(q(r_in) * q(output) / (q(r_out - output) * fee_q(fee)))
}

// -------------------------
// Política (mesmo resultado do core, em big-precision)
// -------------------------
/// `floor` da saída contínua.
pub fn policy_output_given_input(
    input: Amount,
    r_in: Amount,
    r_out: Amount,
    fee: FeeSchedule,
) -> Result<Amount> {
    floor_rat_to_u128(&continuous_output(input, r_in, r_out, fee)?)
}

/// `floor` do input contínuo, recusado se o par resultante reduzir k.
pub fn policy_input_given_output(
    output: Amount,
    r_in: Amount,
    r_out: Amount,
    fee: FeeSchedule,
) -> Result<Amount> {
    let input_bu = continuous_input(output, r_in, r_out, fee)?.floor().to_integer();
    let input_bu = input_bu
        .to_biguint()
        .ok_or_else(|| AmmError::new(AmmErrorCode::Overflow))?;
    let k0 = bu(r_in) * bu(r_out);
    let k1 = (bu(r_in) + &input_bu) * bu(r_out - output);
    let input = to_amount(&input_bu)?;
    if k1 < k0 {
        crate::amm_bail!(AmmErrorCode::InputTooSmall, input => input, output => output);
    }
    Ok(input)
}

/// `floor(desired_b * r_a / r_b)`.
pub fn policy_required_a(
    desired_b: Amount,
    reserve_a: Amount,
    reserve_b: Amount,
) -> Result<Amount> {
    zero_guard(desired_b, 1, reserve_b)?;
    to_amount(&(bu(desired_b) * bu(reserve_a) / bu(reserve_b)))
}

/// `floor(desired_b * supply / r_b)`.
pub fn policy_deposit_shares(
    desired_b: Amount,
    supply: Amount,
    reserve_b: Amount,
) -> Result<Amount> {
    zero_guard(desired_b, 1, reserve_b)?;
    to_amount(&(bu(desired_b) * bu(supply) / bu(reserve_b)))
}

/// `(floor(shares*r_a/S), floor(shares*r_b/S))`.
pub fn policy_withdraw_amounts(
    shares: Amount,
    reserve_a: Amount,
    reserve_b: Amount,
    supply: Amount,
) -> Result<(Amount, Amount)> {
    zero_guard(shares, 1, supply)?;
    if shares > supply {
        crate::amm_bail!(AmmErrorCode::InsufficientShares, balance => supply, requested => shares);
    }
    let a = to_amount(&(bu(shares) * bu(reserve_a) / bu(supply)))?;
    let b = to_amount(&(bu(shares) * bu(reserve_b) / bu(supply)))?;
    Ok((a, b))
}

/// `(k1 - k0) / k0` de um swap que entrou `input` e saiu `output`.
/// Negativo quando k caiu.
pub fn k_delta_rel(r_in: Amount, r_out: Amount, input: Amount, output: Amount) -> BigRational {
    let k0 = bu(r_in) * bu(r_out);
    if k0.is_zero() {
        return BigRational::zero();
    }
    let k1 = (bu(r_in) + bu(input)) * (bu(r_out) - bu(output.min(r_out)));
    if k1 >= k0 {
        q_from_bu(&(&k1 - &k0), &k0)
    } else {
        -q_from_bu(&(&k0 - &k1), &k0)
    }
}

// -------------------------
// Comparação core × referência
// -------------------------
#[derive(Debug, Clone)]
pub struct RefOut {
    pub out_core: Amount,
    pub out_policy: Amount,
    pub out_cont: BigRational,
    pub dk_over_k_core: BigRational,
}

#[derive(Debug, Clone)]
pub struct RefIn {
    pub in_core: Amount,
    pub in_policy: Amount,
    pub in_cont_ceil: Amount,
    pub in_cont: BigRational,
    pub dk_over_k_core: BigRational,
}

/// Compara [`pricing::output_given_input`] com a referência.
pub fn golden_output(
    input: Amount,
    r_in: Amount,
    r_out: Amount,
    fee: FeeSchedule,
) -> Result<RefOut> {
    let out_core = pricing::output_given_input(input, r_in, r_out, fee)?;
    let out_policy = policy_output_given_input(input, r_in, r_out, fee)?;
    let out_cont = continuous_output(input, r_in, r_out, fee)?;
    let dk_over_k_core = k_delta_rel(r_in, r_out, input, out_core);
    Ok(RefOut { out_core, out_policy, out_cont, dk_over_k_core })
}

/// Compara [`pricing::input_given_output`] com a referência.
pub fn golden_input(
    output: Amount,
    r_in: Amount,
    r_out: Amount,
    fee: FeeSchedule,
) -> Result<RefIn> {
    let in_core = pricing::input_given_output(output, r_in, r_out, fee)?;
    let in_policy = policy_input_given_output(output, r_in, r_out, fee)?;
    let in_cont = continuous_input(output, r_in, r_out, fee)?;
    let in_cont_ceil = ceil_rat_to_u128(&in_cont)?;
    let dk_over_k_core = k_delta_rel(r_in, r_out, in_core, output);
    Ok(RefIn { in_core, in_policy, in_cont_ceil, in_cont, dk_over_k_core })
}
