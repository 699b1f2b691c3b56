//! Cotações para UI/roteadores: preço de uma unidade, preço à vista,
//! slippage e limites com tolerância. Tudo em cima de `pricing`.

use super::error::Result;
use super::guardrails::{ensure_nonzero, u256_to_u128_checked};
use super::pricing::{input_given_output, output_given_input};
use super::types::{Amount, FeeSchedule, U256};

/// Partes por milhão.
pub type Ppm = u32;
pub const PPM_SCALE: Ppm = 1_000_000;

#[inline]
fn ceil_div_u256(n: U256, d: U256) -> U256 {
    (n + (d - U256::one())) / d
}

#[inline]
fn clamp_ppm(tol: Ppm) -> u64 {
    tol.min(PPM_SCALE) as u64
}

/// Quanto sai ao vender `unit` do ativo de entrada (com taxa).
pub fn price_of_unit(
    unit: Amount,
    input_reserve: Amount,
    output_reserve: Amount,
    fee: FeeSchedule,
) -> Result<Amount> {
    output_given_input(unit, input_reserve, output_reserve, fee)
}

/// Preço à vista escalado: `floor(r_out * scale / r_in)`, sem taxa.
pub fn spot_price(input_reserve: Amount, output_reserve: Amount, scale: Amount) -> Result<Amount> {
    ensure_nonzero("input_reserve", input_reserve)?;
    ensure_nonzero("output_reserve", output_reserve)?;
    let n = U256::from(output_reserve) * U256::from(scale);
    u256_to_u128_checked(n / U256::from(input_reserve))
}

/// Perda relativa do preço de execução frente ao à vista, em PPM:
/// `1 - (out / input) / (r_out / r_in)`. Inclui a taxa.
pub fn slippage_ppm(
    input: Amount,
    input_reserve: Amount,
    output_reserve: Amount,
    fee: FeeSchedule,
) -> Result<Ppm> {
    let out = output_given_input(input, input_reserve, output_reserve, fee)?;
    // out*r_in vs input*r_out
    let exec = U256::from(out) * U256::from(input_reserve);
    let spot = U256::from(input) * U256::from(output_reserve);
    if exec >= spot {
        return Ok(0);
    }
    let ppm = (spot - exec) * U256::from(PPM_SCALE) / spot;
    Ok(ppm.low_u32().min(PPM_SCALE))
}

/// `floor(out * (1 - tol))` para um swap de input exato.
pub fn min_out_with_tolerance(
    input: Amount,
    input_reserve: Amount,
    output_reserve: Amount,
    fee: FeeSchedule,
    tolerance_ppm: Ppm,
) -> Result<Amount> {
    let out = output_given_input(input, input_reserve, output_reserve, fee)?;
    let factor = PPM_SCALE as u64 - clamp_ppm(tolerance_ppm);
    let n = U256::from(out) * U256::from(factor);
    u256_to_u128_checked(n / U256::from(PPM_SCALE))
}

/// `ceil(input * (1 + tol))` para um swap de output exato.
pub fn max_in_with_tolerance(
    output: Amount,
    input_reserve: Amount,
    output_reserve: Amount,
    fee: FeeSchedule,
    tolerance_ppm: Ppm,
) -> Result<Amount> {
    let input = input_given_output(output, input_reserve, output_reserve, fee)?;
    let factor = PPM_SCALE as u64 + clamp_ppm(tolerance_ppm);
    let n = U256::from(input) * U256::from(factor);
    u256_to_u128_checked(ceil_div_u256(n, U256::from(PPM_SCALE)))
}
