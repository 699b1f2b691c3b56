//! Motor de preço (CPMM x·y=k): funções puras, sem estado.
//! - output_given_input: quanto sai ao entrar `input` (taxa sobre o input)
//! - input_given_output: quanto precisa entrar para sair `output`
//!
//! Política de arredondamento:
//! - as duas fórmulas usam divisão **floor**, como escritas
//! - output_given_input nunca reduz k (fica abaixo da saída sem taxa)
//! - input_given_output é recusado (`InputTooSmall`) quando o floor deixaria
//!   `(r_in + input) * (r_out - output) < r_in * r_out`

use super::error::{AmmError, Result};
use super::error_catalog::AmmErrorCode;
use super::error_map::{from_exact_input, from_exact_output, to_error};
use super::guardrails::u256_to_u128_checked;
use super::types::{k_of, Amount, FeeSchedule, U256};

#[inline]
fn overflow() -> AmmError {
    AmmError::new(AmmErrorCode::Overflow)
}

#[inline]
fn mul3(a: Amount, b: Amount, c: u32) -> Result<U256> {
    U256::from(a)
        .checked_mul(U256::from(b))
        .and_then(|ab| ab.checked_mul(U256::from(c)))
        .ok_or_else(overflow)
}

/// Saída obtida ao entrar `input` contra `(input_reserve, output_reserve)`.
///
/// `adjusted = input * N`; `out = floor(adjusted * r_out / (r_in * D + adjusted))`.
pub fn output_given_input(
    input: Amount,
    input_reserve: Amount,
    output_reserve: Amount,
    fee: FeeSchedule,
) -> Result<Amount> {
    let reserves = (input_reserve, output_reserve);
    if let Some(code) = from_exact_input(input, reserves) {
        return Err(to_error(code, input, reserves));
    }

    let adjusted = U256::from(input) * U256::from(fee.numerator());
    let numerator = adjusted
        .checked_mul(U256::from(output_reserve))
        .ok_or_else(overflow)?;
    let denominator = (U256::from(input_reserve) * U256::from(fee.denominator()))
        .checked_add(adjusted)
        .ok_or_else(overflow)?;

    u256_to_u128_checked(numerator / denominator)
}

/// Input necessário para retirar `output` de `(input_reserve, output_reserve)`.
///
/// `input = floor(r_in * out * D / ((r_out - out) * N))`.
pub fn input_given_output(
    output: Amount,
    input_reserve: Amount,
    output_reserve: Amount,
    fee: FeeSchedule,
) -> Result<Amount> {
    let reserves = (input_reserve, output_reserve);
    if let Some(code) = from_exact_output(output, reserves) {
        return Err(to_error(code, output, reserves));
    }

    let remaining = output_reserve - output; // > 0 pela guarda acima
    let numerator = mul3(input_reserve, output, fee.denominator())?;
    let denominator = U256::from(remaining) * U256::from(fee.numerator());
    let input = u256_to_u128_checked(numerator / denominator)?;

    // o floor não pode deixar k cair; overflow no produto implica k1 > k0
    let k0 = k_of(input_reserve, output_reserve);
    let k1 = (U256::from(input_reserve) + U256::from(input)).checked_mul(U256::from(remaining));
    if matches!(k1, Some(k1) if k1 < k0) {
        crate::amm_bail!(AmmErrorCode::InputTooSmall,
            input => input, output => output,
            reserve_in => input_reserve, reserve_out => output_reserve);
    }
    Ok(input)
}

// -------------------------
// TESTES
// -------------------------
#[cfg(test)]
mod tests {
    use super::*;

    const FEE: FeeSchedule = FeeSchedule::none();

    fn fee3() -> FeeSchedule {
        FeeSchedule::default()
    }

    #[test]
    fn t_fee_example_matches_997_over_1000() {
        // (67*100*1000)/((150-100)*997) = 134
        assert_eq!(input_given_output(100, 67, 150, fee3()).unwrap(), 134);
    }

    #[test]
    fn t_output_given_input_known_value() {
        // 100*997*1000 / (1000*1000 + 100*997) = 90.66…
        assert_eq!(output_given_input(100, 1_000, 1_000, fee3()).unwrap(), 90);
        // sem taxa: 100*1000/1100 = 90.9…
        assert_eq!(output_given_input(100, 1_000, 1_000, FEE).unwrap(), 90);
    }

    #[test]
    fn t_zero_inputs_rejected() {
        for (amount, r_in, r_out) in [(0, 10, 10), (1, 0, 10), (1, 10, 0)] {
            assert_eq!(
                output_given_input(amount, r_in, r_out, fee3()).unwrap_err().code,
                AmmErrorCode::ZeroAmount
            );
            assert_eq!(
                input_given_output(amount, r_in, r_out, fee3()).unwrap_err().code,
                AmmErrorCode::ZeroAmount
            );
        }
    }

    #[test]
    fn t_output_at_reserve_rejected() {
        assert_eq!(
            input_given_output(150, 67, 150, fee3()).unwrap_err().code,
            AmmErrorCode::InsufficientReserve
        );
        assert_eq!(
            input_given_output(151, 67, 150, fee3()).unwrap_err().code,
            AmmErrorCode::InsufficientReserve
        );
    }

    #[test]
    fn t_boundary_output_reserve_minus_one() {
        let (r_in, r_out) = (1_000u128, 1_000u128);
        let input = input_given_output(r_out - 1, r_in, r_out, fee3()).unwrap();
        assert_eq!(input, 1_002_006);
        assert!(k_of(r_in + input, 1) >= k_of(r_in, r_out));
        let back = output_given_input(input, r_in, r_out, fee3()).unwrap();
        assert!(back <= r_out - 1);
    }

    #[test]
    fn t_truncation_that_shrinks_k_is_rejected() {
        // floor(3*1*1000 / (2*997)) = 1 ⇒ (3+1)*2 = 8 < 9
        let err = input_given_output(1, 3, 3, fee3()).unwrap_err();
        assert_eq!(err.code, AmmErrorCode::InputTooSmall);
        // input zero também cai aqui
        let err = input_given_output(1, 1, 1_000, fee3()).unwrap_err();
        assert_eq!(err.code, AmmErrorCode::InputTooSmall);
    }

    #[test]
    fn t_formulas_are_inverse_within_rounding() {
        let (r_in, r_out) = (1_000_000u128, 2_500_000u128);
        for out in [1u128, 7, 999, 12_345, 1_000_000, 2_499_999] {
            let Ok(input) = input_given_output(out, r_in, r_out, fee3()) else {
                continue;
            };
            let back = output_given_input(input, r_in, r_out, fee3()).unwrap();
            assert!(back <= out, "out={out} input={input} back={back}");
            // um a mais de input já compra pelo menos `out`
            let more = output_given_input(input + 1, r_in, r_out, fee3()).unwrap();
            assert!(more >= out, "out={out} more={more}");
        }
    }

    #[test]
    fn t_exact_input_never_shrinks_k() {
        let (r_in, r_out) = (12_345u128, 67_890u128);
        for input in [1u128, 2, 50, 12_345, 1_000_000] {
            let out = output_given_input(input, r_in, r_out, fee3()).unwrap();
            assert!(k_of(r_in + input, r_out - out) >= k_of(r_in, r_out));
        }
    }

    #[test]
    fn t_huge_values_overflow_cleanly() {
        let err = output_given_input(u128::MAX, u128::MAX, u128::MAX, fee3()).unwrap_err();
        assert_eq!(err.code, AmmErrorCode::Overflow);
        let err = input_given_output(u128::MAX - 1, u128::MAX, u128::MAX, fee3()).unwrap_err();
        assert_eq!(err.code, AmmErrorCode::Overflow);
    }
}
