//! Mapeamento entre condições de domínio e códigos de erro do pool.
use crate::amm::error::AmmError;
use crate::amm::error_catalog::AmmErrorCode;
use crate::amm::types::Amount;

/// Código de erro para um swap de input exato a partir dos inputs brutos.
pub fn from_exact_input(input: Amount, reserves: (Amount, Amount)) -> Option<AmmErrorCode> {
    if input == 0 || reserves.0 == 0 || reserves.1 == 0 {
        return Some(AmmErrorCode::ZeroAmount);
    }
    None
}

/// Código de erro para um swap de output exato. `reserves` = (entrada, saída).
pub fn from_exact_output(output: Amount, reserves: (Amount, Amount)) -> Option<AmmErrorCode> {
    if output == 0 || reserves.0 == 0 || reserves.1 == 0 {
        return Some(AmmErrorCode::ZeroAmount);
    }
    if output >= reserves.1 {
        return Some(AmmErrorCode::InsufficientReserve);
    }
    None
}

/// Constrói um [`AmmError`] com as reservas e o montante no contexto.
/// `InsufficientReserve` nomeia o montante `output`, como no template.
pub fn to_error(code: AmmErrorCode, amount: Amount, reserves: (Amount, Amount)) -> AmmError {
    let key = match code {
        AmmErrorCode::InsufficientReserve => "output",
        _ => "amount",
    };
    AmmError::new(code)
        .with_context(key, amount)
        .with_context("reserve_in", reserves.0)
        .with_context("reserve", reserves.1)
}
