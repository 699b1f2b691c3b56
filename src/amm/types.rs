//! Tipos básicos do pool (montantes inteiros) + U256 para intermediários.

use core::fmt;

use serde::{Deserialize, Serialize};
use uint::construct_uint;

use super::error_catalog::AmmErrorCode;

construct_uint! {
    /// Inteiro de 256 bits para contas intermediárias seguras.
    pub struct U256(4);
}

/// Montante de um ativo ou de shares (unidades mínimas).
pub type Amount = u128;
/// Variação com sinal de uma reserva (positivo = pool recebe).
pub type Delta = i128;
/// Tempo lógico em segundos.
pub type Timestamp = u64;

/// Numerador padrão da taxa (0,3% de fee).
pub const FEE_NUMERATOR: u32 = 997;
/// Denominador padrão da taxa.
pub const FEE_DENOMINATOR: u32 = 1_000;
/// Depósito mínimo de B no bootstrap.
pub const MINIMUM_LIQUIDITY: Amount = 1_000;

/// Identificador de um ativo no ledger de tokens.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identificador de uma conta (usuário ou pool).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Taxa como fração `numerator/denominator` aplicada ao input.
/// As duas fórmulas de preço usam a mesma representação.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    numerator: u32,
    denominator: u32,
}

impl FeeSchedule {
    pub fn new(numerator: u32, denominator: u32) -> super::error::Result<Self> {
        if numerator == 0 || numerator > denominator {
            crate::amm_bail!(AmmErrorCode::InvalidConfig,
                detail => "fee numerator must be in 1..=denominator",
                numerator => numerator,
                denominator => denominator);
        }
        Ok(Self { numerator, denominator })
    }

    /// Sem taxa (1/1). Útil para conferir a conservação exata de k.
    pub const fn none() -> Self {
        Self { numerator: 1, denominator: 1 }
    }

    pub const fn numerator(&self) -> u32 {
        self.numerator
    }

    pub const fn denominator(&self) -> u32 {
        self.denominator
    }

    pub const fn is_free(&self) -> bool {
        self.numerator == self.denominator
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self { numerator: FEE_NUMERATOR, denominator: FEE_DENOMINATOR }
    }
}

/// Parâmetros de um pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub fee: FeeSchedule,
    pub minimum_liquidity: Amount,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { fee: FeeSchedule::default(), minimum_liquidity: MINIMUM_LIQUIDITY }
    }
}

/// Sentido de um swap, resolvido uma vez por chamada.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Entra A, sai B.
    AtoB,
    /// Entra B, sai A.
    BtoA,
}

impl Direction {
    /// `(reserva de entrada, reserva de saída)` na orientação do swap.
    pub fn orient(self, reserve_a: Amount, reserve_b: Amount) -> (Amount, Amount) {
        match self {
            Direction::AtoB => (reserve_a, reserve_b),
            Direction::BtoA => (reserve_b, reserve_a),
        }
    }

    /// Converte `(delta de entrada, delta de saída)` para `(delta A, delta B)`.
    pub fn to_ab(self, delta_in: Delta, delta_out: Delta) -> (Delta, Delta) {
        match self {
            Direction::AtoB => (delta_in, delta_out),
            Direction::BtoA => (delta_out, delta_in),
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::AtoB => Direction::BtoA,
            Direction::BtoA => Direction::AtoB,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Direction::AtoB => "a_to_b",
            Direction::BtoA => "b_to_a",
        }
    }
}

/// Produto das reservas em 256 bits.
#[inline]
pub fn k_of(reserve_a: Amount, reserve_b: Amount) -> U256 {
    U256::from(reserve_a) * U256::from(reserve_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fee_is_30_bps() {
        let fee = FeeSchedule::default();
        assert_eq!((fee.numerator(), fee.denominator()), (997, 1_000));
        assert!(!fee.is_free());
        assert!(FeeSchedule::none().is_free());
    }

    #[test]
    fn u256_parses_and_checks_overflow() {
        let k = U256::from_dec_str("340282366920938463463374607431768211455").unwrap();
        assert_eq!(k, U256::from(u128::MAX));
        assert_eq!(k_of(u128::MAX, u128::MAX), k * k);
        assert!(U256::MAX.checked_mul(U256::from(2u8)).is_none());
        assert_eq!(FeeSchedule::new(3, 1_000).unwrap().numerator(), 3);
    }

    #[test]
    fn fee_schedule_rejects_invalid_fraction() {
        assert!(FeeSchedule::new(0, 1_000).is_err());
        assert!(FeeSchedule::new(1_001, 1_000).is_err());
        assert!(FeeSchedule::new(1_000, 1_000).is_ok());
    }

    #[test]
    fn direction_orientation() {
        assert_eq!(Direction::AtoB.orient(1, 2), (1, 2));
        assert_eq!(Direction::BtoA.orient(1, 2), (2, 1));
        assert_eq!(Direction::BtoA.to_ab(5, -3), (-3, 5));
        assert_eq!(Direction::AtoB.reverse(), Direction::BtoA);
    }
}
