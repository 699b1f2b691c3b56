//! Estado fantasma: quanto o harness espera que cada reserva tenha andado
//! desde o início da execução. Só muda depois de uma chamada bem-sucedida.

use serde::Serialize;

use crate::amm::types::{Amount, Delta, Direction};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GhostState {
    pub expected_delta_a: Delta,
    pub expected_delta_b: Delta,
}

fn signed(amount: Amount) -> Delta {
    match Delta::try_from(amount) {
        Ok(v) => v,
        Err(_) => panic!("ghost accumulator: amount {amount} accepted by the pool exceeds i128"),
    }
}

impl GhostState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Soma `(delta_a, delta_b)` aos acumuladores.
    pub fn record(&mut self, delta_a: Delta, delta_b: Delta) {
        match (
            self.expected_delta_a.checked_add(delta_a),
            self.expected_delta_b.checked_add(delta_b),
        ) {
            (Some(a), Some(b)) => {
                self.expected_delta_a = a;
                self.expected_delta_b = b;
            }
            _ => panic!("ghost accumulator overflow: {self:?} + ({delta_a}, {delta_b})"),
        }
    }

    pub fn record_deposit(&mut self, amount_a: Amount, amount_b: Amount) {
        self.record(signed(amount_a), signed(amount_b));
    }

    pub fn record_withdraw(&mut self, amount_a: Amount, amount_b: Amount) {
        self.record(-signed(amount_a), -signed(amount_b));
    }

    /// Entrada positiva, saída negativa, na orientação do swap.
    pub fn record_swap(&mut self, dir: Direction, input: Amount, output: Amount) {
        let (delta_a, delta_b) = dir.to_ab(signed(input), -signed(output));
        self.record(delta_a, delta_b);
    }
}
