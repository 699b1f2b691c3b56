//! Ledger de reservas: saldos do pool, oferta de shares e saldos por holder.
//!
//! Só faz contabilidade. Quem chama garante que nenhum delta deixa uma
//! reserva negativa; violar isso é erro de programação e aborta com panic.

use std::collections::BTreeMap;

use serde::Serialize;

use super::types::{k_of, AccountId, Amount, Delta, U256};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReserveLedger {
    reserve_a: Amount,
    reserve_b: Amount,
    share_supply: Amount,
    holders: BTreeMap<AccountId, Amount>,
}

fn apply_signed(reserve: Amount, delta: Delta, side: &str) -> Amount {
    let magnitude = delta.unsigned_abs();
    let next = if delta >= 0 {
        reserve.checked_add(magnitude)
    } else {
        reserve.checked_sub(magnitude)
    };
    match next {
        Some(value) => value,
        None => panic!(
            "reserve ledger inconsistency: reserve {side}={reserve} cannot absorb delta {delta}"
        ),
    }
}

impl ReserveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(reserve_a, reserve_b)`.
    pub fn current_reserves(&self) -> (Amount, Amount) {
        (self.reserve_a, self.reserve_b)
    }

    pub fn share_supply(&self) -> Amount {
        self.share_supply
    }

    pub fn shares_of(&self, holder: &AccountId) -> Amount {
        self.holders.get(holder).copied().unwrap_or(0)
    }

    /// Produto das reservas.
    pub fn k(&self) -> U256 {
        k_of(self.reserve_a, self.reserve_b)
    }

    /// Sem shares em circulação: o próximo depósito é bootstrap.
    pub fn is_empty(&self) -> bool {
        self.share_supply == 0
    }

    /// Aplica deltas com sinal (positivo = pool recebe).
    ///
    /// # Panics
    /// Se uma reserva ficaria negativa ou estouraria `u128`.
    pub fn apply_delta(&mut self, delta_a: Delta, delta_b: Delta) {
        let next_a = apply_signed(self.reserve_a, delta_a, "a");
        let next_b = apply_signed(self.reserve_b, delta_b, "b");
        self.reserve_a = next_a;
        self.reserve_b = next_b;
    }

    /// # Panics
    /// Se a oferta de shares estouraria `u128`.
    pub fn mint_shares(&mut self, holder: &AccountId, amount: Amount) {
        self.share_supply = self
            .share_supply
            .checked_add(amount)
            .expect("share supply overflow");
        *self.holders.entry(holder.clone()).or_insert(0) += amount;
    }

    /// # Panics
    /// Se o holder não tem `amount` shares.
    pub fn burn_shares(&mut self, holder: &AccountId, amount: Amount) {
        let balance = self.shares_of(holder);
        assert!(
            balance >= amount,
            "share ledger inconsistency: {holder} holds {balance}, burn {amount}"
        );
        if balance == amount {
            self.holders.remove(holder);
        } else {
            self.holders.insert(holder.clone(), balance - amount);
        }
        self.share_supply -= amount;
    }

    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.holders.iter()
    }
}
