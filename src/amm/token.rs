//! Ledger de tokens fungíveis usado pelo pool (colaborador externo).
//!
//! O pool só precisa de consulta de saldo, transferência e transferência
//! com allowance. [`MemoryToken`] é a implementação em memória usada pelo
//! harness e pelos testes.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use super::types::{AccountId, Amount, TokenId};

/// Falha de uma operação do ledger de tokens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("transfers to {0} are rejected")]
    RecipientRejected(AccountId),

    #[error("arithmetic overflow")]
    Overflow,
}

/// Interface mínima de um token com semântica padrão.
pub trait TokenLedger: Send + Sync {
    fn token(&self) -> &TokenId;

    fn balance_of(&self, holder: &AccountId) -> Amount;

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount;

    fn approve(&self, owner: &AccountId, spender: &AccountId, amount: Amount);

    /// Move `amount` de `from` para `to`.
    fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<(), TokenError>;

    /// Move `amount` de `owner` para `to` consumindo a allowance de `spender`.
    fn transfer_from(
        &self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;
}

#[derive(Debug, Default)]
struct MemoryTokenState {
    balances: HashMap<AccountId, Amount>,
    allowances: HashMap<(AccountId, AccountId), Amount>,
    rejected_recipients: HashSet<AccountId>,
    total_supply: Amount,
}

impl MemoryTokenState {
    fn move_balance(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if self.rejected_recipients.contains(to) {
            return Err(TokenError::RecipientRejected(to.clone()));
        }
        let have = self.balances.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let to_balance = self.balances.get(to).copied().unwrap_or(0);
        let credited = to_balance.checked_add(amount).ok_or(TokenError::Overflow)?;

        if have == amount {
            self.balances.remove(from);
        } else {
            self.balances.insert(from.clone(), have - amount);
        }
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}

/// Token em memória, seguro para uso entre threads.
#[derive(Debug)]
pub struct MemoryToken {
    id: TokenId,
    state: Mutex<MemoryTokenState>,
}

impl MemoryToken {
    pub fn new(id: TokenId) -> Self {
        Self {
            id,
            state: Mutex::new(MemoryTokenState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryTokenState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cria saldo do nada (financiamento de atores em testes).
    pub fn mint(&self, to: &AccountId, amount: Amount) -> Result<(), TokenError> {
        let mut state = self.state();
        let supply = state.total_supply.checked_add(amount).ok_or(TokenError::Overflow)?;
        let balance = state.balances.get(to).copied().unwrap_or(0);
        let credited = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        state.total_supply = supply;
        state.balances.insert(to.clone(), credited);
        Ok(())
    }

    pub fn total_supply(&self) -> Amount {
        self.state().total_supply
    }

    /// Faz o ledger recusar (ou voltar a aceitar) transferências para `account`.
    pub fn reject_transfers_to(&self, account: &AccountId, reject: bool) {
        let mut state = self.state();
        if reject {
            state.rejected_recipients.insert(account.clone());
        } else {
            state.rejected_recipients.remove(account);
        }
    }
}

impl TokenLedger for MemoryToken {
    fn token(&self) -> &TokenId {
        &self.id
    }

    fn balance_of(&self, holder: &AccountId) -> Amount {
        self.state().balances.get(holder).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.state()
            .allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&self, owner: &AccountId, spender: &AccountId, amount: Amount) {
        let key = (owner.clone(), spender.clone());
        let mut state = self.state();
        if amount == 0 {
            state.allowances.remove(&key);
        } else {
            state.allowances.insert(key, amount);
        }
    }

    fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<(), TokenError> {
        self.state().move_balance(from, to, amount)
    }

    fn transfer_from(
        &self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let key = (owner.clone(), spender.clone());
        let mut state = self.state();
        let allowed = state.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance { have: allowed, need: amount });
        }
        state.move_balance(owner, to, amount)?;
        if allowed == amount {
            state.allowances.remove(&key);
        } else {
            state.allowances.insert(key, allowed - amount);
        }
        Ok(())
    }
}
