//! Controlador do pool: depósito, resgate e os dois tipos de swap.
//!
//! Cada operação segura o mutex do pool durante toda a sequência
//! "lê reservas → calcula → transfere → aplica deltas". Transferências
//! rodam antes de qualquer mudança no ledger; se uma perna falha as pernas
//! já feitas são desfeitas e o ledger fica intacto.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info_span, warn};

use super::clock::Clock;
use super::error::{AmmError, Result};
use super::error_catalog::AmmErrorCode;
use super::guardrails::{
    checked_add, ensure_at_least, ensure_at_most, ensure_deadline, ensure_nonzero, to_delta,
};
use super::ledger::ReserveLedger;
use super::liquidity::{bootstrap_shares, deposit_shares, required_a, withdraw_amounts};
use super::metrics;
use super::pricing::{input_given_output, output_given_input};
use super::quote::price_of_unit;
use super::token::{TokenError, TokenLedger};
use super::types::{AccountId, Amount, Direction, PoolConfig, Timestamp, TokenId};

/// Uma perna de liquidação entre o chamador e o pool.
enum Leg<'a> {
    /// Chamador → pool, via allowance.
    In(&'a dyn TokenLedger, Amount),
    /// Pool → chamador.
    Out(&'a dyn TokenLedger, Amount),
}

pub struct Pool {
    asset_a: TokenId,
    asset_b: TokenId,
    account: AccountId,
    config: PoolConfig,
    token_a: Arc<dyn TokenLedger>,
    token_b: Arc<dyn TokenLedger>,
    clock: Arc<dyn Clock>,
    state: Mutex<ReserveLedger>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("account", &self.account)
            .field("asset_a", &self.asset_a)
            .field("asset_b", &self.asset_b)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn transfer_failed(
    token: &dyn TokenLedger,
    from: &AccountId,
    to: &AccountId,
    err: TokenError,
) -> AmmError {
    crate::amm_err!(AmmErrorCode::TransferFailed,
        token => token.token(), from => from, to => to, reason => err)
}

impl Pool {
    /// Pool vazio para o par `(token_a, token_b)`; B é o ativo base.
    pub fn new(
        account: AccountId,
        token_a: Arc<dyn TokenLedger>,
        token_b: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
        config: PoolConfig,
    ) -> Result<Self> {
        let asset_a = token_a.token().clone();
        let asset_b = token_b.token().clone();
        if asset_a == asset_b {
            crate::amm_bail!(AmmErrorCode::UnsupportedPair, input => asset_a, output => asset_b);
        }
        Ok(Self {
            asset_a,
            asset_b,
            account,
            config,
            token_a,
            token_b,
            clock,
            state: Mutex::new(ReserveLedger::new()),
        })
    }

    fn ledger(&self) -> MutexGuard<'_, ReserveLedger> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("pool {} state poisoned by an earlier fatal failure", self.account),
        }
    }

    fn direction(&self, input_asset: &TokenId, output_asset: &TokenId) -> Result<Direction> {
        if *input_asset == self.asset_a && *output_asset == self.asset_b {
            Ok(Direction::AtoB)
        } else if *input_asset == self.asset_b && *output_asset == self.asset_a {
            Ok(Direction::BtoA)
        } else {
            Err(crate::amm_err!(AmmErrorCode::UnsupportedPair,
                input => input_asset, output => output_asset))
        }
    }

    /// `(token de entrada, token de saída)` na orientação do swap.
    fn tokens(&self, dir: Direction) -> (&dyn TokenLedger, &dyn TokenLedger) {
        match dir {
            Direction::AtoB => (self.token_a.as_ref(), self.token_b.as_ref()),
            Direction::BtoA => (self.token_b.as_ref(), self.token_a.as_ref()),
        }
    }

    /// Executa as pernas em ordem. Na primeira falha desfaz as anteriores
    /// em ordem inversa e devolve o erro da perna que falhou. Pernas de
    /// entrada desfeitas também devolvem a allowance consumida.
    fn settle(&self, caller: &AccountId, legs: &[Leg<'_>]) -> Result<()> {
        let mut done: Vec<&Leg<'_>> = Vec::with_capacity(legs.len());
        for leg in legs {
            let outcome = match *leg {
                Leg::In(token, amount) => token
                    .transfer_from(&self.account, caller, &self.account, amount)
                    .map_err(|e| transfer_failed(token, caller, &self.account, e)),
                Leg::Out(token, amount) => token
                    .transfer(&self.account, caller, amount)
                    .map_err(|e| transfer_failed(token, &self.account, caller, e)),
            };
            if let Err(err) = outcome {
                let complete = done
                    .into_iter()
                    .rev()
                    .fold(true, |complete, leg| self.revert(caller, leg) && complete);
                return Err(if complete { err } else { err.with_context("rollback", "incomplete") });
            }
            done.push(leg);
        }
        Ok(())
    }

    /// Desfaz uma perna já liquidada. `false` se o ledger recusou.
    fn revert(&self, caller: &AccountId, leg: &Leg<'_>) -> bool {
        let (token, outcome) = match *leg {
            Leg::In(token, amount) => {
                let refund = token.transfer(&self.account, caller, amount);
                if refund.is_ok() {
                    let allowance = token.allowance(caller, &self.account);
                    token.approve(caller, &self.account, allowance.saturating_add(amount));
                }
                (token, refund)
            }
            Leg::Out(token, amount) => (token, token.transfer(caller, &self.account, amount)),
        };
        match outcome {
            Ok(()) => true,
            Err(e) => {
                error!(pool = %self.account, token = %token.token(), %e,
                    "transfer rollback failed");
                false
            }
        }
    }

    /// A conta do pool não pode ser contraparte de si mesma.
    fn ensure_external(&self, caller: &AccountId) -> Result<()> {
        if *caller == self.account {
            crate::amm_bail!(AmmErrorCode::PoolSelfCall, caller => caller);
        }
        Ok(())
    }

    fn observe<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let out = metrics::timed(op, f);
        if let Err(e) = &out {
            warn!(pool = %self.account, op, code = e.code.code(), error = %e, "operation rejected");
        }
        out
    }

    // -------------------------
    // Liquidez
    // -------------------------

    /// Deposita `desired_b` de B e o A proporcional (no bootstrap, `max_a`
    /// inteiro). Retorna os shares mintados.
    pub fn deposit(
        &self,
        caller: &AccountId,
        desired_b: Amount,
        min_shares_out: Amount,
        max_a: Amount,
        deadline: Timestamp,
    ) -> Result<Amount> {
        let span = info_span!("pool.deposit", pool = %self.account, caller = %caller,
            desired_b, max_a);
        let _guard = span.enter();
        self.observe("deposit", || {
            ensure_deadline(self.clock.now(), deadline)?;
            self.ensure_external(caller)?;
            ensure_nonzero("desired_b", desired_b)?;
            ensure_nonzero("min_shares_out", min_shares_out)?;
            ensure_nonzero("max_a", max_a)?;

            let mut ledger = self.ledger();
            let (reserve_a, reserve_b) = ledger.current_reserves();
            let supply = ledger.share_supply();
            let (amount_a, shares) = if ledger.is_empty() {
                (max_a, bootstrap_shares(desired_b, self.config.minimum_liquidity)?)
            } else {
                let needed = required_a(desired_b, reserve_a, reserve_b)?;
                ensure_at_most("max_a", needed, max_a)?;
                (needed, deposit_shares(desired_b, supply, reserve_b)?)
            };
            ensure_at_least("min_shares_out", shares, min_shares_out)?;
            debug!(amount_a, shares, bootstrap = supply == 0, "deposit computed");

            checked_add(reserve_a, amount_a)?;
            checked_add(reserve_b, desired_b)?;
            checked_add(supply, shares)?;
            let (delta_a, delta_b) = (to_delta(amount_a)?, to_delta(desired_b)?);

            self.settle(
                caller,
                &[
                    Leg::In(self.token_a.as_ref(), amount_a),
                    Leg::In(self.token_b.as_ref(), desired_b),
                ],
            )?;
            ledger.apply_delta(delta_a, delta_b);
            ledger.mint_shares(caller, shares);
            Ok(shares)
        })
    }

    /// Queima `shares` do chamador e devolve `(a_out, b_out)`.
    pub fn withdraw(
        &self,
        caller: &AccountId,
        shares: Amount,
        min_a_out: Amount,
        min_b_out: Amount,
        deadline: Timestamp,
    ) -> Result<(Amount, Amount)> {
        let span = info_span!("pool.withdraw", pool = %self.account, caller = %caller, shares);
        let _guard = span.enter();
        self.observe("withdraw", || {
            ensure_deadline(self.clock.now(), deadline)?;
            self.ensure_external(caller)?;
            ensure_nonzero("shares", shares)?;
            ensure_nonzero("min_a_out", min_a_out)?;
            ensure_nonzero("min_b_out", min_b_out)?;

            let mut ledger = self.ledger();
            let held = ledger.shares_of(caller);
            if held < shares {
                crate::amm_bail!(AmmErrorCode::InsufficientShares,
                    balance => held, requested => shares);
            }
            let (reserve_a, reserve_b) = ledger.current_reserves();
            let supply = ledger.share_supply();
            let (a_out, b_out) = withdraw_amounts(shares, reserve_a, reserve_b, supply)?;
            ensure_at_least("min_a_out", a_out, min_a_out)?;
            ensure_at_least("min_b_out", b_out, min_b_out)?;
            debug!(a_out, b_out, "withdraw computed");
            let (delta_a, delta_b) = (-to_delta(a_out)?, -to_delta(b_out)?);

            self.settle(
                caller,
                &[Leg::Out(self.token_a.as_ref(), a_out), Leg::Out(self.token_b.as_ref(), b_out)],
            )?;
            ledger.burn_shares(caller, shares);
            ledger.apply_delta(delta_a, delta_b);
            Ok((a_out, b_out))
        })
    }

    // -------------------------
    // Swaps
    // -------------------------

    /// Troca exatamente `input` de `input_asset` por pelo menos `min_output`.
    pub fn swap_exact_input(
        &self,
        caller: &AccountId,
        input_asset: &TokenId,
        input: Amount,
        output_asset: &TokenId,
        min_output: Amount,
        deadline: Timestamp,
    ) -> Result<Amount> {
        let span = info_span!("pool.swap_exact_input", pool = %self.account, caller = %caller,
            input_asset = %input_asset, input, min_output);
        let _guard = span.enter();
        self.observe("swap_exact_input", || {
            ensure_deadline(self.clock.now(), deadline)?;
            self.ensure_external(caller)?;
            ensure_nonzero("input", input)?;
            ensure_nonzero("min_output", min_output)?;
            let dir = self.direction(input_asset, output_asset)?;

            let mut ledger = self.ledger();
            let (reserve_a, reserve_b) = ledger.current_reserves();
            let (r_in, r_out) = dir.orient(reserve_a, reserve_b);
            let output = output_given_input(input, r_in, r_out, self.config.fee)?;
            ensure_at_least("min_output", output, min_output)?;
            debug!(direction = dir.label(), output, "swap computed");

            self.execute_swap(&mut ledger, caller, dir, r_in, input, output)?;
            Ok(output)
        })
    }

    /// Compra exatamente `output` de `output_asset` pagando no máximo `max_input`.
    pub fn swap_exact_output(
        &self,
        caller: &AccountId,
        input_asset: &TokenId,
        output_asset: &TokenId,
        output: Amount,
        max_input: Amount,
        deadline: Timestamp,
    ) -> Result<Amount> {
        let span = info_span!("pool.swap_exact_output", pool = %self.account, caller = %caller,
            output_asset = %output_asset, output, max_input);
        let _guard = span.enter();
        self.observe("swap_exact_output", || {
            ensure_deadline(self.clock.now(), deadline)?;
            self.ensure_external(caller)?;
            ensure_nonzero("output", output)?;
            ensure_nonzero("max_input", max_input)?;
            let dir = self.direction(input_asset, output_asset)?;

            let mut ledger = self.ledger();
            let (reserve_a, reserve_b) = ledger.current_reserves();
            let (r_in, r_out) = dir.orient(reserve_a, reserve_b);
            let input = input_given_output(output, r_in, r_out, self.config.fee)?;
            ensure_at_most("max_input", input, max_input)?;
            debug!(direction = dir.label(), input, "swap computed");

            self.execute_swap(&mut ledger, caller, dir, r_in, input, output)?;
            Ok(input)
        })
    }

    /// Vende `amount_a` de A por B (swap de input exato A→B).
    pub fn sell_asset_a(
        &self,
        caller: &AccountId,
        amount_a: Amount,
        min_b_out: Amount,
        deadline: Timestamp,
    ) -> Result<Amount> {
        let (asset_a, asset_b) = (self.asset_a.clone(), self.asset_b.clone());
        self.swap_exact_input(caller, &asset_a, amount_a, &asset_b, min_b_out, deadline)
    }

    fn execute_swap(
        &self,
        ledger: &mut ReserveLedger,
        caller: &AccountId,
        dir: Direction,
        reserve_in: Amount,
        input: Amount,
        output: Amount,
    ) -> Result<()> {
        checked_add(reserve_in, input)?;
        let (delta_a, delta_b) = dir.to_ab(to_delta(input)?, -to_delta(output)?);
        let (token_in, token_out) = self.tokens(dir);
        self.settle(caller, &[Leg::In(token_in, input), Leg::Out(token_out, output)])?;

        let k0 = ledger.k();
        ledger.apply_delta(delta_a, delta_b);
        let k1 = ledger.k();
        if k1 < k0 {
            panic!("pool {} invariant broken: k decreased from {k0} to {k1}", self.account);
        }
        metrics::record_k_growth(k0, k1);
        Ok(())
    }

    // -------------------------
    // Consultas
    // -------------------------

    pub fn asset_a(&self) -> &TokenId {
        &self.asset_a
    }

    pub fn asset_b(&self) -> &TokenId {
        &self.asset_b
    }

    /// Conta que custodia os saldos do pool.
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    pub fn minimum_liquidity(&self) -> Amount {
        self.config.minimum_liquidity
    }

    pub fn token_a(&self) -> &Arc<dyn TokenLedger> {
        &self.token_a
    }

    pub fn token_b(&self) -> &Arc<dyn TokenLedger> {
        &self.token_b
    }

    /// `(reserve_a, reserve_b)`.
    pub fn reserves(&self) -> (Amount, Amount) {
        self.ledger().current_reserves()
    }

    pub fn share_supply(&self) -> Amount {
        self.ledger().share_supply()
    }

    pub fn shares_of(&self, holder: &AccountId) -> Amount {
        self.ledger().shares_of(holder)
    }

    /// Cópia consistente do ledger.
    pub fn snapshot(&self) -> ReserveLedger {
        self.ledger().clone()
    }

    /// B recebido ao vender `unit` de A agora.
    pub fn price_of_one_a_in_b(&self, unit: Amount) -> Result<Amount> {
        let (reserve_a, reserve_b) = self.reserves();
        price_of_unit(unit, reserve_a, reserve_b, self.config.fee)
    }

    /// A recebido ao vender `unit` de B agora.
    pub fn price_of_one_b_in_a(&self, unit: Amount) -> Result<Amount> {
        let (reserve_a, reserve_b) = self.reserves();
        price_of_unit(unit, reserve_b, reserve_a, self.config.fee)
    }

    /// A que um depósito de `desired_b` exigiria agora.
    pub fn required_a_for_deposit(&self, desired_b: Amount) -> Result<Amount> {
        let (reserve_a, reserve_b) = self.reserves();
        required_a(desired_b, reserve_a, reserve_b)
    }
}
