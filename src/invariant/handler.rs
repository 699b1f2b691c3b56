//! Driver do harness: chamadas aleatórias limitadas contra um pool, com o
//! resultado esperado recalculado fora de banda pela referência em BigUint.
//!
//! Falhas do pool são esperadas e engolidas: a chamada conta como no-op e o
//! estado fantasma não muda. Panics (inconsistência fatal) não são capturados.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::amm::clock::Clock;
use crate::amm::error::{AmmError, Result};
use crate::amm::error_catalog::AmmErrorCode;
use crate::amm::pool::Pool;
use crate::amm::reference;
use crate::amm::token::{MemoryToken, TokenLedger};
use crate::amm::types::{k_of, AccountId, Amount, Delta, Direction, Timestamp, TokenId, U256};

use super::ghost::GhostState;

/// Janela de prazo usada pelas chamadas válidas.
const DEADLINE_WINDOW: Timestamp = 60;

/// Limita `x` a `[min, max]` preservando a distribuição módulo o tamanho do intervalo.
pub fn bound(x: u128, min: u128, max: u128) -> u128 {
    if max <= min {
        return min;
    }
    match (max - min).checked_add(1) {
        Some(size) => min + x % size,
        None => x,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Teto do B depositado por chamada.
    pub max_deposit: Amount,
    /// Teto do A usado no bootstrap.
    pub max_bootstrap_a: Amount,
    /// Teto do input nos swaps de input exato.
    pub max_swap_input: Amount,
    /// Minta e aprova os valores necessários antes de cada chamada.
    pub fund_actors: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_deposit: 1_000_000_000,
            max_bootstrap_a: 1_000_000_000,
            max_swap_input: 1_000_000_000,
            fund_actors: true,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self, minimum_liquidity: Amount) -> Result<()> {
        if self.max_deposit < minimum_liquidity.max(1) {
            crate::amm_bail!(AmmErrorCode::InvalidConfig,
                detail => "max_deposit below minimum liquidity",
                max_deposit => self.max_deposit, minimum => minimum_liquidity);
        }
        if self.max_bootstrap_a == 0 || self.max_swap_input == 0 {
            crate::amm_bail!(AmmErrorCode::InvalidConfig,
                detail => "harness bounds must be > 0");
        }
        Ok(())
    }
}

/// Divergência entre o estado observado e o esperado.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InvariantViolation {
    #[error("reserve {asset} moved {actual}, ghost expected {expected}")]
    GhostMismatch { asset: String, actual: Delta, expected: Delta },

    #[error("reserve {asset} delta does not fit in i128 (start {start}, current {current})")]
    DeltaOutOfRange { asset: String, start: Amount, current: Amount },

    #[error("k decreased across a swap: {before} -> {after}")]
    KDecreased { before: String, after: String },

    #[error("pool balance of {asset} is {balance}, reserve is {reserve}")]
    BalanceMismatch { asset: String, balance: Amount, reserve: Amount },

    #[error("share supply {supply} differs from holder sum {held}")]
    ShareMismatch { supply: Amount, held: Amount },

    #[error("{op}: pool returned {actual}, reference computed {expected}")]
    Divergence { op: String, actual: String, expected: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OpStats {
    pub issued: u64,
    pub succeeded: u64,
    pub skipped: u64,
}

/// Contagem de chamadas por operação e motivos de descarte por código.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CallStats {
    pub per_op: BTreeMap<String, OpStats>,
    pub skip_reasons: BTreeMap<String, u64>,
}

impl CallStats {
    fn entry(&mut self, op: &str) -> &mut OpStats {
        self.per_op.entry(op.to_string()).or_default()
    }

    pub fn succeeded(&mut self, op: &str) {
        let e = self.entry(op);
        e.issued += 1;
        e.succeeded += 1;
    }

    pub fn skipped(&mut self, op: &str, code: AmmErrorCode) {
        let e = self.entry(op);
        e.issued += 1;
        e.skipped += 1;
        *self.skip_reasons.entry(code.code().to_string()).or_default() += 1;
    }

    pub fn total_issued(&self) -> u64 {
        self.per_op.values().map(|s| s.issued).sum()
    }

    pub fn total_succeeded(&self) -> u64 {
        self.per_op.values().map(|s| s.succeeded).sum()
    }

    pub fn merge(&mut self, other: &CallStats) {
        for (op, s) in &other.per_op {
            let e = self.entry(op);
            e.issued += s.issued;
            e.succeeded += s.succeeded;
            e.skipped += s.skipped;
        }
        for (code, n) in &other.skip_reasons {
            *self.skip_reasons.entry(code.clone()).or_default() += n;
        }
    }
}

fn signed_diff(current: Amount, start: Amount) -> Option<Delta> {
    if current >= start {
        Delta::try_from(current - start).ok()
    } else {
        Delta::try_from(start - current).ok().map(|d| -d)
    }
}

pub struct Handler {
    pool: Arc<Pool>,
    token_a: Arc<MemoryToken>,
    token_b: Arc<MemoryToken>,
    clock: Arc<dyn Clock>,
    config: HarnessConfig,
    ghost: GhostState,
    starting: (Amount, Amount),
    stats: CallStats,
    provider: AccountId,
    swapper: AccountId,
    k_drop: Option<(U256, U256)>,
    divergence: Option<InvariantViolation>,
}

impl Handler {
    /// Registra as reservas iniciais do pool.
    pub fn new(
        pool: Arc<Pool>,
        token_a: Arc<MemoryToken>,
        token_b: Arc<MemoryToken>,
        clock: Arc<dyn Clock>,
        config: HarnessConfig,
    ) -> Result<Self> {
        config.validate(pool.minimum_liquidity())?;
        if token_a.token() != pool.asset_a() || token_b.token() != pool.asset_b() {
            crate::amm_bail!(AmmErrorCode::InvalidConfig,
                detail => "harness tokens do not match pool assets");
        }
        let starting = pool.reserves();
        Ok(Self {
            pool,
            token_a,
            token_b,
            clock,
            config,
            ghost: GhostState::new(),
            starting,
            stats: CallStats::default(),
            provider: AccountId::new("handler:lp"),
            swapper: AccountId::new("handler:swapper"),
            k_drop: None,
            divergence: None,
        })
    }

    pub fn ghost(&self) -> &GhostState {
        &self.ghost
    }

    pub fn stats(&self) -> &CallStats {
        &self.stats
    }

    pub fn starting_reserves(&self) -> (Amount, Amount) {
        self.starting
    }

    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    /// Prazo da chamada: quase sempre válido, 1 em 16 já vencido.
    fn deadline(&self, seed: u128) -> Timestamp {
        let now = self.clock.now();
        if (seed >> 96) % 16 == 15 && now > 0 {
            now - 1
        } else {
            now + DEADLINE_WINDOW
        }
    }

    fn fund(&self, who: &AccountId, amount_a: Amount, amount_b: Amount) {
        if !self.config.fund_actors {
            return;
        }
        let spender = self.pool.account();
        for (token, amount) in [(&self.token_a, amount_a), (&self.token_b, amount_b)] {
            if amount == 0 {
                continue;
            }
            if let Err(e) = token.mint(who, amount) {
                debug!(%who, %e, "funding skipped");
                continue;
            }
            let allowance = token.allowance(who, spender).saturating_add(amount);
            token.approve(who, spender, allowance);
        }
    }

    fn skip(&mut self, op: &'static str, err: &AmmError) {
        debug!(op, code = err.code.code(), error = %err, "call skipped");
        self.stats.skipped(op, err.code);
    }

    fn diverged(&mut self, op: &'static str, actual: String, expected: String) {
        error!(op, %actual, %expected, "pool diverged from reference");
        if self.divergence.is_none() {
            self.divergence =
                Some(InvariantViolation::Divergence { op: op.to_string(), actual, expected });
        }
    }

    fn track_k(&mut self, before: (Amount, Amount)) {
        let (a, b) = self.pool.reserves();
        let (k0, k1) = (k_of(before.0, before.1), k_of(a, b));
        if k1 < k0 && self.k_drop.is_none() {
            self.k_drop = Some((k0, k1));
        }
    }

    // -------------------------
    // Chamadas limitadas
    // -------------------------

    /// Depósito com B em `[minimum_liquidity, max_deposit]` e o A esperado
    /// calculado das reservas observadas antes da chamada.
    pub fn bounded_deposit(&mut self, seed: u128) {
        const OP: &str = "deposit";
        let (reserve_a, reserve_b) = self.pool.reserves();
        let supply = self.pool.share_supply();
        let desired_b = bound(seed, self.pool.minimum_liquidity().max(1), self.config.max_deposit);

        let expected = if supply == 0 {
            Ok((bound(seed.rotate_left(64), 1, self.config.max_bootstrap_a), desired_b))
        } else {
            reference::policy_required_a(desired_b, reserve_a, reserve_b).and_then(|a| {
                reference::policy_deposit_shares(desired_b, supply, reserve_b).map(|s| (a, s))
            })
        };
        let expected = expected.and_then(|(a, s)| {
            ensure_ghost_range(reserve_a, a)?;
            ensure_ghost_range(reserve_b, desired_b)?;
            Ok((a, s))
        });
        let (amount_a, shares) = match expected {
            Ok(v) => v,
            Err(e) => return self.skip(OP, &e),
        };

        self.fund(&self.provider, amount_a, desired_b);
        let deadline = self.deadline(seed);
        let provider = self.provider.clone();
        match self.pool.deposit(&provider, desired_b, shares.max(1), amount_a, deadline) {
            Ok(minted) => {
                if minted != shares {
                    self.diverged(OP, minted.to_string(), shares.to_string());
                }
                self.ghost.record_deposit(amount_a, desired_b);
                self.stats.succeeded(OP);
            }
            Err(e) => self.skip(OP, &e),
        }
    }

    /// Swap de output exato: direção pelo bit baixo, output em `[1, r_out - 1]`
    /// e `max_input` igual ao input esperado.
    pub fn bounded_swap(&mut self, seed: u128) {
        const OP: &str = "swap_exact_output";
        let before = self.pool.reserves();
        let dir = if seed & 1 == 0 { Direction::AtoB } else { Direction::BtoA };
        let (r_in, r_out) = dir.orient(before.0, before.1);
        let output = bound(seed >> 1, 1, r_out.saturating_sub(1).max(1));
        let fee = self.pool.config().fee;

        let (input_asset, output_asset) = self.assets(dir);
        let swapper = self.swapper.clone();
        let deadline = self.deadline(seed);
        let expected = reference::policy_input_given_output(output, r_in, r_out, fee);
        if let Ok(expected_input) = expected {
            if let Err(e) = ensure_ghost_range(r_in, expected_input) {
                return self.skip(OP, &e);
            }
        }
        match expected {
            Ok(expected_input) => {
                let (fund_a, fund_b) = fund_split(dir, expected_input);
                self.fund(&swapper, fund_a, fund_b);
                let outcome = self.pool.swap_exact_output(
                    &swapper,
                    &input_asset,
                    &output_asset,
                    output,
                    expected_input,
                    deadline,
                );
                match outcome {
                    Ok(input) => {
                        if input != expected_input {
                            self.diverged(OP, input.to_string(), expected_input.to_string());
                        }
                        self.ghost.record_swap(dir, expected_input, output);
                        self.stats.succeeded(OP);
                        self.track_k(before);
                    }
                    Err(e) => self.skip(OP, &e),
                }
            }
            Err(reference_err) => {
                let outcome = self
                    .pool
                    .swap_exact_output(&swapper, &input_asset, &output_asset, output, 1, deadline);
                match outcome {
                    Ok(input) => {
                        self.stats.succeeded(OP);
                        self.diverged(OP, input.to_string(), reference_err.code.code().to_string());
                    }
                    Err(_) => self.skip(OP, &reference_err),
                }
            }
        }
    }

    /// Swap de input exato com input em `[1, max_swap_input]`.
    pub fn bounded_swap_exact_input(&mut self, seed: u128) {
        const OP: &str = "swap_exact_input";
        let before = self.pool.reserves();
        let dir = if seed & 1 == 0 { Direction::AtoB } else { Direction::BtoA };
        let (r_in, r_out) = dir.orient(before.0, before.1);
        let input = bound(seed >> 1, 1, self.config.max_swap_input);
        let fee = self.pool.config().fee;

        let expected_output = match reference::policy_output_given_input(input, r_in, r_out, fee)
            .and_then(|out| ensure_ghost_range(r_in, input).map(|_| out))
        {
            Ok(v) => v,
            Err(e) => return self.skip(OP, &e),
        };
        let (input_asset, output_asset) = self.assets(dir);
        let swapper = self.swapper.clone();
        let (fund_a, fund_b) = fund_split(dir, input);
        self.fund(&swapper, fund_a, fund_b);
        let deadline = self.deadline(seed);
        let outcome = self.pool.swap_exact_input(
            &swapper,
            &input_asset,
            input,
            &output_asset,
            expected_output.max(1),
            deadline,
        );
        match outcome {
            Ok(output) => {
                if output != expected_output {
                    self.diverged(OP, output.to_string(), expected_output.to_string());
                }
                self.ghost.record_swap(dir, input, expected_output);
                self.stats.succeeded(OP);
                self.track_k(before);
            }
            Err(e) => self.skip(OP, &e),
        }
    }

    /// Resgate de uma fração dos shares do provedor.
    pub fn bounded_withdraw(&mut self, seed: u128) {
        const OP: &str = "withdraw";
        let (reserve_a, reserve_b) = self.pool.reserves();
        let supply = self.pool.share_supply();
        let provider = self.provider.clone();
        let held = self.pool.shares_of(&provider);
        let shares = bound(seed, 1, held.max(1));

        let (min_a, min_b) =
            reference::policy_withdraw_amounts(shares, reserve_a, reserve_b, supply)
            .unwrap_or((0, 0));
        let deadline = self.deadline(seed);
        match self.pool.withdraw(&provider, shares, min_a.max(1), min_b.max(1), deadline) {
            Ok((a, b)) => {
                if (a, b) != (min_a, min_b) {
                    self.diverged(OP, format!("({a}, {b})"), format!("({min_a}, {min_b})"));
                }
                self.ghost.record_withdraw(min_a, min_b);
                self.stats.succeeded(OP);
            }
            Err(e) => self.skip(OP, &e),
        }
    }

    fn assets(&self, dir: Direction) -> (TokenId, TokenId) {
        let (a, b) = (self.pool.asset_a().clone(), self.pool.asset_b().clone());
        match dir {
            Direction::AtoB => (a, b),
            Direction::BtoA => (b, a),
        }
    }

    // -------------------------
    // Asserções
    // -------------------------

    /// `atual - inicial == esperado` para A e B, igualdade exata.
    pub fn assert_invariant(&self) -> std::result::Result<(), InvariantViolation> {
        let (current_a, current_b) = self.pool.reserves();
        let checks = [
            (self.pool.asset_a(), self.starting.0, current_a, self.ghost.expected_delta_a),
            (self.pool.asset_b(), self.starting.1, current_b, self.ghost.expected_delta_b),
        ];
        for (asset, start, current, expected) in checks {
            let Some(actual) = signed_diff(current, start) else {
                return Err(InvariantViolation::DeltaOutOfRange {
                    asset: asset.to_string(),
                    start,
                    current,
                });
            };
            if actual != expected {
                error!(%asset, actual, expected, "ghost mismatch");
                return Err(InvariantViolation::GhostMismatch {
                    asset: asset.to_string(),
                    actual,
                    expected,
                });
            }
        }
        Ok(())
    }

    /// Nenhum swap bem-sucedido reduziu k.
    pub fn assert_k_non_decreasing_on_swaps(&self) -> std::result::Result<(), InvariantViolation> {
        match self.k_drop {
            Some((before, after)) => Err(InvariantViolation::KDecreased {
                before: before.to_string(),
                after: after.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Saldos do pool nos dois tokens iguais às reservas.
    pub fn assert_reserves_match_balances(&self) -> std::result::Result<(), InvariantViolation> {
        let (reserve_a, reserve_b) = self.pool.reserves();
        let account = self.pool.account();
        for (token, reserve) in [(&self.token_a, reserve_a), (&self.token_b, reserve_b)] {
            let balance = token.balance_of(account);
            if balance != reserve {
                return Err(InvariantViolation::BalanceMismatch {
                    asset: token.token().to_string(),
                    balance,
                    reserve,
                });
            }
        }
        Ok(())
    }

    /// Oferta de shares igual à soma dos saldos dos holders.
    pub fn assert_share_supply_matches_holders(
        &self,
    ) -> std::result::Result<(), InvariantViolation> {
        let ledger = self.pool.snapshot();
        share_totals(ledger.share_supply(), ledger.holders().map(|(_, n)| *n))
    }

    /// Todas as asserções, incluindo divergências registradas.
    pub fn check_all(&self) -> std::result::Result<(), InvariantViolation> {
        if let Some(v) = &self.divergence {
            return Err(v.clone());
        }
        self.assert_invariant()?;
        self.assert_k_non_decreasing_on_swaps()?;
        self.assert_reserves_match_balances()?;
        self.assert_share_supply_matches_holders()
    }
}

/// Oferta de shares contra a soma dos saldos por holder.
fn share_totals(
    supply: Amount,
    holdings: impl Iterator<Item = Amount>,
) -> std::result::Result<(), InvariantViolation> {
    let held: Amount = holdings.sum();
    if held != supply {
        return Err(InvariantViolation::ShareMismatch { supply, held });
    }
    Ok(())
}

/// Reservas acima de `Delta::MAX` não cabem nos acumuladores do fantasma.
fn ensure_ghost_range(reserve: Amount, added: Amount) -> Result<()> {
    match reserve.checked_add(added) {
        Some(after) if after <= Delta::MAX as Amount => Ok(()),
        _ => Err(crate::amm_err!(AmmErrorCode::Overflow,
            detail => "reserve leaves ghost range", reserve => reserve, added => added)),
    }
}

/// `(A, B)` que o swapper precisa receber para pagar `input`.
fn fund_split(dir: Direction, input: Amount) -> (Amount, Amount) {
    match dir {
        Direction::AtoB => (input, 0),
        Direction::BtoA => (0, input),
    }
}
