//! Campanha de fuzzing com estado: `runs` execuções de `depth` chamadas
//! aleatórias, cada execução num pool novo, com asserções depois de cada chamada.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::amm::clock::ManualClock;
use crate::amm::error::Result;
use crate::amm::error_catalog::AmmErrorCode;
use crate::amm::registry::PoolRegistry;
use crate::amm::token::MemoryToken;
use crate::amm::types::{PoolConfig, TokenId};
use crate::telemetry::make_op_span;

use super::ghost::GhostState;
use super::handler::{CallStats, Handler, HarnessConfig, InvariantViolation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub runs: u32,
    pub depth: u32,
    pub seed: u64,
    pub pool: PoolConfig,
    pub harness: HarnessConfig,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            runs: 64,
            depth: 128,
            seed: 0x5eed,
            pool: PoolConfig::default(),
            harness: HarnessConfig::default(),
        }
    }
}

/// Primeira asserção que falhou numa execução.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ViolationRecord {
    pub run: u32,
    pub step: u32,
    pub violation: InvariantViolation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run: u32,
    pub steps: u32,
    pub final_reserves: (u128, u128),
    pub share_supply: u128,
    pub ghost: GhostState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CampaignReport {
    pub config: CampaignConfig,
    pub runs: Vec<RunReport>,
    pub stats: CallStats,
    pub violations: Vec<ViolationRecord>,
}

impl CampaignReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

pub struct Campaign {
    config: CampaignConfig,
}

impl Campaign {
    pub fn new(config: CampaignConfig) -> Result<Self> {
        if config.runs == 0 || config.depth == 0 {
            crate::amm_bail!(AmmErrorCode::InvalidConfig,
                detail => "runs and depth must be > 0", runs => config.runs, depth => config.depth);
        }
        config.harness.validate(config.pool.minimum_liquidity)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    /// Executa todas as execuções. Mesma semente, mesmo relatório.
    pub fn run(&self) -> Result<CampaignReport> {
        let started = Instant::now();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut report = CampaignReport {
            config: self.config,
            runs: Vec::with_capacity(self.config.runs as usize),
            stats: CallStats::default(),
            violations: Vec::new(),
        };
        for run in 0..self.config.runs {
            let run_seed: u64 = rng.gen();
            let (run_report, stats, violation) = self.run_once(run, run_seed)?;
            report.stats.merge(&stats);
            report.runs.push(run_report);
            if let Some(v) = violation {
                report.violations.push(v);
            }
        }
        info!(
            runs = self.config.runs,
            depth = self.config.depth,
            calls = report.stats.total_issued(),
            succeeded = report.stats.total_succeeded(),
            violations = report.violations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "campaign finished"
        );
        Ok(report)
    }

    fn run_once(
        &self,
        run: u32,
        seed: u64,
    ) -> Result<(RunReport, CallStats, Option<ViolationRecord>)> {
        let span = make_op_span("campaign.run", run, "invariant");
        let _guard = span.enter();

        let mut rng = StdRng::seed_from_u64(seed);
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let token_a = Arc::new(MemoryToken::new(TokenId::new("A")));
        let token_b = Arc::new(MemoryToken::new(TokenId::new("B")));
        let registry = PoolRegistry::new(token_b.clone(), clock.clone(), self.config.pool);
        let pool = registry.create_pool(token_a.clone())?;
        let mut handler = Handler::new(pool, token_a, token_b, clock.clone(), self.config.harness)?;

        let mut violation = None;
        let mut steps = 0;
        for step in 0..self.config.depth {
            let call_seed: u128 = rng.gen();
            match rng.gen_range(0..8u8) {
                0..=1 => handler.bounded_deposit(call_seed),
                2..=4 => handler.bounded_swap(call_seed),
                5..=6 => handler.bounded_swap_exact_input(call_seed),
                _ => handler.bounded_withdraw(call_seed),
            }
            clock.advance(rng.gen_range(0..30));
            steps = step + 1;
            if let Err(v) = handler.check_all() {
                error!(run, step, violation = %v, "invariant violated");
                violation = Some(ViolationRecord { run, step, violation: v });
                break;
            }
        }

        let pool = handler.pool();
        let run_report = RunReport {
            run,
            steps,
            final_reserves: pool.reserves(),
            share_supply: pool.share_supply(),
            ghost: *handler.ghost(),
        };
        Ok((run_report, handler.stats().clone(), violation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(seed: u64) -> CampaignConfig {
        CampaignConfig { runs: 4, depth: 48, seed, ..CampaignConfig::default() }
    }

    #[test]
    fn campaign_is_clean_and_deterministic() {
        let first = Campaign::new(small(7)).unwrap().run().unwrap();
        let second = Campaign::new(small(7)).unwrap().run().unwrap();
        assert!(first.is_clean(), "{:?}", first.violations);
        assert_eq!(first, second);
        assert_eq!(first.stats.total_issued(), 4 * 48);
    }

    #[test]
    fn empty_campaign_is_rejected() {
        let cfg = CampaignConfig { runs: 0, ..CampaignConfig::default() };
        assert_eq!(Campaign::new(cfg).err().unwrap().code, AmmErrorCode::InvalidConfig);
    }
}
