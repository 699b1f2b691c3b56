use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::task::JoinSet;
use tracing::{error, info};

use cpmm_exchange::invariant::{Campaign, CampaignConfig, CampaignReport, HarnessConfig};
use cpmm_exchange::telemetry;

/// Roda campanhas de invariantes contra pools em memória.
#[derive(Parser, Debug)]
#[command(name = "invariant_campaign", version)]
struct Args {
    /// Execuções por campanha (pool novo em cada uma).
    #[arg(long, env = "CPMM_CAMPAIGN_RUNS", default_value_t = 64)]
    runs: u32,

    /// Chamadas por execução.
    #[arg(long, env = "CPMM_CAMPAIGN_DEPTH", default_value_t = 128)]
    depth: u32,

    /// Semente da primeira campanha; as demais usam seed + i.
    #[arg(long, env = "CPMM_CAMPAIGN_SEED", default_value_t = 0x5eed)]
    seed: u64,

    /// Campanhas independentes em paralelo.
    #[arg(long, env = "CPMM_CAMPAIGN_PARALLEL", default_value_t = 4)]
    parallel: u32,

    /// Teto do B por depósito.
    #[arg(long, default_value_t = HarnessConfig::default().max_deposit)]
    max_deposit: u128,

    /// Imprime os relatórios em JSON no stdout.
    #[arg(long)]
    json: bool,

    /// Exporta traces e métricas via OTLP/HTTP.
    #[arg(long)]
    otlp: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let handle = if args.otlp {
        telemetry::init("cpmm-invariant-campaign")?
    } else {
        telemetry::init_fmt_only()
    };

    let harness = HarnessConfig { max_deposit: args.max_deposit, ..HarnessConfig::default() };
    let mut tasks = JoinSet::new();
    for i in 0..args.parallel.max(1) {
        let config = CampaignConfig {
            runs: args.runs,
            depth: args.depth,
            seed: args.seed.wrapping_add(u64::from(i)),
            harness,
            ..CampaignConfig::default()
        };
        let campaign = Campaign::new(config).map_err(|e| anyhow::anyhow!(e.to_user_string()))?;
        tasks.spawn_blocking(move || campaign.run());
    }

    let mut reports: Vec<CampaignReport> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let report = joined
            .context("campaign task panicked")?
            .map_err(|e| anyhow::anyhow!(e.to_user_string()))?;
        reports.push(report);
    }
    reports.sort_by_key(|r| r.config.seed);

    let violations: usize = reports.iter().map(|r| r.violations.len()).sum();
    for report in &reports {
        info!(
            seed = report.config.seed,
            calls = report.stats.total_issued(),
            succeeded = report.stats.total_succeeded(),
            violations = report.violations.len(),
            "campaign report"
        );
        for v in &report.violations {
            error!(seed = report.config.seed, run = v.run, step = v.step,
                violation = %v.violation, "violation");
        }
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    tokio::task::spawn_blocking(move || handle.shutdown())
        .await
        .context("telemetry shutdown panicked")??;

    if violations > 0 {
        bail!("{violations} invariant violation(s) found");
    }
    Ok(())
}
