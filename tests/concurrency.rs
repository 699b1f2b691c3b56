use std::sync::Arc;
use std::thread;

use cpmm_exchange::amm::clock::ManualClock;
use cpmm_exchange::amm::token::{MemoryToken, TokenLedger};
use cpmm_exchange::amm::types::{k_of, AccountId, PoolConfig, TokenId};
use cpmm_exchange::amm::{Pool, PoolRegistry};

const NOW: u64 = 50;

fn seed_pool(pool: &Pool, a: &MemoryToken, b: &MemoryToken, reserve_a: u128, reserve_b: u128) {
    let lp = AccountId::new("lp");
    a.mint(&lp, reserve_a).unwrap();
    b.mint(&lp, reserve_b).unwrap();
    a.approve(&lp, pool.account(), reserve_a);
    b.approve(&lp, pool.account(), reserve_b);
    pool.deposit(&lp, reserve_b, 1, reserve_a, NOW).unwrap();
}

#[test]
fn concurrent_swaps_on_one_pool_stay_consistent() {
    let a = Arc::new(MemoryToken::new(TokenId::new("A")));
    let b = Arc::new(MemoryToken::new(TokenId::new("B")));
    let clock = Arc::new(ManualClock::new(NOW));
    let registry = PoolRegistry::new(b.clone(), clock, PoolConfig::default());
    let pool = registry.create_pool(a.clone()).unwrap();
    seed_pool(&pool, &a, &b, 10_000_000, 10_000_000);
    let k0 = k_of(10_000_000, 10_000_000);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let (pool, a, b) = (pool.clone(), a.clone(), b.clone());
            thread::spawn(move || {
                let trader = AccountId::new(format!("trader-{t}"));
                a.mint(&trader, 1_000_000).unwrap();
                b.mint(&trader, 1_000_000).unwrap();
                a.approve(&trader, pool.account(), 1_000_000);
                b.approve(&trader, pool.account(), 1_000_000);
                let (asset_a, asset_b) = (pool.asset_a().clone(), pool.asset_b().clone());
                let mut ok = 0;
                for i in 0..200u128 {
                    let amount = 100 + (i * 37 + t as u128) % 900;
                    let result = if (i + t as u128) % 2 == 0 {
                        pool.swap_exact_input(&trader, &asset_a, amount, &asset_b, 1, NOW)
                    } else {
                        pool.swap_exact_output(&trader, &asset_b, &asset_a, amount / 2, amount, NOW)
                    };
                    if result.is_ok() {
                        ok += 1;
                    }
                }
                ok
            })
        })
        .collect();
    let succeeded: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(succeeded > 0);

    let (ra, rb) = pool.reserves();
    assert!(k_of(ra, rb) >= k0);
    assert_eq!(a.balance_of(pool.account()), ra);
    assert_eq!(b.balance_of(pool.account()), rb);
    // conservação: nada foi criado nem destruído pelos swaps
    assert_eq!(a.total_supply(), 10_000_000 + 8 * 1_000_000);
    assert_eq!(b.total_supply(), 10_000_000 + 8 * 1_000_000);
}

#[test]
fn pools_for_different_assets_run_independently() {
    let base = Arc::new(MemoryToken::new(TokenId::new("B")));
    let clock = Arc::new(ManualClock::new(NOW));
    let registry = Arc::new(PoolRegistry::new(base.clone(), clock, PoolConfig::default()));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let (registry, base) = (registry.clone(), base.clone());
            thread::spawn(move || {
                let token = Arc::new(MemoryToken::new(TokenId::new(format!("T{t}"))));
                let pool = registry.create_pool(token.clone()).unwrap();
                seed_pool(&pool, &token, &base, 1_000_000, 2_000_000);
                let trader = AccountId::new(format!("trader-{t}"));
                token.mint(&trader, 50_000).unwrap();
                token.approve(&trader, pool.account(), 50_000);
                for _ in 0..50 {
                    pool.sell_asset_a(&trader, 1_000, 1, NOW).unwrap();
                }
                (pool.reserves(), token.balance_of(pool.account()))
            })
        })
        .collect();

    for h in handles {
        let ((ra, _), balance) = h.join().unwrap();
        assert_eq!(ra, 1_050_000);
        assert_eq!(balance, ra);
    }
    assert_eq!(registry.len(), 4);
    let mut pooled_b = 0u128;
    for t in 0..4 {
        let pool = registry.pool_for(&TokenId::new(format!("T{t}"))).unwrap();
        let (_, rb) = pool.reserves();
        assert_eq!(base.balance_of(pool.account()), rb);
        pooled_b += rb;
    }
    assert!(pooled_b < 4 * 2_000_000);
}
