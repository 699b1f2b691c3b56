use std::sync::Arc;

use cpmm_exchange::amm::clock::ManualClock;
use cpmm_exchange::amm::error_catalog::AmmErrorCode;
use cpmm_exchange::amm::token::{MemoryToken, TokenLedger};
use cpmm_exchange::amm::types::{AccountId, Amount, PoolConfig, TokenId};
use cpmm_exchange::amm::{Pool, PoolRegistry};

const NOW: u64 = 1_000;

struct Env {
    pool: Arc<Pool>,
    a: Arc<MemoryToken>,
    b: Arc<MemoryToken>,
    clock: Arc<ManualClock>,
}

fn env() -> Env {
    let a = Arc::new(MemoryToken::new(TokenId::new("A")));
    let b = Arc::new(MemoryToken::new(TokenId::new("B")));
    let clock = Arc::new(ManualClock::new(NOW));
    let registry = PoolRegistry::new(b.clone(), clock.clone(), PoolConfig::default());
    let pool = registry.create_pool(a.clone()).unwrap();
    Env { pool, a, b, clock }
}

fn lp() -> AccountId {
    AccountId::new("lp")
}

fn trader() -> AccountId {
    AccountId::new("trader")
}

fn fund(e: &Env, who: &AccountId, amount_a: Amount, amount_b: Amount) {
    e.a.mint(who, amount_a).unwrap();
    e.b.mint(who, amount_b).unwrap();
    e.a.approve(who, e.pool.account(), e.a.allowance(who, e.pool.account()) + amount_a);
    e.b.approve(who, e.pool.account(), e.b.allowance(who, e.pool.account()) + amount_b);
}

/// Pool com 2_000_000 A : 1_000_000 B.
fn seeded() -> Env {
    let e = env();
    fund(&e, &lp(), 2_000_000, 1_000_000);
    e.pool.deposit(&lp(), 1_000_000, 1_000_000, 2_000_000, NOW).unwrap();
    e
}

fn asset(s: &str) -> TokenId {
    TokenId::new(s)
}

#[test]
fn zero_amounts_are_rejected_without_side_effects() {
    let e = seeded();
    fund(&e, &trader(), 1_000, 1_000);
    let before = e.pool.snapshot();
    let p = &e.pool;
    let t = trader();
    let results = [
        p.deposit(&t, 0, 1, 1, NOW).map(|_| ()),
        p.deposit(&t, 1_000, 0, 1, NOW).map(|_| ()),
        p.deposit(&t, 1_000, 1, 0, NOW).map(|_| ()),
        p.withdraw(&lp(), 0, 1, 1, NOW).map(|_| ()),
        p.withdraw(&lp(), 10, 0, 1, NOW).map(|_| ()),
        p.withdraw(&lp(), 10, 1, 0, NOW).map(|_| ()),
        p.swap_exact_input(&t, &asset("A"), 0, &asset("B"), 1, NOW).map(|_| ()),
        p.swap_exact_input(&t, &asset("A"), 10, &asset("B"), 0, NOW).map(|_| ()),
        p.swap_exact_output(&t, &asset("A"), &asset("B"), 0, 10, NOW).map(|_| ()),
        p.swap_exact_output(&t, &asset("A"), &asset("B"), 10, 0, NOW).map(|_| ()),
        p.sell_asset_a(&t, 0, 1, NOW).map(|_| ()),
    ];
    for (i, r) in results.into_iter().enumerate() {
        assert_eq!(r.unwrap_err().code, AmmErrorCode::ZeroAmount, "call #{i}");
    }
    assert_eq!(e.pool.snapshot(), before);
}

#[test]
fn deadline_is_inclusive() {
    let e = seeded();
    fund(&e, &trader(), 100, 0);
    e.clock.set(NOW + 10);
    let err = e.pool.sell_asset_a(&trader(), 100, 1, NOW + 9).unwrap_err();
    assert_eq!(err.code, AmmErrorCode::DeadlineExpired);
    assert!(e.pool.sell_asset_a(&trader(), 100, 1, NOW + 10).is_ok());
}

#[test]
fn exact_output_slippage_leaves_reserves_unchanged() {
    let e = seeded();
    fund(&e, &trader(), 10_000, 0);
    let (ra, rb) = e.pool.reserves();
    let fee = PoolConfig::default().fee;
    let needed = cpmm_exchange::amm::pricing::input_given_output(1_000, ra, rb, fee).unwrap();
    let err = e
        .pool
        .swap_exact_output(&trader(), &asset("A"), &asset("B"), 1_000, needed - 1, NOW)
        .unwrap_err();
    assert_eq!(err.code, AmmErrorCode::SlippageExceeded);
    assert_eq!(err.context["bound"], "max_input");
    assert_eq!(e.pool.reserves(), (ra, rb));
    assert_eq!(e.a.balance_of(&trader()), 10_000);

    let paid = e
        .pool
        .swap_exact_output(&trader(), &asset("A"), &asset("B"), 1_000, needed, NOW)
        .unwrap();
    assert_eq!(paid, needed);
    assert_eq!(e.pool.reserves(), (ra + needed, rb - 1_000));
    assert_eq!(e.b.balance_of(&trader()), 1_000);
}

#[test]
fn exact_input_slippage_uses_min_output() {
    let e = seeded();
    fund(&e, &trader(), 0, 5_000);
    let quoted = e.pool.price_of_one_b_in_a(5_000).unwrap();
    let err = e
        .pool
        .swap_exact_input(&trader(), &asset("B"), 5_000, &asset("A"), quoted + 1, NOW)
        .unwrap_err();
    assert_eq!(err.code, AmmErrorCode::SlippageExceeded);
    let got = e
        .pool
        .swap_exact_input(&trader(), &asset("B"), 5_000, &asset("A"), quoted, NOW)
        .unwrap();
    assert_eq!(got, quoted);
}

#[test]
fn unsupported_pairs_are_rejected() {
    let e = seeded();
    let t = trader();
    for (i, o) in [("A", "A"), ("B", "B"), ("A", "C"), ("C", "B")] {
        let err = e.pool.swap_exact_input(&t, &asset(i), 10, &asset(o), 1, NOW).unwrap_err();
        assert_eq!(err.code, AmmErrorCode::UnsupportedPair, "{i}->{o}");
    }
}

#[test]
fn bootstrap_below_minimum_liquidity_fails() {
    let e = env();
    fund(&e, &lp(), 10, 999);
    let err = e.pool.deposit(&lp(), 999, 1, 10, NOW).unwrap_err();
    assert_eq!(err.code, AmmErrorCode::LiquidityTooLow);
    assert_eq!(e.pool.reserves(), (0, 0));
    assert_eq!(e.pool.minimum_liquidity(), 1_000);
}

#[test]
fn proportional_deposit_and_full_withdraw() {
    let e = seeded();
    let other = AccountId::new("other");
    fund(&e, &other, 1_000_000, 500_000);
    assert_eq!(e.pool.required_a_for_deposit(500_000).unwrap(), 1_000_000);
    let err = e.pool.deposit(&other, 500_000, 1, 999_999, NOW).unwrap_err();
    assert_eq!(err.code, AmmErrorCode::SlippageExceeded);
    assert_eq!(err.context["bound"], "max_a");

    let shares = e.pool.deposit(&other, 500_000, 500_000, 1_000_000, NOW).unwrap();
    assert_eq!(shares, 500_000);
    assert_eq!(e.pool.reserves(), (3_000_000, 1_500_000));

    let (a_out, b_out) = e.pool.withdraw(&other, 500_000, 1, 1, NOW).unwrap();
    assert_eq!((a_out, b_out), (1_000_000, 500_000));
    let (a_out, b_out) = e.pool.withdraw(&lp(), 1_000_000, 1, 1, NOW).unwrap();
    assert_eq!((a_out, b_out), (2_000_000, 1_000_000));
    assert_eq!(e.pool.reserves(), (0, 0));
    assert_eq!(e.pool.share_supply(), 0);
    assert_eq!(e.a.balance_of(e.pool.account()), 0);
}

#[test]
fn withdraw_more_than_owned_fails() {
    let e = seeded();
    let err = e.pool.withdraw(&trader(), 1, 1, 1, NOW).unwrap_err();
    assert_eq!(err.code, AmmErrorCode::InsufficientShares);
    let err = e.pool.withdraw(&lp(), 1_000_001, 1, 1, NOW).unwrap_err();
    assert_eq!(err.code, AmmErrorCode::InsufficientShares);
}

#[test]
fn failed_second_inbound_refunds_first() {
    let e = seeded();
    let other = AccountId::new("other");
    // A aprovado, B sem allowance
    e.a.mint(&other, 2_000).unwrap();
    e.a.approve(&other, e.pool.account(), 2_000);
    e.b.mint(&other, 1_000).unwrap();

    let before = e.pool.snapshot();
    let err = e.pool.deposit(&other, 1_000, 1, 2_000, NOW).unwrap_err();
    assert_eq!(err.code, AmmErrorCode::TransferFailed);
    assert_eq!(err.context["token"], "B");
    assert_eq!(e.a.balance_of(&other), 2_000);
    assert_eq!(e.b.balance_of(&other), 1_000);
    assert_eq!(e.pool.snapshot(), before);
    assert_eq!(e.a.balance_of(e.pool.account()), before.current_reserves().0);
    assert_eq!(e.a.allowance(&other, e.pool.account()), 2_000);

    // com B aprovado a mesma chamada passa
    e.b.approve(&other, e.pool.account(), 1_000);
    assert_eq!(e.pool.deposit(&other, 1_000, 1, 2_000, NOW).unwrap(), 1_000);
    assert_eq!(e.a.allowance(&other, e.pool.account()), 0);
}

#[test]
fn pool_account_cannot_call_itself() {
    let e = seeded();
    let me = e.pool.account().clone();
    e.a.approve(&me, &me, Amount::MAX);
    e.b.approve(&me, &me, Amount::MAX);
    let before = e.pool.snapshot();
    let p = &e.pool;
    let results = [
        p.deposit(&me, 1_000, 1, 2_000, NOW).map(|_| ()),
        p.withdraw(&me, 1, 1, 1, NOW).map(|_| ()),
        p.swap_exact_input(&me, &asset("A"), 1_000, &asset("B"), 1, NOW).map(|_| ()),
        p.swap_exact_output(&me, &asset("B"), &asset("A"), 1_000, 10_000, NOW).map(|_| ()),
        p.sell_asset_a(&me, 1_000, 1, NOW).map(|_| ()),
    ];
    for (i, r) in results.into_iter().enumerate() {
        let err = r.unwrap_err();
        assert_eq!(err.code, AmmErrorCode::PoolSelfCall, "call #{i}");
        assert_eq!(err.context["caller"], "pool:A");
    }
    assert_eq!(e.pool.snapshot(), before);
    assert_eq!(e.a.balance_of(&me), 2_000_000);
    assert_eq!(e.b.balance_of(&me), 1_000_000);
}

#[test]
fn failed_outbound_on_withdraw_reverts_first_leg() {
    let e = seeded();
    e.b.reject_transfers_to(&lp(), true);
    let before = e.pool.snapshot();
    let err = e.pool.withdraw(&lp(), 1_000, 1, 1, NOW).unwrap_err();
    assert_eq!(err.code, AmmErrorCode::TransferFailed);
    assert_eq!(e.pool.snapshot(), before);
    assert_eq!(e.a.balance_of(e.pool.account()), 2_000_000);
    assert_eq!(e.a.balance_of(&lp()), 0);
}

#[test]
fn spot_views_follow_reserves() {
    let e = seeded();
    // vender 1_000 A contra 2M:1M, com taxa
    assert_eq!(e.pool.price_of_one_a_in_b(1_000).unwrap(), 498);
    assert_eq!(e.pool.price_of_one_b_in_a(1_000).unwrap(), 1_992);
    assert_eq!(e.pool.asset_a(), &asset("A"));
    assert_eq!(e.pool.asset_b(), &asset("B"));
    assert_eq!(e.pool.config(), PoolConfig::default());
    assert_eq!(e.pool.shares_of(&lp()), 1_000_000);
}
