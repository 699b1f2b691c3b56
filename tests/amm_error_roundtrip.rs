use std::sync::Arc;

use serde_json::Value;

use cpmm_exchange::amm::clock::ManualClock;
use cpmm_exchange::amm::error::AmmError;
use cpmm_exchange::amm::error_catalog::AmmErrorCode;
use cpmm_exchange::amm::token::MemoryToken;
use cpmm_exchange::amm::types::{AccountId, PoolConfig, TokenId};
use cpmm_exchange::amm::Pool;

fn parse(err: &AmmError) -> Value {
    serde_json::from_str(&err.to_log_json()).expect("log line is valid json")
}

#[test]
fn json_shape_per_code() {
    for code in AmmErrorCode::all() {
        let value = parse(&AmmError::new(*code));
        assert_eq!(value["code"], code.code());
        assert_eq!(value["title"], code.title());
        assert_eq!(value["message"], code.message_pt());
        assert!(value["context"].as_object().unwrap().is_empty());
    }
}

#[test]
fn json_escapes_context() {
    let err = AmmError::new(AmmErrorCode::InvalidConfig)
        .with_context("detail", "aspas \" e \\ barra");
    let value = parse(&err);
    assert_eq!(value["context"]["detail"], "aspas \" e \\ barra");
    assert_eq!(value["message"], "configuração inválida: aspas \" e \\ barra");
}

#[test]
fn pool_errors_carry_context_into_json() {
    let a = Arc::new(MemoryToken::new(TokenId::new("A")));
    let b = Arc::new(MemoryToken::new(TokenId::new("B")));
    let pool = Pool::new(
        AccountId::new("pool:A"),
        a,
        b,
        Arc::new(ManualClock::new(50)),
        PoolConfig::default(),
    )
    .unwrap();

    let err = pool
        .swap_exact_output(&AccountId::new("t"), &TokenId::new("A"), &TokenId::new("A"), 1, 1, 50)
        .unwrap_err();
    let value = parse(&err);
    assert_eq!(value["code"], "AMM-0010");
    assert_eq!(value["context"]["input"], "A");
    assert_eq!(value["message"], "par A/A não é negociado por este pool");

    let err = pool.deposit(&AccountId::new("lp"), 10, 10, 10, 49).unwrap_err();
    let value = parse(&err);
    assert_eq!(value["code"], "AMM-0002");
    assert_eq!(value["context"]["now"], "50");
    assert_eq!(value["context"]["deadline"], "49");
}
