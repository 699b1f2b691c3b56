//! Instrumentos OTel do pool, no meter global.
//! Sem provider configurado (testes, `init_fmt_only`) viram no-op.

use std::time::Instant;

use once_cell::sync::OnceCell;
use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::{global, KeyValue};

use super::error::Result;
use super::types::U256;

struct Instruments {
    ops_total: Counter<u64>,
    op_duration_ms: Histogram<f64>,
    k_growth_rel: Histogram<f64>,
}

static INSTRUMENTS: OnceCell<Instruments> = OnceCell::new();

fn instruments() -> &'static Instruments {
    INSTRUMENTS.get_or_init(|| {
        let meter = global::meter("cpmm_exchange");
        Instruments {
            ops_total: meter
                .u64_counter("amm_ops_total")
                .with_description("Pool operations by outcome")
                .build(),
            op_duration_ms: meter
                .f64_histogram("amm_op_duration_ms")
                .with_unit("ms")
                .with_description("Latency of pool operations in ms")
                .build(),
            k_growth_rel: meter
                .f64_histogram("amm_k_growth_rel")
                .with_unit("1")
                .with_description("Relative growth of k per swap (k1-k0)/k0")
                .build(),
        }
    })
}

/// Executa `f`, registra duração e resultado (`ok` ou o código do erro).
pub fn timed<T, F>(op: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let start = Instant::now();
    let out = f();
    let ms = start.elapsed().as_secs_f64() * 1_000.0;
    let outcome = match &out {
        Ok(_) => "ok",
        Err(e) => e.code.code(),
    };
    let m = instruments();
    m.op_duration_ms.record(ms, &[KeyValue::new("op", op)]);
    m.ops_total.add(1, &[KeyValue::new("op", op), KeyValue::new("outcome", outcome)]);
    out
}

/// `(k1 - k0) / k0` aproximado em f64; 0 quando k0 = 0.
pub fn k_growth(k0: U256, k1: U256) -> f64 {
    if k0.is_zero() {
        return 0.0;
    }
    let diff = if k1 >= k0 { k1 - k0 } else { k0 - k1 };
    let rel = u256_to_f64(diff) / u256_to_f64(k0);
    if k1 >= k0 {
        rel
    } else {
        -rel
    }
}

pub fn record_k_growth(k0: U256, k1: U256) {
    instruments().k_growth_rel.record(k_growth(k0, k1), &[]);
}

fn u256_to_f64(v: U256) -> f64 {
    v.0.iter()
        .rev()
        .fold(0.0, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amm::error::AmmError;
    use crate::amm::error_catalog::AmmErrorCode;

    #[test]
    fn timed_passes_result_through() {
        assert_eq!(timed("test.ok", || Ok(7)).unwrap(), 7);
        let err = timed::<(), _>("test.err", || Err(AmmError::new(AmmErrorCode::ZeroAmount)))
            .unwrap_err();
        assert_eq!(err.code, AmmErrorCode::ZeroAmount);
    }

    #[test]
    fn k_growth_is_relative() {
        assert_eq!(k_growth(U256::zero(), U256::from(5u8)), 0.0);
        assert!((k_growth(U256::from(1_000u32), U256::from(1_003u32)) - 0.003).abs() < 1e-12);
        assert!(k_growth(U256::from(10u8), U256::from(9u8)) < 0.0);
    }

    #[test]
    fn u256_conversion_handles_high_limbs() {
        let v = U256::from(u128::MAX) + U256::one();
        assert!((u256_to_f64(v) - 2f64.powi(128)).abs() / 2f64.powi(128) < 1e-12);
    }
}
