//! Pool de produto constante (x·y=k) com harness de invariantes.

pub mod amm;
pub mod invariant;
pub mod telemetry;
