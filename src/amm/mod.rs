pub mod types;
pub mod guardrails;
pub mod pricing;
pub mod liquidity;
pub mod quote;
pub mod reference;

// erros
pub mod error_catalog;
pub mod error;
pub mod error_map;

// estado e colaboradores
pub mod ledger;
pub mod token;
pub mod clock;
pub mod pool;
pub mod registry;
pub mod metrics;

pub use error::{AmmError, Result};
pub use error_catalog::AmmErrorCode;
pub use pool::Pool;
pub use registry::PoolRegistry;
pub use types::{AccountId, Amount, Direction, FeeSchedule, PoolConfig, TokenId};
