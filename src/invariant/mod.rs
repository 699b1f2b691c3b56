//! Harness de invariantes: estado fantasma, driver de chamadas limitadas e
//! campanhas aleatórias reproduzíveis.

pub mod campaign;
pub mod ghost;
pub mod handler;

pub use campaign::{Campaign, CampaignConfig, CampaignReport};
pub use ghost::GhostState;
pub use handler::{bound, CallStats, Handler, HarnessConfig, InvariantViolation};
