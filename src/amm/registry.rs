//! Registro de pools: um pool por ativo, todos pareados contra o ativo base B.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use super::clock::Clock;
use super::error::Result;
use super::error_catalog::AmmErrorCode;
use super::pool::Pool;
use super::token::TokenLedger;
use super::types::{AccountId, PoolConfig, TokenId};

#[derive(Default)]
struct Entries {
    by_asset: BTreeMap<TokenId, Arc<Pool>>,
    by_account: BTreeMap<AccountId, TokenId>,
}

pub struct PoolRegistry {
    base: Arc<dyn TokenLedger>,
    clock: Arc<dyn Clock>,
    config: PoolConfig,
    entries: RwLock<Entries>,
}

impl PoolRegistry {
    pub fn new(base: Arc<dyn TokenLedger>, clock: Arc<dyn Clock>, config: PoolConfig) -> Self {
        Self { base, clock, config, entries: RwLock::new(Entries::default()) }
    }

    pub fn base_asset(&self) -> &TokenId {
        self.base.token()
    }

    /// Conta do pool de `asset`.
    pub fn pool_account(asset: &TokenId) -> AccountId {
        AccountId::new(format!("pool:{asset}"))
    }

    /// Cria o pool `asset`/base com reservas zeradas.
    pub fn create_pool(&self, token: Arc<dyn TokenLedger>) -> Result<Arc<Pool>> {
        let asset = token.token().clone();
        if asset == *self.base.token() {
            crate::amm_bail!(AmmErrorCode::UnsupportedPair,
                input => &asset, output => self.base.token());
        }
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.by_asset.contains_key(&asset) {
            crate::amm_bail!(AmmErrorCode::PoolAlreadyExists, asset => &asset);
        }
        let account = Self::pool_account(&asset);
        let pool = Arc::new(Pool::new(
            account.clone(),
            token,
            self.base.clone(),
            self.clock.clone(),
            self.config,
        )?);
        entries.by_asset.insert(asset.clone(), pool.clone());
        entries.by_account.insert(account.clone(), asset.clone());
        info!(%asset, pool = %account, "pool created");
        Ok(pool)
    }

    pub fn pool_for(&self, asset: &TokenId) -> Option<Arc<Pool>> {
        let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.by_asset.get(asset).cloned()
    }

    /// Ativo negociado pelo pool que custodia em `pool_account`.
    pub fn asset_for(&self, pool_account: &AccountId) -> Option<TokenId> {
        let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.by_account.get(pool_account).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner()).by_asset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
