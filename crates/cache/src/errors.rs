use stakecache_chain::ChainError;
use stakecache_economics::EconomicsError;
use stakecache_positions::PositionError;
use stakecache_validators::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("economics: {0}")]
    Economics(#[from] EconomicsError),

    #[error("validator registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("account positions: {0}")]
    Positions(#[from] PositionError),

    #[error("chain: {0}")]
    Chain(#[from] ChainError),
}

pub type Result<T> = std::result::Result<T, CacheError>;
