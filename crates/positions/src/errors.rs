use stakecache_chain::ChainError;
use stakecache_types::StakingTypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("chain query failed: {0}")]
    Chain(#[from] ChainError),

    #[error("invalid ledger: {0}")]
    InvalidLedger(#[from] StakingTypeError),
}

pub type Result<T> = std::result::Result<T, PositionError>;
