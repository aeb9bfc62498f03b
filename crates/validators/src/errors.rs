use stakecache_chain::ChainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("chain query failed: {0}")]
    Chain(#[from] ChainError),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
