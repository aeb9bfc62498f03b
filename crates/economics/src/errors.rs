use stakecache_chain::{ChainError, ConstantKey};
use stakecache_types::EraIndex;
use thiserror::Error;

/// Errors raised while loading constants or recomputing the economics summary.
#[derive(Debug, Error)]
pub enum EconomicsError {
    #[error("protocol constant {key:?} unavailable: {source}")]
    UpstreamUnavailable {
        key: ConstantKey,
        #[source]
        source: ChainError,
    },

    #[error("protocol constant {key:?} value {value} is out of range")]
    ConstantOutOfRange { key: ConstantKey, value: u64 },

    #[error("chain query failed: {0}")]
    Chain(#[from] ChainError),

    #[error("token decimals {0} exceed supported precision")]
    UnsupportedDecimals(u32),

    #[error("era {era}: no era has both a total stake and a paid reward")]
    NoKnownPeriods { era: EraIndex },

    #[error("compounded yield is not finite")]
    NonFiniteYield,
}

pub type Result<T> = std::result::Result<T, EconomicsError>;
