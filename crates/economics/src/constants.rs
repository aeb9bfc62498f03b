use crate::errors::{EconomicsError, Result};
use stakecache_chain::{ChainApi, ConstantKey};
use stakecache_types::ProtocolConstants;
use tokio::sync::OnceCell;
use tracing::info;

/// Loads the runtime constants once and serves the cached copy afterwards.
///
/// A failed load leaves the cell empty, so the next call queries again.
#[derive(Debug, Default)]
pub struct ConstantsLoader {
    cell: OnceCell<ProtocolConstants>,
}

impl ConstantsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load<C: ChainApi + ?Sized>(&self, chain: &C) -> Result<ProtocolConstants> {
        self.cell
            .get_or_try_init(|| fetch_constants(chain))
            .await
            .copied()
    }

    /// The cached constants, if a load has succeeded.
    pub fn get(&self) -> Option<ProtocolConstants> {
        self.cell.get().copied()
    }
}

async fn fetch_constants<C: ChainApi + ?Sized>(chain: &C) -> Result<ProtocolConstants> {
    let mut values = [0u64; ConstantKey::ALL.len()];
    for (slot, key) in values.iter_mut().zip(ConstantKey::ALL) {
        *slot = chain
            .constant(key)
            .await
            .map_err(|source| EconomicsError::UpstreamUnavailable { key, source })?;
    }
    let [max_nominations, max_rewarded, block_time, epoch_duration, bonding] = values;

    let constants = ProtocolConstants {
        max_nominations: narrow(ConstantKey::MaxNominations, max_nominations)?,
        max_rewarded_per_validator: narrow(
            ConstantKey::MaxNominatorRewardedPerValidator,
            max_rewarded,
        )?,
        expected_block_time: block_time,
        period_duration: epoch_duration,
        bonding_duration: narrow(ConstantKey::BondingDuration, bonding)?,
    };
    info!(?constants, "loaded protocol constants");
    Ok(constants)
}

fn narrow(key: ConstantKey, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| EconomicsError::ConstantOutOfRange { key, value })
}
