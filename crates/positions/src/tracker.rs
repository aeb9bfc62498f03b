use crate::block_scan::staking_signers;
use crate::errors::Result;
use stakecache_chain::{ChainApi, Nominations, StakingLedger};
use stakecache_types::{AccountId, AccountPosition, EraIndex, StakingTypeError, UnlockEntry};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// New state for one account. `None` removes the account's position.
pub type PositionChange = (AccountId, Option<AccountPosition>);

/// Build the position for one bonded account.
pub fn position_from_ledger(
    address: &str,
    ledger: &StakingLedger,
    nominations: Option<&Nominations>,
    active_era: EraIndex,
) -> std::result::Result<AccountPosition, StakingTypeError> {
    let targets = nominations
        .map(|nominations| nominations.targets.clone())
        .unwrap_or_default();
    let unlocking = ledger
        .unlocking
        .iter()
        .map(|chunk| UnlockEntry {
            value_units: chunk.value,
            unlock_period: chunk.era,
        })
        .collect();
    AccountPosition::new(
        address,
        ledger.total,
        ledger.active,
        targets,
        unlocking,
        active_era,
    )
}

/// Join bulk ledger and nomination entries into positions.
///
/// Accounts without a ledger are left out, as are nominations whose account
/// has no ledger. Ledgers reporting more active than total stake are logged
/// and skipped.
pub fn positions_from_entries(
    ledgers: Vec<(AccountId, Option<StakingLedger>)>,
    nominators: Vec<(AccountId, Option<Nominations>)>,
    active_era: EraIndex,
) -> HashMap<AccountId, AccountPosition> {
    let nominations: HashMap<AccountId, Nominations> = nominators
        .into_iter()
        .filter_map(|(address, nominations)| nominations.map(|n| (address, n)))
        .filter(|(_, nominations)| !nominations.targets.is_empty())
        .collect();

    let mut positions = HashMap::with_capacity(ledgers.len());
    for (address, ledger) in ledgers {
        let Some(ledger) = ledger else {
            continue;
        };
        match position_from_ledger(&address, &ledger, nominations.get(&address), active_era) {
            Ok(position) => {
                positions.insert(address, position);
            }
            Err(err) => warn!(%err, "rejecting staking ledger"),
        }
    }
    positions
}

/// Fetches account positions from the chain.
pub struct PositionTracker<C: ?Sized> {
    chain: Arc<C>,
}

impl<C: ChainApi + ?Sized> PositionTracker<C> {
    pub fn new(chain: Arc<C>) -> Self {
        Self { chain }
    }

    /// Full rebuild from the bulk ledger and nominator entries.
    pub async fn bootstrap(
        &self,
        active_era: EraIndex,
    ) -> Result<HashMap<AccountId, AccountPosition>> {
        let (ledgers, nominators) = tokio::try_join!(
            self.chain.ledger_entries(),
            self.chain.nominators_entries()
        )?;
        let positions = positions_from_entries(ledgers, nominators, active_era);
        info!(accounts = positions.len(), active_era, "account positions bootstrapped");
        Ok(positions)
    }

    /// Re-query each address. Addresses whose lookup fails are left out of
    /// the result so their cached position stays as it was.
    pub async fn refresh(
        &self,
        addresses: &[AccountId],
        active_era: EraIndex,
    ) -> Vec<PositionChange> {
        let mut changes = Vec::with_capacity(addresses.len());
        for address in addresses {
            match self.fetch_position(address, active_era).await {
                Ok(position) => changes.push((address.clone(), position)),
                Err(err) => warn!(%address, %err, "keeping stale position"),
            }
        }
        changes
    }

    /// Signers of successful staking transactions in the block.
    pub async fn touched_addresses(&self, hash: &str) -> Result<Vec<AccountId>> {
        let (block, events) =
            tokio::try_join!(self.chain.block(hash), self.chain.events_at(hash))?;
        let signers = staking_signers(&block, &events);
        debug!(block = block.number, %hash, signers = signers.len(), "scanned block");
        Ok(signers)
    }

    /// Refresh the union of accounts touched by `hashes`. Blocks that cannot
    /// be fetched are skipped.
    pub async fn apply_blocks(
        &self,
        hashes: &[String],
        active_era: EraIndex,
    ) -> Vec<PositionChange> {
        let mut seen = HashSet::new();
        let mut addresses = Vec::new();
        for hash in hashes {
            match self.touched_addresses(hash).await {
                Ok(signers) => {
                    for signer in signers {
                        if seen.insert(signer.clone()) {
                            addresses.push(signer);
                        }
                    }
                }
                Err(err) => warn!(%hash, %err, "skipping block"),
            }
        }
        self.refresh(&addresses, active_era).await
    }

    async fn fetch_position(
        &self,
        address: &str,
        active_era: EraIndex,
    ) -> Result<Option<AccountPosition>> {
        let (ledger, nominations) = tokio::try_join!(
            self.chain.ledger(address),
            self.chain.nominators(address)
        )?;
        let Some(ledger) = ledger else {
            return Ok(None);
        };
        let nominations = nominations.filter(|n| !n.targets.is_empty());
        Ok(Some(position_from_ledger(
            address,
            &ledger,
            nominations.as_ref(),
            active_era,
        )?))
    }
}
