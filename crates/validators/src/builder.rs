use crate::errors::Result;
use crate::ranking::rank_top;
use num_bigint::BigUint;
use stakecache_chain::{ChainApi, Exposure, IdentityRegistration, SuperIdentity, ValidatorPrefs};
use stakecache_types::{AccountId, EraIndex, ProtocolConstants, ValidatorRecord, ValidatorRegistry};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

/// Identity registrations with more populated fields than this count as
/// verified.
pub const MIN_VERIFIED_IDENTITY_SIZE: u32 = 2;

/// Raw per-era datasets, in the node's enumeration order.
#[derive(Debug, Clone, Default)]
pub struct RegistryInputs {
    pub prefs: Vec<(AccountId, ValidatorPrefs)>,
    pub slashes: Vec<(AccountId, Option<u32>)>,
    pub exposures: Vec<(AccountId, Exposure)>,
    pub super_of: Vec<(AccountId, SuperIdentity)>,
    pub identities: Vec<(AccountId, IdentityRegistration)>,
}

/// Parts-per-billion commission as a fraction of rewards.
pub fn commission_fraction(raw: u32) -> f64 {
    f64::from(raw) / 1e7 / 100.0
}

#[derive(Debug, Clone, Copy)]
pub struct RegistryBuilder {
    constants: ProtocolConstants,
}

impl RegistryBuilder {
    pub fn new(constants: ProtocolConstants) -> Self {
        Self { constants }
    }

    /// Fetch the datasets for `era` (the chain's current era when `None`)
    /// and build the registry.
    pub async fn build<C: ChainApi + ?Sized>(
        &self,
        chain: &C,
        era: Option<EraIndex>,
    ) -> Result<ValidatorRegistry> {
        let era = match era {
            Some(era) => era,
            None => chain.current_era().await?,
        };

        let (prefs, slashes, exposures, super_of, identities) = tokio::try_join!(
            chain.validators_entries(),
            chain.validator_slash_in_era_entries(era),
            chain.eras_stakers_entries(era),
            chain.super_of_entries(),
            chain.identity_of_entries(),
        )?;

        let registry = self.fuse(
            era,
            RegistryInputs {
                prefs,
                slashes,
                exposures,
                super_of,
                identities,
            },
        );
        info!(
            era,
            validators = registry.records.len(),
            top = registry.top.len(),
            "validator registry rebuilt"
        );
        Ok(registry)
    }

    /// Join the datasets on validator id and rank the result.
    pub fn fuse(&self, era: EraIndex, inputs: RegistryInputs) -> ValidatorRegistry {
        let prefs: HashMap<_, _> = inputs.prefs.into_iter().collect();
        let slashed: HashSet<_> = inputs
            .slashes
            .into_iter()
            .filter_map(|(address, slash)| slash.map(|_| address))
            .collect();
        let owners: HashMap<_, _> = inputs
            .super_of
            .into_iter()
            .map(|(address, link)| (address, link.owner))
            .collect();
        let identity_sizes: HashMap<_, _> = inputs
            .identities
            .into_iter()
            .map(|(owner, registration)| (owner, registration.size))
            .collect();

        let mut ordered = Vec::with_capacity(inputs.exposures.len());
        for (address, exposure) in inputs.exposures {
            let Some(pref) = prefs.get(&address) else {
                debug!(%address, era, "validator has exposure but no preferences, dropping");
                continue;
            };
            let owner = owners.get(&address).unwrap_or(&address);
            let has_verified_identity = identity_sizes
                .get(owner)
                .is_some_and(|size| *size > MIN_VERIFIED_IDENTITY_SIZE);

            let record = ValidatorRecord {
                own_stake_units: BigUint::from(exposure.own),
                total_stake_units: BigUint::from(exposure.total),
                commission_fraction: commission_fraction(pref.commission),
                is_blocking_nominations: pref.blocked,
                is_slashed_this_period: slashed.contains(&address),
                is_over_subscribed: exposure.others.len()
                    > self.constants.max_rewarded_per_validator as usize,
                has_verified_identity,
            };
            ordered.push((address, record));
        }

        let top = rank_top(
            ordered.iter().map(|(address, record)| (address, record)),
            self.constants.max_nominations as usize,
        );
        ValidatorRegistry {
            era,
            records: ordered.into_iter().collect::<BTreeMap<_, _>>(),
            top,
        }
    }
}
