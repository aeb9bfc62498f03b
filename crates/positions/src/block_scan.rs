use stakecache_chain::{Block, EventRecord, STAKING_SECTION};
use stakecache_types::AccountId;
use std::collections::{BTreeMap, HashSet};

/// Group event records by the index of the extrinsic that emitted them.
/// Records from the initialization and finalization phases are dropped.
pub fn events_by_extrinsic(events: &[EventRecord]) -> BTreeMap<u32, Vec<&EventRecord>> {
    let mut index: BTreeMap<u32, Vec<&EventRecord>> = BTreeMap::new();
    for event in events {
        if let Some(extrinsic) = event.extrinsic_index() {
            index.entry(extrinsic).or_default().push(event);
        }
    }
    index
}

/// Distinct signers of the block's successful staking transactions, in
/// extrinsic order.
///
/// A transaction counts when it is signed, did not emit
/// `system.ExtrinsicFailed` and emitted at least one `staking` event.
pub fn staking_signers(block: &Block, events: &[EventRecord]) -> Vec<AccountId> {
    let index = events_by_extrinsic(events);
    let mut seen = HashSet::new();
    let mut signers = Vec::new();

    for (position, extrinsic) in block.extrinsics.iter().enumerate() {
        let Some(signer) = &extrinsic.signer else {
            continue;
        };
        let Some(emitted) = u32::try_from(position).ok().and_then(|i| index.get(&i)) else {
            continue;
        };
        if emitted.iter().any(|event| event.is_extrinsic_failed()) {
            continue;
        }
        if !emitted.iter().any(|event| event.section == STAKING_SECTION) {
            continue;
        }
        if seen.insert(signer.as_str()) {
            signers.push(signer.clone());
        }
    }
    signers
}
