use proptest::prelude::*;
use stakecache_chain::{Nominations, StakingLedger, UnlockChunk};
use stakecache_positions::positions_from_entries;

fn ledger_strategy() -> impl Strategy<Value = Option<StakingLedger>> {
    prop::option::of(
        (
            any::<u128>(),
            any::<u128>(),
            prop::collection::vec((any::<u128>(), 0u32..2_000), 0..4),
        )
            .prop_map(|(total, active, unlocking)| StakingLedger {
                stash: String::new(),
                total,
                active,
                unlocking: unlocking
                    .into_iter()
                    .map(|(value, era)| UnlockChunk { value, era })
                    .collect(),
            }),
    )
}

proptest! {
    #[test]
    fn bootstrapped_positions_never_exceed_total(
        ledgers in prop::collection::vec(ledger_strategy(), 0..30),
        nominating in prop::collection::vec(any::<bool>(), 0..30),
        active_era in 0u32..2_000,
    ) {
        let ledger_entries: Vec<_> = ledgers
            .iter()
            .enumerate()
            .map(|(i, ledger)| (format!("account{i}"), ledger.clone()))
            .collect();
        let nominator_entries: Vec<_> = nominating
            .iter()
            .enumerate()
            .filter(|(_, nominates)| **nominates)
            .map(|(i, _)| {
                (
                    format!("account{i}"),
                    Some(Nominations { targets: vec!["validator".into()], submitted_in: 0 }),
                )
            })
            .collect();

        let positions = positions_from_entries(ledger_entries, nominator_entries, active_era);

        let valid = ledgers
            .iter()
            .flatten()
            .filter(|ledger| ledger.active <= ledger.total)
            .count();
        prop_assert_eq!(positions.len(), valid);

        for (address, position) in &positions {
            prop_assert!(position.total_units >= position.active_units);
            let pending = position
                .unlocking_entries
                .iter()
                .any(|entry| entry.unlock_period < active_era);
            prop_assert_eq!(position.has_pending_withdrawal, pending);

            let index: usize = address.trim_start_matches("account").parse().unwrap();
            let nominates = nominating.get(index).copied().unwrap_or(false);
            prop_assert_eq!(position.nomination_targets.is_empty(), !nominates);
        }
    }
}
