//! Append-only bundles: ordered alternative strategies for one intent.

use alloy_primitives::{Address, FixedBytes};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    errors::AutomationError,
    registry::{
        journal::{Journal, MemoryJournal},
        strategies::{paginate, StrategyRegistry},
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: u64,
    pub creator: Address,
    pub strategy_ids: Vec<u64>,
}

pub trait BundleRegistry {
    fn create_bundle(
        &mut self,
        sender: Address,
        strategy_ids: Vec<u64>,
        strategies: &dyn StrategyRegistry,
    ) -> Result<u64, AutomationError>;

    fn get_bundle(&self, id: u64) -> Result<&Bundle, AutomationError>;

    fn bundle_count(&self) -> u64;

    fn paginated_bundles(&self, page: usize, per_page: usize) -> &[Bundle];

    fn strategy_id_in_bundle(&self, bundle_id: u64, index: usize) -> Result<u64, AutomationError> {
        let bundle = self.get_bundle(bundle_id)?;
        bundle
            .strategy_ids
            .get(index)
            .copied()
            .ok_or(AutomationError::not_found("strategy in bundle", index as u64))
    }
}

pub struct BundleStorage {
    owner: Address,
    open_to_public: bool,
    bundles: Vec<Bundle>,
    journal: Box<dyn Journal<Bundle>>,
}

impl BundleStorage {
    pub fn new(owner: Address, open_to_public: bool) -> Self {
        Self::with_journal(owner, open_to_public, Box::new(MemoryJournal::default()))
    }

    pub fn with_journal(
        owner: Address,
        open_to_public: bool,
        journal: Box<dyn Journal<Bundle>>,
    ) -> Self {
        Self {
            owner,
            open_to_public,
            bundles: Vec::new(),
            journal,
        }
    }

    pub fn replay(
        owner: Address,
        open_to_public: bool,
        journal: Box<dyn Journal<Bundle>>,
    ) -> Result<Self, AutomationError> {
        let bundles = journal.records()?;
        if let Some(i) = bundles.iter().enumerate().position(|(i, b)| b.id != i as u64) {
            return Err(AutomationError::Journal(format!(
                "bundle journal out of order at record {i}"
            )));
        }
        Ok(Self {
            owner,
            open_to_public,
            bundles,
            journal,
        })
    }

    pub fn change_edit_permission(
        &mut self,
        sender: Address,
        open_to_public: bool,
    ) -> Result<(), AutomationError> {
        if sender != self.owner {
            return Err(AutomationError::unauthorized(sender, "bundle storage owner only"));
        }
        self.open_to_public = open_to_public;
        Ok(())
    }
}

impl BundleRegistry for BundleStorage {
    fn create_bundle(
        &mut self,
        sender: Address,
        strategy_ids: Vec<u64>,
        strategies: &dyn StrategyRegistry,
    ) -> Result<u64, AutomationError> {
        if !self.open_to_public && sender != self.owner {
            return Err(AutomationError::unauthorized(sender, "bundle creation is not open"));
        }
        validate_shape(&strategy_ids, strategies)?;

        let bundle = Bundle {
            id: self.bundles.len() as u64,
            creator: sender,
            strategy_ids,
        };
        self.journal.append(&bundle)?;
        info!(id = bundle.id, strategies = ?bundle.strategy_ids, "bundle created");
        let id = bundle.id;
        self.bundles.push(bundle);
        Ok(id)
    }

    fn get_bundle(&self, id: u64) -> Result<&Bundle, AutomationError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.bundles.get(i))
            .ok_or_else(|| AutomationError::not_found("bundle", id))
    }

    fn bundle_count(&self) -> u64 {
        self.bundles.len() as u64
    }

    fn paginated_bundles(&self, page: usize, per_page: usize) -> &[Bundle] {
        paginate(&self.bundles, page, per_page)
    }
}

/// Members must exist and share trigger ids and sub slot count, so one subscription fits all.
fn validate_shape(
    strategy_ids: &[u64],
    strategies: &dyn StrategyRegistry,
) -> Result<(), AutomationError> {
    let Some((&first_id, rest)) = strategy_ids.split_first() else {
        return Err(AutomationError::ReferenceError("empty bundle".to_string()));
    };
    let lookup = move |id: u64| {
        strategies.get_strategy(id).map_err(|_| {
            AutomationError::ReferenceError(format!("bundle references unknown strategy {id}"))
        })
    };
    let first = lookup(first_id)?;
    let trigger_ids: Vec<FixedBytes<32>> =
        first.trigger_refs.iter().map(|t| t.trigger_id).collect();

    for &id in rest {
        let strategy = lookup(id)?;
        let same_triggers = strategy
            .trigger_refs
            .iter()
            .map(|t| t.trigger_id)
            .eq(trigger_ids.iter().copied());
        if !same_triggers || strategy.sub_slot_names.len() != first.sub_slot_names.len() {
            return Err(AutomationError::ReferenceError(format!(
                "different triggers in bundle: strategy {id} does not match {first_id}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::strategies::{NewStrategy, StrategyStorage};
    use alloy_primitives::address;
    use automation_types::{id_of, ActionCall, TriggerRef};

    const OWNER: Address = address!("00000000000000000000000000000000000000ad");

    fn strategy(trigger: &str, slots: usize) -> NewStrategy {
        NewStrategy {
            name: trigger.into(),
            trigger_refs: vec![TriggerRef::new(id_of(trigger))],
            actions: vec![ActionCall::new(id_of("SumInputs"), vec![])],
            sub_slot_names: (0..slots).map(|i| format!("&slot{i}")).collect(),
            continuous: false,
        }
    }

    #[test]
    fn bundle_requires_homogeneous_members() {
        let mut strategies = StrategyStorage::new(OWNER, true);
        let a = strategies.create_strategy(OWNER, strategy("RatioTrigger", 2)).unwrap();
        let b = strategies.create_strategy(OWNER, strategy("RatioTrigger", 2)).unwrap();
        let c = strategies.create_strategy(OWNER, strategy("PriceTrigger", 2)).unwrap();
        let d = strategies.create_strategy(OWNER, strategy("RatioTrigger", 3)).unwrap();

        let mut bundles = BundleStorage::new(OWNER, true);
        let id = bundles.create_bundle(OWNER, vec![a, b], &strategies).unwrap();
        assert_eq!(bundles.strategy_id_in_bundle(id, 1).unwrap(), b);
        assert!(matches!(
            bundles.strategy_id_in_bundle(id, 2),
            Err(AutomationError::NotFound { .. })
        ));

        for bad in [vec![a, c], vec![a, d], vec![a, 99], vec![]] {
            assert!(matches!(
                bundles.create_bundle(OWNER, bad, &strategies),
                Err(AutomationError::ReferenceError(_))
            ));
        }
        assert_eq!(bundles.bundle_count(), 1);
    }
}
