//! Append-only strategy templates.

use alloy_primitives::Address;
use crate::types::{ActionCall, ParamSource, TriggerRef};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    errors::AutomationError,
    recipe::types::validate_return_refs,
    registry::journal::{Journal, MemoryJournal},
};

/// An immutable template of triggers and actions with named subscription slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: u64,
    pub name: String,
    pub creator: Address,
    pub trigger_refs: Vec<TriggerRef>,
    pub actions: Vec<ActionCall>,
    pub sub_slot_names: Vec<String>,
    /// A continuous strategy keeps its subscription enabled after executing.
    pub continuous: bool,
}

/// Input of `create_strategy`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewStrategy {
    pub name: String,
    pub trigger_refs: Vec<TriggerRef>,
    pub actions: Vec<ActionCall>,
    pub sub_slot_names: Vec<String>,
    pub continuous: bool,
}

pub trait StrategyRegistry {
    fn create_strategy(&mut self, sender: Address, new: NewStrategy) -> Result<u64, AutomationError>;

    fn get_strategy(&self, id: u64) -> Result<&Strategy, AutomationError>;

    fn strategy_count(&self) -> u64;

    fn paginated_strategies(&self, page: usize, per_page: usize) -> &[Strategy];
}

pub struct StrategyStorage {
    owner: Address,
    open_to_public: bool,
    strategies: Vec<Strategy>,
    journal: Box<dyn Journal<Strategy>>,
}

impl StrategyStorage {
    pub fn new(owner: Address, open_to_public: bool) -> Self {
        Self::with_journal(owner, open_to_public, Box::new(MemoryJournal::default()))
    }

    pub fn with_journal(
        owner: Address,
        open_to_public: bool,
        journal: Box<dyn Journal<Strategy>>,
    ) -> Self {
        Self {
            owner,
            open_to_public,
            strategies: Vec::new(),
            journal,
        }
    }

    /// Rebuild from a journal that already holds records.
    pub fn replay(
        owner: Address,
        open_to_public: bool,
        journal: Box<dyn Journal<Strategy>>,
    ) -> Result<Self, AutomationError> {
        let records = journal.records()?;
        for (i, strategy) in records.iter().enumerate() {
            if strategy.id != i as u64 {
                return Err(AutomationError::Journal(format!(
                    "strategy journal out of order at record {i}"
                )));
            }
        }
        Ok(Self {
            owner,
            open_to_public,
            strategies: records,
            journal,
        })
    }

    pub fn open_to_public(&self) -> bool {
        self.open_to_public
    }

    pub fn change_edit_permission(
        &mut self,
        sender: Address,
        open_to_public: bool,
    ) -> Result<(), AutomationError> {
        if sender != self.owner {
            return Err(AutomationError::unauthorized(sender, "strategy storage owner only"));
        }
        self.open_to_public = open_to_public;
        Ok(())
    }

    fn ensure_can_create(&self, sender: Address) -> Result<(), AutomationError> {
        if self.open_to_public || sender == self.owner {
            Ok(())
        } else {
            Err(AutomationError::unauthorized(sender, "strategy creation is not open"))
        }
    }
}

impl StrategyRegistry for StrategyStorage {
    fn create_strategy(&mut self, sender: Address, new: NewStrategy) -> Result<u64, AutomationError> {
        self.ensure_can_create(sender)?;
        validate_template(&new)?;

        let strategy = Strategy {
            id: self.strategies.len() as u64,
            name: new.name,
            creator: sender,
            trigger_refs: new.trigger_refs,
            actions: new.actions,
            sub_slot_names: new.sub_slot_names,
            continuous: new.continuous,
        };
        self.journal.append(&strategy)?;
        info!(id = strategy.id, name = %strategy.name, creator = %sender, "strategy created");
        let id = strategy.id;
        self.strategies.push(strategy);
        Ok(id)
    }

    fn get_strategy(&self, id: u64) -> Result<&Strategy, AutomationError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.strategies.get(i))
            .ok_or_else(|| AutomationError::not_found("strategy", id))
    }

    fn strategy_count(&self) -> u64 {
        self.strategies.len() as u64
    }

    fn paginated_strategies(&self, page: usize, per_page: usize) -> &[Strategy] {
        paginate(&self.strategies, page, per_page)
    }
}

pub(crate) fn paginate<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    let start = page.saturating_mul(per_page).min(items.len());
    let end = start.saturating_add(per_page).min(items.len());
    &items[start..end]
}

/// Template wiring checks: no forward return references and every sub slot declared.
fn validate_template(new: &NewStrategy) -> Result<(), AutomationError> {
    if new.actions.is_empty() {
        return Err(AutomationError::ReferenceError(
            "strategy has no actions".to_string(),
        ));
    }
    validate_return_refs(&new.actions)?;
    for (i, call) in new.actions.iter().enumerate() {
        for param in &call.params {
            if let ParamSource::FromSub(k) = param {
                if *k >= new.sub_slot_names.len() {
                    return Err(AutomationError::ReferenceError(format!(
                        "action {i} uses sub slot {k}, only {} declared",
                        new.sub_slot_names.len()
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use automation_types::id_of;

    const OWNER: Address = address!("00000000000000000000000000000000000000ad");
    const OTHER: Address = address!("00000000000000000000000000000000000000b1");

    fn template(params: Vec<ParamSource>) -> NewStrategy {
        NewStrategy {
            name: "Repay".into(),
            trigger_refs: vec![TriggerRef::new(id_of("StorageWordTrigger"))],
            actions: vec![ActionCall::new(id_of("SumInputs"), params)],
            sub_slot_names: vec!["&amount".into()],
            continuous: true,
        }
    }

    #[test]
    fn create_then_read_returns_identical_template() {
        let mut store = StrategyStorage::new(OWNER, false);
        let new = template(vec![ParamSource::FromSub(0), ParamSource::Injected]);
        let id = store.create_strategy(OWNER, new.clone()).unwrap();
        let stored = store.get_strategy(id).unwrap();
        assert_eq!(stored.trigger_refs, new.trigger_refs);
        assert_eq!(stored.actions, new.actions);
        assert_eq!(stored.creator, OWNER);
        assert_eq!(store.strategy_count(), 1);
    }

    #[test]
    fn creation_permission_follows_edit_flag() {
        let mut store = StrategyStorage::new(OWNER, false);
        let new = template(vec![ParamSource::Wallet]);
        assert!(matches!(
            store.create_strategy(OTHER, new.clone()),
            Err(AutomationError::Unauthorized { .. })
        ));
        assert!(store.change_edit_permission(OTHER, true).is_err());
        store.change_edit_permission(OWNER, true).unwrap();
        assert_eq!(store.create_strategy(OTHER, new).unwrap(), 0);
    }

    #[test]
    fn rejects_undeclared_sub_slot() {
        let mut store = StrategyStorage::new(OWNER, true);
        let err = store
            .create_strategy(OWNER, template(vec![ParamSource::FromSub(1)]))
            .unwrap_err();
        assert!(matches!(err, AutomationError::ReferenceError(_)));
        assert_eq!(store.strategy_count(), 0);
    }

    #[test]
    fn pagination_clamps_to_range() {
        let mut store = StrategyStorage::new(OWNER, true);
        for _ in 0..5 {
            store.create_strategy(OWNER, template(vec![])).unwrap();
        }
        assert_eq!(store.paginated_strategies(0, 2).len(), 2);
        assert_eq!(store.paginated_strategies(2, 2).len(), 1);
        assert!(store.paginated_strategies(9, 2).is_empty());
        assert_eq!(store.get_strategy(9).unwrap_err(), AutomationError::not_found("strategy", 9));
    }

    #[test]
    fn replay_rebuilds_store() {
        let mut store = StrategyStorage::new(OWNER, true);
        store.create_strategy(OWNER, template(vec![])).unwrap();
        let records = store.journal.records().unwrap();

        let mut journal = MemoryJournal::default();
        for r in &records {
            journal.append(r).unwrap();
        }
        let rebuilt = StrategyStorage::replay(OWNER, true, Box::new(journal)).unwrap();
        assert_eq!(rebuilt.get_strategy(0).unwrap(), store.get_strategy(0).unwrap());
    }
}
