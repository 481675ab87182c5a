//! Per-wallet subscriptions to strategies and bundles.
//!
//! A subscription stores a hash over its mutable fields. Executors recompute it from the
//! data the bot asserts, so a bot cannot swap in its own parameters for a valid sub id.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{keccak256, Address, Bytes, FixedBytes};
use alloy_sol_types::{sol, SolType};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    errors::AutomationError,
    registry::{
        journal::{Journal, MemoryJournal},
        BundleRegistry, StrategyRegistry,
    },
};

sol! {
    struct StrategySubAbi {
        uint64 strategyOrBundleId;
        bool isBundle;
        bytes[] triggerData;
        bytes32[] subData;
    }
}

/// The mutable, user-chosen part of a subscription.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySub {
    pub strategy_or_bundle_id: u64,
    pub is_bundle: bool,
    pub trigger_data: Vec<Bytes>,
    pub sub_data: Vec<FixedBytes<32>>,
}

impl StrategySub {
    /// `keccak256(abi.encode(sub))`.
    pub fn hash(&self) -> FixedBytes<32> {
        let abi = StrategySubAbi {
            strategyOrBundleId: self.strategy_or_bundle_id,
            isBundle: self.is_bundle,
            triggerData: self.trigger_data.clone(),
            subData: self.sub_data.clone(),
        };
        keccak256(StrategySubAbi::abi_encode(&abi))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSub {
    pub id: u64,
    pub wallet: Address,
    pub sub: StrategySub,
    pub is_enabled: bool,
    pub integrity_hash: FixedBytes<32>,
}

/// Number of trigger entries and sub slots a subscription must provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemplateShape {
    pub triggers: usize,
    pub sub_slots: usize,
}

impl TemplateShape {
    /// Shape of the referenced strategy, or of the first member of the referenced bundle.
    pub fn of(
        strategies: &dyn StrategyRegistry,
        bundles: &dyn BundleRegistry,
        strategy_or_bundle_id: u64,
        is_bundle: bool,
    ) -> Result<Self, AutomationError> {
        let strategy_id = if is_bundle {
            bundles.strategy_id_in_bundle(strategy_or_bundle_id, 0)?
        } else {
            strategy_or_bundle_id
        };
        let strategy = strategies.get_strategy(strategy_id)?;
        Ok(Self {
            triggers: strategy.trigger_refs.len(),
            sub_slots: strategy.sub_slot_names.len(),
        })
    }

    fn check(&self, sub: &StrategySub) -> Result<(), AutomationError> {
        if sub.trigger_data.len() != self.triggers || sub.sub_data.len() != self.sub_slots {
            return Err(AutomationError::ReferenceError(format!(
                "subscription has {} trigger entries and {} sub vars, template needs {} and {}",
                sub.trigger_data.len(),
                sub.sub_data.len(),
                self.triggers,
                self.sub_slots
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum SubRecord {
    Subscribed(StoredSub),
    Updated { sub_id: u64, sub: StrategySub },
    Toggled { sub_id: u64, enabled: bool },
    ModuleApproved { wallet: Address, module: Address },
    ModuleRevoked { wallet: Address, module: Address },
}

pub struct SubStorage {
    subs: Vec<StoredSub>,
    modules: BTreeMap<Address, BTreeSet<Address>>,
    journal: Box<dyn Journal<SubRecord>>,
}

impl Default for SubStorage {
    fn default() -> Self {
        Self::with_journal(Box::new(MemoryJournal::default()))
    }
}

impl SubStorage {
    pub fn with_journal(journal: Box<dyn Journal<SubRecord>>) -> Self {
        Self {
            subs: Vec::new(),
            modules: BTreeMap::new(),
            journal,
        }
    }

    pub fn replay(journal: Box<dyn Journal<SubRecord>>) -> Result<Self, AutomationError> {
        let records = journal.records()?;
        let mut store = Self::with_journal(journal);
        for record in records {
            store.apply(record)?;
        }
        Ok(store)
    }

    pub fn get_sub(&self, sub_id: u64) -> Result<&StoredSub, AutomationError> {
        usize::try_from(sub_id)
            .ok()
            .and_then(|i| self.subs.get(i))
            .ok_or_else(|| AutomationError::not_found("subscription", sub_id))
    }

    pub fn sub_count(&self) -> u64 {
        self.subs.len() as u64
    }

    pub fn is_module_approved(&self, wallet: Address, module: Address) -> bool {
        self.modules
            .get(&wallet)
            .is_some_and(|set| set.contains(&module))
    }

    /// Let `module` manage the wallet's subscriptions. Only the wallet itself may approve.
    pub fn approve_module(&mut self, wallet: Address, module: Address) -> Result<(), AutomationError> {
        self.commit(SubRecord::ModuleApproved { wallet, module })
    }

    pub fn revoke_module(&mut self, wallet: Address, module: Address) -> Result<(), AutomationError> {
        self.commit(SubRecord::ModuleRevoked { wallet, module })
    }

    /// `sender` is the wallet itself or one of its approved modules.
    pub fn subscribe(
        &mut self,
        sender: Address,
        wallet: Address,
        sub: StrategySub,
        shape: TemplateShape,
    ) -> Result<u64, AutomationError> {
        self.ensure_acts_for(sender, wallet)?;
        shape.check(&sub)?;

        let id = self.sub_count();
        let integrity_hash = sub.hash();
        self.commit(SubRecord::Subscribed(StoredSub {
            id,
            wallet,
            sub,
            is_enabled: true,
            integrity_hash,
        }))?;
        info!(sub_id = id, %wallet, hash = %integrity_hash, "subscribed");
        Ok(id)
    }

    /// Replace trigger and sub data; the template reference stays fixed.
    pub fn update_sub_data(
        &mut self,
        sender: Address,
        sub_id: u64,
        trigger_data: Vec<Bytes>,
        sub_data: Vec<FixedBytes<32>>,
        shape: TemplateShape,
    ) -> Result<FixedBytes<32>, AutomationError> {
        let stored = self.owned(sender, sub_id)?;
        let sub = StrategySub {
            strategy_or_bundle_id: stored.sub.strategy_or_bundle_id,
            is_bundle: stored.sub.is_bundle,
            trigger_data,
            sub_data,
        };
        shape.check(&sub)?;
        let hash = sub.hash();
        self.commit(SubRecord::Updated { sub_id, sub })?;
        info!(sub_id, hash = %hash, "subscription updated");
        Ok(hash)
    }

    /// Idempotent: setting the current state again changes nothing.
    pub fn toggle_sub(&mut self, sender: Address, sub_id: u64, enabled: bool) -> Result<(), AutomationError> {
        let stored = self.owned(sender, sub_id)?;
        if stored.is_enabled == enabled {
            return Ok(());
        }
        self.commit(SubRecord::Toggled { sub_id, enabled })?;
        info!(sub_id, enabled, "subscription toggled");
        Ok(())
    }

    pub fn activate_sub(&mut self, sender: Address, sub_id: u64) -> Result<(), AutomationError> {
        self.toggle_sub(sender, sub_id, true)
    }

    pub fn deactivate_sub(&mut self, sender: Address, sub_id: u64) -> Result<(), AutomationError> {
        self.toggle_sub(sender, sub_id, false)
    }

    /// Disable a one-shot subscription after the executor ran it.
    pub(crate) fn finish_one_shot(&mut self, sub_id: u64) -> Result<(), AutomationError> {
        self.get_sub(sub_id)?;
        self.commit(SubRecord::Toggled {
            sub_id,
            enabled: false,
        })
    }

    fn owned(&self, sender: Address, sub_id: u64) -> Result<&StoredSub, AutomationError> {
        let stored = self.get_sub(sub_id)?;
        self.ensure_acts_for(sender, stored.wallet)?;
        Ok(stored)
    }

    fn ensure_acts_for(&self, sender: Address, wallet: Address) -> Result<(), AutomationError> {
        if sender == wallet || self.is_module_approved(wallet, sender) {
            Ok(())
        } else {
            Err(AutomationError::unauthorized(sender, "not the subscription wallet or its module"))
        }
    }

    /// Journal first, then apply, so a failed append leaves memory untouched.
    fn commit(&mut self, record: SubRecord) -> Result<(), AutomationError> {
        self.journal.append(&record)?;
        self.apply(record)
    }

    fn apply(&mut self, record: SubRecord) -> Result<(), AutomationError> {
        match record {
            SubRecord::Subscribed(stored) => {
                if stored.id != self.sub_count() {
                    return Err(AutomationError::Journal(format!(
                        "subscription {} out of order",
                        stored.id
                    )));
                }
                self.subs.push(stored);
            }
            SubRecord::Updated { sub_id, sub } => {
                let stored = self.get_sub_mut(sub_id)?;
                stored.integrity_hash = sub.hash();
                stored.sub = sub;
            }
            SubRecord::Toggled { sub_id, enabled } => {
                self.get_sub_mut(sub_id)?.is_enabled = enabled;
            }
            SubRecord::ModuleApproved { wallet, module } => {
                self.modules.entry(wallet).or_default().insert(module);
            }
            SubRecord::ModuleRevoked { wallet, module } => {
                if let Some(set) = self.modules.get_mut(&wallet) {
                    set.remove(&module);
                }
            }
        }
        Ok(())
    }

    fn get_sub_mut(&mut self, sub_id: u64) -> Result<&mut StoredSub, AutomationError> {
        usize::try_from(sub_id)
            .ok()
            .and_then(|i| self.subs.get_mut(i))
            .ok_or_else(|| AutomationError::not_found("subscription", sub_id))
    }
}
