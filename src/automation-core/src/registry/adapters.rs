//! Deployed adapter implementations and the id → address → implementation lookup.

use std::{collections::BTreeMap, sync::Arc};

use alloy_primitives::{Address, FixedBytes};

use crate::{
    errors::AutomationError,
    recipe::{Action, ActionImpl, FlashLoanProvider},
    registry::contracts::ContractRegistry,
    triggers::Trigger,
};

/// Resolves component ids to executable adapters.
pub trait AdapterLookup {
    fn action(&self, id: FixedBytes<32>) -> Result<ActionImpl, AutomationError>;

    fn trigger(&self, id: FixedBytes<32>) -> Result<Arc<dyn Trigger>, AutomationError>;
}

#[derive(Clone)]
pub enum Adapter {
    Action(ActionImpl),
    Trigger(Arc<dyn Trigger>),
}

/// Implementations keyed by the address they are "deployed" at.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    deployed: BTreeMap<Address, Adapter>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deploy_action(&mut self, addr: Address, action: impl Action + 'static) {
        self.deployed
            .insert(addr, Adapter::Action(ActionImpl::Standard(Arc::new(action))));
    }

    pub fn deploy_flash_loan(&mut self, addr: Address, provider: impl FlashLoanProvider + 'static) {
        self.deployed
            .insert(addr, Adapter::Action(ActionImpl::FlashLoan(Arc::new(provider))));
    }

    pub fn deploy_trigger(&mut self, addr: Address, trigger: impl Trigger + 'static) {
        self.deployed.insert(addr, Adapter::Trigger(Arc::new(trigger)));
    }

    pub fn at(&self, addr: Address) -> Option<&Adapter> {
        self.deployed.get(&addr)
    }
}

/// Lookup through the timelocked contract registry.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    contracts: &'a ContractRegistry,
    adapters: &'a AdapterRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(contracts: &'a ContractRegistry, adapters: &'a AdapterRegistry) -> Self {
        Self {
            contracts,
            adapters,
        }
    }

    fn resolve(&self, id: FixedBytes<32>) -> Result<&'a Adapter, AutomationError> {
        let addr = self.contracts.get_addr(id)?;
        self.adapters.at(addr).ok_or_else(|| {
            AutomationError::ReferenceError(format!("no adapter deployed at {addr} for {id}"))
        })
    }
}

impl AdapterLookup for Resolver<'_> {
    fn action(&self, id: FixedBytes<32>) -> Result<ActionImpl, AutomationError> {
        match self.resolve(id)? {
            Adapter::Action(action) => Ok(action.clone()),
            Adapter::Trigger(_) => Err(AutomationError::ReferenceError(format!(
                "{id} resolves to a trigger, not an action"
            ))),
        }
    }

    fn trigger(&self, id: FixedBytes<32>) -> Result<Arc<dyn Trigger>, AutomationError> {
        match self.resolve(id)? {
            Adapter::Trigger(trigger) => Ok(Arc::clone(trigger)),
            Adapter::Action(_) => Err(AutomationError::ReferenceError(format!(
                "{id} resolves to an action, not a trigger"
            ))),
        }
    }
}
