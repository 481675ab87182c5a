//! Name → address registry with timelocked changes.
//!
//! Adapters are located by id through this registry. Replacing an address or changing the
//! wait period is a two-step process: start, then approve once the wait period has elapsed.
//! The timelocked steps take the host clock from the engine and are not public.

use std::collections::BTreeMap;

use alloy_primitives::{Address, FixedBytes};
use tracing::info;

use crate::errors::{AutomationError, RegistryError};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    pub contract_addr: Address,
    pub wait_period: u64,
    pub change_start_time: u64,
    pub in_contract_change: bool,
    pub in_wait_period_change: bool,
}

#[derive(Clone, Debug)]
pub struct ContractRegistry {
    owner: Address,
    entries: BTreeMap<FixedBytes<32>, Entry>,
    previous_addresses: BTreeMap<FixedBytes<32>, Address>,
    pending_addresses: BTreeMap<FixedBytes<32>, Address>,
    pending_wait_times: BTreeMap<FixedBytes<32>, u64>,
}

impl ContractRegistry {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            entries: BTreeMap::new(),
            previous_addresses: BTreeMap::new(),
            pending_addresses: BTreeMap::new(),
            pending_wait_times: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn get_addr(&self, id: FixedBytes<32>) -> Result<Address, AutomationError> {
        self.entries
            .get(&id)
            .map(|e| e.contract_addr)
            .ok_or_else(|| RegistryError::EntryNonExistent(id).into())
    }

    pub fn is_registered(&self, id: FixedBytes<32>) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn entry(&self, id: FixedBytes<32>) -> Option<&Entry> {
        self.entries.get(&id)
    }

    pub fn add_new_contract(
        &mut self,
        sender: Address,
        id: FixedBytes<32>,
        addr: Address,
        wait_period: u64,
    ) -> Result<(), AutomationError> {
        self.only_owner(sender)?;
        if self.entries.contains_key(&id) {
            return Err(RegistryError::EntryAlreadyExists(id).into());
        }
        self.entries.insert(
            id,
            Entry {
                contract_addr: addr,
                wait_period,
                ..Default::default()
            },
        );
        // Reverting right after adding is a no-op swap.
        self.previous_addresses.insert(id, addr);
        info!(%id, %addr, wait_period, "contract added");
        Ok(())
    }

    /// Swap the current address with the previous one.
    pub fn revert_to_previous_address(
        &mut self,
        sender: Address,
        id: FixedBytes<32>,
    ) -> Result<(), AutomationError> {
        self.only_owner(sender)?;
        let prev = self.previous_addresses.get(&id).copied().unwrap_or_default();
        let entry = self.entry_mut(id)?;
        if prev == Address::ZERO {
            return Err(RegistryError::EmptyPrevAddr(id).into());
        }
        let current = entry.contract_addr;
        entry.contract_addr = prev;
        self.previous_addresses.insert(id, current);
        info!(%id, from = %current, to = %prev, "contract reverted");
        Ok(())
    }

    pub(crate) fn start_contract_change(
        &mut self,
        sender: Address,
        id: FixedBytes<32>,
        new_addr: Address,
        now: u64,
    ) -> Result<(), AutomationError> {
        self.only_owner(sender)?;
        let entry = self.entry_mut(id)?;
        if entry.in_wait_period_change {
            return Err(RegistryError::AlreadyInWaitPeriodChange(id).into());
        }
        entry.change_start_time = now;
        entry.in_contract_change = true;
        self.pending_addresses.insert(id, new_addr);
        info!(%id, %new_addr, "contract change started");
        Ok(())
    }

    pub(crate) fn approve_contract_change(
        &mut self,
        sender: Address,
        id: FixedBytes<32>,
        now: u64,
    ) -> Result<(), AutomationError> {
        self.only_owner(sender)?;
        let pending = self.pending_addresses.get(&id).copied().unwrap_or_default();
        let entry = self.entry_mut(id)?;
        if !entry.in_contract_change {
            return Err(RegistryError::EntryNotInChange(id).into());
        }
        let ready_at = entry.change_start_time.saturating_add(entry.wait_period);
        if now < ready_at {
            return Err(RegistryError::ChangeNotReady { id, ready_at }.into());
        }
        let old = entry.contract_addr;
        entry.contract_addr = pending;
        entry.in_contract_change = false;
        entry.change_start_time = 0;
        self.previous_addresses.insert(id, old);
        self.pending_addresses.remove(&id);
        info!(%id, from = %old, to = %pending, "contract change approved");
        Ok(())
    }

    pub fn cancel_contract_change(
        &mut self,
        sender: Address,
        id: FixedBytes<32>,
    ) -> Result<(), AutomationError> {
        self.only_owner(sender)?;
        let entry = self.entry_mut(id)?;
        if !entry.in_contract_change {
            return Err(RegistryError::EntryNotInChange(id).into());
        }
        entry.in_contract_change = false;
        entry.change_start_time = 0;
        self.pending_addresses.remove(&id);
        Ok(())
    }

    pub(crate) fn start_wait_period_change(
        &mut self,
        sender: Address,
        id: FixedBytes<32>,
        new_wait_period: u64,
        now: u64,
    ) -> Result<(), AutomationError> {
        self.only_owner(sender)?;
        let entry = self.entry_mut(id)?;
        if entry.in_contract_change {
            return Err(RegistryError::AlreadyInContractChange(id).into());
        }
        entry.change_start_time = now;
        entry.in_wait_period_change = true;
        self.pending_wait_times.insert(id, new_wait_period);
        Ok(())
    }

    pub(crate) fn approve_wait_period_change(
        &mut self,
        sender: Address,
        id: FixedBytes<32>,
        now: u64,
    ) -> Result<(), AutomationError> {
        self.only_owner(sender)?;
        let pending = self.pending_wait_times.get(&id).copied().unwrap_or_default();
        let entry = self.entry_mut(id)?;
        if !entry.in_wait_period_change {
            return Err(RegistryError::EntryNotInChange(id).into());
        }
        let ready_at = entry.change_start_time.saturating_add(entry.wait_period);
        if now < ready_at {
            return Err(RegistryError::ChangeNotReady { id, ready_at }.into());
        }
        entry.wait_period = pending;
        entry.in_wait_period_change = false;
        entry.change_start_time = 0;
        self.pending_wait_times.remove(&id);
        info!(%id, wait_period = pending, "wait period change approved");
        Ok(())
    }

    pub fn cancel_wait_period_change(
        &mut self,
        sender: Address,
        id: FixedBytes<32>,
    ) -> Result<(), AutomationError> {
        self.only_owner(sender)?;
        let entry = self.entry_mut(id)?;
        if !entry.in_wait_period_change {
            return Err(RegistryError::EntryNotInChange(id).into());
        }
        entry.in_wait_period_change = false;
        entry.change_start_time = 0;
        self.pending_wait_times.remove(&id);
        Ok(())
    }

    fn only_owner(&self, sender: Address) -> Result<(), AutomationError> {
        if sender != self.owner {
            return Err(AutomationError::unauthorized(sender, "registry owner only"));
        }
        Ok(())
    }

    fn entry_mut(&mut self, id: FixedBytes<32>) -> Result<&mut Entry, AutomationError> {
        self.entries
            .get_mut(&id)
            .ok_or_else(|| RegistryError::EntryNonExistent(id).into())
    }
}
