//! The engine façade: owns every store and exposes the user, admin and bot entry points.

use alloy_primitives::{Address, Bytes, FixedBytes};
use tracing::{info, warn};

use crate::{
    config::EngineConfig,
    errors::AutomationError,
    host::{gas::TX_BASE_GAS, Host, HostEvent, HostState},
    recipe::{Action, ExecutionContext, FlashLoanProvider, Recipe, RecipeExecutor},
    registry::{
        AdapterRegistry, BotAuth, BundleRegistry, BundleStorage, ContractRegistry, NewStrategy,
        Resolver, StrategyRegistry, StrategyStorage,
    },
    subscriptions::{StoredSub, StrategySub, SubStorage, TemplateShape},
    triggers::Trigger,
    types::id_of,
};

pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) host: Host,
    pub(crate) contracts: ContractRegistry,
    pub(crate) adapters: AdapterRegistry,
    pub(crate) strategies: StrategyStorage,
    pub(crate) bundles: BundleStorage,
    pub(crate) subs: SubStorage,
    pub(crate) strategy_bots: BotAuth,
    pub(crate) relay_bots: BotAuth,
    pub(crate) saver_bots: BotAuth,
}

impl Engine {
    /// Engine with in-memory journals.
    pub fn new(config: EngineConfig, state: HostState) -> Self {
        let strategies = StrategyStorage::new(config.admin, config.strategies_open_to_public);
        let bundles = BundleStorage::new(config.admin, config.strategies_open_to_public);
        Self::with_stores(config, state, strategies, bundles, SubStorage::default())
    }

    /// Engine over pre-built (for example replayed) stores.
    pub fn with_stores(
        config: EngineConfig,
        mut state: HostState,
        strategies: StrategyStorage,
        bundles: BundleStorage,
        subs: SubStorage,
    ) -> Self {
        state.chain_id = config.chain_id;
        let admin = config.admin;
        Self {
            host: Host::new(state),
            contracts: ContractRegistry::new(admin),
            adapters: AdapterRegistry::new(),
            strategies,
            bundles,
            subs,
            strategy_bots: BotAuth::new(admin),
            relay_bots: BotAuth::new(admin),
            saver_bots: BotAuth::new(admin),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut Host {
        &mut self.host
    }

    pub fn contracts(&self) -> &ContractRegistry {
        &self.contracts
    }

    fn now(&self) -> u64 {
        self.host.state().block_timestamp
    }

    pub fn add_new_contract(
        &mut self,
        sender: Address,
        id: FixedBytes<32>,
        addr: Address,
        wait_period: u64,
    ) -> Result<(), AutomationError> {
        self.contracts.add_new_contract(sender, id, addr, wait_period)
    }

    /// Start replacing the address under `id`. Approval opens once the entry's wait period
    /// has passed on the host clock.
    pub fn start_contract_change(
        &mut self,
        sender: Address,
        id: FixedBytes<32>,
        new_addr: Address,
    ) -> Result<(), AutomationError> {
        let now = self.now();
        self.contracts.start_contract_change(sender, id, new_addr, now)
    }

    pub fn approve_contract_change(&mut self, sender: Address, id: FixedBytes<32>) -> Result<(), AutomationError> {
        let now = self.now();
        self.contracts.approve_contract_change(sender, id, now)
    }

    pub fn cancel_contract_change(&mut self, sender: Address, id: FixedBytes<32>) -> Result<(), AutomationError> {
        self.contracts.cancel_contract_change(sender, id)
    }

    pub fn start_wait_period_change(
        &mut self,
        sender: Address,
        id: FixedBytes<32>,
        new_wait_period: u64,
    ) -> Result<(), AutomationError> {
        let now = self.now();
        self.contracts
            .start_wait_period_change(sender, id, new_wait_period, now)
    }

    pub fn approve_wait_period_change(&mut self, sender: Address, id: FixedBytes<32>) -> Result<(), AutomationError> {
        let now = self.now();
        self.contracts.approve_wait_period_change(sender, id, now)
    }

    pub fn cancel_wait_period_change(&mut self, sender: Address, id: FixedBytes<32>) -> Result<(), AutomationError> {
        self.contracts.cancel_wait_period_change(sender, id)
    }

    pub fn revert_to_previous_address(&mut self, sender: Address, id: FixedBytes<32>) -> Result<(), AutomationError> {
        self.contracts.revert_to_previous_address(sender, id)
    }

    pub fn adapters_mut(&mut self) -> &mut AdapterRegistry {
        &mut self.adapters
    }

    pub fn strategies(&self) -> &StrategyStorage {
        &self.strategies
    }

    pub fn strategies_mut(&mut self) -> &mut StrategyStorage {
        &mut self.strategies
    }

    pub fn bundles(&self) -> &BundleStorage {
        &self.bundles
    }

    pub fn bundles_mut(&mut self) -> &mut BundleStorage {
        &mut self.bundles
    }

    pub fn subs(&self) -> &SubStorage {
        &self.subs
    }

    pub fn strategy_bots_mut(&mut self) -> &mut BotAuth {
        &mut self.strategy_bots
    }

    pub fn relay_bots_mut(&mut self) -> &mut BotAuth {
        &mut self.relay_bots
    }

    pub fn saver_bots_mut(&mut self) -> &mut BotAuth {
        &mut self.saver_bots
    }

    /// Register `name` in the contract registry and deploy `action` at `addr`.
    pub fn add_action(
        &mut self,
        sender: Address,
        name: &str,
        addr: Address,
        action: impl Action + 'static,
    ) -> Result<FixedBytes<32>, AutomationError> {
        let id = id_of(name);
        self.contracts.add_new_contract(sender, id, addr, 0)?;
        self.adapters.deploy_action(addr, action);
        Ok(id)
    }

    pub fn add_flash_loan(
        &mut self,
        sender: Address,
        name: &str,
        addr: Address,
        provider: impl FlashLoanProvider + 'static,
    ) -> Result<FixedBytes<32>, AutomationError> {
        let id = id_of(name);
        self.contracts.add_new_contract(sender, id, addr, 0)?;
        self.adapters.deploy_flash_loan(addr, provider);
        Ok(id)
    }

    pub fn add_trigger(
        &mut self,
        sender: Address,
        name: &str,
        addr: Address,
        trigger: impl Trigger + 'static,
    ) -> Result<FixedBytes<32>, AutomationError> {
        let id = id_of(name);
        self.contracts.add_new_contract(sender, id, addr, 0)?;
        self.adapters.deploy_trigger(addr, trigger);
        Ok(id)
    }

    pub fn create_strategy(&mut self, sender: Address, new: NewStrategy) -> Result<u64, AutomationError> {
        self.strategies.create_strategy(sender, new)
    }

    pub fn create_bundle(&mut self, sender: Address, strategy_ids: Vec<u64>) -> Result<u64, AutomationError> {
        self.bundles
            .create_bundle(sender, strategy_ids, &self.strategies)
    }

    fn shape(&self, strategy_or_bundle_id: u64, is_bundle: bool) -> Result<TemplateShape, AutomationError> {
        TemplateShape::of(&self.strategies, &self.bundles, strategy_or_bundle_id, is_bundle)
    }

    /// Subscribe `wallet` (a registered smart wallet) to a strategy or bundle.
    pub fn subscribe(
        &mut self,
        sender: Address,
        wallet: Address,
        sub: StrategySub,
    ) -> Result<u64, AutomationError> {
        self.host.state().wallet(wallet)?;
        let shape = self.shape(sub.strategy_or_bundle_id, sub.is_bundle)?;
        self.subs.subscribe(sender, wallet, sub, shape)
    }

    pub fn update_sub_data(
        &mut self,
        sender: Address,
        sub_id: u64,
        trigger_data: Vec<Bytes>,
        sub_data: Vec<FixedBytes<32>>,
    ) -> Result<FixedBytes<32>, AutomationError> {
        let stored = self.subs.get_sub(sub_id)?;
        let shape = self.shape(stored.sub.strategy_or_bundle_id, stored.sub.is_bundle)?;
        self.subs
            .update_sub_data(sender, sub_id, trigger_data, sub_data, shape)
    }

    pub fn toggle_sub(&mut self, sender: Address, sub_id: u64, enabled: bool) -> Result<(), AutomationError> {
        self.subs.toggle_sub(sender, sub_id, enabled)
    }

    pub fn activate_sub(&mut self, sender: Address, sub_id: u64) -> Result<(), AutomationError> {
        self.subs.activate_sub(sender, sub_id)
    }

    pub fn deactivate_sub(&mut self, sender: Address, sub_id: u64) -> Result<(), AutomationError> {
        self.subs.deactivate_sub(sender, sub_id)
    }

    pub fn get_sub(&self, sub_id: u64) -> Result<&StoredSub, AutomationError> {
        self.subs.get_sub(sub_id)
    }

    /// Called by the wallet itself.
    pub fn approve_module(&mut self, wallet: Address, module: Address) -> Result<(), AutomationError> {
        self.subs.approve_module(wallet, module)
    }

    pub fn revoke_module(&mut self, wallet: Address, module: Address) -> Result<(), AutomationError> {
        self.subs.revoke_module(wallet, module)
    }

    /// Owner-initiated execution of a recipe in the wallet's context.
    pub fn execute_recipe(
        &mut self,
        sender: Address,
        wallet: Address,
        recipe: &Recipe,
    ) -> Result<Vec<FixedBytes<32>>, AutomationError> {
        let res = self.try_execute_recipe(sender, wallet, recipe);
        if let Err(err) = &res {
            warn!(%wallet, recipe = recipe.name(), %err, "recipe execution rejected");
        }
        res
    }

    fn try_execute_recipe(
        &mut self,
        sender: Address,
        wallet: Address,
        recipe: &Recipe,
    ) -> Result<Vec<FixedBytes<32>>, AutomationError> {
        let owner = self.host.state().wallet(wallet)?.owner;
        if sender != owner {
            return Err(AutomationError::unauthorized(sender, "not the wallet owner"));
        }

        let resolver = Resolver::new(&self.contracts, &self.adapters);
        let executor = RecipeExecutor::new(&resolver, self.config.max_actions_per_recipe);
        let (return_values, gas_used) = self.host.transact(
            self.config.tx_gas_limit,
            |tx| -> Result<_, AutomationError> {
                tx.gas.charge(TX_BASE_GAS)?;
                let mut ctx = ExecutionContext::new(wallet, owner, tx.state, &mut tx.gas);
                let return_values = executor.execute(&mut ctx, recipe)?;
                tx.state.emit(HostEvent::RecipeExecuted {
                    wallet,
                    name: recipe.name().to_string(),
                    actions: recipe.len(),
                });
                Ok((return_values, tx.gas.used()))
            },
        )?;
        info!(%wallet, recipe = recipe.name(), gas_used, "recipe executed");
        Ok(return_values)
    }
}
