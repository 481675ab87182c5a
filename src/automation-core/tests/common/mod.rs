//! Shared world for the integration tests: an engine with the built-in and mock adapters
//! deployed, a funded smart wallet with an open lending position, and signing helpers.
#![allow(dead_code)]

use alloy_primitives::{address, Address, FixedBytes, U256};
use automation_core::{
    actions::{PullToken, SendToken, SumInputs},
    config::{EngineConfig, DAI_ADDR},
    host::HostState,
    logging::setup_logging,
    mock::{LendingOp, MockFlashLoan, MockLendingMarket, MockSell},
    relay::RelayCall,
    triggers::{GasPriceTrigger, SignedPriceTrigger, StorageWordTrigger, TimestampTrigger},
    utils::bytes::{address_word, u256_word},
    Engine, Recipe,
};
use automation_encoder::{address_of, encode_envelope, encode_recipe, sign_envelope, signing_key_from_hex, RelayEnvelope};
use automation_types::{id_of, ActionCall, ParamSource};
use k256::ecdsa::SigningKey;

pub const ADMIN: Address = address!("00000000000000000000000000000000000000ad");
pub const BOT: Address = address!("0000000000000000000000000000000000000b07");
pub const FEE_RECEIVER: Address = address!("00000000000000000000000000000000000000fe");
pub const TX_RELAY: Address = address!("0000000000000000000000000000000000001001");
pub const TX_SAVER: Address = address!("0000000000000000000000000000000000001002");
pub const WALLET: Address = address!("00000000000000000000000000000000000000c1");
pub const RECIPIENT: Address = address!("00000000000000000000000000000000000000e1");

pub const COLL: Address = address!("00000000000000000000000000000000000000c0");
pub const DEBT: Address = address!("00000000000000000000000000000000000000d0");
pub const MARKET: Address = address!("0000000000000000000000000000000000000a00");
pub const DEX: Address = address!("0000000000000000000000000000000000000de0");
pub const POOL: Address = address!("0000000000000000000000000000000000000f00");

pub const OWNER_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

pub const WAD: u128 = 1_000_000_000_000_000_000;
pub const START_TIME: u64 = 1_700_000_000;
pub const GAS_PRICE: u64 = 1_000_000_000;

pub fn wad(n: u64) -> U256 {
    U256::from(n) * U256::from(WAD)
}

/// Amount in whole collateral/debt units (1e18 each).
pub fn amount(n: u64) -> FixedBytes<32> {
    u256_word(wad(n))
}

pub fn lit(word: FixedBytes<32>) -> ParamSource {
    ParamSource::Literal(word)
}

pub fn call(name: &str, params: Vec<ParamSource>) -> ActionCall {
    ActionCall::new(id_of(name), params)
}

pub fn market() -> MockLendingMarket {
    MockLendingMarket {
        address: MARKET,
        collateral_token: COLL,
        debt_token: DEBT,
        collateral_price: U256::from(WAD),
    }
}

pub struct World {
    pub engine: Engine,
    pub owner_key: SigningKey,
    pub owner: Address,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(EngineConfig {
            admin: ADMIN,
            fee_receiver: FEE_RECEIVER,
            tx_relay_address: TX_RELAY,
            tx_saver_address: TX_SAVER,
            ..EngineConfig::default()
        })
    }

    /// Deploys every adapter, approves `BOT` on all three allow-lists, registers `WALLET` and
    /// opens a position of 140 collateral against 100 debt (ratio 1.4).
    pub fn with_config(config: EngineConfig) -> Self {
        setup_logging("debug", false);

        let owner_key = signing_key_from_hex(OWNER_KEY).expect("owner key");
        let owner = address_of(&owner_key);

        let mut state = HostState::new(1, START_TIME, U256::from(GAS_PRICE));
        state.register_wallet(WALLET, owner);
        state.mint(COLL, WALLET, wad(140)).unwrap();
        state.mint(DEBT, MARKET, wad(10_000)).unwrap();
        state.mint(COLL, DEX, wad(10_000)).unwrap();
        state.mint(DEBT, DEX, wad(10_000)).unwrap();
        state.mint(DAI_ADDR, DEX, wad(10_000)).unwrap();
        state.mint(DEBT, POOL, wad(10_000)).unwrap();

        let mut engine = Engine::new(config, state);
        let m = market();
        let sell = MockSell {
            dex: DEX,
            rate: U256::from(WAD),
        };
        engine.add_action(ADMIN, "PullToken", address!("0000000000000000000000000000000000000101"), PullToken).unwrap();
        engine.add_action(ADMIN, "SendToken", address!("0000000000000000000000000000000000000102"), SendToken).unwrap();
        engine.add_action(ADMIN, "SumInputs", address!("0000000000000000000000000000000000000103"), SumInputs).unwrap();
        engine.add_action(ADMIN, "Supply", address!("0000000000000000000000000000000000000104"), m.action(LendingOp::Supply)).unwrap();
        engine.add_action(ADMIN, "Withdraw", address!("0000000000000000000000000000000000000105"), m.action(LendingOp::Withdraw)).unwrap();
        engine.add_action(ADMIN, "Borrow", address!("0000000000000000000000000000000000000106"), m.action(LendingOp::Borrow)).unwrap();
        engine.add_action(ADMIN, "Payback", address!("0000000000000000000000000000000000000107"), m.action(LendingOp::Payback)).unwrap();
        engine.add_action(ADMIN, "Sell", address!("0000000000000000000000000000000000000108"), sell).unwrap();
        engine
            .add_flash_loan(ADMIN, "FlashLoan", address!("0000000000000000000000000000000000000109"), MockFlashLoan { pool: POOL, fee_bps: 0 })
            .unwrap();
        engine.add_trigger(ADMIN, "GasPriceTrigger", address!("0000000000000000000000000000000000000201"), GasPriceTrigger).unwrap();
        engine.add_trigger(ADMIN, "TimestampTrigger", address!("0000000000000000000000000000000000000202"), TimestampTrigger).unwrap();
        engine.add_trigger(ADMIN, "StorageWordTrigger", address!("0000000000000000000000000000000000000203"), StorageWordTrigger).unwrap();
        engine.add_trigger(ADMIN, "SignedPriceTrigger", address!("0000000000000000000000000000000000000204"), SignedPriceTrigger).unwrap();

        engine.strategy_bots_mut().add_caller(ADMIN, BOT).unwrap();
        engine.relay_bots_mut().add_caller(ADMIN, BOT).unwrap();
        engine.saver_bots_mut().add_caller(ADMIN, BOT).unwrap();

        let open = Recipe::new(
            "open",
            vec![
                call("Supply", vec![lit(amount(140))]),
                call("Borrow", vec![lit(amount(100))]),
            ],
        )
        .unwrap();
        engine.execute_recipe(owner, WALLET, &open).unwrap();

        Self {
            engine,
            owner_key,
            owner,
        }
    }

    pub fn state(&self) -> &HostState {
        self.engine.host().state()
    }

    pub fn state_mut(&mut self) -> &mut HostState {
        self.engine.host_mut().state_mut()
    }

    pub fn balance(&self, token: Address, holder: Address) -> U256 {
        self.state().balance(token, holder)
    }

    pub fn ratio(&self) -> U256 {
        self.state().sload(MARKET, MockLendingMarket::ratio_slot(WALLET))
    }

    pub fn collateral(&self) -> U256 {
        self.state().sload(MARKET, MockLendingMarket::collateral_slot(WALLET))
    }

    pub fn debt(&self) -> U256 {
        self.state().sload(MARKET, MockLendingMarket::debt_slot(WALLET))
    }

    /// Envelope for `calls`, addressed to `front_end`, with the wallet's current nonce and a
    /// one-hour deadline. `tweak` runs before signing.
    pub fn envelope(
        &self,
        front_end: Address,
        calls: &[ActionCall],
        tweak: impl FnOnce(&mut RelayEnvelope),
    ) -> RelayEnvelope {
        let state = self.state();
        let mut env = RelayEnvelope::new(WALLET, state.chain_id, front_end, encode_recipe("relayed", calls).unwrap());
        env.nonce = U256::from(state.wallet(WALLET).unwrap().nonce);
        env.deadline = state.block_timestamp + 3_600;
        tweak(&mut env);
        env
    }

    pub fn signed(&self, mut env: RelayEnvelope) -> RelayCall {
        sign_envelope(&mut env, &self.owner_key).unwrap();
        RelayCall {
            wallet: WALLET,
            envelope: encode_envelope(&env).unwrap().into(),
        }
    }

    pub fn relay_call(
        &self,
        front_end: Address,
        calls: &[ActionCall],
        tweak: impl FnOnce(&mut RelayEnvelope),
    ) -> RelayCall {
        self.signed(self.envelope(front_end, calls, tweak))
    }
}

/// `SendToken(token, RECIPIENT, amount)`.
pub fn send_to_recipient(token: Address, value: U256) -> ActionCall {
    call(
        "SendToken",
        vec![
            lit(address_word(token)),
            lit(address_word(RECIPIENT)),
            lit(u256_word(value)),
        ],
    )
}

/// `Sell(src, dest, amount)` at the dex's fixed 1:1 rate.
pub fn sell(src: Address, dest: Address, value: U256) -> ActionCall {
    call(
        "Sell",
        vec![
            lit(address_word(src)),
            lit(address_word(dest)),
            lit(u256_word(value)),
        ],
    )
}
