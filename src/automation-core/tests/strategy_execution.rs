mod common;

use alloy_primitives::{address, Address, Bytes, FixedBytes, U256};
use automation_core::{
    config::{EngineConfig, StrategySelectionPolicy},
    host::HostEvent,
    mock::MockLendingMarket,
    registry::NewStrategy,
    triggers::{GasPriceTrigger, SignedPriceTrigger, StorageWordTrigger, TimestampTrigger},
    utils::bytes::{address_word, u256_word},
    AutomationError, ExecuteStrategyRequest, StrategySub,
};
use automation_encoder::{address_of, signing_key_from_hex};
use automation_types::{id_of, CompOp, ParamSource, TriggerRef};
use common::*;

fn w(n: u64) -> FixedBytes<32> {
    u256_word(U256::from(n))
}

fn gas_condition() -> Bytes {
    GasPriceTrigger::condition(U256::from(100 * GAS_PRICE))
}

/// Withdraw collateral, sell it for the debt token and pay back: raises the ratio.
fn create_repay_strategy(world: &mut World) -> u64 {
    world
        .engine
        .create_strategy(
            ADMIN,
            NewStrategy {
                name: "Repay".into(),
                trigger_refs: vec![TriggerRef::new(id_of("StorageWordTrigger"))],
                actions: vec![
                    call("Withdraw", vec![ParamSource::FromSub(0)]),
                    call(
                        "Sell",
                        vec![ParamSource::FromSub(1), ParamSource::FromSub(2), ParamSource::FromAction(0)],
                    ),
                    call("Payback", vec![ParamSource::FromAction(1)]),
                ],
                sub_slot_names: vec!["&amount".into(), "&collToken".into(), "&debtToken".into()],
                continuous: true,
            },
        )
        .unwrap()
}

fn repay_sub(strategy_id: u64) -> StrategySub {
    let ratio_under = U256::from(WAD * 3 / 2);
    StrategySub {
        strategy_or_bundle_id: strategy_id,
        is_bundle: false,
        trigger_data: vec![StorageWordTrigger::condition(
            MARKET,
            MockLendingMarket::ratio_slot(WALLET),
            CompOp::Lt,
            ratio_under,
        )],
        sub_data: vec![amount(20), address_word(COLL), address_word(DEBT)],
    }
}

fn request(sub_id: u64, sub: &StrategySub) -> ExecuteStrategyRequest {
    ExecuteStrategyRequest {
        sub_id,
        sub: sub.clone(),
        ..Default::default()
    }
}

fn subscribed_repay(world: &mut World) -> (u64, StrategySub) {
    let strategy_id = create_repay_strategy(world);
    let sub = repay_sub(strategy_id);
    let sub_id = world.engine.subscribe(WALLET, WALLET, sub.clone()).unwrap();
    (sub_id, sub)
}

#[test]
fn repay_under_threshold_raises_ratio_then_stops_triggering() {
    let mut world = World::new();
    let (sub_id, sub) = subscribed_repay(&mut world);
    let ratio_before = world.ratio();
    assert_eq!(ratio_before, U256::from(WAD * 14 / 10));

    let record = world.engine.execute_strategy(BOT, request(sub_id, &sub)).unwrap();
    assert_eq!(record.sub_id, sub_id);
    assert_eq!(record.bundle_id, None);
    assert_eq!(record.timestamp, START_TIME);
    assert_eq!(record.return_values, vec![amount(20), amount(20), amount(20)]);
    assert!(record.gas_used > 0);

    let ratio_after = world.ratio();
    assert!(ratio_after > ratio_before);
    assert_eq!(ratio_after, U256::from(WAD * 3 / 2));
    assert_eq!(world.collateral(), wad(120));
    assert_eq!(world.debt(), wad(80));
    assert!(matches!(
        world.state().events().last(),
        Some(HostEvent::StrategyExecuted { sub_id: 0, .. })
    ));

    let err = world.engine.execute_strategy(BOT, request(sub_id, &sub)).unwrap_err();
    assert_eq!(err, AutomationError::TriggerNotMet { index: 0 });
    assert_eq!(world.ratio(), ratio_after);
}

#[test]
fn tampered_subscription_data_fails_before_any_effect() {
    let mut world = World::new();
    let (sub_id, sub) = subscribed_repay(&mut world);
    let events_before = world.state().events().len();

    let mut tampered = sub.clone();
    tampered.sub_data[0] = amount(100);
    let err = world
        .engine
        .execute_strategy(BOT, request(sub_id, &tampered))
        .unwrap_err();

    assert_eq!(err, AutomationError::IntegrityCheckFailed { sub_id });
    assert_eq!(world.collateral(), wad(140));
    assert_eq!(world.state().events().len(), events_before);
}

#[test]
fn only_approved_bots_execute() {
    let mut world = World::new();
    let (sub_id, sub) = subscribed_repay(&mut world);

    let err = world.engine.execute_strategy(RECIPIENT, request(sub_id, &sub)).unwrap_err();
    assert_eq!(err, AutomationError::CallerNotAuthorized(RECIPIENT));

    world.engine.strategy_bots_mut().remove_caller(ADMIN, BOT).unwrap();
    let err = world.engine.execute_strategy(BOT, request(sub_id, &sub)).unwrap_err();
    assert_eq!(err, AutomationError::CallerNotAuthorized(BOT));
}

#[test]
fn disabled_subscription_is_rejected_and_toggling_is_idempotent() {
    let mut world = World::new();
    let (sub_id, sub) = subscribed_repay(&mut world);

    world.engine.deactivate_sub(WALLET, sub_id).unwrap();
    world.engine.deactivate_sub(WALLET, sub_id).unwrap();
    assert!(!world.engine.get_sub(sub_id).unwrap().is_enabled);

    let err = world.engine.execute_strategy(BOT, request(sub_id, &sub)).unwrap_err();
    assert_eq!(err, AutomationError::SubscriptionDisabled(sub_id));

    world.engine.activate_sub(WALLET, sub_id).unwrap();
    world.engine.activate_sub(WALLET, sub_id).unwrap();
    world.engine.execute_strategy(BOT, request(sub_id, &sub)).unwrap();
}

#[test]
fn updated_subscription_data_replaces_the_old_hash() {
    let mut world = World::new();
    let (sub_id, old) = subscribed_repay(&mut world);

    let mut new = old.clone();
    new.sub_data[0] = amount(10);
    let hash = world
        .engine
        .update_sub_data(WALLET, sub_id, new.trigger_data.clone(), new.sub_data.clone())
        .unwrap();
    assert_eq!(hash, new.hash());
    assert_eq!(world.engine.get_sub(sub_id).unwrap().integrity_hash, new.hash());

    let err = world.engine.execute_strategy(BOT, request(sub_id, &old)).unwrap_err();
    assert_eq!(err, AutomationError::IntegrityCheckFailed { sub_id });

    world.engine.execute_strategy(BOT, request(sub_id, &new)).unwrap();
    assert_eq!(world.collateral(), wad(130));
    assert_eq!(world.debt(), wad(90));
}

#[test]
fn failing_action_rolls_back_earlier_actions() {
    let mut world = World::new();
    let strategy_id = world
        .engine
        .create_strategy(
            ADMIN,
            NewStrategy {
                name: "Overdraw".into(),
                trigger_refs: vec![TriggerRef::new(id_of("GasPriceTrigger"))],
                actions: vec![
                    call("Withdraw", vec![ParamSource::FromSub(0)]),
                    call("Borrow", vec![ParamSource::FromSub(1)]),
                ],
                sub_slot_names: vec!["&withdraw".into(), "&borrow".into()],
                continuous: true,
            },
        )
        .unwrap();
    let sub = StrategySub {
        strategy_or_bundle_id: strategy_id,
        is_bundle: false,
        trigger_data: vec![gas_condition()],
        sub_data: vec![amount(10), amount(1_000)],
    };
    let sub_id = world.engine.subscribe(WALLET, WALLET, sub.clone()).unwrap();
    let coll_balance = world.balance(COLL, WALLET);

    let err = world.engine.execute_strategy(BOT, request(sub_id, &sub)).unwrap_err();
    assert!(matches!(err, AutomationError::ActionExecutionFailed { index: 1, .. }));
    assert_eq!(world.collateral(), wad(140));
    assert_eq!(world.debt(), wad(100));
    assert_eq!(world.balance(COLL, WALLET), coll_balance);
}

#[test]
fn injected_values_fill_the_bots_slots() {
    let mut world = World::new();
    let strategy_id = world
        .engine
        .create_strategy(
            ADMIN,
            NewStrategy {
                name: "Sum".into(),
                trigger_refs: vec![TriggerRef::new(id_of("GasPriceTrigger"))],
                actions: vec![call("SumInputs", vec![ParamSource::Injected, ParamSource::FromSub(0)])],
                sub_slot_names: vec!["&base".into()],
                continuous: true,
            },
        )
        .unwrap();
    let sub = StrategySub {
        strategy_or_bundle_id: strategy_id,
        is_bundle: false,
        trigger_data: vec![gas_condition()],
        sub_data: vec![w(40)],
    };
    let sub_id = world.engine.subscribe(WALLET, WALLET, sub.clone()).unwrap();

    let mut req = request(sub_id, &sub);
    let err = world.engine.execute_strategy(BOT, req.clone()).unwrap_err();
    assert!(matches!(err, AutomationError::ReferenceError(_)));

    req.action_override_data = vec![vec![w(2)]];
    let record = world.engine.execute_strategy(BOT, req).unwrap();
    assert_eq!(record.return_values, vec![w(42)]);
}

#[test]
fn one_shot_strategy_disables_its_subscription() {
    let mut world = World::new();
    let strategy_id = world
        .engine
        .create_strategy(
            ADMIN,
            NewStrategy {
                name: "Once".into(),
                trigger_refs: vec![TriggerRef::new(id_of("TimestampTrigger"))],
                actions: vec![call("SumInputs", vec![ParamSource::FromSub(0), lit(w(1))])],
                sub_slot_names: vec!["&x".into()],
                continuous: false,
            },
        )
        .unwrap();
    let sub = StrategySub {
        strategy_or_bundle_id: strategy_id,
        is_bundle: false,
        trigger_data: vec![TimestampTrigger::condition(START_TIME + 60)],
        sub_data: vec![w(1)],
    };
    let sub_id = world.engine.subscribe(WALLET, WALLET, sub.clone()).unwrap();

    let err = world.engine.execute_strategy(BOT, request(sub_id, &sub)).unwrap_err();
    assert_eq!(err, AutomationError::TriggerNotMet { index: 0 });
    assert!(world.engine.get_sub(sub_id).unwrap().is_enabled);

    world.engine.host_mut().advance_time(60);
    world.engine.execute_strategy(BOT, request(sub_id, &sub)).unwrap();
    assert!(!world.engine.get_sub(sub_id).unwrap().is_enabled);

    let err = world.engine.execute_strategy(BOT, request(sub_id, &sub)).unwrap_err();
    assert_eq!(err, AutomationError::SubscriptionDisabled(sub_id));
}

fn sum_strategy(world: &mut World, name: &str, addend: u64) -> u64 {
    world
        .engine
        .create_strategy(
            ADMIN,
            NewStrategy {
                name: name.into(),
                trigger_refs: vec![TriggerRef::new(id_of("GasPriceTrigger"))],
                actions: vec![call("SumInputs", vec![ParamSource::FromSub(0), lit(w(addend))])],
                sub_slot_names: vec!["&x".into()],
                continuous: true,
            },
        )
        .unwrap()
}

fn bundle_sub(world: &mut World) -> (u64, StrategySub) {
    let a = sum_strategy(world, "PlusOne", 1);
    let b = sum_strategy(world, "PlusTwo", 2);
    let bundle_id = world.engine.create_bundle(ADMIN, vec![a, b]).unwrap();
    let sub = StrategySub {
        strategy_or_bundle_id: bundle_id,
        is_bundle: true,
        trigger_data: vec![gas_condition()],
        sub_data: vec![w(5)],
    };
    let sub_id = world.engine.subscribe(WALLET, WALLET, sub.clone()).unwrap();
    (sub_id, sub)
}

#[test]
fn bot_picks_a_strategy_inside_a_bundle() {
    let mut world = World::new();
    let (sub_id, sub) = bundle_sub(&mut world);

    let mut req = request(sub_id, &sub);
    req.strategy_index = 1;
    let record = world.engine.execute_strategy(BOT, req.clone()).unwrap();
    assert_eq!(record.bundle_id, Some(0));
    assert_eq!(record.strategy_id, 1);
    assert_eq!(record.return_values, vec![w(7)]);

    req.strategy_index = 2;
    let err = world.engine.execute_strategy(BOT, req).unwrap_err();
    assert!(matches!(err, AutomationError::NotFound { .. }));
}

#[test]
fn first_only_policy_rejects_later_bundle_members() {
    let mut world = World::with_config(EngineConfig {
        admin: ADMIN,
        fee_receiver: FEE_RECEIVER,
        tx_relay_address: TX_RELAY,
        tx_saver_address: TX_SAVER,
        bundle_selection: StrategySelectionPolicy::FirstOnly,
        ..EngineConfig::default()
    });
    let (sub_id, sub) = bundle_sub(&mut world);

    let mut req = request(sub_id, &sub);
    req.strategy_index = 1;
    let err = world.engine.execute_strategy(BOT, req.clone()).unwrap_err();
    assert!(matches!(err, AutomationError::ReferenceError(_)));

    req.strategy_index = 2;
    let err = world.engine.execute_strategy(BOT, req.clone()).unwrap_err();
    assert!(matches!(err, AutomationError::NotFound { .. }));

    req.strategy_index = 0;
    let record = world.engine.execute_strategy(BOT, req).unwrap();
    assert_eq!(record.return_values, vec![w(6)]);
}

#[test]
fn gas_price_above_ceiling_blocks_execution() {
    let mut world = World::new();
    let (sub_id, sub) = bundle_sub(&mut world);
    world.state_mut().gas_price = U256::from(101 * GAS_PRICE);

    let err = world.engine.execute_strategy(BOT, request(sub_id, &sub)).unwrap_err();
    assert_eq!(err, AutomationError::TriggerNotMet { index: 0 });
}

fn price_report(key: &k256::ecdsa::SigningKey, feed: Address, price: U256, at: u64) -> Bytes {
    let digest = SignedPriceTrigger::report_digest(feed, price, at);
    let (sig, recid) = key.sign_prehash_recoverable(digest.as_slice()).unwrap();
    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(27 + recid.to_byte());
    SignedPriceTrigger::proof(price, at, &bytes)
}

#[test]
fn signed_price_trigger_runs_only_on_a_fresh_report_from_the_reporter() {
    let mut world = World::new();
    let feed = address!("00000000000000000000000000000000000000f1");
    let reporter_key = signing_key_from_hex("0x0123456789012345678901234567890123456789012345678901234567890123").unwrap();
    let reporter = address_of(&reporter_key);
    let strategy_id = world
        .engine
        .create_strategy(
            ADMIN,
            NewStrategy {
                name: "PriceDrop".into(),
                trigger_refs: vec![TriggerRef::new(id_of("SignedPriceTrigger"))],
                actions: vec![call("SumInputs", vec![ParamSource::FromSub(0), lit(w(1))])],
                sub_slot_names: vec!["&x".into()],
                continuous: true,
            },
        )
        .unwrap();
    let sub = StrategySub {
        strategy_or_bundle_id: strategy_id,
        is_bundle: false,
        trigger_data: vec![SignedPriceTrigger::condition(feed, reporter, CompOp::Lt, wad(2_000), 300)],
        sub_data: vec![w(5)],
    };
    let sub_id = world.engine.subscribe(WALLET, WALLET, sub.clone()).unwrap();
    let now = world.state().block_timestamp;

    let err = world.engine.execute_strategy(BOT, request(sub_id, &sub)).unwrap_err();
    assert_eq!(err, AutomationError::TriggerNotMet { index: 0 });

    let mut req = request(sub_id, &sub);
    req.trigger_proof_data = vec![price_report(&world.owner_key, feed, wad(1_900), now)];
    let err = world.engine.execute_strategy(BOT, req.clone()).unwrap_err();
    assert_eq!(err, AutomationError::TriggerNotMet { index: 0 });

    req.trigger_proof_data = vec![price_report(&reporter_key, feed, wad(1_900), now - 301)];
    let err = world.engine.execute_strategy(BOT, req.clone()).unwrap_err();
    assert_eq!(err, AutomationError::TriggerNotMet { index: 0 });

    req.trigger_proof_data = vec![price_report(&reporter_key, feed, wad(2_100), now)];
    let err = world.engine.execute_strategy(BOT, req.clone()).unwrap_err();
    assert_eq!(err, AutomationError::TriggerNotMet { index: 0 });

    req.trigger_proof_data = vec![price_report(&reporter_key, feed, wad(1_900), now - 10)];
    let record = world.engine.execute_strategy(BOT, req).unwrap();
    assert_eq!(record.return_values, vec![w(6)]);
}
