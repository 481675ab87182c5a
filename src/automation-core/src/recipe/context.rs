use alloy_primitives::{Address, Bytes, FixedBytes, U256};

use crate::{
    errors::HostError,
    host::{
        gas::{SLOAD_GAS, SSTORE_GAS, TRANSFER_GAS},
        GasMeter, HostState,
    },
};

/// Fee the relay carves out of a sell-type action's output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionFee {
    pub token: Address,
    pub amount: U256,
    pub receiver: Address,
    pub taken: bool,
}

/// Off-chain exchange order a Tx-Saver bot may inject into a sell action.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OffchainOrder {
    pub wrapper: Address,
    pub exchange_addr: Address,
    pub allowance_target: Address,
    /// Destination amount per source unit, 1e18-scaled.
    pub price: U256,
    pub protocol_fee: U256,
    pub call_data: Bytes,
}

impl OffchainOrder {
    pub fn is_empty(&self) -> bool {
        self.wrapper == Address::ZERO && self.price.is_zero()
    }
}

/// Identity and resources a recipe executes with.
///
/// Every token movement an action makes goes through this context and acts as `wallet`.
pub struct ExecutionContext<'a> {
    pub wallet: Address,
    pub owner: Address,
    pub state: &'a mut HostState,
    pub gas: &'a mut GasMeter,
    pub(crate) flash_loan_active: bool,
    position_fee: Option<PositionFee>,
    injected_order: Option<OffchainOrder>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        wallet: Address,
        owner: Address,
        state: &'a mut HostState,
        gas: &'a mut GasMeter,
    ) -> Self {
        Self {
            wallet,
            owner,
            state,
            gas,
            flash_loan_active: false,
            position_fee: None,
            injected_order: None,
        }
    }

    pub fn with_position_fee(mut self, fee: PositionFee) -> Self {
        self.position_fee = Some(fee);
        self
    }

    pub fn with_injected_order(mut self, order: OffchainOrder) -> Self {
        self.injected_order = Some(order);
        self
    }

    pub fn injected_order(&self) -> Option<&OffchainOrder> {
        self.injected_order.as_ref()
    }

    pub fn position_fee(&self) -> Option<&PositionFee> {
        self.position_fee.as_ref()
    }

    pub fn charge_gas(&mut self, amount: u64) -> Result<(), HostError> {
        self.gas.charge(amount)
    }

    pub fn balance(&self, token: Address) -> U256 {
        self.state.balance(token, self.wallet)
    }

    /// Send tokens out of the wallet.
    pub fn transfer(&mut self, token: Address, to: Address, amount: U256) -> Result<(), HostError> {
        self.gas.charge(TRANSFER_GAS)?;
        self.state.transfer(token, self.wallet, to, amount)
    }

    /// Pull tokens from `from` into the wallet, spending the allowance `from` granted the wallet.
    pub fn pull(&mut self, token: Address, from: Address, amount: U256) -> Result<(), HostError> {
        self.gas.charge(TRANSFER_GAS)?;
        let wallet = self.wallet;
        self.state.transfer_from(token, wallet, from, wallet, amount)
    }

    /// Move tokens between two third parties (protocol reserves in mock adapters).
    pub fn transfer_between(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        self.gas.charge(TRANSFER_GAS)?;
        self.state.transfer(token, from, to, amount)
    }

    pub fn sload(&mut self, target: Address, slot: FixedBytes<32>) -> Result<U256, HostError> {
        self.gas.charge(SLOAD_GAS)?;
        Ok(self.state.sload(target, slot))
    }

    pub fn sstore(
        &mut self,
        target: Address,
        slot: FixedBytes<32>,
        value: U256,
    ) -> Result<(), HostError> {
        self.gas.charge(SSTORE_GAS)?;
        self.state.sstore(target, slot, value);
        Ok(())
    }

    /// Called by sell-type actions with their output; pays any pending position fee in
    /// `token` to the fee receiver and returns what is left for the wallet.
    pub fn take_position_fee(&mut self, token: Address, amount_out: U256) -> Result<U256, HostError> {
        let Some(fee) = self.position_fee.as_ref() else {
            return Ok(amount_out);
        };
        if fee.taken || fee.token != token {
            return Ok(amount_out);
        }
        let (amount, receiver) = (fee.amount, fee.receiver);
        let net = amount_out.checked_sub(amount).ok_or(HostError::InsufficientBalance {
            token,
            holder: self.wallet,
            needed: amount,
            available: amount_out,
        })?;
        self.transfer(token, receiver, amount)?;
        if let Some(fee) = self.position_fee.as_mut() {
            fee.taken = true;
        }
        Ok(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const TOKEN: Address = address!("00000000000000000000000000000000000000aa");
    const WALLET: Address = address!("00000000000000000000000000000000000000c1");
    const RECEIVER: Address = address!("00000000000000000000000000000000000000fe");

    #[test]
    fn position_fee_is_taken_once_in_matching_token() {
        let mut state = HostState::default();
        state.mint(TOKEN, WALLET, U256::from(100u64)).unwrap();
        let mut gas = GasMeter::new(1_000_000);
        let mut ctx = ExecutionContext::new(WALLET, Address::ZERO, &mut state, &mut gas)
            .with_position_fee(PositionFee {
                token: TOKEN,
                amount: U256::from(10u64),
                receiver: RECEIVER,
                taken: false,
            });

        let net = ctx.take_position_fee(Address::ZERO, U256::from(100u64)).unwrap();
        assert_eq!(net, U256::from(100u64));
        let net = ctx.take_position_fee(TOKEN, U256::from(100u64)).unwrap();
        assert_eq!(net, U256::from(90u64));
        let net = ctx.take_position_fee(TOKEN, U256::from(100u64)).unwrap();
        assert_eq!(net, U256::from(100u64));
        assert!(ctx.position_fee().unwrap().taken);
        assert_eq!(state.balance(TOKEN, RECEIVER), U256::from(10u64));
    }
}
