//! Host model: chain state, gas metering and the transaction boundary.
//!
//! `Host::transact` is the only unit of atomicity. Every entry point that can mutate wallet
//! balances runs inside one transaction; an `Err` from the body restores the snapshot taken
//! before it started.

pub mod gas;
pub mod state;

pub use gas::GasMeter;
pub use state::{HostEvent, HostState, SmartWallet};

/// One in-flight host transaction.
pub struct Transaction<'a> {
    pub state: &'a mut HostState,
    pub gas: GasMeter,
}

#[derive(Clone, Debug, Default)]
pub struct Host {
    state: HostState,
}

impl Host {
    pub fn new(state: HostState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &HostState {
        &self.state
    }

    /// Direct mutable access for setup code (funding accounts, moving the clock).
    pub fn state_mut(&mut self) -> &mut HostState {
        &mut self.state
    }

    pub fn advance_time(&mut self, seconds: u64) {
        self.state.block_timestamp += seconds;
    }

    /// Run `f` atomically: on `Err` every change it made to the host state is undone.
    pub fn transact<T, E>(
        &mut self,
        gas_limit: u64,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let snapshot = self.state.clone();
        let mut tx = Transaction {
            state: &mut self.state,
            gas: GasMeter::new(gas_limit),
        };
        let out = f(&mut tx);
        if out.is_err() {
            self.state = snapshot;
        }
        out
    }
}
