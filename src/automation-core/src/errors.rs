use alloy_primitives::{Address, FixedBytes, U256};
use thiserror::Error;

/// Errors during wire decoding of recipes and relay envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown parameter tag {0:#04x}")]
    UnknownTag(u8),
    #[error("input truncated")]
    Truncated,
    #[error("trailing bytes after payload")]
    TrailingBytes,
    #[error("too many actions")]
    TooManyActions,
    #[error("too many parameters")]
    TooManyParams,
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u16),
    #[error("signature length {0}, expected 65")]
    InvalidSignatureLength(usize),
    #[error("invalid utf-8 in recipe name")]
    InvalidName,
}

/// Errors from the host ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("insufficient balance of {token} for {holder}: need {needed}, have {available}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        needed: U256,
        available: U256,
    },
    #[error("insufficient allowance of {token} from {owner} to {spender}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
    },
    #[error("out of gas: limit {limit}, required {required}")]
    OutOfGas { limit: u64, required: u64 },
    #[error("unknown wallet {0}")]
    UnknownWallet(Address),
    #[error("arithmetic overflow")]
    Overflow,
}

/// Errors raised by action adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{0}")]
    Host(#[from] HostError),
    #[error("bad parameters: {0}")]
    BadParams(&'static str),
    #[error("{0}")]
    Reverted(String),
    #[error("flash loan not repaid: owed {owed}, available {available}")]
    FlashLoanNotRepaid { owed: U256, available: U256 },
    /// Failure inside a flash-loan continuation, carried back out through the provider.
    #[error("{0}")]
    Continuation(Box<AutomationError>),
}

/// Errors from the timelocked contract registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("entry {0} already exists")]
    EntryAlreadyExists(FixedBytes<32>),
    #[error("entry {0} does not exist")]
    EntryNonExistent(FixedBytes<32>),
    #[error("entry {0} not in change process")]
    EntryNotInChange(FixedBytes<32>),
    #[error("change of {id} not ready until {ready_at}")]
    ChangeNotReady { id: FixedBytes<32>, ready_at: u64 },
    #[error("entry {0} already in contract change")]
    AlreadyInContractChange(FixedBytes<32>),
    #[error("entry {0} already in wait period change")]
    AlreadyInWaitPeriodChange(FixedBytes<32>),
    #[error("entry {0} has no previous address")]
    EmptyPrevAddr(FixedBytes<32>),
}

/// Top-level error of every engine entry point.
///
/// Any variant aborts the whole host transaction; nothing is retried on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutomationError {
    #[error("{sender} is not authorized: {reason}")]
    Unauthorized { sender: Address, reason: &'static str },
    #[error("caller {0} is not an approved bot")]
    CallerNotAuthorized(Address),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("reference error: {0}")]
    ReferenceError(String),
    #[error("subscription {sub_id} data hash mismatch")]
    IntegrityCheckFailed { sub_id: u64 },
    #[error("trigger {index} not met")]
    TriggerNotMet { index: usize },
    #[error("subscription {0} is disabled")]
    SubscriptionDisabled(u64),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("signature expired at {deadline}, now {now}")]
    ExpiredSignature { deadline: u64, now: u64 },
    #[error("fee {fee} exceeds max tx cost {max}")]
    FeeCapExceeded { fee: U256, max: U256 },
    #[error("recipe cannot pay its fee from position")]
    RecipeIncompatibleWithFeeFromPosition,
    #[error("action {index} failed: {source}")]
    ActionExecutionFailed {
        index: usize,
        #[source]
        source: ActionError,
    },
    #[error("fee collection failed: {0}")]
    FeeCollectionFailed(HostError),
    #[error("{0}")]
    Host(#[from] HostError),
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("journal: {0}")]
    Journal(String),
    #[error("config: {0}")]
    Config(String),
}

impl From<::config::ConfigError> for AutomationError {
    fn from(err: ::config::ConfigError) -> Self {
        AutomationError::Config(err.to_string())
    }
}

impl AutomationError {
    pub(crate) fn not_found(kind: &'static str, id: u64) -> Self {
        AutomationError::NotFound { kind, id }
    }

    pub(crate) fn unauthorized(sender: Address, reason: &'static str) -> Self {
        AutomationError::Unauthorized { sender, reason }
    }
}
