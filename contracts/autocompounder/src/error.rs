use soroban_sdk::contracterror;

/// Errors returned by the vault.
///
/// Codes are part of the contract's public interface and must stay stable
/// across upgrades. Any `Err` returned from a contract function reverts every
/// storage write and token movement made during that invocation.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum VaultError {
    /// Caller's base-asset balance is below the requested amount
    InsufficientFunds = 1,
    /// Caller has not approved the vault for the requested amount
    InsufficientAllowance = 2,
    /// Requested LP exceeds the caller's staked position
    InsufficientStake = 3,
    /// The ledger timestamp is past the caller's deadline
    DeadlineExpired = 4,
    /// The pool would pay out less than the caller's minimum
    SlippageExceeded = 5,
    /// The pool or reward router rejected a conversion
    PoolOperationFailed = 6,
    /// The staking master rejected a stake, unstake or harvest
    StakingOperationFailed = 7,
    NotInitialized = 8,
    AlreadyInitialized = 9,
    /// Amount must be strictly positive
    InvalidAmount = 10,
    Paused = 11,
    NotPaused = 12,
    /// A mutating operation was entered while another was in flight
    Reentrant = 13,
    ArithmeticOverflow = 14,
    /// Internal ledger disagrees with the staking master's record
    AccountingMismatch = 15,
    AlreadyPaused = 16,
    /// The vault already tracks the maximum number of open positions
    TooManyPositions = 17,
}
