//! Client interfaces for the contracts the vault composes.
//!
//! The vault never reimplements pricing, routing or reward accrual. It only
//! relies on the call shapes below; any contract exposing them can be wired
//! in at `initialize` (or, for the router, swapped later by the admin).

use soroban_sdk::{contractclient, contracterror, Address, Env};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum PoolError {
    DeadlineExpired = 1,
    SlippageExceeded = 2,
    InsufficientLiquidity = 3,
}

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum StakingError {
    UnknownPool = 1,
    InsufficientBalance = 2,
    InvalidAmount = 3,
}

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum RouterError {
    DeadlineExpired = 1,
    SlippageExceeded = 2,
    NoRoute = 3,
}

/// Liquidity pool converting the base asset to and from LP shares.
///
/// Both calls pull their input from `from` with `transfer_from`, so the caller
/// approves the pool for the exact input beforehand. Outputs are paid to `from`.
#[contractclient(name = "PoolClient")]
pub trait Pool {
    /// Deposits `amount` of base asset and returns the LP actually minted.
    fn deposit(
        env: Env,
        from: Address,
        amount: i128,
        min_liquidity: i128,
        deadline: u64,
    ) -> Result<i128, PoolError>;

    /// Burns `liquidity` LP and returns the base asset paid out.
    fn withdraw(
        env: Env,
        from: Address,
        liquidity: i128,
        min_amount: i128,
        deadline: u64,
    ) -> Result<i128, PoolError>;
}

/// Staking master holding LP under a pool id and accruing reward tokens.
#[contractclient(name = "StakingMasterClient")]
pub trait StakingMaster {
    fn get_asset_pid(env: Env, lp_token: Address) -> u32;

    /// Pulls `amount` LP from `from` and stakes it under `pid`.
    fn deposit(env: Env, from: Address, pid: u32, amount: i128) -> Result<(), StakingError>;

    /// Unstakes `amount` LP to `to` and pays out every reward accrued to `to`.
    /// Returns `(lp_returned, reward_harvested)`. A zero amount only harvests.
    fn withdraw(env: Env, to: Address, pid: u32, amount: i128) -> Result<(i128, i128), StakingError>;

    fn balance_of(env: Env, user: Address, pid: u32) -> i128;
}

/// Swap route for turning harvested rewards into the base asset.
#[contractclient(name = "RouterClient")]
pub trait Router {
    fn swap_exact_in(
        env: Env,
        from: Address,
        token_in: Address,
        token_out: Address,
        amount_in: i128,
        min_out: i128,
        deadline: u64,
    ) -> Result<i128, RouterError>;
}
