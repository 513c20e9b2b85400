//! Events published by the vault.
//!
//! Every state-changing operation emits exactly one event so indexers can
//! rebuild per-user positions without reading contract storage.

use soroban_sdk::{contracttype, symbol_short, Address, Env};

/// # Topics
/// - `SymbolShort("init")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VaultInitializedEvent {
    pub admin: Address,
    pub asset: Address,
    pub lp_token: Address,
    pub pid: u32,
}

/// Emitted when a user's base asset has been converted to LP and staked.
///
/// # Topics
/// - `SymbolShort("deposit")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositEvent {
    pub user: Address,
    /// Base asset pulled from the user
    pub amount: i128,
    /// LP minted by the pool and credited to the user
    pub lp_received: i128,
}

/// Emitted when harvested rewards have been restaked and distributed.
///
/// # Topics
/// - `SymbolShort("compound")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompoundEvent {
    /// Reward tokens converted, including rewards pending from earlier withdrawals
    pub reward_harvested: i128,
    pub lp_added: i128,
    pub total_staked_lp: i128,
}

/// # Topics
/// - `SymbolShort("withdraw")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawEvent {
    pub user: Address,
    pub lp_amount: i128,
    /// Base asset paid to the user
    pub amount_received: i128,
}

/// # Topics
/// - `SymbolShort("pause")` or `SymbolShort("unpause")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PauseEvent {
    pub caller: Address,
}

/// # Topics
/// - `SymbolShort("router")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouterUpdatedEvent {
    pub old_router: Address,
    pub new_router: Address,
}

pub(crate) fn initialized(env: &Env, event: VaultInitializedEvent) {
    env.events().publish((symbol_short!("init"),), event);
}

pub(crate) fn deposited(env: &Env, event: DepositEvent) {
    env.events().publish((symbol_short!("deposit"),), event);
}

pub(crate) fn compounded(env: &Env, event: CompoundEvent) {
    env.events().publish((symbol_short!("compound"),), event);
}

pub(crate) fn withdrawn(env: &Env, event: WithdrawEvent) {
    env.events().publish((symbol_short!("withdraw"),), event);
}

pub(crate) fn paused(env: &Env, caller: Address) {
    env.events()
        .publish((symbol_short!("pause"),), PauseEvent { caller });
}

pub(crate) fn unpaused(env: &Env, caller: Address) {
    env.events()
        .publish((symbol_short!("unpause"),), PauseEvent { caller });
}

pub(crate) fn router_updated(env: &Env, event: RouterUpdatedEvent) {
    env.events().publish((symbol_short!("router"),), event);
}
