use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::error::VaultError;

pub(crate) const DAY_IN_LEDGERS: u32 = 17280;
pub(crate) const INSTANCE_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
pub(crate) const INSTANCE_LIFETIME_THRESHOLD: u32 = INSTANCE_BUMP_AMOUNT - DAY_IN_LEDGERS;
pub(crate) const POSITION_BUMP_AMOUNT: u32 = 120 * DAY_IN_LEDGERS;
pub(crate) const POSITION_LIFETIME_THRESHOLD: u32 = POSITION_BUMP_AMOUNT - 20 * DAY_IN_LEDGERS;

/// Storage keys for vault state.
///
/// Instance storage holds the singleton config and totals; persistent storage
/// holds one entry per depositor plus the depositor registry.
#[contracttype]
pub enum DataKey {
    /// `VaultConfig`, written once by `initialize`
    Config,
    /// Sum of every `UserPosition::staked_lp`
    TotalStakedLp,
    /// Reward tokens held by the vault awaiting the next compound
    PendingReward,
    Paused,
    /// Held for the duration of a mutating call
    Locked,
    Version,
    /// Id handed to the next position opened
    NextPositionId,
    /// Open `UserPosition` keyed by owner
    Position(Address),
    /// Owners of open positions in ascending `UserPosition::id` order
    Depositors,
}

/// Addresses of the vault's collaborators, fixed at initialization except
/// for the admin and router.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VaultConfig {
    pub admin: Address,
    /// Base asset users deposit and withdraw
    pub asset: Address,
    /// Token the staking master pays out
    pub reward_token: Address,
    /// Pool share token staked on behalf of depositors
    pub lp_token: Address,
    pub pool: Address,
    pub staking: Address,
    pub router: Address,
    /// Staking-master pool id of `lp_token`
    pub pid: u32,
}

/// A depositor's claim on the vault's pooled stake.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserPosition {
    pub owner: Address,
    /// Opening order; breaks ties when rounding remainders are handed out
    pub id: u32,
    pub staked_lp: i128,
}

pub fn extend_instance_ttl(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

pub fn get_config(env: &Env) -> Result<VaultConfig, VaultError> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(VaultError::NotInitialized)
}

pub fn set_config(env: &Env, config: &VaultConfig) {
    env.storage().instance().set(&DataKey::Config, config);
}

pub fn get_total_staked_lp(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::TotalStakedLp)
        .unwrap_or(0)
}

pub fn set_total_staked_lp(env: &Env, total: i128) {
    env.storage().instance().set(&DataKey::TotalStakedLp, &total);
}

pub fn get_pending_reward(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::PendingReward)
        .unwrap_or(0)
}

pub fn set_pending_reward(env: &Env, amount: i128) {
    env.storage().instance().set(&DataKey::PendingReward, &amount);
}

pub fn is_paused(env: &Env) -> bool {
    env.storage()
        .instance()
        .get(&DataKey::Paused)
        .unwrap_or(false)
}

pub fn set_paused(env: &Env, paused: bool) {
    env.storage().instance().set(&DataKey::Paused, &paused);
}

pub fn get_version(env: &Env) -> u32 {
    env.storage().instance().get(&DataKey::Version).unwrap_or(1)
}

pub fn set_version(env: &Env, version: u32) {
    env.storage().instance().set(&DataKey::Version, &version);
}

pub fn get_position(env: &Env, owner: &Address) -> Option<UserPosition> {
    let key = DataKey::Position(owner.clone());
    let position = env.storage().persistent().get(&key);
    if position.is_some() {
        env.storage()
            .persistent()
            .extend_ttl(&key, POSITION_LIFETIME_THRESHOLD, POSITION_BUMP_AMOUNT);
    }
    position
}

pub fn set_position(env: &Env, position: &UserPosition) {
    let key = DataKey::Position(position.owner.clone());
    env.storage().persistent().set(&key, position);
    env.storage()
        .persistent()
        .extend_ttl(&key, POSITION_LIFETIME_THRESHOLD, POSITION_BUMP_AMOUNT);
}

pub fn remove_position(env: &Env, owner: &Address) {
    env.storage()
        .persistent()
        .remove(&DataKey::Position(owner.clone()));
}

/// Returns a fresh position id and advances the counter.
pub fn next_position_id(env: &Env) -> Result<u32, VaultError> {
    let id: u32 = env
        .storage()
        .instance()
        .get(&DataKey::NextPositionId)
        .unwrap_or(0);
    let next = id.checked_add(1).ok_or(VaultError::ArithmeticOverflow)?;
    env.storage().instance().set(&DataKey::NextPositionId, &next);
    Ok(id)
}

pub fn get_depositors(env: &Env) -> Vec<Address> {
    let key = DataKey::Depositors;
    match env.storage().persistent().get(&key) {
        Some(depositors) => {
            env.storage()
                .persistent()
                .extend_ttl(&key, POSITION_LIFETIME_THRESHOLD, POSITION_BUMP_AMOUNT);
            depositors
        }
        None => Vec::new(env),
    }
}

pub fn set_depositors(env: &Env, depositors: &Vec<Address>) {
    let key = DataKey::Depositors;
    env.storage().persistent().set(&key, depositors);
    env.storage()
        .persistent()
        .extend_ttl(&key, POSITION_LIFETIME_THRESHOLD, POSITION_BUMP_AMOUNT);
}

/// Lock held across a mutating vault call.
///
/// Released on drop. If the call fails the host rolls the lock back along
/// with every other write, so an error path can never leave it set.
pub struct ReentrancyGuard {
    env: Env,
}

impl ReentrancyGuard {
    pub fn acquire(env: &Env) -> Result<Self, VaultError> {
        if env.storage().instance().has(&DataKey::Locked) {
            return Err(VaultError::Reentrant);
        }
        env.storage().instance().set(&DataKey::Locked, &true);
        Ok(Self { env: env.clone() })
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        self.env.storage().instance().remove(&DataKey::Locked);
    }
}
