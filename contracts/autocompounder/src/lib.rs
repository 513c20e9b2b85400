//! # Auto-Compound Vault Contract
//!
//! A custodial vault that turns a base asset into staked LP and keeps
//! re-staking the staking rewards on behalf of every depositor.
//!
//! ## Architecture Overview
//!
//! The vault composes three external contracts and owns none of their logic:
//! - **Pool** converts the base asset to LP shares and back
//! - **StakingMaster** holds the vault's LP under a pool id and accrues rewards
//! - **Router** converts harvested rewards into the base asset
//!
//! The vault's own responsibility is the per-user ledger: how much of the
//! pooled stake belongs to whom.
//!
//! ## Asset Flow
//!
//! ```text
//! Deposit Flow:
//! User → [Asset] → [Vault] → [Pool.deposit] → LP → [StakingMaster.deposit]
//!                                   ↓
//!                     position += LP actually minted
//!
//! Compound Flow (anyone):
//! [StakingMaster.withdraw(0)] → reward → [Router] → asset → [Pool] → LP → stake
//!                                   ↓
//!               LP split across positions by largest remainder
//!
//! Withdraw Flow:
//! position -= LP → [StakingMaster.withdraw] → LP → [Pool.withdraw] → asset → User
//! ```
//!
//! ## Accounting Invariant
//!
//! After every completed call:
//! `sum(position.staked_lp) == TotalStakedLp == StakingMaster.balance_of(vault, pid)`.
//! Mutating calls verify the second equality before returning.
//!
//! ## Atomicity
//!
//! Every mutating call either completes or returns a `VaultError`. Returning
//! an error makes the host discard all storage writes and token movements of
//! the invocation, including those made inside the pool, router and staking
//! contracts.

#![no_std]

use soroban_sdk::{contract, contractimpl, log, token, Address, Env, Vec};

mod allocation;
mod error;
mod events;
mod interfaces;
mod storage;

#[cfg(test)]
mod testutils;

pub use error::VaultError;
pub use events::{
    CompoundEvent, DepositEvent, PauseEvent, RouterUpdatedEvent, VaultInitializedEvent,
    WithdrawEvent,
};
pub use interfaces::{PoolError, RouterError, StakingError};
pub use storage::{UserPosition, VaultConfig};

use interfaces::{PoolClient, RouterClient, StakingMasterClient};
use storage::ReentrancyGuard;

/// Ledgers an allowance granted to a collaborator stays valid. Collaborators
/// consume it within the same invocation.
const APPROVAL_LEDGERS: u32 = 100;

const CONTRACT_VERSION: u32 = 1;

/// Upper bound on simultaneously open positions. `auto_compound` reads and
/// writes one persistent entry per open position on top of roughly fifteen
/// entries for the collaborators and tokens, and the whole footprint has to
/// fit the network's per-transaction ledger-entry limits.
pub const MAX_OPEN_POSITIONS: u32 = 10;


// ============================================================================
// CONTRACT
// ============================================================================

/// Auto-compounding LP staking vault.
///
/// # Security Model
///
/// - Users can only deposit from and withdraw to their own address (`require_auth()`)
/// - `auto_compound` is permissionless and only ever adds to positions
/// - Only the admin can pause, rotate the reward router or hand over admin rights
/// - Mutating calls hold a reentrancy lock and verify the staking balance on exit
#[contract]
pub struct AutoCompoundVault;

#[contractimpl]
impl AutoCompoundVault {

    // ==========================================================================
    // INITIALIZATION
    // ==========================================================================

    /// Wires the vault to its collaborators.
    ///
    /// Resolves the staking pool id of `lp_token` once and stores it with the
    /// rest of the configuration.
    ///
    /// # Errors
    /// - `AlreadyInitialized` if called a second time
    ///
    /// # Events
    /// Emits `VaultInitializedEvent` under `init`.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        env: Env,
        admin: Address,
        asset: Address,
        reward_token: Address,
        lp_token: Address,
        pool: Address,
        staking: Address,
        router: Address,
    ) -> Result<(), VaultError> {
        if storage::is_initialized(&env) {
            return Err(VaultError::AlreadyInitialized);
        }
        admin.require_auth();

        let pid = StakingMasterClient::new(&env, &staking).get_asset_pid(&lp_token);
        let config = VaultConfig {
            admin: admin.clone(),
            asset: asset.clone(),
            reward_token,
            lp_token: lp_token.clone(),
            pool,
            staking,
            router,
            pid,
        };

        storage::set_config(&env, &config);
        storage::set_total_staked_lp(&env, 0);
        storage::set_pending_reward(&env, 0);
        storage::set_paused(&env, false);
        storage::set_version(&env, CONTRACT_VERSION);
        storage::extend_instance_ttl(&env);

        events::initialized(
            &env,
            VaultInitializedEvent {
                admin,
                asset,
                lp_token,
                pid,
            },
        );
        Ok(())
    }


    // ==========================================================================
    // CORE LIFECYCLE - DEPOSIT
    // ==========================================================================

    /// Converts `amount` of the caller's base asset to LP and stakes it.
    ///
    /// The caller must have approved the vault for at least `amount` on the
    /// base asset. The position is credited with the LP the pool actually
    /// minted, measured as the vault's LP balance change.
    ///
    /// # Arguments
    /// * `user` - Depositor, must authorize
    /// * `amount` - Base asset to convert
    /// * `deadline` - Last ledger timestamp at which the deposit may execute
    ///
    /// # Returns
    /// The LP credited to `user`.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount <= 0`
    /// - `DeadlineExpired` if the ledger is past `deadline`
    /// - `InsufficientAllowance` / `InsufficientFunds` if the asset cannot be pulled
    /// - `PoolOperationFailed` if the pool rejects the deposit
    /// - `StakingOperationFailed` if the staking master rejects the LP
    /// - `TooManyPositions` if `user` has no open position and the vault is full
    ///
    /// # Events
    /// Emits `DepositEvent` under `deposit`.
    pub fn deposit_and_stake(
        env: Env,
        user: Address,
        amount: i128,
        deadline: u64,
    ) -> Result<i128, VaultError> {
        user.require_auth();
        let config = Self::load_active_config(&env)?;
        Self::require_positive_amount(amount)?;
        Self::require_before_deadline(&env, deadline)?;
        let _guard = ReentrancyGuard::acquire(&env)?;

        let vault = env.current_contract_address();
        let asset = token::Client::new(&env, &config.asset);
        if asset.allowance(&user, &vault) < amount {
            return Err(VaultError::InsufficientAllowance);
        }
        if asset.balance(&user) < amount {
            return Err(VaultError::InsufficientFunds);
        }
        asset.transfer_from(&vault, &user, &vault, &amount);

        let lp_received = Self::convert_to_lp(&env, &config, amount, deadline)?;
        Self::stake(&env, &config, lp_received)?;
        Self::credit(&env, &user, lp_received)?;
        Self::require_in_sync(&env, &config)?;

        events::deposited(
            &env,
            DepositEvent {
                user,
                amount,
                lp_received,
            },
        );
        Ok(lp_received)
    }


    // ==========================================================================
    // CORE LIFECYCLE - COMPOUND
    // ==========================================================================

    /// Harvests the vault's staking rewards and restakes them for everyone.
    ///
    /// Rewards are swapped to the base asset through the configured router,
    /// deposited into the pool, and the resulting LP staked. The LP increase
    /// is split across every position in proportion to its share of
    /// `TotalStakedLp`, with rounding remainders going to the largest
    /// fractional parts (lowest position id on ties), so the increments sum
    /// exactly to the LP added.
    ///
    /// Rewards the staking master paid out during earlier deposits and
    /// withdrawals are compounded together with the fresh harvest.
    ///
    /// # Returns
    /// The LP added to the pooled stake; 0 when there was nothing to compound.
    ///
    /// # Errors
    /// - `StakingOperationFailed` if the harvest or restake is rejected
    /// - `PoolOperationFailed` if the reward cannot be converted to LP
    ///
    /// # Events
    /// Emits `CompoundEvent` under `compound` unless the call was a no-op.
    ///
    /// # Security
    /// - Permissionless; the caller gains nothing beyond its own position's share
    pub fn auto_compound(env: Env) -> Result<i128, VaultError> {
        let config = Self::load_active_config(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;

        let total = storage::get_total_staked_lp(&env);
        if total == 0 {
            log!(&env, "auto_compound: no stake to compound");
            return Ok(0);
        }

        let (_, harvested) = Self::unstake(&env, &config, 0)?;
        let reward = storage::get_pending_reward(&env)
            .checked_add(harvested)
            .ok_or(VaultError::ArithmeticOverflow)?;
        if reward == 0 {
            log!(&env, "auto_compound: nothing harvested");
            return Ok(0);
        }

        // Restaking may pay out more reward; `stake` tracks it from zero.
        storage::set_pending_reward(&env, 0);

        // Nothing here is caller-supplied, so the conversion must land in this ledger.
        let deadline = env.ledger().timestamp();
        let base = Self::swap_reward(&env, &config, reward, deadline)?;
        let lp_added = Self::convert_to_lp(&env, &config, base, deadline)?;
        Self::stake(&env, &config, lp_added)?;
        Self::distribute(&env, total, lp_added)?;

        let total_staked_lp = storage::get_total_staked_lp(&env);
        Self::require_in_sync(&env, &config)?;

        events::compounded(
            &env,
            CompoundEvent {
                reward_harvested: reward,
                lp_added,
                total_staked_lp,
            },
        );
        Ok(lp_added)
    }


    // ==========================================================================
    // CORE LIFECYCLE - WITHDRAW
    // ==========================================================================

    /// Unstakes `lp_amount` of the caller's LP and redeems it for base asset.
    ///
    /// The position and total are debited before any external call. A
    /// position withdrawn down to zero is closed. Rewards the staking master
    /// pays out on unstake are kept as pending reward for the next compound.
    ///
    /// Those rewards are shared among the positions open when the next
    /// compound runs. A user leaving the vault entirely should call
    /// `auto_compound` first, or their share of the reward accrued so far
    /// goes to the remaining depositors.
    ///
    /// # Arguments
    /// * `user` - Position owner, must authorize
    /// * `lp_amount` - LP to withdraw, at most the caller's staked LP
    /// * `min_out` - Minimum base asset the caller accepts
    /// * `deadline` - Last ledger timestamp at which the withdrawal may execute
    ///
    /// # Returns
    /// The base asset transferred to `user`.
    ///
    /// # Errors
    /// - `InvalidAmount` if `lp_amount <= 0` or `min_out < 0`
    /// - `InsufficientStake` if `lp_amount` exceeds the caller's position
    /// - `DeadlineExpired` if the ledger is past `deadline`
    /// - `SlippageExceeded` if the pool pays out less than `min_out`
    /// - `StakingOperationFailed` / `PoolOperationFailed` on collaborator failure
    ///
    /// # Events
    /// Emits `WithdrawEvent` under `withdraw`.
    pub fn withdraw_from_pool(
        env: Env,
        user: Address,
        lp_amount: i128,
        min_out: i128,
        deadline: u64,
    ) -> Result<i128, VaultError> {
        user.require_auth();
        let config = Self::load_active_config(&env)?;
        Self::require_positive_amount(lp_amount)?;
        if min_out < 0 {
            return Err(VaultError::InvalidAmount);
        }
        Self::require_before_deadline(&env, deadline)?;
        let _guard = ReentrancyGuard::acquire(&env)?;

        Self::debit(&env, &user, lp_amount)?;

        let (lp_returned, reward) = Self::unstake(&env, &config, lp_amount)?;
        if lp_returned != lp_amount {
            return Err(VaultError::StakingOperationFailed);
        }
        if reward > 0 {
            let pending = storage::get_pending_reward(&env)
                .checked_add(reward)
                .ok_or(VaultError::ArithmeticOverflow)?;
            storage::set_pending_reward(&env, pending);
        }

        let amount_received = Self::redeem_lp(&env, &config, lp_amount, min_out, deadline)?;
        if amount_received < min_out {
            return Err(VaultError::SlippageExceeded);
        }
        token::Client::new(&env, &config.asset).transfer(
            &env.current_contract_address(),
            &user,
            &amount_received,
        );
        Self::require_in_sync(&env, &config)?;

        events::withdrawn(
            &env,
            WithdrawEvent {
                user,
                lp_amount,
                amount_received,
            },
        );
        Ok(amount_received)
    }


    // ==========================================================================
    // ADMINISTRATIVE
    // ==========================================================================

    /// Disables deposits, withdrawals and compounding.
    ///
    /// # Errors
    /// - `AlreadyPaused` if the vault is already paused
    ///
    /// # Events
    /// Emits `PauseEvent` under `pause`.
    pub fn pause(env: Env) -> Result<(), VaultError> {
        let config = storage::get_config(&env)?;
        config.admin.require_auth();

        if storage::is_paused(&env) {
            return Err(VaultError::AlreadyPaused);
        }
        storage::set_paused(&env, true);
        events::paused(&env, config.admin);
        Ok(())
    }

    /// Re-enables the vault.
    ///
    /// # Errors
    /// - `NotPaused` if the vault is running
    ///
    /// # Events
    /// Emits `PauseEvent` under `unpause`.
    pub fn unpause(env: Env) -> Result<(), VaultError> {
        let config = storage::get_config(&env)?;
        config.admin.require_auth();

        if !storage::is_paused(&env) {
            return Err(VaultError::NotPaused);
        }
        storage::set_paused(&env, false);
        events::unpaused(&env, config.admin);
        Ok(())
    }

    /// Points reward conversion at a different router.
    ///
    /// # Events
    /// Emits `RouterUpdatedEvent` under `router`.
    pub fn set_router(env: Env, router: Address) -> Result<(), VaultError> {
        let mut config = storage::get_config(&env)?;
        config.admin.require_auth();

        let old_router = config.router.clone();
        config.router = router.clone();
        storage::set_config(&env, &config);
        storage::extend_instance_ttl(&env);

        events::router_updated(
            &env,
            RouterUpdatedEvent {
                old_router,
                new_router: router,
            },
        );
        Ok(())
    }

    /// Hands admin rights to `new_admin`. Both addresses must authorize.
    pub fn set_admin(env: Env, new_admin: Address) -> Result<(), VaultError> {
        let mut config = storage::get_config(&env)?;
        config.admin.require_auth();
        new_admin.require_auth();

        config.admin = new_admin;
        storage::set_config(&env, &config);
        Ok(())
    }


    // ==========================================================================
    // READ FUNCTIONS
    // ==========================================================================

    /// Returns the LP attributed to `owner`, or 0 if it has no open position.
    pub fn get_staked_lp(env: Env, owner: Address) -> i128 {
        storage::get_position(&env, &owner)
            .map(|position| position.staked_lp)
            .unwrap_or(0)
    }

    pub fn get_position(env: Env, owner: Address) -> Option<UserPosition> {
        storage::get_position(&env, &owner)
    }

    /// Returns the sum of all positions, which equals the vault's stake at
    /// the staking master.
    pub fn get_total_staked_lp(env: Env) -> i128 {
        storage::get_total_staked_lp(&env)
    }

    /// Returns reward tokens held by the vault awaiting the next compound.
    pub fn get_pending_reward(env: Env) -> i128 {
        storage::get_pending_reward(&env)
    }

    /// Returns the owners of open positions, in position-id order.
    pub fn get_depositors(env: Env) -> Vec<Address> {
        storage::get_depositors(&env)
    }

    pub fn get_config(env: Env) -> Result<VaultConfig, VaultError> {
        storage::get_config(&env)
    }

    pub fn is_paused(env: Env) -> bool {
        storage::is_paused(&env)
    }

    pub fn get_version(env: Env) -> u32 {
        storage::get_version(&env)
    }


    // ==========================================================================
    // INTERNAL VALIDATION HELPERS
    // ==========================================================================

    /// Loads the config of an initialized, unpaused vault and bumps its TTL.
    fn load_active_config(env: &Env) -> Result<VaultConfig, VaultError> {
        let config = storage::get_config(env)?;
        if storage::is_paused(env) {
            return Err(VaultError::Paused);
        }
        storage::extend_instance_ttl(env);
        Ok(config)
    }

    #[inline]
    fn require_positive_amount(amount: i128) -> Result<(), VaultError> {
        if amount <= 0 {
            return Err(VaultError::InvalidAmount);
        }
        Ok(())
    }

    #[inline]
    fn require_before_deadline(env: &Env, deadline: u64) -> Result<(), VaultError> {
        if env.ledger().timestamp() > deadline {
            return Err(VaultError::DeadlineExpired);
        }
        Ok(())
    }

    /// Checks `TotalStakedLp` against the staking master's record of the vault.
    fn require_in_sync(env: &Env, config: &VaultConfig) -> Result<(), VaultError> {
        let staked = StakingMasterClient::new(env, &config.staking)
            .balance_of(&env.current_contract_address(), &config.pid);
        if staked != storage::get_total_staked_lp(env) {
            return Err(VaultError::AccountingMismatch);
        }
        Ok(())
    }


    // ==========================================================================
    // INTERNAL LEDGER
    // ==========================================================================

    /// Adds `lp` to `owner`'s position, opening one if it has none.
    fn credit(env: &Env, owner: &Address, lp: i128) -> Result<(), VaultError> {
        let mut position = match storage::get_position(env, owner) {
            Some(position) => position,
            None => {
                let mut depositors = storage::get_depositors(env);
                if depositors.len() >= MAX_OPEN_POSITIONS {
                    return Err(VaultError::TooManyPositions);
                }
                // Ids only grow, so appending keeps the registry in id order.
                let position = UserPosition {
                    owner: owner.clone(),
                    id: storage::next_position_id(env)?,
                    staked_lp: 0,
                };
                depositors.push_back(owner.clone());
                storage::set_depositors(env, &depositors);
                position
            }
        };
        position.staked_lp = position
            .staked_lp
            .checked_add(lp)
            .ok_or(VaultError::ArithmeticOverflow)?;
        storage::set_position(env, &position);

        let total = storage::get_total_staked_lp(env)
            .checked_add(lp)
            .ok_or(VaultError::ArithmeticOverflow)?;
        storage::set_total_staked_lp(env, total);
        Ok(())
    }

    /// Takes `lp` from `owner`'s position, closing it when nothing is left.
    fn debit(env: &Env, owner: &Address, lp: i128) -> Result<(), VaultError> {
        let mut position = match storage::get_position(env, owner) {
            Some(position) if position.staked_lp >= lp => position,
            _ => return Err(VaultError::InsufficientStake),
        };
        position.staked_lp -= lp;
        if position.staked_lp == 0 {
            storage::remove_position(env, owner);
            let mut depositors = storage::get_depositors(env);
            let index = depositors
                .first_index_of(owner)
                .ok_or(VaultError::AccountingMismatch)?;
            depositors.remove(index);
            storage::set_depositors(env, &depositors);
        } else {
            storage::set_position(env, &position);
        }

        let total = storage::get_total_staked_lp(env)
            .checked_sub(lp)
            .filter(|total| *total >= 0)
            .ok_or(VaultError::AccountingMismatch)?;
        storage::set_total_staked_lp(env, total);
        Ok(())
    }

    /// Splits `lp_added` across all positions in proportion to their stake.
    fn distribute(env: &Env, total: i128, lp_added: i128) -> Result<(), VaultError> {
        let depositors = storage::get_depositors(env);
        let mut positions: Vec<UserPosition> = Vec::new(env);
        let mut stakes: Vec<i128> = Vec::new(env);
        for owner in depositors.iter() {
            let position =
                storage::get_position(env, &owner).ok_or(VaultError::AccountingMismatch)?;
            if position.staked_lp > 0 {
                stakes.push_back(position.staked_lp);
                positions.push_back(position);
            }
        }

        let shares = allocation::allocate(env, &stakes, total, lp_added)?;
        for (mut position, share) in positions.iter().zip(shares.iter()) {
            if share > 0 {
                position.staked_lp = position
                    .staked_lp
                    .checked_add(share)
                    .ok_or(VaultError::ArithmeticOverflow)?;
                storage::set_position(env, &position);
            }
        }

        let new_total = total
            .checked_add(lp_added)
            .ok_or(VaultError::ArithmeticOverflow)?;
        storage::set_total_staked_lp(env, new_total);
        Ok(())
    }


    // ==========================================================================
    // INTERNAL COLLABORATOR CALLS
    // ==========================================================================

    /// Lets `spender` pull exactly `amount` of `token` from the vault.
    fn approve(env: &Env, token_id: &Address, spender: &Address, amount: i128) {
        let expiration_ledger = env.ledger().sequence() + APPROVAL_LEDGERS;
        token::Client::new(env, token_id).approve(
            &env.current_contract_address(),
            spender,
            &amount,
            &expiration_ledger,
        );
    }

    /// Deposits base asset into the pool and returns the LP the vault received.
    fn convert_to_lp(
        env: &Env,
        config: &VaultConfig,
        amount: i128,
        deadline: u64,
    ) -> Result<i128, VaultError> {
        let vault = env.current_contract_address();
        let lp_token = token::Client::new(env, &config.lp_token);
        let before = lp_token.balance(&vault);

        Self::approve(env, &config.asset, &config.pool, amount);
        match PoolClient::new(env, &config.pool).try_deposit(&vault, &amount, &1, &deadline) {
            Ok(Ok(_)) => {}
            Err(Ok(PoolError::DeadlineExpired)) => return Err(VaultError::DeadlineExpired),
            _ => return Err(VaultError::PoolOperationFailed),
        }

        let minted = lp_token.balance(&vault) - before;
        if minted <= 0 {
            return Err(VaultError::PoolOperationFailed);
        }
        Ok(minted)
    }

    /// Redeems LP held by the vault and returns the base asset received.
    fn redeem_lp(
        env: &Env,
        config: &VaultConfig,
        lp_amount: i128,
        min_out: i128,
        deadline: u64,
    ) -> Result<i128, VaultError> {
        let vault = env.current_contract_address();
        let asset = token::Client::new(env, &config.asset);
        let before = asset.balance(&vault);

        Self::approve(env, &config.lp_token, &config.pool, lp_amount);
        match PoolClient::new(env, &config.pool).try_withdraw(&vault, &lp_amount, &min_out, &deadline)
        {
            Ok(Ok(_)) => {}
            Err(Ok(PoolError::DeadlineExpired)) => return Err(VaultError::DeadlineExpired),
            Err(Ok(PoolError::SlippageExceeded)) => return Err(VaultError::SlippageExceeded),
            _ => return Err(VaultError::PoolOperationFailed),
        }

        Ok(asset.balance(&vault) - before)
    }

    /// Converts `reward` to base asset through the router.
    fn swap_reward(
        env: &Env,
        config: &VaultConfig,
        reward: i128,
        deadline: u64,
    ) -> Result<i128, VaultError> {
        if config.reward_token == config.asset {
            return Ok(reward);
        }

        let vault = env.current_contract_address();
        Self::approve(env, &config.reward_token, &config.router, reward);
        let swapped = RouterClient::new(env, &config.router).try_swap_exact_in(
            &vault,
            &config.reward_token,
            &config.asset,
            &reward,
            &1,
            &deadline,
        );
        match swapped {
            Ok(Ok(out)) if out > 0 => Ok(out),
            _ => Err(VaultError::PoolOperationFailed),
        }
    }

    /// Stakes `lp` held by the vault. Reward the staking master pays out on
    /// deposit is measured as the vault's reward balance change and added to
    /// the pending reward.
    fn stake(env: &Env, config: &VaultConfig, lp: i128) -> Result<(), VaultError> {
        let vault = env.current_contract_address();
        let reward_token = token::Client::new(env, &config.reward_token);
        let before = reward_token.balance(&vault);

        Self::approve(env, &config.lp_token, &config.staking, lp);
        match StakingMasterClient::new(env, &config.staking).try_deposit(&vault, &config.pid, &lp) {
            Ok(Ok(())) => {}
            _ => return Err(VaultError::StakingOperationFailed),
        }

        let paid = reward_token.balance(&vault) - before;
        if paid > 0 {
            let pending = storage::get_pending_reward(env)
                .checked_add(paid)
                .ok_or(VaultError::ArithmeticOverflow)?;
            storage::set_pending_reward(env, pending);
        }
        Ok(())
    }

    /// Unstakes `lp` (0 to only harvest). Returns `(lp_returned, reward_harvested)`.
    fn unstake(env: &Env, config: &VaultConfig, lp: i128) -> Result<(i128, i128), VaultError> {
        match StakingMasterClient::new(env, &config.staking).try_withdraw(
            &env.current_contract_address(),
            &config.pid,
            &lp,
        ) {
            Ok(Ok((lp_returned, reward))) if reward >= 0 => Ok((lp_returned, reward)),
            _ => Err(VaultError::StakingOperationFailed),
        }
    }
}
