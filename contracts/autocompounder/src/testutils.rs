#![cfg(test)]
//! Minimal pool, staking master and router contracts for driving the vault
//! in a test `Env`, plus a fixture wiring them to Stellar asset contracts.

use soroban_sdk::{
    testutils::Address as _,
    token::{self, StellarAssetClient},
    Address, Env,
};

use crate::{AutoCompoundVault, AutoCompoundVaultClient};

pub use pool::{MockPool, MockPoolClient};
pub use router::{MockRouter, MockRouterClient};
pub use staking::{MockStaking, MockStakingClient};

// ============================================================================
// POOL
// ============================================================================

pub mod pool {
    use soroban_sdk::{
        contract, contractimpl, contracttype,
        token::{self, StellarAssetClient},
        Address, Env,
    };

    use crate::interfaces::PoolError;

    const BPS: i128 = 10_000;

    #[contracttype]
    enum PoolKey {
        Asset,
        LpToken,
        /// LP minted per unit of asset is `RateNum / RateDen`
        RateNum,
        RateDen,
        /// Cut taken from withdrawals, in basis points
        HaircutBps,
        Failing,
    }

    /// Pool minting LP at a fixed rate. The LP token's admin must be this contract.
    #[contract]
    pub struct MockPool;

    #[contractimpl]
    impl MockPool {
        pub fn init(env: Env, asset: Address, lp_token: Address) {
            let store = env.storage().instance();
            store.set(&PoolKey::Asset, &asset);
            store.set(&PoolKey::LpToken, &lp_token);
            store.set(&PoolKey::RateNum, &1_i128);
            store.set(&PoolKey::RateDen, &1_i128);
            store.set(&PoolKey::HaircutBps, &0_i128);
            store.set(&PoolKey::Failing, &false);
        }

        pub fn set_rate(env: Env, num: i128, den: i128) {
            env.storage().instance().set(&PoolKey::RateNum, &num);
            env.storage().instance().set(&PoolKey::RateDen, &den);
        }

        pub fn set_haircut_bps(env: Env, bps: i128) {
            env.storage().instance().set(&PoolKey::HaircutBps, &bps);
        }

        pub fn set_failing(env: Env, failing: bool) {
            env.storage().instance().set(&PoolKey::Failing, &failing);
        }

        pub fn deposit(
            env: Env,
            from: Address,
            amount: i128,
            min_liquidity: i128,
            deadline: u64,
        ) -> Result<i128, PoolError> {
            from.require_auth();
            Self::check(&env, deadline)?;

            let (num, den) = Self::rate(&env);
            let liquidity = amount * num / den;
            if liquidity <= 0 || liquidity < min_liquidity {
                return Err(PoolError::SlippageExceeded);
            }

            let pool = env.current_contract_address();
            token::Client::new(&env, &Self::asset(&env)).transfer_from(&pool, &from, &pool, &amount);
            StellarAssetClient::new(&env, &Self::lp_token(&env)).mint(&from, &liquidity);
            Ok(liquidity)
        }

        pub fn withdraw(
            env: Env,
            from: Address,
            liquidity: i128,
            min_amount: i128,
            deadline: u64,
        ) -> Result<i128, PoolError> {
            from.require_auth();
            Self::check(&env, deadline)?;

            let (num, den) = Self::rate(&env);
            let haircut: i128 = env.storage().instance().get(&PoolKey::HaircutBps).unwrap();
            let gross = liquidity * den / num;
            let amount = gross - gross * haircut / BPS;
            if amount < min_amount {
                return Err(PoolError::SlippageExceeded);
            }

            let pool = env.current_contract_address();
            let lp = token::Client::new(&env, &Self::lp_token(&env));
            lp.transfer_from(&pool, &from, &pool, &liquidity);
            lp.burn(&pool, &liquidity);
            token::Client::new(&env, &Self::asset(&env)).transfer(&pool, &from, &amount);
            Ok(amount)
        }

        fn check(env: &Env, deadline: u64) -> Result<(), PoolError> {
            if env.ledger().timestamp() > deadline {
                return Err(PoolError::DeadlineExpired);
            }
            if env.storage().instance().get(&PoolKey::Failing).unwrap_or(false) {
                return Err(PoolError::InsufficientLiquidity);
            }
            Ok(())
        }

        fn rate(env: &Env) -> (i128, i128) {
            let store = env.storage().instance();
            (
                store.get(&PoolKey::RateNum).unwrap(),
                store.get(&PoolKey::RateDen).unwrap(),
            )
        }

        fn asset(env: &Env) -> Address {
            env.storage().instance().get(&PoolKey::Asset).unwrap()
        }

        fn lp_token(env: &Env) -> Address {
            env.storage().instance().get(&PoolKey::LpToken).unwrap()
        }
    }
}

// ============================================================================
// STAKING MASTER
// ============================================================================

pub mod staking {
    use soroban_sdk::{contract, contractimpl, contracttype, panic_with_error, token, Address, Env};

    use crate::interfaces::StakingError;

    #[contracttype]
    enum StakingKey {
        RewardToken,
        NextPid,
        Pid(Address),
        LpToken(u32),
        Balance(Address, u32),
        Pending(Address),
        /// Pays pending reward on deposit as well as on withdraw
        PayOnDeposit,
        Failing,
    }

    /// Staking master whose rewards are credited by hand through `accrue`.
    #[contract]
    pub struct MockStaking;

    #[contractimpl]
    impl MockStaking {
        pub fn init(env: Env, reward_token: Address) {
            env.storage().instance().set(&StakingKey::RewardToken, &reward_token);
            env.storage().instance().set(&StakingKey::NextPid, &0_u32);
        }

        pub fn add_pool(env: Env, lp_token: Address) -> u32 {
            let pid: u32 = env.storage().instance().get(&StakingKey::NextPid).unwrap();
            env.storage().instance().set(&StakingKey::Pid(lp_token.clone()), &pid);
            env.storage().instance().set(&StakingKey::LpToken(pid), &lp_token);
            env.storage().instance().set(&StakingKey::NextPid, &(pid + 1));
            pid
        }

        /// Records `amount` reward for `user`. The contract must already hold it.
        pub fn accrue(env: Env, user: Address, amount: i128) {
            let pending = Self::pending_reward(env.clone(), user.clone());
            env.storage()
                .instance()
                .set(&StakingKey::Pending(user), &(pending + amount));
        }

        pub fn pending_reward(env: Env, user: Address) -> i128 {
            env.storage()
                .instance()
                .get(&StakingKey::Pending(user))
                .unwrap_or(0)
        }

        /// Overwrites a staked balance without moving tokens.
        pub fn force_balance(env: Env, user: Address, pid: u32, amount: i128) {
            env.storage()
                .instance()
                .set(&StakingKey::Balance(user, pid), &amount);
        }

        pub fn set_failing(env: Env, failing: bool) {
            env.storage().instance().set(&StakingKey::Failing, &failing);
        }

        pub fn set_pay_on_deposit(env: Env, pay: bool) {
            env.storage().instance().set(&StakingKey::PayOnDeposit, &pay);
        }

        pub fn get_asset_pid(env: Env, lp_token: Address) -> u32 {
            match env.storage().instance().get(&StakingKey::Pid(lp_token)) {
                Some(pid) => pid,
                None => panic_with_error!(&env, StakingError::UnknownPool),
            }
        }

        pub fn deposit(env: Env, from: Address, pid: u32, amount: i128) -> Result<(), StakingError> {
            from.require_auth();
            Self::check(&env)?;
            if amount <= 0 {
                return Err(StakingError::InvalidAmount);
            }
            let lp_token = Self::lp_token(&env, pid)?;

            let staking = env.current_contract_address();
            token::Client::new(&env, &lp_token).transfer_from(&staking, &from, &staking, &amount);
            let balance = Self::balance_of(env.clone(), from.clone(), pid);
            env.storage()
                .instance()
                .set(&StakingKey::Balance(from.clone(), pid), &(balance + amount));

            if env
                .storage()
                .instance()
                .get(&StakingKey::PayOnDeposit)
                .unwrap_or(false)
            {
                Self::pay_pending(&env, &from);
            }
            Ok(())
        }

        pub fn withdraw(
            env: Env,
            to: Address,
            pid: u32,
            amount: i128,
        ) -> Result<(i128, i128), StakingError> {
            to.require_auth();
            Self::check(&env)?;
            if amount < 0 {
                return Err(StakingError::InvalidAmount);
            }
            let lp_token = Self::lp_token(&env, pid)?;
            let balance = Self::balance_of(env.clone(), to.clone(), pid);
            if balance < amount {
                return Err(StakingError::InsufficientBalance);
            }

            let staking = env.current_contract_address();
            if amount > 0 {
                env.storage()
                    .instance()
                    .set(&StakingKey::Balance(to.clone(), pid), &(balance - amount));
                token::Client::new(&env, &lp_token).transfer(&staking, &to, &amount);
            }

            let reward = Self::pay_pending(&env, &to);
            Ok((amount, reward))
        }

        pub fn balance_of(env: Env, user: Address, pid: u32) -> i128 {
            env.storage()
                .instance()
                .get(&StakingKey::Balance(user, pid))
                .unwrap_or(0)
        }

        fn pay_pending(env: &Env, to: &Address) -> i128 {
            let reward = Self::pending_reward(env.clone(), to.clone());
            if reward > 0 {
                env.storage()
                    .instance()
                    .set(&StakingKey::Pending(to.clone()), &0_i128);
                let reward_token: Address = env
                    .storage()
                    .instance()
                    .get(&StakingKey::RewardToken)
                    .unwrap();
                token::Client::new(env, &reward_token).transfer(
                    &env.current_contract_address(),
                    to,
                    &reward,
                );
            }
            reward
        }

        fn check(env: &Env) -> Result<(), StakingError> {
            if env.storage().instance().get(&StakingKey::Failing).unwrap_or(false) {
                return Err(StakingError::InsufficientBalance);
            }
            Ok(())
        }

        fn lp_token(env: &Env, pid: u32) -> Result<Address, StakingError> {
            env.storage()
                .instance()
                .get(&StakingKey::LpToken(pid))
                .ok_or(StakingError::UnknownPool)
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub mod router {
    use soroban_sdk::{contract, contractimpl, contracttype, token, Address, Env};

    use crate::interfaces::RouterError;

    #[contracttype]
    enum RouterKey {
        RateNum,
        RateDen,
        Failing,
    }

    /// Router swapping at a fixed rate out of its own inventory.
    #[contract]
    pub struct MockRouter;

    #[contractimpl]
    impl MockRouter {
        pub fn init(env: Env) {
            env.storage().instance().set(&RouterKey::RateNum, &1_i128);
            env.storage().instance().set(&RouterKey::RateDen, &1_i128);
            env.storage().instance().set(&RouterKey::Failing, &false);
        }

        pub fn set_rate(env: Env, num: i128, den: i128) {
            env.storage().instance().set(&RouterKey::RateNum, &num);
            env.storage().instance().set(&RouterKey::RateDen, &den);
        }

        pub fn set_failing(env: Env, failing: bool) {
            env.storage().instance().set(&RouterKey::Failing, &failing);
        }

        pub fn swap_exact_in(
            env: Env,
            from: Address,
            token_in: Address,
            token_out: Address,
            amount_in: i128,
            min_out: i128,
            deadline: u64,
        ) -> Result<i128, RouterError> {
            from.require_auth();
            if env.ledger().timestamp() > deadline {
                return Err(RouterError::DeadlineExpired);
            }
            if env.storage().instance().get(&RouterKey::Failing).unwrap_or(false) {
                return Err(RouterError::NoRoute);
            }

            let num: i128 = env.storage().instance().get(&RouterKey::RateNum).unwrap();
            let den: i128 = env.storage().instance().get(&RouterKey::RateDen).unwrap();
            let amount_out = amount_in * num / den;
            if amount_out < min_out {
                return Err(RouterError::SlippageExceeded);
            }

            let router = env.current_contract_address();
            token::Client::new(&env, &token_in).transfer_from(&router, &from, &router, &amount_in);
            token::Client::new(&env, &token_out).transfer(&router, &from, &amount_out);
            Ok(amount_out)
        }
    }
}

// ============================================================================
// FIXTURE
// ============================================================================

/// Base asset the router holds for reward swaps.
pub const ROUTER_LIQUIDITY: i128 = 1_000_000_000_000;

pub struct VaultTest<'a> {
    pub env: Env,
    pub admin: Address,
    pub vault_id: Address,
    pub vault: AutoCompoundVaultClient<'a>,
    pub asset: token::Client<'a>,
    pub asset_admin: StellarAssetClient<'a>,
    pub reward: token::Client<'a>,
    pub reward_admin: StellarAssetClient<'a>,
    pub lp: token::Client<'a>,
    pub pool: MockPoolClient<'a>,
    pub staking: MockStakingClient<'a>,
    pub router: MockRouterClient<'a>,
    pub pid: u32,
}

impl<'a> VaultTest<'a> {
    /// Registers an initialized vault with a separate reward token.
    pub fn setup() -> Self {
        Self::build(false)
    }

    /// Registers an initialized vault whose rewards are paid in the base asset.
    pub fn setup_reward_is_asset() -> Self {
        Self::build(true)
    }

    fn build(reward_is_asset: bool) -> Self {
        let env = Env::default();
        env.mock_all_auths();
        env.budget().reset_unlimited();

        let admin = Address::generate(&env);
        let asset_id = env.register_stellar_asset_contract(admin.clone());
        let reward_id = if reward_is_asset {
            asset_id.clone()
        } else {
            env.register_stellar_asset_contract(admin.clone())
        };

        let pool_id = env.register_contract(None, MockPool);
        let lp_id = env.register_stellar_asset_contract(pool_id.clone());
        let staking_id = env.register_contract(None, MockStaking);
        let router_id = env.register_contract(None, MockRouter);
        let vault_id = env.register_contract(None, AutoCompoundVault);

        let pool = MockPoolClient::new(&env, &pool_id);
        let staking = MockStakingClient::new(&env, &staking_id);
        let router = MockRouterClient::new(&env, &router_id);
        pool.init(&asset_id, &lp_id);
        staking.init(&reward_id);
        let pid = staking.add_pool(&lp_id);
        router.init();

        let asset_admin = StellarAssetClient::new(&env, &asset_id);
        asset_admin.mint(&router_id, &ROUTER_LIQUIDITY);

        let vault = AutoCompoundVaultClient::new(&env, &vault_id);
        vault.initialize(
            &admin,
            &asset_id,
            &reward_id,
            &lp_id,
            &pool_id,
            &staking_id,
            &router_id,
        );

        VaultTest {
            asset: token::Client::new(&env, &asset_id),
            asset_admin,
            reward: token::Client::new(&env, &reward_id),
            reward_admin: StellarAssetClient::new(&env, &reward_id),
            lp: token::Client::new(&env, &lp_id),
            env,
            admin,
            vault_id,
            vault,
            pool,
            staking,
            router,
            pid,
        }
    }

    /// Creates a user holding `amount` base asset with the vault approved for all of it.
    pub fn funded_user(&self, amount: i128) -> Address {
        let user = Address::generate(&self.env);
        self.asset_admin.mint(&user, &amount);
        self.approve(&user, amount);
        user
    }

    pub fn approve(&self, user: &Address, amount: i128) {
        let expiration = self.env.ledger().sequence() + 1_000;
        self.asset.approve(user, &self.vault_id, &amount, &expiration);
    }

    /// Funds the staking master and credits `amount` reward to the vault.
    pub fn accrue_reward(&self, amount: i128) {
        self.reward_admin.mint(&self.staking.address, &amount);
        self.staking.accrue(&self.vault_id, &amount);
    }

    /// A deadline comfortably in the future.
    pub fn deadline(&self) -> u64 {
        self.env.ledger().timestamp() + 1_200
    }

    /// Asserts positions, vault total and staking balance agree.
    pub fn assert_conserved(&self) {
        let sum: i128 = self
            .vault
            .get_depositors()
            .iter()
            .map(|owner| self.vault.get_staked_lp(&owner))
            .sum();
        let total = self.vault.get_total_staked_lp();
        assert_eq!(sum, total);
        assert_eq!(self.staking.balance_of(&self.vault_id, &self.pid), total);
        assert_eq!(self.lp.balance(&self.staking.address), total);
    }
}
