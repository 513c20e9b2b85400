//! Largest-remainder allocation of compounded LP across positions.

use soroban_sdk::{Env, Vec, I256};

use crate::error::VaultError;

/// Splits `added` across `stakes` proportionally to each stake's share of `total`.
///
/// Every entry first receives `floor(stake * added / total)`. The units lost to
/// flooring are then handed out one at a time to the largest remainders; equal
/// remainders go to the lowest index. The returned increments always sum to
/// `added`, and a zero stake never receives anything.
///
/// `total` must equal the sum of `stakes`. `stake * added` is formed in 256
/// bits; the share and remainder both fit back into i128 because
/// `stake <= total`.
pub fn allocate(
    env: &Env,
    stakes: &Vec<i128>,
    total: i128,
    added: i128,
) -> Result<Vec<i128>, VaultError> {
    if total <= 0 || added < 0 {
        return Err(VaultError::AccountingMismatch);
    }

    let mut shares: Vec<i128> = Vec::new(env);
    let mut remainders: Vec<i128> = Vec::new(env);
    let mut allocated: i128 = 0;
    let mut seen: i128 = 0;
    let wide_total = I256::from_i128(env, total);
    let wide_added = I256::from_i128(env, added);

    for stake in stakes.iter() {
        if stake < 0 {
            return Err(VaultError::AccountingMismatch);
        }
        let scaled = I256::from_i128(env, stake).mul(&wide_added);
        let share = scaled
            .div(&wide_total)
            .to_i128()
            .ok_or(VaultError::ArithmeticOverflow)?;
        let remainder = scaled
            .rem_euclid(&wide_total)
            .to_i128()
            .ok_or(VaultError::ArithmeticOverflow)?;
        shares.push_back(share);
        remainders.push_back(remainder);
        allocated = allocated
            .checked_add(share)
            .ok_or(VaultError::ArithmeticOverflow)?;
        seen = seen.checked_add(stake).ok_or(VaultError::ArithmeticOverflow)?;
    }
    if seen != total {
        return Err(VaultError::AccountingMismatch);
    }

    // Remainders sum to `leftover * total` and each is below `total`, so at
    // least `leftover` entries have a non-zero remainder.
    let mut leftover = added - allocated;
    while leftover > 0 {
        let mut best: Option<(u32, i128)> = None;
        for (i, remainder) in remainders.iter().enumerate() {
            let better = match best {
                Some((_, top)) => remainder > top,
                None => remainder > 0,
            };
            if better {
                best = Some((i as u32, remainder));
            }
        }
        let (index, _) = best.ok_or(VaultError::AccountingMismatch)?;
        shares.set(index, shares.get_unchecked(index) + 1);
        remainders.set(index, 0);
        leftover -= 1;
    }

    Ok(shares)
}
