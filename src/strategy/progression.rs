//! Deterministic progressions: Martingale, Fibonacci and D'Alembert.
//!
//! All amounts are integer units. Factor multiplications go through
//! `Decimal` and round half-up, so replays never drift.

use rust_decimal::Decimal;

use crate::types::scale_units;

/// Martingale: multiply the wager on a loss, back to base on a win.
pub fn martingale(current: u64, won: bool, base: u64, multiplier: Decimal) -> u64 {
    if won {
        base
    } else {
        scale_units(current, multiplier)
    }
}

/// Advance the Fibonacci index by one on a loss, retreat by two on a win.
/// The index floors at zero.
pub fn fibonacci_index(index: u32, won: bool) -> u32 {
    if won {
        index.saturating_sub(2)
    } else {
        index.saturating_add(1)
    }
}

/// The `n`-th term of 1, 1, 2, 3, 5, 8, ... saturating at `u64::MAX`.
pub fn fib(n: u32) -> u64 {
    let (mut a, mut b) = (1_u64, 1_u64);
    for _ in 0..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    a
}

/// Wager at a Fibonacci index: `base × fib(index)`.
pub fn fibonacci_wager(base: u64, index: u32) -> u64 {
    base.saturating_mul(fib(index))
}

/// D'Alembert: add one step on a loss, remove one on a win, never below base.
/// The step is `base × step_factor`, at least one unit.
pub fn dalembert(current: u64, won: bool, base: u64, step_factor: Decimal) -> u64 {
    let step = scale_units(base, step_factor).max(1);
    if won {
        current.saturating_sub(step).max(base)
    } else {
        current.saturating_add(step)
    }
}
