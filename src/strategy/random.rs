//! Sampled progressions: Jackpot Hunter, High-Risk Pulse and Randomized.
//!
//! Every function takes the caller's RNG so a seeded RNG replays exactly.

use rand::Rng;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::{scale_units, Outcome};

// ---------------------------------------------------------------------------
// Raise bounds
// ---------------------------------------------------------------------------

/// Inclusive range of multiplicative raise factors, e.g. 1.02–1.05.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaiseBounds {
    pub min: f64,
    pub max: f64,
}

impl RaiseBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Draw a factor uniformly from `[min, max]`, rounded to 6 decimals.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Decimal {
        let factor = if self.max > self.min {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        };
        Decimal::from_f64(factor)
            .map(|d| d.round_dp(6))
            .unwrap_or(Decimal::ONE)
    }
}

/// Apply a sampled raise to `current`.
pub fn raise<R: Rng + ?Sized>(current: u64, bounds: &RaiseBounds, rng: &mut R) -> u64 {
    scale_units(current, bounds.sample(rng))
}

// ---------------------------------------------------------------------------
// Jackpot Hunter
// ---------------------------------------------------------------------------

/// Small sampled raise on a loss, base bet on a win.
pub fn jackpot_hunter<R: Rng + ?Sized>(
    current: u64,
    won: bool,
    base: u64,
    bounds: &RaiseBounds,
    rng: &mut R,
) -> u64 {
    if won {
        base
    } else {
        raise(current, bounds, rng)
    }
}

// ---------------------------------------------------------------------------
// High-Risk Pulse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct PulseParams {
    pub raise: RaiseBounds,
    /// Bets per pulse cycle; treated as 1 if zero.
    pub interval: u32,
    pub factor: Decimal,
}

/// Result of one High-Risk Pulse step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseStep {
    pub wager: u64,
    pub pulse_counter: u32,
    pub baseline: u64,
    pub pulsed: bool,
}

/// Larger sampled raise on a loss. The pulse counter advances on every bet;
/// when it wraps on a loss that single wager is multiplied by the pulse
/// factor while `baseline` keeps the un-pulsed amount growth resumes from.
/// A win resets to base and skips any pulse.
pub fn high_risk_pulse<R: Rng + ?Sized>(
    pulse_counter: u32,
    baseline: u64,
    won: bool,
    base: u64,
    params: &PulseParams,
    rng: &mut R,
) -> PulseStep {
    let interval = params.interval.max(1);
    let pulse_counter = (pulse_counter + 1) % interval;

    if won {
        return PulseStep {
            wager: base,
            pulse_counter,
            baseline: base,
            pulsed: false,
        };
    }

    let grown = raise(baseline.max(base), &params.raise, rng);
    let pulsed = pulse_counter == 0;
    let wager = if pulsed {
        scale_units(grown, params.factor)
    } else {
        grown
    };

    PulseStep {
        wager,
        pulse_counter,
        baseline: grown,
        pulsed,
    }
}

// ---------------------------------------------------------------------------
// Randomized
// ---------------------------------------------------------------------------

/// How the Randomized strategy picks its wager after a loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomizedMode {
    /// Uniform in `(0, last_loss_amount]`.
    #[default]
    Uniform,
    /// Current wager times a factor drawn from the randomized bounds.
    Multiplier,
}

/// Randomized step. Returns the wager and the updated last-loss amount.
/// A win returns the base bet and clears the last loss.
pub fn randomized<R: Rng + ?Sized>(
    current: u64,
    outcome: &Outcome,
    base: u64,
    mode: RandomizedMode,
    bounds: &RaiseBounds,
    rng: &mut R,
) -> (u64, Option<u64>) {
    if outcome.won {
        return (base, None);
    }

    let last_loss = outcome.wager.max(base);
    let wager = match mode {
        RandomizedMode::Uniform => rng.gen_range(1..=last_loss.max(1)),
        RandomizedMode::Multiplier => raise(current, bounds, rng),
    };
    (wager, Some(last_loss))
}
