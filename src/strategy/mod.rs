//! Strategy engine: per-strategy staking state, wager progression,
//! the cover-loss overlay and automatic strategy switching.

pub mod cover;
pub mod progression;
pub mod random;
pub mod switch;

use rand::Rng;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::types::{payout_multiplier, Outcome, StrategyId};
use random::{RaiseBounds, RandomizedMode};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Parameters shared by every strategy. Built once from the config file and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct StrategyParams {
    /// Smallest wager, in units. Every strategy starts and resets here.
    pub base_bet: u64,
    /// Optional ceiling on a single wager, in units.
    pub max_bet: Option<u64>,
    /// Default win chance in percent.
    pub chance: f64,
    /// Martingale loss multiplier.
    pub multiplier: Decimal,
    /// D'Alembert step as a fraction of the base bet.
    pub dalembert_step: Decimal,
    pub jackpot_raise: RaiseBounds,
    /// Win chance used while Jackpot Hunter is active.
    pub jackpot_chance: Option<f64>,
    pub high_risk_raise: RaiseBounds,
    /// Win chance used while High-Risk Pulse is active.
    pub high_risk_chance: Option<f64>,
    /// Number of bets between two pulses.
    pub high_risk_interval: u32,
    pub high_risk_pulse_factor: Decimal,
    pub randomized_mode: RandomizedMode,
    /// Growth bounds used by [`RandomizedMode::Multiplier`].
    pub randomized_raise: RaiseBounds,
    /// Raise wagers after a loss so a win recovers the accumulated loss.
    pub cover_loss: bool,
}

impl Default for StrategyParams {
    fn default() -> Self {
        use rust_decimal_macros::dec;

        Self {
            base_bet: 1,
            max_bet: None,
            chance: 49.5,
            multiplier: dec!(2.0),
            dalembert_step: dec!(0.25),
            jackpot_raise: RaiseBounds::new(1.02, 1.05),
            jackpot_chance: None,
            high_risk_raise: RaiseBounds::new(1.10, 1.20),
            high_risk_chance: None,
            high_risk_interval: 20,
            high_risk_pulse_factor: dec!(5.0),
            randomized_mode: RandomizedMode::Uniform,
            randomized_raise: RaiseBounds::new(1.02, 1.35),
            cover_loss: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy state
// ---------------------------------------------------------------------------

/// Variant-specific progression data. One case per strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Martingale,
    Fibonacci {
        /// Position in 1, 1, 2, 3, 5, ... (never negative by construction).
        index: u32,
    },
    Dalembert,
    Flat,
    JackpotHunter,
    HighRiskPulse {
        /// Bets settled since the last pulse; wraps at the pulse interval.
        pulse_counter: u32,
        /// Un-pulsed wager that normal growth continues from.
        baseline: u64,
    },
    Randomized {
        /// Wager of the most recent losing bet in this strategy's lifetime.
        last_loss_amount: Option<u64>,
    },
}

impl Variant {
    fn fresh(id: StrategyId, base_bet: u64) -> Self {
        match id {
            StrategyId::Martingale => Variant::Martingale,
            StrategyId::Fibonacci => Variant::Fibonacci { index: 0 },
            StrategyId::Dalembert => Variant::Dalembert,
            StrategyId::Flat => Variant::Flat,
            StrategyId::JackpotHunter => Variant::JackpotHunter,
            StrategyId::HighRiskPulse => Variant::HighRiskPulse {
                pulse_counter: 0,
                baseline: base_bet,
            },
            StrategyId::Randomized => Variant::Randomized {
                last_loss_amount: None,
            },
        }
    }

    pub fn id(&self) -> StrategyId {
        match self {
            Variant::Martingale => StrategyId::Martingale,
            Variant::Fibonacci { .. } => StrategyId::Fibonacci,
            Variant::Dalembert => StrategyId::Dalembert,
            Variant::Flat => StrategyId::Flat,
            Variant::JackpotHunter => StrategyId::JackpotHunter,
            Variant::HighRiskPulse { .. } => StrategyId::HighRiskPulse,
            Variant::Randomized { .. } => StrategyId::Randomized,
        }
    }
}

/// State of the active strategy. Replaced wholesale after every outcome and
/// on every switch, never patched in place.
///
/// Invariant: `current_wager >= base_bet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyState {
    pub base_bet: u64,
    pub current_wager: u64,
    pub variant: Variant,
}

impl StrategyState {
    /// Fresh state for `id`, starting at the base bet.
    pub fn new(id: StrategyId, base_bet: u64) -> Self {
        Self {
            base_bet,
            current_wager: base_bet,
            variant: Variant::fresh(id, base_bet),
        }
    }

    pub fn id(&self) -> StrategyId {
        self.variant.id()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Computes the next wager for the active strategy.
///
/// The engine itself is immutable; all progression lives in the
/// [`StrategyState`] values it consumes and returns, and all randomness comes
/// from the caller's RNG so replays with a seeded RNG are deterministic.
pub struct StrategyEngine {
    params: StrategyParams,
}

impl StrategyEngine {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }

    /// Access the strategy parameters.
    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Fresh state for a newly activated strategy.
    pub fn initial_state(&self, id: StrategyId) -> StrategyState {
        StrategyState::new(id, self.params.base_bet)
    }

    /// Win chance to bet at while `id` is active.
    pub fn chance_for(&self, id: StrategyId) -> f64 {
        let override_chance = match id {
            StrategyId::JackpotHunter => self.params.jackpot_chance,
            StrategyId::HighRiskPulse => self.params.high_risk_chance,
            _ => None,
        };
        override_chance.unwrap_or(self.params.chance)
    }

    /// Compute the next wager and the state that replaces `state`.
    ///
    /// With no previous outcome (before the first bet) this returns the
    /// strategy's base bet and a fresh state. `cover_loss_target` is the
    /// accumulated loss, in units, that the cover-loss overlay should win
    /// back; zero disables the overlay for this bet.
    pub fn next_wager<R: Rng + ?Sized>(
        &self,
        previous: Option<&Outcome>,
        state: &StrategyState,
        cover_loss_target: u64,
        rng: &mut R,
    ) -> (u64, StrategyState) {
        let Some(outcome) = previous else {
            let fresh = self.initial_state(state.id());
            return (fresh.current_wager, fresh);
        };

        let p = &self.params;
        let base = p.base_bet;
        let current = state.current_wager;
        let won = outcome.won;

        let (raw, variant) = match state.variant {
            Variant::Martingale => (
                progression::martingale(current, won, base, p.multiplier),
                Variant::Martingale,
            ),
            Variant::Fibonacci { index } => {
                let index = progression::fibonacci_index(index, won);
                (
                    progression::fibonacci_wager(base, index),
                    Variant::Fibonacci { index },
                )
            }
            Variant::Dalembert => (
                progression::dalembert(current, won, base, p.dalembert_step),
                Variant::Dalembert,
            ),
            Variant::Flat => (base, Variant::Flat),
            Variant::JackpotHunter => (
                random::jackpot_hunter(current, won, base, &p.jackpot_raise, rng),
                Variant::JackpotHunter,
            ),
            Variant::HighRiskPulse {
                pulse_counter,
                baseline,
            } => {
                let step = random::high_risk_pulse(
                    pulse_counter,
                    baseline,
                    won,
                    base,
                    &random::PulseParams {
                        raise: p.high_risk_raise,
                        interval: p.high_risk_interval,
                        factor: p.high_risk_pulse_factor,
                    },
                    rng,
                );
                if step.pulsed {
                    debug!(wager = step.wager, baseline = step.baseline, "Pulse wager");
                }
                (
                    step.wager,
                    Variant::HighRiskPulse {
                        pulse_counter: step.pulse_counter,
                        baseline: step.baseline,
                    },
                )
            }
            Variant::Randomized { .. } => {
                let (wager, last_loss_amount) = random::randomized(
                    current,
                    outcome,
                    base,
                    p.randomized_mode,
                    &p.randomized_raise,
                    rng,
                );
                (wager, Variant::Randomized { last_loss_amount })
            }
        };

        let mut wager = self.clamp_floor(raw);

        if p.cover_loss && cover_loss_target > 0 {
            let multiplier = payout_multiplier(self.chance_for(variant.id()));
            if let Some(cover) = cover::cover_wager(cover_loss_target, base, multiplier) {
                if cover > wager {
                    debug!(
                        strategy = %variant.id(),
                        raw = wager,
                        cover,
                        target = cover_loss_target,
                        "Cover-loss overlay raised wager"
                    );
                    wager = cover;
                }
            }
        }

        let wager = self.clamp_ceiling(wager);

        (
            wager,
            StrategyState {
                base_bet: base,
                current_wager: wager,
                variant,
            },
        )
    }

    /// A wager is never below the base bet (and so never zero).
    fn clamp_floor(&self, wager: u64) -> u64 {
        if wager < self.params.base_bet {
            debug!(wager, base_bet = self.params.base_bet, "Wager raised to base bet");
            self.params.base_bet
        } else {
            wager
        }
    }

    fn clamp_ceiling(&self, wager: u64) -> u64 {
        match self.params.max_bet {
            Some(max) if wager > max => {
                warn!(wager, max_bet = max, "Wager capped at max_bet");
                max
            }
            _ => wager,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
