//! Bet execution backends.
//!
//! Defines the `BetExecutor` trait and provides implementations for:
//! - WolfBet: real-money dice bets over the HTTP API
//! - Simulated: local seeded dice for dry runs

pub mod simulated;
pub mod wolfbet;

use async_trait::async_trait;
use rust_decimal::prelude::*;

use crate::types::{clamp_chance, payout_multiplier, Direction, Outcome, PlacementError};

/// A single dice bet, fully specified.
#[derive(Debug, Clone, PartialEq)]
pub struct BetRequest {
    /// Stake in units.
    pub amount: u64,
    pub currency: String,
    /// Win chance in percent, already capped to the game's range.
    pub chance: f64,
    pub direction: Direction,
    /// Roll threshold: `chance` for under bets, `100 − chance` for over bets.
    pub bet_value: f64,
    pub multiplier: Decimal,
}

impl BetRequest {
    pub fn new(amount: u64, currency: &str, chance: f64, direction: Direction) -> Self {
        let chance = clamp_chance(chance);
        let bet_value = match direction {
            Direction::Under => chance,
            Direction::Over => clamp_chance(100.0 - chance),
        };
        Self {
            amount,
            currency: currency.to_lowercase(),
            chance,
            direction,
            bet_value,
            multiplier: payout_multiplier(chance),
        }
    }

    /// Whether `roll` wins this bet.
    pub fn wins(&self, roll: f64) -> bool {
        match self.direction {
            Direction::Under => roll < self.bet_value,
            Direction::Over => roll > self.bet_value,
        }
    }

    pub fn multiplier_f64(&self) -> f64 {
        self.multiplier.to_f64().unwrap_or(0.0)
    }
}

/// Abstraction over dice bet backends.
///
/// A failed call means the bet never happened: callers must not treat an
/// error as a loss.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BetExecutor: Send + Sync {
    /// Place one bet and wait for it to settle.
    async fn place_bet(&self, request: &BetRequest) -> Result<Outcome, PlacementError>;

    /// Available balance in `currency`, in coins.
    async fn balance(&self, currency: &str) -> Result<Decimal, PlacementError>;

    /// Backend name for logging and identification.
    fn name(&self) -> &'static str;
}
