//! Local dice simulator for dry runs.
//!
//! Rolls 0.00–99.99 from a seeded RNG and settles against an in-memory
//! balance, so whole sessions can be replayed without touching the API.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::*;
use tracing::debug;

use super::{BetExecutor, BetRequest};
use crate::types::{from_units, scale_units, signed, Outcome, PlacementError};

struct Table {
    rng: StdRng,
    /// Remaining balance in units.
    balance: i64,
}

/// In-process dice game with a 1% house edge.
pub struct SimulatedDice {
    table: Mutex<Table>,
    currency: String,
}

impl SimulatedDice {
    /// New table holding `balance` units of `currency`.
    pub fn new(currency: &str, balance: i64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            table: Mutex::new(Table { rng, balance }),
            currency: currency.to_lowercase(),
        }
    }

    /// Current balance in units.
    pub fn balance_units(&self) -> i64 {
        self.table.lock().map(|t| t.balance).unwrap_or(0)
    }
}

#[async_trait]
impl BetExecutor for SimulatedDice {
    async fn place_bet(&self, request: &BetRequest) -> Result<Outcome, PlacementError> {
        if request.currency != self.currency {
            return Err(PlacementError::Api {
                status: 400,
                body: format!("unsupported currency `{}`", request.currency),
            });
        }
        if request.amount == 0 {
            return Err(PlacementError::Api {
                status: 422,
                body: "amount must be positive".into(),
            });
        }

        let mut table = self
            .table
            .lock()
            .map_err(|_| PlacementError::Network("simulator state poisoned".into()))?;

        let stake = signed(request.amount);
        if stake > table.balance {
            return Err(PlacementError::Api {
                status: 422,
                body: "insufficient balance".into(),
            });
        }

        let roll = f64::from(table.rng.gen_range(0..10_000u32)) / 100.0;
        let won = request.wins(roll);
        let payout = if won {
            scale_units(request.amount, request.multiplier)
        } else {
            0
        };
        table.balance = table.balance - stake + signed(payout);

        debug!(roll, won, balance = %from_units(table.balance), "Simulated roll");

        Ok(Outcome {
            bet_id: uuid::Uuid::new_v4().to_string(),
            won,
            wager: request.amount,
            payout,
            multiplier: request.multiplier_f64(),
            chance: request.chance,
            direction: request.direction,
            bet_value: request.bet_value,
            roll,
            timestamp: Utc::now(),
        })
    }

    async fn balance(&self, currency: &str) -> Result<Decimal, PlacementError> {
        if !currency.eq_ignore_ascii_case(&self.currency) {
            return Ok(Decimal::ZERO);
        }
        Ok(from_units(self.balance_units()))
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
