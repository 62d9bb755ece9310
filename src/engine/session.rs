//! Session tracker: running profit/loss and take-profit / stop-loss checks.
//!
//! Folds each settled outcome into the session totals and reports whether a
//! threshold was crossed. Ending the session is the runner's decision.

use tracing::{debug, info};

use crate::types::{from_units, Outcome, SessionSignal, SessionState};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Session thresholds in signed units. A threshold of zero is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Stop once cumulative profit reaches this (positive) amount.
    pub take_profit: i64,
    /// Stop once cumulative profit falls to this (negative) amount.
    pub stop_loss: i64,
}

impl SessionLimits {
    pub fn unlimited() -> Self {
        Self {
            take_profit: 0,
            stop_loss: 0,
        }
    }

    /// Signal for a given cumulative profit.
    pub fn check(&self, profit: i64) -> SessionSignal {
        if self.take_profit > 0 && profit >= self.take_profit {
            SessionSignal::TakeProfitHit
        } else if self.stop_loss < 0 && profit <= self.stop_loss {
            SessionSignal::StopLossHit
        } else {
            SessionSignal::Continue
        }
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

pub struct SessionTracker {
    limits: SessionLimits,
}

impl SessionTracker {
    pub fn new(limits: SessionLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SessionLimits {
        &self.limits
    }

    /// Record one outcome and report whether a threshold has been reached.
    pub fn update(&self, session: &mut SessionState, outcome: &Outcome) -> SessionSignal {
        session.record(outcome);

        debug!(
            session = session.session_number,
            won = outcome.won,
            profit = %from_units(session.profit),
            loss_streak = session.loss_streak,
            "Outcome recorded"
        );

        let signal = self.limits.check(session.profit);
        match signal {
            SessionSignal::TakeProfitHit => info!(
                session = session.session_number,
                profit = %from_units(session.profit),
                target = %from_units(self.limits.take_profit),
                bets = session.bets,
                "Take-profit reached"
            ),
            SessionSignal::StopLossHit => info!(
                session = session.session_number,
                profit = %from_units(session.profit),
                limit = %from_units(self.limits.stop_loss),
                bets = session.bets,
                "Stop-loss reached"
            ),
            SessionSignal::Continue => {}
        }
        signal
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
