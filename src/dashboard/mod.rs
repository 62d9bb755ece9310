//! Dashboard: renders session progress.
//!
//! The runner hands a read-only [`Snapshot`] to the active [`Presenter`]
//! after every settled bet and a [`SessionSummary`] when the session ends.
//! Presenters never feed anything back into the betting loop.

pub mod terminal;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::types::{coin, from_units, Outcome, SessionEnd, SessionState, StrategyId};

// ---------------------------------------------------------------------------
// View models
// ---------------------------------------------------------------------------

/// State after one settled bet.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub session_number: u32,
    /// Strategy that will place the next bet.
    pub strategy: StrategyId,
    /// Set when this bet triggered a switch.
    pub switched_from: Option<StrategyId>,
    /// Wager of the next bet, in units.
    pub next_wager: u64,
    pub outcome: Outcome,
    pub session: SessionState,
    /// Last known account balance, in coins.
    pub balance: Option<Decimal>,
    pub elapsed_secs: i64,
    pub bets_per_sec: f64,
}

/// Final state of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session: SessionState,
    pub end: SessionEnd,
    pub strategy: StrategyId,
    pub balance: Option<Decimal>,
    pub ended_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

/// Display sink for session progress.
pub trait Presenter: Send {
    fn on_session_start(&mut self, _session_number: u32, _strategy: StrategyId) {}

    fn on_bet(&mut self, snapshot: &Snapshot);

    fn on_session_end(&mut self, _summary: &SessionSummary) {}
}

/// Presenter that emits tracing events only. Suited to headless runs and
/// JSON logging.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn on_session_start(&mut self, session_number: u32, strategy: StrategyId) {
        info!(session = session_number, strategy = %strategy, "Session started");
    }

    fn on_bet(&mut self, snap: &Snapshot) {
        info!(
            session = snap.session_number,
            strategy = %snap.strategy,
            result = %snap.outcome,
            profit = %from_units(snap.session.profit),
            loss_streak = snap.session.loss_streak,
            next_wager = %coin(snap.next_wager),
            balance = ?snap.balance,
            bets_per_sec = format!("{:.2}", snap.bets_per_sec),
            "Bet settled"
        );
    }

    fn on_session_end(&mut self, summary: &SessionSummary) {
        info!(
            session = summary.session.session_number,
            reason = %summary.end,
            strategy = %summary.strategy,
            profit = %from_units(summary.session.profit),
            bets = summary.session.bets,
            win_rate = format!("{:.1}%", summary.session.win_rate()),
            longest_loss_streak = summary.session.longest_loss_streak,
            balance = ?summary.balance,
            "Session ended"
        );
    }
}
