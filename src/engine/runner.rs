//! Session runner: the explicit betting loop.
//!
//! One bet at a time: place → track → next wager → maybe switch → present →
//! cooldown. The executor, clock and presenter are injected so the same loop
//! drives live betting, dry runs and tests.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::dashboard::{Presenter, SessionSummary, Snapshot};
use crate::engine::clock::Clock;
use crate::engine::session::{SessionLimits, SessionTracker};
use crate::platforms::{BetExecutor, BetRequest};
use crate::strategy::switch::{AutoSwitchController, SwitchConfig};
use crate::strategy::{StrategyEngine, StrategyParams, StrategyState};
use crate::types::{
    coin, from_units, to_units, CoverLossBasis, Direction, RuleMode, SessionEnd, SessionSignal,
    SessionState, StrategyId,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-bet settings that do not depend on the active strategy.
#[derive(Debug, Clone)]
pub struct BetSettings {
    pub currency: String,
    pub rule_mode: RuleMode,
    /// Pause between two bets.
    pub cooldown: Duration,
    pub cover_loss_basis: CoverLossBasis,
    /// Consecutive transient placement failures tolerated before the
    /// session gives up.
    pub max_placement_failures: u32,
}

/// Whether a finished session is followed by a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub enabled: bool,
    pub delay: Duration,
}

impl RestartPolicy {
    pub fn never() -> Self {
        Self {
            enabled: false,
            delay: Duration::ZERO,
        }
    }
}

/// Everything the runner needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub strategy: StrategyId,
    pub params: StrategyParams,
    pub switch: SwitchConfig,
    pub limits: SessionLimits,
    pub bet: BetSettings,
    /// RNG seed for strategy sampling and direction picks.
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct SessionRunner {
    executor: Box<dyn BetExecutor>,
    clock: Arc<dyn Clock>,
    presenter: Box<dyn Presenter>,
    engine: StrategyEngine,
    tracker: SessionTracker,
    switch: SwitchConfig,
    bet: BetSettings,
    initial_strategy: StrategyId,
    rng: StdRng,
}

impl SessionRunner {
    pub fn new(
        config: RunnerConfig,
        executor: Box<dyn BetExecutor>,
        clock: Arc<dyn Clock>,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            executor,
            clock,
            presenter,
            engine: StrategyEngine::new(config.params),
            tracker: SessionTracker::new(config.limits),
            switch: config.switch,
            bet: config.bet,
            initial_strategy: config.strategy,
            rng,
        }
    }

    /// Run sessions until one ends without a restart. Returns the last end
    /// reason.
    pub async fn run(
        &mut self,
        restart: RestartPolicy,
        stop: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let mut session_number = 1;
        loop {
            let summary = self.run_session(session_number, stop).await;

            if !restart.enabled || !summary.end.allows_restart() || *stop.borrow() {
                return summary.end;
            }

            info!(
                next_session = session_number + 1,
                delay_secs = restart.delay.as_secs_f64(),
                "Auto-start: next session scheduled"
            );
            self.pause(restart.delay, stop).await;
            if *stop.borrow() {
                return SessionEnd::Stopped;
            }
            session_number += 1;
        }
    }

    /// Run one session from fresh counters until a threshold, a stop
    /// request, balance exhaustion or a fatal placement error.
    pub async fn run_session(
        &mut self,
        session_number: u32,
        stop: &mut watch::Receiver<bool>,
    ) -> SessionSummary {
        let mut session = SessionState::new(session_number, self.clock.now());
        let (mut wager, mut state) = self.engine.next_wager(
            None,
            &self.engine.initial_state(self.initial_strategy),
            0,
            &mut self.rng,
        );

        info!(
            session = session_number,
            executor = self.executor.name(),
            strategy = %state.id(),
            base_bet = %coin(wager),
            currency = %self.bet.currency,
            "Session starting"
        );
        self.presenter.on_session_start(session_number, state.id());

        let mut balance = match self.executor.balance(&self.bet.currency).await {
            Ok(b) => {
                info!(balance = %b, currency = %self.bet.currency, "Balance fetched");
                Some(b)
            }
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Balance request rejected");
                return self.finish(session, SessionEnd::Unauthorized, state.id(), None);
            }
            Err(e) => {
                warn!(error = %e, "Balance unavailable, wagers will not be clamped");
                None
            }
        };

        let mut failures = 0u32;
        let end = loop {
            if *stop.borrow() {
                break SessionEnd::Stopped;
            }

            let stake = match clamp_to_balance(wager, balance) {
                Some(stake) if stake >= self.engine.params().base_bet => stake,
                _ => {
                    warn!(wager = %coin(wager), balance = ?balance, "Balance below base bet");
                    break SessionEnd::BalanceExhausted;
                }
            };

            let direction = self.direction();
            let chance = self.engine.chance_for(state.id());
            let request = BetRequest::new(stake, &self.bet.currency, chance, direction);

            let outcome = match self.executor.place_bet(&request).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Bet rejected, stopping");
                    break SessionEnd::Unauthorized;
                }
                Err(e) if !e.is_transient() => {
                    error!(error = %e, wager = %coin(stake), "Bet refused by the API, stopping");
                    break SessionEnd::PlacementFailed;
                }
                Err(e) => {
                    failures += 1;
                    if failures >= self.bet.max_placement_failures {
                        error!(error = %e, failures, "Too many failed placements, stopping");
                        break SessionEnd::PlacementFailed;
                    }
                    warn!(
                        error = %e,
                        wager = %coin(stake),
                        failures,
                        "Bet placement failed, retrying after cooldown"
                    );
                    self.pause(self.bet.cooldown, stop).await;
                    continue;
                }
            };
            failures = 0;

            balance = balance.and_then(|b| b.checked_add(from_units(outcome.profit())));

            let signal = self.tracker.update(&mut session, &outcome);

            let cover_target = session.cover_loss_target(self.bet.cover_loss_basis);
            let (next, next_state) =
                self.engine
                    .next_wager(Some(&outcome), &state, cover_target, &mut self.rng);
            wager = next;
            state = next_state;

            let mut switched_from = None;
            if let Some(to) = AutoSwitchController::maybe_switch(&mut session, &self.switch, state.id())
            {
                switched_from = Some(state.id());
                state = self.activate(to);
                wager = state.current_wager;
            }

            let now = self.clock.now();
            self.presenter.on_bet(&Snapshot {
                session_number,
                strategy: state.id(),
                switched_from,
                next_wager: wager,
                outcome,
                session: session.clone(),
                balance,
                elapsed_secs: (now - session.started_at).num_seconds(),
                bets_per_sec: session.bets_per_sec(now),
            });

            match signal {
                SessionSignal::TakeProfitHit => break SessionEnd::TakeProfit,
                SessionSignal::StopLossHit => break SessionEnd::StopLoss,
                SessionSignal::Continue => {}
            }

            self.pause(self.bet.cooldown, stop).await;
        };

        self.finish(session, end, state.id(), balance)
    }

    /// Fresh state for a newly activated strategy. No overlay applies to its
    /// first wager.
    fn activate(&mut self, id: StrategyId) -> StrategyState {
        let fresh = self.engine.initial_state(id);
        self.engine.next_wager(None, &fresh, 0, &mut self.rng).1
    }

    fn direction(&mut self) -> Direction {
        match self.bet.rule_mode {
            RuleMode::Over => Direction::Over,
            RuleMode::Under => Direction::Under,
            RuleMode::Auto => {
                if self.rng.gen_bool(0.5) {
                    Direction::Over
                } else {
                    Direction::Under
                }
            }
        }
    }

    /// Sleep on the injected clock; a stop request cuts the pause short.
    async fn pause(&self, duration: Duration, stop: &mut watch::Receiver<bool>) {
        if duration.is_zero() || *stop.borrow() {
            return;
        }
        tokio::select! {
            _ = self.clock.sleep(duration) => {}
            Ok(()) = stop.changed() => {}
        }
    }

    fn finish(
        &mut self,
        session: SessionState,
        end: SessionEnd,
        strategy: StrategyId,
        balance: Option<Decimal>,
    ) -> SessionSummary {
        info!(
            session = session.session_number,
            reason = %end,
            profit = %from_units(session.profit),
            bets = session.bets,
            "Session finished"
        );
        let summary = SessionSummary {
            session,
            end,
            strategy,
            balance,
            ended_at: self.clock.now(),
        };
        self.presenter.on_session_end(&summary);
        summary
    }
}

/// Cap `wager` to the known balance. `None` when the balance is unusable.
fn clamp_to_balance(wager: u64, balance: Option<Decimal>) -> Option<u64> {
    match balance {
        None => Some(wager),
        Some(b) => {
            let available = to_units(b).and_then(|u| u64::try_from(u).ok())?;
            Some(wager.min(available))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
