//! Scripted dice backend and recording presenter for integration testing.
//!
//! `ScriptedDice` settles bets from a fixed win/loss script and records
//! every request; once the script runs out it rejects the token, which ends
//! the session. `Recorder` keeps every snapshot and summary in memory.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use dicebot::dashboard::{Presenter, SessionSummary, Snapshot};
use dicebot::platforms::{BetExecutor, BetRequest};
use dicebot::types::{scale_units, Outcome, PlacementError};

// ---------------------------------------------------------------------------
// Scripted executor
// ---------------------------------------------------------------------------

pub struct ScriptedDice {
    script: Mutex<VecDeque<Result<bool, PlacementError>>>,
    balance: Decimal,
    requests: Arc<Mutex<Vec<BetRequest>>>,
}

impl ScriptedDice {
    /// `true` settles a win, `false` a loss.
    pub fn new(script: impl IntoIterator<Item = bool>, balance: Decimal) -> Self {
        Self::with_results(script.into_iter().map(Ok), balance)
    }

    pub fn with_results(
        script: impl IntoIterator<Item = Result<bool, PlacementError>>,
        balance: Decimal,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            balance,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the recorded requests, usable after the executor is boxed.
    pub fn requests(&self) -> Arc<Mutex<Vec<BetRequest>>> {
        self.requests.clone()
    }
}

#[async_trait]
impl BetExecutor for ScriptedDice {
    async fn place_bet(&self, request: &BetRequest) -> Result<Outcome, PlacementError> {
        self.requests.lock().unwrap().push(request.clone());
        let won = match self.script.lock().unwrap().pop_front() {
            Some(step) => step?,
            None => return Err(PlacementError::Unauthorized),
        };
        Ok(Outcome {
            bet_id: uuid::Uuid::new_v4().to_string(),
            won,
            wager: request.amount,
            payout: if won {
                scale_units(request.amount, request.multiplier)
            } else {
                0
            },
            multiplier: request.multiplier_f64(),
            chance: request.chance,
            direction: request.direction,
            bet_value: request.bet_value,
            roll: if won { 0.5 } else { 99.5 },
            timestamp: Utc::now(),
        })
    }

    async fn balance(&self, _currency: &str) -> Result<Decimal, PlacementError> {
        Ok(self.balance)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// Recording presenter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Recording {
    pub snapshots: Vec<Snapshot>,
    pub summaries: Vec<SessionSummary>,
}

pub struct Recorder {
    log: Arc<Mutex<Recording>>,
    /// Request a stop once this many sessions have ended.
    stop_after: Option<(u32, watch::Sender<bool>)>,
}

impl Recorder {
    pub fn new() -> (Self, Arc<Mutex<Recording>>) {
        let log = Arc::new(Mutex::new(Recording::default()));
        (
            Self {
                log: log.clone(),
                stop_after: None,
            },
            log,
        )
    }

    pub fn stop_after(mut self, sessions: u32, stop: watch::Sender<bool>) -> Self {
        self.stop_after = Some((sessions, stop));
        self
    }
}

impl Presenter for Recorder {
    fn on_bet(&mut self, snapshot: &Snapshot) {
        self.log.lock().unwrap().snapshots.push(snapshot.clone());
    }

    fn on_session_end(&mut self, summary: &SessionSummary) {
        let ended = {
            let mut log = self.log.lock().unwrap();
            log.summaries.push(summary.clone());
            log.summaries.len() as u32
        };
        if let Some((limit, stop)) = &self.stop_after {
            if ended >= *limit {
                let _ = stop.send(true);
            }
        }
    }
}
