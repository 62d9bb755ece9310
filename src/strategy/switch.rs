//! Automatic strategy switching.
//!
//! Watches the session after every settled bet and decides whether the
//! active strategy should hand over to the next one in the configured cycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::types::{SessionState, StrategyId};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What triggers a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchMode {
    /// Advance after every winning bet.
    OnWin,
    /// Advance once the active strategy has lost `loss_streak_trigger` in a row.
    #[default]
    OnLossStreak,
}

impl fmt::Display for SwitchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchMode::OnWin => write!(f, "on_win"),
            SwitchMode::OnLossStreak => write!(f, "on_loss_streak"),
        }
    }
}

/// Switching rules. Read-only after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchConfig {
    /// `auto_strategy_change`: master switch.
    pub enabled: bool,
    pub mode: SwitchMode,
    /// Consecutive losses that trigger a switch (at least 1).
    pub loss_streak_trigger: u32,
    /// Strategies to rotate through, in order. Never empty.
    pub strategy_cycle: Vec<StrategyId>,
}

impl SwitchConfig {
    /// Configuration that never switches away from `strategy`.
    pub fn disabled(strategy: StrategyId) -> Self {
        Self {
            enabled: false,
            mode: SwitchMode::default(),
            loss_streak_trigger: 5,
            strategy_cycle: vec![strategy],
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct AutoSwitchController;

impl AutoSwitchController {
    /// Decide whether to switch after the outcome just folded into `session`.
    ///
    /// Returns the strategy to activate, or `None` to keep the current one.
    /// On a switch the session's loss streak is reset, since streaks are
    /// counted per strategy lifetime.
    pub fn maybe_switch(
        session: &mut SessionState,
        config: &SwitchConfig,
        current: StrategyId,
    ) -> Option<StrategyId> {
        if !config.enabled || config.strategy_cycle.len() < 2 {
            return None;
        }

        let triggered = match config.mode {
            SwitchMode::OnWin => session.last_won(),
            SwitchMode::OnLossStreak => session.loss_streak >= config.loss_streak_trigger.max(1),
        };
        if !triggered {
            return None;
        }

        let next = next_in_cycle(&config.strategy_cycle, current)?;

        info!(
            from = %current,
            to = %next,
            mode = %config.mode,
            loss_streak = session.loss_streak,
            "🔁 Strategy switched"
        );

        session.reset_loss_streak();
        Some(next)
    }
}

/// The entry after `current` in `cycle`, wrapping at the end. A strategy
/// that is not part of the cycle hands over to the first entry.
pub fn next_in_cycle(cycle: &[StrategyId], current: StrategyId) -> Option<StrategyId> {
    if cycle.is_empty() {
        return None;
    }
    let next = match cycle.iter().position(|&id| id == current) {
        Some(i) => (i + 1) % cycle.len(),
        None => 0,
    };
    Some(cycle[next])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
