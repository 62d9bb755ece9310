//! Live terminal panel.
//!
//! Redraws a compact status block on stdout after every bet: session totals,
//! the active strategy and a short history of recent rolls.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::io::Write as _;

use owo_colors::{OwoColorize, Stream::Stdout};

use super::{Presenter, SessionSummary, Snapshot};
use crate::types::{coin, from_units, Outcome, StrategyId};

/// Number of recent bets shown in the panel.
pub const HISTORY_ROWS: usize = 32;

const CLEAR: &str = "\x1b[2J\x1b[H";

pub struct TerminalPresenter {
    history: VecDeque<Outcome>,
    last: Option<Snapshot>,
    /// Clear the screen before every redraw.
    redraw: bool,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_ROWS),
            last: None,
            redraw: true,
        }
    }

    /// Append frames instead of clearing the screen.
    pub fn without_redraw(mut self) -> Self {
        self.redraw = false;
        self
    }

    pub fn history(&self) -> &VecDeque<Outcome> {
        &self.history
    }

    /// Render the panel for the latest snapshot.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let Some(snap) = &self.last else {
            return out;
        };
        let s = &snap.session;

        let _ = writeln!(
            out,
            "{} session #{}  {}",
            "DICEBOT".if_supports_color(Stdout, |t| t.bold()),
            s.session_number,
            format!("{}s", snap.elapsed_secs).if_supports_color(Stdout, |t| t.dimmed()),
        );

        let profit = format!("{:+.8}", from_units(s.profit));
        let profit = if s.profit >= 0 {
            profit.if_supports_color(Stdout, |t| t.green()).to_string()
        } else {
            profit.if_supports_color(Stdout, |t| t.red()).to_string()
        };
        let _ = writeln!(out, "  {:<12} {}", "profit", profit);
        let _ = writeln!(
            out,
            "  {:<12} {}",
            "strategy",
            strategy_label(snap.strategy, snap.switched_from)
        );
        let _ = writeln!(out, "  {:<12} {:.8}", "next wager", coin(snap.next_wager));
        if let Some(balance) = snap.balance {
            let _ = writeln!(out, "  {:<12} {:.8}", "balance", balance);
        }
        let _ = writeln!(
            out,
            "  {:<12} {} (W{} / L{})  {:.1}%  {:.2}/s",
            "bets",
            s.bets,
            s.wins,
            s.losses,
            s.win_rate(),
            snap.bets_per_sec
        );
        let _ = writeln!(
            out,
            "  {:<12} L{} / W{}  longest L{}",
            "streak", s.loss_streak, s.win_streak, s.longest_loss_streak
        );
        let _ = writeln!(out, "  {:<12} {:.8}", "wagered", coin(s.wagered));
        let _ = writeln!(out);

        for outcome in self.history.iter().rev() {
            let _ = writeln!(out, "  {}", history_row(outcome));
        }
        out
    }

    fn flush(&self, frame: &str) {
        let mut stdout = std::io::stdout().lock();
        if self.redraw {
            let _ = write!(stdout, "{CLEAR}");
        }
        let _ = write!(stdout, "{frame}");
        let _ = stdout.flush();
    }
}

impl Default for TerminalPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for TerminalPresenter {
    fn on_session_start(&mut self, session_number: u32, strategy: StrategyId) {
        self.history.clear();
        self.last = None;
        println!(
            "{} session #{} with {}",
            "▶".if_supports_color(Stdout, |t| t.cyan()),
            session_number,
            strategy
        );
    }

    fn on_bet(&mut self, snapshot: &Snapshot) {
        if self.history.len() == HISTORY_ROWS {
            self.history.pop_front();
        }
        self.history.push_back(snapshot.outcome.clone());
        self.last = Some(snapshot.clone());
        let frame = self.render();
        self.flush(&frame);
    }

    fn on_session_end(&mut self, summary: &SessionSummary) {
        let s = &summary.session;
        println!();
        println!(
            "{} session #{} ended: {}",
            "■".if_supports_color(Stdout, |t| t.yellow()),
            s.session_number,
            summary.end
        );
        println!("  {s}");
        if let Some(balance) = summary.balance {
            println!("  balance {balance:.8}");
        }
    }
}

fn strategy_label(strategy: StrategyId, switched_from: Option<StrategyId>) -> String {
    match switched_from {
        Some(from) => format!(
            "{} {}",
            strategy.if_supports_color(Stdout, |t| t.cyan()),
            format!("(from {from})").if_supports_color(Stdout, |t| t.dimmed())
        ),
        None => strategy.if_supports_color(Stdout, |t| t.cyan()).to_string(),
    }
}

fn history_row(outcome: &Outcome) -> String {
    let verdict = if outcome.won {
        "WIN ".if_supports_color(Stdout, |t| t.green()).to_string()
    } else {
        "LOSE".if_supports_color(Stdout, |t| t.red()).to_string()
    };
    format!(
        "{} {:>6.2} {} {:>5.2}  {:.8}  {:+.8}",
        verdict,
        outcome.bet_value,
        outcome.direction.arrow(),
        outcome.roll,
        coin(outcome.wager),
        from_units(outcome.profit()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionState;
    use chrono::Utc;

    fn snapshot(outcome: Outcome, session: &SessionState) -> Snapshot {
        Snapshot {
            session_number: session.session_number,
            strategy: StrategyId::Fibonacci,
            switched_from: Some(StrategyId::Martingale),
            next_wager: 300,
            outcome,
            session: session.clone(),
            balance: None,
            elapsed_secs: 4,
            bets_per_sec: 1.25,
        }
    }

    #[test]
    fn test_history_keeps_last_rows() {
        let mut presenter = TerminalPresenter::new().without_redraw();
        let mut session = SessionState::new(1, Utc::now());
        for i in 0..(HISTORY_ROWS as u64 + 8) {
            let outcome = Outcome::loss(i + 1);
            session.record(&outcome);
            presenter.on_bet(&snapshot(outcome, &session));
        }
        assert_eq!(presenter.history().len(), HISTORY_ROWS);
        assert_eq!(presenter.history().front().map(|o| o.wager), Some(9));
        assert_eq!(presenter.history().back().map(|o| o.wager), Some(40));
    }

    #[test]
    fn test_render_shows_totals() {
        let mut presenter = TerminalPresenter::new().without_redraw();
        let mut session = SessionState::new(3, Utc::now());
        let outcome = Outcome::loss(100);
        session.record(&outcome);
        presenter.on_bet(&snapshot(outcome, &session));

        let panel = presenter.render();
        assert!(panel.contains("session #3"));
        assert!(panel.contains("fibonacci"));
        assert!(panel.contains("from martingale"));
        assert!(panel.contains("-0.00000100"));
        assert!(panel.contains("0.00000300"));
        assert!(panel.contains("LOSE"));
    }

    #[test]
    fn test_render_empty_before_first_bet() {
        assert!(TerminalPresenter::new().render().is_empty());
    }
}
