//! Shared types for the DICEBOT client.
//!
//! These types form the data model used across all modules: amounts in
//! integer currency units, settled bet outcomes, strategy identifiers,
//! session signals and the domain error enums.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Currency units
// ---------------------------------------------------------------------------

/// Decimal places of one currency unit (1 unit = 0.00000001 coin).
pub const UNIT_DECIMALS: u32 = 8;

/// Number of units in one whole coin.
pub const UNITS_PER_COIN: i64 = 100_000_000;

/// Convert a coin amount to integer units, rounding half away from zero.
/// Returns `None` if the amount does not fit in an `i64`.
pub fn to_units(amount: Decimal) -> Option<i64> {
    let rounded = amount.round_dp_with_strategy(
        UNIT_DECIMALS,
        RoundingStrategy::MidpointAwayFromZero,
    );
    rounded
        .checked_mul(Decimal::from(UNITS_PER_COIN))?
        .to_i64()
}

/// Convert signed integer units back to a coin amount.
pub fn from_units(units: i64) -> Decimal {
    Decimal::new(units, UNIT_DECIMALS)
}

/// Convert an unsigned wager to a coin amount.
pub fn coin(units: u64) -> Decimal {
    from_units(signed(units))
}

/// Saturating conversion of an unsigned amount to a signed one.
pub fn signed(units: u64) -> i64 {
    i64::try_from(units).unwrap_or(i64::MAX)
}

/// Multiply an amount by a decimal factor, rounding half-up back to units.
/// Saturates at `u64::MAX` and floors at zero.
pub fn scale_units(units: u64, factor: Decimal) -> u64 {
    if factor <= Decimal::ZERO {
        return 0;
    }
    Decimal::from(units)
        .checked_mul(factor)
        .map(|v| {
            v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_u64()
                .unwrap_or(u64::MAX)
        })
        .unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Dice game rules
// ---------------------------------------------------------------------------

/// Smallest and largest win chance the dice game accepts, in percent.
pub const MIN_CHANCE: f64 = 0.01;
pub const MAX_CHANCE: f64 = 99.99;

/// Cap a win chance to the range accepted by the game.
pub fn clamp_chance(chance: f64) -> f64 {
    chance.clamp(MIN_CHANCE, MAX_CHANCE)
}

/// Payout multiplier for a win chance: 99 / chance (1% house edge),
/// rounded to 4 decimals the way the API quotes it.
pub fn payout_multiplier(chance: f64) -> Decimal {
    let chance = Decimal::from_f64(clamp_chance(chance)).unwrap_or(Decimal::ONE);
    (Decimal::from(99) / chance).round_dp(4)
}

// ---------------------------------------------------------------------------
// Bet direction
// ---------------------------------------------------------------------------

/// Roll direction of a single dice bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Wins when the roll is above the threshold.
    Over,
    /// Wins when the roll is below the threshold.
    Under,
}

impl Direction {
    /// Wire name used by the dice API (`rule` field).
    pub fn as_rule(&self) -> &'static str {
        match self {
            Direction::Over => "over",
            Direction::Under => "under",
        }
    }

    pub fn arrow(&self) -> char {
        match self {
            Direction::Over => '↑',
            Direction::Under => '↓',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_rule())
    }
}

/// How the roll direction is chosen for each bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleMode {
    /// Pick over/under uniformly at random per bet.
    #[default]
    Auto,
    Over,
    Under,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// A settled bet. Produced exactly once per placed bet and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub bet_id: String,
    pub won: bool,
    /// Amount staked, in units.
    pub wager: u64,
    /// Gross amount returned, in units (0 on a loss).
    pub payout: u64,
    /// Payout multiplier the bet was placed at.
    pub multiplier: f64,
    /// Win chance in percent.
    pub chance: f64,
    pub direction: Direction,
    /// Threshold the roll was compared against.
    pub bet_value: f64,
    /// The rolled value (0.00–99.99).
    pub roll: f64,
    pub timestamp: DateTime<Utc>,
}

impl Outcome {
    /// Net result of the bet in units: payout minus wager.
    pub fn profit(&self) -> i64 {
        signed(self.payout).saturating_sub(signed(self.wager))
    }
}

#[cfg(test)]
impl Outcome {
    /// A winning outcome paying `wager × multiplier`.
    pub fn win(wager: u64, multiplier: f64) -> Self {
        let factor = Decimal::from_f64(multiplier).unwrap_or(Decimal::ONE);
        Self {
            bet_id: "win".into(),
            won: true,
            wager,
            payout: scale_units(wager, factor),
            multiplier,
            chance: 99.0 / multiplier,
            direction: Direction::Under,
            bet_value: 99.0 / multiplier,
            roll: 0.0,
            timestamp: Utc::now(),
        }
    }

    /// A losing outcome at an even-money multiplier.
    pub fn loss(wager: u64) -> Self {
        Self {
            bet_id: "loss".into(),
            won: false,
            wager,
            payout: 0,
            multiplier: 2.0,
            chance: 49.5,
            direction: Direction::Under,
            bet_value: 49.5,
            roll: 99.99,
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.2}{} roll={:.2} wager={:.8} profit={:.8}",
            if self.won { "WIN" } else { "LOSE" },
            self.bet_value,
            self.direction.arrow(),
            self.roll,
            coin(self.wager),
            from_units(self.profit()),
        )
    }
}

// ---------------------------------------------------------------------------
// Strategy identifiers
// ---------------------------------------------------------------------------

/// Identifier of a staking strategy, as used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    Martingale,
    Fibonacci,
    Dalembert,
    Flat,
    JackpotHunter,
    HighRiskPulse,
    Randomized,
}

impl StrategyId {
    /// All known strategies (useful for iteration).
    pub const ALL: &'static [StrategyId] = &[
        StrategyId::Martingale,
        StrategyId::Fibonacci,
        StrategyId::Dalembert,
        StrategyId::Flat,
        StrategyId::JackpotHunter,
        StrategyId::HighRiskPulse,
        StrategyId::Randomized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Martingale => "martingale",
            StrategyId::Fibonacci => "fibonacci",
            StrategyId::Dalembert => "dalembert",
            StrategyId::Flat => "flat",
            StrategyId::JackpotHunter => "jackpot_hunter",
            StrategyId::HighRiskPulse => "high_risk_pulse",
            StrategyId::Randomized => "randomized",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a strategy name (case-insensitive, `-` and `_` interchangeable).
impl std::str::FromStr for StrategyId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_lowercase().replace('-', "_");
        StrategyId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == normalised)
            .ok_or_else(|| ConfigError::Invalid {
                field: "strategy",
                reason: format!("unknown strategy `{s}`"),
            })
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Which accumulated loss the cover-loss overlay tries to win back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverLossBasis {
    /// Wagers lost since the last win.
    #[default]
    Streak,
    /// Net session loss (negative cumulative profit).
    Session,
}

/// Running totals of one betting session. Survives strategy switches and is
/// reset only when a new session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_number: u32,
    /// Cumulative profit in units (negative while losing).
    pub profit: i64,
    /// Consecutive losses since the last win or the last strategy switch.
    pub loss_streak: u32,
    /// Consecutive wins since the last loss.
    pub win_streak: u32,
    pub longest_loss_streak: u32,
    pub bets: u64,
    pub wins: u64,
    pub losses: u64,
    /// Total amount staked this session, in units.
    pub wagered: u64,
    /// Sum of wagers lost since the last win, in units.
    pub unrecovered_loss: u64,
    pub peak_profit: i64,
    pub trough_profit: i64,
    pub started_at: DateTime<Utc>,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session #{} | profit={:.8} | bets={} (W{}/L{}) | win_rate={:.1}% | streak L{}/W{} | wagered={:.8}",
            self.session_number,
            from_units(self.profit),
            self.bets,
            self.wins,
            self.losses,
            self.win_rate(),
            self.loss_streak,
            self.win_streak,
            coin(self.wagered),
        )
    }
}

impl SessionState {
    pub fn new(session_number: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            session_number,
            profit: 0,
            loss_streak: 0,
            win_streak: 0,
            longest_loss_streak: 0,
            bets: 0,
            wins: 0,
            losses: 0,
            wagered: 0,
            unrecovered_loss: 0,
            peak_profit: 0,
            trough_profit: 0,
            started_at,
        }
    }

    /// Fold one settled outcome into the totals.
    pub fn record(&mut self, outcome: &Outcome) {
        self.profit = self.profit.saturating_add(outcome.profit());
        self.bets += 1;
        self.wagered = self.wagered.saturating_add(outcome.wager);

        if outcome.won {
            self.wins += 1;
            self.win_streak += 1;
            self.loss_streak = 0;
            self.unrecovered_loss = 0;
        } else {
            self.losses += 1;
            self.loss_streak += 1;
            self.win_streak = 0;
            self.unrecovered_loss = self.unrecovered_loss.saturating_add(outcome.wager);
            self.longest_loss_streak = self.longest_loss_streak.max(self.loss_streak);
        }

        self.peak_profit = self.peak_profit.max(self.profit);
        self.trough_profit = self.trough_profit.min(self.profit);
    }

    /// Start counting losses afresh for a newly activated strategy.
    pub fn reset_loss_streak(&mut self) {
        self.loss_streak = 0;
    }

    /// Whether the most recent bet was a win.
    pub fn last_won(&self) -> bool {
        self.win_streak > 0
    }

    /// Win rate as a percentage. Returns 0.0 before the first bet.
    pub fn win_rate(&self) -> f64 {
        if self.bets == 0 {
            0.0
        } else {
            (self.wins as f64 / self.bets as f64) * 100.0
        }
    }

    /// Loss the cover-loss overlay should recover, in units.
    pub fn cover_loss_target(&self, basis: CoverLossBasis) -> u64 {
        match basis {
            CoverLossBasis::Streak => self.unrecovered_loss,
            CoverLossBasis::Session => u64::try_from(self.profit.min(0).saturating_neg()).unwrap_or(0),
        }
    }

    /// Average betting speed since the session started (at least one second).
    pub fn bets_per_sec(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = (now - self.started_at).num_seconds().max(1);
        self.bets as f64 / elapsed as f64
    }
}

// ---------------------------------------------------------------------------
// Session signals
// ---------------------------------------------------------------------------

/// Signal reported by the session tracker after each outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    Continue,
    TakeProfitHit,
    StopLossHit,
}

/// Why a session stopped placing bets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionEnd {
    TakeProfit,
    StopLoss,
    /// Operator requested a stop.
    Stopped,
    /// Balance fell below the smallest possible wager.
    BalanceExhausted,
    /// The API rejected the access token.
    Unauthorized,
    /// Bets kept failing, or the API refused a wager outright.
    PlacementFailed,
}

impl SessionEnd {
    /// Whether an auto-restart may follow this end reason.
    pub fn allows_restart(&self) -> bool {
        matches!(self, SessionEnd::TakeProfit | SessionEnd::StopLoss)
    }
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::TakeProfit => write!(f, "✅ take-profit"),
            SessionEnd::StopLoss => write!(f, "🛑 stop-loss"),
            SessionEnd::Stopped => write!(f, "⏹ stopped"),
            SessionEnd::BalanceExhausted => write!(f, "💸 balance exhausted"),
            SessionEnd::Unauthorized => write!(f, "🔒 unauthorized"),
            SessionEnd::PlacementFailed => write!(f, "⚠ placement failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Malformed or missing configuration. Always fatal: no session starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("missing required option `{0}`")]
    Missing(&'static str),

    #[error("invalid option `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failure to place a bet. The bet is treated as never having happened.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlacementError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("access token rejected")]
    Unauthorized,

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl PlacementError {
    /// Errors after which retrying cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlacementError::Unauthorized)
    }

    /// Failures worth retrying after a cooldown. Client-side API rejections
    /// (4xx other than 429) repeat identically and are not.
    pub fn is_transient(&self) -> bool {
        match self {
            PlacementError::Network(_) | PlacementError::Malformed(_) => true,
            PlacementError::Api { status, .. } => *status == 429 || *status >= 500,
            PlacementError::Unauthorized => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_units_roundtrip_at_8dp() {
        assert_eq!(to_units(dec!(0.00000001)), Some(1));
        assert_eq!(to_units(dec!(0.0005)), Some(50_000));
        assert_eq!(to_units(dec!(-0.0005)), Some(-50_000));
        assert_eq!(from_units(50_000), dec!(0.0005));
    }

    #[test]
    fn test_to_units_rounds_sub_unit_amounts() {
        assert_eq!(to_units(dec!(0.000000015)), Some(2));
        assert_eq!(to_units(dec!(0.000000014)), Some(1));
    }

    #[test]
    fn test_scale_units() {
        assert_eq!(scale_units(100, dec!(2)), 200);
        assert_eq!(scale_units(100, dec!(1.025)), 103);
        assert_eq!(scale_units(3, dec!(0.5)), 2);
        assert_eq!(scale_units(100, dec!(-1)), 0);
        assert_eq!(scale_units(u64::MAX, dec!(2)), u64::MAX);
    }

    #[test]
    fn test_outcome_profit() {
        let win = Outcome::win(100, 2.0);
        assert_eq!(win.payout, 200);
        assert_eq!(win.profit(), 100);

        let loss = Outcome::loss(100);
        assert_eq!(loss.profit(), -100);
    }

    #[test]
    fn test_strategy_id_parse() {
        assert_eq!("martingale".parse::<StrategyId>().unwrap(), StrategyId::Martingale);
        assert_eq!("Jackpot-Hunter".parse::<StrategyId>().unwrap(), StrategyId::JackpotHunter);
        assert_eq!(" high_risk_pulse ".parse::<StrategyId>().unwrap(), StrategyId::HighRiskPulse);
        assert!("labouchere".parse::<StrategyId>().is_err());
    }

    #[test]
    fn test_strategy_id_display_matches_serde() {
        for id in StrategyId::ALL {
            let json = serde_json::to_string(id).unwrap();
            assert_eq!(json, format!("\"{id}\""));
        }
    }

    #[test]
    fn test_payout_multiplier() {
        assert_eq!(payout_multiplier(49.5), dec!(2));
        assert_eq!(payout_multiplier(1.0), dec!(99));
        assert_eq!(payout_multiplier(33.0), dec!(3));
        assert_eq!(payout_multiplier(0.0), dec!(9900));
        assert_eq!(payout_multiplier(66.0), dec!(1.5));
    }

    #[test]
    fn test_session_record_streaks() {
        let mut s = SessionState::new(1, Utc::now());
        s.record(&Outcome::loss(100));
        s.record(&Outcome::loss(200));
        assert_eq!(s.loss_streak, 2);
        assert_eq!(s.win_streak, 0);
        assert_eq!(s.unrecovered_loss, 300);
        assert_eq!(s.profit, -300);
        assert!(!s.last_won());

        s.record(&Outcome::win(400, 2.0));
        assert_eq!(s.loss_streak, 0);
        assert_eq!(s.win_streak, 1);
        assert_eq!(s.unrecovered_loss, 0);
        assert_eq!(s.profit, 100);
        assert_eq!(s.longest_loss_streak, 2);
        assert_eq!(s.trough_profit, -300);
        assert_eq!(s.peak_profit, 100);
        assert_eq!(s.bets, 3);
        assert_eq!(s.wagered, 700);
        assert!(s.last_won());
    }

    #[test]
    fn test_cover_loss_target_basis() {
        let mut s = SessionState::new(1, Utc::now());
        s.record(&Outcome::loss(100));
        s.record(&Outcome::win(100, 1.5));
        s.record(&Outcome::loss(40));
        // profit: -100 + 50 - 40 = -90
        assert_eq!(s.cover_loss_target(CoverLossBasis::Streak), 40);
        assert_eq!(s.cover_loss_target(CoverLossBasis::Session), 90);

        s.record(&Outcome::win(1_000, 2.0));
        assert_eq!(s.cover_loss_target(CoverLossBasis::Session), 0);
    }

    #[test]
    fn test_bets_per_sec() {
        let start = Utc::now();
        let mut s = SessionState::new(1, start);
        for _ in 0..10 {
            s.record(&Outcome::loss(1));
        }
        assert_eq!(s.bets_per_sec(start + chrono::Duration::seconds(5)), 2.0);
        // Less than a second counts as one second.
        assert_eq!(s.bets_per_sec(start), 10.0);
    }

    #[test]
    fn test_direction_rule_names() {
        assert_eq!(Direction::Over.as_rule(), "over");
        assert_eq!(Direction::Under.to_string(), "under");
    }

    #[test]
    fn test_session_end_restart() {
        assert!(SessionEnd::TakeProfit.allows_restart());
        assert!(SessionEnd::StopLoss.allows_restart());
        assert!(!SessionEnd::Stopped.allows_restart());
        assert!(!SessionEnd::Unauthorized.allows_restart());
        assert!(!SessionEnd::PlacementFailed.allows_restart());
    }

    #[test]
    fn test_placement_error_fatality() {
        assert!(PlacementError::Unauthorized.is_fatal());
        assert!(!PlacementError::Network("timeout".into()).is_fatal());
        assert!(!PlacementError::Api { status: 429, body: String::new() }.is_fatal());
    }

    #[test]
    fn test_placement_error_transience() {
        let api = |status| PlacementError::Api { status, body: String::new() };
        assert!(PlacementError::Network("reset".into()).is_transient());
        assert!(PlacementError::Malformed("eof".into()).is_transient());
        assert!(api(429).is_transient());
        assert!(api(503).is_transient());
        assert!(!api(400).is_transient());
        assert!(!api(422).is_transient());
        assert!(!PlacementError::Unauthorized.is_transient());
    }

    #[test]
    fn test_to_units_out_of_range() {
        assert_eq!(to_units(Decimal::from_scientific("1e25").unwrap()), None);
        assert_eq!(to_units(Decimal::MAX), None);
        assert_eq!(to_units(dec!(92233720368.54775807)), Some(i64::MAX));
    }
}
