//! Configuration loading from JSON or TOML.
//!
//! Reads `config.json` (or any `.toml` file) into a flat, serde-defaulted
//! [`AppConfig`], then validates it into the typed contexts the engine uses.
//! The access token may come from the file or from `WOLFBET_ACCESS_TOKEN`.

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::engine::runner::{BetSettings, RestartPolicy, RunnerConfig};
use crate::engine::session::SessionLimits;
use crate::platforms::wolfbet::DEFAULT_API_BASE;
use crate::strategy::random::{RaiseBounds, RandomizedMode};
use crate::strategy::switch::{SwitchConfig, SwitchMode};
use crate::strategy::StrategyParams;
use crate::types::{to_units, ConfigError, CoverLossBasis, RuleMode, StrategyId};

/// Environment variable consulted when the file has no access token.
pub const ACCESS_TOKEN_ENV: &str = "WOLFBET_ACCESS_TOKEN";

// ---------------------------------------------------------------------------
// Raw file format
// ---------------------------------------------------------------------------

/// Top-level configuration file. Every option has a default.
///
/// `Debug` is implemented by hand so the access token is never printed.
#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub access_token: Option<String>,
    pub currency: String,

    /// Amounts are in coins.
    pub base_bet: Decimal,
    /// Zero disables the cap.
    pub max_bet: Decimal,
    pub multiplier: Decimal,
    pub chance: f64,
    pub rule_mode: RuleMode,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
    pub cooldown_sec: f64,
    /// Consecutive transient placement failures before a session ends.
    pub max_placement_failures: u32,

    pub strategy: String,
    pub auto_strategy_change: bool,
    pub strategy_switch_mode: SwitchMode,
    pub loss_streak_trigger: u32,
    pub strategy_cycle: Vec<String>,

    pub cover_loss: bool,
    pub cover_loss_basis: CoverLossBasis,
    pub dalembert_step: Decimal,

    pub jackpot_chance: Option<f64>,
    pub jackpot_raise_min_pct: f64,
    pub jackpot_raise_max_pct: f64,

    pub high_risk_chance: Option<f64>,
    pub high_risk_raise_min_pct: f64,
    pub high_risk_raise_max_pct: f64,
    pub high_risk_interval: u32,
    pub high_risk_pulse_factor: Decimal,

    pub randomized_mode: RandomizedMode,
    pub randomized_min_mult: f64,
    pub randomized_max_mult: f64,

    pub auto_start: bool,
    pub auto_start_delay: f64,

    pub dry_run: bool,
    pub simulated_balance: Decimal,
    pub seed: Option<u64>,
    pub display: DisplayMode,
    pub api_base: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            currency: "btc".into(),
            base_bet: dec!(0.00000001),
            max_bet: Decimal::ZERO,
            multiplier: dec!(2.0),
            chance: 49.5,
            rule_mode: RuleMode::Auto,
            take_profit: dec!(0.0005),
            stop_loss: dec!(-0.0005),
            cooldown_sec: 1.0,
            max_placement_failures: 5,
            strategy: "martingale".into(),
            auto_strategy_change: false,
            strategy_switch_mode: SwitchMode::OnLossStreak,
            loss_streak_trigger: 5,
            strategy_cycle: Vec::new(),
            cover_loss: true,
            cover_loss_basis: CoverLossBasis::Streak,
            dalembert_step: dec!(0.25),
            jackpot_chance: None,
            jackpot_raise_min_pct: 1.02,
            jackpot_raise_max_pct: 1.05,
            high_risk_chance: None,
            high_risk_raise_min_pct: 1.10,
            high_risk_raise_max_pct: 1.20,
            high_risk_interval: 20,
            high_risk_pulse_factor: dec!(5.0),
            randomized_mode: RandomizedMode::Uniform,
            randomized_min_mult: 1.02,
            randomized_max_mult: 1.35,
            auto_start: false,
            auto_start_delay: 5.0,
            dry_run: false,
            simulated_balance: dec!(0.01),
            seed: None,
            display: DisplayMode::Terminal,
            api_base: DEFAULT_API_BASE.into(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("currency", &self.currency)
            .field("base_bet", &self.base_bet)
            .field("max_bet", &self.max_bet)
            .field("chance", &self.chance)
            .field("rule_mode", &self.rule_mode)
            .field("take_profit", &self.take_profit)
            .field("stop_loss", &self.stop_loss)
            .field("strategy", &self.strategy)
            .field("strategy_cycle", &self.strategy_cycle)
            .field("dry_run", &self.dry_run)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

/// How session progress is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Live colored panel on stdout.
    #[default]
    Terminal,
    /// Structured log events only.
    Log,
}

// ---------------------------------------------------------------------------
// Validated settings
// ---------------------------------------------------------------------------

/// Validated configuration, ready to wire into the runner.
#[derive(Debug, Clone)]
pub struct Settings {
    pub runner: RunnerConfig,
    pub restart: RestartPolicy,
    pub dry_run: bool,
    /// Starting balance of the simulator, in units.
    pub simulated_balance: i64,
    pub display: DisplayMode,
    pub api_base: String,
}

impl AppConfig {
    /// Load configuration from a file. `.toml` files are read as TOML,
    /// anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: origin.clone(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml_str(&contents, &origin)
        } else {
            Self::from_json_str(&contents, &origin)
        }
    }

    pub fn from_json_str(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_toml_str(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// The API access token: the file's `access_token`, else the
    /// `WOLFBET_ACCESS_TOKEN` environment variable.
    pub fn access_token(&self) -> Result<SecretString, ConfigError> {
        resolve_token(
            self.access_token.as_deref(),
            std::env::var(ACCESS_TOKEN_ENV).ok().as_deref(),
        )
    }

    /// Validate every option and build the typed settings.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let base_bet = positive_units("base_bet", self.base_bet)?;

        let max_bet = if self.max_bet.is_zero() {
            None
        } else {
            let max = positive_units("max_bet", self.max_bet)?;
            if max < base_bet {
                return Err(invalid("max_bet", "must not be below base_bet"));
            }
            Some(max)
        };

        if self.multiplier < Decimal::ONE {
            return Err(invalid("multiplier", "must be at least 1"));
        }
        check_chance("chance", self.chance)?;
        if let Some(c) = self.jackpot_chance {
            check_chance("jackpot_chance", c)?;
        }
        if let Some(c) = self.high_risk_chance {
            check_chance("high_risk_chance", c)?;
        }
        if self.dalembert_step <= Decimal::ZERO {
            return Err(invalid("dalembert_step", "must be positive"));
        }
        if self.high_risk_pulse_factor < Decimal::ONE {
            return Err(invalid("high_risk_pulse_factor", "must be at least 1"));
        }
        if self.high_risk_interval == 0 {
            return Err(invalid("high_risk_interval", "must be at least 1"));
        }

        let params = StrategyParams {
            base_bet,
            max_bet,
            chance: self.chance,
            multiplier: self.multiplier,
            dalembert_step: self.dalembert_step,
            jackpot_raise: raise_bounds(
                "jackpot_raise_min_pct",
                self.jackpot_raise_min_pct,
                self.jackpot_raise_max_pct,
            )?,
            jackpot_chance: self.jackpot_chance,
            high_risk_raise: raise_bounds(
                "high_risk_raise_min_pct",
                self.high_risk_raise_min_pct,
                self.high_risk_raise_max_pct,
            )?,
            high_risk_chance: self.high_risk_chance,
            high_risk_interval: self.high_risk_interval,
            high_risk_pulse_factor: self.high_risk_pulse_factor,
            randomized_mode: self.randomized_mode,
            randomized_raise: raise_bounds(
                "randomized_min_mult",
                self.randomized_min_mult,
                self.randomized_max_mult,
            )?,
            cover_loss: self.cover_loss,
        };

        let strategy: StrategyId = self.strategy.parse()?;
        let strategy_cycle = if self.strategy_cycle.is_empty() {
            vec![strategy]
        } else {
            self.strategy_cycle
                .iter()
                .map(|s| s.parse::<StrategyId>())
                .collect::<Result<Vec<_>, _>>()?
        };
        if self.loss_streak_trigger == 0 {
            return Err(invalid("loss_streak_trigger", "must be at least 1"));
        }
        let switch = SwitchConfig {
            enabled: self.auto_strategy_change,
            mode: self.strategy_switch_mode,
            loss_streak_trigger: self.loss_streak_trigger,
            strategy_cycle,
        };

        let take_profit = signed_units("take_profit", self.take_profit)?;
        if take_profit < 0 {
            return Err(invalid("take_profit", "must not be negative"));
        }
        let stop_loss = signed_units("stop_loss", self.stop_loss)?;
        if stop_loss > 0 {
            return Err(invalid("stop_loss", "must not be positive"));
        }

        if self.max_placement_failures == 0 {
            return Err(invalid("max_placement_failures", "must be at least 1"));
        }

        let currency = self.currency.trim().to_lowercase();
        if currency.is_empty() {
            return Err(ConfigError::Missing("currency"));
        }

        let bet = BetSettings {
            currency,
            rule_mode: self.rule_mode,
            cooldown: seconds("cooldown_sec", self.cooldown_sec)?,
            cover_loss_basis: self.cover_loss_basis,
            max_placement_failures: self.max_placement_failures,
        };

        let restart = RestartPolicy {
            enabled: self.auto_start,
            delay: seconds("auto_start_delay", self.auto_start_delay)?,
        };

        let simulated_balance = signed_units("simulated_balance", self.simulated_balance)?;
        if self.dry_run && simulated_balance <= 0 {
            return Err(invalid("simulated_balance", "must be positive for a dry run"));
        }

        Ok(Settings {
            runner: RunnerConfig {
                strategy,
                params,
                switch,
                limits: SessionLimits {
                    take_profit,
                    stop_loss,
                },
                bet,
                seed: self.seed,
            },
            restart,
            dry_run: self.dry_run,
            simulated_balance,
            display: self.display,
            api_base: self.api_base.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn signed_units(field: &'static str, amount: Decimal) -> Result<i64, ConfigError> {
    to_units(amount).ok_or_else(|| invalid(field, "amount out of range"))
}

fn positive_units(field: &'static str, amount: Decimal) -> Result<u64, ConfigError> {
    let units = signed_units(field, amount)?;
    u64::try_from(units)
        .ok()
        .filter(|&u| u > 0)
        .ok_or_else(|| invalid(field, "must be at least 0.00000001"))
}

fn check_chance(field: &'static str, chance: f64) -> Result<(), ConfigError> {
    if chance.is_finite() && chance > 0.0 && chance < 100.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be between 0 and 100 (exclusive)"))
    }
}

fn raise_bounds(field: &'static str, min: f64, max: f64) -> Result<RaiseBounds, ConfigError> {
    if !(min.is_finite() && max.is_finite()) || min <= 0.0 {
        return Err(invalid(field, "factors must be positive"));
    }
    if min > max {
        return Err(invalid(field, "minimum exceeds maximum"));
    }
    Ok(RaiseBounds::new(min, max))
}

fn seconds(field: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    if secs.is_finite() && secs >= 0.0 {
        Ok(Duration::from_secs_f64(secs))
    } else {
        Err(invalid(field, "must be a non-negative number of seconds"))
    }
}

fn resolve_token(from_file: Option<&str>, from_env: Option<&str>) -> Result<SecretString, ConfigError> {
    [from_file, from_env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(|t| SecretString::new(t.to_string()))
        .ok_or(ConfigError::Missing("access_token"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
