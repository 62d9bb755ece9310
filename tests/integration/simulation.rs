//! Session-level simulations.
//!
//! Drives the full runner (config → strategy engine → switch controller →
//! tracker → presenter) against scripted and simulated dice with a manual
//! clock, so whole sessions run instantly and replay exactly.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal_macros::dec;
use tokio::sync::watch;

use dicebot::config::AppConfig;
use dicebot::engine::clock::ManualClock;
use dicebot::engine::runner::{RestartPolicy, RunnerConfig, SessionRunner};
use dicebot::platforms::simulated::SimulatedDice;
use dicebot::platforms::BetExecutor;
use dicebot::types::{SessionEnd, StrategyId};

use crate::scripted_dice::{Recorder, ScriptedDice};

fn runner_config(json: &str) -> RunnerConfig {
    AppConfig::from_json_str(json, "inline.json")
        .unwrap()
        .settings()
        .unwrap()
        .runner
}

#[tokio::test]
async fn test_loss_streak_switch_walks_the_cycle() {
    let cfg = runner_config(
        r#"{
            "strategy": "martingale",
            "auto_strategy_change": true,
            "strategy_switch_mode": "on_loss_streak",
            "loss_streak_trigger": 3,
            "strategy_cycle": ["martingale", "fibonacci", "flat"],
            "cover_loss": false,
            "rule_mode": "under",
            "take_profit": 0,
            "stop_loss": 0
        }"#,
    );
    let dice = ScriptedDice::new([false; 7], dec!(1));
    let requests = dice.requests();
    let (recorder, log) = Recorder::new();
    let mut runner = SessionRunner::new(
        cfg,
        Box::new(dice),
        Arc::new(ManualClock::default()),
        Box::new(recorder),
    );
    let (_tx, mut rx) = watch::channel(false);

    let summary = runner.run_session(1, &mut rx).await;

    let amounts: Vec<u64> = requests.lock().unwrap().iter().map(|r| r.amount).collect();
    assert_eq!(amounts, vec![1, 2, 4, 1, 1, 2, 1, 1]);

    let log = log.lock().unwrap();
    let strategies: Vec<StrategyId> = log.snapshots.iter().map(|s| s.strategy).collect();
    assert_eq!(
        strategies,
        vec![
            StrategyId::Martingale,
            StrategyId::Martingale,
            StrategyId::Fibonacci,
            StrategyId::Fibonacci,
            StrategyId::Fibonacci,
            StrategyId::Flat,
            StrategyId::Flat,
        ]
    );
    assert_eq!(log.snapshots[2].switched_from, Some(StrategyId::Martingale));
    assert_eq!(log.snapshots[2].session.loss_streak, 0);
    assert_eq!(log.snapshots[2].next_wager, 1);
    assert_eq!(log.snapshots[5].switched_from, Some(StrategyId::Fibonacci));

    assert_eq!(summary.end, SessionEnd::Unauthorized);
    assert_eq!(summary.session.losses, 7);
    assert_eq!(summary.session.longest_loss_streak, 3);
    assert_eq!(summary.session.profit, -12);
}

#[tokio::test]
async fn test_win_switch_wraps_around() {
    let cfg = runner_config(
        r#"{
            "strategy": "flat",
            "auto_strategy_change": true,
            "strategy_switch_mode": "on_win",
            "strategy_cycle": ["flat", "martingale"],
            "cover_loss": false,
            "rule_mode": "under",
            "take_profit": 0,
            "stop_loss": 0
        }"#,
    );
    let dice = ScriptedDice::new([true, false, true, true], dec!(1));
    let requests = dice.requests();
    let (recorder, log) = Recorder::new();
    let mut runner = SessionRunner::new(
        cfg,
        Box::new(dice),
        Arc::new(ManualClock::default()),
        Box::new(recorder),
    );
    let (_tx, mut rx) = watch::channel(false);

    runner.run_session(1, &mut rx).await;

    let amounts: Vec<u64> = requests.lock().unwrap().iter().map(|r| r.amount).collect();
    assert_eq!(amounts, vec![1, 1, 2, 1, 1]);

    let strategies: Vec<StrategyId> = log
        .lock()
        .unwrap()
        .snapshots
        .iter()
        .map(|s| s.strategy)
        .collect();
    assert_eq!(
        strategies,
        vec![
            StrategyId::Martingale,
            StrategyId::Martingale,
            StrategyId::Flat,
            StrategyId::Martingale,
        ]
    );
}

#[tokio::test]
async fn test_auto_start_runs_fresh_sessions() {
    let cfg = runner_config(
        r#"{
            "strategy": "flat",
            "cover_loss": false,
            "rule_mode": "under",
            "take_profit": 0.00000002,
            "cooldown_sec": 1
        }"#,
    );
    let dice = ScriptedDice::new([true; 20], dec!(1));
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let (recorder, log) = Recorder::new();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let mut runner = SessionRunner::new(
        cfg,
        Box::new(dice),
        clock.clone(),
        Box::new(recorder.stop_after(3, stop_tx)),
    );

    let end = runner
        .run(
            RestartPolicy {
                enabled: true,
                delay: Duration::from_secs(3),
            },
            &mut stop_rx,
        )
        .await;

    assert_eq!(end, SessionEnd::TakeProfit);
    let log = log.lock().unwrap();
    let sessions: Vec<(u32, i64, u64)> = log
        .summaries
        .iter()
        .map(|s| (s.session.session_number, s.session.profit, s.session.bets))
        .collect();
    assert_eq!(sessions, vec![(1, 2, 2), (2, 2, 2), (3, 2, 2)]);

    let one = Duration::from_secs(1);
    let three = Duration::from_secs(3);
    assert_eq!(clock.sleeps(), vec![one, three, one, three, one]);
}

#[tokio::test]
async fn test_stop_loss_ends_run_without_restart_when_disabled() {
    let cfg = runner_config(
        r#"{
            "strategy": "flat",
            "cover_loss": false,
            "rule_mode": "over",
            "stop_loss": -0.00000003
        }"#,
    );
    let dice = ScriptedDice::new([false; 10], dec!(1));
    let (recorder, log) = Recorder::new();
    let mut runner = SessionRunner::new(
        cfg,
        Box::new(dice),
        Arc::new(ManualClock::default()),
        Box::new(recorder),
    );
    let (_tx, mut rx) = watch::channel(false);

    let end = runner.run(RestartPolicy::never(), &mut rx).await;

    assert_eq!(end, SessionEnd::StopLoss);
    let log = log.lock().unwrap();
    assert_eq!(log.summaries.len(), 1);
    assert_eq!(log.summaries[0].session.bets, 3);
}

#[tokio::test]
async fn test_cover_loss_overlay_recovers_streak() {
    let cfg = runner_config(
        r#"{
            "strategy": "jackpot_hunter",
            "base_bet": 0.000001,
            "chance": 33,
            "rule_mode": "under",
            "cover_loss": true,
            "take_profit": 0,
            "stop_loss": 0,
            "seed": 5
        }"#,
    );
    let base = cfg.params.base_bet;
    let dice = ScriptedDice::new([false; 6], dec!(1));
    let requests = dice.requests();
    let (recorder, log) = Recorder::new();
    let mut runner = SessionRunner::new(
        cfg,
        Box::new(dice),
        Arc::new(ManualClock::default()),
        Box::new(recorder),
    );
    let (_tx, mut rx) = watch::channel(false);

    runner.run_session(1, &mut rx).await;

    for req in requests.lock().unwrap().iter() {
        assert_eq!(req.chance, 33.0);
        assert_eq!(req.multiplier, dec!(3));
    }

    let log = log.lock().unwrap();
    assert_eq!(log.snapshots.len(), 6);
    for snap in &log.snapshots {
        let target = snap.session.unrecovered_loss + base;
        // A win at 3x returns twice the stake as profit.
        assert!(
            snap.next_wager * 2 >= target,
            "wager {} does not cover {}",
            snap.next_wager,
            target
        );
    }
}

/// Run one dry-run session and return (wager, won, strategy, roll) per bet.
async fn dry_run(seed: u64) -> (Vec<(u64, bool, StrategyId, f64)>, SessionEnd, i64) {
    let json = format!(
        r#"{{
            "strategy": "randomized",
            "base_bet": 0.000001,
            "auto_strategy_change": true,
            "loss_streak_trigger": 2,
            "strategy_cycle": ["randomized", "jackpot_hunter", "high_risk_pulse", "dalembert", "fibonacci"],
            "take_profit": 0.00005,
            "stop_loss": -0.00005,
            "dry_run": true,
            "simulated_balance": 0.01,
            "seed": {seed}
        }}"#
    );
    let settings = AppConfig::from_json_str(&json, "inline.json")
        .unwrap()
        .settings()
        .unwrap();
    let dice: Box<dyn BetExecutor> = Box::new(SimulatedDice::new(
        &settings.runner.bet.currency,
        settings.simulated_balance,
        settings.runner.seed,
    ));
    let (recorder, log) = Recorder::new();
    let mut runner = SessionRunner::new(
        settings.runner,
        dice,
        Arc::new(ManualClock::default()),
        Box::new(recorder),
    );
    let (_tx, mut rx) = watch::channel(false);

    let summary = runner.run_session(1, &mut rx).await;

    let trace = log
        .lock()
        .unwrap()
        .snapshots
        .iter()
        .map(|s| (s.outcome.wager, s.outcome.won, s.strategy, s.outcome.roll))
        .collect();
    (trace, summary.end, summary.session.profit)
}

#[tokio::test]
async fn test_dry_run_replays_with_seed() {
    let (first, end_a, profit_a) = dry_run(2024).await;
    let (second, end_b, profit_b) = dry_run(2024).await;

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(end_a, end_b);
    assert_eq!(profit_a, profit_b);
    assert!(matches!(
        end_a,
        SessionEnd::TakeProfit | SessionEnd::StopLoss | SessionEnd::BalanceExhausted
    ));
}
