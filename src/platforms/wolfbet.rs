//! WolfBet dice integration.
//!
//! Places real-money dice bets and reads account balances.
//!
//! API base: https://wolfbet.com/api/v1
//! Auth: `Authorization: Bearer {access_token}`
//! Rate limit: reported per response in `x-ratelimit-limit` / `x-ratelimit-remaining`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::*;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{BetExecutor, BetRequest};
use crate::types::{coin, to_units, Outcome, PlacementError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_API_BASE: &str = "https://wolfbet.com/api/v1";
const PLATFORM_NAME: &str = "wolfbet";
const REQUEST_TIMEOUT_SECS: u64 = 20;

// ---------------------------------------------------------------------------
// API response types (WolfBet JSON → Rust)
// ---------------------------------------------------------------------------

/// Response from `POST /bet/place`.
#[derive(Debug, Deserialize)]
struct PlaceBetResponse {
    #[serde(default)]
    bet: Option<ApiBet>,
}

/// The settled bet. Numeric fields arrive as strings or numbers depending
/// on the endpoint version, so they are kept as raw JSON values.
#[derive(Debug, Deserialize)]
struct ApiBet {
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    profit: Option<Value>,
    #[serde(default)]
    result_value: Option<Value>,
}

/// Response from `GET /user/balances`.
#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    balances: Vec<ApiBalance>,
}

#[derive(Debug, Deserialize)]
struct ApiBalance {
    #[serde(default)]
    currency: String,
    #[serde(default)]
    amount: Option<Value>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// WolfBet HTTP client.
pub struct WolfBetClient {
    http: Client,
    base_url: String,
    access_token: SecretString,
}

impl WolfBetClient {
    pub fn new(base_url: &str, access_token: SecretString) -> Result<Self, PlacementError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("DICEBOT/0.1.0 (dice-betting-client)")
            .build()
            .map_err(|e| PlacementError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(self.access_token.expose_secret())
            .header("Accept", "application/json")
            .header("X-Requested-With", "XMLHttpRequest")
    }

    /// Map non-success statuses to placement errors and decode the body.
    async fn read_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        what: &str,
    ) -> Result<T, PlacementError> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PlacementError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlacementError::Api {
                status: status.as_u16(),
                body,
            });
        }
        resp.json()
            .await
            .map_err(|e| PlacementError::Malformed(format!("{what}: {e}")))
    }
}

#[async_trait]
impl BetExecutor for WolfBetClient {
    async fn place_bet(&self, request: &BetRequest) -> Result<Outcome, PlacementError> {
        let url = format!("{}/bet/place", self.base_url);
        let payload = place_bet_payload(request);

        debug!(
            amount = %coin(request.amount),
            rule = %request.direction,
            bet_value = request.bet_value,
            "Placing WolfBet dice bet"
        );

        let resp = self
            .authorized(self.http.post(&url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| PlacementError::Network(e.to_string()))?;

        let headers = resp.headers();
        let limit = header_str(headers, "x-ratelimit-limit");
        let remaining = header_str(headers, "x-ratelimit-remaining");
        debug!(limit = ?limit, remaining = ?remaining, "WolfBet rate limit");
        if remaining.as_deref() == Some("0") {
            warn!(limit = ?limit, "WolfBet rate limit exhausted");
        }

        let body: PlaceBetResponse = Self::read_json(resp, "place bet response").await?;
        let bet = body
            .bet
            .ok_or_else(|| PlacementError::Malformed("response has no `bet` object".into()))?;
        outcome_from_bet(request, &bet)
    }

    async fn balance(&self, currency: &str) -> Result<Decimal, PlacementError> {
        let url = format!("{}/user/balances", self.base_url);
        let resp = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| PlacementError::Network(e.to_string()))?;

        let body: BalancesResponse = Self::read_json(resp, "balances response").await?;
        find_balance(&body, currency)
    }

    fn name(&self) -> &'static str {
        PLATFORM_NAME
    }
}

// ---------------------------------------------------------------------------
// Wire conversion
// ---------------------------------------------------------------------------

fn place_bet_payload(request: &BetRequest) -> Value {
    json!({
        "currency": request.currency,
        "game": "dice",
        "amount": format!("{:.8}", coin(request.amount)),
        "rule": request.direction.as_rule(),
        "bet_value": format!("{:.2}", request.bet_value),
        "multiplier": format!("{:.4}", request.multiplier),
    })
}

fn header_str(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Read a decimal from a JSON string or number.
fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        _ => None,
    }
}

fn units_value(value: Option<&Value>, field: &str) -> Result<Option<i64>, PlacementError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => decimal_value(v)
            .and_then(to_units)
            .map(Some)
            .ok_or_else(|| PlacementError::Malformed(format!("bad `{field}`: {v}"))),
    }
}

/// Convert a settled API bet into an [`Outcome`].
///
/// `profit` is net on a win; on a loss the stake is lost. The stake falls
/// back to the requested amount when the API omits it.
fn outcome_from_bet(request: &BetRequest, bet: &ApiBet) -> Result<Outcome, PlacementError> {
    let won = match bet.state.as_str() {
        "win" => true,
        "lose" | "loss" => false,
        other => {
            return Err(PlacementError::Malformed(format!(
                "unknown bet state `{other}`"
            )))
        }
    };

    let wager = units_value(bet.amount.as_ref(), "amount")?
        .and_then(|u| u64::try_from(u).ok())
        .unwrap_or(request.amount);

    let payout = if won {
        let profit = units_value(bet.profit.as_ref(), "profit")?.unwrap_or(0);
        u64::try_from(crate::types::signed(wager).saturating_add(profit.max(0))).unwrap_or(0)
    } else {
        0
    };

    let roll = bet
        .result_value
        .as_ref()
        .and_then(decimal_value)
        .and_then(|d| d.to_f64())
        .unwrap_or(f64::NAN);

    Ok(Outcome {
        bet_id: bet.hash.clone().unwrap_or_default(),
        won,
        wager,
        payout,
        multiplier: request.multiplier_f64(),
        chance: request.chance,
        direction: request.direction,
        bet_value: request.bet_value,
        roll,
        timestamp: Utc::now(),
    })
}

fn find_balance(body: &BalancesResponse, currency: &str) -> Result<Decimal, PlacementError> {
    body.balances
        .iter()
        .find(|b| b.currency.eq_ignore_ascii_case(currency))
        .and_then(|b| b.amount.as_ref())
        .and_then(decimal_value)
        .ok_or_else(|| PlacementError::Malformed(format!("no {currency} balance in response")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
