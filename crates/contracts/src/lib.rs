//! v1 cross-boundary contracts for the game core, API, and persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const SCHEMA_VERSION_V1: &str = "1.0";

/// Fixed 30-day month convention. Both the accrual clock and the purchase
/// path convert through these constants; they must never drift apart.
pub const SECONDS_IN_MONTH: f64 = 30.0 * 24.0 * 3600.0;
pub const MINUTES_IN_MONTH: f64 = 30.0 * 24.0 * 60.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Finances,
    Technology,
    Business,
    Realestate,
}

/// Income growth curve of a catalog entry. Stored catalog rows may carry
/// legacy curve names; those deserialize to `Flat`, which values at the
/// entry's base income.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GrowthCurve {
    Linear,
    Parabolic,
    Exponential,
    InverseParabolic,
    #[serde(other)]
    Flat,
}

/// Admin-managed purchasable upgrade. `base_income` is denominated per
/// minute; `base_level` is the catalog floor below which the cost ladder
/// does not discount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestmentEntry {
    pub investment_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub curve: GrowthCurve,
    pub base_income: f64,
    pub base_cost: f64,
    pub base_level: u32,
    pub multiplier: f64,
    #[serde(default)]
    pub bonus_percent: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub order: i64,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerLevel {
    pub current: u32,
    pub max: u32,
}

impl Default for PlayerLevel {
    fn default() -> Self {
        Self {
            current: 1,
            max: 10,
        }
    }
}

/// One owned upgrade on an account. `income` caches the per-minute value at
/// the current level so clients can render without re-deriving the curve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchasedInvestment {
    pub investment_id: String,
    pub category: Category,
    pub level: u32,
    pub income: f64,
    pub purchase_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountProfile {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

/// A player's persistent game state. `passive_income` is a monthly rate,
/// mutated only by purchases; `last_accrual_at` is both the elapsed-time
/// anchor and the compare-and-set token for credits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub account_id: String,
    #[serde(default)]
    pub profile: AccountProfile,
    #[serde(default)]
    pub blocked: bool,
    pub registered_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub last_accrual_at: DateTime<Utc>,
    pub balance: f64,
    pub passive_income: f64,
    #[serde(default)]
    pub level: PlayerLevel,
    #[serde(default)]
    pub purchased: Vec<PurchasedInvestment>,
}

impl Account {
    /// Fresh account as created on first contact: zero balance and income,
    /// accrual anchored at the registration instant.
    pub fn new(account_id: impl Into<String>, profile: AccountProfile, now: DateTime<Utc>) -> Self {
        Self {
            account_id: account_id.into(),
            profile,
            blocked: false,
            registered_at: now,
            last_login: now,
            last_accrual_at: now,
            balance: 0.0,
            passive_income: 0.0,
            level: PlayerLevel::default(),
            purchased: Vec::new(),
        }
    }

    pub fn purchased_entry(&self, investment_id: &str) -> Option<&PurchasedInvestment> {
        self.purchased
            .iter()
            .find(|entry| entry.investment_id == investment_id)
    }
}

/// Outcome of a successful upgrade purchase, as reported back to the
/// client. `income` is the per-minute value at the new level; `next_cost`
/// is the price of the level after that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseReceipt {
    pub investment_id: String,
    pub balance: f64,
    pub passive_income: f64,
    pub new_level: u32,
    pub income: f64,
    pub next_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub message: String,
    #[serde(default)]
    pub important: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AccountNotFound,
    InvestmentNotFound,
    InvestmentInactive,
    InsufficientFunds,
    ConcurrentUpdateLost,
    InvalidQuery,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}

/// Envelope for messages delivered over an account's live push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushMessage {
    pub schema_version: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub account_id: String,
    pub payload: Value,
}

impl PushMessage {
    pub fn connected(account_id: &str) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "connected".to_string(),
            account_id: account_id.to_string(),
            payload: json!({}),
        }
    }

    pub fn notification(account_id: &str, notification: &Notification) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "notification".to_string(),
            account_id: account_id.to_string(),
            payload: json!({
                "message": notification.message,
                "important": notification.important,
            }),
        }
    }
}
