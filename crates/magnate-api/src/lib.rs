//! Game facade over SQLite persistence: elapsed-income accrual with a CAS
//! guard, version-checked purchase transactions, the periodic income clock,
//! and the axum HTTP/WebSocket server.

mod clock;
mod dispatcher;
mod persistence;
mod registry;
mod server;

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use contracts::{Account, AccountProfile, Category, InvestmentEntry, PurchaseReceipt};
use magnate_core::{apply_purchase, elapsed_credit, plan_purchase, PurchaseError};

pub use clock::{IncomeClock, DEFAULT_ACCRUAL_INTERVAL, DEFAULT_ACCRUAL_MARGIN_SECONDS};
pub use dispatcher::{
    DispatchSummary, GatewayError, LogGateway, MessageGateway, NotificationDispatcher,
};
pub use persistence::{PersistenceError, SqliteGameStore, VersionedAccount};
pub use registry::ConnectionRegistry;
pub use server::{serve, serve_with_gateway, ServerError};

#[derive(Debug)]
pub enum GameError {
    AccountNotFound(String),
    InvestmentNotFound(String),
    InvestmentInactive(String),
    InsufficientFunds { balance: f64, required: f64 },
    UpdateContested(String),
    Persistence(PersistenceError),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountNotFound(account_id) => write!(f, "account {account_id} not found"),
            Self::InvestmentNotFound(investment_id) => {
                write!(f, "investment {investment_id} not found")
            }
            Self::InvestmentInactive(investment_id) => {
                write!(f, "investment {investment_id} is not active")
            }
            Self::InsufficientFunds { balance, required } => {
                write!(f, "insufficient funds: balance={balance} required={required}")
            }
            Self::UpdateContested(account_id) => {
                write!(f, "account {account_id} was updated concurrently")
            }
            Self::Persistence(err) => write!(f, "persistence failure: {err}"),
        }
    }
}

impl std::error::Error for GameError {}

impl From<PersistenceError> for GameError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

/// Result of an on-demand income collection. `Contested` means the CAS
/// guard lost to a concurrent writer; the fresh balance is reported and the
/// caller may simply retry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CreditOutcome {
    Credited { added: f64, balance: f64 },
    Idle { balance: f64 },
    Contested { balance: f64 },
}

impl CreditOutcome {
    pub fn added(&self) -> f64 {
        match self {
            Self::Credited { added, .. } => *added,
            Self::Idle { .. } | Self::Contested { .. } => 0.0,
        }
    }

    pub fn balance(&self) -> f64 {
        match self {
            Self::Credited { balance, .. }
            | Self::Idle { balance }
            | Self::Contested { balance } => *balance,
        }
    }

    pub fn is_contested(&self) -> bool {
        matches!(self, Self::Contested { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScanSummary {
    pub scanned: u64,
    pub credited: u64,
    pub contested: u64,
    pub failed: u64,
    pub total_added: f64,
}

#[derive(Debug)]
pub struct GameApi {
    store: SqliteGameStore,
}

impl GameApi {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Ok(Self {
            store: SqliteGameStore::open(path)?,
        })
    }

    /// Lazy upsert on first contact; repeat calls refresh the profile and
    /// last-login stamp without touching game state.
    pub fn register_account(
        &mut self,
        account_id: &str,
        profile: AccountProfile,
        now: DateTime<Utc>,
    ) -> Result<Account, GameError> {
        Ok(self.store.upsert_account(account_id, profile, now)?.account)
    }

    pub fn account(&self, account_id: &str) -> Result<Account, GameError> {
        self.store
            .find_account(account_id)?
            .map(|versioned| versioned.account)
            .ok_or_else(|| GameError::AccountNotFound(account_id.to_string()))
    }

    /// On-demand variant of the clock tick for one account. Shares the
    /// elapsed-time formula and the CAS guard with the background scan, so
    /// the two paths can never double-credit the same window.
    pub fn credit_elapsed_income(
        &mut self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CreditOutcome, GameError> {
        let versioned = self
            .store
            .find_account(account_id)?
            .ok_or_else(|| GameError::AccountNotFound(account_id.to_string()))?;
        let account = versioned.account;

        let Some(credit) = elapsed_credit(account.passive_income, account.last_accrual_at, now)
        else {
            return Ok(CreditOutcome::Idle {
                balance: account.balance,
            });
        };

        match self
            .store
            .conditional_credit(account_id, account.last_accrual_at, credit.amount, now)?
        {
            Some(updated) => {
                log::info!(
                    "[income] account {account_id} +{:.2} (sec={}) -> balance={:.2}",
                    credit.amount,
                    credit.elapsed_seconds,
                    updated.balance
                );
                Ok(CreditOutcome::Credited {
                    added: credit.amount,
                    balance: updated.balance,
                })
            }
            None => {
                let fresh = self
                    .store
                    .find_account(account_id)?
                    .ok_or_else(|| GameError::AccountNotFound(account_id.to_string()))?;
                Ok(CreditOutcome::Contested {
                    balance: fresh.account.balance,
                })
            }
        }
    }

    /// Atomic one-level upgrade: plan against the catalog, apply to a copy,
    /// and save the whole document under its version guard. A concurrent
    /// credit between read and save surfaces as `UpdateContested` with no
    /// partial state change.
    pub fn purchase_investment(
        &mut self,
        account_id: &str,
        investment_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PurchaseReceipt, GameError> {
        let VersionedAccount {
            mut account,
            version,
        } = self
            .store
            .find_account(account_id)?
            .ok_or_else(|| GameError::AccountNotFound(account_id.to_string()))?;

        let entry = self
            .store
            .find_entry(investment_id)?
            .ok_or_else(|| GameError::InvestmentNotFound(investment_id.to_string()))?;

        let plan = plan_purchase(&account, &entry).map_err(|err| match err {
            PurchaseError::Inactive => GameError::InvestmentInactive(investment_id.to_string()),
            PurchaseError::InsufficientFunds { balance, required } => {
                GameError::InsufficientFunds { balance, required }
            }
        })?;

        let receipt = apply_purchase(&mut account, &entry, &plan, now);
        if !self.store.save_account(&account, version, now)? {
            return Err(GameError::UpdateContested(account_id.to_string()));
        }

        log::info!(
            "[purchase] account {account_id} bought {investment_id} (lvl {}->{}) \
             -cost={:.0}, +income_month={:.2}, balance={:.2}, passive_income={:.2}",
            plan.current_level,
            plan.new_level,
            plan.cost_now,
            plan.delta_income_month,
            receipt.balance,
            receipt.passive_income
        );

        Ok(receipt)
    }

    /// One accrual tick: credit every due account, skipping CAS losers and
    /// isolating per-account store failures so a bad record never aborts
    /// the scan.
    pub fn run_accrual_scan(&mut self, now: DateTime<Utc>, margin_seconds: i64) -> ScanSummary {
        let cutoff = now - Duration::seconds(margin_seconds);
        let due = match self.store.accounts_due(cutoff) {
            Ok(due) => due,
            Err(err) => {
                log::error!("[income-scan] eligibility query failed: {err}");
                return ScanSummary::default();
            }
        };

        let mut summary = ScanSummary::default();
        for account in due {
            summary.scanned += 1;

            let Some(credit) = elapsed_credit(account.passive_income, account.last_accrual_at, now)
            else {
                continue;
            };

            match self.store.conditional_credit(
                &account.account_id,
                account.last_accrual_at,
                credit.amount,
                now,
            ) {
                Ok(Some(updated)) => {
                    summary.credited += 1;
                    summary.total_added += credit.amount;
                    log::debug!(
                        "[income-scan] account {} +{:.2} (sec={}) -> balance={:.2}",
                        account.account_id,
                        credit.amount,
                        credit.elapsed_seconds,
                        updated.balance
                    );
                }
                Ok(None) => {
                    summary.contested += 1;
                    log::debug!(
                        "[income-scan] skip account {} - concurrent update",
                        account.account_id
                    );
                }
                Err(err) => {
                    summary.failed += 1;
                    log::error!(
                        "[income-scan] error crediting account {}: {err}",
                        account.account_id
                    );
                }
            }
        }

        summary
    }

    pub fn upsert_catalog_entry(
        &mut self,
        entry: &InvestmentEntry,
        now: DateTime<Utc>,
    ) -> Result<InvestmentEntry, GameError> {
        Ok(self.store.upsert_entry(entry, now)?)
    }

    pub fn catalog_entry(&self, investment_id: &str) -> Result<InvestmentEntry, GameError> {
        self.store
            .find_entry(investment_id)?
            .ok_or_else(|| GameError::InvestmentNotFound(investment_id.to_string()))
    }

    pub fn list_active_catalog(&self) -> Result<Vec<InvestmentEntry>, GameError> {
        Ok(self.store.list_active()?)
    }

    pub fn catalog_by_category(&self, category: Category) -> Result<Vec<InvestmentEntry>, GameError> {
        Ok(self.store.list_by_category(category)?)
    }

    pub fn accounts_with_min_income(&self, min: f64) -> Result<Vec<Account>, GameError> {
        Ok(self.store.accounts_with_min_income(min)?)
    }
}
