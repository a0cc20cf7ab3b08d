use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use contracts::{Account, AccountProfile, Category, GrowthCurve, InvestmentEntry};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    Corrupt(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
            Self::Corrupt(detail) => write!(f, "corrupt stored record: {detail}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// An account together with its optimistic version counter. Every mutation
/// of game state bumps the counter; both the accrual credit and the
/// purchase save check it (directly or via `last_accrual_at`) so neither
/// path can silently clobber the other.
#[derive(Debug, Clone)]
pub struct VersionedAccount {
    pub account: Account,
    pub version: i64,
}

#[derive(Debug)]
pub struct SqliteGameStore {
    conn: Connection,
}

const ACCOUNT_COLUMNS: &str = "account_id, balance, passive_income, last_accrual_at, \
     player_level, player_level_max, blocked, version, profile_json, investments_json, \
     registered_at, last_login";

const CATALOG_COLUMNS: &str = "investment_id, name, description, category, curve, \
     base_income, base_cost, base_level, multiplier, bonus_percent, active, sort_order";

impl SqliteGameStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    /// Lazy create-or-refresh on first contact. A new row starts with zero
    /// balance and income and `last_accrual_at = now`; an existing row only
    /// refreshes its profile and `last_login`, never its game state.
    pub fn upsert_account(
        &mut self,
        account_id: &str,
        profile: AccountProfile,
        now: DateTime<Utc>,
    ) -> Result<VersionedAccount, PersistenceError> {
        let fresh = Account::new(account_id, profile, now);
        let profile_json = serde_json::to_string(&fresh.profile)?;
        let investments_json = serde_json::to_string(&fresh.purchased)?;

        self.conn.execute(
            "INSERT INTO accounts (
                account_id, balance, passive_income, last_accrual_at,
                player_level, player_level_max, blocked, version,
                profile_json, investments_json, registered_at, last_login,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
             ON CONFLICT(account_id) DO UPDATE SET
                profile_json = excluded.profile_json,
                last_login = excluded.last_login,
                updated_at = excluded.updated_at",
            params![
                fresh.account_id.as_str(),
                fresh.balance,
                fresh.passive_income,
                fresh.last_accrual_at.timestamp_millis(),
                i64::from(fresh.level.current),
                i64::from(fresh.level.max),
                0_i64,
                0_i64,
                profile_json,
                investments_json,
                now.timestamp_millis(),
                now.timestamp_millis(),
                now.to_rfc3339(),
            ],
        )?;

        self.find_account(account_id)?.ok_or_else(|| {
            PersistenceError::Corrupt(format!("account {account_id} missing after upsert"))
        })
    }

    pub fn find_account(
        &self,
        account_id: &str,
    ) -> Result<Option<VersionedAccount>, PersistenceError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1"),
                params![account_id],
                read_account_row,
            )
            .optional()?;

        row.map(account_from_row).transpose()
    }

    /// Compare-and-set credit: adds `amount` and advances `last_accrual_at`
    /// to `now` only if the stored anchor still equals the one the caller
    /// read. `None` means another writer got there first; that is a benign
    /// skip, not an error.
    pub fn conditional_credit(
        &mut self,
        account_id: &str,
        expected_last_accrual: DateTime<Utc>,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, PersistenceError> {
        let affected = self.conn.execute(
            "UPDATE accounts SET
                balance = balance + ?1,
                last_accrual_at = ?2,
                version = version + 1,
                updated_at = ?3
             WHERE account_id = ?4 AND last_accrual_at = ?5",
            params![
                amount,
                now.timestamp_millis(),
                now.to_rfc3339(),
                account_id,
                expected_last_accrual.timestamp_millis(),
            ],
        )?;

        if affected == 0 {
            return Ok(None);
        }

        Ok(self
            .find_account(account_id)?
            .map(|versioned| versioned.account))
    }

    /// Whole-document save guarded by the version counter the account was
    /// read at. Returns false (no write) when another mutation landed in
    /// between; callers surface that as a retryable conflict.
    pub fn save_account(
        &mut self,
        account: &Account,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, PersistenceError> {
        let profile_json = serde_json::to_string(&account.profile)?;
        let investments_json = serde_json::to_string(&account.purchased)?;

        let affected = self.conn.execute(
            "UPDATE accounts SET
                balance = ?1,
                passive_income = ?2,
                last_accrual_at = ?3,
                player_level = ?4,
                player_level_max = ?5,
                blocked = ?6,
                profile_json = ?7,
                investments_json = ?8,
                last_login = ?9,
                version = version + 1,
                updated_at = ?10
             WHERE account_id = ?11 AND version = ?12",
            params![
                account.balance,
                account.passive_income,
                account.last_accrual_at.timestamp_millis(),
                i64::from(account.level.current),
                i64::from(account.level.max),
                i64::from(account.blocked),
                profile_json,
                investments_json,
                account.last_login.timestamp_millis(),
                now.to_rfc3339(),
                account.account_id.as_str(),
                expected_version,
            ],
        )?;

        Ok(affected == 1)
    }

    /// Accounts eligible for the accrual scan. The filter is an
    /// optimization; correctness never depends on it because the next scan's
    /// elapsed-time math covers any gap. A row that fails to decode is
    /// logged and skipped so one bad record cannot starve every other
    /// account of its credit.
    pub fn accounts_due(&self, cutoff: DateTime<Utc>) -> Result<Vec<Account>, PersistenceError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE passive_income > 0 AND last_accrual_at < ?1
             ORDER BY account_id ASC"
        ))?;

        let rows = stmt.query_map(params![cutoff.timestamp_millis()], read_account_row)?;

        let mut accounts = Vec::new();
        for row in rows {
            match account_from_row(row?) {
                Ok(versioned) => accounts.push(versioned.account),
                Err(err) => log::error!("[accounts-due] skipping undecodable account row: {err}"),
            }
        }

        Ok(accounts)
    }

    /// Notification targeting: every unblocked account at or above the
    /// given monthly income.
    pub fn accounts_with_min_income(&self, min: f64) -> Result<Vec<Account>, PersistenceError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE blocked = 0 AND passive_income >= ?1
             ORDER BY account_id ASC"
        ))?;

        let rows = stmt.query_map(params![min], read_account_row)?;
        collect_accounts(rows)
    }

    /// Admin upsert of a catalog entry. A freshly inserted entry without an
    /// explicit order lands at the end of the sort order.
    pub fn upsert_entry(
        &mut self,
        entry: &InvestmentEntry,
        now: DateTime<Utc>,
    ) -> Result<InvestmentEntry, PersistenceError> {
        let existing_order: Option<i64> = self
            .conn
            .query_row(
                "SELECT sort_order FROM catalog WHERE investment_id = ?1",
                params![entry.investment_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let sort_order = if entry.order > 0 {
            entry.order
        } else if let Some(current) = existing_order {
            current
        } else {
            self.conn.query_row(
                "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM catalog",
                [],
                |row| row.get(0),
            )?
        };

        self.conn.execute(
            "INSERT INTO catalog (
                investment_id, name, description, category, curve,
                base_income, base_cost, base_level, multiplier, bonus_percent,
                active, sort_order, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
             ON CONFLICT(investment_id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                category = excluded.category,
                curve = excluded.curve,
                base_income = excluded.base_income,
                base_cost = excluded.base_cost,
                base_level = excluded.base_level,
                multiplier = excluded.multiplier,
                bonus_percent = excluded.bonus_percent,
                active = excluded.active,
                sort_order = excluded.sort_order,
                updated_at = excluded.updated_at",
            params![
                entry.investment_id.as_str(),
                entry.name.as_str(),
                entry.description.as_str(),
                enum_to_text(&entry.category)?,
                enum_to_text(&entry.curve)?,
                entry.base_income,
                entry.base_cost,
                i64::from(entry.base_level),
                entry.multiplier,
                entry.bonus_percent,
                i64::from(entry.active),
                sort_order,
                now.to_rfc3339(),
            ],
        )?;

        self.find_entry(&entry.investment_id)?.ok_or_else(|| {
            PersistenceError::Corrupt(format!(
                "catalog entry {} missing after upsert",
                entry.investment_id
            ))
        })
    }

    pub fn find_entry(
        &self,
        investment_id: &str,
    ) -> Result<Option<InvestmentEntry>, PersistenceError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {CATALOG_COLUMNS} FROM catalog WHERE investment_id = ?1"),
                params![investment_id],
                read_catalog_row,
            )
            .optional()?;

        row.map(entry_from_row).transpose()
    }

    pub fn list_active(&self) -> Result<Vec<InvestmentEntry>, PersistenceError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CATALOG_COLUMNS} FROM catalog
             WHERE active = 1
             ORDER BY sort_order ASC, investment_id ASC"
        ))?;

        let rows = stmt.query_map([], read_catalog_row)?;
        collect_entries(rows)
    }

    pub fn list_by_category(
        &self,
        category: Category,
    ) -> Result<Vec<InvestmentEntry>, PersistenceError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CATALOG_COLUMNS} FROM catalog
             WHERE active = 1 AND category = ?1
             ORDER BY sort_order ASC, investment_id ASC"
        ))?;

        let rows = stmt.query_map(params![enum_to_text(&category)?], read_catalog_row)?;
        collect_entries(rows)
    }

    fn configure(&mut self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS accounts (
                account_id TEXT PRIMARY KEY,
                balance REAL NOT NULL,
                passive_income REAL NOT NULL,
                last_accrual_at INTEGER NOT NULL,
                player_level INTEGER NOT NULL,
                player_level_max INTEGER NOT NULL,
                blocked INTEGER NOT NULL,
                version INTEGER NOT NULL,
                profile_json TEXT NOT NULL,
                investments_json TEXT NOT NULL,
                registered_at INTEGER NOT NULL,
                last_login INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS catalog (
                investment_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                curve TEXT NOT NULL,
                base_income REAL NOT NULL,
                base_cost REAL NOT NULL,
                base_level INTEGER NOT NULL,
                multiplier REAL NOT NULL,
                bonus_percent REAL NOT NULL,
                active INTEGER NOT NULL,
                sort_order INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_accounts_income_accrual
                ON accounts(passive_income, last_accrual_at);
            CREATE INDEX IF NOT EXISTS idx_catalog_active_order
                ON catalog(active, sort_order);
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, name, applied_at)
             VALUES(1, 'initial_v1', datetime('now'))",
            [],
        )?;

        Ok(())
    }
}

struct AccountRow {
    account_id: String,
    balance: f64,
    passive_income: f64,
    last_accrual_at: i64,
    player_level: i64,
    player_level_max: i64,
    blocked: i64,
    version: i64,
    profile_json: String,
    investments_json: String,
    registered_at: i64,
    last_login: i64,
}

fn read_account_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        account_id: row.get(0)?,
        balance: row.get(1)?,
        passive_income: row.get(2)?,
        last_accrual_at: row.get(3)?,
        player_level: row.get(4)?,
        player_level_max: row.get(5)?,
        blocked: row.get(6)?,
        version: row.get(7)?,
        profile_json: row.get(8)?,
        investments_json: row.get(9)?,
        registered_at: row.get(10)?,
        last_login: row.get(11)?,
    })
}

fn account_from_row(row: AccountRow) -> Result<VersionedAccount, PersistenceError> {
    let account = Account {
        account_id: row.account_id,
        profile: serde_json::from_str(&row.profile_json)?,
        blocked: row.blocked != 0,
        registered_at: datetime_from_millis(row.registered_at)?,
        last_login: datetime_from_millis(row.last_login)?,
        last_accrual_at: datetime_from_millis(row.last_accrual_at)?,
        balance: row.balance,
        passive_income: row.passive_income,
        level: contracts::PlayerLevel {
            current: clamp_level(row.player_level),
            max: clamp_level(row.player_level_max),
        },
        purchased: serde_json::from_str(&row.investments_json)?,
    };

    Ok(VersionedAccount {
        account,
        version: row.version,
    })
}

struct CatalogRow {
    investment_id: String,
    name: String,
    description: String,
    category: String,
    curve: String,
    base_income: f64,
    base_cost: f64,
    base_level: i64,
    multiplier: f64,
    bonus_percent: f64,
    active: i64,
    sort_order: i64,
}

fn read_catalog_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogRow> {
    Ok(CatalogRow {
        investment_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        curve: row.get(4)?,
        base_income: row.get(5)?,
        base_cost: row.get(6)?,
        base_level: row.get(7)?,
        multiplier: row.get(8)?,
        bonus_percent: row.get(9)?,
        active: row.get(10)?,
        sort_order: row.get(11)?,
    })
}

fn entry_from_row(row: CatalogRow) -> Result<InvestmentEntry, PersistenceError> {
    Ok(InvestmentEntry {
        investment_id: row.investment_id,
        name: row.name,
        description: row.description,
        category: enum_from_text(&row.category)?,
        // Unknown curve names fall back to the flat curve via serde.
        curve: enum_from_text::<GrowthCurve>(&row.curve)?,
        base_income: row.base_income,
        base_cost: row.base_cost,
        base_level: clamp_level(row.base_level),
        multiplier: row.multiplier,
        bonus_percent: row.bonus_percent,
        active: row.active != 0,
        order: row.sort_order,
    })
}

fn collect_accounts(
    rows: impl Iterator<Item = rusqlite::Result<AccountRow>>,
) -> Result<Vec<Account>, PersistenceError> {
    let mut accounts = Vec::new();
    for row in rows {
        accounts.push(account_from_row(row?)?.account);
    }
    Ok(accounts)
}

fn collect_entries(
    rows: impl Iterator<Item = rusqlite::Result<CatalogRow>>,
) -> Result<Vec<InvestmentEntry>, PersistenceError> {
    let mut entries = Vec::new();
    for row in rows {
        entries.push(entry_from_row(row?)?);
    }
    Ok(entries)
}

fn datetime_from_millis(millis: i64) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| PersistenceError::Corrupt(format!("timestamp out of range: {millis}")))
}

fn clamp_level(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn enum_to_text<T: Serialize>(value: &T) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(value)?.trim_matches('"').to_string())
}

fn enum_from_text<T: DeserializeOwned>(raw: &str) -> Result<T, PersistenceError> {
    Ok(serde_json::from_str(&format!("\"{raw}\""))?)
}
