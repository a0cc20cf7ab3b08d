use chrono::{DateTime, Utc};
use contracts::{Account, InvestmentEntry, PurchaseReceipt, PurchasedInvestment, MINUTES_IN_MONTH};

use crate::valuation::{income_per_minute, upgrade_cost};

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseError {
    Inactive,
    InsufficientFunds { balance: f64, required: f64 },
}

/// Everything a purchase will change, computed up front so the mutation is
/// a deterministic application of the plan. `delta_income_month` is the
/// per-minute income delta converted to the account's monthly unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchasePlan {
    pub investment_id: String,
    pub current_level: u32,
    pub new_level: u32,
    pub cost_now: f64,
    pub income_before: f64,
    pub income_after: f64,
    pub delta_income_month: f64,
    pub next_cost: f64,
}

/// Validate an upgrade of `entry` by one level and price it against the
/// account. Rejection leaves no trace; only `apply_purchase` mutates.
///
/// An investment the account has never bought starts at level 0, which is
/// distinct from the catalog's `base_level` floor on the cost ladder.
pub fn plan_purchase(
    account: &Account,
    entry: &InvestmentEntry,
) -> Result<PurchasePlan, PurchaseError> {
    if !entry.active {
        return Err(PurchaseError::Inactive);
    }

    let current_level = account
        .purchased_entry(&entry.investment_id)
        .map(|owned| owned.level)
        .unwrap_or(0);

    let cost_now = upgrade_cost(entry, current_level);
    if account.balance < cost_now {
        return Err(PurchaseError::InsufficientFunds {
            balance: account.balance,
            required: cost_now,
        });
    }

    let new_level = current_level + 1;
    let player_level = account.level.current;
    let income_before = income_per_minute(entry, current_level, player_level);
    let income_after = income_per_minute(entry, new_level, player_level);

    Ok(PurchasePlan {
        investment_id: entry.investment_id.clone(),
        current_level,
        new_level,
        cost_now,
        income_before,
        income_after,
        delta_income_month: (income_after - income_before) * MINUTES_IN_MONTH,
        next_cost: upgrade_cost(entry, new_level + 1),
    })
}

/// Apply a validated plan: debit the cost, add the monthly income delta,
/// and upsert the owned-investment entry at its new level.
pub fn apply_purchase(
    account: &mut Account,
    entry: &InvestmentEntry,
    plan: &PurchasePlan,
    now: DateTime<Utc>,
) -> PurchaseReceipt {
    account.balance -= plan.cost_now;
    account.passive_income += plan.delta_income_month;

    match account
        .purchased
        .iter_mut()
        .find(|owned| owned.investment_id == plan.investment_id)
    {
        Some(owned) => {
            owned.level = plan.new_level;
            owned.income = plan.income_after;
            owned.purchase_date = now;
        }
        None => account.purchased.push(PurchasedInvestment {
            investment_id: plan.investment_id.clone(),
            category: entry.category,
            level: plan.new_level,
            income: plan.income_after,
            purchase_date: now,
        }),
    }

    PurchaseReceipt {
        investment_id: plan.investment_id.clone(),
        balance: account.balance,
        passive_income: account.passive_income,
        new_level: plan.new_level,
        income: plan.income_after,
        next_cost: plan.next_cost,
    }
}
