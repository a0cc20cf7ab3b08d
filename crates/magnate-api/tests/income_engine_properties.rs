use chrono::{DateTime, Duration, Utc};
use contracts::{
    AccountProfile, Category, GrowthCurve, InvestmentEntry, PurchasedInvestment, SECONDS_IN_MONTH,
};
use magnate_api::{GameApi, GameError, SqliteGameStore};

fn temp_db_path(name: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();

    std::env::temp_dir().join(format!("magnate_props_{name}_{nanos}.sqlite"))
}

fn millis(now: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now.timestamp_millis()).expect("millis round-trip")
}

fn kiosk_entry() -> InvestmentEntry {
    InvestmentEntry {
        investment_id: "inv_kiosk".to_string(),
        name: "Kiosk".to_string(),
        description: "Corner kiosk".to_string(),
        category: Category::Business,
        curve: GrowthCurve::Linear,
        base_income: 10.0,
        base_cost: 100.0,
        base_level: 1,
        multiplier: 1.2,
        bonus_percent: 0.0,
        active: true,
        order: 0,
    }
}

#[test]
fn concurrent_credits_with_the_same_token_admit_exactly_one_winner() {
    let db_path = temp_db_path("cas");
    let mut store = SqliteGameStore::open(&db_path).expect("open store");
    let registered = millis(Utc::now() - Duration::seconds(600));

    let versioned = store
        .upsert_account("5001", AccountProfile::default(), registered)
        .expect("upsert");
    let stale_token = versioned.account.last_accrual_at;

    let now = millis(Utc::now());
    let first = store
        .conditional_credit("5001", stale_token, 25.0, now)
        .expect("first credit runs");
    let second = store
        .conditional_credit("5001", stale_token, 25.0, now)
        .expect("second credit runs");

    assert!(first.is_some(), "first writer wins");
    assert!(second.is_none(), "second writer observes a guard rejection");

    let account = store
        .find_account("5001")
        .expect("readable")
        .expect("exists")
        .account;
    assert_eq!(account.balance, 25.0);
    assert_eq!(account.last_accrual_at, now);

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn credit_advances_the_anchor_monotonically() {
    let db_path = temp_db_path("anchor");
    let mut store = SqliteGameStore::open(&db_path).expect("open store");
    let registered = millis(Utc::now() - Duration::seconds(600));

    let versioned = store
        .upsert_account("5002", AccountProfile::default(), registered)
        .expect("upsert");

    let now = millis(Utc::now());
    let updated = store
        .conditional_credit("5002", versioned.account.last_accrual_at, 1.0, now)
        .expect("credit runs")
        .expect("credit wins");

    assert!(updated.last_accrual_at > registered);
    assert_eq!(updated.last_accrual_at, now);

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn stale_purchase_save_is_rejected_after_a_concurrent_credit() {
    let db_path = temp_db_path("stale_save");
    let mut store = SqliteGameStore::open(&db_path).expect("open store");
    let registered = millis(Utc::now() - Duration::seconds(600));

    let versioned = store
        .upsert_account("5003", AccountProfile::default(), registered)
        .expect("upsert");
    let stale_version = versioned.version;
    let mut account = versioned.account;

    // A credit lands between the purchase path's read and its save.
    let now = millis(Utc::now());
    store
        .conditional_credit("5003", account.last_accrual_at, 10.0, now)
        .expect("credit runs")
        .expect("credit wins");

    account.balance = 999.0;
    let saved = store
        .save_account(&account, stale_version, now)
        .expect("save runs");
    assert!(!saved, "stale save must lose to the credited version");

    let fresh = store
        .find_account("5003")
        .expect("readable")
        .expect("exists")
        .account;
    assert_eq!(fresh.balance, 10.0, "the credit survives intact");

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn split_accrual_windows_credit_the_same_total_as_one_window() {
    let db_path = temp_db_path("additivity");
    let rate = 2592.0;
    let start = millis(Utc::now() - Duration::seconds(10_000));
    let mid = millis(start + Duration::seconds(4_000));
    let end = millis(start + Duration::seconds(10_000));

    let single = {
        let db = temp_db_path("additivity_single");
        let mut api = GameApi::open(&db).expect("open");
        seed_earner(&mut api, &db, "6001", rate, start);
        let outcome = api.credit_elapsed_income("6001", end).expect("credit");
        let _ = std::fs::remove_file(&db);
        outcome.added()
    };

    let split = {
        let mut api = GameApi::open(&db_path).expect("open");
        seed_earner(&mut api, &db_path, "6001", rate, start);
        let first = api.credit_elapsed_income("6001", mid).expect("credit");
        let second = api.credit_elapsed_income("6001", end).expect("credit");
        first.added() + second.added()
    };

    assert!((single - split).abs() < 1e-9);
    assert!((single - rate * 10_000.0 / SECONDS_IN_MONTH).abs() < 1e-9);

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn purchase_then_accrual_pays_the_new_monthly_rate() {
    let db_path = temp_db_path("purchase_accrual");
    let mut api = GameApi::open(&db_path).expect("open");
    let registered = millis(Utc::now() - Duration::seconds(86_400));

    seed_earner(&mut api, &db_path, "6002", 0.0, registered);
    fund(&db_path, "6002", 1000.0, registered);
    api.upsert_catalog_entry(&kiosk_entry(), registered)
        .expect("seed catalog");

    let receipt = api
        .purchase_investment("6002", "inv_kiosk", registered)
        .expect("purchase");
    assert_eq!(receipt.balance, 900.0);
    let monthly_rate = receipt.passive_income;
    assert!(monthly_rate > 0.0);

    let now = millis(registered + Duration::seconds(86_400));
    let outcome = api.credit_elapsed_income("6002", now).expect("credit");

    let expected = monthly_rate * 86_400.0 / SECONDS_IN_MONTH;
    assert!((outcome.added() - expected).abs() < 1e-6);

    let account = api.account("6002").expect("readable");
    assert_eq!(account.last_accrual_at, now);
    assert!((account.balance - (900.0 + expected)).abs() < 1e-6);

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn one_undecodable_account_does_not_starve_the_scan() {
    let db_path = temp_db_path("scan_isolation");
    let mut api = GameApi::open(&db_path).expect("open");
    let registered = millis(Utc::now() - Duration::seconds(3_600));

    seed_earner(&mut api, &db_path, "6101", 2592.0, registered);
    seed_earner(&mut api, &db_path, "6102", 2592.0, registered);

    let conn = rusqlite::Connection::open(&db_path).expect("raw connection");
    conn.execute(
        "UPDATE accounts SET investments_json = 'not json' WHERE account_id = '6101'",
        [],
    )
    .expect("corrupt one row");
    drop(conn);

    let now = millis(registered + Duration::seconds(3_600));
    let summary = api.run_accrual_scan(now, 1);

    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.credited, 1);

    let healthy = api.account("6102").expect("readable");
    assert!(healthy.balance > 0.0);

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn purchase_against_a_missing_account_or_entry_is_not_found() {
    let db_path = temp_db_path("not_found");
    let mut api = GameApi::open(&db_path).expect("open");
    let now = millis(Utc::now());

    assert!(matches!(
        api.purchase_investment("ghost", "inv_kiosk", now),
        Err(GameError::AccountNotFound(_))
    ));

    api.register_account("6003", AccountProfile::default(), now)
        .expect("register");
    assert!(matches!(
        api.purchase_investment("6003", "inv_ghost", now),
        Err(GameError::InvestmentNotFound(_))
    ));

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn catalog_inserts_append_to_the_sort_order() {
    let db_path = temp_db_path("catalog_order");
    let mut api = GameApi::open(&db_path).expect("open");
    let now = millis(Utc::now());

    let mut first = kiosk_entry();
    first.investment_id = "inv_a".to_string();
    let mut second = kiosk_entry();
    second.investment_id = "inv_b".to_string();
    second.category = Category::Finances;

    let first = api.upsert_catalog_entry(&first, now).expect("insert");
    let second = api.upsert_catalog_entry(&second, now).expect("insert");
    assert_eq!(first.order, 1);
    assert_eq!(second.order, 2);

    // Re-upserting without an explicit order keeps the assigned slot.
    let mut renamed = kiosk_entry();
    renamed.investment_id = "inv_a".to_string();
    renamed.name = "Renamed kiosk".to_string();
    let renamed = api.upsert_catalog_entry(&renamed, now).expect("update");
    assert_eq!(renamed.order, 1);
    assert_eq!(renamed.name, "Renamed kiosk");

    let active = api.list_active_catalog().expect("list");
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].investment_id, "inv_a");

    let finances = api
        .catalog_by_category(Category::Finances)
        .expect("filtered list");
    assert_eq!(finances.len(), 1);
    assert_eq!(finances[0].investment_id, "inv_b");

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn account_documents_round_trip_profile_and_investments() {
    let db_path = temp_db_path("round_trip");
    let mut store = SqliteGameStore::open(&db_path).expect("open store");
    let now = millis(Utc::now());

    let profile = AccountProfile {
        first_name: Some("Ada".to_string()),
        last_name: None,
        username: Some("ada_l".to_string()),
        language_code: Some("en".to_string()),
    };
    let versioned = store
        .upsert_account("7001", profile.clone(), now)
        .expect("upsert");

    let mut account = versioned.account;
    account.balance = 512.5;
    account.passive_income = 1000.0;
    account.level.current = 3;
    account.purchased.push(PurchasedInvestment {
        investment_id: "inv_kiosk".to_string(),
        category: Category::Business,
        level: 4,
        income: 20.7,
        purchase_date: now,
    });
    assert!(store
        .save_account(&account, versioned.version, now)
        .expect("save"));

    let loaded = store
        .find_account("7001")
        .expect("readable")
        .expect("exists")
        .account;
    assert_eq!(loaded, account);
    assert_eq!(loaded.profile, profile);

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn repeat_registration_refreshes_profile_without_touching_game_state() {
    let db_path = temp_db_path("reregister");
    let mut api = GameApi::open(&db_path).expect("open");
    let registered = millis(Utc::now() - Duration::seconds(600));

    api.register_account("7002", AccountProfile::default(), registered)
        .expect("register");
    fund(&db_path, "7002", 321.0, registered);

    let later = millis(Utc::now());
    let refreshed = api
        .register_account(
            "7002",
            AccountProfile {
                username: Some("returning_player".to_string()),
                ..AccountProfile::default()
            },
            later,
        )
        .expect("re-register");

    assert_eq!(refreshed.balance, 321.0);
    assert_eq!(refreshed.registered_at, registered);
    assert_eq!(refreshed.last_accrual_at, registered);
    assert_eq!(refreshed.last_login, later);
    assert_eq!(
        refreshed.profile.username.as_deref(),
        Some("returning_player")
    );

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn notification_targeting_filters_by_monthly_income() {
    let db_path = temp_db_path("targeting");
    let mut api = GameApi::open(&db_path).expect("open");
    let now = millis(Utc::now());

    for (account_id, income) in [("8001", 0.0), ("8002", 500.0), ("8003", 5000.0)] {
        api.register_account(account_id, AccountProfile::default(), now)
            .expect("register");
        if income > 0.0 {
            set_income(&db_path, account_id, income, now);
        }
    }

    let everyone = api.accounts_with_min_income(0.0).expect("query");
    assert_eq!(everyone.len(), 3);

    let earners = api.accounts_with_min_income(1000.0).expect("query");
    assert_eq!(earners.len(), 1);
    assert_eq!(earners[0].account_id, "8003");

    let _ = std::fs::remove_file(&db_path);
}

fn seed_earner(
    api: &mut GameApi,
    db_path: &std::path::Path,
    account_id: &str,
    monthly_income: f64,
    registered: DateTime<Utc>,
) {
    api.register_account(account_id, AccountProfile::default(), registered)
        .expect("register");
    if monthly_income > 0.0 {
        set_income(db_path, account_id, monthly_income, registered);
    }
}

fn set_income(
    db_path: &std::path::Path,
    account_id: &str,
    monthly_income: f64,
    now: DateTime<Utc>,
) {
    let mut store = SqliteGameStore::open(db_path).expect("second connection");
    let versioned = store
        .find_account(account_id)
        .expect("readable")
        .expect("exists");
    let mut account = versioned.account;
    account.passive_income = monthly_income;
    assert!(store
        .save_account(&account, versioned.version, now)
        .expect("save"));
}

fn fund(db_path: &std::path::Path, account_id: &str, balance: f64, now: DateTime<Utc>) {
    let mut store = SqliteGameStore::open(db_path).expect("second connection");
    let versioned = store
        .find_account(account_id)
        .expect("readable")
        .expect("exists");
    let mut account = versioned.account;
    account.balance = balance;
    assert!(store
        .save_account(&account, versioned.version, now)
        .expect("save"));
}
