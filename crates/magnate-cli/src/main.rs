use std::env;
use std::net::SocketAddr;

use chrono::Utc;
use contracts::InvestmentEntry;
use magnate_api::{serve, GameApi, DEFAULT_ACCRUAL_MARGIN_SECONDS};

fn print_usage() {
    println!("magnate-cli <command>");
    println!("commands:");
    println!("  serve [addr] [sqlite_path]");
    println!("    default addr: 127.0.0.1:8080");
    println!("  scan-once [sqlite_path]");
    println!("    runs a single passive-income accrual scan and exits");
    println!("  show <account_id> [sqlite_path]");
    println!("  seed-catalog <json_path> [sqlite_path]");
    println!("    upserts investment entries from a JSON array file");
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn default_sqlite_path() -> String {
    std::env::var("MAGNATE_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "magnate_game.sqlite".to_string())
}

fn parse_sqlite_path(value: Option<&String>) -> String {
    value
        .map(String::to_string)
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path)
}

fn open_api(path: &str) -> Result<GameApi, String> {
    GameApi::open(path).map_err(|err| format!("failed to open game store at {path}: {err}"))
}

fn run_scan_once(args: &[String]) -> Result<(), String> {
    let sqlite_path = parse_sqlite_path(args.get(2));
    let mut api = open_api(&sqlite_path)?;

    let summary = api.run_accrual_scan(Utc::now(), DEFAULT_ACCRUAL_MARGIN_SECONDS);
    println!(
        "scan done: scanned={} credited={} contested={} failed={} total_added={:.2} sqlite={}",
        summary.scanned,
        summary.credited,
        summary.contested,
        summary.failed,
        summary.total_added,
        sqlite_path
    );
    Ok(())
}

fn show_account(args: &[String]) -> Result<(), String> {
    let account_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing account_id".to_string())?;
    let sqlite_path = parse_sqlite_path(args.get(3));
    let api = open_api(&sqlite_path)?;

    let account = api
        .account(&account_id)
        .map_err(|err| format!("failed to load account: {err}"))?;

    println!(
        "account {} balance={:.2} passive_income={:.2} level={} investments={} last_accrual_at={}",
        account.account_id,
        account.balance,
        account.passive_income,
        account.level.current,
        account.purchased.len(),
        account.last_accrual_at
    );
    for owned in &account.purchased {
        println!(
            "  {} level={} income={:.2}/min since {}",
            owned.investment_id, owned.level, owned.income, owned.purchase_date
        );
    }
    Ok(())
}

fn seed_catalog(args: &[String]) -> Result<(), String> {
    let json_path = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing json_path".to_string())?;
    let sqlite_path = parse_sqlite_path(args.get(3));

    let raw = std::fs::read_to_string(&json_path)
        .map_err(|err| format!("failed to read {json_path}: {err}"))?;
    let entries: Vec<InvestmentEntry> = serde_json::from_str(&raw)
        .map_err(|err| format!("failed to parse {json_path}: {err}"))?;

    let mut api = open_api(&sqlite_path)?;
    let now = Utc::now();
    for entry in &entries {
        api.upsert_catalog_entry(entry, now)
            .map_err(|err| format!("failed to upsert {}: {err}", entry.investment_id))?;
    }

    println!("seeded {} catalog entries into {sqlite_path}", entries.len());
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("serve") => match parse_socket_addr(args.get(2)) {
            Ok(addr) => {
                let sqlite_path = parse_sqlite_path(args.get(3));
                let api = match open_api(&sqlite_path) {
                    Ok(api) => api,
                    Err(err) => {
                        eprintln!("error: {err}");
                        std::process::exit(1);
                    }
                };

                println!("serving api on http://{addr} (sqlite: {sqlite_path})");
                if let Err(err) = serve(addr, api).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        },
        Some("scan-once") => {
            if let Err(err) = run_scan_once(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        Some("show") => {
            if let Err(err) = show_account(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        Some("seed-catalog") => {
            if let Err(err) = seed_catalog(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        _ => {
            print_usage();
        }
    }
}
