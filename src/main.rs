//! pnl-ledger CLI
//!
//! Compute per-currency PNL for a transaction history from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Compute a history stored as JSON
//! pnl-ledger compute --input history.json
//!
//! # Only rows on one network, PNL scoped to them, full table as JSON
//! pnl-ledger compute --input history.json --network Arbitrum --visible-only --format json
//!
//! # Generate a random history for testing
//! pnl-ledger generate --rows 100 --currencies BTC,ETH --output history.json
//! ```

use log::{error, info};
use pnl_ledger::config::EngineConfig;
use pnl_ledger::core::currency::CurrencySymbol;
use pnl_ledger::core::network::Network;
use pnl_ledger::core::transaction::{preprocess_stored_rows, TransactionRecord};
use pnl_ledger::simulation::generator::{generate_random_history, HistoryConfig};
use pnl_ledger::table::filter::RowFilter;
use pnl_ledger::table::recompute::{TableData, TableEngine};
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"pnl-ledger — per-currency cost basis and realized PNL

USAGE:
    pnl-ledger <COMMAND> [OPTIONS]

COMMANDS:
    compute     Recompute a transaction history and report holdings and PNL
    generate    Generate a random transaction history (for testing)
    help        Show this message

OPTIONS (compute):
    --input <FILE>      Path to JSON history: an array of rows or {{"rows": [...]}}
    --config <FILE>     JSON engine config (default: PNL_* environment variables)
    --format <FORMAT>   Output format: text (default) or json
    --visible-only      Scope PNL to the filtered rows
    --network <NAME>    Keep rows on this network (repeatable)
    --coin <SYMBOL>     Keep rows touching this currency (repeatable)
    --tag <TAG>         Keep rows with this tag (repeatable)
    --category <CAT>    Trades, Loans or All (repeatable)

OPTIONS (generate):
    --rows <N>          Number of days with activity (default: 50)
    --currencies <LIST> Comma-separated traded currencies (default: BTC,ETH,SOL,ARB)
    --networks <LIST>   Comma-separated networks (default: Ethereum,Arbitrum,Solana)
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    pnl-ledger compute --input history.json
    pnl-ledger compute --input history.json --format json
    pnl-ledger compute --input history.json --coin ETH --category Trades
    pnl-ledger generate --rows 200 --output history.json"#
    );
}

/// Accepted shapes of a stored history.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum HistoryFile {
    Rows(Vec<TransactionRecord>),
    Table { rows: Vec<TransactionRecord> },
}

fn load_rows(path: &str) -> Vec<TransactionRecord> {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    let file: HistoryFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"[
  {{ "id": "t-1", "date": "2024-01-01", "rowType": "Trade", "network": "Ethereum",
     "inAmount": "2", "inCurrency": "ETH", "outAmount": "6000", "outCurrency": "USDC",
     "usdValue": "6000" }}
]"#
        );
        process::exit(1);
    });

    let mut rows = match file {
        HistoryFile::Rows(rows) => rows,
        HistoryFile::Table { rows } => rows,
    };
    preprocess_stored_rows(&mut rows);
    rows
}

fn load_config(path: Option<&str>) -> EngineConfig {
    let loaded = match path {
        Some(path) => EngineConfig::from_file(path),
        None => EngineConfig::from_env(),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        process::exit(1);
    })
}

fn next_value(args: &[String], i: usize, flag: &str, what: &str) -> String {
    args.get(i).cloned().unwrap_or_else(|| {
        eprintln!("{} requires {}", flag, what);
        process::exit(1);
    })
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn print_rows(table: &TableData) {
    println!("=== Rows ===");
    for record in table.rows_displayed.iter().filter(|r| r.finalized) {
        let indent = if record.is_sub_row { "  " } else { "" };
        println!(
            "{}{} {:<12} {:<12} {}",
            indent,
            record.date,
            record.kind,
            record.network,
            record.id
        );
        let compute = match &record.compute {
            Some(compute) => compute,
            None => continue,
        };
        for currency in &compute.currencies {
            if let Some(snap) = compute.snapshot(currency) {
                println!(
                    "{}    {:<8} price {:>14} avg {:>14} pnl {:>14} cum pnl {:>14} held {:>18}",
                    indent,
                    currency.as_str(),
                    snap.price.round_dp(6).to_string(),
                    snap.avg_price.round_dp(6).to_string(),
                    snap.pnl.round_dp(2).to_string(),
                    snap.cum_pnl.round_dp(2).to_string(),
                    snap.net_amount.round_dp(8).to_string()
                );
            }
        }
    }
    println!();
}

fn cmd_compute(args: &[String]) {
    let mut input_path = None;
    let mut config_path = None;
    let mut format = "text".to_string();
    let mut visible_only = false;
    let mut filters = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(next_value(args, i, "--input", "a file path"));
            }
            "--config" => {
                i += 1;
                config_path = Some(next_value(args, i, "--config", "a file path"));
            }
            "--format" => {
                i += 1;
                format = next_value(args, i, "--format", "'text' or 'json'");
            }
            "--visible-only" => visible_only = true,
            "--network" => {
                i += 1;
                filters.push(RowFilter::network(next_value(args, i, "--network", "a network name")));
            }
            "--coin" => {
                i += 1;
                filters.push(RowFilter::coin(next_value(args, i, "--coin", "a currency symbol")));
            }
            "--tag" => {
                i += 1;
                filters.push(RowFilter::tag(next_value(args, i, "--tag", "a tag")));
            }
            "--category" => {
                i += 1;
                filters.push(RowFilter::category(next_value(
                    args,
                    i,
                    "--category",
                    "Trades, Loans or All",
                )));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let config = load_config(config_path.as_deref());
    let engine = TableEngine::from_config(&config);
    let rows = load_rows(&path);
    info!("loaded {} rows from {}", rows.len(), path);

    let mut table = TableData::from_config(rows, &config).with_filters(filters);
    if visible_only {
        table.compute_visible_only = true;
    }
    if let Err(e) = engine.recompute(&mut table) {
        error!("recompute failed: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if format == "json" {
        let json = serde_json::to_string_pretty(&table).unwrap_or_else(|e| {
            eprintln!("Error serializing table: {}", e);
            process::exit(1);
        });
        println!("{}", json);
    } else {
        print_rows(&table);
        println!("{}", table.stats);
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = HistoryConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--rows" => {
                i += 1;
                config.events = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--rows requires a number");
                        process::exit(1);
                    });
            }
            "--currencies" => {
                i += 1;
                let list = next_value(args, i, "--currencies", "a comma-separated list");
                config.currencies = split_list(&list).into_iter().map(CurrencySymbol::new).collect();
            }
            "--networks" => {
                i += 1;
                let list = next_value(args, i, "--networks", "a comma-separated list");
                config.networks = split_list(&list).into_iter().map(Network::new).collect();
            }
            "--output" => {
                i += 1;
                output_path = Some(next_value(args, i, "--output", "a file path"));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let rows = generate_random_history(&config);
    let json = serde_json::to_string_pretty(&rows).unwrap_or_else(|e| {
        eprintln!("Error serializing history: {}", e);
        process::exit(1);
    });

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} rows over {} days → {}",
            rows.len(),
            config.events,
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "compute" => cmd_compute(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
