use pnl_ledger::compute::engine::run_table_compute;
use pnl_ledger::config::EngineConfig;
use pnl_ledger::core::currency::{CurrencySymbol, CurrencyTable};
use pnl_ledger::core::network::Network;
use pnl_ledger::core::transaction::{
    new_sub_row, preprocess_stored_rows, TransactionKind, TransactionRecord,
};
use pnl_ledger::simulation::generator::{generate_history_with, HistoryConfig};
use pnl_ledger::table::filter::{RowFilter, CATEGORY_LOANS};
use pnl_ledger::table::recompute::{add_new_row, RecomputeError, TableData, TableEngine};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn sym(s: &str) -> CurrencySymbol {
    CurrencySymbol::new(s)
}

fn computed(rows: Vec<TransactionRecord>) -> TableData {
    let mut table = TableData::new(rows);
    TableEngine::default().recompute(&mut table).unwrap();
    table
}

fn find<'a>(rows: &'a [TransactionRecord], id: &str) -> &'a TransactionRecord {
    rows.iter().find(|r| r.id == id).unwrap()
}

/// Full pipeline: buy, partial sell, sort, compute, stats.
#[test]
fn buy_then_partial_sell_realizes_pnl() {
    let rows = vec![
        TransactionRecord::new("sell", "2024-02-01", TransactionKind::Trade)
            .with_in(dec!(300), "USDC")
            .with_out(dec!(5), "ETH")
            .with_usd_value(dec!(300))
            .with_network("Ethereum"),
        TransactionRecord::new("buy", "2024-01-01", TransactionKind::Trade)
            .with_in(dec!(10), "ETH")
            .with_out(dec!(500), "USDC")
            .with_usd_value(dec!(500))
            .with_network("Ethereum"),
    ];

    let table = computed(rows);

    assert_eq!(table.rows_original[0].id, "buy");
    let compute = table.rows_original[1].compute.as_ref().unwrap();
    assert_eq!(compute.currencies, vec![sym("ETH"), sym("USDC")]);

    let eth = compute.snapshot(&sym("ETH")).unwrap();
    assert_eq!(eth.price, dec!(60));
    assert_eq!(eth.avg_price, dec!(50));
    assert_eq!(eth.pnl, dec!(50));
    assert_eq!(eth.cum_pnl, dec!(50));
    assert_eq!(eth.cum_amount, dec!(5));

    let usdc = compute.snapshot(&sym("USDC")).unwrap();
    assert_eq!(usdc.pnl, Decimal::ZERO);
    assert_eq!(usdc.avg_price, Decimal::ONE);
    assert_eq!(usdc.net_amount, dec!(-200));

    assert_eq!(table.stats.net_owned[&sym("ETH")], dec!(5));
    assert_eq!(table.stats.last_trade_prices[&sym("ETH")], dec!(60));
}

/// Borrow, spend part of it in a child row, repay with interest.
#[test]
fn loan_lifecycle_with_sub_rows() {
    let rows = vec![
        TransactionRecord::new("borrow", "2024-01-01", TransactionKind::Borrow)
            .with_in(dec!(1000), "USDC")
            .with_network("Aave"),
        TransactionRecord::new("rebuy", "2024-01-09", TransactionKind::ReBuy)
            .with_in(dec!(2), "SOL")
            .with_out(dec!(200), "USDC")
            .with_usd_value(dec!(200))
            .with_network("Aave")
            .with_parent("borrow"),
        TransactionRecord::new("other", "2024-01-05", TransactionKind::Reward)
            .with_in(dec!(1), "SOL")
            .with_network("Solana"),
        TransactionRecord::new("repay", "2024-01-10", TransactionKind::Repay)
            .with_out(dec!(1000), "USDC")
            .with_network("Aave"),
        TransactionRecord::new("interest", "2024-01-10", TransactionKind::Interest)
            .with_out(dec!(20), "USDC")
            .with_usd_value(dec!(20))
            .with_network("Aave")
            .with_parent("repay"),
    ];

    let table = computed(rows);
    let ids: Vec<&str> = table.rows_original.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["borrow", "rebuy", "other", "repay", "interest"]);

    let after_borrow = find(&table.rows_original, "rebuy").compute.as_ref().unwrap();
    let usdc = after_borrow.snapshot(&sym("USDC")).unwrap();
    assert_eq!(usdc.amount_borrowed, dec!(1000));
    assert_eq!(usdc.cum_amount, dec!(800));

    // reward bought at zero cost halves the SOL average price
    let sol = find(&table.rows_original, "other").compute.as_ref().unwrap();
    assert_eq!(sol.snapshot(&sym("SOL")).unwrap().avg_price, dec!(200) / dec!(3));

    assert_eq!(table.stats.net_borrowed[&sym("USDC")], Decimal::ZERO);
    assert_eq!(table.stats.net_owned[&sym("USDC")], dec!(-220));
    assert_eq!(table.stats.net_owned[&sym("SOL")], dec!(3));
}

/// Bridges move holdings between networks without touching PNL.
#[test]
fn bridge_moves_holdings_between_networks() {
    let mut rows = vec![
        TransactionRecord::new("a", "2024-01-01", TransactionKind::Trade)
            .with_in(dec!(2), "ETH")
            .with_out(dec!(5000), "USDC")
            .with_usd_value(dec!(5000))
            .with_network("Ethereum"),
        TransactionRecord::new("b", "2024-01-02", TransactionKind::BridgeOut)
            .with_out(dec!(1), "ETH")
            .with_network("Ethereum"),
        TransactionRecord::new("c", "2024-01-02", TransactionKind::BridgeIn)
            .with_in(dec!(1), "ETH")
            .with_network("Arbitrum"),
    ];

    let book = run_table_compute(&mut rows, &CurrencyTable::default()).unwrap();
    let eth = book.get(&sym("ETH")).unwrap();
    assert_eq!(eth.amount_in_network(&Network::new("Ethereum")), dec!(1));
    assert_eq!(eth.amount_in_network(&Network::new("Arbitrum")), dec!(1));
    assert_eq!(eth.net_amount(), dec!(2));
    assert_eq!(eth.cum_pnl(), Decimal::ZERO);

    let arrived = rows[2].compute.as_ref().unwrap().snapshot(&sym("ETH")).unwrap();
    assert_eq!(arrived.amount_in_network, dec!(1));
}

/// A record with one currency on both sides is a direct gain.
#[test]
fn same_currency_record_is_direct_gain() {
    let rows = vec![TransactionRecord::new("a", "2024-01-01", TransactionKind::Reward)
        .with_in(dec!(10), "USDC")
        .with_out(dec!(8), "USDC")
        .with_usd_value(dec!(999))];

    let table = computed(rows);
    let compute = table.rows_original[0].compute.as_ref().unwrap();
    assert_eq!(compute.currencies, vec![sym("USDC")]);
    let usdc = compute.snapshot(&sym("USDC")).unwrap();
    assert_eq!(usdc.pnl, dec!(2));
    assert_eq!(usdc.net_amount, dec!(2));
}

/// Integrity errors abort the recompute.
#[test]
fn negative_bridge_out_is_rejected() {
    let rows = vec![TransactionRecord::new("a", "2024-01-01", TransactionKind::BridgeOut)
        .with_out(dec!(-1), "ETH")];
    let mut table = TableData::new(rows);
    let err = TableEngine::default().recompute(&mut table).unwrap_err();
    assert!(matches!(err, RecomputeError::Dispatch(_)));
    assert!(err.to_string().contains("ETH"));
}

/// Filtering the display never changes the PNL unless computation is scoped.
#[test]
fn visible_only_toggle_scopes_stats() {
    let config = HistoryConfig {
        events: 120,
        loan_share: 0.25,
        ..Default::default()
    };
    let rows = generate_history_with(&config, &mut StdRng::seed_from_u64(3));
    let engine = TableEngine::default();

    let mut scoped = TableData::new(rows.clone()).with_filters(vec![RowFilter::category(CATEGORY_LOANS)]);
    engine.recompute(&mut scoped).unwrap();
    let unfiltered = computed(rows);
    assert_eq!(scoped.stats.net_owned, unfiltered.stats.net_owned);

    engine.toggle_visible_compute(&mut scoped).unwrap();
    assert!(scoped.compute_visible_only);
    assert!(scoped
        .rows_displayed
        .iter()
        .filter(|r| r.finalized)
        .all(|r| r.kind.is_loan()));
    for original in &scoped.rows_original {
        if !original.kind.is_loan() {
            assert!(original.compute.is_none(), "{} kept a compute result", original.id);
        }
    }
}

/// Stored JSON rows round into the engine and come back in the same shape.
#[test]
fn stored_json_rows_compute() {
    let json = r#"[
        {"id": "p", "date": "2024-03-01", "rowType": "Borrow", "network": "Aave",
         "inAmount": "500", "inCurrency": "USDT", "tags": ["leverage"]},
        {"id": "c", "parentId": "p", "isSubRow": true, "date": "2024-03-01",
         "rowType": "↪ReBuy", "network": "Aave", "inAmount": "0.01", "inCurrency": "BTC",
         "outAmount": "500", "outCurrency": "USDT", "usdValue": "500", "feeAmount": "auto"}
    ]"#;
    let mut rows: Vec<TransactionRecord> = serde_json::from_str(json).unwrap();
    assert!(rows.iter().all(|r| !r.finalized));
    preprocess_stored_rows(&mut rows);

    let table = computed(rows);
    let value = serde_json::to_value(&table).unwrap();

    let child = &value["rowsOriginal"][1];
    assert_eq!(child["rowType"], "↪ReBuy");
    assert_eq!(child["parentId"], "p");
    assert_eq!(child["compute"]["curs"][0], "BTC");
    let avg: Decimal = child["compute"]["curData"]["BTC"]["avgPrice"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(avg, dec!(50000));
    assert!(value["netOwned"]["BTC"].is_string());
    assert_eq!(value["computeVisibleOnly"], false);

    let back: TableData = serde_json::from_value(value).unwrap();
    assert_eq!(back.rows_original, table.rows_original);
    assert_eq!(back.stats, table.stats);
}

/// Editing flow: blank rows and sub-rows stay out of the ledgers until finalized.
#[test]
fn draft_rows_are_not_computed() {
    let engine = TableEngine::from_config(&EngineConfig::default());
    let parent = TransactionRecord::new("p", "2024-01-01", TransactionKind::Borrow)
        .with_in(dec!(100), "USDC")
        .with_network("Aave")
        .with_tags(["leverage"]);
    let mut table = TableData::new(vec![parent.clone()]);
    engine.recompute(&mut table).unwrap();

    let blank = table.rows_displayed.last().unwrap();
    assert!(!blank.finalized);
    assert_eq!(blank.network.as_str(), "Aave");
    assert_eq!(blank.tags, vec!["leverage".to_string()]);

    let mut child = new_sub_row(&parent, TransactionKind::ReBuy);
    child.in_amount = Some(dec!(1));
    child.in_currency = Some(sym("SOL"));
    table.rows_displayed.push(child.clone());
    add_new_row(&mut table);
    assert_eq!(table.rows_in_progress().count(), 3);

    engine.recompute(&mut table).unwrap();
    assert!(!table.stats.net_owned.contains_key(&sym("SOL")));
    let draft = table.rows_displayed.iter().find(|r| r.id == child.id).unwrap();
    assert!(draft.compute.is_none());
    assert_eq!(draft.parent_id.as_deref(), Some("p"));
}
