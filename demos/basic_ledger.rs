//! Basic cost basis and realized PNL example.
//!
//! Demonstrates how the ledger engine tracks average prices, realized PNL
//! and borrowings across a small trading history.

use pnl_ledger::core::currency::CurrencySymbol;
use pnl_ledger::core::transaction::{TransactionKind, TransactionRecord};
use pnl_ledger::table::filter::RowFilter;
use pnl_ledger::table::recompute::{TableData, TableEngine};
use rust_decimal_macros::dec;

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║   pnl-ledger: Basic Cost Basis Example   ║");
    println!("╚══════════════════════════════════════════╝\n");

    // --- Scenario 1: Buy, then sell half ---
    println!("━━━ Scenario 1: Partial Sell ━━━\n");

    let engine = TableEngine::default();
    let eth = CurrencySymbol::new("ETH");

    let rows = vec![
        TransactionRecord::new("t-1", "2024-01-01", TransactionKind::Trade)
            .with_in(dec!(10), "ETH")
            .with_out(dec!(500), "USDC")
            .with_usd_value(dec!(500))
            .with_network("Ethereum"),
        TransactionRecord::new("t-2", "2024-01-15", TransactionKind::Trade)
            .with_in(dec!(300), "USDC")
            .with_out(dec!(5), "ETH")
            .with_usd_value(dec!(300))
            .with_network("Ethereum"),
    ];

    let mut table = TableData::new(rows);
    if let Err(e) = engine.recompute(&mut table) {
        eprintln!("recompute failed: {}", e);
        return;
    }

    for record in &table.rows_original {
        if let Some(snap) = record.compute.as_ref().and_then(|c| c.snapshot(&eth)) {
            println!(
                "  {} {:<6} price {:>6}  avg {:>6}  pnl {:>6}  held {:>4}",
                record.date, record.kind, snap.price, snap.avg_price, snap.pnl, snap.cum_amount
            );
        }
    }
    println!();
    println!("{}", table.stats);

    // --- Scenario 2: Leverage ---
    println!("━━━ Scenario 2: Borrow, Re-buy, Repay ━━━\n");

    let rows = vec![
        TransactionRecord::new("l-1", "2024-02-01", TransactionKind::Borrow)
            .with_in(dec!(2000), "USDC")
            .with_network("Aave")
            .with_tags(["leverage"]),
        TransactionRecord::new("l-2", "2024-02-01", TransactionKind::ReBuy)
            .with_in(dec!(15), "SOL")
            .with_out(dec!(1500), "USDC")
            .with_usd_value(dec!(1500))
            .with_network("Aave")
            .with_parent("l-1"),
        TransactionRecord::new("l-3", "2024-03-01", TransactionKind::Trade)
            .with_in(dec!(1800), "USDC")
            .with_out(dec!(15), "SOL")
            .with_usd_value(dec!(1800))
            .with_network("Aave"),
        TransactionRecord::new("l-4", "2024-03-02", TransactionKind::Repay)
            .with_out(dec!(2000), "USDC")
            .with_network("Aave")
            .with_tags(["leverage"]),
        TransactionRecord::new("l-5", "2024-03-02", TransactionKind::Interest)
            .with_out(dec!(35), "USDC")
            .with_usd_value(dec!(35))
            .with_network("Aave")
            .with_parent("l-4"),
    ];

    let mut leverage = TableData::new(rows);
    match engine.recompute(&mut leverage) {
        Ok(()) => println!("{}", leverage.stats),
        Err(e) => eprintln!("recompute failed: {}", e),
    }

    // --- Scenario 3: Scoped to a filter ---
    println!("━━━ Scenario 3: Display Filter vs Visible-Only Compute ━━━\n");

    let rows = table.rows_original.clone();
    for visible_only in [false, true] {
        let mut scoped = TableData::new(rows.clone())
            .with_filters(vec![RowFilter::coin("USDC"), RowFilter::network("Nowhere")])
            .with_compute_visible_only(visible_only);
        match engine.recompute(&mut scoped) {
            Ok(()) => println!(
                "  visible only: {:<5}  displayed rows: {}  currencies tracked: {}",
                visible_only,
                scoped.rows_displayed.len(),
                scoped.stats.net_owned.len()
            ),
            Err(e) => eprintln!("recompute failed: {}", e),
        }
    }
}
