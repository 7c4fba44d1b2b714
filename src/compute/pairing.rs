//! Deterministic ordering of the two currencies of a transaction.
//!
//! Stables come first, then the majors in table order, then every other
//! symbol. Two unpreferred symbols compare by amount when both amounts are
//! known and by symbol otherwise. The result is presentational only: the
//! two sides always update independent ledgers.

use crate::core::currency::{CurrencySymbol, CurrencyTable};
use crate::core::transaction::TransactionRecord;
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Compare two symbols by preference. `Less` means `a` is preferred.
pub fn compare_currencies(
    table: &CurrencyTable,
    a: &CurrencySymbol,
    b: &CurrencySymbol,
    a_amount: Option<Decimal>,
    b_amount: Option<Decimal>,
) -> Ordering {
    match (table.preference_rank(a), table.preference_rank(b)) {
        (None, None) => match (a_amount, b_amount) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.cmp(b),
        },
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(&y),
    }
}

/// The 0–2 currencies a record touches, in display order.
///
/// A record with the same symbol on both sides touches one currency. For a
/// two-sided record the less preferred symbol is listed first, so a
/// `USDC -> ETH` trade reads as `[ETH, USDC]`.
pub fn record_currencies(table: &CurrencyTable, record: &TransactionRecord) -> Vec<CurrencySymbol> {
    match (record.in_symbol(), record.out_symbol()) {
        (Some(i), Some(o)) if i == o => vec![i.clone()],
        (Some(i), Some(o)) => {
            match compare_currencies(table, i, o, record.in_amount, record.out_amount) {
                Ordering::Greater => vec![i.clone(), o.clone()],
                _ => vec![o.clone(), i.clone()],
            }
        }
        (Some(i), None) => vec![i.clone()],
        (None, Some(o)) => vec![o.clone()],
        (None, None) => Vec::new(),
    }
}
