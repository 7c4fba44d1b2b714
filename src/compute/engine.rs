use crate::compute::dispatch::{apply_record, DispatchError};
use crate::compute::pairing::record_currencies;
use crate::core::currency::{CurrencySymbol, CurrencyTable};
use crate::core::ledger::CurrencyLedger;
use crate::core::transaction::{RowCompute, TransactionRecord};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Per-currency ledgers built by one compute pass.
///
/// A fresh book is created for every pass and handed back to the caller
/// afterwards; nothing carries over between passes.
#[derive(Debug, Clone, Default)]
pub struct LedgerBook {
    ledgers: BTreeMap<CurrencySymbol, CurrencyLedger>,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ledger for `currency`, created empty on first use.
    pub fn ledger_mut(&mut self, currency: &CurrencySymbol, table: &CurrencyTable) -> &mut CurrencyLedger {
        self.ledgers
            .entry(currency.clone())
            .or_insert_with(|| CurrencyLedger::for_currency(currency, table))
    }

    pub fn get(&self, currency: &CurrencySymbol) -> Option<&CurrencyLedger> {
        self.ledgers.get(currency)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &CurrencySymbol> {
        self.ledgers.keys()
    }

    pub fn ledgers(&self) -> impl Iterator<Item = &CurrencyLedger> {
        self.ledgers.values()
    }

    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }
}

/// Compute one record against the book and attach the result to it.
pub fn compute_record(
    record: &mut TransactionRecord,
    book: &mut LedgerBook,
    table: &CurrencyTable,
) -> Result<(), DispatchError> {
    let mut compute = RowCompute {
        currencies: record_currencies(table, record),
        ..RowCompute::default()
    };
    if compute.currencies.is_empty() {
        warn!("record {}: no currency on either side", record.id);
    }
    for currency in &compute.currencies {
        let ledger = book.ledger_mut(currency, table);
        let snapshot = apply_record(currency, record, ledger)?;
        compute.snapshots.insert(currency.clone(), snapshot);
    }
    record.compute = Some(compute);
    Ok(())
}

/// Run the ledgers over `records`, which must already be in sort order.
///
/// Unfinalized records and error rows are skipped: they neither touch a
/// ledger nor receive a compute result. Any error aborts the pass and
/// leaves the records partially computed.
pub fn run_table_compute(
    records: &mut [TransactionRecord],
    table: &CurrencyTable,
) -> Result<LedgerBook, DispatchError> {
    let mut book = LedgerBook::new();
    for record in records.iter_mut() {
        if !record.finalized || record.kind.is_error() {
            debug!("skipping record {} ({})", record.id, record.kind);
            record.compute = None;
            continue;
        }
        compute_record(record, &mut book, table)?;
    }
    Ok(book)
}
