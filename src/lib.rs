//! # pnl-ledger
//!
//! Per-currency cost-basis and realized PNL engine for a table of
//! financial transactions.
//!
//! Every recompute sorts the transaction history, replays it through one
//! rolling-window ledger per currency and attaches a per-currency snapshot
//! (price, average cost, PNL, holdings, borrowings) to each row.
//!
//! ## Architecture
//!
//! - **core**: Foundational types: currencies, networks, ledgers, transaction records
//! - **compute**: Currency pairing, per-kind dispatch and the row compute pass
//! - **table**: Sort groups, display filters, recompute orchestration and stats
//! - **simulation**: Random history generation for benchmarks and tests
//! - **config**: Engine configuration from JSON files or the environment

pub mod compute;
pub mod config;
pub mod core;
pub mod simulation;
pub mod table;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::compute::engine::{run_table_compute, LedgerBook};
    pub use crate::config::EngineConfig;
    pub use crate::core::currency::{CurrencySymbol, CurrencyTable};
    pub use crate::core::ledger::CurrencyLedger;
    pub use crate::core::network::Network;
    pub use crate::core::transaction::{TransactionKind, TransactionRecord};
    pub use crate::table::filter::RowFilter;
    pub use crate::table::recompute::{TableData, TableEngine};
    pub use crate::table::stats::TableStats;
}
