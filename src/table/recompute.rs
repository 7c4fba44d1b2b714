use crate::compute::dispatch::DispatchError;
use crate::compute::engine::run_table_compute;
use crate::config::EngineConfig;
use crate::core::currency::CurrencyTable;
use crate::core::transaction::{new_row, new_sub_row, TransactionKind, TransactionRecord};
use crate::table::filter::{apply_filters, RowFilter};
use crate::table::sort::{assign_sort_groups, SortError};
use crate::table::stats::TableStats;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RecomputeError {
    #[error(transparent)]
    Sort(#[from] SortError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Rejected local edits. The table is left untouched.
#[derive(Debug, Error, PartialEq)]
pub enum RowEditError {
    #[error("row {0} is not displayed")]
    UnknownRow(String),
    #[error("row {0} is already a sub-row")]
    NestedSubRow(String),
    #[error("row {id}: {kind} rows cannot have sub-rows")]
    NoSubRows { id: String, kind: TransactionKind },
}

/// Everything the engine reads and refreshes on each recompute.
///
/// `rows_original` is the full history owned by the caller;
/// `rows_displayed` is the filtered, sorted view plus any rows still being
/// edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableData {
    pub rows_original: Vec<TransactionRecord>,
    #[serde(default)]
    pub rows_displayed: Vec<TransactionRecord>,
    #[serde(default)]
    pub filters: Vec<RowFilter>,
    #[serde(default)]
    pub compute_visible_only: bool,
    #[serde(flatten)]
    pub stats: TableStats,
}

impl TableData {
    pub fn new(rows: Vec<TransactionRecord>) -> Self {
        Self {
            rows_original: rows,
            ..Self::default()
        }
    }

    /// A table starting in the compute mode chosen by `config`.
    pub fn from_config(rows: Vec<TransactionRecord>, config: &EngineConfig) -> Self {
        Self::new(rows).with_compute_visible_only(config.compute_visible_only)
    }

    pub fn with_filters(mut self, filters: Vec<RowFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_compute_visible_only(mut self, visible_only: bool) -> Self {
        self.compute_visible_only = visible_only;
        self
    }

    /// Rows in the display that are still being edited.
    pub fn rows_in_progress(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.rows_displayed.iter().filter(|r| !r.finalized)
    }
}

/// Entry point for full recomputes of a [`TableData`].
///
/// Every call starts from empty ledgers; there is no incremental path.
///
/// # Examples
///
/// ```
/// use pnl_ledger::core::currency::CurrencySymbol;
/// use pnl_ledger::core::transaction::{TransactionKind, TransactionRecord};
/// use pnl_ledger::table::recompute::{TableData, TableEngine};
/// use rust_decimal_macros::dec;
///
/// let trade = TransactionRecord::new("t-1", "2024-01-01", TransactionKind::Trade)
///     .with_in(dec!(2), "ETH")
///     .with_out(dec!(6000), "USDC")
///     .with_usd_value(dec!(6000));
///
/// let engine = TableEngine::default();
/// let mut table = TableData::new(vec![trade]);
/// engine.recompute(&mut table).unwrap();
/// assert_eq!(table.stats.net_owned[&CurrencySymbol::new("ETH")], dec!(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TableEngine {
    currencies: CurrencyTable,
}

impl TableEngine {
    pub fn new(currencies: CurrencyTable) -> Self {
        Self { currencies }
    }

    /// Engine using the configured currency table. The compute mode lives
    /// on the table, see [`TableData::from_config`].
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.currencies.clone())
    }

    pub fn currencies(&self) -> &CurrencyTable {
        &self.currencies
    }

    /// Rebuild `rows_displayed` and the stats from scratch.
    ///
    /// With `compute_visible_only == false` the whole history is sorted and
    /// computed first and filters only shape the display. Otherwise the
    /// filtered view is computed on its own, its results are written back
    /// onto the matching original rows, and every original row outside the
    /// view loses its compute result.
    ///
    /// On error every row is kept but compute results and stats must be
    /// considered invalid; fix the rows and recompute.
    pub fn recompute(&self, table: &mut TableData) -> Result<(), RecomputeError> {
        let in_progress: Vec<TransactionRecord> = table.rows_in_progress().cloned().collect();

        if !table.compute_visible_only {
            assign_sort_groups(&mut table.rows_original)?;
            run_table_compute(&mut table.rows_original, &self.currencies)?;
        }

        let mut displayed = apply_filters(&table.rows_original, &table.filters);
        displayed.extend(in_progress.iter().cloned());
        assign_sort_groups(&mut displayed)?;

        let stats = if table.compute_visible_only {
            run_table_compute(&mut displayed, &self.currencies)?;
            write_back_compute(&mut table.rows_original, &displayed);
            TableStats::from_records(&displayed, &self.currencies)
        } else {
            TableStats::from_records(&table.rows_original, &self.currencies)
        };

        info!(
            "recomputed {} rows ({} displayed, {} currencies, visible only: {})",
            table.rows_original.len(),
            displayed.len(),
            stats.net_owned.len(),
            table.compute_visible_only
        );

        table.rows_displayed = displayed;
        table.stats = stats;
        if in_progress.is_empty() && !table.rows_displayed.is_empty() {
            add_new_row(table);
        }
        Ok(())
    }

    /// Replace the history and recompute.
    pub fn set_table_rows(&self, table: &mut TableData, rows: Vec<TransactionRecord>) -> Result<(), RecomputeError> {
        table.rows_original = rows;
        self.recompute(table)
    }

    /// Replace the filters and recompute.
    pub fn set_filters(&self, table: &mut TableData, filters: Vec<RowFilter>) -> Result<(), RecomputeError> {
        table.filters = filters;
        self.recompute(table)
    }

    /// Flip between whole-history and visible-only computation and recompute.
    pub fn toggle_visible_compute(&self, table: &mut TableData) -> Result<(), RecomputeError> {
        table.compute_visible_only = !table.compute_visible_only;
        self.recompute(table)
    }

    /// Remove row `id` and its children from the history and the display,
    /// then recompute. Returns how many stored rows were removed.
    pub fn delete_row(&self, table: &mut TableData, id: &str) -> Result<usize, RecomputeError> {
        let is_target = |r: &TransactionRecord| r.id == id || r.parent_id.as_deref() == Some(id);
        let before = table.rows_original.len();
        let rows: Vec<TransactionRecord> = table
            .rows_original
            .iter()
            .filter(|r| !is_target(*r))
            .cloned()
            .collect();
        let removed = before - rows.len();
        table.rows_displayed.retain(|r| !is_target(r));
        debug!("deleting {} rows under {}", removed, id);

        self.set_table_rows(table, rows)?;
        Ok(removed)
    }
}

fn write_back_compute(originals: &mut [TransactionRecord], computed: &[TransactionRecord]) {
    let by_id: HashMap<&str, &TransactionRecord> =
        computed.iter().map(|r| (r.id.as_str(), r)).collect();
    for original in originals.iter_mut() {
        original.compute = by_id.get(original.id.as_str()).and_then(|r| r.compute.clone());
    }
}

/// Append a blank editable row to the display, inheriting the fee
/// currency, network and tags of the current last row. No recompute.
pub fn add_new_row(table: &mut TableData) {
    let row = match table.rows_displayed.last() {
        Some(last) => new_row(last.fee_currency.clone(), last.network.clone(), last.tags.clone()),
        None => new_row(None, Default::default(), Vec::new()),
    };
    table.rows_displayed.push(row);
}

/// Insert a blank child under displayed row `parent_id`, right after its
/// last existing child. Borrows get a re-buy, repays a principal payment;
/// other kinds and sub-rows take no children. No recompute.
///
/// Returns the id of the new row.
pub fn add_sub_row(table: &mut TableData, parent_id: &str) -> Result<String, RowEditError> {
    let parent_index = table
        .rows_displayed
        .iter()
        .position(|r| r.id == parent_id)
        .ok_or_else(|| RowEditError::UnknownRow(parent_id.to_string()))?;
    let parent = &table.rows_displayed[parent_index];
    if parent.is_sub_row || parent.parent_id.is_some() {
        return Err(RowEditError::NestedSubRow(parent_id.to_string()));
    }
    let kind = parent.kind.sub_kind_for_parent().ok_or_else(|| RowEditError::NoSubRows {
        id: parent_id.to_string(),
        kind: parent.kind,
    })?;

    let child = new_sub_row(parent, kind);
    let child_id = child.id.clone();
    let insert_after = table
        .rows_displayed
        .iter()
        .rposition(|r| r.parent_id.as_deref() == Some(parent_id))
        .unwrap_or(parent_index);
    table.rows_displayed.insert(insert_after + 1, child);
    Ok(child_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencySymbol;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn sym(s: &str) -> CurrencySymbol {
        CurrencySymbol::new(s)
    }

    fn history() -> Vec<TransactionRecord> {
        vec![
            TransactionRecord::new("b", "2024-01-02", TransactionKind::Trade)
                .with_in(dec!(5), "SOL")
                .with_out(dec!(500), "USDC")
                .with_usd_value(dec!(500))
                .with_network("Solana"),
            TransactionRecord::new("a", "2024-01-01", TransactionKind::Trade)
                .with_in(dec!(2), "ETH")
                .with_out(dec!(4000), "USDC")
                .with_usd_value(dec!(4000))
                .with_network("Ethereum")
                .with_tags(["spot"]),
        ]
    }

    fn loans() -> Vec<TransactionRecord> {
        vec![
            TransactionRecord::new("borrow", "2024-01-01", TransactionKind::Borrow)
                .with_in(dec!(1000), "USDC")
                .with_network("Aave"),
            TransactionRecord::new("rebuy", "2024-01-01", TransactionKind::ReBuy)
                .with_in(dec!(2), "SOL")
                .with_out(dec!(200), "USDC")
                .with_usd_value(dec!(200))
                .with_network("Aave")
                .with_parent("borrow"),
            TransactionRecord::new("repay", "2024-01-05", TransactionKind::Repay)
                .with_out(dec!(1000), "USDC")
                .with_network("Aave"),
            TransactionRecord::new("trade", "2024-01-06", TransactionKind::Trade)
                .with_in(dec!(1), "ETH")
                .with_out(dec!(3000), "USDC")
                .with_usd_value(dec!(3000)),
        ]
    }

    fn computed(rows: Vec<TransactionRecord>) -> TableData {
        let mut table = TableData::new(rows);
        TableEngine::default().recompute(&mut table).unwrap();
        table
    }

    #[test]
    fn test_recompute_sorts_computes_and_adds_blank_row() {
        let table = computed(history());

        let ids: Vec<&str> = table.rows_original.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(table.rows_original.iter().all(|r| r.compute.is_some()));

        assert_eq!(table.rows_displayed.len(), 3);
        let blank = &table.rows_displayed[2];
        assert!(!blank.finalized);
        assert_eq!(blank.network.as_str(), "Solana");
        assert_eq!(table.stats.net_owned[&sym("USDC")], dec!(-4500));
    }

    #[test]
    fn test_display_filter_does_not_scope_pnl() {
        let engine = TableEngine::default();
        let mut table = TableData::new(history()).with_filters(vec![RowFilter::network("Ethereum")]);
        engine.recompute(&mut table).unwrap();

        assert_eq!(table.rows_displayed[0].id, "a");
        assert_eq!(table.rows_displayed.len(), 2);
        assert_eq!(table.stats.net_owned[&sym("SOL")], dec!(5));
        assert_eq!(table.stats.net_owned[&sym("USDC")], dec!(-4500));
    }

    #[test]
    fn test_visible_only_scopes_pnl() {
        let engine = TableEngine::default();
        let mut table = TableData::new(history())
            .with_filters(vec![RowFilter::network("Ethereum")])
            .with_compute_visible_only(true);
        engine.recompute(&mut table).unwrap();

        assert!(!table.stats.net_owned.contains_key(&sym("SOL")));
        assert_eq!(table.stats.net_owned[&sym("USDC")], dec!(-4000));

        let hidden = table.rows_original.iter().find(|r| r.id == "b").unwrap();
        assert!(hidden.compute.is_none());
        let visible = table.rows_original.iter().find(|r| r.id == "a").unwrap();
        assert!(visible.compute.is_some());
    }

    #[test]
    fn test_config_sets_compute_mode() {
        let config = EngineConfig {
            compute_visible_only: true,
            ..EngineConfig::default()
        };
        let mut table = TableData::from_config(history(), &config)
            .with_filters(vec![RowFilter::network("Ethereum")]);
        assert!(table.compute_visible_only);

        TableEngine::from_config(&config).recompute(&mut table).unwrap();
        assert!(!table.stats.net_owned.contains_key(&sym("SOL")));

        let table = TableData::from_config(history(), &EngineConfig::default());
        assert!(!table.compute_visible_only);
    }

    #[test]
    fn test_in_progress_rows_survive_filters() {
        let engine = TableEngine::default();
        let mut table = computed(history());
        let draft_id = table.rows_displayed[2].id.clone();

        engine
            .set_filters(&mut table, vec![RowFilter::network("Nowhere")])
            .unwrap();
        assert_eq!(table.rows_displayed.len(), 1);
        assert_eq!(table.rows_displayed[0].id, draft_id);
    }

    #[test]
    fn test_empty_table_gets_no_blank_row() {
        let table = computed(Vec::new());
        assert!(table.rows_displayed.is_empty());
        assert_eq!(table.stats, TableStats::default());
    }

    #[test]
    fn test_toggle_and_set_rows() {
        let engine = TableEngine::default();
        let mut table = computed(history());
        engine.toggle_visible_compute(&mut table).unwrap();
        assert!(table.compute_visible_only);

        engine.set_table_rows(&mut table, Vec::new()).unwrap();
        // only the previous draft row remains
        assert_eq!(table.rows_displayed.len(), 1);
        assert!(table.stats.net_owned.is_empty());
        assert_eq!(table.stats.net_borrowed.get(&sym("USDC")), None::<&Decimal>);
    }

    #[test]
    fn test_dispatch_error_keeps_rows_for_retry() {
        let engine = TableEngine::default();
        let mut table = TableData::new(vec![
            TransactionRecord::new("x", "2024-01-01", TransactionKind::Loss).with_out(dec!(-1), "ETH"),
        ]);
        let err = engine.recompute(&mut table).unwrap_err();
        assert!(matches!(err, RecomputeError::Dispatch(_)));
        assert_eq!(table.rows_original.len(), 1);

        table.rows_original[0].out_amount = Some(dec!(1));
        engine.recompute(&mut table).unwrap();
        assert_eq!(table.stats.net_owned[&sym("ETH")], dec!(-1));
    }

    #[test]
    fn test_add_sub_row_kind_follows_parent() {
        let mut table = computed(loans());

        let rebuy_id = add_sub_row(&mut table, "borrow").unwrap();
        let ids: Vec<&str> = table.rows_displayed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(&ids[..3], &["borrow", "rebuy", rebuy_id.as_str()]);
        let child = &table.rows_displayed[2];
        assert_eq!(child.kind, TransactionKind::ReBuy);
        assert_eq!(child.parent_id.as_deref(), Some("borrow"));
        assert!(!child.finalized);

        let principle_id = add_sub_row(&mut table, "repay").unwrap();
        let index = table.rows_displayed.iter().position(|r| r.id == principle_id).unwrap();
        assert_eq!(table.rows_displayed[index - 1].id, "repay");
        assert_eq!(table.rows_displayed[index].kind, TransactionKind::Principle);
    }

    #[test]
    fn test_add_sub_row_rejections() {
        let mut table = computed(loans());
        let before = table.rows_displayed.clone();

        assert!(matches!(
            add_sub_row(&mut table, "trade"),
            Err(RowEditError::NoSubRows { kind: TransactionKind::Trade, .. })
        ));
        assert_eq!(
            add_sub_row(&mut table, "rebuy"),
            Err(RowEditError::NestedSubRow("rebuy".to_string()))
        );
        assert_eq!(
            add_sub_row(&mut table, "missing"),
            Err(RowEditError::UnknownRow("missing".to_string()))
        );
        assert_eq!(table.rows_displayed, before);
    }

    #[test]
    fn test_sub_row_stays_under_parent_after_recompute() {
        let engine = TableEngine::default();
        let mut table = computed(loans());
        let child_id = add_sub_row(&mut table, "borrow").unwrap();
        engine.recompute(&mut table).unwrap();

        let index = table.rows_displayed.iter().position(|r| r.id == child_id).unwrap();
        assert_eq!(table.rows_displayed[index].parent_id.as_deref(), Some("borrow"));
        let position = |id: &str| table.rows_displayed.iter().position(|r| r.id == id).unwrap();
        assert!(position("borrow") < index);
        assert!(index < position("repay"));
    }

    #[test]
    fn test_delete_row_cascades_to_children() {
        let engine = TableEngine::default();
        let mut table = computed(loans());
        add_sub_row(&mut table, "borrow").unwrap();

        let removed = engine.delete_row(&mut table, "borrow").unwrap();
        assert_eq!(removed, 2);
        assert!(table
            .rows_original
            .iter()
            .all(|r| r.id != "borrow" && r.parent_id.as_deref() != Some("borrow")));
        assert!(table
            .rows_displayed
            .iter()
            .all(|r| r.parent_id.as_deref() != Some("borrow")));
        assert!(!table.stats.net_owned.contains_key(&sym("SOL")));
        assert_eq!(table.stats.net_borrowed[&sym("USDC")], dec!(-1000));
    }

    #[test]
    fn test_delete_unknown_row_is_noop() {
        let engine = TableEngine::default();
        let mut table = computed(history());
        assert_eq!(engine.delete_row(&mut table, "nope").unwrap(), 0);
        assert_eq!(table.rows_original.len(), 2);
    }
}
