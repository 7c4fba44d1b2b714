use crate::core::currency::CurrencySymbol;
use crate::core::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};

/// Value that disables tag and category filtering.
pub const ALL: &str = "All";
pub const CATEGORY_TRADES: &str = "Trades";
pub const CATEGORY_LOANS: &str = "Loans";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowFilterType {
    IncludeNetwork,
    IncludeTag,
    ByCategory,
    IncludeCoin,
}

/// One display filter. Filters of the same type are OR-ed together,
/// different types are AND-ed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFilter {
    pub filter_type: RowFilterType,
    pub value: String,
}

impl RowFilter {
    pub fn new(filter_type: RowFilterType, value: impl Into<String>) -> Self {
        Self {
            filter_type,
            value: value.into(),
        }
    }

    pub fn network(value: impl Into<String>) -> Self {
        Self::new(RowFilterType::IncludeNetwork, value)
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Self::new(RowFilterType::IncludeTag, value)
    }

    pub fn category(value: impl Into<String>) -> Self {
        Self::new(RowFilterType::ByCategory, value)
    }

    pub fn coin(value: impl Into<String>) -> Self {
        Self::new(RowFilterType::IncludeCoin, value)
    }
}

fn values_of(filters: &[RowFilter], filter_type: RowFilterType) -> Vec<&str> {
    filters
        .iter()
        .filter(|f| f.filter_type == filter_type)
        .map(|f| f.value.as_str())
        .collect()
}

/// Whether `record` passes every active filter group.
pub fn matches_filters(record: &TransactionRecord, filters: &[RowFilter]) -> bool {
    let networks = values_of(filters, RowFilterType::IncludeNetwork);
    if !networks.is_empty() && !networks.contains(&record.network.as_str()) {
        return false;
    }

    let tags = values_of(filters, RowFilterType::IncludeTag);
    if !tags.is_empty()
        && !tags.contains(&ALL)
        && !tags.iter().any(|t| record.tags.iter().any(|rt| rt == t))
    {
        return false;
    }

    let categories = values_of(filters, RowFilterType::ByCategory);
    if !categories.is_empty() && !categories.contains(&ALL) {
        let trades = categories.contains(&CATEGORY_TRADES) && record.kind.is_trade();
        let loans = categories.contains(&CATEGORY_LOANS) && record.kind.is_loan();
        if !trades && !loans {
            return false;
        }
    }

    let coins = values_of(filters, RowFilterType::IncludeCoin);
    if !coins.is_empty() {
        let side_matches = |side: Option<&CurrencySymbol>| {
            side.map_or(false, |c| coins.contains(&c.as_str()))
        };
        if !side_matches(record.in_currency.as_ref()) && !side_matches(record.out_currency.as_ref()) {
            return false;
        }
    }

    true
}

/// Clones of the finalized records that pass `filters`, in input order.
pub fn apply_filters(records: &[TransactionRecord], filters: &[RowFilter]) -> Vec<TransactionRecord> {
    records
        .iter()
        .filter(|r| r.finalized && matches_filters(r, filters))
        .cloned()
        .collect()
}
