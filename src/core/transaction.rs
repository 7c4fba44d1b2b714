use crate::core::currency::CurrencySymbol;
use crate::core::network::Network;
use chrono::{Local, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Transaction variant. Sub kinds only appear on child records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "Trade")]
    Trade,
    #[serde(rename = "Bridge In")]
    BridgeIn,
    #[serde(rename = "Bridge Out")]
    BridgeOut,
    #[serde(rename = "Reward")]
    Reward,
    #[serde(rename = "Loss")]
    Loss,
    #[serde(rename = "Borrow")]
    Borrow,
    #[serde(rename = "↪ReBuy")]
    ReBuy,
    #[serde(rename = "Repay")]
    Repay,
    #[serde(rename = "↪Principle")]
    Principle,
    #[serde(rename = "↪Interest")]
    Interest,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "↪ERROR")]
    SubError,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 12] = [
        Self::Trade,
        Self::BridgeIn,
        Self::BridgeOut,
        Self::Reward,
        Self::Loss,
        Self::Borrow,
        Self::ReBuy,
        Self::Repay,
        Self::Principle,
        Self::Interest,
        Self::Error,
        Self::SubError,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Trade => "Trade",
            Self::BridgeIn => "Bridge In",
            Self::BridgeOut => "Bridge Out",
            Self::Reward => "Reward",
            Self::Loss => "Loss",
            Self::Borrow => "Borrow",
            Self::ReBuy => "↪ReBuy",
            Self::Repay => "Repay",
            Self::Principle => "↪Principle",
            Self::Interest => "↪Interest",
            Self::Error => "ERROR",
            Self::SubError => "↪ERROR",
        }
    }

    pub fn is_sub_kind(self) -> bool {
        matches!(
            self,
            Self::ReBuy | Self::Principle | Self::Interest | Self::SubError
        )
    }

    pub fn is_error(self) -> bool {
        matches!(self, Self::Error | Self::SubError)
    }

    pub fn is_trade(self) -> bool {
        matches!(self, Self::Trade | Self::ReBuy)
    }

    pub fn is_loan(self) -> bool {
        matches!(
            self,
            Self::Borrow | Self::Repay | Self::Principle | Self::Interest
        )
    }

    /// Kind of a new child row under a parent of this kind, `None` when
    /// this kind takes no children.
    pub fn sub_kind_for_parent(self) -> Option<TransactionKind> {
        match self {
            Self::Borrow => Some(Self::ReBuy),
            Self::Repay => Some(Self::Principle),
            _ => None,
        }
    }

    /// Kinds a user may pick for a top-level (`sub == false`) or child row.
    pub fn selectable(sub: bool) -> Vec<TransactionKind> {
        Self::ALL
            .into_iter()
            .filter(|k| k.is_sub_kind() == sub && !k.is_error())
            .collect()
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Fee column: either a number or a keyword such as `"auto"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeeAmount {
    Amount(Decimal),
    Keyword(String),
}

impl FeeAmount {
    pub fn auto() -> Self {
        Self::Keyword("auto".to_string())
    }
}

/// Ledger state of one currency right after a record was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowCurrencySnapshot {
    pub price: Decimal,
    pub avg_price: Decimal,
    pub pnl: Decimal,
    pub cum_pnl: Decimal,
    pub cum_amount: Decimal,
    pub net_amount: Decimal,
    pub amount_in_network: Decimal,
    pub amount_borrowed: Decimal,
}

/// Computed output attached to a record: the currencies it touches, in
/// display order, and one snapshot per currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowCompute {
    #[serde(rename = "curs")]
    pub currencies: Vec<CurrencySymbol>,
    #[serde(rename = "curData")]
    pub snapshots: BTreeMap<CurrencySymbol, RowCurrencySnapshot>,
}

impl RowCompute {
    pub fn snapshot(&self, currency: &CurrencySymbol) -> Option<&RowCurrencySnapshot> {
        self.snapshots.get(currency)
    }
}

/// One row of the transaction history.
///
/// "in" is what was received, "out" is what was given. `usd_value` is the
/// value of the whole transaction in the unit of account. `sort_group` and
/// `compute` are derived and overwritten by every recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub is_sub_row: bool,
    #[serde(default)]
    pub finalized: bool,
    pub date: String,
    #[serde(rename = "rowType")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub in_amount: Option<Decimal>,
    #[serde(default)]
    pub in_currency: Option<CurrencySymbol>,
    #[serde(default)]
    pub out_amount: Option<Decimal>,
    #[serde(default)]
    pub out_currency: Option<CurrencySymbol>,
    #[serde(default)]
    pub fee_amount: Option<FeeAmount>,
    #[serde(default)]
    pub fee_currency: Option<CurrencySymbol>,
    #[serde(default)]
    pub usd_value: Option<Decimal>,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub sort_group: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute: Option<RowCompute>,
}

impl TransactionRecord {
    /// A finalized top-level record with no amounts set.
    pub fn new(id: impl Into<String>, date: impl Into<String>, kind: TransactionKind) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            is_sub_row: false,
            finalized: true,
            date: date.into(),
            kind,
            in_amount: None,
            in_currency: None,
            out_amount: None,
            out_currency: None,
            fee_amount: None,
            fee_currency: None,
            usd_value: None,
            network: Network::default(),
            tags: Vec::new(),
            note: String::new(),
            sort_group: 0.0,
            compute: None,
        }
    }

    pub fn with_in(mut self, amount: Decimal, currency: impl Into<CurrencySymbol>) -> Self {
        self.in_amount = Some(amount);
        self.in_currency = Some(currency.into());
        self
    }

    pub fn with_out(mut self, amount: Decimal, currency: impl Into<CurrencySymbol>) -> Self {
        self.out_amount = Some(amount);
        self.out_currency = Some(currency.into());
        self
    }

    pub fn with_usd_value(mut self, value: Decimal) -> Self {
        self.usd_value = Some(value);
        self
    }

    pub fn with_network(mut self, network: impl Into<Network>) -> Self {
        self.network = network.into();
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Attach this record under `parent_id` as a sub-row.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self.is_sub_row = true;
        self
    }

    pub fn in_progress(mut self) -> Self {
        self.finalized = false;
        self
    }

    /// Currency received, ignoring empty symbols.
    pub fn in_symbol(&self) -> Option<&CurrencySymbol> {
        self.in_currency.as_ref().filter(|c| !c.is_empty())
    }

    /// Currency given, ignoring empty symbols.
    pub fn out_symbol(&self) -> Option<&CurrencySymbol> {
        self.out_currency.as_ref().filter(|c| !c.is_empty())
    }

    /// Whether either side is denominated in `currency`.
    pub fn touches(&self, currency: &CurrencySymbol) -> bool {
        self.in_symbol() == Some(currency) || self.out_symbol() == Some(currency)
    }
}

/// Identifier for a freshly created row: `t-<epoch millis>-<6 base36 chars>`.
pub fn generate_transaction_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("t-{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Blank in-progress top-level row dated today.
pub fn new_row(fee_currency: Option<CurrencySymbol>, network: Network, tags: Vec<String>) -> TransactionRecord {
    TransactionRecord {
        finalized: false,
        fee_amount: Some(FeeAmount::auto()),
        fee_currency,
        network,
        tags,
        // after every assigned group
        sort_group: f64::MAX,
        ..TransactionRecord::new(
            generate_transaction_id(),
            Local::now().format("%Y-%m-%d").to_string(),
            TransactionKind::Trade,
        )
    }
}

/// Blank in-progress child of `parent`, sharing its date and network.
pub fn new_sub_row(parent: &TransactionRecord, kind: TransactionKind) -> TransactionRecord {
    TransactionRecord {
        parent_id: Some(parent.id.clone()),
        is_sub_row: true,
        kind,
        date: parent.date.clone(),
        fee_amount: None,
        ..new_row(None, parent.network.clone(), Vec::new())
    }
}

/// Rows loaded from storage have all been finalized already.
pub fn preprocess_stored_rows(rows: &mut [TransactionRecord]) {
    for row in rows.iter_mut() {
        row.finalized = true;
    }
}
