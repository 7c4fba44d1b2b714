use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticker symbol of a currency or token.
///
/// Fiat units (USD), stablecoins (USDC) and arbitrary tokens all share the
/// same representation; what makes a symbol special is its role in the
/// [`CurrencyTable`], never the symbol itself.
///
/// # Examples
///
/// ```
/// use pnl_ledger::core::currency::CurrencySymbol;
///
/// let eth = CurrencySymbol::new("ETH");
/// let usdc = CurrencySymbol::new("USDC");
/// assert_ne!(eth, usdc);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencySymbol(String);

impl CurrencySymbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CurrencySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencySymbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Accounting role of a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyRole {
    /// Unit of account: price pinned at 1, no cost tracking.
    Stable,
    /// Major reference asset, preferred when ordering a pair.
    Major,
    Other,
}

/// Symbol → role classification injected into every ledger the engine
/// creates.
///
/// Both lists are ordered: their concatenation (stables first, then
/// majors) is the preference list used to order the two sides of a
/// transaction.
///
/// # Examples
///
/// ```
/// use pnl_ledger::core::currency::{CurrencyRole, CurrencySymbol, CurrencyTable};
///
/// let table = CurrencyTable::new(["EUR"], ["BTC"]);
/// assert_eq!(table.role(&CurrencySymbol::new("EUR")), CurrencyRole::Stable);
/// assert_eq!(table.role(&CurrencySymbol::new("USD")), CurrencyRole::Other);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyTable {
    stables: Vec<CurrencySymbol>,
    majors: Vec<CurrencySymbol>,
}

impl CurrencyTable {
    pub fn new<S, M>(stables: S, majors: M) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            stables: stables.into_iter().map(CurrencySymbol::new).collect(),
            majors: majors.into_iter().map(CurrencySymbol::new).collect(),
        }
    }

    pub fn role(&self, symbol: &CurrencySymbol) -> CurrencyRole {
        if self.stables.contains(symbol) {
            CurrencyRole::Stable
        } else if self.majors.contains(symbol) {
            CurrencyRole::Major
        } else {
            CurrencyRole::Other
        }
    }

    pub fn is_stable(&self, symbol: &CurrencySymbol) -> bool {
        self.role(symbol) == CurrencyRole::Stable
    }

    pub fn stables(&self) -> &[CurrencySymbol] {
        &self.stables
    }

    pub fn majors(&self) -> &[CurrencySymbol] {
        &self.majors
    }

    /// Position in the preference list, `None` for unpreferred symbols.
    pub fn preference_rank(&self, symbol: &CurrencySymbol) -> Option<usize> {
        self.stables
            .iter()
            .chain(self.majors.iter())
            .position(|s| s == symbol)
    }
}

impl Default for CurrencyTable {
    fn default() -> Self {
        Self::new(["USD", "USDC", "USDT"], ["BTC", "ETH", "SOL"])
    }
}
