use serde::{Deserialize, Serialize};
use std::fmt;

/// Custody location of a balance (a chain, an exchange account, a wallet).
///
/// Networks are orthogonal to currencies: every ledger tracks held and
/// borrowed amounts per network.
///
/// # Examples
///
/// ```
/// use pnl_ledger::core::network::Network;
///
/// let eth = Network::new("Ethereum");
/// let base = Network::new("Base");
/// assert_ne!(eth, base);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Network(String);

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the string representation of this network.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Network {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
