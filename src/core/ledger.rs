use crate::core::currency::{CurrencySymbol, CurrencyTable};
use crate::core::network::Network;
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by ledger arithmetic preconditions.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("{operation}: amount must not be negative, got {amount} {currency}")]
    NegativeAmount {
        operation: &'static str,
        currency: CurrencySymbol,
        amount: Decimal,
    },
}

/// Rolling accumulator for a single currency.
///
/// Tracks the weighted-average cost of the holdings that have not been
/// sold yet (the *rolling window*), realized profit and loss, and the
/// balances held and borrowed on each network.
///
/// A sell realizes `(sell price - rolling average) * amount` and shrinks the
/// rolling window proportionally, so the average cost of what remains is
/// unchanged.
///
/// Stable currencies (unit of account) are never cost-tracked: their price
/// is 1, buys and sells only move amounts, and direct gains or losses post
/// straight into realized PNL.
///
/// # Examples
///
/// ```
/// use pnl_ledger::core::ledger::CurrencyLedger;
/// use pnl_ledger::core::network::Network;
/// use rust_decimal_macros::dec;
///
/// let net = Network::new("Ethereum");
/// let mut eth = CurrencyLedger::new("ETH", false);
/// eth.handle_buy(dec!(10), dec!(500), &net).unwrap();
/// let pnl = eth.handle_sell(dec!(5), dec!(300), &net).unwrap();
///
/// assert_eq!(pnl, dec!(50));
/// assert_eq!(eth.rolling_bought(), dec!(5));
/// assert_eq!(eth.rolling_spent(), dec!(250));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyLedger {
    currency: CurrencySymbol,
    /// Value spent on buys; only feeds the simple average price.
    v_spent: Decimal,
    /// Amount bought; only feeds the simple average price.
    a_bought: Decimal,
    a_sold: Decimal,
    v_sold: Decimal,
    /// Amount currently in the rolling window.
    rolling_bought: Decimal,
    /// Cost of the amount currently in the rolling window.
    rolling_spent: Decimal,
    realized_pnl: Decimal,
    /// Deducted from cumulative PNL. Nothing assigns it yet.
    interest_value: Decimal,
    /// Deducted from cumulative PNL. Nothing assigns it yet.
    lost_value: Decimal,
    /// Signed amount moved in (+) or out (-) by transfers.
    net_bridged: Decimal,
    owned_by_network: BTreeMap<Network, Decimal>,
    loans_by_network: BTreeMap<Network, Decimal>,
    is_stable: bool,
    last_price: Decimal,
}

impl CurrencyLedger {
    pub fn new(currency: impl Into<CurrencySymbol>, is_stable: bool) -> Self {
        Self {
            currency: currency.into(),
            v_spent: Decimal::ZERO,
            a_bought: Decimal::ZERO,
            a_sold: Decimal::ZERO,
            v_sold: Decimal::ZERO,
            rolling_bought: Decimal::ZERO,
            rolling_spent: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            interest_value: Decimal::ZERO,
            lost_value: Decimal::ZERO,
            net_bridged: Decimal::ZERO,
            owned_by_network: BTreeMap::new(),
            loans_by_network: BTreeMap::new(),
            is_stable,
            last_price: if is_stable { Decimal::ONE } else { Decimal::ZERO },
        }
    }

    /// Create an empty ledger whose stable flag comes from the currency table.
    pub fn for_currency(currency: &CurrencySymbol, table: &CurrencyTable) -> Self {
        Self::new(currency.clone(), table.is_stable(currency))
    }

    fn ensure_non_negative(&self, operation: &'static str, amount: Decimal) -> Result<(), LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount {
                operation,
                currency: self.currency.clone(),
                amount,
            });
        }
        Ok(())
    }

    fn add_to_network(&mut self, network: &Network, amount: Decimal) {
        *self
            .owned_by_network
            .entry(network.clone())
            .or_insert(Decimal::ZERO) += amount;
    }

    fn record_last_price(&mut self, amount: Decimal, value: Decimal) {
        if let Some(price) = value.checked_div(amount) {
            self.last_price = price;
        }
    }

    /// Receive `amount` for a total cost of `value`.
    pub fn handle_buy(&mut self, amount: Decimal, value: Decimal, network: &Network) -> Result<(), LedgerError> {
        self.ensure_non_negative("handle_buy", amount)?;
        self.add_to_network(network, amount);
        if self.is_stable {
            self.a_bought += amount;
            return Ok(());
        }
        self.record_last_price(amount, value);
        self.a_bought += amount;
        self.v_spent += value;
        self.rolling_bought += amount;
        self.rolling_spent += value;
        Ok(())
    }

    /// Give away `amount` for a total of `value`, returning the realized PNL.
    pub fn handle_sell(&mut self, amount: Decimal, value: Decimal, network: &Network) -> Result<Decimal, LedgerError> {
        self.ensure_non_negative("handle_sell", amount)?;
        self.add_to_network(network, -amount);
        if self.is_stable {
            self.a_sold += amount;
            return Ok(Decimal::ZERO);
        }
        self.record_last_price(amount, value);
        self.a_sold += amount;
        self.v_sold += value;

        let buy_price = self
            .rolling_spent
            .checked_div(self.rolling_bought)
            .unwrap_or(Decimal::ZERO);
        let sell_price = value.checked_div(amount).unwrap_or(Decimal::ZERO);
        let pnl = (sell_price - buy_price) * amount;
        self.realized_pnl += pnl;

        let previous = self.rolling_bought;
        if amount > previous {
            warn!(
                "{}: sold {} but only {} in the rolling window",
                self.currency, amount, previous
            );
            self.rolling_bought = Decimal::ZERO;
            self.rolling_spent = Decimal::ZERO;
        } else if previous > Decimal::ZERO {
            self.rolling_bought -= amount;
            self.rolling_spent = self.rolling_spent * self.rolling_bought / previous;
        }
        Ok(pnl)
    }

    /// Move a signed amount in (+) or out (-) of a network. Never touches PNL.
    pub fn handle_bridge(&mut self, amount: Decimal, network: &Network) {
        self.net_bridged += amount;
        self.add_to_network(network, amount);
    }

    /// Signed direct gain (+) or loss (-) with no counter-currency.
    /// Returns the PNL realized by this event.
    pub fn handle_extra(&mut self, amount: Decimal, network: &Network) -> Result<Decimal, LedgerError> {
        if amount > Decimal::ZERO {
            if self.is_stable {
                self.add_to_network(network, amount);
                self.a_bought += amount;
                let gain = amount * self.avg_price();
                self.realized_pnl += gain;
                return Ok(gain);
            }
            self.handle_buy(amount, Decimal::ZERO, network)?;
            return Ok(Decimal::ZERO);
        }
        if amount < Decimal::ZERO {
            let lost = amount.abs();
            if self.is_stable {
                self.add_to_network(network, -lost);
                self.a_sold += lost;
                let loss = amount * self.avg_price();
                self.realized_pnl += loss;
                return Ok(loss);
            }
            return self.handle_sell(lost, Decimal::ZERO, network);
        }
        Ok(Decimal::ZERO)
    }

    pub fn handle_borrow(&mut self, amount: Decimal, network: &Network) -> Result<(), LedgerError> {
        self.ensure_non_negative("handle_borrow", amount)?;
        *self
            .loans_by_network
            .entry(network.clone())
            .or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    /// Reduce the loan on `network`. Repaying more than was borrowed is
    /// tolerated: filtered or partial histories routinely look that way.
    pub fn handle_repay(&mut self, amount: Decimal, network: &Network) -> Result<(), LedgerError> {
        self.ensure_non_negative("handle_repay", amount)?;
        let loan = self
            .loans_by_network
            .entry(network.clone())
            .or_insert(Decimal::ZERO);
        if *loan < amount {
            warn!(
                "{}: repaying {} on {} exceeds the recorded loan of {}",
                self.currency, amount, network, loan
            );
        }
        *loan -= amount;
        Ok(())
    }

    // --- Derived values ---

    /// Simple average buy price; always 1 for stables.
    pub fn avg_price(&self) -> Decimal {
        if self.is_stable {
            return Decimal::ONE;
        }
        self.v_spent
            .checked_div(self.a_bought)
            .unwrap_or(Decimal::ZERO)
    }

    /// Everything on hand, borrowed funds included.
    pub fn cum_amount(&self) -> Decimal {
        self.a_bought - self.a_sold + self.total_borrowed() + self.net_bridged
    }

    /// Exposure to the currency's price: holdings excluding borrowed funds.
    pub fn net_amount(&self) -> Decimal {
        self.a_bought - self.a_sold + self.net_bridged
    }

    pub fn total_borrowed(&self) -> Decimal {
        self.loans_by_network.values().sum()
    }

    /// Held plus borrowed amount on one network.
    pub fn amount_in_network(&self, network: &Network) -> Decimal {
        let owned = self.owned_by_network.get(network).copied().unwrap_or(Decimal::ZERO);
        let loaned = self.loans_by_network.get(network).copied().unwrap_or(Decimal::ZERO);
        owned + loaned
    }

    pub fn cum_pnl(&self) -> Decimal {
        self.realized_pnl - self.interest_value - self.lost_value
    }

    // --- Accessors ---

    pub fn currency(&self) -> &CurrencySymbol {
        &self.currency
    }

    pub fn is_stable(&self) -> bool {
        self.is_stable
    }

    pub fn v_spent(&self) -> Decimal {
        self.v_spent
    }

    pub fn a_bought(&self) -> Decimal {
        self.a_bought
    }

    pub fn a_sold(&self) -> Decimal {
        self.a_sold
    }

    pub fn v_sold(&self) -> Decimal {
        self.v_sold
    }

    pub fn rolling_bought(&self) -> Decimal {
        self.rolling_bought
    }

    pub fn rolling_spent(&self) -> Decimal {
        self.rolling_spent
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    pub fn interest_value(&self) -> Decimal {
        self.interest_value
    }

    pub fn lost_value(&self) -> Decimal {
        self.lost_value
    }

    pub fn net_bridged(&self) -> Decimal {
        self.net_bridged
    }

    pub fn last_price(&self) -> Decimal {
        self.last_price
    }

    pub fn owned_by_network(&self) -> &BTreeMap<Network, Decimal> {
        &self.owned_by_network
    }

    pub fn loans_by_network(&self) -> &BTreeMap<Network, Decimal> {
        &self.loans_by_network
    }
}
