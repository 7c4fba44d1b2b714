use crate::core::currency::{CurrencySymbol, CurrencyTable};
use crate::core::transaction::TransactionRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Table-wide snapshot derived from computed records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableStats {
    /// Final `net_amount` per currency.
    pub net_owned: BTreeMap<CurrencySymbol, Decimal>,
    /// Final `amount_borrowed` per currency.
    pub net_borrowed: BTreeMap<CurrencySymbol, Decimal>,
    /// Unit price of the last priced trade per non-stable currency.
    pub last_trade_prices: BTreeMap<CurrencySymbol, Decimal>,
}

impl TableStats {
    /// Summarize `records`, which must be in sort order: later records win.
    pub fn from_records(records: &[TransactionRecord], table: &CurrencyTable) -> Self {
        let mut stats = TableStats::default();

        for record in records.iter().filter(|r| r.finalized) {
            if let Some(compute) = &record.compute {
                if !record.is_sub_row {
                    stats.observe_prices(record);
                }
                for currency in &compute.currencies {
                    if let Some(snapshot) = compute.snapshot(currency) {
                        stats.net_owned.insert(currency.clone(), snapshot.net_amount);
                        stats.net_borrowed.insert(currency.clone(), snapshot.amount_borrowed);
                    }
                }
            }
        }

        stats.last_trade_prices.retain(|currency, _| !table.is_stable(currency));
        stats
    }

    fn observe_prices(&mut self, record: &TransactionRecord) {
        let value = match record.usd_value {
            Some(v) if !v.is_zero() => v,
            _ => return,
        };
        let sides = [
            (record.in_symbol(), record.in_amount),
            (record.out_symbol(), record.out_amount),
        ];
        for (currency, amount) in sides {
            if let (Some(currency), Some(amount)) = (currency, amount) {
                if let Some(price) = value.checked_div(amount) {
                    self.last_trade_prices.insert(currency.clone(), price);
                }
            }
        }
    }
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Holdings ===")?;
        writeln!(f, "{:<10} {:>20} {:>20} {:>16}", "Currency", "Owned", "Borrowed", "Last Price")?;
        for (currency, owned) in &self.net_owned {
            let borrowed = self.net_borrowed.get(currency).copied().unwrap_or(Decimal::ZERO);
            let price = self
                .last_trade_prices
                .get(currency)
                .map(|p| p.round_dp(6).to_string())
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "{:<10} {:>20} {:>20} {:>16}",
                currency.as_str(),
                owned.round_dp(8).to_string(),
                borrowed.round_dp(8).to_string(),
                price
            )?;
        }
        Ok(())
    }
}
