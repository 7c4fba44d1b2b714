//! Maps a record and one of its currencies onto a ledger operation.

use crate::core::currency::CurrencySymbol;
use crate::core::ledger::{CurrencyLedger, LedgerError};
use crate::core::transaction::{RowCurrencySnapshot, TransactionKind, TransactionRecord};
use log::debug;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Which side of a record a currency is expected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    In,
    Out,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::In => f.write_str("in"),
            Side::Out => f.write_str("out"),
        }
    }
}

/// Integrity errors: the record cannot be applied to this currency.
#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("record {id}: {kind} expects {currency} as its {side} currency, found {found:?}")]
    CurrencyMismatch {
        id: String,
        kind: TransactionKind,
        side: Side,
        currency: CurrencySymbol,
        found: Option<CurrencySymbol>,
    },
    #[error("record {id}: {currency} is on neither side of the {kind}")]
    CurrencyNotInRecord {
        id: String,
        kind: TransactionKind,
        currency: CurrencySymbol,
    },
    #[error("record {id}: {kind} records cannot be computed")]
    UnsupportedKind { id: String, kind: TransactionKind },
}

/// Snapshot of `ledger` after applying `record`, with no price or PNL of its own.
pub fn empty_snapshot(ledger: &CurrencyLedger, record: &TransactionRecord) -> RowCurrencySnapshot {
    snapshot(ledger, record, Decimal::ZERO, Decimal::ZERO)
}

pub fn snapshot(
    ledger: &CurrencyLedger,
    record: &TransactionRecord,
    price: Decimal,
    pnl: Decimal,
) -> RowCurrencySnapshot {
    RowCurrencySnapshot {
        price,
        avg_price: ledger.avg_price(),
        pnl,
        cum_pnl: ledger.cum_pnl(),
        cum_amount: ledger.cum_amount(),
        net_amount: ledger.net_amount(),
        amount_in_network: ledger.amount_in_network(&record.network),
        amount_borrowed: ledger.total_borrowed(),
    }
}

fn expect_side(
    record: &TransactionRecord,
    currency: &CurrencySymbol,
    side: Side,
) -> Result<Decimal, DispatchError> {
    let (found, amount) = match side {
        Side::In => (record.in_symbol(), record.in_amount),
        Side::Out => (record.out_symbol(), record.out_amount),
    };
    if found != Some(currency) {
        return Err(DispatchError::CurrencyMismatch {
            id: record.id.clone(),
            kind: record.kind,
            side,
            currency: currency.clone(),
            found: found.cloned(),
        });
    }
    Ok(amount.unwrap_or(Decimal::ZERO))
}

/// `usd_value / amount`, or zero when either is missing.
fn unit_price(record: &TransactionRecord, amount: Decimal) -> Decimal {
    record
        .usd_value
        .unwrap_or(Decimal::ZERO)
        .checked_div(amount)
        .unwrap_or(Decimal::ZERO)
}

/// Apply `record` to the ledger of `currency` and snapshot the result.
///
/// A record with the same currency on both sides is a direct gain or loss
/// and is handled before looking at the kind; it never uses `usd_value`.
pub fn apply_record(
    currency: &CurrencySymbol,
    record: &TransactionRecord,
    ledger: &mut CurrencyLedger,
) -> Result<RowCurrencySnapshot, DispatchError> {
    if record.in_symbol().is_some() && record.in_symbol() == record.out_symbol() {
        return handle_same_currency(currency, record, ledger);
    }
    match record.kind {
        TransactionKind::Trade | TransactionKind::ReBuy => handle_trade(currency, record, ledger),
        TransactionKind::BridgeIn => handle_bridge_in(currency, record, ledger),
        TransactionKind::BridgeOut => handle_bridge_out(currency, record, ledger),
        TransactionKind::Reward => handle_reward(currency, record, ledger),
        TransactionKind::Loss | TransactionKind::Interest => handle_loss(currency, record, ledger),
        TransactionKind::Borrow => handle_borrow(currency, record, ledger),
        TransactionKind::Repay | TransactionKind::Principle => handle_repay(currency, record, ledger),
        TransactionKind::Error | TransactionKind::SubError => Err(DispatchError::UnsupportedKind {
            id: record.id.clone(),
            kind: record.kind,
        }),
    }
}

fn handle_same_currency(
    currency: &CurrencySymbol,
    record: &TransactionRecord,
    ledger: &mut CurrencyLedger,
) -> Result<RowCurrencySnapshot, DispatchError> {
    let received = expect_side(record, currency, Side::In)?;
    let given = expect_side(record, currency, Side::Out)?;
    let pnl = ledger.handle_extra(received - given, &record.network)?;
    Ok(snapshot(ledger, record, ledger.avg_price(), pnl))
}

fn handle_trade(
    currency: &CurrencySymbol,
    record: &TransactionRecord,
    ledger: &mut CurrencyLedger,
) -> Result<RowCurrencySnapshot, DispatchError> {
    let value = match record.usd_value {
        Some(v) if !v.is_zero() => v,
        _ => {
            debug!("record {}: unpriced {}, skipping {}", record.id, record.kind, currency);
            return Ok(empty_snapshot(ledger, record));
        }
    };

    let (amount, pnl) = if record.in_symbol() == Some(currency) {
        let amount = record.in_amount.unwrap_or(Decimal::ZERO);
        ledger.handle_buy(amount, value, &record.network)?;
        (amount, Decimal::ZERO)
    } else if record.out_symbol() == Some(currency) {
        let amount = record.out_amount.unwrap_or(Decimal::ZERO);
        let pnl = ledger.handle_sell(amount, value, &record.network)?;
        (amount, pnl)
    } else {
        return Err(DispatchError::CurrencyNotInRecord {
            id: record.id.clone(),
            kind: record.kind,
            currency: currency.clone(),
        });
    };

    if amount.is_zero() {
        return Ok(empty_snapshot(ledger, record));
    }
    let price = value.checked_div(amount).unwrap_or(Decimal::ZERO).abs();
    Ok(snapshot(ledger, record, price, pnl))
}

fn handle_bridge_in(
    currency: &CurrencySymbol,
    record: &TransactionRecord,
    ledger: &mut CurrencyLedger,
) -> Result<RowCurrencySnapshot, DispatchError> {
    let amount = expect_side(record, currency, Side::In)?;
    ledger.handle_bridge(amount, &record.network);
    Ok(snapshot(ledger, record, unit_price(record, amount), Decimal::ZERO))
}

fn handle_bridge_out(
    currency: &CurrencySymbol,
    record: &TransactionRecord,
    ledger: &mut CurrencyLedger,
) -> Result<RowCurrencySnapshot, DispatchError> {
    let amount = expect_side(record, currency, Side::Out)?;
    if amount < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount {
            operation: "bridge_out",
            currency: currency.clone(),
            amount,
        }
        .into());
    }
    ledger.handle_bridge(-amount, &record.network);
    Ok(snapshot(ledger, record, unit_price(record, amount), Decimal::ZERO))
}

/// Free receipt: bought at zero cost, no PNL until it is sold.
fn handle_reward(
    currency: &CurrencySymbol,
    record: &TransactionRecord,
    ledger: &mut CurrencyLedger,
) -> Result<RowCurrencySnapshot, DispatchError> {
    let amount = expect_side(record, currency, Side::In)?;
    ledger.handle_buy(amount, Decimal::ZERO, &record.network)?;
    Ok(empty_snapshot(ledger, record))
}

/// Sold for nothing: realizes the rolling cost of what was lost.
/// Interest payments are booked the same way.
fn handle_loss(
    currency: &CurrencySymbol,
    record: &TransactionRecord,
    ledger: &mut CurrencyLedger,
) -> Result<RowCurrencySnapshot, DispatchError> {
    let amount = expect_side(record, currency, Side::Out)?;
    let pnl = ledger.handle_sell(amount, Decimal::ZERO, &record.network)?;
    Ok(snapshot(ledger, record, unit_price(record, amount), pnl))
}

fn handle_borrow(
    currency: &CurrencySymbol,
    record: &TransactionRecord,
    ledger: &mut CurrencyLedger,
) -> Result<RowCurrencySnapshot, DispatchError> {
    let amount = expect_side(record, currency, Side::In)?;
    ledger.handle_borrow(amount, &record.network)?;
    Ok(empty_snapshot(ledger, record))
}

fn handle_repay(
    currency: &CurrencySymbol,
    record: &TransactionRecord,
    ledger: &mut CurrencyLedger,
) -> Result<RowCurrencySnapshot, DispatchError> {
    let amount = expect_side(record, currency, Side::Out)?;
    ledger.handle_repay(amount, &record.network)?;
    Ok(empty_snapshot(ledger, record))
}
