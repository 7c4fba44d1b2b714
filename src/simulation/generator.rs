//! Random but internally consistent trading histories.
//!
//! Used by the `generate` command, the benchmarks and the property tests.
//! Sells never exceed what was bought, loans are repaid on the network they
//! were taken on, and every record computes without integrity errors.

use crate::core::currency::CurrencySymbol;
use crate::core::network::Network;
use crate::core::transaction::{TransactionKind, TransactionRecord};
use chrono::{Duration, NaiveDate};
use log::debug;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Configuration for generating a random history.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Number of days with activity. Bridges and loans add extra records.
    pub events: usize,
    /// Non-stable currencies that get traded.
    pub currencies: Vec<CurrencySymbol>,
    /// Stable currency every trade is quoted in.
    pub quote: CurrencySymbol,
    pub networks: Vec<Network>,
    /// Probability that an event is a loan operation.
    pub loan_share: f64,
    /// Minimum USD value of a trade or loan.
    pub min_value: Decimal,
    /// Maximum USD value of a trade or loan.
    pub max_value: Decimal,
    pub start_date: NaiveDate,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            events: 50,
            currencies: ["BTC", "ETH", "SOL", "ARB"].into_iter().map(CurrencySymbol::from).collect(),
            quote: CurrencySymbol::new("USDC"),
            networks: ["Ethereum", "Arbitrum", "Solana"].into_iter().map(Network::from).collect(),
            loan_share: 0.1,
            min_value: Decimal::from(50),
            max_value: Decimal::from(5_000),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        }
    }
}

/// Generate a random history using the thread-local RNG.
pub fn generate_random_history(config: &HistoryConfig) -> Vec<TransactionRecord> {
    generate_history_with(config, &mut rand::thread_rng())
}

/// Generate a random history from `rng`; a seeded RNG gives a reproducible history.
pub fn generate_history_with<R: Rng + ?Sized>(config: &HistoryConfig, rng: &mut R) -> Vec<TransactionRecord> {
    let coins: Vec<CurrencySymbol> = config
        .currencies
        .iter()
        .filter(|c| **c != config.quote && !c.is_empty())
        .cloned()
        .collect();
    if coins.is_empty() {
        debug!("no tradable currencies besides {}, empty history", config.quote);
        return Vec::new();
    }

    let mut networks: Vec<Network> = Vec::with_capacity(config.networks.len());
    for network in &config.networks {
        if !networks.contains(network) {
            networks.push(network.clone());
        }
    }

    let mut builder = HistoryBuilder {
        config,
        coins,
        networks,
        rng,
        prices: BTreeMap::new(),
        holdings: BTreeMap::new(),
        open_loans: Vec::new(),
        records: Vec::new(),
    };
    for day in 0..config.events {
        builder.event(day);
    }
    debug!("generated {} records over {} days", builder.records.len(), config.events);
    builder.records
}

struct HistoryBuilder<'a, R: Rng + ?Sized> {
    config: &'a HistoryConfig,
    coins: Vec<CurrencySymbol>,
    /// Configured networks without repeats.
    networks: Vec<Network>,
    rng: &'a mut R,
    prices: BTreeMap<CurrencySymbol, f64>,
    holdings: BTreeMap<CurrencySymbol, Decimal>,
    open_loans: Vec<(Network, Decimal)>,
    records: Vec<TransactionRecord>,
}

fn to_decimal(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO).round_dp(dp)
}

fn starting_price(coin: &CurrencySymbol) -> Option<f64> {
    match coin.as_str() {
        "BTC" => Some(40_000.0),
        "ETH" => Some(2_500.0),
        "SOL" => Some(100.0),
        _ => None,
    }
}

impl<'a, R: Rng + ?Sized> HistoryBuilder<'a, R> {
    fn event(&mut self, day: usize) {
        let date = (self.config.start_date + Duration::days(day as i64))
            .format("%Y-%m-%d")
            .to_string();
        let id = format!("gen-{:05}", day);
        let network = self.pick_network();
        let coin = self.coins[self.rng.gen_range(0..self.coins.len())].clone();
        self.drift_price(&coin);

        if self.rng.gen_bool(self.config.loan_share.clamp(0.0, 1.0)) {
            if !self.open_loans.is_empty() && self.rng.gen_bool(0.5) {
                self.repay(id, date);
            } else {
                self.borrow(id, date, network, coin);
            }
            return;
        }

        let held = self.held(&coin);
        match self.rng.gen_range(0..10) {
            0 => self.reward(id, date, network, coin),
            1 if !held.is_zero() && self.networks.len() > 1 => self.bridge(id, date, coin),
            2..=4 if !held.is_zero() => self.sell(id, date, network, coin),
            _ => self.buy(id, date, network, coin),
        }
    }

    fn pick_network(&mut self) -> Network {
        if self.networks.is_empty() {
            return Network::default();
        }
        self.networks[self.rng.gen_range(0..self.networks.len())].clone()
    }

    fn drift_price(&mut self, coin: &CurrencySymbol) {
        let initial = starting_price(coin).unwrap_or_else(|| self.rng.gen_range(0.5..20.0));
        let drift = 1.0 + self.rng.gen_range(-0.05..0.05);
        let price = self.prices.entry(coin.clone()).or_insert(initial);
        *price *= drift;
    }

    fn price(&self, coin: &CurrencySymbol) -> Decimal {
        to_decimal(self.prices.get(coin).copied().unwrap_or(1.0), 6).max(Decimal::new(1, 6))
    }

    fn held(&self, coin: &CurrencySymbol) -> Decimal {
        self.holdings.get(coin).copied().unwrap_or(Decimal::ZERO)
    }

    fn random_value(&mut self) -> Decimal {
        let min = self.config.min_value.to_f64().unwrap_or(50.0);
        let max = self.config.max_value.to_f64().unwrap_or(5_000.0);
        if max <= min {
            return self.config.min_value.round_dp(2);
        }
        to_decimal(self.rng.gen_range(min..max), 2)
    }

    fn quantity_for(&self, coin: &CurrencySymbol, value: Decimal) -> Decimal {
        value
            .checked_div(self.price(coin))
            .unwrap_or(Decimal::ZERO)
            .round_dp(8)
            .max(Decimal::new(1, 8))
    }

    fn credit(&mut self, coin: &CurrencySymbol, amount: Decimal) {
        *self.holdings.entry(coin.clone()).or_insert(Decimal::ZERO) += amount;
    }

    fn buy(&mut self, id: String, date: String, network: Network, coin: CurrencySymbol) {
        let value = self.random_value();
        let amount = self.quantity_for(&coin, value);
        self.credit(&coin, amount);
        self.records.push(
            TransactionRecord::new(id, date, TransactionKind::Trade)
                .with_in(amount, coin)
                .with_out(value, self.config.quote.clone())
                .with_usd_value(value)
                .with_network(network)
                .with_tags(["spot"]),
        );
    }

    fn sell(&mut self, id: String, date: String, network: Network, coin: CurrencySymbol) {
        let share = to_decimal(self.rng.gen_range(0.1..0.9), 2);
        let amount = (self.held(&coin) * share).round_dp(8);
        if amount.is_zero() {
            return self.buy(id, date, network, coin);
        }
        let value = (amount * self.price(&coin)).round_dp(2);
        self.credit(&coin, -amount);
        self.records.push(
            TransactionRecord::new(id, date, TransactionKind::Trade)
                .with_in(value, self.config.quote.clone())
                .with_out(amount, coin)
                .with_usd_value(value)
                .with_network(network)
                .with_tags(["spot"]),
        );
    }

    fn reward(&mut self, id: String, date: String, network: Network, coin: CurrencySymbol) {
        let value = (self.random_value() / Decimal::from(20)).round_dp(2);
        let amount = self.quantity_for(&coin, value);
        self.credit(&coin, amount);
        self.records.push(
            TransactionRecord::new(id, date, TransactionKind::Reward)
                .with_in(amount, coin)
                .with_usd_value(value)
                .with_network(network)
                .with_tags(["yield"]),
        );
    }

    fn bridge(&mut self, id: String, date: String, coin: CurrencySymbol) {
        let from = self.pick_network();
        let targets: Vec<&Network> = self.networks.iter().filter(|n| **n != from).collect();
        if targets.is_empty() {
            debug!("{}: no network to bridge {} to", id, coin);
            return;
        }
        let to = targets[self.rng.gen_range(0..targets.len())].clone();
        let amount = self.held(&coin).round_dp(8);
        let value = (amount * self.price(&coin)).round_dp(2);
        self.records.push(
            TransactionRecord::new(format!("{}-1-out", id), date.clone(), TransactionKind::BridgeOut)
                .with_out(amount, coin.clone())
                .with_usd_value(value)
                .with_network(from),
        );
        self.records.push(
            TransactionRecord::new(format!("{}-2-in", id), date, TransactionKind::BridgeIn)
                .with_in(amount, coin)
                .with_usd_value(value)
                .with_network(to),
        );
    }

    /// A borrow whose proceeds are partly spent on `coin` in a child row.
    fn borrow(&mut self, id: String, date: String, network: Network, coin: CurrencySymbol) {
        let quote = self.config.quote.clone();
        let borrowed = self.random_value();
        let spent = (borrowed / Decimal::from(2)).round_dp(2);
        let amount = self.quantity_for(&coin, spent);
        self.credit(&coin, amount);
        self.open_loans.push((network.clone(), borrowed));

        let rebuy = TransactionRecord::new(format!("{}-a", id), date.clone(), TransactionKind::ReBuy)
            .with_in(amount, coin)
            .with_out(spent, quote.clone())
            .with_usd_value(spent)
            .with_network(network.clone())
            .with_tags(["leverage"])
            .with_parent(id.clone());
        self.records.push(
            TransactionRecord::new(id, date, TransactionKind::Borrow)
                .with_in(borrowed, quote)
                .with_usd_value(borrowed)
                .with_network(network)
                .with_tags(["leverage"]),
        );
        self.records.push(rebuy);
    }

    /// Repay the oldest open loan in full, with an interest child row.
    fn repay(&mut self, id: String, date: String) {
        let (network, principal) = self.open_loans.remove(0);
        let quote = self.config.quote.clone();
        let rate = to_decimal(self.rng.gen_range(0.01..0.05), 4);
        let interest = (principal * rate).round_dp(2).max(Decimal::new(1, 2));

        let interest_row = TransactionRecord::new(format!("{}-a", id), date.clone(), TransactionKind::Interest)
            .with_out(interest, quote.clone())
            .with_usd_value(interest)
            .with_network(network.clone())
            .with_tags(["leverage"])
            .with_parent(id.clone());
        self.records.push(
            TransactionRecord::new(id, date, TransactionKind::Repay)
                .with_out(principal, quote)
                .with_usd_value(principal)
                .with_network(network)
                .with_tags(["leverage"]),
        );
        self.records.push(interest_row);
    }
}
