pub mod currency;
pub mod ledger;
pub mod network;
pub mod transaction;
