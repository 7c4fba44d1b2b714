pub mod filter;
pub mod recompute;
pub mod sort;
pub mod stats;
