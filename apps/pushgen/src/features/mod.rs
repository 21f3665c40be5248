pub mod aggregator;
pub mod categories;
