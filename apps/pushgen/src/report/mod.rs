pub mod metrics;
pub mod summary;
pub mod writer;
