//! Track metrics engine

pub mod aggregator;
pub mod batch;
pub mod geodesy;
pub mod position;
pub mod segment;

#[cfg(test)]
mod tests;
