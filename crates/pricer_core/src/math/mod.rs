//! Numeric containers used along Monte Carlo paths.

pub mod random_variable;

pub use random_variable::RandomVariable;
