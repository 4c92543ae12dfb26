//! Error types produced while resolving configuration.

mod aggregate;
mod constructors;
mod conversions;
mod types;

pub use aggregate::AggregatedErrors;
pub use types::StrataError;

#[cfg(test)]
mod tests;
