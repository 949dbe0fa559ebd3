//! Command implementations for the inkstat CLI

pub mod breakdown;
pub mod cache_key;
pub mod output;
pub mod performance;
pub mod source;
pub mod top;
