//! Data models

pub mod ledger;
pub mod sample;

pub use ledger::*;
pub use sample::*;
