// core.rs splits ledger responsibilities into submodules.
pub mod chain;
pub mod state;
pub mod validation;

pub use chain::*;
