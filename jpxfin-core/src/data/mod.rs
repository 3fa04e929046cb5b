//! Data sources: the JPX roster and fundamentals providers.

pub mod memory;
pub mod provider;
pub mod roster;
pub mod yahoo;

pub use memory::{Endpoint, StaticProvider};
pub use provider::{FieldMap, FundamentalsProvider, ProviderError};
pub use roster::{Roster, RosterEntry, RosterError, RosterFilter};
pub use yahoo::{YahooConfig, YahooProvider};
