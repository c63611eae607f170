pub mod correlator;
pub mod projection;
pub mod subscriber;

pub use crate::domain::model::{StateAndInstant, TitleRecord, VaultUpdate};
pub use crate::domain::ports::{LedgerFeed, LedgerQuery, TitleRegistry};
pub use crate::utils::error::Result;
