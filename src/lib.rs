pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{HttpLedger, HttpRegistry, InMemoryLedger};
pub use api::{build_router, ApiServer};
pub use config::AppConfig;
pub use core::{
    correlator::QueryCorrelator,
    subscriber::{SubscriberHandle, SubscriberState, SubscriberStats, UpdateSubscriber},
};
pub use utils::error::{LedgerApiError, Result};
