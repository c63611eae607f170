// Adapters layer: concrete implementations of the domain ports.

pub mod ledger_http;
pub mod memory;
pub mod registry;

pub use ledger_http::HttpLedger;
pub use memory::InMemoryLedger;
pub use registry::HttpRegistry;
