// Domain layer: ledger records, external views, and the ports the adapters implement.

pub mod model;
pub mod ports;
pub mod views;
