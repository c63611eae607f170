//! Query boundary: thin axum handlers over the correlator.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use router::build_router;
pub use server::ApiServer;
