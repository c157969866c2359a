//! Glossa API Server module
//!
//! HTTP REST API over the extract, translate and apply steps.
//! Run with `glossa-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server};
