//! Gateway: the HTTP surface the channel talks to.
//!
//! One port serves the Bot Framework messaging endpoint and a health check. Each request runs
//! its whole turn before the response is returned.

mod server;

pub use server::{build_app, run_gateway, GatewayState};
