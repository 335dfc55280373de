//! HTTP surface: routes, extractors, middleware and the server

pub mod auth;
pub mod client_ip;
pub mod extractors;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
mod server;
pub mod types;

pub use server::{ApiContext, ApiServer, router};
