//! HTTP API: router, authentication middleware, role policy and
//! request/response mapping.

pub mod app;
pub mod authz;
pub mod middleware;
