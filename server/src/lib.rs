//! ReWear Backend Library
//!
//! This library exports the core modules for the ReWear clothing exchange
//! server.

pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod routes;
pub mod services;
pub mod store;
#[doc(hidden)]
pub mod test_support;
