//! Painel Kernel Library
//!
//! Upload gateway, notification aggregator and content backend client for
//! the admin dashboard. The server entry point is the `painel` binary.

pub mod api;
pub mod config;
pub mod error;
pub mod file;
pub mod notifications;
pub mod routes;
pub mod state;

pub use config::Config;
pub use state::AppState;
