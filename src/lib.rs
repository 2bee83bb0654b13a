//! Kabu Desk - Japanese Equity Company Desk
//!
//! Client for a company master-data service covering Japanese listed
//! equities: a locally filtered company cache, a guarded multi-step delete,
//! registration of companies with price/financial data, and a stacking
//! notification sink.

pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod deletion;
pub mod error;
pub mod format;
pub mod notify;
pub mod services;
pub mod state;
pub mod validation;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
///
/// `RUST_LOG` wins over the configured filter.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
