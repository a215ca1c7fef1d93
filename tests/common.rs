// tests/common.rs
//! Shared test logging setup

#[cfg(feature = "logging")]
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Route field-vault's tracing output into the test harness
///
/// `RUST_LOG` wins; otherwise only degraded-path warnings are shown.
/// Safe to call from every test.
pub fn setup() {
    #[cfg(feature = "logging")]
    {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("field_vault=warn"));
        tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer())
            .with(filter)
            .try_init()
            .ok();
    }
}
