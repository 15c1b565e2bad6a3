//! Telemetry helpers for hosts embedding `series-prep`.
//!
//! Diagnostics are always emitted through `tracing`; installing a subscriber
//! is left to the host unless it opts into `init_default_tracing`.

/// Initializes a compact `tracing` subscriber when the `telemetry` feature is
/// enabled.
///
/// The filter comes from `RUST_LOG` and defaults to `info`, which shows one
/// line per prepared plot plus every diagnostic. Returns `false` when the
/// feature is disabled or the host already installed a global subscriber.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}
