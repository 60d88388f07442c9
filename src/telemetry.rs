//! Telemetry helpers for structured logging.

/// Installs an env-filtered `fmt` subscriber unless one is already set.
///
/// Returns `true` if this call installed the subscriber. Embedders that
/// configure their own subscriber can skip this; later calls return `false`.
pub fn init_tracing() -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }
    // another thread may win the race between the check and the install
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_existing_subscriber() {
        init_tracing();
        assert!(!init_tracing());
        tracing::info!("telemetry initialized");
    }
}
