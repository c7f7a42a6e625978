use tracing_subscriber::EnvFilter;

/// The library crate plus both binary targets.
const DEFAULT_FILTER: &str = "footy_ingest=info,footy=info,sheet_ingest=info";

/// Install the stderr subscriber. `RUST_LOG` overrides the default filter.
/// Calling this twice is harmless.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_binaries() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        for target in ["footy_ingest", "footy", "sheet_ingest"] {
            assert!(DEFAULT_FILTER.split(',').any(|d| d == format!("{target}=info")));
        }
    }
}
