use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` only warnings and errors are shown, so that the output
/// of the programs stays readable.
pub fn set_up_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_reported() {
        let _ = set_up_logging();

        // a global subscriber is already set, so callers get the error back
        assert!(set_up_logging().is_err());
    }
}
