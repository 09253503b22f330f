use std::io;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Pick the default filter directive from the CLI verbosity flags.
/// `quiet` wins over `verbose`.
pub fn default_directive(verbose: bool, quiet: bool, level: &str) -> String {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        level
    };
    format!("diffex={level},warn")
}

/// Initialize the tracing subscriber on stderr. `RUST_LOG` takes precedence
/// over the directive computed from flags and settings.
pub fn init_logging(verbose: bool, quiet: bool, level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet, level)));

    // a second init (e.g. from tests) is not an error worth reporting
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false, false, "info"), "diffex=info,warn");
        assert_eq!(default_directive(true, false, "info"), "diffex=debug,warn");
        assert_eq!(default_directive(true, true, "info"), "diffex=error,warn");
        assert_eq!(default_directive(false, false, "trace"), "diffex=trace,warn");
    }

    #[test]
    fn test_logging_init_twice() {
        init_logging(false, true, "info");
        init_logging(true, false, "info");
    }
}
