//! Structured logging setup
//!
//! `RUST_LOG` wins over the verbosity flags when set.

use tracing_subscriber::EnvFilter;

use crate::cli::Verbosity;

/// Filter for a verbosity level, unless `RUST_LOG` is set
pub fn filter_for(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(verbosity)))
}

fn directive(verbosity: Verbosity) -> String {
    // dependency crates stay at warn unless asked for trace
    match verbosity {
        Verbosity::VeryVerbose => "trace".to_string(),
        other => format!("warn,policylens={}", other.log_level()),
    }
}

/// Install the global subscriber; logs go to stderr so stdout stays parseable.
/// A second call is a no-op.
pub fn init(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        assert_eq!(directive(Verbosity::Quiet), "warn,policylens=error");
        assert_eq!(directive(Verbosity::Normal), "warn,policylens=info");
        assert_eq!(directive(Verbosity::Verbose), "warn,policylens=debug");
        assert_eq!(directive(Verbosity::VeryVerbose), "trace");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(Verbosity::Quiet);
        init(Verbosity::Verbose);
    }
}
