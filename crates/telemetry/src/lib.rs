//! Logging setup for the workspace binaries.

#![deny(unsafe_code)]

use tracing_subscriber::EnvFilter;

/// Install the global subscriber with newline-delimited JSON output,
/// suitable for shipping to a log collector. The directive set comes from
/// `RUST_LOG` (e.g. `info,pipeline=debug`); without one, `info` and above
/// is emitted. A second call leaves the first subscriber in place.
pub fn init_json_logging() {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_env_filter(directives("info"))
        .try_init();
}

/// Install a compact human-readable subscriber on stderr, for interactive
/// CLI sessions where stdout carries command output. Quiet by default
/// (`warn` and above) unless `RUST_LOG` says otherwise.
pub fn init_compact_logging() {
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(directives("warn"))
        .try_init();
}

fn directives(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_keeps_first_subscriber() {
        init_json_logging();
        init_json_logging();
        init_compact_logging();
        tracing::info!("logging initialized");
    }
}
