//! Tracing setup shared by the liferpg binaries.
//!
//! Output goes to stderr: stdout belongs to the session display. `RUST_LOG`
//! takes precedence over the level passed in.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events pass the default filter
const CRATES: &[&str] = &["liferpg_core", "liferpg"];

/// Initialize logging at INFO
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with `default_level` for our own crates
///
/// Dependencies stay at `warn` unless `RUST_LOG` says otherwise.
pub fn init_with_level(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn default_directives(level: &str) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(CRATES.iter().map(|krate| format!("{}={}", krate, level)));
    directives.join(",")
}

/// Route logs through the test harness; safe to call from every test
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new(default_directives("debug")))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_scope_level_to_our_crates() {
        assert_eq!(
            default_directives("debug"),
            "warn,liferpg_core=debug,liferpg=debug"
        );
    }

    #[test]
    fn test_default_directives_parse() {
        init_test();
        assert!(EnvFilter::try_new(default_directives("info")).is_ok());
    }
}
