//! # Structured Logging
//!
//! One `tracing` subscriber for the whole process. Vault lifecycle events
//! (created, funded, checked in, claimed, disable left pending) are emitted
//! by `lastwill_protocol` with the vault address as a field, so a JSON log
//! can be filtered down to a single vault's history.
//!
//! Logs go to stderr. Stdout belongs to `keygen` and `version`, whose
//! output people copy into scripts.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used by `run` when `RUST_LOG` is unset. Request spans from
/// `tower_http` are kept at debug so each vault call shows its latency.
pub const NODE_DIRECTIVES: &str =
    "lastwill_node=info,lastwill_protocol=info,lastwill_contracts=info,tower_http=debug";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored, multi-field lines for a terminal.
    Pretty,
    /// One JSON object per event, for shipping to an aggregator.
    Json,
}

impl LogFormat {
    /// `"json"` in any case selects JSON; anything else falls back to pretty
    /// so a typo in `LASTWILL_LOG_FORMAT` never stops the node from starting.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Installs the global subscriber. Panics if one is already installed, so
/// call it once from `main`.
///
/// `RUST_LOG` wins over `default_directives` when set, e.g.
///
/// ```text
/// RUST_LOG=lastwill_protocol=debug,lastwill_contracts=debug
/// ```
///
/// shows every delegation signed and every disable attempt.
pub fn init_logging(default_directives: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .init();
        }
    }

    tracing::debug!(?format, "logging ready");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_is_lenient() {
        assert_eq!(LogFormat::from_str_lossy("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str_lossy("yaml"), LogFormat::Pretty);
    }

    #[test]
    fn node_directives_parse() {
        assert!(EnvFilter::try_new(NODE_DIRECTIVES).is_ok());
    }
}
