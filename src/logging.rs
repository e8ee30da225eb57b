//! # Structured Logging Module
//!
//! Environment-aware logging using the tracing ecosystem. Release resolutions
//! happen on whichever task delivers the host event, so every log line carries
//! the job name and correlation token as structured fields.
//!
//! `RUST_LOG` wins when set. Otherwise the directive comes from the environment
//! (`RELEASE_ENV`, then `APP_ENV`, default `development`).

use chrono::Utc;
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::registry::CorrelationToken;

static SUBSCRIBER_INSTALLED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Console,
    Json,
}

/// Human-readable output on stdout. Only the first init call in a process counts.
pub fn init_console_only() {
    install(LogFormat::Console);
}

/// One JSON object per line, for log collectors. Only the first init call in a process counts.
pub fn init_structured_logging() {
    install(LogFormat::Json);
}

fn install(format: LogFormat) {
    SUBSCRIBER_INSTALLED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let layer = match format {
            LogFormat::Console => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(std::io::stdout().is_terminal())
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .boxed(),
        };

        match tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
        {
            Ok(()) => tracing::info!(
                environment = %environment,
                format = ?format,
                "Release logging initialized"
            ),
            // Embedders often install their own subscriber first
            Err(_) => tracing::debug!("Tracing subscriber already installed, keeping it"),
        }
    });
}

fn get_environment() -> String {
    std::env::var("RELEASE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Filter directive for an environment: this crate stays verbose outside production
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        "test" => "warn,release_trigger=debug".to_string(),
        _ => "info,release_trigger=debug".to_string(),
    }
}

/// Log how a release was resolved
pub fn log_release_resolution(
    job_name: &str,
    token: &CorrelationToken,
    resolved_by: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        job_name = %job_name,
        token = %token,
        resolved_by = %resolved_by,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "RELEASE_RESOLVED"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_parse_for_every_environment() {
        for environment in ["production", "test", "development", "staging"] {
            let directive = get_log_level(environment);
            assert!(
                directive.parse::<EnvFilter>().is_ok(),
                "{environment} produced an invalid directive: {directive}"
            );
        }
        assert_eq!(get_log_level("production"), "info");
        assert!(get_log_level("staging").contains("release_trigger=debug"));
    }

    #[test]
    fn test_release_env_takes_precedence() {
        std::env::set_var("RELEASE_ENV", "staging");
        assert_eq!(get_environment(), "staging");
        std::env::remove_var("RELEASE_ENV");
    }

    #[test]
    fn test_second_install_keeps_first_subscriber() {
        init_structured_logging();
        init_console_only();
        assert!(SUBSCRIBER_INSTALLED.get().is_some());
        log_release_resolution("deploy", &CorrelationToken::new(), "test", "success", None);
    }
}
