//! Audit trail for the governance kernel.
//!
//! Every dispatch, ruling, and violation in this crate is logged through
//! `tracing`; this module routes that stream into a daily-rotated JSON
//! file. Writes go through a non-blocking channel, so a slow disk never
//! delays a ruling. There is no console layer here: the embedding
//! application owns human-facing output, the kernel owns the audit record.
//!
//! Identities are logged by id, never by persona.

use std::path::PathBuf;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Where and how the audit trail is written.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Directory receiving the rotated files
    pub directory: PathBuf,
    /// File name prefix; rotation appends the date
    pub file_prefix: String,
    /// Default level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_prefix: "governance-audit".to_string(),
            level: "info".to_string(),
        }
    }
}

fn audit_writer(config: &AuditConfig) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(
        Rotation::DAILY,
        &config.directory,
        &config.file_prefix,
    );
    tracing_appender::non_blocking(appender)
}

fn audit_filter(config: &AuditConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// One flattened JSON record per governance event, keyed fields at the top
/// level for downstream log pipelines.
fn audit_layer<S>(writer: NonBlocking) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(writer)
}

/// Install the audit trail as the process-global subscriber.
///
/// Returns the writer guard; hold it for the lifetime of the embedding
/// application. Dropping it flushes and closes the current file.
pub fn install_audit(config: &AuditConfig) -> WorkerGuard {
    let (writer, guard) = audit_writer(config);
    tracing_subscriber::registry()
        .with(audit_filter(config))
        .with(audit_layer(writer))
        .init();
    guard
}

/// Run `f` with the audit trail active on the current thread only, then
/// flush. Used by test harnesses and embedded tooling that must not touch
/// the process-global subscriber.
pub fn scoped_audit<R>(config: &AuditConfig, f: impl FnOnce() -> R) -> R {
    let (writer, guard) = audit_writer(config);
    let subscriber = tracing_subscriber::registry()
        .with(audit_filter(config))
        .with(audit_layer(writer));
    let result = tracing::subscriber::with_default(subscriber, f);
    // Flush before returning so the record is on disk when `f` is done
    drop(guard);
    result
}
