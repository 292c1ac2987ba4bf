//! ---
//! portal_section: "01-core-functionality"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Shared primitives and utilities for the portal runtime."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "PORTAL_LOG";
const DEFAULT_DIRECTIVE: &str = "info,tower_http=debug";

/// Writer guards; dropping them would lose buffered lines on exit.
static GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console output style. The rolling file is always JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

fn env_filter() -> EnvFilter {
    let Some(directive) = std::env::var(LOG_ENV).ok().filter(|d| !d.trim().is_empty()) else {
        return EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("ignoring {LOG_ENV}={directive:?} ({err}); using {DEFAULT_DIRECTIVE}");
        EnvFilter::new(DEFAULT_DIRECTIVE)
    })
}

fn console_layer(format: LogFormat, writer: NonBlocking) -> BoxedLayer {
    let layer = fmt::layer().with_timer(fmt::time::UtcTime::rfc_3339());
    match format {
        LogFormat::StructuredJson => layer
            .json()
            .with_current_span(true)
            .with_target(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => layer.compact().with_writer(writer).boxed(),
    }
}

fn file_layer(writer: NonBlocking) -> BoxedLayer {
    fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_ansi(false)
        .with_writer(writer)
        .boxed()
}

/// Install the global subscriber.
///
/// The filter comes from `PORTAL_LOG`, then `RUST_LOG`, then
/// `info,tower_http=debug`. Besides the console a daily-rolling JSON file
/// named `<file_prefix or service>.log` is written under `directory`.
/// Calling this twice keeps the first subscriber.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "failed to create log directory {}",
            config.directory.display()
        )
    })?;
    let file_name = format!(
        "{}.log",
        config.file_prefix.as_deref().unwrap_or(service_name)
    );

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&config.directory, file_name));
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stdout());

    let installed = tracing_subscriber::registry()
        .with(vec![
            console_layer(config.format, console_writer),
            file_layer(file_writer),
        ])
        .with(env_filter())
        .try_init()
        .is_ok();
    if !installed {
        return Ok(());
    }
    let _ = GUARDS.set([file_guard, console_guard]);

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        "tracing initialised"
    );
    Ok(())
}
