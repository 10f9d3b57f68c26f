use tracing::subscriber::{set_global_default, SetGlobalDefaultError};
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::{log::SetLoggerError, LogTracer};
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

use crate::helper::error_chain_fmt;

/// Composes the layers of the service's `tracing` Subscriber.
///
/// Spans and events are filtered by `RUST_LOG`, stored as JSON by `JsonStorageLayer`
/// (which also propagates the fields of parent spans to their children)
/// and written in a "bunyan"-compatible JSON format.
///
/// # Arguments
/// - `name`: name of the app, added to every log record
/// - `fallback_env_filter`: filter level used if the `RUST_LOG` env variable has not been set
/// - `sink`: where the log records are written (`std::io::stdout`, `std::io::sink` in tests, ...)
pub fn get_tracing_subscriber<Sink>(
    name: String,
    fallback_env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    // The sink implements `MakeWriter` for all choices of the lifetime `'a`
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_env_filter));

    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Registers a tracing Subscriber as the global default to process span data.
///
/// Records emitted through the `log` facade (by actix-web or the gRPC stack for ex)
/// are redirected to the subscriber.
///
/// It should only be called once: a second call returns an error.
pub fn init_tracing_subscriber(
    subscriber: impl Subscriber + Send + Sync,
) -> Result<(), TelemetryError> {
    LogTracer::init()?;
    set_global_default(subscriber)?;

    Ok(())
}

#[derive(thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to redirect `log` records to tracing")]
    LogTracerError(#[from] SetLoggerError),
    #[error("Failed to set the global tracing subscriber")]
    GlobalDefaultError(#[from] SetGlobalDefaultError),
}

impl std::fmt::Debug for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
