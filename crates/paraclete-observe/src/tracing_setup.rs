//! Global tracing subscriber setup.
//!
//! One fmt layer for structured log output, an `EnvFilter` seeded from the
//! CLI verbosity, and an optional OpenTelemetry bridge for span export.
//!
//! ```no_run
//! // Logging only, at the given default level
//! paraclete_observe::tracing_setup::init_tracing(false, "info").unwrap();
//!
//! // Logging plus OTel span export (stdout exporter)
//! paraclete_observe::tracing_setup::init_tracing(true, "debug").unwrap();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Provider handle kept for the shutdown flush.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the process-wide tracing subscriber.
///
/// `default_filter` is an `EnvFilter` directive string (the CLI derives it
/// from `-v`/`-q`); an explicit `RUST_LOG` overrides it. With `enable_otel`
/// set, spans are additionally exported through OpenTelemetry. The exporter
/// writes to stdout, which is enough for local inspection; a deployment
/// would substitute OTLP here.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing(
    enable_otel: bool,
    default_filter: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);

    if !enable_otel {
        registry.init();
        return Ok(());
    }

    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
        .build();
    let tracer = provider.tracer("paraclete");

    // The provider is registered globally and also stashed so
    // shutdown_tracing can flush it on exit.
    let _ = TRACER_PROVIDER.set(provider.clone());
    opentelemetry::global::set_tracer_provider(provider);

    registry
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    Ok(())
}

/// Flush buffered spans and tear down the OTel provider.
///
/// A no-op when `init_tracing` ran without OTel. Call once, right before
/// process exit.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}
