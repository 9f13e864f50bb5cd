//! Tracing subscriber initialization.
//!
//! # Usage
//!
//! ```no_run
//! use tebnegar_observe::tracing_setup::{init_tracing, TracingOptions};
//!
//! // Human-readable logs at the default level
//! init_tracing(&TracingOptions::default()).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use std::sync::OnceLock;

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Directives used when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";
const VERBOSE_DIRECTIVES: &str = "debug,sqlx=info,hyper=info,reqwest=info";

/// How the global subscriber is assembled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOptions {
    /// Bridge spans to OpenTelemetry with a stdout exporter.
    pub otel: bool,
    /// Emit one JSON object per event instead of pretty text.
    pub json: bool,
    /// Lower the default level to `debug`.
    pub verbose: bool,
}

/// Build the level filter. `RUST_LOG` wins over the defaults.
pub fn env_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose {
        VERBOSE_DIRECTIVES
    } else {
        DEFAULT_DIRECTIVES
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Initialize the global tracing subscriber.
///
/// Events go to stderr; stdout is left to command output.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing(options: &TracingOptions) -> Result<(), Box<dyn std::error::Error>> {
    let text_layer = (!options.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
    });
    let json_layer = options.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(false)
    });

    let otel_layer = options.otel.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("tebnegar");

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(env_filter(options.verbose))
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// No-op when OTel was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}
