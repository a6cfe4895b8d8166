//! Subscriber setup for the glimpse CLI.
//!
//! Always logs to stderr through `tracing_subscriber::fmt`. When an OTLP
//! endpoint is configured, spans and log records are also exported over
//! gRPC.

use std::time::Duration;

use anyhow::{Context, Result};
use glimpseconf::TelemetrySection;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Timeout for OTLP exports - prevents blocking on unavailable endpoints
const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Providers that must outlive the session so pending data gets flushed.
pub struct Telemetry {
    providers: Option<(SdkTracerProvider, SdkLoggerProvider)>,
}

impl Telemetry {
    pub fn shutdown(self) {
        if let Some((tracer_provider, logger_provider)) = self.providers {
            if let Err(e) = tracer_provider.shutdown() {
                eprintln!("Failed to flush traces: {}", e);
            }
            if let Err(e) = logger_provider.shutdown() {
                eprintln!("Failed to flush logs: {}", e);
            }
        }
    }
}

fn env_filter(section: &TelemetrySection) -> EnvFilter {
    EnvFilter::try_new(&section.log_level).unwrap_or_else(|_| EnvFilter::new("info,glimpse=debug"))
}

/// Install the global subscriber.
pub fn init(section: &TelemetrySection) -> Result<Telemetry> {
    let Some(otlp_endpoint) = section.otlp_endpoint.as_deref() else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(section))
            .with_writer(std::io::stderr)
            .init();
        return Ok(Telemetry { providers: None });
    };

    let resource = Resource::builder_empty()
        .with_service_name("glimpse")
        .with_attributes(vec![KeyValue::new("service.version", env!("CARGO_PKG_VERSION"))])
        .build();

    let endpoint = if otlp_endpoint.starts_with("http") {
        otlp_endpoint.to_string()
    } else {
        format!("http://{}", otlp_endpoint)
    };

    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to create OTLP span exporter")?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_span_processor(
            opentelemetry_sdk::trace::BatchSpanProcessor::builder(trace_exporter).build(),
        )
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource.clone())
        .build();

    let tracer = tracer_provider.tracer("glimpse");
    global::set_tracer_provider(tracer_provider.clone());

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to create OTLP log exporter")?;

    let logger_provider = SdkLoggerProvider::builder()
        .with_log_processor(opentelemetry_sdk::logs::BatchLogProcessor::builder(log_exporter).build())
        .with_resource(resource)
        .build();

    let log_appender =
        opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(&logger_provider);

    tracing_subscriber::registry()
        .with(env_filter(section))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(log_appender)
        .init();

    tracing::info!(endpoint = %otlp_endpoint, "OpenTelemetry export enabled");

    Ok(Telemetry {
        providers: Some((tracer_provider, logger_provider)),
    })
}
