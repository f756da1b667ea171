//! Telemetry initialization.
//!
//! With the `telemetry` feature enabled and `telemetry.enabled: true` in the
//! configuration, spans are exported over OTLP/gRPC to the configured
//! collector. Otherwise a no-op layer is returned so callers can compose the
//! subscriber the same way in both builds.

use anyhow::Result;

#[cfg(feature = "telemetry")]
use {
    anyhow::Context, opentelemetry::trace::TracerProvider, opentelemetry::KeyValue,
    opentelemetry_otlp::WithExportConfig,
    opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider, opentelemetry_sdk::Resource,
    tracing_opentelemetry::OpenTelemetryLayer,
};

use tracing_subscriber::layer::Layer;
use tracing_subscriber::registry::LookupSpan;

use crate::config::TelemetryConfig;

pub fn init_telemetry<S>(config: &TelemetryConfig) -> Result<Box<dyn Layer<S> + Send + Sync>>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
{
    if !config.enabled {
        return Ok(Box::new(tracing_subscriber::layer::Identity::new()));
    }

    #[cfg(feature = "telemetry")]
    {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(config.endpoint.clone())
            .build()
            .context("Failed to build OTLP span exporter")?;

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
            .with_resource(Resource::new(vec![KeyValue::new(
                "service.name",
                config.service_name.clone(),
            )]))
            .build();

        let tracer = provider.tracer(config.service_name.clone());
        opentelemetry::global::set_tracer_provider(provider);

        Ok(Box::new(OpenTelemetryLayer::new(tracer)))
    }
    #[cfg(not(feature = "telemetry"))]
    {
        tracing::warn!(
            endpoint = %config.endpoint,
            "telemetry enabled in config but quarry was built without the `telemetry` feature"
        );
        Ok(Box::new(tracing_subscriber::layer::Identity::new()))
    }
}

pub fn shutdown_telemetry() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::Registry;

    #[test]
    fn test_disabled_telemetry_returns_noop_layer() {
        let config = TelemetryConfig::default();
        let layer = init_telemetry::<Registry>(&config);
        assert!(layer.is_ok());
        shutdown_telemetry();
    }
}
