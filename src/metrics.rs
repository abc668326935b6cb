use anyhow::Result;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::{
    metrics::{PeriodicReader, SdkMeterProvider},
    Resource,
};
use tracing::info;

use crate::config::TelemetryConfig;

/// Name of the meter the blob service instruments its backend with.
pub const METER_NAME: &str = "blobgate";

/// Install the global meter provider, exporting over OTLP/gRPC on the
/// configured interval. Leaves the no-op global provider in place when
/// metrics are disabled.
pub fn init_provider(config: &TelemetryConfig, service_version: &str) -> Result<()> {
    if !config.enable_metrics {
        return Ok(());
    }

    let resource = Resource::builder()
        .with_attribute(KeyValue::new("service.name", "blobgate"))
        .with_attribute(KeyValue::new("service.version", service_version.to_string()))
        .build();

    let mut exporter = MetricExporter::builder().with_tonic();
    if let Some(endpoint) = &config.endpoint {
        exporter = exporter.with_endpoint(endpoint.to_owned());
    }
    let exporter = exporter.build()?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(config.metrics_interval())
        .build();

    let provider = SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build();

    opentelemetry::global::set_meter_provider(provider);
    info!(
        endpoint = config.endpoint.as_deref().unwrap_or("<default>"),
        interval_secs = config.metrics_interval_secs,
        "metrics exporter installed"
    );
    Ok(())
}
