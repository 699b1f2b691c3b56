//! Inicialização de tracing/OTel. `init` exporta traces e métricas via
//! OTLP/HTTP; `init_fmt_only` só escreve no stderr.

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{MetricExporter, Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{metrics::SdkMeterProvider, resource::Resource, trace::SdkTracerProvider};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const DEFAULT_ENDPOINT: &str = "http://localhost:4318";

/// Providers instalados. `shutdown` faz flush dos dados pendentes.
#[derive(Default)]
pub struct TelemetryHandle {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
}

impl TelemetryHandle {
    pub fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }

    pub fn shutdown(self) -> Result<()> {
        if let Some(meter_provider) = self.meter_provider {
            meter_provider.force_flush()?;
            meter_provider.shutdown()?;
        }
        if let Some(tracer_provider) = self.tracer_provider {
            tracer_provider.shutdown()?;
        }
        Ok(())
    }
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(service_name: &str) -> Result<TelemetryHandle> {
    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .with_attributes([KeyValue::new("service.version", env!("CARGO_PKG_VERSION"))])
        .build();

    let base = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    let traces_ep = std::env::var("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT")
        .unwrap_or_else(|_| format!("{base}/v1/traces"));
    let metrics_ep = std::env::var("OTEL_EXPORTER_OTLP_METRICS_ENDPOINT")
        .unwrap_or_else(|_| format!("{base}/v1/metrics"));

    // Traces
    let span_exporter = SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(traces_ep)
        .build()?;
    let tracer_provider = SdkTracerProvider::builder()
        .with_resource(resource.clone())
        .with_batch_exporter(span_exporter)
        .build();

    // Métricas
    let metric_exporter = MetricExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(metrics_ep)
        .build()?;
    let meter_provider = SdkMeterProvider::builder()
        .with_resource(resource)
        .with_periodic_exporter(metric_exporter)
        .build();

    global::set_tracer_provider(tracer_provider.clone());
    global::set_meter_provider(meter_provider.clone());

    let tracer = tracer_provider.tracer(service_name.to_string());
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    Registry::default()
        .with(filter_from_env())
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(TelemetryHandle {
        tracer_provider: Some(tracer_provider),
        meter_provider: Some(meter_provider),
    })
}

/// Só o layer fmt. Chamadas repetidas (testes) são ignoradas.
pub fn init_fmt_only() -> TelemetryHandle {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .with_target(false)
        .try_init();
    TelemetryHandle::default()
}

/// Span INFO com nome **estático** (exigência do tracing); o nome dinâmico
/// vai em `span_name`.
pub fn make_op_span(name: &str, op_id: u32, component: &str) -> tracing::Span {
    tracing::span!(
        target: "cpmm_exchange",
        Level::INFO,
        "op",
        span_name = %name,
        op_id = op_id,
        component = component
    )
}
