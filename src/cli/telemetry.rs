use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{Compression, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
    Resource,
};
use std::time::Duration;
use tonic::{
    metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use ulid::Ulid;
use url::Url;

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Collector settings taken from the `OTEL_*` environment.
///
/// Only gRPC is spoken. An endpoint without a scheme is treated as `https`.
#[derive(Debug, PartialEq, Eq)]
struct OtlpSettings {
    endpoint: String,
    headers: Vec<(String, String)>,
    instance_id: Option<String>,
}

impl OtlpSettings {
    /// `None` when no collector endpoint is configured.
    fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())?;

        let endpoint = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint
        } else {
            format!("https://{}", endpoint.trim_end_matches('/'))
        };

        let headers = lookup("OTEL_EXPORTER_OTLP_HEADERS")
            .map(|raw| {
                raw.split(',')
                    .filter_map(|pair| {
                        let (key, value) = pair.split_once('=')?;
                        let key = key.trim().to_ascii_lowercase();
                        (!key.is_empty()).then(|| (key, value.trim().to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            endpoint,
            headers,
            instance_id: lookup("OTEL_SERVICE_INSTANCE_ID"),
        })
    }

    fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Host to verify the collector certificate against, `None` for plain http.
    fn tls_domain(&self) -> Result<Option<String>> {
        let url = Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid OTLP endpoint: {}", self.endpoint))?;
        if url.scheme() != "https" {
            return Ok(None);
        }
        url.host_str()
            .map(|host| Some(host.to_string()))
            .ok_or_else(|| anyhow!("OTLP endpoint has no host: {}", self.endpoint))
    }

    // Auth headers for hosted collectors; binary metadata is not accepted.
    fn metadata(&self) -> Result<MetadataMap> {
        let mut meta = MetadataMap::with_capacity(self.headers.len());
        for (key, value) in &self.headers {
            let name = MetadataKey::<Ascii>::from_bytes(key.as_bytes())
                .map_err(|e| anyhow!("invalid OTLP header name {key}: {e}"))?;
            let value: MetadataValue<Ascii> = value
                .parse()
                .map_err(|e| anyhow!("invalid OTLP header value for {key}: {e}"))?;
            meta.insert(name, value);
        }
        Ok(meta)
    }
}

/// Resource attributes attached to every exported span.
fn resource_attributes(command: &str, instance_id: String) -> Vec<KeyValue> {
    vec![
        KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        KeyValue::new("service.instance.id", instance_id),
        KeyValue::new("vcs.revision", crate::GIT_COMMIT_HASH),
        KeyValue::new("authrelay.command", command.to_string()),
    ]
}

fn init_tracer(settings: &OtlpSettings, command: &str) -> Result<Tracer> {
    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&settings.endpoint)
        .with_compression(Compression::Gzip)
        .with_timeout(Duration::from_secs(3));

    if let Some(domain) = settings.tls_domain()? {
        builder = builder.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain)
                .with_native_roots(),
        );
    }

    if !settings.headers.is_empty() {
        builder = builder.with_metadata(settings.metadata()?);
    }

    let exporter = builder.build()?;

    let instance_id = settings
        .instance_id
        .clone()
        .unwrap_or_else(|| Ulid::new().to_string());

    let trace_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder_empty()
                .with_attributes(resource_attributes(command, instance_id))
                .build(),
        )
        .build();

    let _ = TRACER_PROVIDER.set(trace_provider.clone());

    global::set_tracer_provider(trace_provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(trace_provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Initialize logging for `command` and, when `OTEL_EXPORTER_OTLP_ENDPOINT`
/// is set, the OTLP trace exporter.
///
/// # Errors
///
/// Returns an error if the collector settings are invalid or the subscriber
/// cannot be installed.
pub fn init(verbosity_level: Option<Level>, command: &str) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    // stderr keeps `mint` output pipeable.
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    if let Some(settings) = OtlpSettings::from_env() {
        let tracer = init_tracer(&settings, command)?;
        let subscriber = Registry::default()
            .with(fmt_layer)
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
        debug!("Exporting {command} traces to {}", settings.endpoint);
    } else {
        tracing::subscriber::set_global_default(Registry::default().with(fmt_layer).with(filter))?;
    }

    Ok(())
}

/// Flush and shut down the tracer provider (noop if not initialized)
pub fn shutdown_tracer() {
    if let Some(tp) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        let _ = tp.shutdown();
    }
}
