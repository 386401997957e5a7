use std::net::SocketAddr;

pub const LOG_ENV: &str = "TICKSTORE_LOG";

/// `TICKSTORE_LOG` wins over `--log-level` so operators can widen filters without editing
/// service units.
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<(), String> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    match log_format.trim().to_lowercase().as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .try_init()
            .map_err(|err| format!("failed to install tracing subscriber: {err}")),
        "text" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .try_init()
            .map_err(|err| format!("failed to install tracing subscriber: {err}")),
        other => Err(format!(
            "unsupported --log-format {other:?} (expected text or json)"
        )),
    }
}

#[cfg(feature = "prometheus")]
pub fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(raw) = metrics_addr else {
        return Ok(None);
    };
    let addr = parse_metrics_addr(raw)?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to install prometheus exporter: {err}"))?;

    tracing::info!(metrics_addr = %addr, "prometheus metrics exporter enabled");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    if metrics_addr.is_some() {
        return Err("metrics exporter requires tickstore-ingest feature `prometheus`".to_string());
    }
    Ok(None)
}

#[cfg_attr(not(feature = "prometheus"), allow(dead_code))]
fn parse_metrics_addr(raw: &str) -> Result<SocketAddr, String> {
    raw.trim()
        .parse()
        .map_err(|err| format!("invalid --metrics-addr (expected host:port): {err}"))
}
