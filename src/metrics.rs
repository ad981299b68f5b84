//! Prometheus metrics for the account manager.
//!
//! Exposes:
//! - `tg_accounts_incoming_messages_total` (counter per account)
//! - `tg_accounts_llm_replies_total` (counter with status)
//! - `tg_accounts_llm_request_duration_seconds` (histogram)
//! - `tg_accounts_media_forwards_total` (counter with status)
//! - `tg_accounts_active_accounts` (gauge)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static INCOMING_MESSAGES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tg_accounts_incoming_messages_total",
        "Incoming messages seen per account",
        &["account"]
    )
    .expect("failed to register incoming messages counter")
});

static LLM_REPLIES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tg_accounts_llm_replies_total",
        "LLM auto-replies by status",
        &["account", "status"]
    )
    .expect("failed to register llm replies counter")
});

static LLM_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // 100ms up to ~100s
    let buckets =
        prometheus::exponential_buckets(0.1, 2.0, 11).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "tg_accounts_llm_request_duration_seconds",
        "LLM request duration in seconds",
        &["account"],
        buckets
    )
    .expect("failed to register llm duration histogram")
});

static MEDIA_FORWARDS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tg_accounts_media_forwards_total",
        "Media forwards to the archive channel by status",
        &["account", "status"]
    )
    .expect("failed to register media forwards counter")
});

static ACTIVE_ACCOUNTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "tg_accounts_active_accounts",
        "Accounts currently listening for updates"
    )
    .expect("failed to register active accounts gauge")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&INCOMING_MESSAGES);
    Lazy::force(&LLM_REPLIES);
    Lazy::force(&LLM_DURATION);
    Lazy::force(&MEDIA_FORWARDS);
    Lazy::force(&ACTIVE_ACCOUNTS);
}

fn status_label(success: bool) -> &'static str {
    if success {
        "ok"
    } else {
        "error"
    }
}

pub fn record_incoming(account: &str) {
    INCOMING_MESSAGES.with_label_values(&[account]).inc();
}

pub fn record_llm_reply(account: &str, duration: Duration, success: bool) {
    LLM_DURATION
        .with_label_values(&[account])
        .observe(duration.as_secs_f64());
    LLM_REPLIES
        .with_label_values(&[account, status_label(success)])
        .inc();
}

pub fn record_media_forward(account: &str, success: bool) {
    MEDIA_FORWARDS
        .with_label_values(&[account, status_label(success)])
        .inc();
}

pub fn set_active_accounts(count: usize) {
    ACTIVE_ACCOUNTS.set(i64::try_from(count).unwrap_or(i64::MAX));
}

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    init_collectors();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "encode error",
        ));
    }

    let mut response = text_response(StatusCode::OK, buffer);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(prometheus::TEXT_FORMAT));
    Ok(response)
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(text_response(StatusCode::NOT_FOUND, Bytes::new())),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
