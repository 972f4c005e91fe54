use anyhow::{Context, Result};
use http_body_util::Full;
use hyper::{body::Bytes, server::conn::http1, service::service_fn, Request, Response};
use hyper_util::rt::tokio::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vcd_client::transport::build_http_client;
use vcd_client::{HttpTokenRefresher, ReqwestTransport};
use vcd_core::config::{ENV_API_TOKEN, ENV_URL};
use vcd_core::{ExporterConfig, TokenProvider};
use vcd_metrics::ExporterMetrics;

mod router;
mod scrape;

use router::Router;
use scrape::Scraper;

const ENV_LOG_FORMAT: &str = "EXPORTER_LOG_FORMAT";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting vcd-exporter...");

    let config = ExporterConfig::from_env().context("Invalid exporter configuration")?;
    if config.base_url.is_none() {
        warn!("{} is not set; scrapes will fail until it is configured", ENV_URL);
    }
    if config.refresh_token.is_none() {
        warn!("{} is not set; scrapes will fail until it is configured", ENV_API_TOKEN);
    }
    info!(
        "API version {}, page size {}, detail concurrency {}, page cap {}",
        config.api_version, config.page_size, config.detail_concurrency, config.max_pages
    );

    let http_client = build_http_client(&config).context("Failed to build HTTP client")?;
    let transport = Arc::new(ReqwestTransport::new(http_client.clone()));
    let refresher = Arc::new(HttpTokenRefresher::new(http_client, &config));
    let tokens = Arc::new(TokenProvider::new(refresher));
    info!("Token provider initialized");

    let metrics = ExporterMetrics::new().context("Failed to create exporter metrics")?;

    let listen_port = config.listen_port;
    let scraper = Arc::new(Scraper::new(config, transport, tokens, metrics.clone()));
    let router = Arc::new(Router::new(scraper, metrics));

    let addr: SocketAddr = ([0, 0, 0, 0], listen_port).into();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Error accepting connection: {}", e);
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let router = router.clone();

                tokio::task::spawn(async move {
                    let service = service_fn(move |req| handle_request(req, router.clone()));

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("Error serving HTTP connection from {}: {}", peer_addr, e);
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, exiting...");
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(ENV_LOG_FORMAT)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    router: Arc<Router>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("{} {}", method, path);

    let response = router.handle(&method, &path).await;
    debug!("{} {} -> {}", method, path, response.status().as_u16());
    Ok(response)
}
