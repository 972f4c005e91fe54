//! Request routing for the exporter's HTTP surface

use crate::scrape::Scraper;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, error};
use vcd_metrics::ExporterMetrics;

/// Content type of the Prometheus text exposition format
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

const PLAIN_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Maps request paths to exporter endpoints
pub struct Router {
    scraper: Arc<Scraper>,
    metrics: ExporterMetrics,
}

impl Router {
    pub fn new(scraper: Arc<Scraper>, metrics: ExporterMetrics) -> Self {
        Self { scraper, metrics }
    }

    pub async fn handle(&self, method: &Method, path: &str) -> Response<Full<Bytes>> {
        if method != Method::GET {
            return text_response(StatusCode::NOT_FOUND, PLAIN_CONTENT_TYPE, "Not Found\n");
        }

        match path {
            "/metrics" => self.scrape().await,
            "/health" => text_response(StatusCode::OK, PLAIN_CONTENT_TYPE, "OK"),
            "/exporter/metrics" => match self.metrics.gather() {
                Ok(text) => text_response(StatusCode::OK, EXPOSITION_CONTENT_TYPE, text),
                Err(e) => {
                    error!("Failed to gather exporter metrics: {}", e);
                    text_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        PLAIN_CONTENT_TYPE,
                        format!("{}\n", e),
                    )
                }
            },
            _ => {
                debug!("No route for {}", path);
                text_response(StatusCode::NOT_FOUND, PLAIN_CONTENT_TYPE, "Not Found\n")
            }
        }
    }

    async fn scrape(&self) -> Response<Full<Bytes>> {
        match self.scraper.scrape().await {
            Ok(text) => text_response(StatusCode::OK, EXPOSITION_CONTENT_TYPE, text),
            Err(e) => {
                error!("Scrape failed: {}", e);
                text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    PLAIN_CONTENT_TYPE,
                    format!("{}\n", e),
                )
            }
        }
    }
}

fn text_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
