//! Request adapter
//!
//! Maps a request line to a [`Reply`] independent of the HTTP server, so the
//! whole adapter can be exercised with a fake renderer.
//!
//! | Route | Reply |
//! |-------|-------|
//! | `GET /health` | `200 {"ok": true}` |
//! | `GET /api/pdf?locality=<name>` | `200` PDF download, or `500 {"error": "pdf_render_failed", ...}` |
//! | `OPTIONS` on either path | `204` CORS preflight |

use log::{error, info};
use serde::Serialize;

use crate::filename::content_disposition;
use crate::service::PdfService;
use crate::session::Renderer;

/// Stable error code for failed renders
pub const RENDER_FAILED: &str = "pdf_render_failed";

const HEALTH_PATH: &str = "/health";
const PDF_PATH: &str = "/api/pdf";

/// Liveness check body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Status, headers and body produced for one request
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    fn new(status: u16) -> Self {
        Self {
            status,
            headers: vec![("Access-Control-Allow-Origin".into(), "*".into())],
            body: Vec::new(),
        }
    }

    fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let mut reply = Self::new(status).with_header("Content-Type", "application/json");
        reply.body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        reply
    }

    fn error(status: u16, code: &'static str, message: Option<String>) -> Self {
        Self::json(status, &ErrorResponse { error: code, message })
    }

    /// First header with `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body parsed as JSON, if it is JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Route one request.
pub async fn dispatch<R: Renderer + 'static>(service: &PdfService<R>, method: &str, raw_url: &str) -> Reply {
    let (path, query) = raw_url.split_once('?').unwrap_or((raw_url, ""));
    let path = match path.trim_end_matches('/') {
        "" => "/",
        p => p,
    };

    if path != HEALTH_PATH && path != PDF_PATH {
        return Reply::error(404, "not_found", None);
    }

    if method.eq_ignore_ascii_case("OPTIONS") {
        return Reply::new(204)
            .with_header("Access-Control-Allow-Methods", "GET, OPTIONS")
            .with_header("Access-Control-Allow-Headers", "*");
    }
    if !method.eq_ignore_ascii_case("GET") {
        return Reply::error(405, "method_not_allowed", None).with_header("Allow", "GET, OPTIONS");
    }

    match path {
        HEALTH_PATH => Reply::json(200, &HealthResponse { ok: true }),
        _ => render(service, &locality_param(query)).await,
    }
}

/// The `locality` query parameter, empty when absent.
fn locality_param(query: &str) -> String {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "locality")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

async fn render<R: Renderer + 'static>(service: &PdfService<R>, locality: &str) -> Reply {
    match service.render().await {
        Ok(pdf) => {
            let disposition = content_disposition(locality);
            info!("serving {} byte PDF ({})", pdf.len(), disposition);
            let mut reply = Reply::new(200)
                .with_header("Content-Type", "application/pdf")
                .with_header("Content-Disposition", disposition);
            reply.body = pdf;
            reply
        }
        Err(e) => {
            error!("PDF render failed: {}", e);
            Reply::error(500, RENDER_FAILED, Some(e.to_string()))
        }
    }
}
