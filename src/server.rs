//! HTTP listener for the request adapter (uses the `tiny_http` crate)

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tiny_http::{Header, Request, Response, Server, StatusCode};

use crate::routes::{self, Reply};
use crate::service::PdfService;
use crate::session::Renderer;
use crate::{Error, Result};

/// Serves [`routes::dispatch`] over HTTP.
///
/// Accepting blocks, so it runs on tokio's blocking pool; each request is then
/// handled on its own task so a slow render never stalls `/health`.
pub struct PdfServer<R: Renderer> {
    server: Arc<Server>,
    stopping: Arc<AtomicBool>,
    service: PdfService<R>,
}

/// Stops a running [`PdfServer`] from another task or a signal handler.
#[derive(Clone)]
pub struct ShutdownHandle {
    server: Arc<Server>,
    stopping: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.server.unblock();
    }
}

impl<R: Renderer + 'static> PdfServer<R> {
    /// Bind to `addr` (`host:port`; port 0 picks a free port).
    pub fn bind(addr: &str, service: PdfService<R>) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| Error::Other(format!("Failed to bind {}: {}", addr, e)))?;
        Ok(Self {
            server: Arc::new(server),
            stopping: Arc::new(AtomicBool::new(false)),
            service,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            server: Arc::clone(&self.server),
            stopping: Arc::clone(&self.stopping),
        }
    }

    /// Accept requests until [`ShutdownHandle::shutdown`] is called.
    pub async fn run(self) -> Result<()> {
        if let Some(addr) = self.local_addr() {
            info!("PDF server listening on http://{}", addr);
        }
        info!("base document URL = {}", self.service.request().base_url);

        loop {
            let server = Arc::clone(&self.server);
            let accepted = tokio::task::spawn_blocking(move || server.recv())
                .await
                .map_err(|e| Error::Other(format!("Accept task failed: {}", e)))?;

            let request = match accepted {
                Ok(request) => request,
                Err(_) if self.stopping.load(Ordering::SeqCst) => break,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            tokio::spawn(handle(self.service.clone(), request));
        }

        info!("PDF server stopped");
        Ok(())
    }
}

async fn handle<R: Renderer + 'static>(service: PdfService<R>, request: Request) {
    let method = request.method().as_str().to_string();
    let url = request.url().to_string();

    let reply = routes::dispatch(&service, &method, &url).await;
    debug!("{} {} -> {}", method, url, reply.status);

    let sent = tokio::task::spawn_blocking(move || request.respond(into_response(reply))).await;
    match sent {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to send response for {}: {}", url, e),
        Err(e) => warn!("Response task for {} failed: {}", url, e),
    }
}

fn into_response(reply: Reply) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_data(reply.body).with_status_code(StatusCode(reply.status));
    for (name, value) in &reply.headers {
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => response.add_header(header),
            Err(_) => warn!("Dropping invalid response header {}", name),
        }
    }
    response
}
