use std::sync::Arc;
use std::thread;

use log::error;
use tokio::sync::oneshot;

use crate::pipeline::render_pdf;
use crate::session::Renderer;
use crate::{Error, RenderConfig, RenderRequest, Result};

/// An async-friendly PDF service backed by one worker thread per render.
///
/// The browser session is driven synchronously, so each call to
/// [`PdfService::render`] runs the whole pipeline on a dedicated thread and
/// awaits the outcome. Renders share nothing but the renderer factory.
pub struct PdfService<R: Renderer> {
    renderer: Arc<R>,
    request: RenderRequest,
    config: RenderConfig,
}

impl<R: Renderer> Clone for PdfService<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            request: self.request.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R: Renderer + 'static> PdfService<R> {
    /// Build a service rendering `request` with `config`.
    pub fn new(renderer: R, request: RenderRequest, config: RenderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            renderer: Arc::new(renderer),
            request,
            config,
        })
    }

    pub fn request(&self) -> &RenderRequest {
        &self.request
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render the configured document to PDF bytes.
    pub async fn render(&self) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        let renderer = Arc::clone(&self.renderer);
        let request = self.request.clone();
        let config = self.config.clone();

        thread::Builder::new()
            .name("pdf-render".into())
            .spawn(move || {
                let res = render_pdf(renderer.as_ref(), &request, &config);
                if let Err(e) = &res {
                    error!("PDF render failed at {} stage: {}", e.stage(), e);
                }
                let _ = tx.send(res);
            })
            .map_err(|e| Error::Other(format!("Failed to spawn render worker: {}", e)))?;

        rx.await
            .map_err(|e| Error::Other(format!("Render worker canceled: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{FailurePoint, RecordingRenderer, PLACEHOLDER_PDF};
    use crate::DocumentDimensions;

    fn service(renderer: RecordingRenderer) -> PdfService<RecordingRenderer> {
        PdfService::new(
            renderer,
            RenderRequest::parse("http://localhost:8080").unwrap(),
            RenderConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn render_returns_generated_bytes() {
        let renderer = RecordingRenderer::new(DocumentDimensions { width: 1200, height: 3000 });
        let svc = service(renderer.clone());
        assert_eq!(svc.render().await.unwrap(), PLACEHOLDER_PDF.to_vec());
        assert_eq!(renderer.log().leaked(), 0);
    }

    #[tokio::test]
    async fn concurrent_renders_use_separate_sessions() {
        let renderer = RecordingRenderer::new(DocumentDimensions { width: 1200, height: 3000 });
        let svc = service(renderer.clone());
        let other = svc.clone();
        let (a, b) = tokio::join!(svc.render(), other.render());
        assert!(a.is_ok() && b.is_ok());
        let log = renderer.log();
        assert_eq!(log.opened, 2);
        assert_eq!(log.closed, 2);
    }

    #[tokio::test]
    async fn render_errors_propagate() {
        let renderer = RecordingRenderer::new(DocumentDimensions::default())
            .failing_at(FailurePoint::Generate);
        let err = service(renderer).render().await.unwrap_err();
        assert!(matches!(err, Error::GenerationFailure(_)));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let mut config = RenderConfig::default();
        config.strategy.max_tall_height = 0;
        let res = PdfService::new(
            RecordingRenderer::new(DocumentDimensions::default()),
            RenderRequest::parse("http://localhost:8080").unwrap(),
            config,
        );
        assert!(res.is_err());
    }
}
