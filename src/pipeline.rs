//! The render pipeline: open → measure → select → generate → teardown

use log::{debug, info, warn};

use crate::session::{RenderSession, Renderer, SessionGuard};
use crate::{PdfStrategy, RenderConfig, RenderRequest, Result};

/// Render `request` to PDF bytes with a fresh session from `renderer`.
///
/// Each stage runs strictly after the previous one. The session is closed on
/// every exit path; a failure at any stage aborts the render without retry.
/// A close failure after a successful print is logged and the bytes are
/// still returned.
pub fn render_pdf<R: Renderer>(
    renderer: &R,
    request: &RenderRequest,
    config: &RenderConfig,
) -> Result<Vec<u8>> {
    config.validate()?;
    let url = request.target_url();

    debug!("opening render session for {}", url);
    let mut guard = SessionGuard::new(renderer.open(config)?);

    let dims = guard.session()?.measure(&url, &config.wait)?;
    let strategy = PdfStrategy::select(dims, &config.strategy);
    info!(
        "measured {}x{}px, printing as {}",
        dims.width, dims.height, strategy
    );

    let pdf = guard.session()?.generate(&strategy)?;

    if let Err(e) = guard.close() {
        warn!("Render succeeded but session teardown failed: {}", e);
    }

    info!("rendered {} ({} bytes)", url, pdf.len());
    Ok(pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{FailurePoint, RecordingRenderer};
    use crate::{DocumentDimensions, Error, Viewport};

    fn request() -> RenderRequest {
        RenderRequest::parse("http://localhost:8080").unwrap()
    }

    #[test]
    fn invalid_config_never_opens_a_session() {
        let renderer = RecordingRenderer::new(DocumentDimensions { width: 1200, height: 800 });
        let config = RenderConfig {
            viewport: Viewport { width: 0, height: 0 },
            ..Default::default()
        };
        let err = render_pdf(&renderer, &request(), &config).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert_eq!(renderer.log().opened, 0);
    }

    #[test]
    fn measures_the_print_mode_url() {
        let renderer = RecordingRenderer::new(DocumentDimensions { width: 1200, height: 800 });
        render_pdf(&renderer, &request(), &RenderConfig::default()).unwrap();
        assert_eq!(
            renderer.log().measured_urls,
            vec!["http://localhost:8080/?print=1&pdf=1".to_string()]
        );
    }

    #[test]
    fn close_failure_after_print_still_returns_bytes() {
        let renderer = RecordingRenderer::new(DocumentDimensions { width: 1200, height: 800 })
            .failing_at(FailurePoint::Close);
        let pdf = render_pdf(&renderer, &request(), &RenderConfig::default()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(renderer.log().closed, 1);
    }
}
