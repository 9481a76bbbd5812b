//! Pipeline tests against the recording renderer

use tallpdf::recording::{FailurePoint, RecordingRenderer, PLACEHOLDER_PDF};
use tallpdf::{render_pdf, DocumentDimensions, Error, PaperFormat, PdfStrategy, RenderConfig, RenderRequest};

fn request() -> RenderRequest {
    RenderRequest::parse("http://localhost:8080").expect("valid base URL")
}

fn dims(width: u32, height: u32) -> DocumentDimensions {
    DocumentDimensions { width, height }
}

#[test]
fn test_short_document_prints_one_tall_page() {
    let renderer = RecordingRenderer::new(dims(1200, 8000));
    let pdf = render_pdf(&renderer, &request(), &RenderConfig::default()).expect("render");

    assert_eq!(pdf, PLACEHOLDER_PDF.to_vec());
    assert_eq!(
        renderer.log().generated,
        vec![PdfStrategy::TallSinglePage { width: 1200, height: 8000 }]
    );
}

#[test]
fn test_document_at_ceiling_is_still_single_page() {
    let renderer = RecordingRenderer::new(dims(900, 45_000));
    render_pdf(&renderer, &request(), &RenderConfig::default()).expect("render");

    assert_eq!(
        renderer.log().generated,
        vec![PdfStrategy::TallSinglePage { width: 1200, height: 45_000 }]
    );
}

#[test]
fn test_oversized_document_falls_back_to_pagination() {
    let renderer = RecordingRenderer::new(dims(1200, 60_000));
    render_pdf(&renderer, &request(), &RenderConfig::default()).expect("render");

    let generated = renderer.log().generated;
    assert_eq!(generated.len(), 1);
    match generated[0] {
        PdfStrategy::PaginatedFallback { format, margins } => {
            assert_eq!(format, PaperFormat::A4);
            assert!(margins.all_positive());
        }
        other => panic!("expected paginated fallback, got {:?}", other),
    }
}

#[test]
fn test_success_closes_session_exactly_once() {
    let renderer = RecordingRenderer::new(dims(1200, 8000));
    render_pdf(&renderer, &request(), &RenderConfig::default()).expect("render");

    let log = renderer.log();
    assert_eq!(log.opened, 1);
    assert_eq!(log.closed, 1);
}

#[test]
fn test_every_failure_point_tears_down_without_leaks() {
    let cases = [
        (FailurePoint::Launch, "launch", 0),
        (FailurePoint::Navigate, "navigate", 1),
        (FailurePoint::Measure, "measure", 1),
        (FailurePoint::Generate, "generate", 1),
    ];

    for (point, stage, sessions) in cases {
        let renderer = RecordingRenderer::new(dims(1200, 8000)).failing_at(point);
        let err = render_pdf(&renderer, &request(), &RenderConfig::default())
            .expect_err("injected failure must surface");

        assert_eq!(err.stage(), stage, "{:?}", point);
        assert!(!err.to_string().is_empty());

        let log = renderer.log();
        assert_eq!(log.opened, sessions, "{:?}", point);
        assert_eq!(log.closed, sessions, "{:?}", point);
        assert_eq!(log.leaked(), 0, "{:?}", point);
    }
}

#[test]
fn test_failed_measurement_never_generates() {
    for point in [FailurePoint::Navigate, FailurePoint::Measure] {
        let renderer = RecordingRenderer::new(dims(1200, 8000)).failing_at(point);
        let _ = render_pdf(&renderer, &request(), &RenderConfig::default());
        assert!(renderer.log().generated.is_empty(), "{:?}", point);
    }
}

#[test]
fn test_generation_failure_is_not_retried() {
    let renderer = RecordingRenderer::new(dims(1200, 8000)).failing_at(FailurePoint::Generate);
    let err = render_pdf(&renderer, &request(), &RenderConfig::default()).unwrap_err();

    assert!(matches!(err, Error::GenerationFailure(_)));
    assert_eq!(renderer.log().generated.len(), 1);
    assert_eq!(renderer.log().measured_urls.len(), 1);
}

#[test]
fn test_custom_ceiling_changes_the_boundary() {
    let mut config = RenderConfig::default();
    config.strategy.max_tall_height = 5000;

    let renderer = RecordingRenderer::new(dims(1200, 8000));
    render_pdf(&renderer, &request(), &config).expect("render");
    assert!(matches!(
        renderer.log().generated[0],
        PdfStrategy::PaginatedFallback { .. }
    ));
}
