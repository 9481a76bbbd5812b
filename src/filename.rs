//! Download filename for a rendered report

/// Used when the locality is missing or sanitizes to nothing
pub const DEFAULT_LOCALITY: &str = "Locality";

/// Keep ASCII word characters, spaces and hyphens, then trim.
///
/// Other whitespace (tabs, newlines) becomes a plain space so the result can
/// go into a header value. Sanitizing an already sanitized string returns it
/// unchanged. Input with no allowed characters yields [`DEFAULT_LOCALITY`].
pub fn sanitize_locality(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' ' {
                Some(c)
            } else if c.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .collect();

    let trimmed = kept.trim();
    if trimmed.is_empty() {
        DEFAULT_LOCALITY.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `"<Locality> Locality Report.pdf"` for a raw locality.
pub fn report_filename(raw_locality: &str) -> String {
    format!("{} Locality Report.pdf", sanitize_locality(raw_locality))
}

/// `Content-Disposition` value that downloads the report.
pub fn content_disposition(raw_locality: &str) -> String {
    format!("attachment; filename=\"{}\"", report_filename(raw_locality))
}
