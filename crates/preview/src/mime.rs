use std::path::Path;

/// Content type used for any extension missing from [`MIME_TYPES`].
pub const FALLBACK_MIME: &str = "application/octet-stream";

pub const MIME_TYPES: &[(&str, &str)] = &[
    ("css", "text/css"),
    ("html", "text/html"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain"),
    ("webp", "image/webp"),
];

pub fn content_type_for(path: &Path) -> &'static str {
    let Some(ext) = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
    else {
        return FALLBACK_MIME;
    };
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(FALLBACK_MIME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions_case_insensitively() {
        assert_eq!(content_type_for(Path::new("assets/app.JS")), "application/javascript");
        assert_eq!(content_type_for(Path::new("index.html")), "text/html");
        assert_eq!(content_type_for(Path::new("thumbs/a.webp")), "image/webp");
    }

    #[test]
    fn unknown_or_missing_extension_is_binary() {
        assert_eq!(content_type_for(Path::new("model.glb")), FALLBACK_MIME);
        assert_eq!(content_type_for(Path::new("LICENSE")), FALLBACK_MIME);
    }
}
