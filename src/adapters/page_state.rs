use crate::domain::ports::PageStateSource;
use crate::utils::error::Result;
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Page state already in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticPageState {
    document: Option<Value>,
}

impl StaticPageState {
    pub fn new(document: Value) -> Self {
        Self {
            document: Some(document),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl PageStateSource for StaticPageState {
    fn load(&self) -> Result<Option<Value>> {
        Ok(self.document.clone())
    }
}

/// A saved page: either the raw JSON document or the HTML that embeds it.
#[derive(Debug, Clone)]
pub struct FilePageState {
    path: PathBuf,
}

impl FilePageState {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PageStateSource for FilePageState {
    fn load(&self) -> Result<Option<Value>> {
        let content = std::fs::read_to_string(&self.path)?;
        parse_page_state(&content)
    }
}

pub fn parse_page_state(content: &str) -> Result<Option<Value>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('{') {
        return Ok(Some(serde_json::from_str(trimmed)?));
    }
    extract_next_data(content)
}

/// Payload of the `<script id="__NEXT_DATA__">` tag, if the page has one.
pub fn extract_next_data(html: &str) -> Result<Option<Value>> {
    static NEXT_DATA: OnceLock<Regex> = OnceLock::new();
    let re = NEXT_DATA.get_or_init(|| {
        Regex::new(r#"(?is)<script[^>]*\bid\s*=\s*["']__NEXT_DATA__["'][^>]*>(.*?)</script>"#)
            .expect("next data pattern is valid")
    });

    match re.captures(html) {
        Some(caps) => Ok(Some(serde_json::from_str(caps[1].trim())?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::MarkerError;

    #[test]
    fn test_extract_from_html() {
        let html = r#"<html><head></head><body>
<script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"gqlCache":{}}}}</script>
</body></html>"#;

        let document = extract_next_data(html).unwrap().unwrap();
        assert!(document.pointer("/props/pageProps/gqlCache").is_some());
    }

    #[test]
    fn test_html_without_page_state() {
        assert!(extract_next_data("<html><body>nothing</body></html>").unwrap().is_none());
    }

    #[test]
    fn test_plain_json_and_broken_payloads() {
        let document = parse_page_state("  {\"props\": {}}").unwrap().unwrap();
        assert!(document.get("props").is_some());

        let err = parse_page_state(r#"<script id="__NEXT_DATA__">{broken</script>"#).unwrap_err();
        assert!(matches!(err, MarkerError::SerializationError(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = FilePageState::new("/definitely/not/here.html");
        assert!(matches!(source.load(), Err(MarkerError::IoError(_))));
    }
}
