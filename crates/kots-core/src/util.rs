//! Small helpers shared across the render pipeline

/// Whether `s` is an absolute URL with a host (`https://example.com/x`)
pub fn is_url(s: &str) -> bool {
    url::Url::parse(s).is_ok_and(|url| url.has_host())
}
