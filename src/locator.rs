use url::Url;

use crate::error::ToolError;

const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Check that a locator is an http(s) URL with a host.
///
/// Returns the input unchanged on success so it can be passed straight on.
pub fn validate_locator(locator: &str) -> Result<&str, ToolError> {
    let invalid = |reason: String| ToolError::InvalidLocator {
        locator: locator.to_string(),
        reason,
    };

    let url = Url::parse(locator).map_err(|e| invalid(e.to_string()))?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        log::warn!("[locator] rejected_scheme: locator={} scheme={}", locator, url.scheme());
        return Err(invalid(format!("scheme '{}' is not allowed", url.scheme())));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(locator),
        _ => Err(invalid("missing host".to_string())),
    }
}
