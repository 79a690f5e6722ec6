//! URL checks for incoming requests

use crate::error::GrabError;
use url::Url;

/// Check that a source URL is worth handing to the inspector.
///
/// Only emptiness and basic shape are checked here; whether the site is
/// supported is the inspector's call.
pub fn validate_source_url(url: &str) -> Result<Url, GrabError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(GrabError::InvalidRequest("No URL provided".to_string()));
    }

    let parsed = Url::parse(url)
        .map_err(|e| GrabError::InvalidRequest(format!("Invalid URL {:?}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(GrabError::InvalidRequest(format!(
            "Unsupported URL {:?}: expected an http(s) page URL",
            url
        ))),
    }
}
