//! Telemetry endpoint URL.
//!
//! The endpoint lives at `{origin}/api/ws/plugins/telemetry?token={jwt}`. The
//! scheme follows the origin: `https` becomes `wss`, `http` becomes `ws`.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Path of the telemetry plugin WebSocket.
pub const TELEMETRY_PATH: &str = "/api/ws/plugins/telemetry";

// ============================================================================
// Functions
// ============================================================================

/// Parses and validates an origin (`https://host:port`).
///
/// # Errors
///
/// - [`Error::InvalidUrl`] if `origin` does not parse
/// - [`Error::Config`] if the scheme is not http, https, ws or wss
pub fn parse_origin(origin: &str) -> Result<Url> {
    let url = Url::parse(origin)?;

    match url.scheme() {
        "http" | "https" | "ws" | "wss" => {}
        other => {
            return Err(Error::config(format!(
                "Unsupported origin scheme '{other}', expected http(s) or ws(s)"
            )));
        }
    }

    if url.host_str().is_none() {
        return Err(Error::config(format!("Origin has no host: {origin}")));
    }

    Ok(url)
}

/// Builds the telemetry WebSocket URL for `origin` carrying `token`.
///
/// Any path, query or fragment on the origin is discarded.
///
/// # Errors
///
/// Returns [`Error::Config`] if the origin scheme cannot be upgraded.
pub fn telemetry_url(origin: &Url, token: &str) -> Result<Url> {
    let scheme = match origin.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::config(format!(
                "Cannot derive WebSocket scheme from '{other}'"
            )));
        }
    };

    let mut url = origin.clone();
    if url.set_scheme(scheme).is_err() {
        return Err(Error::config(format!("Cannot switch {origin} to {scheme}")));
    }
    url.set_path(TELEMETRY_PATH);
    url.set_fragment(None);
    url.set_query(None);
    url.query_pairs_mut().append_pair("token", token);

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_origin_upgrades_to_wss() {
        let origin = parse_origin("https://iot.example.com:8443").unwrap();
        let url = telemetry_url(&origin, "abc").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://iot.example.com:8443/api/ws/plugins/telemetry?token=abc"
        );
    }

    #[test]
    fn test_plain_origin_uses_ws_and_drops_path() {
        let origin = parse_origin("http://localhost:8080/dashboards?x=1#top").unwrap();
        let url = telemetry_url(&origin, "abc").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:8080/api/ws/plugins/telemetry?token=abc"
        );
    }

    #[test]
    fn test_token_is_encoded() {
        let origin = parse_origin("ws://localhost").unwrap();
        let url = telemetry_url(&origin, "a b&c").unwrap();
        assert_eq!(url.query(), Some("token=a+b%26c"));
    }

    #[test]
    fn test_rejects_other_schemes() {
        let err = parse_origin("ftp://example.com").unwrap_err();
        assert!(err.is_config_error());
        assert!(parse_origin("no scheme").is_err());
    }
}
