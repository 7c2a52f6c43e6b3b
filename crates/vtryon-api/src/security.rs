//! Security utilities for input validation.
//!
//! This module provides:
//! - Garment URL validation (SSRF protection)
//! - Filename validation for user images

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;
use url::Url;

use vtryon_storage::{filename_from_public_url, is_safe_filename};

/// Maximum URL length to prevent DoS attacks.
const MAX_URL_LENGTH: usize = 2048;

/// Blocked URL patterns (internal networks and metadata endpoints).
static BLOCKED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^https?://127\.",
        r"^https?://localhost",
        r"^https?://0\.0\.0\.0",
        r"^https?://10\.",
        r"^https?://172\.(1[6-9]|2[0-9]|3[0-1])\.",
        r"^https?://192\.168\.",
        r"^https?://169\.254\.",
        r"^https?://\[::1\]",
        r"^https?://\[fd",
        r"^https?://\[fe80",
        r"^https?://metadata\.",
        r"^https?://metadata\.google\.internal",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Result of URL validation.
#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationResult {
    /// URL is valid and allowed.
    Valid(String),
    /// URL is malformed or uses an unsupported protocol.
    Invalid(String),
    /// URL matches a blocked pattern (e.g., internal IPs).
    Blocked(String),
    /// URL exceeds maximum length.
    TooLong,
}

impl UrlValidationResult {
    /// Convert to Result for easy error handling.
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Self::Valid(url) => Ok(url),
            Self::Invalid(msg) | Self::Blocked(msg) => Err(msg),
            Self::TooLong => Err(format!("URL exceeds maximum length of {} characters", MAX_URL_LENGTH)),
        }
    }
}

/// Validate a garment image URL.
///
/// Accepts `/uploads/<name>` paths and public `http(s)` URLs. Internal hosts
/// are rejected unless `allow_private_hosts` is set (development only).
pub fn validate_garment_url(url: &str, allow_private_hosts: bool) -> UrlValidationResult {
    if url.len() > MAX_URL_LENGTH {
        return UrlValidationResult::TooLong;
    }

    let url = url.trim();
    if url.is_empty() {
        return UrlValidationResult::Invalid("URL cannot be empty".to_string());
    }

    if url.starts_with('/') {
        return match filename_from_public_url(url) {
            Some(_) => UrlValidationResult::Valid(url.to_string()),
            None => UrlValidationResult::Invalid(format!("Invalid local image path '{}'", url)),
        };
    }

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return UrlValidationResult::Invalid(format!("Invalid URL format: {}", e)),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return UrlValidationResult::Invalid(format!(
                "Invalid protocol '{}'. Only HTTP and HTTPS are allowed.",
                scheme
            ))
        }
    }

    if parsed.host_str().is_none() {
        return UrlValidationResult::Invalid("URL must have a valid host".to_string());
    }

    if !allow_private_hosts {
        let lowered = url.to_ascii_lowercase();
        if BLOCKED_PATTERNS.iter().any(|p| p.is_match(&lowered)) {
            warn!(url = %url, "Blocked garment URL targeting internal host");
            return UrlValidationResult::Blocked(
                "URL appears to target an internal or restricted endpoint".to_string(),
            );
        }
    }

    UrlValidationResult::Valid(url.to_string())
}

/// Validate the filename of an uploaded user image.
pub fn validate_user_image_filename(name: &str) -> Result<&str, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("userImageFilename is required".to_string());
    }
    if !is_safe_filename(name) {
        return Err(format!("Invalid userImageFilename '{}'", name));
    }
    Ok(name)
}

/// Whether a peer address is the local machine.
pub fn is_loopback(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_urls_allowed() {
        assert!(matches!(
            validate_garment_url("https://cdn.shop.com/shirt.png", false),
            UrlValidationResult::Valid(_)
        ));
    }

    #[test]
    fn test_local_upload_paths() {
        assert!(matches!(
            validate_garment_url("/uploads/shirt.png", false),
            UrlValidationResult::Valid(_)
        ));
        assert!(matches!(
            validate_garment_url("/uploads/../app.env", false),
            UrlValidationResult::Invalid(_)
        ));
        assert!(matches!(
            validate_garment_url("/etc/passwd", false),
            UrlValidationResult::Invalid(_)
        ));
    }

    #[test]
    fn test_internal_hosts_blocked_outside_development() {
        for url in [
            "http://127.0.0.1:8080/x.png",
            "http://localhost/x.png",
            "http://169.254.169.254/latest/meta-data",
            "http://192.168.1.10/x.png",
            "http://LOCALHOST/x.png",
        ] {
            assert!(
                matches!(validate_garment_url(url, false), UrlValidationResult::Blocked(_)),
                "{} should be blocked",
                url
            );
        }
        assert!(matches!(
            validate_garment_url("http://127.0.0.1:8080/x.png", true),
            UrlValidationResult::Valid(_)
        ));
    }

    #[test]
    fn test_bad_urls() {
        assert!(matches!(validate_garment_url("", false), UrlValidationResult::Invalid(_)));
        assert!(matches!(validate_garment_url("ftp://x.com/a.png", false), UrlValidationResult::Invalid(_)));
        assert!(matches!(validate_garment_url("not a url", false), UrlValidationResult::Invalid(_)));
        let long = format!("https://x.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert_eq!(validate_garment_url(&long, false), UrlValidationResult::TooLong);
    }

    #[test]
    fn test_user_image_filename() {
        assert_eq!(validate_user_image_filename(" me.jpg "), Ok("me.jpg"));
        assert!(validate_user_image_filename("").is_err());
        assert!(validate_user_image_filename("../../etc/passwd").is_err());
    }

    #[test]
    fn test_loopback() {
        assert!(is_loopback(&"127.0.0.1".parse().unwrap()));
        assert!(is_loopback(&"::1".parse().unwrap()));
        assert!(is_loopback(&"::ffff:127.0.0.1".parse().unwrap()));
        assert!(!is_loopback(&"10.0.0.2".parse().unwrap()));
    }
}
