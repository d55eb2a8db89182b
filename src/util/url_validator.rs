use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// The URL embeds credentials (`user:pass@host`).
    #[error("Credentials in URL are not allowed")]
    EmbeddedCredentials,
}

/// Validates a backend (or proxy target) base URL.
///
/// Backends commonly run on localhost or a private network, so unlike
/// [`validate_url_for_open`] this accepts any host. It still rejects
/// non-HTTP(S) schemes, host-less URLs and embedded credentials.
///
/// # Examples
///
/// ```
/// use feedboard::util::validate_backend_url;
///
/// assert!(validate_backend_url("http://localhost:1300").is_ok());
/// assert!(validate_backend_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_backend_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(UrlValidationError::EmbeddedCredentials);
    }

    Ok(url)
}

/// Validates an item link before handing it to the system browser.
///
/// Item links come from scraped content, so only plain http(s) URLs with a
/// host are opened.
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
    if url.host_str().is_none() {
        return Err(UrlValidationError::MissingHost);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_backends_accepted() {
        assert!(validate_backend_url("http://localhost:1300").is_ok());
        assert!(validate_backend_url("http://127.0.0.1:1300/api").is_ok());
        assert!(validate_backend_url("http://192.168.1.10:1300").is_ok());
        assert!(validate_backend_url("https://feeds.example.com").is_ok());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_backend_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_backend_url("ftp://example.com").is_err());
        assert!(validate_url_for_open("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_backend_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_credentials_rejected() {
        assert!(matches!(
            validate_backend_url("http://user:pw@localhost:1300"),
            Err(UrlValidationError::EmbeddedCredentials)
        ));
    }

    #[test]
    fn test_open_trims_whitespace() {
        let url = validate_url_for_open("  https://example.com/post \n").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }
}
