//! Destination URL validation and argument escaping

use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use url::Url;

/// Scheme used when a URL does not specify one
const DEFAULT_SCHEME: &str = "http";

/// Everything except the RFC 3986 unreserved characters gets escaped
const ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Reasons a destination URL is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidUrl {
    /// Not a URI at all
    #[error("Invalid URL ({0})")]
    Malformed(String),

    /// No network location, like a bare path or an ARN
    #[error("URL must point to a website")]
    NoNetworkLocation,

    /// Anything but `http` or `https`
    #[error("Invalid scheme {0}")]
    UnsupportedScheme(String),
}

/// Validate a URL that must point to a network location
///
/// The URL is split into scheme, network location and the rest (path, query and fragment).
/// Without a scheme the URL defaults to `http`, like browsers do, everything else is kept
/// verbatim so positional placeholders survive.
pub fn validate_netloc_url(url: &str) -> Result<String, InvalidUrl> {
    check_characters(url)?;

    let (scheme, rest) = split_scheme(url);

    let Some(authority) = rest.strip_prefix("//") else {
        return Err(InvalidUrl::NoNetworkLocation);
    };

    let netloc_end = authority
        .find(['/', '?', '#'])
        .unwrap_or(authority.len());
    if netloc_end == 0 {
        return Err(InvalidUrl::NoNetworkLocation);
    }

    let url = match scheme {
        None => format!("{DEFAULT_SCHEME}:{rest}"),
        Some(scheme) if is_web_scheme(scheme) => url.to_string(),
        Some(scheme) => return Err(InvalidUrl::UnsupportedScheme(scheme.to_string())),
    };

    // hosts, ports and IPv6 literals still have to make sense
    Url::parse(&url).map_err(|err| InvalidUrl::Malformed(err.to_string()))?;

    Ok(url)
}

/// Escape a single formatting argument before it is put in a destination URL
pub fn escape_argument(argument: &str) -> String {
    utf8_percent_encode(argument, ESCAPE_SET).to_string()
}

/// Normalize an alias name for storage and lookups
///
/// Unicode normalization first (composed form), then the same escaping as arguments.
pub fn normalize_alias(name: &str) -> String {
    let name = name.nfc().collect::<String>();

    escape_argument(&name)
}

/// Reject characters the URI grammar does not allow and broken percent escapes
fn check_characters(url: &str) -> Result<(), InvalidUrl> {
    if url.is_empty() {
        return Err(InvalidUrl::Malformed("empty URL".to_string()));
    }

    if let Some(ch) = url
        .chars()
        .find(|ch| ch.is_whitespace() || ch.is_control() || *ch == '\\')
    {
        return Err(InvalidUrl::Malformed(format!("illegal character {ch:?}")));
    }

    let bytes = url.as_bytes();
    for (index, _) in url.match_indices('%') {
        let escape = bytes.get(index + 1..index + 3);
        let valid = escape.is_some_and(|escape| escape.iter().all(u8::is_ascii_hexdigit));

        if !valid {
            return Err(InvalidUrl::Malformed(format!(
                "malformed percent escape at position {index}"
            )));
        }
    }

    Ok(())
}

/// Split off the scheme, if the URL has a syntactically valid one
fn split_scheme(url: &str) -> (Option<&str>, &str) {
    let Some(colon) = url.find(':') else {
        return (None, url);
    };

    let candidate = &url[..colon];
    let mut chars = candidate.chars();

    let valid = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'));

    if valid {
        (Some(candidate), &url[colon + 1..])
    } else {
        (None, url)
    }
}

/// Only web URLs are allowed as destinations
fn is_web_scheme(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_netloc_url_rejects_non_urls() {
        for url in [
            "This is not a URL",
            "\\\\fileshare02\\share_name",
            "www.python.org",
            "www.python.org/downloads/",
            "/downloads/python3.6.9",
            "172.84.99.127:8080/g",
            "arn:aws:iam::123456789012:user/username@domain.com",
            "",
            "https://",
            "https:///path-only",
        ] {
            assert!(validate_netloc_url(url).is_err(), "{url} should be invalid");
        }
    }

    #[test]
    fn test_validate_netloc_url_rejects_malformed() {
        assert!(matches!(
            validate_netloc_url("https://example.com/%zz"),
            Err(InvalidUrl::Malformed(_))
        ));
        assert!(matches!(
            validate_netloc_url("https://example.com/%4"),
            Err(InvalidUrl::Malformed(_))
        ));
        assert!(matches!(
            validate_netloc_url("https://exa mple.com/"),
            Err(InvalidUrl::Malformed(_))
        ));
        assert!(matches!(
            validate_netloc_url("https://example.com:port/"),
            Err(InvalidUrl::Malformed(_))
        ));
    }

    #[test]
    fn test_validate_netloc_url_rejects_other_schemes() {
        assert_eq!(
            Err(InvalidUrl::UnsupportedScheme("ftp".to_string())),
            validate_netloc_url("ftp://ftp.example.com/file")
        );
        assert_eq!(
            Err(InvalidUrl::UnsupportedScheme("javascript".to_string())),
            validate_netloc_url("javascript://example.com/%0Aalert(1)")
        );
    }

    #[test]
    fn test_validate_netloc_url_defaults_scheme() {
        assert_eq!(
            Ok("http://www.python.org/downloads".to_string()),
            validate_netloc_url("//www.python.org/downloads")
        );
        assert_eq!(
            Ok("http://www.python.org/downloads/{}/{}".to_string()),
            validate_netloc_url("//www.python.org/downloads/{}/{}")
        );
    }

    #[test]
    fn test_validate_netloc_url_keeps_valid_urls() {
        for url in [
            "https://www.virustotal.com/gui/",
            "https://www.virustotal.com/gui/ip-address/{}/detection",
            "https://www.virustotal.com/gui/ip-address/{}/{}",
            "https://duckduckgo.com/?q={}",
            "http://localhost:8080/search?q={}#results",
            "https://[::1]:8443/",
        ] {
            assert_eq!(Ok(url.to_string()), validate_netloc_url(url));
        }
    }

    #[test]
    fn test_validate_netloc_url_is_idempotent() {
        for url in ["//www.python.org/downloads", "https://time.is/{}"] {
            let once = validate_netloc_url(url).unwrap();
            let twice = validate_netloc_url(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_escape_argument() {
        assert_eq!("cats%20are%20cool", escape_argument("cats are cool"));
        assert_eq!("a%26b%3Dc%2Fd", escape_argument("a&b=c/d"));
        assert_eq!("keep-_.~", escape_argument("keep-_.~"));
        assert_eq!("%C3%A4", escape_argument("ä"));
    }

    #[test]
    fn test_normalize_alias() {
        let composed = String::from_utf8(vec![195, 164]).unwrap();
        let decomposed = String::from_utf8(vec![97, 204, 136]).unwrap();

        assert_eq!(normalize_alias(&composed), normalize_alias(&decomposed));
        assert_eq!("ddg", normalize_alias("ddg"));
        assert_eq!("hello%20world", normalize_alias("hello world"));
    }
}
