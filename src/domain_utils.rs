use once_cell::sync::Lazy;
use regex::Regex;

// Underscore-prefixed labels (_dmarc, _acme-challenge) show up in real
// wordlists and are valid DNS names even though they are not hostnames.
static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]([a-zA-Z0-9\-_]{0,61}[a-zA-Z0-9_])?(\.[a-zA-Z0-9_]([a-zA-Z0-9\-_]{0,61}[a-zA-Z0-9_])?)*$")
        .expect("hostname regex is valid")
});

/// Normalise a hostname for comparison: trim whitespace, drop the root dot, lowercase.
pub fn normalize_hostname(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Extract the apex domain as the last two labels (`foo.bar.example.com` -> `example.com`).
///
/// Compound public suffixes such as `co.uk` are deliberately not special-cased:
/// the registry is queried for exactly `label[-2].label[-1]`.
/// A name with fewer than two labels is returned unchanged.
pub fn extract_apex(host: &str) -> String {
    let normalized = normalize_hostname(host);
    let parts: Vec<&str> = normalized.split('.').map(str::trim).collect();

    if parts.len() < 2 {
        return normalized;
    }

    format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1])
}

/// The leftmost label of the apex (`shop.shopify.com` -> `shopify`).
pub fn apex_label(host: &str) -> String {
    let apex = extract_apex(host);
    apex.split('.').next().unwrap_or_default().to_string()
}

/// The top-level label (`example.com` -> `com`)
pub fn tld(host: &str) -> Option<String> {
    let normalized = normalize_hostname(host);
    let last = normalized.rsplit('.').next()?;
    if last.is_empty() || !normalized.contains('.') {
        return None;
    }
    Some(last.to_string())
}

/// True when both names share the same apex domain
pub fn same_apex(a: &str, b: &str) -> bool {
    extract_apex(a) == extract_apex(b)
}

/// Basic syntactic validation applied to every wordlist entry before it is queried
pub fn is_valid_hostname(host: &str) -> bool {
    let normalized = normalize_hostname(host);
    if normalized.is_empty() || normalized.len() > 253 {
        return false;
    }
    if !normalized.contains('.') {
        return false;
    }
    HOSTNAME_REGEX.is_match(&normalized)
}
