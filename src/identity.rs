use axum::http::HeaderMap;

/// Header set by the reverse proxy in front of the gateway.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Shared bucket for callers without a forwarded address.
pub const ANONYMOUS: &str = "anonymous";

/// Derive the quota key for a caller.
///
/// `lookup` returns the raw value of a request header by name. The first
/// entry of `x-forwarded-for` is used as-is (trimmed, not validated), so the
/// key is only as trustworthy as the proxy setting that header.
pub fn resolve_identity<'a, F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    lookup(FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .unwrap_or(ANONYMOUS)
        .to_string()
}

pub fn identity_from_headers(headers: &HeaderMap) -> String {
    resolve_identity(|name| headers.get(name).and_then(|v| v.to_str().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn single(value: &'static str) -> impl Fn(&str) -> Option<&'static str> {
        move |name| (name == FORWARDED_FOR).then_some(value)
    }

    #[test]
    fn uses_first_forwarded_entry() {
        let id = resolve_identity(single("203.0.113.7, 10.0.0.1, 10.0.0.2"));
        assert_eq!(id, "203.0.113.7");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(resolve_identity(single("   198.51.100.4  ")), "198.51.100.4");
    }

    #[test]
    fn missing_header_falls_back_to_anonymous() {
        assert_eq!(resolve_identity(|_| None), ANONYMOUS);
    }

    #[test]
    fn blank_first_entry_falls_back_to_anonymous() {
        assert_eq!(resolve_identity(single(" , 10.0.0.1")), ANONYMOUS);
        assert_eq!(resolve_identity(single("")), ANONYMOUS);
    }

    #[test]
    fn value_is_not_validated() {
        assert_eq!(resolve_identity(single("not-an-ip")), "not-an-ip");
    }

    #[test]
    fn reads_from_header_map() {
        let mut headers = HeaderMap::new();
        assert_eq!(identity_from_headers(&headers), ANONYMOUS);

        headers.insert("x-forwarded-for", HeaderValue::from_static("192.0.2.1, 10.0.0.9"));
        assert_eq!(identity_from_headers(&headers), "192.0.2.1");
    }
}
