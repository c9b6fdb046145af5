//! URL helpers for service endpoints.

/// Strip trailing slashes so paths can be appended without doubling them.
///
/// ```
/// use polychat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:2358///"), "http://localhost:2358");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and a relative path with exactly one slash.
///
/// ```
/// use polychat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://judge0-ce.p.rapidapi.com/", "/submissions"),
///     "https://judge0-ce.p.rapidapi.com/submissions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        normalize_base_url(base_url),
        path.trim_start_matches('/')
    )
}

/// Accept only absolute http(s) URLs with a host part.
pub fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    ["http://", "https://"]
        .iter()
        .filter_map(|scheme| value.strip_prefix(scheme))
        .any(|rest| {
            rest.split(['/', '?', '#'])
                .next()
                .is_some_and(|host| !host.is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_single_slash() {
        assert_eq!(
            construct_api_url("http://127.0.0.1:8080", "submissions"),
            "http://127.0.0.1:8080/submissions"
        );
        assert_eq!(
            construct_api_url("http://127.0.0.1:8080//", "//submissions/abc"),
            "http://127.0.0.1:8080/submissions/abc"
        );
    }

    #[test]
    fn http_urls_need_a_host() {
        assert!(is_http_url("https://api.groq.com/openai/v1/chat/completions"));
        assert!(is_http_url(" http://localhost:9000 "));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("api.groq.com"));
    }
}
