//! URL normalization for API endpoint construction.

/// Strip trailing slashes so endpoint joins never produce `//`.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash between them.
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        normalize_base_url(base_url),
        endpoint.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_stripped() {
        assert_eq!(
            normalize_base_url("http://localhost:5000/v1/openai/"),
            "http://localhost:5000/v1/openai"
        );
        assert_eq!(
            normalize_base_url("http://localhost:5000/v1/openai///"),
            "http://localhost:5000/v1/openai"
        );
        assert_eq!(normalize_base_url(""), "");
    }

    #[test]
    fn endpoint_joins_use_a_single_slash() {
        assert_eq!(
            construct_api_url("http://localhost:5000/v1/openai", "chat_event_streaming"),
            "http://localhost:5000/v1/openai/chat_event_streaming"
        );
        assert_eq!(
            construct_api_url("http://localhost:5000/v1/openai/", "/chat"),
            "http://localhost:5000/v1/openai/chat"
        );
        assert_eq!(
            construct_api_url("https://chat.example.com/v1/openai//", "chat_title"),
            "https://chat.example.com/v1/openai/chat_title"
        );
    }
}
