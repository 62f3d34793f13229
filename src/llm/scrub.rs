use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;

/// Markers followed by a credential that must not reach the logs.
const SECRET_MARKERS: [&str; 5] = ["sk-", "Bearer ", "bearer ", "\"api_key\":\"", "api_key="];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    if !SECRET_MARKERS.iter().any(|marker| input.contains(marker)) {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for marker in SECRET_MARKERS {
        let mut search_from = 0;
        while let Some(rel) = scrubbed[search_from..].find(marker) {
            let start = search_from + rel;
            let value_start = start + marker.len();
            let value_len: usize = scrubbed[value_start..]
                .chars()
                .take_while(|c| is_secret_char(*c))
                .map(char::len_utf8)
                .sum();
            if value_len == 0 {
                search_from = value_start;
                continue;
            }
            scrubbed.replace_range(start..value_start + value_len, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }
    Cow::Owned(scrubbed)
}

/// Sanitize API error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed.into_owned();
    }

    let truncated: String = scrubbed.chars().take(MAX_API_ERROR_CHARS).collect();
    format!("{truncated}...")
}

/// Build a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    anyhow::anyhow!("{provider} API error ({status}): {sanitized}")
}
