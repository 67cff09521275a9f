//! Canned responses.
//!
//! Every captured request gets the same success status and the same small
//! plain-text body, whatever it contained. Request content is recorded for
//! analysis, never reflected back where it could steer behavior.

use std::path::Path;

/// The one body every captured request receives.
pub const FIXED_BODY: &str = "42: accepted\n";

/// Build a minimal HTTP/1.1 response.
fn build_response(body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

/// The fixed response sent after every capture.
pub fn fixed_response() -> Vec<u8> {
    build_response(FIXED_BODY.as_bytes())
}

/// Serve the robots file verbatim, if one exists at `path`.
///
/// Requests answered this way bypass capture entirely.
pub async fn robots_response(path: &Path) -> Option<Vec<u8>> {
    let content = tokio::fs::read(path).await.ok()?;
    Some(build_response(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_response_declares_its_length() {
        let response = fixed_response();
        let text = String::from_utf8(response).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains(&format!("Content-Length: {}\r\n", FIXED_BODY.len())));
        assert!(text.ends_with(FIXED_BODY));
    }

    #[tokio::test]
    async fn missing_robots_file_yields_none() {
        assert!(robots_response(Path::new("/nonexistent/robots.txt"))
            .await
            .is_none());
    }
}
