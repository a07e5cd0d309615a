//! The HTTP boundary.
//!
//! Each call builds its own client and drops it on return, so no connection
//! outlives the request that opened it.

use cryptoconnect_core::{DriverError, HttpSettings};
use reqwest::StatusCode;
use serde_json::Value;

/// How much of an unreadable body to quote in an error message.
const BODY_SNIPPET_CHARS: usize = 200;

/// Status and raw body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    /// Parse the body as JSON, whatever the status code.
    ///
    /// A body that is not JSON carries no exchange-authored message, so it
    /// is reported as a transport failure naming the status.
    pub fn json(&self) -> Result<Value, DriverError> {
        serde_json::from_str(&self.body).map_err(|e| {
            DriverError::Transport(format!(
                "HTTP {}: response is not JSON ({}): {}",
                self.status,
                e,
                self.snippet()
            ))
        })
    }

    /// First few hundred characters of the body, for diagnostics.
    pub fn snippet(&self) -> String {
        self.body.chars().take(BODY_SNIPPET_CHARS).collect()
    }
}

/// Send a GET and read the whole body.
///
/// `url` must already carry its query string. Headers are attached as-is.
pub async fn get(
    url: &str,
    headers: &[(&str, &str)],
    settings: &HttpSettings,
) -> Result<HttpResponse, DriverError> {
    let client = reqwest::Client::builder()
        .timeout(settings.timeout)
        .build()
        .map_err(|e| DriverError::Transport(format!("Failed to build HTTP client: {}", e)))?;

    let mut request = client.get(url);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    tracing::trace!(status = status.as_u16(), bytes = body.len(), "HTTP response received");

    Ok(HttpResponse { status, body })
}

/// Map a client failure onto the driver taxonomy.
///
/// The URL is stripped from the message because signed URLs carry the
/// signature in their query string.
pub fn transport_error(err: reqwest::Error) -> DriverError {
    let err = err.without_url();
    if err.is_timeout() {
        DriverError::Transport(format!("Request timed out: {}", err))
    } else if err.is_connect() {
        DriverError::Transport(format!("Connection failed: {}", err))
    } else if err.is_decode() || err.is_body() {
        DriverError::Transport(format!("Failed to read response body: {}", err))
    } else {
        DriverError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_json_parsed_regardless_of_status() {
        let value = response(400, r#"{"code":-1100,"msg":"Illegal characters"}"#)
            .json()
            .unwrap();
        assert_eq!(value["msg"], "Illegal characters");
    }

    #[test]
    fn test_non_json_body_is_transport_error() {
        let err = response(502, "<html>Bad Gateway</html>").json().unwrap_err();
        match err {
            DriverError::Transport(msg) => {
                assert!(msg.contains("502"));
                assert!(msg.contains("Bad Gateway"));
            }
            other => panic!("Expected transport error, got {:?}", other),
        }
    }

    #[test]
    fn test_snippet_truncates() {
        let long = "x".repeat(1000);
        assert_eq!(response(200, &long).snippet().len(), BODY_SNIPPET_CHARS);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let settings = HttpSettings {
            timeout: Duration::from_secs(2),
        };
        let err = get(&format!("http://{}/ping", addr), &[], &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Transport(_)));
    }
}
