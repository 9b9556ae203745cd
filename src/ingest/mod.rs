/// Clients for the external services the workflow orchestrates.
///
/// Each service gets its own file: URL/payload construction and response
/// parsing are pure functions (tested against `fixtures`), and a thin
/// `fetch_*` wrapper does the blocking HTTP call.

pub mod digital_coast;
pub mod ept;
pub mod gagestats;
pub mod inventory;
pub mod ratings;

#[cfg(test)]
pub(crate) mod fixtures;

use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::config::HttpConfig;
use crate::error::{LapisError, Result};

/// Builds the single blocking HTTP client shared by every fetch in a run.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Passes a successful response through; turns any other status into
/// `LapisError::Service`.
pub(crate) fn check_status(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(LapisError::from_status(url, status.as_u16()))
    }
}

/// GETs `url` and returns the body text.
pub(crate) fn get_text(client: &Client, url: &str) -> Result<String> {
    tracing::debug!("GET {}", url);
    let response = client.get(url).send()?;
    let response = check_status(response, url)?;
    Ok(response.text()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    // Nothing listens on the discard port locally, so the connect is refused.
    const UNREACHABLE: &str = "http://127.0.0.1:9/";

    fn test_client() -> Client {
        build_client(&HttpConfig { timeout_secs: 5, ..HttpConfig::default() }).expect("client should build")
    }

    /// Serves exactly one request with a fixed status line and body, returning
    /// the URL to hit.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}/statistics", addr)
    }

    #[test]
    fn test_get_text_unreachable_host_is_http_error() {
        let result = get_text(&test_client(), UNREACHABLE);
        assert!(
            matches!(result, Err(LapisError::Http(_))),
            "a refused connection should be a transport failure, got {:?}",
            result
        );
    }

    #[test]
    fn test_get_text_server_error_is_service_error() {
        let url = serve_once("500 Internal Server Error", "boom");
        let result = get_text(&test_client(), &url);
        match result {
            Err(LapisError::Service { url: failed, status, reason }) => {
                assert_eq!(status, 500);
                assert_eq!(reason, "Internal error");
                assert_eq!(failed, url);
            }
            other => panic!("expected Service error, got {:?}", other),
        }
    }

    #[test]
    fn test_get_text_bad_request_is_service_error() {
        let url = serve_once("400 Bad Request", "");
        let result = get_text(&test_client(), &url);
        assert!(matches!(result, Err(LapisError::Service { status: 400, .. })));
    }

    #[test]
    fn test_get_text_success_returns_body() {
        let url = serve_once("200 OK", "[]");
        assert_eq!(get_text(&test_client(), &url).unwrap(), "[]");
    }
}
