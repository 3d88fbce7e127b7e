//! One-shot REST transport over reqwest, plus the reachability probe the
//! queue consults to tell "we are offline" apart from "that endpoint is
//! down".

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::errors::RestError;

/// Supported request methods.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// A command destined for the REST API.
#[derive(Clone, Debug)]
pub struct CommandRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Path relative to the configured base URL, leading slash included.
    pub path: String,
    /// Optional JSON body.
    pub body: Option<Value>,
}

impl CommandRequest {
    /// A GET with no body.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    /// A POST carrying a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// A well-formed response, success or not.
#[derive(Clone, Debug)]
pub struct CommandResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, last value wins on duplicates.
    pub headers: HashMap<String, String>,
    /// Body parsed as JSON, or the raw text wrapped in a JSON string.
    pub body: Value,
}

impl CommandResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one command and returns the server's response.
///
/// A non-success status is still `Ok`: the transport only errs when no
/// well-formed response was obtained at all.
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// Perform one request and return its well-formed response.
    async fn execute(&self, request: &CommandRequest) -> Result<CommandResponse, RestError>;
}

/// Answers "does the network work at all right now".
#[async_trait]
pub trait Reachability: Send + Sync {
    /// Probe the network once.
    async fn is_reachable(&self) -> bool;
}

/// Production transport backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    /// Client with a 30s request timeout against the given API base.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent("accord-client/1.0")
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn execute(&self, request: &CommandRequest) -> Result<CommandResponse, RestError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method.as_reqwest(), &url)
            .header(reqwest::header::AUTHORIZATION, &self.token);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RestError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        let text = response
            .text()
            .await
            .map_err(|e| RestError::Transport(e.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        debug!(method = %request.method, path = %request.path, status, "rest command executed");
        Ok(CommandResponse {
            status,
            headers,
            body,
        })
    }
}

/// Probe that GETs a known endpoint; any response at all counts as
/// reachable.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// Probe with a short 5s timeout against the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Reachability for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "reachability probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn executes_post_with_auth_and_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/1/messages"))
            .and(header("authorization", "tok"))
            .and(body_json(json!({"content": "hi"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "42"})))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "tok");
        let request = CommandRequest::post("/channels/1/messages", json!({"content": "hi"}));
        let response = transport.execute(&request).await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.body["id"], "42");
    }

    #[tokio::test]
    async fn non_success_status_is_still_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guilds/9"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "unknown"})))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "tok");
        let response = transport
            .execute(&CommandRequest::get("/guilds/9"))
            .await
            .unwrap();
        assert!(!response.is_success());
        assert_eq!(response.status, 404);
        assert_eq!(response.body["message"], "unknown");
    }

    #[tokio::test]
    async fn non_json_body_is_preserved_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "tok");
        let response = transport
            .execute(&CommandRequest::get("/health"))
            .await
            .unwrap();
        assert_eq!(response.body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn probe_reports_live_server_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert!(HttpProbe::new(server.uri()).is_reachable().await);
    }

    #[tokio::test]
    async fn probe_reports_dead_endpoint_unreachable() {
        // Nothing listens on this port.
        let probe = HttpProbe::new("http://127.0.0.1:1");
        assert!(!probe.is_reachable().await);
    }
}
