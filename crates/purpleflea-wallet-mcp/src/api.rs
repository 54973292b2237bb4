//! HTTP dispatcher for the wallet backend.
//!
//! One [`ApiRequest`] maps to exactly one HTTP exchange. Successful bodies are returned as opaque
//! JSON; every non-2xx status is folded into [`ApiError::Http`] the same way regardless of which
//! endpoint produced it.

use reqwest::{header, Client, Method, RequestBuilder, StatusCode, Url};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::errors::ApiError;

pub const SERVICE_KEY_HEADER: &str = "x-service-key";
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

const UNKNOWN_REASON: &str = "Unknown Status";

/// Authentication attached to a request. At most one per request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Agent API key, sent as `Authorization: Bearer <key>`.
    Bearer(String),
    /// Trusted backend key, sent as `X-Service-Key`.
    Service(String),
    /// Operator key, sent as `X-Admin-Key`.
    #[cfg_attr(
        not(test),
        expect(dead_code, reason = "no tool in the current surface needs admin access")
    )]
    Admin(String),
}

impl Credential {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "bearer",
            Self::Service(_) => "service",
            Self::Admin(_) => "admin",
        }
    }

    fn apply(&self, rb: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(key) => rb.bearer_auth(key),
            Self::Service(key) => rb.header(SERVICE_KEY_HEADER, key.as_str()),
            Self::Admin(key) => rb.header(ADMIN_KEY_HEADER, key.as_str()),
        }
    }
}

// Key material never reaches logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential::{}(<redacted>)", self.kind())
    }
}

/// A single outbound request, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: &'static str,
    segments: Vec<String>,
    body: Option<Value>,
    query: BTreeMap<String, String>,
    credential: Option<Credential>,
}

impl ApiRequest {
    pub const fn new(method: Method, path: &'static str) -> Self {
        Self {
            method,
            path,
            segments: Vec::new(),
            body: None,
            query: BTreeMap::new(),
            credential: None,
        }
    }

    pub const fn get(path: &'static str) -> Self {
        Self::new(Method::GET, path)
    }

    pub const fn post(path: &'static str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Append a path parameter. The value is percent-encoded into its own segment.
    #[must_use]
    pub fn segment(mut self, value: impl Into<String>) -> Self {
        self.segments.push(value.into());
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a query parameter, replacing any earlier value for the same key.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    fn carries_body(&self) -> bool {
        self.method != Method::GET && self.method != Method::HEAD
    }
}

fn is_loopback_host(url: &Url) -> bool {
    matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"))
}

/// Parse and vet the backend base URL: `https`, or plain `http` on a loopback host.
pub fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw.trim()).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl(format!("{raw}: not a base url")));
    }
    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback_host(&url) => Ok(url),
        _ => Err(ApiError::InvalidUrl(format!(
            "{raw}: base url must use https (or http://localhost for local testing)"
        ))),
    }
}

/// Stateless client for the wallet backend. Cheap to clone; safe to share across tasks.
#[derive(Debug, Clone)]
pub struct WalletApi {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl WalletApi {
    pub fn new(cfg: &ApiConfig) -> Result<Self, ApiError> {
        Self::with_timeout(&cfg.base_url, cfg.timeout())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("purpleflea-wallet-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(format!("build http client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url_for(&self, req: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(req.path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", req.path)))?;

        if !req.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|()| ApiError::InvalidUrl("base url cannot carry a path".into()))?
                .extend(&req.segments);
        }

        if !req.query.is_empty() {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| !req.query.contains_key(k.as_ref()))
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter())
                .extend_pairs(req.query.iter());
        }

        Ok(url)
    }

    fn classify(&self, e: &reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout {
                after: self.timeout,
            }
        } else {
            ApiError::Transport(format!("{e}"))
        }
    }

    /// Perform the exchange exactly once. No retries.
    pub async fn dispatch(&self, req: ApiRequest) -> Result<Value, ApiError> {
        let url = self.url_for(&req)?;

        let mut rb = self
            .client
            .request(req.method.clone(), url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json");
        if let Some(cred) = &req.credential {
            rb = cred.apply(rb);
        }
        if req.carries_body() {
            if let Some(body) = &req.body {
                rb = rb.json(body);
            }
        }

        let resp = match rb.send().await {
            Ok(resp) => resp,
            Err(e) => {
                let err = self.classify(&e);
                warn!(
                    method = %req.method,
                    path = req.path,
                    error = %err,
                    "wallet api request failed"
                );
                return Err(err);
            }
        };
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| self.classify(&e))?;
        debug!(
            method = %req.method,
            path = req.path,
            status = status.as_u16(),
            credential = req.credential.as_ref().map(Credential::kind),
            "wallet api exchange"
        );

        if status.is_success() {
            return parse_success(status, &bytes);
        }
        let err = ApiError::Http {
            status: status.as_u16(),
            message: failure_message(status, &bytes),
        };
        warn!(
            method = %req.method,
            path = req.path,
            status = err.status(),
            error = %err,
            "wallet api returned an error"
        );
        Err(err)
    }
}

fn parse_success(status: StatusCode, body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|_e| ApiError::InvalidBody {
        status: status.as_u16(),
    })
}

fn field_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::String(_) | Value::Null | Value::Bool(false) => None,
        other @ (Value::Bool(true) | Value::Number(_) | Value::Array(_) | Value::Object(_)) => {
            Some(other.to_string())
        }
    }
}

/// Best-effort failure text: `message`, then `error`, then the status reason phrase.
pub fn failure_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .as_ref()
        .and_then(Value::as_object)
        .and_then(|obj| field_text(obj, "message").or_else(|| field_text(obj, "error")))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or(UNKNOWN_REASON).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn api_for(server: &mockito::ServerGuard) -> eyre::Result<WalletApi> {
        Ok(WalletApi::with_timeout(&server.url(), Duration::from_secs(5))?)
    }

    #[test]
    fn failure_message_prefers_message_then_error_then_reason() {
        assert_eq!(
            failure_message(
                StatusCode::PAYMENT_REQUIRED,
                br#"{"message":"insufficient funds","error":"ignored"}"#
            ),
            "insufficient funds"
        );
        assert_eq!(
            failure_message(StatusCode::BAD_REQUEST, br#"{"error":"bad route"}"#),
            "bad route"
        );
        assert_eq!(failure_message(StatusCode::NOT_FOUND, b"{}"), "Not Found");
        assert_eq!(
            failure_message(StatusCode::BAD_GATEWAY, b"<html>upstream</html>"),
            "Bad Gateway"
        );
        assert_eq!(
            failure_message(StatusCode::BAD_REQUEST, br#"{"message":"","error":"bad route"}"#),
            "bad route"
        );
        assert_eq!(
            failure_message(StatusCode::BAD_REQUEST, br#"["not","an","object"]"#),
            "Bad Request"
        );
    }

    #[test]
    fn base_url_must_be_https_or_loopback() {
        assert!(parse_base_url("https://wallet.purpleflea.com").is_ok());
        assert!(parse_base_url("http://127.0.0.1:8080").is_ok());
        assert!(parse_base_url("http://localhost").is_ok());
        assert!(parse_base_url("http://wallet.purpleflea.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn url_for_encodes_segments_and_overwrites_query() -> eyre::Result<()> {
        let api = WalletApi::with_timeout(
            "https://wallet.example.com/ignored/",
            Duration::from_secs(1),
        )?;
        let req = ApiRequest::get("/v1/wallet/internal/transactions")
            .segment("agent/../1?x")
            .query("limit", "50")
            .query("limit", "10");
        let url = api.url_for(&req)?;
        assert_eq!(
            url.as_str(),
            "https://wallet.example.com/v1/wallet/internal/transactions/agent%2F..%2F1%3Fx?limit=10"
        );
        Ok(())
    }

    #[tokio::test]
    async fn success_body_is_returned_verbatim() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let body = json!({ "chains": ["ethereum", "monero"], "nested": { "min_usd": 25 } });
        let m = server
            .mock("GET", "/v1/swap/chains")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await;

        let got = api_for(&server)?
            .dispatch(ApiRequest::get("/v1/swap/chains"))
            .await?;
        assert_eq!(got, body);
        m.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn credentials_map_to_exactly_one_header() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let bearer = server
            .mock("GET", "/bearer")
            .match_header("authorization", "Bearer agent-key")
            .match_header(SERVICE_KEY_HEADER, Matcher::Missing)
            .match_header(ADMIN_KEY_HEADER, Matcher::Missing)
            .with_body("{}")
            .create_async()
            .await;
        let service = server
            .mock("GET", "/service")
            .match_header(SERVICE_KEY_HEADER, "svc-key")
            .match_header("authorization", Matcher::Missing)
            .match_header(ADMIN_KEY_HEADER, Matcher::Missing)
            .with_body("{}")
            .create_async()
            .await;
        let admin = server
            .mock("GET", "/admin")
            .match_header(ADMIN_KEY_HEADER, "adm-key")
            .match_header("authorization", Matcher::Missing)
            .match_header(SERVICE_KEY_HEADER, Matcher::Missing)
            .with_body("{}")
            .create_async()
            .await;

        let api = api_for(&server)?;
        api.dispatch(ApiRequest::get("/bearer").credential(Credential::Bearer("agent-key".into())))
            .await?;
        api.dispatch(ApiRequest::get("/service").credential(Credential::Service("svc-key".into())))
            .await?;
        api.dispatch(ApiRequest::get("/admin").credential(Credential::Admin("adm-key".into())))
            .await?;

        bearer.assert_async().await;
        service.assert_async().await;
        admin.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn post_sends_json_body() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/v1/swap/quote")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({ "amount": "1000" })))
            .with_status(201)
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;

        let got = api_for(&server)?
            .dispatch(ApiRequest::post("/v1/swap/quote").json(json!({ "amount": "1000" })))
            .await?;
        assert_eq!(got, json!({ "ok": true }));
        m.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn non_success_status_is_normalized() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/gossip")
            .with_status(404)
            .with_body("{}")
            .create_async()
            .await;

        let err = api_for(&server)?
            .dispatch(ApiRequest::get("/v1/gossip"))
            .await
            .err();
        assert_eq!(
            err,
            Some(ApiError::Http {
                status: 404,
                message: "Not Found".into()
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn empty_success_body_is_null_and_garbage_is_invalid() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _empty = server
            .mock("POST", "/empty")
            .with_status(204)
            .create_async()
            .await;
        let _garbage = server
            .mock("GET", "/garbage")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let api = api_for(&server)?;
        assert_eq!(api.dispatch(ApiRequest::post("/empty")).await?, Value::Null);
        assert_eq!(
            api.dispatch(ApiRequest::get("/garbage")).await.err(),
            Some(ApiError::InvalidBody { status: 200 })
        );
        Ok(())
    }

    #[tokio::test]
    async fn slow_backend_fails_with_timeout() -> eyre::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        // Accept the connection and never answer.
        let hold = tokio::spawn(async move {
            if let Ok((sock, _peer)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(10)).await;
                drop(sock);
            }
        });

        let timeout = Duration::from_millis(200);
        let api = WalletApi::with_timeout(&format!("http://{addr}"), timeout)?;
        let err = api.dispatch(ApiRequest::get("/v1/gossip")).await.err();
        hold.abort();

        assert_eq!(err, Some(ApiError::Timeout { after: timeout }));
        assert_eq!(err.and_then(|e| e.status()), None);
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() -> eyre::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let api = WalletApi::with_timeout(&format!("http://{addr}"), Duration::from_secs(2))?;
        let err = api.dispatch(ApiRequest::get("/v1/gossip")).await.err();
        assert!(
            matches!(err, Some(ApiError::Transport(_))),
            "expected transport error, got {err:?}"
        );
        Ok(())
    }
}
