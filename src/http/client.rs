use std::{collections::BTreeMap, sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::{
    Client, Method, StatusCode, Url,
    header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE},
    redirect::Policy,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

use super::redirect::RedirectPolicy;
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Inspects a completed response and returns the error to surface, if any.
pub type ResponseClassifier = Arc<dyn Fn(&RawResponse) -> Option<ApiError> + Send + Sync>;

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: Url,
    pub body: Vec<u8>,
}

impl RawResponse {
    async fn read(response: reqwest::Response) -> ApiResult<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?.to_vec();
        Ok(Self {
            status,
            headers,
            url,
            body,
        })
    }

    /// Decodes the body. Empty bodies and a literal `null` are rejected.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::EmptyResponse);
        }
        match serde_json::from_slice::<Option<T>>(&self.body)? {
            Some(value) => Ok(value),
            None => Err(ApiError::EmptyResponse),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Every `Set-Cookie` header value, in arrival order.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Form,
    Json,
}

#[derive(Debug, Clone)]
struct Endpoint {
    base_url: String,
    headers: BTreeMap<String, String>,
}

pub struct HttpClientBuilder {
    base_url: String,
    headers: BTreeMap<String, String>,
    auto_timestamp: bool,
    timeout: Duration,
    redirects: RedirectPolicy,
    classifier: Option<ResponseClassifier>,
    label: String,
}

impl HttpClientBuilder {
    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn auto_timestamp(mut self, enabled: bool) -> Self {
        self.auto_timestamp = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn redirects(mut self, redirects: RedirectPolicy) -> Self {
        self.redirects = redirects;
        self
    }

    pub fn classifier(mut self, classifier: ResponseClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Name used to prefix log lines.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn build(self) -> ApiResult<HttpClient> {
        let inner = Client::builder()
            .redirect(Policy::none())
            .timeout(self.timeout)
            .build()?;

        Ok(HttpClient {
            inner: RwLock::new(Some(inner)),
            endpoint: RwLock::new(Endpoint {
                base_url: trim_base_url(&self.base_url),
                headers: self.headers,
            }),
            auto_timestamp: self.auto_timestamp,
            redirects: self.redirects,
            classifier: self.classifier,
            label: self.label,
        })
    }
}

/// Provider-scoped HTTP client. Safe to share behind an `Arc` across concurrent
/// foreground calls and the background session task.
pub struct HttpClient {
    inner: RwLock<Option<Client>>,
    endpoint: RwLock<Endpoint>,
    auto_timestamp: bool,
    redirects: RedirectPolicy,
    classifier: Option<ResponseClassifier>,
    label: String,
}

impl HttpClient {
    pub fn builder(base_url: impl Into<String>) -> HttpClientBuilder {
        HttpClientBuilder {
            base_url: base_url.into(),
            headers: BTreeMap::new(),
            auto_timestamp: false,
            timeout: DEFAULT_TIMEOUT,
            redirects: RedirectPolicy::default(),
            classifier: None,
            label: "http".to_string(),
        }
    }

    pub async fn base_url(&self) -> String {
        self.endpoint.read().await.base_url.clone()
    }

    pub async fn set_base_url(&self, base_url: &str) {
        self.endpoint.write().await.base_url = trim_base_url(base_url);
    }

    pub async fn headers(&self) -> BTreeMap<String, String> {
        self.endpoint.read().await.headers.clone()
    }

    pub async fn set_headers(&self, headers: BTreeMap<String, String>) {
        self.endpoint.write().await.headers = headers;
    }

    /// GET `path` with percent-encoded parameters and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> ApiResult<T> {
        self.get_json_with(path, params, true).await
    }

    pub async fn get_json_with<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        encode: bool,
    ) -> ApiResult<T> {
        self.get_response_with(path, params, encode).await?.json()
    }

    /// GET returning the validated raw response, for callers that need headers.
    pub async fn get_response(&self, path: &str, params: &[(&str, &str)]) -> ApiResult<RawResponse> {
        self.get_response_with(path, params, true).await
    }

    async fn get_response_with(
        &self,
        path: &str,
        params: &[(&str, &str)],
        encode: bool,
    ) -> ApiResult<RawResponse> {
        let timestamp = self.auto_timestamp.then(|| Utc::now().timestamp_millis());
        let query = build_query(params, encode, timestamp);
        let url = format!("{}{}{}", self.base_url().await, normalize_path(path), query);
        self.execute(Method::GET, &url, None).await
    }

    /// POST `params` as a form or JSON object and decode the JSON body. The
    /// timestamp, when enabled, goes on the path rather than in the body.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        kind: BodyKind,
    ) -> ApiResult<T> {
        self.post_response(path, params, kind).await?.json()
    }

    pub async fn post_response(
        &self,
        path: &str,
        params: &[(&str, &str)],
        kind: BodyKind,
    ) -> ApiResult<RawResponse> {
        let mut path = normalize_path(path);
        if self.auto_timestamp {
            let sep = if path.contains('?') { '&' } else { '?' };
            path.push_str(&format!("{}timestamp={}", sep, Utc::now().timestamp_millis()));
        }
        let url = format!("{}{}", self.base_url().await, path);
        let body = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>();
        self.execute(Method::POST, &url, Some((kind, body))).await
    }

    /// Downloads an absolute URL (cover art, media) with the shared headers.
    pub async fn get_bytes(&self, url: &str) -> ApiResult<Vec<u8>> {
        Ok(self.execute(Method::GET, url, None).await?.body)
    }

    /// Releases the connection pool. Later requests fail with [`ApiError::Closed`].
    pub async fn shutdown(&self) {
        if self.inner.write().await.take().is_some() {
            log::debug!("[{}] HTTP client closed", self.label);
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.read().await.is_none()
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<(BodyKind, Vec<(String, String)>)>,
    ) -> ApiResult<RawResponse> {
        let client = self.inner.read().await.clone().ok_or(ApiError::Closed)?;
        let parsed = Url::parse(url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", url, e)))?;
        let headers = self.header_map().await?;

        let mut builder = client.request(method, parsed).headers(headers);
        builder = match body {
            Some((BodyKind::Form, pairs)) => builder.form(&pairs),
            Some((BodyKind::Json, pairs)) => {
                let object = pairs
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect::<serde_json::Map<_, _>>();
                builder.json(&Value::Object(object))
            }
            None => builder,
        };
        let request = builder.build()?;

        let raw = match self.redirects.send(&client, request).await {
            Ok(response) => RawResponse::read(response).await,
            Err(e) => Err(e),
        }
        .inspect_err(|e| {
            if e.is_timeout() {
                log::debug!("[{}] Request timed out: {}", self.label, url);
            } else if e.is_transport() {
                log::debug!("[{}] Unknown request error: {}", self.label, e);
            }
        })?;

        self.classify(&raw)?;
        Ok(raw)
    }

    fn classify(&self, raw: &RawResponse) -> ApiResult<()> {
        let failure = match &self.classifier {
            Some(classifier) => classifier(raw),
            None if !raw.status.is_success() => Some(ApiError::Status(raw.status.as_u16())),
            None => None,
        };
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn header_map(&self) -> ApiResult<HeaderMap> {
        let endpoint = self.endpoint.read().await;
        let mut map = HeaderMap::new();
        for (name, value) in &endpoint.headers {
            if value.is_empty() {
                continue;
            }
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ApiError::Config(format!("invalid header name {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ApiError::Config(format!("invalid value for header {}", name)))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Ensures exactly one leading slash. An empty path stays empty.
pub(crate) fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    format!("/{}", path.trim_start_matches('/'))
}

pub(crate) fn build_query(params: &[(&str, &str)], encode: bool, timestamp: Option<i64>) -> String {
    let mut pairs = params
        .iter()
        .map(|(k, v)| {
            if encode {
                format!("{}={}", k, urlencoding::encode(v))
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect::<Vec<_>>();
    if let Some(ts) = timestamp {
        pairs.push(format!("timestamp={}", ts));
    }

    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_gets_exactly_one_leading_slash() {
        assert_eq!(normalize_path("search"), "/search");
        assert_eq!(normalize_path("/search"), "/search");
        assert_eq!(normalize_path("//search"), "/search");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn query_encoding_and_timestamp() {
        let q = build_query(&[("keywords", "a b&c")], true, None);
        assert_eq!(q, "?keywords=a%20b%26c");

        let q = build_query(&[("keywords", "a b")], false, Some(42));
        assert_eq!(q, "?keywords=a b&timestamp=42");

        assert_eq!(build_query(&[], true, Some(7)), "?timestamp=7");
        assert_eq!(build_query(&[], true, None), "");
    }

    #[test]
    fn raw_json_rejects_empty_and_null() {
        let raw = |body: &str| RawResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            url: Url::parse("http://localhost/").unwrap(),
            body: body.as_bytes().to_vec(),
        };
        assert!(matches!(raw("").json::<Value>(), Err(ApiError::EmptyResponse)));
        assert!(matches!(raw("null").json::<Value>(), Err(ApiError::EmptyResponse)));
        assert!(matches!(raw("{oops").json::<Value>(), Err(ApiError::Malformed(_))));
        assert_eq!(raw("{\"a\":1}").json::<Value>().unwrap()["a"], 1);
    }
}
