use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::WebConfig;
use crate::engine::GradingEngine;
use crate::grading::GradingResult;
use crate::metrics::{render_metrics, MetricsCounters};
use crate::rate_limit::SlidingWindowLimiter;
use crate::share;

/// HTTP surface for grading, shared results, stats and metrics.
pub struct WebServer {
    engine: Arc<GradingEngine>,
    availability: Arc<SlidingWindowLimiter>,
    config: WebConfig,
}

#[derive(Clone)]
struct AppState {
    engine: Arc<GradingEngine>,
    availability: Arc<SlidingWindowLimiter>,
    allowed_origins: Arc<Vec<String>>,
    trust_forwarded_headers: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GradeResponse {
    #[serde(flatten)]
    result: GradingResult,
    share_token: String,
}

impl WebServer {
    pub fn new(engine: Arc<GradingEngine>, availability: Arc<SlidingWindowLimiter>, config: WebConfig) -> Self {
        Self { engine, availability, config }
    }

    pub fn router(&self) -> Router {
        let allowed_origins: Vec<String> = self
            .config
            .allowed_origins
            .iter()
            .map(|o| o.trim_end_matches('/').to_string())
            .collect();

        let state = AppState {
            engine: self.engine.clone(),
            availability: self.availability.clone(),
            allowed_origins: Arc::new(allowed_origins.clone()),
            trust_forwarded_headers: self.config.trust_forwarded_headers,
        };

        Router::new()
            .route("/api/grade", post(api_grade))
            .route("/api/share/:token", get(api_share))
            .route("/api/stats", get(api_stats))
            .route("/metrics", get(metrics))
            .with_state(state)
            .layer(cors_layer(&allowed_origins))
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = format!("{}:{}", self.config.address, self.config.port);
        info!("🌐 Grading API listening on http://{}", addr);
        if self.config.trust_forwarded_headers {
            info!("Client keys taken from X-Forwarded-For / X-Real-IP (trusted proxy)");
        }

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
        Ok(())
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring unparseable allowed origin '{}'", o);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Origin allow-list (CSRF defense). Falls back to the Referer when the
/// browser omits Origin. An empty list disables the check.
fn origin_allowed(headers: &HeaderMap, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        let origin = origin.trim_end_matches('/');
        return allowed.iter().any(|a| a == origin);
    }
    if let Some(referer) = headers.get(header::REFERER).and_then(|v| v.to_str().ok()) {
        return allowed
            .iter()
            .any(|a| referer == a || referer.starts_with(&format!("{}/", a)));
    }
    false
}

/// Rate-limit identity. The peer address unless a trusted proxy fronts us;
/// then the hop that proxy appended (rightmost X-Forwarded-For entry), then
/// X-Real-IP, then the peer.
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    let peer_ip = || peer.map(|p| p.ip().to_string());
    if !trust_forwarded {
        return peer_ip().unwrap_or_else(|| "unknown".to_string());
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(',').map(str::trim).find(|hop| !hop.is_empty()));
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(peer_ip)
        .unwrap_or_else(|| "unknown".to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Grade a headline
async fn api_grade(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    if !origin_allowed(&headers, &state.allowed_origins) {
        debug!("Rejected grading request from disallowed origin");
        return error_response(StatusCode::FORBIDDEN, "Forbidden");
    }

    let Json(raw) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!("Malformed grading request body: {}", rejection);
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let key = client_key(&headers, peer.map(|ConnectInfo(addr)| addr), state.trust_forwarded_headers);
    match state.engine.handle(&raw, &key).await {
        Ok(graded) => {
            debug!("Graded via {} for {}", graded.source.name(), key);
            let result = graded.into_result();
            let share_token = share::encode(&result);
            Json(GradeResponse { result, share_token }).into_response()
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

/// Decode a shared result; `null` means "show defaults"
async fn api_share(State(state): State<AppState>, Path(token): Path<String>) -> Json<Value> {
    let counters = &state.engine.metrics;
    MetricsCounters::inc(&counters.share_decodes_total);
    let projection = share::decode(&token);
    if projection.is_none() {
        MetricsCounters::inc(&counters.share_decode_failures_total);
    }
    Json(json!({ "result": projection }))
}

/// Stats API, on the looser availability budget
async fn api_stats(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let key = client_key(&headers, peer.map(|ConnectInfo(addr)| addr), state.trust_forwarded_headers);
    if !state.availability.check(&key) {
        return error_response(StatusCode::TOO_MANY_REQUESTS, "Too many requests");
    }
    let mut stats = state.engine.get_stats();
    stats["availability_limit"] = state.availability.get_stats();
    Json(stats).into_response()
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render_metrics(&state.engine),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assist::{AssistError, AssistedGrader};
    use crate::config::RateLimitConfig;
    use crate::grading::GradingInput;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct DownGrader;

    #[async_trait]
    impl AssistedGrader for DownGrader {
        async fn grade(&self, _input: &GradingInput) -> Result<GradingResult, AssistError> {
            Err(AssistError::Status(500))
        }
    }

    fn server(allowed_origins: Vec<&str>, stats_limit: usize) -> WebServer {
        server_with(
            WebConfig {
                allowed_origins: allowed_origins.into_iter().map(String::from).collect(),
                ..WebConfig::default()
            },
            stats_limit,
        )
    }

    fn server_with(config: WebConfig, stats_limit: usize) -> WebServer {
        let limit = |limit| RateLimitConfig { limit, window_ms: 60_000, gc_threshold: 1024 };
        let engine = GradingEngine::new(
            SlidingWindowLimiter::new("assisted", &limit(5)),
            Some(Arc::new(DownGrader)),
        );
        WebServer::new(
            Arc::new(engine),
            Arc::new(SlidingWindowLimiter::new("availability", &limit(stats_limit))),
            config,
        )
    }

    fn grade_request(origin: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/grade")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1");
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const VALID: &str = r#"{"startupName": "Acme", "headline": "AI-powered platform for businesses"}"#;

    #[tokio::test]
    async fn test_grade_returns_result_and_share_token() {
        let app = server(vec!["https://example.com"], 10).router();
        let response = app.oneshot(grade_request(Some("https://example.com"), VALID)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["score"], 45);
        assert_eq!(body["grade"], "F");
        assert_eq!(body["name"], "Acme");
        assert_eq!(body["dimensions"]["valueClarity"], 30);

        let token = body["shareToken"].as_str().unwrap();
        let projection = share::decode(token).unwrap();
        assert_eq!(projection.score, 45);
    }

    #[tokio::test]
    async fn test_disallowed_origin_is_forbidden_before_parsing() {
        let app = server(vec!["https://example.com"], 10).router();
        let response = app.oneshot(grade_request(Some("https://evil.test"), "{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let app = server(vec!["https://example.com"], 10).router();
        let response = app.oneshot(grade_request(None, VALID)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = server(vec![], 10).router();
        let response = app.oneshot(grade_request(None, "{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid request body");
    }

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let app = server(vec![], 10).router();
        let long = format!(r#"{{"startupName": "Acme", "headline": "{}"}}"#, "h".repeat(501));
        let response = app.oneshot(grade_request(None, &long)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Headline must be at most 500 characters");
    }

    #[tokio::test]
    async fn test_share_endpoint() {
        let app = server(vec![], 10).router();
        let response = app
            .oneshot(Request::builder().uri("/api/share/not-a-token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["result"], Value::Null);
    }

    fn stats_request(forwarded_for: &str) -> Request<Body> {
        Request::builder()
            .uri("/api/stats")
            .header("x-forwarded-for", forwarded_for)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_stats_use_availability_budget() {
        let app = server(vec![], 1).router();
        let first = app.clone().oneshot(stats_request("198.51.100.1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let body = body_json(first).await;
        assert_eq!(body["assist_configured"], true);
        assert_eq!(body["availability_limit"]["limit"], 1);

        // Rotating a client-supplied header does not buy a fresh budget
        let second = app.oneshot(stats_request("198.51.100.2")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_trusted_proxy_keys_by_appended_hop() {
        let config = WebConfig { trust_forwarded_headers: true, ..WebConfig::default() };
        let app = server_with(config, 1).router();

        let first = app.clone().oneshot(stats_request("1.1.1.1, 198.51.100.1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        // Same proxy-appended hop with a different client-written prefix
        let second = app.clone().oneshot(stats_request("2.2.2.2, 198.51.100.1")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let other = app.oneshot(stats_request("198.51.100.2")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = server(vec![], 10).router();
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("grader_assist_configured 1"));
    }

    #[test]
    fn test_origin_rules() {
        let allowed = vec!["https://example.com".to_string()];
        let mut headers = HeaderMap::new();
        assert!(!origin_allowed(&headers, &allowed));
        assert!(origin_allowed(&headers, &[]));

        headers.insert(header::REFERER, HeaderValue::from_static("https://example.com/tools/grader"));
        assert!(origin_allowed(&headers, &allowed));
        headers.insert(header::REFERER, HeaderValue::from_static("https://example.com.evil.test/"));
        assert!(!origin_allowed(&headers, &allowed));

        headers.insert(header::ORIGIN, HeaderValue::from_static("https://example.com/"));
        assert!(origin_allowed(&headers, &allowed));
    }

    #[test]
    fn test_client_key_ignores_forwarded_headers_by_default() {
        let peer: SocketAddr = "192.0.2.9:4242".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        assert_eq!(client_key(&headers, Some(peer), false), "192.0.2.9");
        assert_eq!(client_key(&headers, None, false), "unknown");
    }

    #[test]
    fn test_client_key_precedence_behind_proxy() {
        let peer: SocketAddr = "192.0.2.9:4242".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers, Some(peer), true), "192.0.2.9");
        assert_eq!(client_key(&headers, None, true), "unknown");
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(client_key(&headers, Some(peer), true), "198.51.100.1");
        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1 , "));
        assert_eq!(client_key(&headers, Some(peer), true), "10.0.0.1");
        headers.insert("x-forwarded-for", HeaderValue::from_static(" , "));
        assert_eq!(client_key(&headers, Some(peer), true), "198.51.100.1");
    }
}
