//! Rate limiting middleware for API routes
//!
//! One middleware instance per policy. A request passes every policy layered
//! on its route, so the global policy and the endpoint-class policy both
//! take a token.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::auth::AuthenticatedUser;
use super::client_ip::ClientIpResolver;
use super::types::ApiError;
use crate::core::config::RateLimitConfig;
use crate::data::cache::{RateLimitPolicy, RateLimiterRegistry};

/// One registry per endpoint class
#[derive(Clone)]
pub struct RateLimiters {
    pub global: Arc<RateLimiterRegistry>,
    pub login: Arc<RateLimiterRegistry>,
    pub api: Arc<RateLimiterRegistry>,
    pub batch: Arc<RateLimiterRegistry>,
}

impl RateLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        let registry = |policy: &RateLimitPolicy| {
            Arc::new(RateLimiterRegistry::new(policy.clone(), config.idle_timeout))
        };
        Self {
            global: registry(&config.global),
            login: registry(&config.login),
            api: registry(&config.api),
            batch: registry(&config.batch),
        }
    }

    pub fn all(&self) -> [&Arc<RateLimiterRegistry>; 4] {
        [&self.global, &self.login, &self.api, &self.batch]
    }
}

/// Rate limit middleware state
#[derive(Clone)]
pub struct RateLimitState {
    pub registry: Arc<RateLimiterRegistry>,
    pub resolver: Arc<ClientIpResolver>,
    pub key_extractor: KeyExtractor,
}

impl RateLimitState {
    pub fn new(
        registry: Arc<RateLimiterRegistry>,
        resolver: Arc<ClientIpResolver>,
        key_extractor: KeyExtractor,
    ) -> Self {
        Self {
            registry,
            resolver,
            key_extractor,
        }
    }
}

/// How to extract rate limit key from request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExtractor {
    /// `ip:<addr>` always
    IpAddress,
    /// `user:<id>` when an authenticated user is attached, else `ip:<addr>`
    UserOrIp,
}

fn client_key(request: &Request, key_extractor: KeyExtractor, ip: IpAddr) -> String {
    match key_extractor {
        KeyExtractor::UserOrIp => match request.extensions().get::<AuthenticatedUser>() {
            Some(user) => format!("user:{}", user.user_id),
            None => format!("ip:{ip}"),
        },
        KeyExtractor::IpAddress => format!("ip:{ip}"),
    }
}

/// Rate limiting middleware function
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = state.resolver.resolve(request.headers(), addr);
    if state.resolver.is_trusted(ip) {
        tracing::trace!(%ip, "Trusted client, rate limit skipped");
        return Ok(next.run(request).await);
    }

    let key = client_key(&request, state.key_extractor, ip);
    if !state.registry.allow(&key) {
        let policy = state.registry.policy();
        tracing::warn!(
            policy = policy.name,
            client = %key,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        return Err(ApiError::too_many_requests(
            policy.code,
            policy.message,
            key,
        ));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::StatusCode;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;
    use crate::data::types::Role;

    fn app(policy: RateLimitPolicy, trusted: &[&str], key_extractor: KeyExtractor) -> Router {
        let state = RateLimitState::new(
            Arc::new(RateLimiterRegistry::new(policy, Duration::from_secs(300))),
            Arc::new(ClientIpResolver::new(
                vec!["X-Forwarded-For".to_string()],
                trusted.iter().map(|n| n.parse().unwrap()).collect(),
            )),
            key_extractor,
        );
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn_with_state(state, rate_limit_middleware))
            .layer(MockConnectInfo(SocketAddr::from(([10, 1, 2, 3], 4000))))
    }

    fn request(forwarded: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/");
        if let Some(ip) = forwarded {
            builder = builder.header("X-Forwarded-For", ip);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_denies_after_burst_with_structured_body() {
        let app = app(RateLimitPolicy::batch(2.0, 5), &[], KeyExtractor::IpAddress);

        for _ in 0..5 {
            let response = app.clone().oneshot(request(None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "BATCH_RATE_LIMIT_EXCEEDED");
        assert_eq!(body["error"]["details"], "ip:10.1.2.3");
    }

    #[tokio::test]
    async fn test_forwarded_clients_have_separate_buckets() {
        let app = app(RateLimitPolicy::login(5.0, 1), &[], KeyExtractor::IpAddress);

        let a = app.clone().oneshot(request(Some("203.0.113.1"))).await.unwrap();
        let b = app.clone().oneshot(request(Some("203.0.113.2"))).await.unwrap();
        let a_again = app.clone().oneshot(request(Some("203.0.113.1"))).await.unwrap();

        assert_eq!(a.status(), StatusCode::OK);
        assert_eq!(b.status(), StatusCode::OK);
        assert_eq!(a_again.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_trusted_network_bypasses_limit() {
        let app = app(
            RateLimitPolicy::batch(2.0, 1),
            &["10.0.0.0/8"],
            KeyExtractor::IpAddress,
        );

        for _ in 0..10 {
            let response = app.clone().oneshot(request(None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[test]
    fn test_client_key_prefers_authenticated_user() {
        let ip: IpAddr = "10.1.2.3".parse().unwrap();
        let mut req = request(None);
        assert_eq!(client_key(&req, KeyExtractor::UserOrIp, ip), "ip:10.1.2.3");

        req.extensions_mut().insert(AuthenticatedUser {
            user_id: 42,
            role: Role::Member,
        });
        assert_eq!(client_key(&req, KeyExtractor::UserOrIp, ip), "user:42");
        assert_eq!(client_key(&req, KeyExtractor::IpAddress, ip), "ip:10.1.2.3");
    }
}
