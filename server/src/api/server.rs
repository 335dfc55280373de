//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::auth::{require_auth, resolve_user};
use super::client_ip::ClientIpResolver;
use super::middleware::{self, AllowedOrigins};
use super::rate_limit::{KeyExtractor, RateLimitState, RateLimiters, rate_limit_middleware};
use super::routes::{
    auth, cli, dashboard, health, languages, projects, transfer, translations, users,
};
use crate::core::CoreApp;
use crate::core::constants::{API_PREFIX, DEFAULT_BODY_LIMIT, IMPORT_BODY_LIMIT};
use crate::data::cache::{CacheService, RateLimiterRegistry};
use crate::domain::DomainServices;

/// Everything the router needs, detached from the process lifecycle
#[derive(Clone)]
pub struct ApiContext {
    pub services: DomainServices,
    pub cache: Arc<CacheService>,
    /// `None` when rate limiting is disabled
    pub rate_limiters: Option<RateLimiters>,
    pub client_ip: Arc<ClientIpResolver>,
    pub allowed_origins: AllowedOrigins,
}

impl ApiContext {
    pub fn from_app(app: &CoreApp) -> Self {
        let rate_limit = &app.config.rate_limit;
        Self {
            services: app.services.clone(),
            cache: app.cache.clone(),
            rate_limiters: rate_limit.enabled.then(|| app.rate_limiters.clone()),
            client_ip: Arc::new(ClientIpResolver::new(
                rate_limit.trusted_headers.clone(),
                rate_limit.trusted_networks.clone(),
            )),
            allowed_origins: AllowedOrigins::new(&app.config.server.host, app.config.server.port),
        }
    }
}

fn rate_limited(
    routes: Router,
    registry: Option<&Arc<RateLimiterRegistry>>,
    resolver: &Arc<ClientIpResolver>,
    key_extractor: KeyExtractor,
) -> Router {
    match registry {
        Some(registry) => routes.layer(from_fn_with_state(
            RateLimitState::new(registry.clone(), resolver.clone(), key_extractor),
            rate_limit_middleware,
        )),
        None => routes,
    }
}

/// Full application router.
///
/// Every request takes a token from the global bucket (keyed by IP), then
/// one from its endpoint class: login by IP, regular and batch endpoints by
/// user when authenticated. Only login and health are reachable without a
/// bearer token.
pub fn router(ctx: &ApiContext) -> Router {
    let services = &ctx.services;
    let limiters = ctx.rate_limiters.as_ref();

    let login_routes = rate_limited(
        auth::routes(services.clone()),
        limiters.map(|l| &l.login),
        &ctx.client_ip,
        KeyExtractor::IpAddress,
    );

    let api_routes = Router::new()
        .nest("/projects", projects::routes(services.clone()))
        .nest("/languages", languages::routes(services.clone()))
        .nest("/translations", translations::routes(services.clone()))
        .nest("/users", users::routes(services.clone()))
        .nest("/dashboard", dashboard::routes(services.clone()))
        .nest("/cli", cli::routes(services.clone()))
        .route_layer(from_fn(require_auth));
    let api_routes = rate_limited(
        api_routes,
        limiters.map(|l| &l.api),
        &ctx.client_ip,
        KeyExtractor::UserOrIp,
    );

    let batch_routes = Router::new()
        .merge(translations::batch_routes(services.clone()))
        .merge(cli::batch_routes(services.clone()))
        .merge(
            transfer::batch_routes(services.clone())
                .layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route_layer(from_fn(require_auth));
    let batch_routes = rate_limited(
        batch_routes,
        limiters.map(|l| &l.batch),
        &ctx.client_ip,
        KeyExtractor::UserOrIp,
    );

    let v1 = Router::new()
        .merge(login_routes)
        .merge(api_routes)
        .merge(batch_routes)
        .merge(health::routes(ctx.cache.clone()));

    let router = Router::new()
        .nest(API_PREFIX, v1)
        .fallback(middleware::handle_404)
        .layer(from_fn_with_state(services.tokens.clone(), resolve_user));

    rate_limited(
        router,
        limiters.map(|l| &l.global),
        &ctx.client_ip,
        KeyExtractor::IpAddress,
    )
    .layer(middleware::cors(&ctx.allowed_origins))
    .layer(TraceLayer::new_for_http())
    .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown is triggered. Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        let shutdown = app.shutdown.clone();
        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);
        let router = router(&ApiContext::from_app(&app));

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "API server listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}
