//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::api::rate_limit::RateLimiters;
use crate::core::cli::{self, CliConfig};
use crate::core::config::{AppConfig, AuthConfig};
use crate::core::constants::{DEFAULT_LOG_FILTER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::MemoryStore;
use crate::data::cache::{CacheAsideService, CacheService, InvalidationCoordinator, MutexRegistry};
use crate::domain::auth::generate_password;
use crate::domain::{CacheContext, DomainServices, JwtTokenIssuer, TokenIssuer};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub cache: Arc<CacheService>,
    pub locks: Arc<MutexRegistry>,
    pub services: DomainServices,
    pub rate_limiters: RateLimiters,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let cli_config = cli::parse();
        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let cache = Arc::new(
            CacheService::new(&config.cache)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize cache service: {}", e))?,
        );
        tracing::debug!(backend = cache.backend_name(), "Cache initialized");

        if let Err(e) = cache.health_check().await {
            // Reads fall through to the store while the cache is down
            tracing::warn!(error = %e, "Cache store unreachable at startup");
        }

        Self::with_cache(config, cache).await
    }

    /// Assemble the app around an existing cache. The store starts empty, so
    /// every entry a previous process left in the cache is dropped first.
    async fn with_cache(config: AppConfig, cache: Arc<CacheService>) -> Result<Self> {
        let purged = cache
            .purge_owned_keys()
            .await
            .context("Failed to purge stale cache entries")?;
        tracing::debug!(purged, "Stale cache entries purged");

        let locks = Arc::new(MutexRegistry::new());
        let aside = Arc::new(CacheAsideService::new(
            cache.clone(),
            locks.clone(),
            config.cache_ttl.jitter_percent,
        ));
        let invalidation = Arc::new(InvalidationCoordinator::new(cache.clone()));
        let cache_ctx = CacheContext::new(aside, invalidation, config.cache_ttl.clone());

        let tokens: Arc<dyn TokenIssuer> = match &config.auth.jwt_secret {
            Some(secret) => Arc::new(JwtTokenIssuer::new(secret.as_bytes(), config.auth.token_ttl)),
            None => {
                tracing::debug!("No JWT secret configured, signing with a per-process key");
                Arc::new(JwtTokenIssuer::ephemeral(config.auth.token_ttl))
            }
        };
        let services =
            DomainServices::with_tokens(Arc::new(MemoryStore::new()), cache_ctx, tokens);
        Self::bootstrap_admin(&services, &config.auth).await?;

        let rate_limiters = RateLimiters::new(&config.rate_limit);
        let shutdown = ShutdownService::new(config.shutdown_timeout);

        Ok(Self {
            shutdown,
            config,
            cache,
            locks,
            services,
            rate_limiters,
        })
    }

    /// Seed the configured admin when no users exist
    async fn bootstrap_admin(services: &DomainServices, auth: &AuthConfig) -> Result<()> {
        let (password, generated) = match &auth.admin_password {
            Some(password) => (password.clone(), false),
            None => (generate_password(), true),
        };

        let admin = services
            .users
            .bootstrap_admin(&auth.admin_username, &password)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create admin account: {}", e))?;

        match admin {
            Some(admin) if generated => tracing::warn!(
                username = %admin.username,
                password = %password,
                "Created admin account with a generated password, change it after first login"
            ),
            Some(admin) => tracing::info!(username = %admin.username, "Created admin account"),
            None => tracing::debug!("Users exist, skipping admin bootstrap"),
        }
        Ok(())
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        tracing::info!(
            host = %app.config.server.host,
            port = app.config.server.port,
            cache = app.cache.backend_name(),
            rate_limit = app.config.rate_limit.enabled,
            "Starting i18n-flow"
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    /// Spawn the sweepers for per-key locks and idle rate limit buckets
    pub async fn start_background_tasks(&self) {
        self.shutdown
            .register(self.locks.start_sweep_task(
                self.config.cache_ttl.lock_sweep_interval,
                self.shutdown.subscribe(),
            ))
            .await;

        if self.config.rate_limit.enabled {
            for registry in self.rate_limiters.all() {
                self.shutdown
                    .register(registry.start_sweep_task(
                        self.config.rate_limit.sweep_interval,
                        self.shutdown.subscribe(),
                    ))
                    .await;
            }
        }

        tracing::debug!("Background tasks started");
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::core::config::{CacheBackendType, CacheConfig};
    use crate::data::types::Role;
    use crate::domain::models::LoginRequest;

    fn config(json: &str) -> AppConfig {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        AppConfig::load(&CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap()
    }

    async fn memory_cache() -> Arc<CacheService> {
        let config = CacheConfig {
            backend: CacheBackendType::Memory,
            max_entries: 1000,
            redis_url: None,
        };
        Arc::new(CacheService::new(&config).await.unwrap())
    }

    #[tokio::test]
    async fn test_startup_drops_entries_from_previous_process() {
        let cache = memory_cache().await;
        let stale = br#"{"id":1,"name":"Ghost","slug":"ghost","description":"","status":"active","created_at":0,"updated_at":0}"#;
        cache.set_raw("project:1", stale.to_vec(), None).await.unwrap();
        cache.set_raw("projects:10:0", b"[]".to_vec(), None).await.unwrap();

        let app = CoreApp::with_cache(config("{}"), cache.clone()).await.unwrap();

        assert!(!cache.exists("project:1").await.unwrap());
        assert!(!cache.exists("projects:10:0").await.unwrap());
        let err = app.services.projects.get_by_id(1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_startup_seeds_configured_admin() {
        let app = CoreApp::with_cache(
            config(r#"{ "auth": { "admin_username": "root", "admin_password": "root-password" } }"#),
            memory_cache().await,
        )
        .await
        .unwrap();

        let page = app.services.users.list(10, 0, None).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].username, "root");
        assert_eq!(page.items[0].role, Role::Admin);

        let login = app
            .services
            .users
            .login(LoginRequest {
                username: "root".to_string(),
                password: "root-password".to_string(),
            })
            .await
            .unwrap();
        let subject = app.services.tokens.resolve(&login.token).unwrap();
        assert_eq!(subject.role, Role::Admin);
    }
}
