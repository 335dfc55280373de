use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_ADMIN_USERNAME, DEFAULT_CACHE_JITTER_PERCENT,
    DEFAULT_CACHE_LOCK_SWEEP_INTERVAL_SECS, DEFAULT_CACHE_LONG_TTL_SECS,
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_NEGATIVE_TTL_SECS, DEFAULT_CACHE_SEARCH_TTL_SECS,
    DEFAULT_CACHE_TTL_SECS, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RATE_LIMIT_API_BURST,
    DEFAULT_RATE_LIMIT_API_RATE, DEFAULT_RATE_LIMIT_BATCH_BURST, DEFAULT_RATE_LIMIT_BATCH_RATE,
    DEFAULT_RATE_LIMIT_GLOBAL_BURST, DEFAULT_RATE_LIMIT_GLOBAL_RATE,
    DEFAULT_RATE_LIMIT_IDLE_TIMEOUT_SECS, DEFAULT_RATE_LIMIT_LOGIN_BURST,
    DEFAULT_RATE_LIMIT_LOGIN_RATE, DEFAULT_RATE_LIMIT_SWEEP_INTERVAL_SECS,
    DEFAULT_TOKEN_TTL_SECS, DEFAULT_TRUSTED_HEADERS, MAX_CACHE_JITTER_PERCENT, MIN_JWT_SECRET_LEN,
    SHUTDOWN_TIMEOUT_SECS,
};
use crate::data::cache::RateLimitPolicy;

// =============================================================================
// Cache Backend Enum
// =============================================================================

/// Cache store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendType {
    #[default]
    Memory,
    Redis,
}

impl fmt::Display for CacheBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Cache configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CacheFileConfig {
    pub backend: Option<CacheBackendType>,
    pub max_entries: Option<u64>,
    pub redis_url: Option<String>,
    pub default_ttl_secs: Option<u64>,
    pub long_ttl_secs: Option<u64>,
    pub negative_ttl_secs: Option<u64>,
    pub search_ttl_secs: Option<u64>,
    pub jitter_percent: Option<u8>,
    pub lock_sweep_interval_secs: Option<u64>,
}

/// Rate + burst pair for one policy
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PolicyFileConfig {
    /// Tokens per second
    pub rate: Option<f64>,
    /// Bucket capacity
    pub burst: Option<u32>,
}

/// Rate limit configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RateLimitFileConfig {
    pub enabled: Option<bool>,
    pub global: Option<PolicyFileConfig>,
    pub login: Option<PolicyFileConfig>,
    pub api: Option<PolicyFileConfig>,
    pub batch: Option<PolicyFileConfig>,
    pub trusted_headers: Option<Vec<String>>,
    pub trusted_ips: Option<Vec<String>>,
    pub sweep_interval_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

const REDACTED: &str = "<redacted>";

/// Auth configuration section
#[derive(Default, Clone, Deserialize)]
pub struct AuthFileConfig {
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: Option<u64>,
}

impl fmt::Debug for AuthFileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthFileConfig")
            .field("admin_username", &self.admin_username)
            .field("admin_password", &self.admin_password.as_ref().map(|_| REDACTED))
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| REDACTED))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

/// Root of the JSON config file
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub cache: Option<CacheFileConfig>,
    pub rate_limit: Option<RateLimitFileConfig>,
    pub auth: Option<AuthFileConfig>,
    pub shutdown_timeout_secs: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Replace `current` when the overlay carries a value
fn overlay<T>(current: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *current = other;
    }
}

fn overlay_policy(current: &mut Option<PolicyFileConfig>, other: Option<PolicyFileConfig>) {
    if let Some(other) = other {
        let current = current.get_or_insert_with(PolicyFileConfig::default);
        overlay(&mut current.rate, other.rate);
        overlay(&mut current.burst, other.burst);
    }
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown top-level fields
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str = map.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Overlay `other` on top of `self`, field by field
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            overlay(&mut current.host, server.host);
            overlay(&mut current.port, server.port);
        }

        if let Some(cache) = other.cache {
            let current = self.cache.get_or_insert_with(CacheFileConfig::default);
            overlay(&mut current.backend, cache.backend);
            overlay(&mut current.max_entries, cache.max_entries);
            overlay(&mut current.redis_url, cache.redis_url);
            overlay(&mut current.default_ttl_secs, cache.default_ttl_secs);
            overlay(&mut current.long_ttl_secs, cache.long_ttl_secs);
            overlay(&mut current.negative_ttl_secs, cache.negative_ttl_secs);
            overlay(&mut current.search_ttl_secs, cache.search_ttl_secs);
            overlay(&mut current.jitter_percent, cache.jitter_percent);
            overlay(
                &mut current.lock_sweep_interval_secs,
                cache.lock_sweep_interval_secs,
            );
        }

        if let Some(rl) = other.rate_limit {
            let current = self
                .rate_limit
                .get_or_insert_with(RateLimitFileConfig::default);
            overlay(&mut current.enabled, rl.enabled);
            overlay_policy(&mut current.global, rl.global);
            overlay_policy(&mut current.login, rl.login);
            overlay_policy(&mut current.api, rl.api);
            overlay_policy(&mut current.batch, rl.batch);
            overlay(&mut current.trusted_headers, rl.trusted_headers);
            overlay(&mut current.trusted_ips, rl.trusted_ips);
            overlay(&mut current.sweep_interval_secs, rl.sweep_interval_secs);
            overlay(&mut current.idle_timeout_secs, rl.idle_timeout_secs);
        }

        if let Some(auth) = other.auth {
            let current = self.auth.get_or_insert_with(AuthFileConfig::default);
            overlay(&mut current.admin_username, auth.admin_username);
            overlay(&mut current.admin_password, auth.admin_password);
            overlay(&mut current.jwt_secret, auth.jwt_secret);
            overlay(&mut current.token_ttl_secs, auth.token_ttl_secs);
        }

        overlay(&mut self.shutdown_timeout_secs, other.shutdown_timeout_secs);
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Cache store configuration (used by CacheService)
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackendType,
    /// Maximum entries (memory backend)
    pub max_entries: u64,
    /// Redis URL (redis backend)
    pub redis_url: Option<String>,
}

/// TTL policy for cached reads
#[derive(Debug, Clone)]
pub struct CacheTtlConfig {
    pub default_ttl: Duration,
    pub long_ttl: Duration,
    pub negative_ttl: Duration,
    pub search_ttl: Duration,
    pub jitter_percent: u8,
    pub lock_sweep_interval: Duration,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            long_ttl: Duration::from_secs(DEFAULT_CACHE_LONG_TTL_SECS),
            negative_ttl: Duration::from_secs(DEFAULT_CACHE_NEGATIVE_TTL_SECS),
            search_ttl: Duration::from_secs(DEFAULT_CACHE_SEARCH_TTL_SECS),
            jitter_percent: DEFAULT_CACHE_JITTER_PERCENT,
            lock_sweep_interval: Duration::from_secs(DEFAULT_CACHE_LOCK_SWEEP_INTERVAL_SECS),
        }
    }
}

/// Rate limit configuration (final/runtime)
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub global: RateLimitPolicy,
    pub login: RateLimitPolicy,
    pub api: RateLimitPolicy,
    pub batch: RateLimitPolicy,
    /// Proxy headers consulted for the client address, in order
    pub trusted_headers: Vec<String>,
    /// Networks exempt from rate limiting
    pub trusted_networks: Vec<IpNetwork>,
    pub sweep_interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            global: RateLimitPolicy::global(
                DEFAULT_RATE_LIMIT_GLOBAL_RATE,
                DEFAULT_RATE_LIMIT_GLOBAL_BURST,
            ),
            login: RateLimitPolicy::login(
                DEFAULT_RATE_LIMIT_LOGIN_RATE,
                DEFAULT_RATE_LIMIT_LOGIN_BURST,
            ),
            api: RateLimitPolicy::api(DEFAULT_RATE_LIMIT_API_RATE, DEFAULT_RATE_LIMIT_API_BURST),
            batch: RateLimitPolicy::batch(
                DEFAULT_RATE_LIMIT_BATCH_RATE,
                DEFAULT_RATE_LIMIT_BATCH_BURST,
            ),
            trusted_headers: DEFAULT_TRUSTED_HEADERS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            trusted_networks: Vec::new(),
            sweep_interval: Duration::from_secs(DEFAULT_RATE_LIMIT_SWEEP_INTERVAL_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_RATE_LIMIT_IDLE_TIMEOUT_SECS),
        }
    }
}

/// Session tokens and the bootstrap admin account
#[derive(Clone)]
pub struct AuthConfig {
    pub admin_username: String,
    /// `None` generates a random password at bootstrap
    pub admin_password: Option<String>,
    /// `None` signs with a random per-process secret
    pub jwt_secret: Option<String>,
    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            admin_password: None,
            jwt_secret: None,
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_username", &self.admin_username)
            .field("admin_password", &self.admin_password.as_ref().map(|_| REDACTED))
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| REDACTED))
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub cache_ttl: CacheTtlConfig,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
    pub shutdown_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.i18n-flow/i18n-flow.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::from_layers(file_config, cli)?;
        config.validate()?;
        Ok(config)
    }

    /// Layer defaults, file config and CLI/env overrides
    fn from_layers(file_config: FileConfig, cli: &CliConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_cache = file_config.cache.unwrap_or_default();
        let file_rl = file_config.rate_limit.unwrap_or_default();
        let file_auth = file_config.auth.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let cache = CacheConfig {
            backend: cli.cache_backend.or(file_cache.backend).unwrap_or_default(),
            max_entries: cli
                .cache_max_entries
                .or(file_cache.max_entries)
                .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
            redis_url: cli
                .cache_redis_url
                .clone()
                .or(file_cache.redis_url)
                .filter(|url| !url.is_empty()),
        };

        let ttl_defaults = CacheTtlConfig::default();
        let secs_or = |value: Option<u64>, default: Duration| {
            value.map(Duration::from_secs).unwrap_or(default)
        };
        let cache_ttl = CacheTtlConfig {
            default_ttl: secs_or(
                cli.cache_default_ttl_secs.or(file_cache.default_ttl_secs),
                ttl_defaults.default_ttl,
            ),
            long_ttl: secs_or(
                cli.cache_long_ttl_secs.or(file_cache.long_ttl_secs),
                ttl_defaults.long_ttl,
            ),
            negative_ttl: secs_or(
                cli.cache_negative_ttl_secs.or(file_cache.negative_ttl_secs),
                ttl_defaults.negative_ttl,
            ),
            search_ttl: secs_or(
                cli.cache_search_ttl_secs.or(file_cache.search_ttl_secs),
                ttl_defaults.search_ttl,
            ),
            jitter_percent: cli
                .cache_jitter_percent
                .or(file_cache.jitter_percent)
                .unwrap_or(ttl_defaults.jitter_percent),
            lock_sweep_interval: secs_or(
                file_cache.lock_sweep_interval_secs,
                ttl_defaults.lock_sweep_interval,
            ),
        };

        let rl_defaults = RateLimitConfig::default();
        let policy = |file: Option<PolicyFileConfig>, default: RateLimitPolicy| {
            let file = file.unwrap_or_default();
            RateLimitPolicy {
                rate: file.rate.unwrap_or(default.rate),
                burst: file.burst.unwrap_or(default.burst),
                ..default
            }
        };

        let trusted_ips = cli
            .rate_limit_trusted_ips
            .clone()
            .or(file_rl.trusted_ips)
            .unwrap_or_default();
        let trusted_networks = trusted_ips
            .iter()
            .map(|raw| parse_network(raw))
            .collect::<Result<Vec<_>>>()?;

        let rate_limit = RateLimitConfig {
            enabled: cli
                .rate_limit_enabled
                .or(file_rl.enabled)
                .unwrap_or(rl_defaults.enabled),
            global: policy(file_rl.global, rl_defaults.global),
            login: policy(file_rl.login, rl_defaults.login),
            api: policy(file_rl.api, rl_defaults.api),
            batch: policy(file_rl.batch, rl_defaults.batch),
            trusted_headers: cli
                .rate_limit_trusted_headers
                .clone()
                .or(file_rl.trusted_headers)
                .unwrap_or(rl_defaults.trusted_headers),
            trusted_networks,
            sweep_interval: secs_or(file_rl.sweep_interval_secs, rl_defaults.sweep_interval),
            idle_timeout: secs_or(file_rl.idle_timeout_secs, rl_defaults.idle_timeout),
        };

        let auth_defaults = AuthConfig::default();
        let auth = AuthConfig {
            admin_username: cli
                .admin_username
                .clone()
                .or(file_auth.admin_username)
                .unwrap_or(auth_defaults.admin_username),
            admin_password: cli
                .admin_password
                .clone()
                .or(file_auth.admin_password)
                .filter(|p| !p.is_empty()),
            jwt_secret: cli
                .jwt_secret
                .clone()
                .or(file_auth.jwt_secret)
                .filter(|s| !s.is_empty()),
            token_ttl: secs_or(
                cli.token_ttl_secs.or(file_auth.token_ttl_secs),
                auth_defaults.token_ttl,
            ),
        };

        Ok(Self {
            server,
            cache,
            cache_ttl,
            rate_limit,
            auth,
            shutdown_timeout: Duration::from_secs(
                file_config
                    .shutdown_timeout_secs
                    .unwrap_or(SHUTDOWN_TIMEOUT_SECS),
            ),
        })
    }

    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.cache.backend == CacheBackendType::Redis && self.cache.redis_url.is_none() {
            anyhow::bail!(
                "Configuration error: cache.redis_url is required when cache.backend is 'redis'"
            );
        }

        let ttl = &self.cache_ttl;
        if ttl.jitter_percent > MAX_CACHE_JITTER_PERCENT {
            anyhow::bail!(
                "Configuration error: cache.jitter_percent must be between 0 and {}",
                MAX_CACHE_JITTER_PERCENT
            );
        }
        if ttl.negative_ttl.is_zero() {
            anyhow::bail!("Configuration error: cache.negative_ttl_secs must be greater than 0");
        }
        // Negative entries must expire before the shortest jittered positive entry
        let floor = 1.0 - f64::from(ttl.jitter_percent) / 100.0;
        for (name, positive) in [
            ("default_ttl_secs", ttl.default_ttl),
            ("search_ttl_secs", ttl.search_ttl),
        ] {
            if ttl.negative_ttl.as_secs_f64() >= positive.as_secs_f64() * floor {
                anyhow::bail!(
                    "Configuration error: cache.negative_ttl_secs ({}) must be shorter than cache.{} ({}) minus jitter",
                    ttl.negative_ttl.as_secs(),
                    name,
                    positive.as_secs()
                );
            }
        }
        if ttl.long_ttl < ttl.default_ttl {
            anyhow::bail!("Configuration error: cache.long_ttl_secs must be >= cache.default_ttl_secs");
        }
        if ttl.lock_sweep_interval.is_zero() {
            anyhow::bail!(
                "Configuration error: cache.lock_sweep_interval_secs must be greater than 0"
            );
        }

        let rl = &self.rate_limit;
        for policy in [&rl.global, &rl.login, &rl.api, &rl.batch] {
            if !policy.rate.is_finite() || policy.rate <= 0.0 {
                anyhow::bail!(
                    "Configuration error: rate_limit.{}.rate must be greater than 0",
                    policy.name
                );
            }
            if policy.burst == 0 {
                anyhow::bail!(
                    "Configuration error: rate_limit.{}.burst must be greater than 0",
                    policy.name
                );
            }
        }
        if rl.sweep_interval.is_zero() || rl.idle_timeout.is_zero() {
            anyhow::bail!(
                "Configuration error: rate_limit.sweep_interval_secs and idle_timeout_secs must be greater than 0"
            );
        }
        if rl.trusted_headers.iter().any(|h| h.trim().is_empty()) {
            anyhow::bail!("Configuration error: rate_limit.trusted_headers must not contain empty names");
        }

        let auth = &self.auth;
        if !(3..=50).contains(&auth.admin_username.trim().len()) {
            anyhow::bail!("Configuration error: auth.admin_username must be 3-50 characters");
        }
        if auth.admin_password.as_ref().is_some_and(|p| !(6..=128).contains(&p.len())) {
            anyhow::bail!("Configuration error: auth.admin_password must be 6-128 characters");
        }
        if auth
            .jwt_secret
            .as_ref()
            .is_some_and(|s| s.len() < MIN_JWT_SECRET_LEN)
        {
            anyhow::bail!(
                "Configuration error: auth.jwt_secret must be at least {} bytes",
                MIN_JWT_SECRET_LEN
            );
        }
        if auth.token_ttl.is_zero() {
            anyhow::bail!("Configuration error: auth.token_ttl_secs must be greater than 0");
        }

        Ok(())
    }
}

/// Parse a CIDR block or a single address (taken as a host network)
fn parse_network(raw: &str) -> Result<IpNetwork> {
    raw.trim()
        .parse::<IpNetwork>()
        .with_context(|| format!("Configuration error: invalid trusted IP or CIDR '{raw}'"))
}

/// Get the profile config path (~/.i18n-flow/i18n-flow.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn load_with_file(json: &str, cli: CliConfig) -> Result<AppConfig> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..cli
        };
        AppConfig::load(&cli)
    }

    #[test]
    fn test_cache_backend_serde() {
        let backend: CacheBackendType = serde_json::from_str(r#""redis""#).unwrap();
        assert_eq!(backend, CacheBackendType::Redis);
        assert_eq!(CacheBackendType::Memory.to_string(), "memory");
    }

    #[test]
    fn test_file_config_parse() {
        let json = r#"{
            "server": { "host": "0.0.0.0", "port": 9000 },
            "cache": { "backend": "memory", "jitter_percent": 5 },
            "rate_limit": {
                "login": { "rate": 1.5, "burst": 3 },
                "trusted_ips": ["10.0.0.0/8", "127.0.0.1"]
            },
            "unknown_section": true
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.server.as_ref().unwrap().port, Some(9000));
        assert_eq!(config.cache.as_ref().unwrap().jitter_percent, Some(5));
        let rl = config.rate_limit.as_ref().unwrap();
        assert_eq!(rl.login.as_ref().unwrap().burst, Some(3));
        assert_eq!(rl.trusted_ips.as_ref().unwrap().len(), 2);
        assert!(config.extra.get("unknown_section").is_some());
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{
                "server": { "host": "base.host", "port": 1000 },
                "rate_limit": { "api": { "rate": 10, "burst": 20 } }
            }"#,
        )
        .unwrap();
        let overlay: FileConfig = serde_json::from_str(
            r#"{
                "server": { "port": 2000 },
                "rate_limit": { "api": { "burst": 40 } }
            }"#,
        )
        .unwrap();

        base.merge(overlay);

        let server = base.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("base.host"));
        assert_eq!(server.port, Some(2000));
        let api = base.rate_limit.unwrap().api.unwrap();
        assert_eq!(api.rate, Some(10.0));
        assert_eq!(api.burst, Some(40));
    }

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::from_layers(FileConfig::default(), &CliConfig::default()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.cache.backend, CacheBackendType::Memory);
        assert_eq!(config.cache_ttl.default_ttl, Duration::from_secs(1800));
        assert_eq!(config.cache_ttl.long_ttl, Duration::from_secs(43_200));
        assert_eq!(config.cache_ttl.negative_ttl, Duration::from_secs(60));
        assert_eq!(config.cache_ttl.jitter_percent, 10);
        assert_eq!((config.rate_limit.global.burst, config.rate_limit.global.rate), (200, 100.0));
        assert_eq!((config.rate_limit.login.burst, config.rate_limit.login.rate), (10, 5.0));
        assert_eq!(config.rate_limit.trusted_headers, vec!["X-Real-IP", "X-Forwarded-For"]);
        assert_eq!(config.rate_limit.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.auth.admin_username, "admin");
        assert_eq!(config.auth.admin_password, None);
        assert_eq!(config.auth.token_ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = CliConfig {
            port: Some(3000),
            cache_jitter_percent: Some(20),
            rate_limit_trusted_ips: Some(vec!["192.168.0.0/16".to_string()]),
            ..Default::default()
        };
        let config = load_with_file(
            r#"{
                "server": { "port": 9000, "host": "file.host" },
                "cache": { "jitter_percent": 5 },
                "rate_limit": { "trusted_ips": ["10.0.0.1"], "batch": { "burst": 8 } }
            }"#,
            cli,
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "file.host");
        assert_eq!(config.cache_ttl.jitter_percent, 20);
        assert_eq!(config.rate_limit.batch.burst, 8);
        assert_eq!(config.rate_limit.batch.code, "BATCH_RATE_LIMIT_EXCEEDED");
        assert_eq!(config.rate_limit.trusted_networks.len(), 1);
        assert_eq!(
            config.rate_limit.trusted_networks[0],
            "192.168.0.0/16".parse::<IpNetwork>().unwrap()
        );
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/i18n-flow.json")),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_validation_negative_ttl_must_expire_first() {
        let err = load_with_file(
            r#"{ "cache": { "negative_ttl_secs": 280, "search_ttl_secs": 300 } }"#,
            CliConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("negative_ttl_secs"));
    }

    #[test]
    fn test_validation_jitter_range() {
        let cli = CliConfig {
            cache_jitter_percent: Some(80),
            ..Default::default()
        };
        let err = load_with_file("{}", cli).unwrap_err();
        assert!(err.to_string().contains("jitter_percent"));
    }

    #[test]
    fn test_validation_invalid_trusted_ip() {
        let err = load_with_file(
            r#"{ "rate_limit": { "trusted_ips": ["not-an-ip"] } }"#,
            CliConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not-an-ip"));
    }

    #[test]
    fn test_validation_zero_burst() {
        let err = load_with_file(
            r#"{ "rate_limit": { "login": { "burst": 0 } } }"#,
            CliConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("rate_limit.login.burst"));
    }

    #[test]
    fn test_validation_redis_requires_url() {
        let cli = CliConfig {
            cache_backend: Some(CacheBackendType::Redis),
            ..Default::default()
        };
        let err = load_with_file("{}", cli).unwrap_err();
        assert!(err.to_string().contains("redis_url"));
    }

    #[test]
    fn test_auth_section() {
        let cli = CliConfig {
            admin_password: Some("from-env-pw".to_string()),
            ..Default::default()
        };
        let config = load_with_file(
            r#"{
                "auth": {
                    "admin_username": "root",
                    "admin_password": "from-file-pw",
                    "jwt_secret": "0123456789abcdef0123456789abcdef",
                    "token_ttl_secs": 600
                }
            }"#,
            cli,
        )
        .unwrap();

        assert_eq!(config.auth.admin_username, "root");
        assert_eq!(config.auth.admin_password.as_deref(), Some("from-env-pw"));
        assert_eq!(config.auth.token_ttl, Duration::from_secs(600));

        let debug = format!("{:?}", config.auth);
        assert!(!debug.contains("from-env-pw"));
        assert!(!debug.contains("0123456789abcdef"));
    }

    #[test]
    fn test_validation_short_jwt_secret() {
        let err = load_with_file(
            r#"{ "auth": { "jwt_secret": "short" } }"#,
            CliConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("auth.jwt_secret"));
    }
}
