use clap::Parser;

use std::path::PathBuf;

use super::config::CacheBackendType;
use super::constants::{
    ENV_ADMIN_PASSWORD, ENV_ADMIN_USERNAME, ENV_CACHE_BACKEND, ENV_CACHE_DEFAULT_TTL,
    ENV_CACHE_JITTER_PERCENT, ENV_CACHE_LONG_TTL, ENV_CACHE_MAX_ENTRIES, ENV_CACHE_NEGATIVE_TTL,
    ENV_CACHE_REDIS_URL, ENV_CACHE_SEARCH_TTL, ENV_CONFIG, ENV_HOST, ENV_JWT_SECRET, ENV_PORT,
    ENV_RATE_LIMIT_ENABLED, ENV_RATE_LIMIT_TRUSTED_HEADERS, ENV_RATE_LIMIT_TRUSTED_IPS,
    ENV_TOKEN_TTL,
};

#[derive(Parser)]
#[command(name = "i18n-flow")]
#[command(version, about = "Translation management admin API", long_about = None)]
pub struct Cli {
    /// Server host address
    #[arg(long, short = 'H', env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    // Cache options
    /// Cache backend (memory or redis)
    #[arg(long, env = ENV_CACHE_BACKEND, value_parser = parse_cache_backend_type)]
    pub cache_backend: Option<CacheBackendType>,

    /// Maximum number of cache entries (memory backend)
    #[arg(long, env = ENV_CACHE_MAX_ENTRIES)]
    pub cache_max_entries: Option<u64>,

    /// Redis-compatible cache URL: redis://[user:password@]host:port[/db]
    #[arg(long, env = ENV_CACHE_REDIS_URL)]
    pub cache_redis_url: Option<String>,

    /// Default TTL for cached entities and lists, in seconds
    #[arg(long, env = ENV_CACHE_DEFAULT_TTL)]
    pub cache_default_ttl_secs: Option<u64>,

    /// TTL for expensive aggregates (dashboard), in seconds
    #[arg(long, env = ENV_CACHE_LONG_TTL)]
    pub cache_long_ttl_secs: Option<u64>,

    /// TTL for "not found" markers, in seconds
    #[arg(long, env = ENV_CACHE_NEGATIVE_TTL)]
    pub cache_negative_ttl_secs: Option<u64>,

    /// TTL for keyword searches, in seconds
    #[arg(long, env = ENV_CACHE_SEARCH_TTL)]
    pub cache_search_ttl_secs: Option<u64>,

    /// Random TTL spread in percent (0-50)
    #[arg(long, env = ENV_CACHE_JITTER_PERCENT)]
    pub cache_jitter_percent: Option<u8>,

    // Rate limit options
    /// Enable or disable rate limiting
    #[arg(long, env = ENV_RATE_LIMIT_ENABLED)]
    pub rate_limit_enabled: Option<bool>,

    /// Comma-separated IPs or CIDR blocks exempt from rate limiting
    #[arg(long, env = ENV_RATE_LIMIT_TRUSTED_IPS, value_delimiter = ',')]
    pub rate_limit_trusted_ips: Option<Vec<String>>,

    /// Comma-separated proxy headers carrying the client address
    #[arg(long, env = ENV_RATE_LIMIT_TRUSTED_HEADERS, value_delimiter = ',')]
    pub rate_limit_trusted_headers: Option<Vec<String>>,

    // Auth options
    /// Username of the admin created when no users exist
    #[arg(long, env = ENV_ADMIN_USERNAME)]
    pub admin_username: Option<String>,

    /// Password for that admin (random and logged once when unset)
    #[arg(long, env = ENV_ADMIN_PASSWORD, hide_env_values = true)]
    pub admin_password: Option<String>,

    /// HS256 secret for session tokens (random per process when unset)
    #[arg(long, env = ENV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Session token lifetime, in seconds
    #[arg(long, env = ENV_TOKEN_TTL)]
    pub token_ttl_secs: Option<u64>,
}

/// Parse cache backend type from CLI/env string
fn parse_cache_backend_type(s: &str) -> Result<CacheBackendType, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(CacheBackendType::Memory),
        "redis" => Ok(CacheBackendType::Redis),
        _ => Err(format!(
            "Invalid cache backend '{}'. Valid options: memory, redis",
            s
        )),
    }
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub cache_backend: Option<CacheBackendType>,
    pub cache_max_entries: Option<u64>,
    pub cache_redis_url: Option<String>,
    pub cache_default_ttl_secs: Option<u64>,
    pub cache_long_ttl_secs: Option<u64>,
    pub cache_negative_ttl_secs: Option<u64>,
    pub cache_search_ttl_secs: Option<u64>,
    pub cache_jitter_percent: Option<u8>,
    pub rate_limit_enabled: Option<bool>,
    pub rate_limit_trusted_ips: Option<Vec<String>>,
    pub rate_limit_trusted_headers: Option<Vec<String>>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: Option<u64>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            config: cli.config,
            cache_backend: cli.cache_backend,
            cache_max_entries: cli.cache_max_entries,
            cache_redis_url: cli.cache_redis_url,
            cache_default_ttl_secs: cli.cache_default_ttl_secs,
            cache_long_ttl_secs: cli.cache_long_ttl_secs,
            cache_negative_ttl_secs: cli.cache_negative_ttl_secs,
            cache_search_ttl_secs: cli.cache_search_ttl_secs,
            cache_jitter_percent: cli.cache_jitter_percent,
            rate_limit_enabled: cli.rate_limit_enabled,
            rate_limit_trusted_ips: cli.rate_limit_trusted_ips,
            rate_limit_trusted_headers: cli.rate_limit_trusted_headers,
            admin_username: cli.admin_username,
            admin_password: cli.admin_password,
            jwt_secret: cli.jwt_secret,
            token_ttl_secs: cli.token_ttl_secs,
        }
    }
}

/// Parse CLI arguments
pub fn parse() -> CliConfig {
    Cli::parse().into()
}
