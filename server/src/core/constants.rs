// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "i18n-flow";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".i18n-flow";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "i18n-flow.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "I18N_FLOW_CONFIG";

// =============================================================================
// Server
// =============================================================================

pub const ENV_HOST: &str = "I18N_FLOW_HOST";
pub const ENV_PORT: &str = "I18N_FLOW_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "I18N_FLOW_LOG";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// API path prefix
pub const API_PREFIX: &str = "/api/v1";

/// Request body limit for regular endpoints (1 MB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Request body limit for project imports (16 MB)
pub const IMPORT_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Default log filter when neither env var is set
pub const DEFAULT_LOG_FILTER: &str = "i18n_flow_server=info,tower_http=warn";

// =============================================================================
// Shutdown
// =============================================================================

/// Max time to wait for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Cache
// =============================================================================

pub const ENV_CACHE_BACKEND: &str = "I18N_FLOW_CACHE_BACKEND";
pub const ENV_CACHE_MAX_ENTRIES: &str = "I18N_FLOW_CACHE_MAX_ENTRIES";
pub const ENV_CACHE_REDIS_URL: &str = "I18N_FLOW_CACHE_REDIS_URL";
pub const ENV_CACHE_DEFAULT_TTL: &str = "I18N_FLOW_CACHE_DEFAULT_TTL_SECS";
pub const ENV_CACHE_LONG_TTL: &str = "I18N_FLOW_CACHE_LONG_TTL_SECS";
pub const ENV_CACHE_NEGATIVE_TTL: &str = "I18N_FLOW_CACHE_NEGATIVE_TTL_SECS";
pub const ENV_CACHE_SEARCH_TTL: &str = "I18N_FLOW_CACHE_SEARCH_TTL_SECS";
pub const ENV_CACHE_JITTER_PERCENT: &str = "I18N_FLOW_CACHE_JITTER_PERCENT";

pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 100_000;

/// Regular entities and lists (30 min)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 1800;

/// Expensive aggregates such as dashboard stats (12 h)
pub const DEFAULT_CACHE_LONG_TTL_SECS: u64 = 43_200;

/// "Confirmed absent" markers (1 min)
pub const DEFAULT_CACHE_NEGATIVE_TTL_SECS: u64 = 60;

/// Keyword-filtered translation matrices (5 min)
pub const DEFAULT_CACHE_SEARCH_TTL_SECS: u64 = 300;

/// TTL spread applied to positive entries, in percent
pub const DEFAULT_CACHE_JITTER_PERCENT: u8 = 10;

/// Upper bound accepted for the jitter setting
pub const MAX_CACHE_JITTER_PERCENT: u8 = 50;

/// How often orphaned per-key locks are swept
pub const DEFAULT_CACHE_LOCK_SWEEP_INTERVAL_SECS: u64 = 60;

// =============================================================================
// Rate Limiting
// =============================================================================

pub const ENV_RATE_LIMIT_ENABLED: &str = "I18N_FLOW_RATE_LIMIT_ENABLED";
pub const ENV_RATE_LIMIT_TRUSTED_IPS: &str = "I18N_FLOW_RATE_LIMIT_TRUSTED_IPS";
pub const ENV_RATE_LIMIT_TRUSTED_HEADERS: &str = "I18N_FLOW_RATE_LIMIT_TRUSTED_HEADERS";

pub const DEFAULT_RATE_LIMIT_GLOBAL_RATE: f64 = 100.0;
pub const DEFAULT_RATE_LIMIT_GLOBAL_BURST: u32 = 200;
pub const DEFAULT_RATE_LIMIT_LOGIN_RATE: f64 = 5.0;
pub const DEFAULT_RATE_LIMIT_LOGIN_BURST: u32 = 10;
pub const DEFAULT_RATE_LIMIT_API_RATE: f64 = 50.0;
pub const DEFAULT_RATE_LIMIT_API_BURST: u32 = 100;
pub const DEFAULT_RATE_LIMIT_BATCH_RATE: f64 = 2.0;
pub const DEFAULT_RATE_LIMIT_BATCH_BURST: u32 = 5;

/// Headers consulted (in order) for the client address behind a proxy
pub const DEFAULT_TRUSTED_HEADERS: &[&str] = &["X-Real-IP", "X-Forwarded-For"];

pub const DEFAULT_RATE_LIMIT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_RATE_LIMIT_IDLE_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// Authentication
// =============================================================================

pub const ENV_ADMIN_USERNAME: &str = "I18N_FLOW_ADMIN_USERNAME";
pub const ENV_ADMIN_PASSWORD: &str = "I18N_FLOW_ADMIN_PASSWORD";
pub const ENV_JWT_SECRET: &str = "I18N_FLOW_JWT_SECRET";
pub const ENV_TOKEN_TTL: &str = "I18N_FLOW_TOKEN_TTL_SECS";

/// Username of the admin seeded into an empty store
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Session token lifetime (24 hours)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;

/// HS256 secrets shorter than this are rejected
pub const MIN_JWT_SECRET_LEN: usize = 32;

// =============================================================================
// Pagination
// =============================================================================

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 1000;
