//! Domain logic for translation management
//!
//! - `project`, `language`, `translation`, `user`, `dashboard` - service
//!   traits and their store-backed implementations
//! - `cached` - caching decorators over the same traits
//! - `auth` - password hashing and session tokens
//! - `models` - request and response types shared with the HTTP layer

pub mod auth;
pub mod cached;
pub mod dashboard;
pub mod error;
pub mod language;
pub mod models;
pub mod project;
pub mod translation;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

pub use auth::{JwtTokenIssuer, TokenIssuer};
pub use cached::CacheContext;
pub use dashboard::DashboardService;
pub use error::DomainError;
pub use language::LanguageService;
pub use project::ProjectService;
pub use translation::TranslationService;
pub use user::UserService;

use crate::data::MemoryStore;
use cached::{
    CachedDashboardService, CachedLanguageService, CachedProjectService,
    CachedTranslationService, CachedUserService,
};
use dashboard::BaseDashboardService;
use language::BaseLanguageService;
use project::BaseProjectService;
use translation::BaseTranslationService;
use user::BaseUserService;

/// The services handed to the HTTP layer, each wrapped in its cache decorator
#[derive(Clone)]
pub struct DomainServices {
    pub projects: Arc<dyn ProjectService>,
    pub languages: Arc<dyn LanguageService>,
    pub translations: Arc<dyn TranslationService>,
    pub users: Arc<dyn UserService>,
    pub dashboard: Arc<dyn DashboardService>,
    pub tokens: Arc<dyn TokenIssuer>,
}

/// Session lifetime for services built without explicit auth settings
const EPHEMERAL_TOKEN_TTL: Duration = Duration::from_secs(3600);

impl DomainServices {
    /// Services whose tokens are signed with a random per-process secret
    pub fn new(store: Arc<MemoryStore>, cache: CacheContext) -> Self {
        Self::with_tokens(
            store,
            cache,
            Arc::new(JwtTokenIssuer::ephemeral(EPHEMERAL_TOKEN_TTL)),
        )
    }

    pub fn with_tokens(
        store: Arc<MemoryStore>,
        cache: CacheContext,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        let base_projects: Arc<dyn ProjectService> =
            Arc::new(BaseProjectService::new(store.clone()));
        let projects: Arc<dyn ProjectService> =
            Arc::new(CachedProjectService::new(base_projects, cache.clone()));

        let languages: Arc<dyn LanguageService> = Arc::new(CachedLanguageService::new(
            Arc::new(BaseLanguageService::new(store.clone())),
            cache.clone(),
        ));

        let translations: Arc<dyn TranslationService> = Arc::new(CachedTranslationService::new(
            Arc::new(BaseTranslationService::new(
                store.clone(),
                store.clone(),
                store.clone(),
            )),
            projects.clone(),
            cache.clone(),
        ));

        let users: Arc<dyn UserService> = Arc::new(CachedUserService::new(
            Arc::new(BaseUserService::new(store.clone(), tokens.clone())),
            cache.clone(),
        ));

        let dashboard: Arc<dyn DashboardService> = Arc::new(CachedDashboardService::new(
            Arc::new(BaseDashboardService::new(store)),
            cache,
        ));

        Self {
            projects,
            languages,
            translations,
            users,
            dashboard,
            tokens,
        }
    }
}
