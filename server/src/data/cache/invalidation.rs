//! Post-mutation cache invalidation
//!
//! A fixed table maps (entity, mutation) to key templates. `{id}` in a
//! template is replaced by the entity id, which for translations is the
//! owning project id. Deletes are best-effort: failures are logged and the
//! stale entry ages out with its TTL.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;

use super::CacheService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Translation,
    Language,
    Project,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    Create,
    Update,
    Delete,
    /// Batch create, batch delete, upsert and import
    Batch,
}

/// Key template to delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyTarget {
    Exact(&'static str),
    Pattern(&'static str),
}

const TRANSLATION_TARGETS: &[KeyTarget] = &[
    KeyTarget::Exact("translation:{id}"),
    KeyTarget::Pattern("translation:{id}:*"),
    KeyTarget::Exact("translation_matrix:{id}"),
    KeyTarget::Pattern("translation_matrix:{id}:*"),
    KeyTarget::Exact("dashboard:stats"),
];

// A language change reshapes every project's matrix
const LANGUAGE_TARGETS: &[KeyTarget] = &[
    KeyTarget::Exact("languages"),
    KeyTarget::Pattern("translation_matrix:*"),
    KeyTarget::Exact("dashboard:stats"),
];

const PROJECT_TARGETS: &[KeyTarget] = &[
    KeyTarget::Exact("project:{id}"),
    KeyTarget::Exact("projects"),
    KeyTarget::Pattern("projects:*"),
    KeyTarget::Exact("dashboard:stats"),
];

// Create is included to drop a negative entry recorded before the id existed
const USER_TARGETS: &[KeyTarget] = &[KeyTarget::Exact("user:{id}")];

pub struct InvalidationCoordinator {
    cache: Arc<CacheService>,
}

impl InvalidationCoordinator {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }

    /// Key templates cleared by a mutation
    pub fn targets(entity: EntityKind, mutation: Mutation) -> &'static [KeyTarget] {
        match (entity, mutation) {
            (EntityKind::Translation, _) => TRANSLATION_TARGETS,
            (EntityKind::Language, Mutation::Create | Mutation::Update | Mutation::Delete) => {
                LANGUAGE_TARGETS
            }
            (EntityKind::Project, Mutation::Create | Mutation::Update | Mutation::Delete) => {
                PROJECT_TARGETS
            }
            (EntityKind::User, Mutation::Create | Mutation::Update | Mutation::Delete) => {
                USER_TARGETS
            }
            (_, Mutation::Batch) => &[],
        }
    }

    pub async fn invalidate(&self, entity: EntityKind, mutation: Mutation, id: u64) {
        self.invalidate_many(entity, mutation, [id]).await;
    }

    /// Invalidate for several ids at once (batch operations spanning projects).
    pub async fn invalidate_many(
        &self,
        entity: EntityKind,
        mutation: Mutation,
        ids: impl IntoIterator<Item = u64>,
    ) {
        let targets = Self::targets(entity, mutation);
        let mut expanded = BTreeSet::new();
        for id in ids {
            let id = id.to_string();
            for target in targets {
                expanded.insert(match target {
                    KeyTarget::Exact(t) => (false, t.replace("{id}", &id)),
                    KeyTarget::Pattern(t) => (true, t.replace("{id}", &id)),
                });
            }
        }

        if expanded.is_empty() {
            return;
        }

        tracing::debug!(
            entity = ?entity,
            mutation = ?mutation,
            keys = expanded.len(),
            "Invalidating cache"
        );

        join_all(expanded.iter().map(|(is_pattern, key)| async move {
            if *is_pattern {
                self.cache.invalidate_pattern(key).await;
            } else {
                self.cache.invalidate_key(key).await;
            }
        }))
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CacheBackendType, CacheConfig};
    use crate::data::cache::testing::FailingBackend;

    async fn seeded() -> (Arc<CacheService>, InvalidationCoordinator) {
        let config = CacheConfig {
            backend: CacheBackendType::Memory,
            max_entries: 1000,
            redis_url: None,
        };
        let cache = Arc::new(CacheService::new(&config).await.unwrap());
        for key in [
            "translation:5:50:0",
            "translation:50:50:0",
            "translation_matrix:5:all:0",
            "translation_matrix:5:login:10:0",
            "translation_matrix:50:all:0",
            "dashboard:stats",
            "languages",
            "project:5",
            "project:50",
            "projects:10:0",
            "projects:search:web:10:0",
            "user:5",
            "user:50",
        ] {
            cache.set_raw(key, b"1".to_vec(), None).await.unwrap();
        }
        let coordinator = InvalidationCoordinator::new(Arc::clone(&cache));
        (cache, coordinator)
    }

    async fn remaining(cache: &CacheService, keys: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for key in keys {
            if cache.exists(key).await.unwrap() {
                out.push(key.to_string());
            }
        }
        out
    }

    #[tokio::test]
    async fn test_translation_mutation_scopes_to_project() {
        let (cache, coordinator) = seeded().await;
        coordinator
            .invalidate(EntityKind::Translation, Mutation::Update, 5)
            .await;

        let left = remaining(
            &cache,
            &[
                "translation:5:50:0",
                "translation:50:50:0",
                "translation_matrix:5:all:0",
                "translation_matrix:5:login:10:0",
                "translation_matrix:50:all:0",
                "dashboard:stats",
                "languages",
            ],
        )
        .await;
        assert_eq!(
            left,
            vec!["translation:50:50:0", "translation_matrix:50:all:0", "languages"]
        );
    }

    #[tokio::test]
    async fn test_language_mutation_clears_every_matrix() {
        let (cache, coordinator) = seeded().await;
        coordinator
            .invalidate(EntityKind::Language, Mutation::Delete, 3)
            .await;

        let left = remaining(
            &cache,
            &[
                "translation:5:50:0",
                "translation_matrix:5:all:0",
                "translation_matrix:50:all:0",
                "dashboard:stats",
                "languages",
                "projects:10:0",
            ],
        )
        .await;
        assert_eq!(left, vec!["translation:5:50:0", "projects:10:0"]);
    }

    #[tokio::test]
    async fn test_project_mutation() {
        let (cache, coordinator) = seeded().await;
        coordinator
            .invalidate(EntityKind::Project, Mutation::Update, 5)
            .await;

        let left = remaining(
            &cache,
            &[
                "project:5",
                "project:50",
                "projects:10:0",
                "projects:search:web:10:0",
                "dashboard:stats",
                "translation_matrix:5:all:0",
            ],
        )
        .await;
        assert_eq!(left, vec!["project:50", "translation_matrix:5:all:0"]);
    }

    #[tokio::test]
    async fn test_user_mutation_touches_only_profile() {
        let (cache, coordinator) = seeded().await;
        coordinator
            .invalidate(EntityKind::User, Mutation::Delete, 5)
            .await;

        let left = remaining(&cache, &["user:5", "user:50", "dashboard:stats"]).await;
        assert_eq!(left, vec!["user:50", "dashboard:stats"]);
    }

    #[tokio::test]
    async fn test_batch_spanning_projects() {
        let (cache, coordinator) = seeded().await;
        coordinator
            .invalidate_many(EntityKind::Translation, Mutation::Batch, [5, 50, 5])
            .await;

        let left = remaining(
            &cache,
            &["translation:5:50:0", "translation:50:50:0", "translation_matrix:50:all:0"],
        )
        .await;
        assert!(left.is_empty());
    }

    #[test]
    fn test_rule_table() {
        assert!(InvalidationCoordinator::targets(EntityKind::Project, Mutation::Batch).is_empty());
        assert_eq!(
            InvalidationCoordinator::targets(EntityKind::Translation, Mutation::Batch),
            TRANSLATION_TARGETS
        );
        assert!(
            !InvalidationCoordinator::targets(EntityKind::User, Mutation::Update)
                .contains(&KeyTarget::Exact("dashboard:stats"))
        );
    }

    #[tokio::test]
    async fn test_store_outage_is_silent() {
        let cache = Arc::new(CacheService::with_backend(Arc::new(FailingBackend)));
        let coordinator = InvalidationCoordinator::new(cache);
        coordinator
            .invalidate(EntityKind::Language, Mutation::Create, 1)
            .await;
    }
}
