use std::sync::Arc;

use async_trait::async_trait;

use super::{CacheContext, found};
use crate::data::cache::{CacheKey, EntityKind, Mutation};
use crate::domain::error::DomainError;
use crate::domain::models::{
    CreateUserRequest, LoginRequest, LoginResponse, Page, UpdateUserRequest, User,
};
use crate::domain::user::UserService;

/// Caches user profiles by id. Lists and login always hit the store.
pub struct CachedUserService {
    inner: Arc<dyn UserService>,
    ctx: CacheContext,
}

impl CachedUserService {
    pub fn new(inner: Arc<dyn UserService>, ctx: CacheContext) -> Self {
        Self { inner, ctx }
    }
}

#[async_trait]
impl UserService for CachedUserService {
    async fn create(&self, req: CreateUserRequest) -> Result<User, DomainError> {
        let user = self.inner.create(req).await?;
        self.ctx
            .invalidation
            .invalidate(EntityKind::User, Mutation::Create, user.id)
            .await;
        Ok(user)
    }

    async fn get_by_id(&self, id: u64) -> Result<User, DomainError> {
        let key = CacheKey::user(id);
        self.ctx
            .aside
            .get_or_load(&key, self.ctx.default_policy(), move || async move {
                found(self.inner.get_by_id(id).await)
            })
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {id}")))
    }

    async fn list(
        &self,
        limit: u32,
        offset: u32,
        keyword: Option<&str>,
    ) -> Result<Page<User>, DomainError> {
        self.inner.list(limit, offset, keyword).await
    }

    async fn update(&self, id: u64, req: UpdateUserRequest) -> Result<User, DomainError> {
        let user = self.inner.update(id, req).await?;
        self.ctx
            .invalidation
            .invalidate(EntityKind::User, Mutation::Update, id)
            .await;
        Ok(user)
    }

    async fn delete(&self, id: u64) -> Result<(), DomainError> {
        self.inner.delete(id).await?;
        self.ctx
            .invalidation
            .invalidate(EntityKind::User, Mutation::Delete, id)
            .await;
        Ok(())
    }

    async fn login(&self, req: LoginRequest) -> Result<LoginResponse, DomainError> {
        self.inner.login(req).await
    }

    async fn bootstrap_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError> {
        let admin = self.inner.bootstrap_admin(username, password).await?;
        if let Some(ref user) = admin {
            self.ctx
                .invalidation
                .invalidate(EntityKind::User, Mutation::Create, user.id)
                .await;
        }
        Ok(admin)
    }
}
