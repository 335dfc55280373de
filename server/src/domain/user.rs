//! User service

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::traits::UserRepository;
use crate::data::types::{NewUser, Role, STATUS_ACTIVE};
use crate::domain::auth::{TokenIssuer, hash_password, verify_password};
use crate::domain::error::DomainError;
use crate::domain::models::{
    CreateUserRequest, LoginRequest, LoginResponse, Page, UpdateUserRequest, User,
};

#[async_trait]
pub trait UserService: Send + Sync {
    async fn create(&self, req: CreateUserRequest) -> Result<User, DomainError>;

    async fn get_by_id(&self, id: u64) -> Result<User, DomainError>;

    async fn list(
        &self,
        limit: u32,
        offset: u32,
        keyword: Option<&str>,
    ) -> Result<Page<User>, DomainError>;

    async fn update(&self, id: u64, req: UpdateUserRequest) -> Result<User, DomainError>;

    async fn delete(&self, id: u64) -> Result<(), DomainError>;

    async fn login(&self, req: LoginRequest) -> Result<LoginResponse, DomainError>;

    /// Create an admin account if the store has no users yet.
    /// Returns the new admin, or `None` when users already exist.
    async fn bootstrap_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError>;
}

pub struct BaseUserService {
    repo: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenIssuer>,
}

impl BaseUserService {
    pub fn new(repo: Arc<dyn UserRepository>, tokens: Arc<dyn TokenIssuer>) -> Self {
        Self { repo, tokens }
    }
}

#[async_trait]
impl UserService for BaseUserService {
    async fn create(&self, req: CreateUserRequest) -> Result<User, DomainError> {
        let row = self
            .repo
            .create(NewUser {
                username: req.username.trim().to_string(),
                email: req.email,
                password_hash: hash_password(&req.password)?,
                role: req.role,
            })
            .await?;
        tracing::debug!(user_id = row.id, username = %row.username, role = ?row.role, "User created");
        Ok(row.into())
    }

    async fn get_by_id(&self, id: u64) -> Result<User, DomainError> {
        self.repo
            .get_by_id(id)
            .await?
            .map(User::from)
            .ok_or_else(|| DomainError::not_found(format!("user {id}")))
    }

    async fn list(
        &self,
        limit: u32,
        offset: u32,
        keyword: Option<&str>,
    ) -> Result<Page<User>, DomainError> {
        let (rows, total) = self.repo.get_all(limit, offset, keyword).await?;
        Ok(Page {
            items: rows.into_iter().map(User::from).collect(),
            total,
        })
    }

    async fn update(&self, id: u64, req: UpdateUserRequest) -> Result<User, DomainError> {
        let mut row = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {id}")))?;

        if let Some(email) = req.email {
            row.email = Some(email);
        }
        if let Some(status) = req.status {
            row.status = status;
        }
        let role_changed = req.role.is_some_and(|role| role != row.role);
        if let Some(role) = req.role {
            row.role = role;
        }
        let password_changed = req.password.is_some();
        if let Some(password) = req.password {
            row.password_hash = hash_password(&password)?;
        }

        let row = self.repo.update(row).await?;
        if password_changed || role_changed || row.status != STATUS_ACTIVE {
            self.tokens.revoke_user(id);
        }
        Ok(row.into())
    }

    async fn delete(&self, id: u64) -> Result<(), DomainError> {
        self.repo.delete(id).await?;
        self.tokens.revoke_user(id);
        Ok(())
    }

    async fn login(&self, req: LoginRequest) -> Result<LoginResponse, DomainError> {
        let Some(row) = self.repo.get_by_username(req.username.trim()).await? else {
            tracing::debug!(username = %req.username, "Login for unknown user");
            return Err(DomainError::InvalidCredentials);
        };
        if row.status != STATUS_ACTIVE || !verify_password(&req.password, &row.password_hash) {
            tracing::debug!(user_id = row.id, "Login rejected");
            return Err(DomainError::InvalidCredentials);
        }

        let user = User::from(row);
        let token = self.tokens.issue(&user)?;
        Ok(LoginResponse { token, user })
    }

    async fn bootstrap_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError> {
        let (_, total) = self.repo.get_all(1, 0, None).await?;
        if total > 0 {
            return Ok(None);
        }

        let row = self
            .repo
            .create(NewUser {
                username: username.trim().to_string(),
                email: None,
                password_hash: hash_password(password)?,
                role: Role::Admin,
            })
            .await?;
        Ok(Some(row.into()))
    }
}
