//! Project service

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::traits::ProjectRepository;
use crate::data::types::{NewProject, ProjectRow, STATUS_ACTIVE};
use crate::domain::error::DomainError;
use crate::domain::models::{CreateProjectRequest, Page, UpdateProjectRequest};

#[async_trait]
pub trait ProjectService: Send + Sync {
    async fn create(&self, req: CreateProjectRequest) -> Result<ProjectRow, DomainError>;

    async fn get_by_id(&self, id: u64) -> Result<ProjectRow, DomainError>;

    async fn list(
        &self,
        limit: u32,
        offset: u32,
        keyword: Option<&str>,
    ) -> Result<Page<ProjectRow>, DomainError>;

    async fn update(&self, id: u64, req: UpdateProjectRequest) -> Result<ProjectRow, DomainError>;

    async fn delete(&self, id: u64) -> Result<(), DomainError>;
}

pub struct BaseProjectService {
    repo: Arc<dyn ProjectRepository>,
}

impl BaseProjectService {
    pub fn new(repo: Arc<dyn ProjectRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ProjectService for BaseProjectService {
    async fn create(&self, req: CreateProjectRequest) -> Result<ProjectRow, DomainError> {
        let project = self
            .repo
            .create(NewProject {
                name: req.name.trim().to_string(),
                slug: req.slug,
                description: req.description.trim().to_string(),
                status: STATUS_ACTIVE.to_string(),
            })
            .await?;
        tracing::debug!(project_id = project.id, slug = %project.slug, "Project created");
        Ok(project)
    }

    async fn get_by_id(&self, id: u64) -> Result<ProjectRow, DomainError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("project {id}")))
    }

    async fn list(
        &self,
        limit: u32,
        offset: u32,
        keyword: Option<&str>,
    ) -> Result<Page<ProjectRow>, DomainError> {
        let (items, total) = self.repo.get_all(limit, offset, keyword).await?;
        Ok(Page { items, total })
    }

    async fn update(&self, id: u64, req: UpdateProjectRequest) -> Result<ProjectRow, DomainError> {
        let mut project = self.get_by_id(id).await?;
        if let Some(name) = req.name {
            project.name = name.trim().to_string();
        }
        if let Some(slug) = req.slug {
            project.slug = slug;
        }
        if let Some(description) = req.description {
            project.description = description.trim().to_string();
        }
        if let Some(status) = req.status {
            project.status = status;
        }
        Ok(self.repo.update(project).await?)
    }

    async fn delete(&self, id: u64) -> Result<(), DomainError> {
        self.repo.delete(id).await?;
        tracing::debug!(project_id = id, "Project deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;

    fn service() -> BaseProjectService {
        BaseProjectService::new(Arc::new(MemoryStore::new()))
    }

    fn create_req(name: &str, slug: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            name: name.to_string(),
            slug: slug.to_string(),
            description: "  storefront  ".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_trims_and_activates() {
        let svc = service();
        let project = svc.create(create_req(" Shop ", "shop")).await.unwrap();
        assert_eq!(project.name, "Shop");
        assert_eq!(project.description, "storefront");
        assert_eq!(project.status, STATUS_ACTIVE);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let svc = service();
        svc.create(create_req("Shop", "shop")).await.unwrap();
        let err = svc.create(create_req("Shop 2", "shop")).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let svc = service();
        let project = svc.create(create_req("Shop", "shop")).await.unwrap();

        let updated = svc
            .update(
                project.id,
                UpdateProjectRequest {
                    name: Some("Store".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Store");
        assert_eq!(updated.slug, "shop");
    }

    #[tokio::test]
    async fn test_missing_project() {
        let svc = service();
        assert!(svc.get_by_id(9).await.unwrap_err().is_not_found());
        assert!(svc.delete(9).await.unwrap_err().is_not_found());
        assert!(
            svc.update(9, UpdateProjectRequest::default())
                .await
                .unwrap_err()
                .is_not_found()
        );
    }
}
