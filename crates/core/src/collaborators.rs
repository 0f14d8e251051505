//! Read-only seams to the catalog, project and supplier subsystems.

use async_trait::async_trait;

use crate::domain::party::{MaterialSummary, Project, ProjectId, Supplier};
use crate::errors::ApplicationError;

#[async_trait]
pub trait CatalogDirectory: Send + Sync {
    async fn list_materials(
        &self,
        category: Option<&str>,
        search_term: Option<&str>,
    ) -> Result<Vec<MaterialSummary>, ApplicationError>;
}

#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, ApplicationError>;
}

#[async_trait]
pub trait SupplierDirectory: Send + Sync {
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, ApplicationError>;
}

/// Case-insensitive category equality and name/category substring search.
pub fn material_matches(
    material: &MaterialSummary,
    category: Option<&str>,
    search_term: Option<&str>,
) -> bool {
    let category_ok = category
        .map(str::trim)
        .filter(|category| !category.is_empty())
        .map(|category| material.category.eq_ignore_ascii_case(category))
        .unwrap_or(true);
    let search_ok = search_term
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .map(|term| {
            material.name.to_lowercase().contains(&term)
                || material.category.to_lowercase().contains(&term)
        })
        .unwrap_or(true);
    category_ok && search_ok
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryDirectory {
    materials: Vec<MaterialSummary>,
    projects: Vec<Project>,
    suppliers: Vec<Supplier>,
}

impl InMemoryDirectory {
    pub fn new(
        materials: Vec<MaterialSummary>,
        projects: Vec<Project>,
        suppliers: Vec<Supplier>,
    ) -> Self {
        Self { materials, projects, suppliers }
    }
}

#[async_trait]
impl CatalogDirectory for InMemoryDirectory {
    async fn list_materials(
        &self,
        category: Option<&str>,
        search_term: Option<&str>,
    ) -> Result<Vec<MaterialSummary>, ApplicationError> {
        Ok(self
            .materials
            .iter()
            .filter(|material| material_matches(material, category, search_term))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProjectDirectory for InMemoryDirectory {
    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, ApplicationError> {
        Ok(self.projects.iter().find(|project| &project.id == id).cloned())
    }
}

#[async_trait]
impl SupplierDirectory for InMemoryDirectory {
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, ApplicationError> {
        Ok(self.suppliers.clone())
    }
}
