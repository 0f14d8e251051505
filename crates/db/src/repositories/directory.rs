//! SQL-backed adapters for the catalog, project and supplier collaborators.

use async_trait::async_trait;
use rfqdesk_core::collaborators::{
    material_matches, CatalogDirectory, ProjectDirectory, SupplierDirectory,
};
use rfqdesk_core::domain::party::{MaterialSummary, Project, ProjectId, Supplier, SupplierId};
use rfqdesk_core::errors::ApplicationError;
use sqlx::{sqlite::SqliteRow, Row};

use super::RepositoryError;
use crate::DbPool;

#[derive(Clone)]
pub struct SqlDirectory {
    pool: DbPool,
}

impl SqlDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogDirectory for SqlDirectory {
    async fn list_materials(
        &self,
        category: Option<&str>,
        search_term: Option<&str>,
    ) -> Result<Vec<MaterialSummary>, ApplicationError> {
        let rows = sqlx::query(
            "SELECT id, name, category, unit, hsn_code
             FROM catalog_material
             ORDER BY category ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let materials = rows.iter().map(material_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(materials
            .into_iter()
            .filter(|material| material_matches(material, category, search_term))
            .collect())
    }
}

#[async_trait]
impl ProjectDirectory for SqlDirectory {
    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, ApplicationError> {
        let row = sqlx::query(
            "SELECT id, name, delivery_location, client FROM project WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(|row| project_from_row(&row)).transpose()?)
    }
}

#[async_trait]
impl SupplierDirectory for SqlDirectory {
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, ApplicationError> {
        let rows = sqlx::query("SELECT id, name, email, phone FROM supplier ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(supplier_from_row).collect::<Result<Vec<_>, _>>()?)
    }
}

fn material_from_row(row: &SqliteRow) -> Result<MaterialSummary, RepositoryError> {
    Ok(MaterialSummary {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        unit: row.try_get("unit")?,
        hsn_code: row.try_get("hsn_code")?,
    })
}

fn project_from_row(row: &SqliteRow) -> Result<Project, RepositoryError> {
    Ok(Project {
        id: ProjectId(row.try_get("id")?),
        name: row.try_get("name")?,
        delivery_location: row.try_get("delivery_location")?,
        client: row.try_get("client")?,
    })
}

fn supplier_from_row(row: &SqliteRow) -> Result<Supplier, RepositoryError> {
    Ok(Supplier {
        id: SupplierId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
    })
}
