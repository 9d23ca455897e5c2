use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::material::{Material, NewMaterial},
};

#[async_trait]
pub trait MaterialRepository: Send + Sync {
    async fn create_material(&self, material: NewMaterial) -> AppResult<Material>;
    async fn find_material(&self, id: i64) -> AppResult<Option<Material>>;
    async fn list_by_teacher(&self, teacher_id: i64) -> AppResult<Vec<Material>>;
    async fn list_by_department(&self, department: &str) -> AppResult<Vec<Material>>;
    async fn delete_material(&self, id: i64) -> AppResult<bool>;
}

pub struct PgMaterialRepository {
    pool: PgPool,
}

impl PgMaterialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MATERIAL_COLUMNS: &str =
    "id, teacher_id, department, title, description, file_url, uploaded_at";

#[async_trait]
impl MaterialRepository for PgMaterialRepository {
    async fn create_material(&self, material: NewMaterial) -> AppResult<Material> {
        let created = sqlx::query_as::<_, Material>(&format!(
            r#"
            INSERT INTO materials (teacher_id, department, title, description, file_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MATERIAL_COLUMNS}
            "#
        ))
        .bind(material.teacher_id)
        .bind(&material.department)
        .bind(&material.title)
        .bind(&material.description)
        .bind(&material.file_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_material(&self, id: i64) -> AppResult<Option<Material>> {
        let material = sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(material)
    }

    async fn list_by_teacher(&self, teacher_id: i64) -> AppResult<Vec<Material>> {
        let materials = sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE teacher_id = $1 ORDER BY uploaded_at DESC"
        ))
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(materials)
    }

    async fn list_by_department(&self, department: &str) -> AppResult<Vec<Material>> {
        let materials = sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE department = $1 ORDER BY uploaded_at DESC"
        ))
        .bind(department)
        .fetch_all(&self.pool)
        .await?;
        Ok(materials)
    }

    async fn delete_material(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
