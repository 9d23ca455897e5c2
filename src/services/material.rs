use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        material::{CreateMaterialRequest, Material, NewMaterial},
        user::{Role, User},
    },
    repositories::MaterialRepository,
    services::authz::Principal,
    utils::html::{clean_html, clean_optional},
};

pub struct MaterialService {
    materials: Arc<dyn MaterialRepository>,
}

impl MaterialService {
    pub fn new(materials: Arc<dyn MaterialRepository>) -> Self {
        Self { materials }
    }

    /// Shares a material; the department defaults to the teacher's own.
    pub async fn upload(&self, teacher: &User, req: CreateMaterialRequest) -> AppResult<Material> {
        if teacher.role() != Some(Role::Faculty) {
            return Err(AppError::NotAuthorized(
                "Only faculty can share materials".to_string(),
            ));
        }
        req.validate()?;

        let material = self
            .materials
            .create_material(NewMaterial {
                teacher_id: teacher.id,
                department: req.department.unwrap_or_else(|| teacher.department.clone()),
                title: clean_html(&req.title),
                description: clean_optional(req.description.as_deref()),
                file_url: req.file_url,
            })
            .await?;

        tracing::info!(material = material.id, teacher = teacher.id, "Material shared");
        Ok(material)
    }

    /// Students see their department's materials, faculty their own uploads.
    pub async fn list_for(&self, user: &User) -> AppResult<Vec<Material>> {
        match user.role() {
            Some(Role::Faculty) => self.materials.list_by_teacher(user.id).await,
            Some(Role::Student) => self.materials.list_by_department(&user.department).await,
            None => Err(AppError::NotAuthorized("Unknown role".to_string())),
        }
    }

    pub async fn delete(&self, material_id: i64, principal: &Principal) -> AppResult<()> {
        let material = self
            .materials
            .find_material(material_id)
            .await?
            .ok_or(AppError::NotFound("Material not found".to_string()))?;
        principal.ensure_owner(material.teacher_id, "material")?;

        self.materials.delete_material(material.id).await?;
        Ok(())
    }
}
