use std::sync::Arc;

use crate::domain::{CreateSkillRequest, Skill, SkillName};
use crate::error::ApiResult;
use crate::store::MarketplaceStore;

/// Case-insensitive skill directory
pub struct SkillDirectory {
    store: Arc<dyn MarketplaceStore>,
}

impl SkillDirectory {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, req: CreateSkillRequest) -> ApiResult<Skill> {
        let name = SkillName::parse(&req.name)?;
        let skill = self.store.insert_skill(&name).await?;
        tracing::info!(skill_id = %skill.id, name = %skill.name, "Skill created");
        Ok(skill)
    }

    pub async fn list(&self) -> ApiResult<Vec<Skill>> {
        Ok(self.store.list_skills().await?)
    }
}
